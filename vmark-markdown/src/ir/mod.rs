//! Intermediate Representation (IR) for markdown documents.
//!
//! The syntax tree produced by both parsers and consumed by the serializer.
//! It keeps markdown's nested inline wrappers; the document tree in
//! [`crate::document`] flattens them into runs.

pub mod nodes;
pub mod visit;
