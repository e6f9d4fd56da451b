//! Format implementations
//!
//! This module contains the formats that convert between the document tree
//! and text representations.

pub mod json;
pub mod markdown;

pub use json::JsonFormat;
pub use markdown::MarkdownFormat;
