//! Contains logic for mapping between the syntax tree and the document tree.

pub mod flat_to_nested;
pub mod nested_to_flat;
