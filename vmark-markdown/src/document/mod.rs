//! Document tree used by the editor: isomorphic blocks, flat inline runs.

pub mod marks;
pub mod nodes;

pub use marks::{Mark, MarkKind};
pub use nodes::{DocListItem, DocNode, Document, Run, RunContent};
