//! Markdown conversion pipeline for the vmark editor
//!
//!     This crate converts between markdown text and the editor's document tree, in both
//!     directions, so that `serialize(parse(x))` gives back `x` up to canonical markers.
//!
//!     TLDR: For contributors:
//!         - comrak is the base grammar; we never write a CommonMark parser, only a fast path
//!           for plain documents and extensions over the syntax tree.
//!         - Everything editor specific (custom marks, wiki links, alerts, details, block math)
//!           is a tree extension in ./formats/markdown/extensions.
//!         - The serializer uses the tokenizer's own pair finder and the preprocessor's fence
//!           rules, so escaping stays symmetric with parsing.
//!         - Fast and full parser must produce identical trees on every eligible input. When
//!           the fast parser is not sure, it declines.
//!
//! Architecture
//!
//!     Two trees. The syntax tree (./ir) keeps markdown's nesting: a subscript inside a bold
//!     inside a link. The document tree (./document) is what the editor edits: blocks map
//!     one-to-one, inline content is a flat list of runs, each carrying a rank-ordered set of
//!     marks. The converters between them live in ./common.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── options.rs              # Per-call options and pipeline config
//!     ├── pipeline.rs             # Pipeline context: cache + offload
//!     ├── cache.rs                # FNV-1a keyed LRU of syntax trees
//!     ├── offload.rs              # Background parse worker
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── formats
//!     │   ├── markdown            # preprocess, sniff, parsers, extensions, serializer
//!     │   └── json                # document tree as JSON
//!     ├── ir                      # Syntax tree
//!     ├── document                # Document tree
//!     └── common                  # flat_to_nested / nested_to_flat
//!
//! Parse Pipeline
//!
//!     escape preprocess -> sniff -> (cache lookup | fast or full parser) -> extensions
//!     -> sentinel restore -> nested_to_flat
//!
//!     Serialization is flat_to_nested -> serializer. Neither direction fails on malformed
//!     markdown; errors only report broken internal invariants, and carry an input preview or
//!     document size for diagnostics.
//!
//! Concurrency
//!
//!     A [`Pipeline`] owns its cache and its worker thread; share it behind an `Arc`. Parses
//!     at or above the offload threshold go to the worker when called through
//!     [`Pipeline::parse_async`]. Any worker failure falls back to parsing in place.
//!
//! Testing
//!     tests
//!     └── <area>
//!         └── <testname>.rs
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include these
//!     in the mod.

pub mod cache;
pub mod common;
pub mod document;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod offload;
pub mod options;
pub mod pipeline;
pub mod registry;

pub use document::{DocListItem, DocNode, Document, Mark, MarkKind, Run, RunContent};
pub use error::{ConversionError, FormatError};
pub use format::Format;
pub use options::{HardBreakStyle, PipelineConfig, PipelineOptions};
pub use pipeline::Pipeline;
pub use registry::FormatRegistry;
