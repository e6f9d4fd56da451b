//! Markdown format implementation
//!
//! This module implements bidirectional conversion between markdown text and
//! the syntax tree (see [`crate::ir`]); the [`crate::common`] converters take
//! it the rest of the way to the document tree.
//!
//! # Library Choice
//!
//! We use the `comrak` crate as the base grammar: CommonMark plus the GFM
//! table, strikethrough, task list and footnote extensions, and dollar math.
//! Everything the editor adds on top is a [`extensions::TreeExtension`] over
//! the syntax tree. Serialization is hand-written (see [`serializer`]).
//!
//! # Parse Pipeline
//!
//! 1. [`escape::preprocess`]: escaped markers and lone tildes become sentinels
//! 2. [`sniff`]: decide which extensions are needed and whether the fast
//!    parser may run (only for fast-path-eligible input without explicit
//!    options)
//! 3. [`fast_parser::parse_fast`], falling back to [`parser::parse_full`]
//!    whenever the fast parser declines
//! 4. details folding, lone tilde restore, then wiki links, marks, alerts and
//!    references
//! 5. sentinel restore, and soft breaks to hard breaks if requested
//!
//! # Element Mapping Table
//!
//! | Markdown                     | Syntax tree               | Notes                                 |
//! |------------------------------|---------------------------|---------------------------------------|
//! | Paragraph                    | `Paragraph`               | soft breaks kept as `\n` in text      |
//! | `#` .. `######`, setext      | `Heading`                 | written back as ATX                   |
//! | Fenced / indented code       | `Code`                    | written back fenced                   |
//! | `$$ .. $$`                   | `Code` (math sentinel)    | written back as `$$`                  |
//! | `>`                          | `Blockquote`              |                                       |
//! | `> [!NOTE]`                  | `Alert`                   | five GitHub alert kinds               |
//! | `-` `*` `+` / `1.` `1)`      | `List`                    | markers canonicalised, tightness kept |
//! | `- [ ]` / `- [x]`            | `ListItem::checked`       |                                       |
//! | `***` `---` `___`            | `ThematicBreak`           |                                       |
//! | GFM table                    | `Table`                   | alignment per column                  |
//! | HTML block                   | `Html`                    | verbatim                              |
//! | `<details>`                  | `Details`                 | body parsed as markdown               |
//! | `---` yaml `---`             | `Frontmatter`             | first block only                      |
//! | `[^n]: ..`                   | `FootnoteDefinition`      | moved to the end of the document      |
//! | `[id]: url "t"`              | `LinkDefinition`          | appended to the root                  |
//! | `*a*` `**a**` `~~a~~`        | `Emphasis` `Strong` `Delete` | written with `*`, `**`, `~~`       |
//! | `==a==` `++a++` `^a^` `~a~`  | custom marks              | nestable                              |
//! | `` `a` ``, `$a$`             | `InlineCode`, `InlineMath`|                                       |
//! | `[a](u)` `![a](u)`           | `Link` `Image`            | urls with spaces in `<>`              |
//! | `[[t\|a]]` `![[t]]`          | `WikiLink` `WikiEmbed`    |                                       |
//!
//! # Lossy Conversions
//!
//! - List markers, heading style and code fences are canonicalised
//! - Reference-style links are resolved; only the definitions survive
//! - Unreferenced footnote definitions are dropped by the base grammar

pub mod escape;
pub mod extensions;
pub mod fast_parser;
pub mod parser;
pub mod serializer;
pub mod sniff;

use crate::common::{flat_to_nested, nested_to_flat};
use crate::document::Document;
use crate::error::{ConversionError, FormatError};
use crate::format::Format;
use crate::ir::nodes::{Block, Inline, Root};
use crate::ir::visit::walk_block_lists;
use crate::options::{PipelineConfig, PipelineOptions};
use crate::pipeline::Pipeline;
use extensions::details::DetailsExtension;
use extensions::TreeExtension;
use sniff::ExtensionNeeds;
use std::sync::Arc;
use tracing::debug;

/// Parse markdown into a syntax tree, choosing the fast or full parser.
pub fn parse_syntax_tree(
    source: &str,
    options: Option<&PipelineOptions>,
    strict: bool,
) -> Result<Root, FormatError> {
    let preprocessed = escape::preprocess(source);
    let needs = ExtensionNeeds::detect(source);
    let eligible = options.is_none() && sniff::fast_path_eligible(source);

    let fast = if eligible {
        fast_parser::parse_fast(&preprocessed)
    } else {
        None
    };
    let mut root = match fast {
        Some(root) => {
            debug!(bytes = source.len(), "parsed with fast parser");
            root
        }
        None => {
            debug!(bytes = source.len(), eligible, ?needs, "parsing with full parser");
            parser::parse_full(&preprocessed, &needs, strict)
                .map_err(|err| FormatError::parse(err.to_string(), source))?
        }
    };

    apply_extensions(&mut root, &preprocessed, needs, strict)
        .map_err(|err| FormatError::parse(err.to_string(), source))?;

    if options.is_some_and(|options| options.preserve_line_breaks) {
        preserve_line_breaks(&mut root);
    }
    Ok(root)
}

fn apply_extensions(
    root: &mut Root,
    preprocessed: &str,
    needs: ExtensionNeeds,
    strict: bool,
) -> Result<(), ConversionError> {
    if needs.details {
        DetailsExtension::new(needs, strict).apply(root, preprocessed)?;
    }
    escape::restore_shield_in_tree(root);
    for extension in extensions::inline_extensions(&needs) {
        extension.apply(root, preprocessed)?;
    }
    escape::restore_escapes_in_tree(root);
    Ok(())
}

/// Turn the soft breaks of every paragraph into hard breaks.
fn preserve_line_breaks(root: &mut Root) {
    walk_block_lists(&mut root.children, &mut |blocks| {
        for block in blocks.iter_mut() {
            if let Block::Paragraph(children) = block {
                split_soft_breaks(children);
            }
        }
    });
}

fn split_soft_breaks(nodes: &mut Vec<Inline>) {
    for node in nodes.iter_mut() {
        if let Some(children) = node.children_mut() {
            split_soft_breaks(children);
        }
    }
    if !nodes
        .iter()
        .any(|node| matches!(node, Inline::Text(text) if text.contains('\n')))
    {
        return;
    }
    let mut out = Vec::with_capacity(nodes.len() + 2);
    for node in std::mem::take(nodes) {
        match node {
            Inline::Text(text) if text.contains('\n') => {
                for (index, part) in text.split('\n').enumerate() {
                    if index > 0 {
                        out.push(Inline::Break);
                    }
                    if !part.is_empty() {
                        out.push(Inline::Text(part.to_string()));
                    }
                }
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

/// Serialize a syntax tree back to markdown.
pub fn serialize_syntax_tree(root: &Root, options: Option<&PipelineOptions>) -> String {
    let style = options
        .map(|options| options.hard_break_style)
        .unwrap_or_default();
    serializer::serialize(root, style)
}

/// Markdown text to document tree, without cache or offload.
pub fn parse_document(
    source: &str,
    options: Option<&PipelineOptions>,
    strict: bool,
) -> Result<Document, FormatError> {
    let root = parse_syntax_tree(source, options, strict)?;
    nested_to_flat::syntax_to_document(&root, strict)
        .map_err(|err| FormatError::parse(err.to_string(), source))
}

/// Document tree to markdown text.
pub fn serialize_document(
    doc: &Document,
    options: Option<&PipelineOptions>,
    strict: bool,
) -> Result<String, FormatError> {
    let root = flat_to_nested::document_to_syntax(doc, strict).map_err(|err| {
        FormatError::SerializationError {
            message: err.to_string(),
            blocks: doc.children.len(),
            nodes: doc.node_count(),
        }
    })?;
    Ok(serialize_syntax_tree(&root, options))
}

/// Format implementation for Markdown
pub struct MarkdownFormat {
    pipeline: Arc<Pipeline>,
    options: Option<PipelineOptions>,
}

impl MarkdownFormat {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        MarkdownFormat {
            pipeline,
            options: None,
        }
    }

    /// Use explicit options for every parse and serialize call.
    pub fn with_options(mut self, options: Option<PipelineOptions>) -> Self {
        self.options = options;
        self
    }
}

impl Default for MarkdownFormat {
    fn default() -> Self {
        MarkdownFormat::new(Arc::new(Pipeline::new(PipelineConfig::default())))
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark Markdown with editor extensions"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        self.pipeline.parse(source, self.options.as_ref())
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        self.pipeline.serialize(doc, self.options.as_ref())
    }
}
