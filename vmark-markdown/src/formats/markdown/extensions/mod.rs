//! Grammar extensions layered over the base markdown grammar.
//!
//! Each extension is a pure transform over the syntax tree. The sniffer
//! decides which ones a source needs; the others are never constructed.
//!
//! | Extension   | Syntax                              | Needed when        |
//! |-------------|-------------------------------------|--------------------|
//! | details     | `<details><summary>..</summary>`    | `<details` present |
//! | wiki-links  | `[[target|alias]]`, `![[target]]`   | `[[` present       |
//! | marks       | `==a==` `++a++` `^a^` `~a~`         | always             |
//! | alerts      | `> [!NOTE]`                         | always             |
//! | references  | `[id]: url "title"`                 | `]:` present       |
//!
//! Math and frontmatter are switched on in the base grammar itself.

use crate::error::ConversionError;
use crate::formats::markdown::sniff::ExtensionNeeds;
use crate::ir::nodes::Root;

pub mod alerts;
pub mod details;
pub mod marks;
pub mod references;
pub mod wikilinks;

/// A syntax tree transform run after the base grammar.
pub trait TreeExtension: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Rewrite `root`. `source` is the preprocessed markdown it came from.
    fn apply(&self, root: &mut Root, source: &str) -> Result<(), ConversionError>;
}

/// Extensions run once lone tildes are restored, in application order.
pub fn inline_extensions(needs: &ExtensionNeeds) -> Vec<Box<dyn TreeExtension>> {
    let mut extensions: Vec<Box<dyn TreeExtension>> = Vec::new();
    if needs.wiki_links {
        extensions.push(Box::new(wikilinks::WikiLinkExtension));
    }
    extensions.push(Box::new(marks::MarkExtension));
    extensions.push(Box::new(alerts::AlertExtension));
    if needs.references {
        extensions.push(Box::new(references::ReferenceExtension));
    }
    extensions
}
