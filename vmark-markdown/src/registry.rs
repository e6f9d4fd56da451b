//! Lookup of formats by name or file extension, used by the CLI `convert`
//! command to move documents between markdown and JSON.

use crate::document::Document;
use crate::error::FormatError;
use crate::format::Format;
use crate::formats::json::JsonFormat;
use crate::formats::markdown::MarkdownFormat;
use crate::options::PipelineOptions;
use crate::pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::Arc;

pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Add `format`, replacing any format registered under the same name.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, FormatError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormatError::FormatNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// The format whose extensions include `filename`'s extension.
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?;

        self.formats
            .values()
            .find(|format| format.file_extensions().contains(&extension))
            .map(|format| format.name().to_string())
    }

    pub fn parse(&self, source: &str, format: &str) -> Result<Document, FormatError> {
        let fmt = self.get(format)?;
        if !fmt.supports_parsing() {
            return Err(FormatError::NotSupported(format!(
                "{format} input is not supported"
            )));
        }
        fmt.parse(source)
    }

    pub fn serialize(&self, doc: &Document, format: &str) -> Result<String, FormatError> {
        let fmt = self.get(format)?;
        if !fmt.supports_serialization() {
            return Err(FormatError::NotSupported(format!(
                "{format} output is not supported"
            )));
        }
        fmt.serialize(doc)
    }

    /// Markdown on a fresh pipeline, plus JSON.
    pub fn with_defaults() -> Self {
        Self::with_pipeline(Arc::new(Pipeline::default()), None)
    }

    /// Markdown going through `pipeline` with `options`, plus JSON.
    pub fn with_pipeline(pipeline: Arc<Pipeline>, options: Option<PipelineOptions>) -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat::new(pipeline).with_options(options));
        registry.register(JsonFormat);
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocNode, RunContent};

    #[test]
    fn markdown_and_json_are_registered() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.list_formats(), vec!["json", "markdown"]);
        assert!(registry.get("markdown").unwrap().supports_parsing());
        assert!(registry.get("json").unwrap().supports_serialization());
    }

    #[test]
    fn unknown_format_is_reported_by_name() {
        let registry = FormatRegistry::new();
        assert!(!registry.has("markdown"));
        match registry.parse("# Title", "html").unwrap_err() {
            FormatError::FormatNotFound(name) => assert_eq!(name, "html"),
            other => panic!("expected FormatNotFound, got {other:?}"),
        }
    }

    #[test]
    fn format_is_detected_from_extension() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(
            registry.detect_format_from_filename("notes/today.md"),
            Some("markdown".to_string())
        );
        assert_eq!(
            registry.detect_format_from_filename("today.markdown"),
            Some("markdown".to_string())
        );
        assert_eq!(
            registry.detect_format_from_filename("today.json"),
            Some("json".to_string())
        );
        assert_eq!(registry.detect_format_from_filename("today.txt"), None);
        assert_eq!(registry.detect_format_from_filename("README"), None);
    }

    #[test]
    fn registered_markdown_options_apply() {
        let pipeline = Arc::new(Pipeline::default());
        let mut registry = FormatRegistry::with_pipeline(Arc::clone(&pipeline), None);
        let plain = registry.parse("one\ntwo\n", "markdown").unwrap();

        let options = PipelineOptions {
            preserve_line_breaks: true,
            ..PipelineOptions::default()
        };
        registry.register(MarkdownFormat::new(pipeline).with_options(Some(options)));
        assert_eq!(registry.list_formats().len(), 2);
        let kept = registry.parse("one\ntwo\n", "markdown").unwrap();

        let has_break = |doc: &Document| match &doc.children[0] {
            DocNode::Paragraph { content } => content
                .iter()
                .any(|run| run.content == RunContent::HardBreak),
            other => panic!("expected paragraph, got {other:?}"),
        };
        assert!(!has_break(&plain));
        assert!(has_break(&kept));
    }

    #[test]
    fn markdown_to_json_and_back() {
        let registry = FormatRegistry::with_defaults();
        let doc = registry.parse("# Hi\n\n- [x] done\n", "markdown").unwrap();
        let json = registry.serialize(&doc, "json").unwrap();
        let back = registry.parse(&json, "json").unwrap();
        assert_eq!(
            registry.serialize(&back, "markdown").unwrap(),
            "# Hi\n\n- [x] done\n"
        );
    }
}
