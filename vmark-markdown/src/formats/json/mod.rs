//! JSON format: the document tree as serde JSON.
//!
//! Lossless for the document tree, so it is the interchange format of the
//! CLI (`parse --json`, `serialize`).

use crate::document::Document;
use crate::error::FormatError;
use crate::format::Format;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        let mut doc: Document = serde_json::from_str(source)?;
        doc.normalize_marks();
        Ok(doc)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        let mut json = serde_json::to_string_pretty(doc)?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocNode, Mark, Run};

    #[test]
    fn document_survives_json() {
        let doc = Document::new(vec![
            DocNode::Heading {
                level: 2,
                content: vec![Run::text("Title")],
            },
            DocNode::paragraph(vec![
                Run::text("x"),
                Run::text("2").with_marks(vec![Mark::Bold, Mark::Superscript]),
            ]),
        ]);
        let json = JsonFormat.serialize(&doc).unwrap();
        assert!(json.ends_with("}\n"));
        assert_eq!(JsonFormat.parse(&json).unwrap(), doc);
    }

    #[test]
    fn parsed_marks_are_put_in_rank_order() {
        let json = r#"{"children": [{"type": "paragraph", "content": [
            {"kind": "text", "text": "x", "marks": [
                {"type": "code"}, {"type": "bold"}, {"type": "bold"}, {"type": "highlight"}
            ]}
        ]}]}"#;
        let doc = JsonFormat.parse(json).unwrap();
        assert_eq!(
            doc,
            Document::new(vec![DocNode::paragraph(vec![Run::text("x")
                .with_marks(vec![Mark::Highlight, Mark::Bold, Mark::Code])])])
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            JsonFormat.parse("{\"children\": 3}"),
            Err(FormatError::Json(_))
        ));
    }
}
