use vmark_markdown::common::flat_to_nested::document_to_syntax;
use vmark_markdown::common::nested_to_flat::syntax_to_document;
use vmark_markdown::document::{DocNode, Document, Mark, Run, RunContent};
use vmark_markdown::formats::markdown::parse_syntax_tree;
use vmark_markdown::Pipeline;

fn runs(source: &str) -> Vec<Run> {
    let doc = Pipeline::default().parse(source, None).unwrap();
    match doc.children.into_iter().next() {
        Some(DocNode::Paragraph { content }) => content,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

#[test]
fn test_nested_marks_flatten_into_sets() {
    assert_eq!(
        runs("[**==a==** b](/u)"),
        vec![
            Run::text("a").with_marks(vec![
                Mark::Link {
                    href: "/u".into(),
                    title: None,
                },
                Mark::Highlight,
                Mark::Bold,
            ]),
            Run::text(" b").with_marks(vec![Mark::Link {
                href: "/u".into(),
                title: None,
            }]),
        ]
    );
}

#[test]
fn test_atoms_become_runs() {
    let runs = runs("See [[Page|alias]], $x^2$ and a note[^n].\n\n[^n]: Note.");
    let kinds: Vec<&RunContent> = runs.iter().map(|run| &run.content).collect();
    assert!(kinds.iter().any(|content| matches!(
        content,
        RunContent::WikiLink { target, alias: Some(alias) } if target == "Page" && alias == "alias"
    )));
    assert!(kinds
        .iter()
        .any(|content| matches!(content, RunContent::Math { tex } if tex == "x^2")));
    assert!(kinds
        .iter()
        .any(|content| matches!(content, RunContent::FootnoteRef { .. })));
}

#[test]
fn test_syntax_tree_survives_both_converters() {
    let source = "# T\n\n> [!TIP]\n> **a *b* c** and `code`\n\n- [x] ==done==\n";
    let root = parse_syntax_tree(source, None, true).unwrap();
    let doc = syntax_to_document(&root, true).unwrap();
    let back = document_to_syntax(&doc, true).unwrap();
    assert_eq!(back, root);
}

#[test]
fn test_strict_serialize_rejects_bad_heading_level() {
    let doc = Document::new(vec![DocNode::Heading {
        level: 0,
        content: vec![Run::text("zero")],
    }]);
    let strict = Pipeline::new(vmark_markdown::PipelineConfig {
        strict: true,
        ..Default::default()
    });
    assert!(matches!(
        strict.serialize(&doc, None),
        Err(vmark_markdown::FormatError::SerializationError { blocks: 1, nodes: 2, .. })
    ));
    assert_eq!(Pipeline::default().serialize(&doc, None).unwrap(), "# zero\n");
}
