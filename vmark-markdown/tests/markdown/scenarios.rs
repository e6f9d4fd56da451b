use vmark_markdown::document::{DocNode, Mark, Run, RunContent};
use vmark_markdown::formats::markdown::parse_syntax_tree;
use vmark_markdown::ir::nodes::{Alignment, Block, Inline};
use vmark_markdown::Pipeline;

#[test]
fn test_subscript_and_superscript() {
    let root = parse_syntax_tree("H~2~O and x^2^", None, true).unwrap();
    assert_eq!(
        root.children,
        vec![Block::Paragraph(vec![
            Inline::Text("H".into()),
            Inline::Subscript(vec![Inline::Text("2".into())]),
            Inline::Text("O and x".into()),
            Inline::Superscript(vec![Inline::Text("2".into())]),
        ])]
    );

    let pipeline = Pipeline::default();
    let doc = pipeline.parse("H~2~O and x^2^", None).unwrap();
    assert_eq!(pipeline.serialize(&doc, None).unwrap(), "H~2~O and x^2^\n");
}

#[test]
fn test_dollar_amounts_are_not_math() {
    let pipeline = Pipeline::default();
    let doc = pipeline.parse("$100 and $200", None).unwrap();
    let DocNode::Paragraph { content } = &doc.children[0] else {
        panic!("expected paragraph, got {:?}", doc.children);
    };
    assert!(content
        .iter()
        .all(|run| !matches!(run.content, RunContent::Math { .. })));
    assert_eq!(content, &vec![Run::text("$100 and $200")]);
}

#[test]
fn test_center_alignment_round_trips() {
    let pipeline = Pipeline::default();
    let doc = pipeline.parse("| h |\n| :-: |\n| 1 |\n", None).unwrap();
    match &doc.children[0] {
        DocNode::Table { alignments, rows } => {
            assert_eq!(alignments, &vec![Alignment::Center]);
            assert_eq!(rows[1], vec![vec![Run::text("1")]]);
        }
        other => panic!("expected table, got {other:?}"),
    }
    let markdown = pipeline.serialize(&doc, None).unwrap();
    assert!(markdown.contains("| :-: |"));
    assert_eq!(pipeline.parse(&markdown, None).unwrap(), doc);
}

#[test]
fn test_bold_with_subscript_keeps_both_marks() {
    let pipeline = Pipeline::default();
    let doc = pipeline.parse("**a~b~c**", None).unwrap();
    assert_eq!(
        doc.children,
        vec![DocNode::paragraph(vec![
            Run::text("a").with_marks(vec![Mark::Bold]),
            Run::text("b").with_marks(vec![Mark::Bold, Mark::Subscript]),
            Run::text("c").with_marks(vec![Mark::Bold]),
        ])]
    );
    assert_eq!(pipeline.serialize(&doc, None).unwrap(), "**a~b~c**\n");
}

#[test]
fn test_double_tilde_is_never_subscript() {
    let pipeline = Pipeline::default();
    let doc = pipeline.parse("~~strike~~", None).unwrap();
    assert_eq!(
        doc.children,
        vec![DocNode::paragraph(vec![
            Run::text("strike").with_marks(vec![Mark::Strike])
        ])]
    );
}
