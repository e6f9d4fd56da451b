use vmark_markdown::formats::markdown::parse_syntax_tree;
use vmark_markdown::ir::nodes::{Block, Inline};
use vmark_markdown::Pipeline;

fn paragraph(source: &str) -> Vec<Inline> {
    let root = parse_syntax_tree(source, None, true).unwrap();
    match root.children.into_iter().next() {
        Some(Block::Paragraph(children)) => children,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

#[test]
fn test_escaped_markers_are_literal() {
    for (source, literal) in [
        (r"\==x==", "==x=="),
        (r"\++x++", "++x++"),
        (r"\^x^", "^x^"),
        (r"\~x~", "~x~"),
    ] {
        assert_eq!(paragraph(source), vec![Inline::Text(literal.into())]);
    }
}

#[test]
fn test_escapes_in_code_are_byte_for_byte() {
    let source = "`\\==x==`\n\n```\n\\++x++ \\^x^ \\~x~\n```\n\n    \\==indented==\n";
    let root = parse_syntax_tree(source, None, true).unwrap();
    assert_eq!(
        root.children,
        vec![
            Block::Paragraph(vec![Inline::InlineCode(r"\==x==".into())]),
            Block::Code {
                lang: None,
                value: r"\++x++ \^x^ \~x~".into(),
            },
            Block::Code {
                lang: None,
                value: r"\==indented==".into(),
            },
        ]
    );
}

#[test]
fn test_literal_markers_survive_a_round_trip() {
    let pipeline = Pipeline::default();
    let source = "\\==x== \\++y++ \\^z^ \\~w~ and *stars* \\*and\\* \\# hash\n";
    let doc = pipeline.parse(source, None).unwrap();
    let markdown = pipeline.serialize(&doc, None).unwrap();
    assert_eq!(pipeline.parse(&markdown, None).unwrap(), doc);
}
