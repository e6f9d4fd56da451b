use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vmark_markdown::formats::markdown::{parse_document, serialize_document};
use vmark_markdown::Pipeline;

const KITCHENSINK: &str = include_str!("fixtures/kitchensink.md");

fn roundtrip(source: &str) -> String {
    let doc = parse_document(source, None, true).expect("Failed to parse markdown");
    serialize_document(&doc, None, true).expect("Failed to serialize markdown")
}

#[test]
fn test_canonical_sources_are_stable() {
    let corpus = [
        "# Title\n\nSome **bold** and *italic* text.\n",
        "H~2~O and x^2^\n",
        "==highlight== and ++underline++ and ~~strike~~\n",
        "- one\n- two\n  - nested\n",
        "1. first\n2. second\n",
        "- [ ] todo\n- [x] done\n",
        "> quoted *text*\n",
        "```rust\nfn main() {}\n```\n",
        "| h |\n| :-: |\n| 1 |\n",
        "A [link](/url \"Title\") and ![image](/i.png)\n",
        "Code `a | b` inline\n",
        "==**x**== and ++*y*++ and ^`z`^\n",
    ];
    for source in corpus {
        assert_eq!(roundtrip(source), source, "source: {source:?}");
    }
}

#[test]
fn test_serialize_is_a_fixed_point() {
    let once = roundtrip(KITCHENSINK);
    let twice = roundtrip(&once);
    assert_eq!(twice, once);
}

#[test]
fn test_reparse_is_idempotent() {
    let pipeline = Pipeline::default();
    let inputs = [
        KITCHENSINK,
        "Setext heading\n===\n\n* star list\n+ plus list\n",
        "1) paren\n2) list\n\n\n3. dot list\n",
        "Line one\\\nline two  \nline three\n",
        "Escapes: \\*not emphasis\\* and 1\\. not a list\n",
        "- a\n\n- loose\n",
        "<div>\nhtml block\n</div>\n",
        "Text with <span>inline html</span>.\n",
        "Reference [link][id].\n\n[id]: /target \"Title\"\n",
        "**==x==** and *++y++*\n",
        "> [q]: /quoted\n> See [q].\n",
        "==a **b** c== and ~`code`~\n",
    ];
    for input in inputs {
        let first = pipeline.parse(input, None).unwrap();
        let markdown = pipeline.serialize(&first, None).unwrap();
        let second = pipeline.parse(&markdown, None).unwrap();
        assert_eq!(second, first, "input: {input:?}\nserialized: {markdown:?}");
    }
}

#[test]
fn test_kitchensink_keeps_every_construct() {
    let output = roundtrip(KITCHENSINK);
    for expected in [
        "---\ntitle: Kitchen sink\n---",
        "# Kitchen sink",
        "**bold**",
        "~~strike~~",
        "==highlight==",
        "++underline++",
        "H~2~O",
        "x^2^",
        "[link](https://example.com \"Example\")",
        "- [x] done",
        "> [!WARNING]",
        "| :-- | :-: | --: |",
        "```rust",
        "$$\nE = mc^2\n$$",
        "$a^2 + b^2$",
        "[[Other Page|the other page]]",
        "![[diagram.png]]",
        "<summary>More</summary>",
        "[^1]: The note.",
    ] {
        assert!(output.contains(expected), "missing {expected:?} in:\n{output}");
    }
}

fn marked_piece() -> impl Strategy<Value = String> {
    let word = "[a-z]{1,5}";
    prop_oneof![
        word,
        word.prop_map(|w| format!("**=={w}==**")),
        word.prop_map(|w| format!("*++{w}++*")),
        word.prop_map(|w| format!("==**{w}**==")),
        word.prop_map(|w| format!("^{w}^")),
        word.prop_map(|w| format!("~{w}~")),
        word.prop_map(|w| format!("**a~{w}~b**")),
        word.prop_map(|w| format!("~~{w}~~")),
        word.prop_map(|w| format!("^`{w}`^")),
    ]
}

proptest! {
    #[test]
    fn emphasis_around_custom_marks_reparses_identically(
        pieces in prop::collection::vec(marked_piece(), 1..6),
    ) {
        let pipeline = Pipeline::default();
        let input = format!("{}\n", pieces.join(" "));
        let first = pipeline.parse(&input, None).unwrap();
        let markdown = pipeline.serialize(&first, None).unwrap();
        let second = pipeline.parse(&markdown, None).unwrap();
        prop_assert_eq!(second, first, "input: {:?} serialized: {:?}", input, markdown);
    }
}
