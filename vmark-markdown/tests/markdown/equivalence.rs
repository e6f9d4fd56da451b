use proptest::prelude::*;
use vmark_markdown::formats::markdown::escape::preprocess;
use vmark_markdown::formats::markdown::fast_parser::parse_fast;
use vmark_markdown::formats::markdown::parser::parse_full;
use vmark_markdown::formats::markdown::sniff::{fast_path_eligible, ExtensionNeeds};
use vmark_markdown::ir::nodes::{Block, Root};
use vmark_markdown::{Pipeline, PipelineOptions};

fn full(input: &str) -> Root {
    let needs = ExtensionNeeds::detect(input);
    parse_full(&preprocess(input), &needs, true).unwrap()
}

#[test]
fn test_fast_and_full_parsers_agree() {
    let inputs = [
        "# Title\n\nSome *emphasis* and `code`.\n\n- one\n- two\n",
        "## Sub\n\nA **strong** word and a [link](/url).\n",
        "> quoted\n> text\n",
        "1. first\n2. second\n",
        "```rust\nfn main() {}\n```\n",
        "***\n\nAfter the rule.\n",
        "An ![image](/i.png) inline.\n",
        "- outer\n  - inner\n- again\n",
    ];
    let mut fast_runs = 0;
    for input in inputs {
        assert!(fast_path_eligible(input), "not eligible: {input:?}");
        if let Some(fast) = parse_fast(&preprocess(input)) {
            fast_runs += 1;
            assert_eq!(fast, full(input), "input: {input:?}");
        }
    }
    assert!(fast_runs > 0);
}

#[test]
fn test_extension_syntax_never_takes_the_fast_path() {
    for input in ["==x==", "H~2~O", "$x$", "[[Page]]", "> [!NOTE]\n> hi"] {
        assert!(!fast_path_eligible(input), "eligible: {input:?}");
    }
}

#[test]
fn test_fence_info_is_decoded_on_either_path() {
    for (input, lang) in [("```c\\#\nx\n```\n", "c#"), ("```a&amp;b\nx\n```\n", "a&b")] {
        assert!(fast_path_eligible(input));
        assert_eq!(parse_fast(&preprocess(input)), None, "input: {input:?}");
        match full(input).children.first() {
            Some(Block::Code { lang: Some(found), .. }) => assert_eq!(found, lang),
            other => panic!("expected code block, got {other:?}"),
        }

        let pipeline = Pipeline::default();
        let sniffed = pipeline.parse(input, None).unwrap();
        let explicit = pipeline
            .parse(input, Some(&PipelineOptions::default()))
            .unwrap();
        assert_eq!(sniffed, explicit, "input: {input:?}");
    }
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,5}"
}

fn inline_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        word(),
        word().prop_map(|w| format!("*{w}*")),
        word().prop_map(|w| format!("**{w}**")),
        word().prop_map(|w| format!("`{w}`")),
        (word(), word()).prop_map(|(text, url)| format!("[{text}](/{url})")),
    ]
}

fn inline_line() -> impl Strategy<Value = String> {
    prop::collection::vec(inline_piece(), 1..6).prop_map(|pieces| pieces.join(" "))
}

fn numbered(items: Vec<String>, marker: impl Fn(usize) -> String) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}{item}", marker(index)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(inline_line(), 1..3).prop_map(|lines| lines.join("\n")),
        (1..=6usize, inline_line())
            .prop_map(|(level, line)| format!("{} {line}", "#".repeat(level))),
        prop::collection::vec(inline_line(), 1..4)
            .prop_map(|items| numbered(items, |_| "- ".to_string())),
        prop::collection::vec(inline_line(), 1..4)
            .prop_map(|items| numbered(items, |index| format!("{}. ", index + 1))),
        inline_line().prop_map(|line| format!("> {line}")),
        (
            prop::sample::select(vec!["", "rust", "x y", "c\\#", "a&amp;b"]),
            prop::collection::vec(word(), 1..3),
        )
            .prop_map(|(info, lines)| format!("```{info}\n{}\n```", lines.join("\n"))),
    ]
}

proptest! {
    #[test]
    fn fast_parser_matches_full_parser_when_it_accepts(
        blocks in prop::collection::vec(block(), 1..5),
    ) {
        let input = format!("{}\n", blocks.join("\n\n"));
        prop_assume!(fast_path_eligible(&input));
        if let Some(fast) = parse_fast(&preprocess(&input)) {
            prop_assert_eq!(fast, full(&input), "input: {:?}", input);
        }
    }
}
