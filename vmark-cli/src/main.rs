// Command-line interface for the vmark markdown pipeline
//
// This binary exposes the library's two operations, parse and serialize, plus a few
// commands built from them for checking documents by hand.
//
// Usage:
//  vmark-md parse <file> [--json]                          - Markdown to document tree
//  vmark-md serialize <file.json>                          - Document tree JSON to markdown
//  vmark-md roundtrip <file> [--check]                     - Parse then serialize
//  vmark-md convert <input> --to <format> [--from <format>] [--output <file>]
//  vmark-md inspect <file> [sniff|syntax|document]         - Pipeline internals
//
// Global flags layer over the configuration files (see vmark-config): --config,
// --preserve-line-breaks, --hard-break-style, --strict. Logging goes to stderr and
// follows RUST_LOG, or debug level with --verbose.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vmark_config::{ConfigError, Loader, VmarkConfig, PROJECT_CONFIG_FILE};
use vmark_markdown::document::{DocNode, Document, Run};
use vmark_markdown::formats::markdown::sniff::{fast_path_eligible, ExtensionNeeds};
use vmark_markdown::formats::JsonFormat;
use vmark_markdown::{Format, FormatRegistry, Pipeline, PipelineOptions};

const INSPECT_VIEWS: &[&str] = &["sniff", "syntax", "document"];

fn input_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("vmark-md")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert between markdown and the vmark document tree")
        .long_about(
            "vmark-md drives the vmark markdown pipeline from the command line.\n\n\
            Commands:\n  \
            - parse:     markdown to document tree (outline or JSON)\n  \
            - serialize: document tree JSON back to markdown\n  \
            - roundtrip: parse and serialize, optionally checking stability\n  \
            - convert:   between registered formats (markdown, json)\n  \
            - inspect:   sniffer result, syntax tree or document tree\n\n\
            Examples:\n  \
            vmark-md parse notes.md --json > notes.json\n  \
            vmark-md serialize notes.json\n  \
            vmark-md roundtrip notes.md --check\n  \
            vmark-md convert notes.md --to json -o notes.json",
        )
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a vmark.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("preserve-line-breaks")
                .long("preserve-line-breaks")
                .help("Turn soft line breaks into hard breaks")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("hard-break-style")
                .long("hard-break-style")
                .help("How hard breaks are written")
                .value_parser(["backslash", "trailing-spaces"])
                .global(true),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Fail on internal conversion errors instead of repairing them")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log pipeline decisions at debug level")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse markdown into the document tree")
                .arg(input_arg("input", "Markdown file"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the document tree as JSON instead of an outline")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("serialize")
                .about("Serialize document tree JSON to markdown")
                .arg(input_arg("input", "Document tree JSON file")),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Parse and serialize a markdown file")
                .arg(input_arg("input", "Markdown file"))
                .arg(
                    Arg::new("check")
                        .long("check")
                        .help("Exit with an error if the output differs from the input")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats")
                .long_about(
                    "Convert documents between registered formats.\n\n\
                    Supported formats:\n  \
                    - markdown: Markdown (.md, .markdown)\n  \
                    - json:     Document tree (.json)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(input_arg("input", "Input file path"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Show pipeline internals for a markdown file")
                .arg(input_arg("path", "Markdown file"))
                .arg(
                    Arg::new("view")
                        .help("What to show. Defaults to 'document'")
                        .index(2)
                        .value_parser(clap::builder::PossibleValuesParser::new(INSPECT_VIEWS)),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let config = load_cli_config(&matches);
    debug!(?config, "configuration loaded");
    let options = config.markdown.to_options();
    let pipeline = Arc::new(Pipeline::new((&config.pipeline).into()));

    match matches.subcommand() {
        Some(("parse", sub)) => {
            let source = read_input(required(sub, "input"));
            let doc = parse_or_exit(&pipeline, &source, options.as_ref());
            if sub.get_flag("json") {
                print!("{}", to_json(&doc));
            } else {
                print!("{}", outline(&doc));
            }
        }
        Some(("serialize", sub)) => {
            let source = read_input(required(sub, "input"));
            let doc = JsonFormat.parse(&source).unwrap_or_else(|e| {
                eprintln!("Invalid document JSON: {e}");
                std::process::exit(1);
            });
            print!("{}", serialize_or_exit(&pipeline, &doc, options.as_ref()));
        }
        Some(("roundtrip", sub)) => {
            let input = required(sub, "input");
            let source = read_input(input);
            let doc = parse_or_exit(&pipeline, &source, options.as_ref());
            let output = serialize_or_exit(&pipeline, &doc, options.as_ref());
            if sub.get_flag("check") && output != source {
                eprintln!("'{input}' is not stable under a round trip");
                print!("{output}");
                std::process::exit(1);
            }
            print!("{output}");
        }
        Some(("convert", sub)) => {
            let registry = FormatRegistry::with_pipeline(Arc::clone(&pipeline), options);
            handle_convert_command(&registry, sub);
        }
        Some(("inspect", sub)) => {
            let source = read_input(required(sub, "path"));
            let view = sub
                .get_one::<String>("view")
                .map(String::as_str)
                .unwrap_or("document");
            handle_inspect_command(&pipeline, &source, view, options.as_ref());
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Embedded defaults, then `vmark.toml` in the working directory, then
/// `--config`, then command-line flags.
fn load_cli_config(matches: &ArgMatches) -> VmarkConfig {
    let mut loader = Loader::new().with_optional_file(PROJECT_CONFIG_FILE);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }

    let overridden = apply_flag_overrides(loader, matches);
    overridden
        .and_then(Loader::build)
        .unwrap_or_else(|err| {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        })
}

fn apply_flag_overrides(
    mut loader: Loader,
    matches: &ArgMatches,
) -> Result<Loader, ConfigError> {
    if matches.get_flag("preserve-line-breaks") {
        loader = loader.set_override("markdown.preserve_line_breaks", true)?;
    }
    if let Some(style) = matches.get_one::<String>("hard-break-style") {
        loader = loader.set_override("markdown.hard_break_style", style.as_str())?;
    }
    if matches.get_flag("strict") {
        loader = loader.set_override("pipeline.strict", true)?;
    }
    Ok(loader)
}

fn handle_convert_command(registry: &FormatRegistry, sub: &ArgMatches) {
    let input = required(sub, "input");
    let to = required(sub, "to");
    let from = match sub.get_one::<String>("from") {
        Some(from) => from.clone(),
        None => registry
            .detect_format_from_filename(input)
            .unwrap_or_else(|| {
                eprintln!("Error: Could not detect format from filename '{input}'");
                eprintln!("Please specify --from explicitly");
                std::process::exit(1);
            }),
    };

    for name in [from.as_str(), to] {
        if let Err(e) = registry.get(name) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_input(input);
    let doc = registry.parse(&source, &from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let text = registry.serialize(&doc, to).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    });

    match sub.get_one::<String>("output") {
        Some(path) => fs::write(path, text).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{text}"),
    }
}

fn handle_inspect_command(
    pipeline: &Pipeline,
    source: &str,
    view: &str,
    options: Option<&PipelineOptions>,
) {
    match view {
        "sniff" => {
            let report = json!({
                "bytes": source.len(),
                "needs": ExtensionNeeds::detect(source),
                "fast_path_eligible": options.is_none() && fast_path_eligible(source),
            });
            println!("{report:#}");
        }
        "syntax" => {
            let tree = pipeline.syntax_tree(source, options).unwrap_or_else(|e| {
                eprintln!("Parse error: {e}");
                std::process::exit(1);
            });
            println!("{tree:#?}");
        }
        _ => {
            let doc = parse_or_exit(pipeline, source, options);
            print!("{}", to_json(&doc));
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_else(|| {
            eprintln!("Missing required argument '{name}'");
            std::process::exit(2);
        })
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn parse_or_exit(pipeline: &Pipeline, source: &str, options: Option<&PipelineOptions>) -> Document {
    pipeline.parse(source, options).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    })
}

fn serialize_or_exit(pipeline: &Pipeline, doc: &Document, options: Option<&PipelineOptions>) -> String {
    pipeline.serialize(doc, options).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    })
}

fn to_json(doc: &Document) -> String {
    match serde_json::to_string_pretty(doc) {
        Ok(json) => json + "\n",
        Err(e) => {
            eprintln!("Could not encode document: {e}");
            std::process::exit(1);
        }
    }
}

/// One line per block, indented by depth.
fn outline(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.children {
        outline_node(node, 0, &mut out);
    }
    out
}

fn outline_node(node: &DocNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let line = match node {
        DocNode::Paragraph { content } => format!("paragraph {}", run_summary(content)),
        DocNode::Heading { level, content } => format!("heading {level} {}", run_summary(content)),
        DocNode::CodeBlock { language, code } => format!(
            "code_block {} ({} lines)",
            language.as_deref().unwrap_or("-"),
            code.lines().count()
        ),
        DocNode::MathBlock { .. } => "math_block".to_string(),
        DocNode::Blockquote { .. } => "blockquote".to_string(),
        DocNode::List {
            ordered,
            tight,
            items,
            ..
        } => format!(
            "{} list, {} items{}",
            if *ordered { "ordered" } else { "bullet" },
            items.len(),
            if *tight { "" } else { ", loose" }
        ),
        DocNode::HorizontalRule => "horizontal_rule".to_string(),
        DocNode::Table { alignments, rows } => {
            format!("table {}x{}", rows.len(), alignments.len())
        }
        DocNode::HtmlBlock { .. } => "html_block".to_string(),
        DocNode::Frontmatter { .. } => "frontmatter".to_string(),
        DocNode::Details { summary, .. } => format!("details {summary:?}"),
        DocNode::Alert { kind, .. } => format!("alert {}", kind.label()),
        DocNode::FootnoteDefinition { label, .. } => format!("footnote_definition {label}"),
        DocNode::LinkDefinition { identifier, url, .. } => {
            format!("link_definition {identifier} -> {url}")
        }
    };
    out.push_str(&indent);
    out.push_str(&line);
    out.push('\n');

    match node {
        DocNode::Blockquote { children }
        | DocNode::Details { children, .. }
        | DocNode::Alert { children, .. }
        | DocNode::FootnoteDefinition { children, .. } => {
            for child in children {
                outline_node(child, depth + 1, out);
            }
        }
        DocNode::List { items, .. } => {
            for item in items {
                out.push_str(&"  ".repeat(depth + 1));
                out.push_str(match item.checked {
                    Some(true) => "item [x]\n",
                    Some(false) => "item [ ]\n",
                    None => "item\n",
                });
                for child in &item.children {
                    outline_node(child, depth + 2, out);
                }
            }
        }
        _ => {}
    }
}

fn run_summary(runs: &[Run]) -> String {
    let marked = runs.iter().filter(|run| !run.marks.is_empty()).count();
    match (runs.len(), marked) {
        (1, 0) => "(1 run)".to_string(),
        (count, 0) => format!("({count} runs)"),
        (count, marked) => format!("({count} runs, {marked} marked)"),
    }
}
