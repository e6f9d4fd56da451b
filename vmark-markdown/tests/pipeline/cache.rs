use std::sync::Arc;
use vmark_markdown::{HardBreakStyle, Pipeline, PipelineConfig, PipelineOptions};

fn pipeline(capacity: usize) -> Pipeline {
    Pipeline::new(PipelineConfig {
        cache_capacity: capacity,
        cache_min_bytes: 0,
        ..PipelineConfig::default()
    })
}

#[test]
fn test_identical_input_reuses_the_tree() {
    let pipeline = pipeline(8);
    let first = pipeline.syntax_tree("Some *text*", None).unwrap();
    let second = pipeline.syntax_tree("Some *text*", None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pipeline.cache_len(), 1);

    let doc = pipeline.parse("Some *text*", None).unwrap();
    assert_eq!(pipeline.parse("Some *text*", None).unwrap(), doc);
    assert_eq!(pipeline.cache_len(), 1);
}

#[test]
fn test_text_and_options_both_key_the_cache() {
    let pipeline = pipeline(8);
    pipeline.parse("alpha", None).unwrap();
    assert_eq!(pipeline.cache_len(), 1);

    pipeline.parse("beta", None).unwrap();
    assert_eq!(pipeline.cache_len(), 2);

    let options = PipelineOptions {
        preserve_line_breaks: true,
        hard_break_style: HardBreakStyle::TrailingSpaces,
    };
    pipeline.parse("beta", Some(&options)).unwrap();
    assert_eq!(pipeline.cache_len(), 3);

    pipeline.parse("beta", Some(&PipelineOptions::default())).unwrap();
    assert_eq!(pipeline.cache_len(), 4);
}

#[test]
fn test_capacity_is_never_exceeded() {
    let pipeline = pipeline(3);
    for index in 0..10 {
        pipeline.parse(&format!("paragraph {index}"), None).unwrap();
        assert!(pipeline.cache_len() <= 3);
    }
    assert_eq!(pipeline.cache_len(), 3);
    assert_eq!(pipeline.cache_stats().evictions, 7);
}

#[test]
fn test_default_minimum_skips_small_documents() {
    let pipeline = Pipeline::default();
    pipeline.parse("# small", None).unwrap();
    assert_eq!(pipeline.cache_len(), 0);

    let large = "A line of text that repeats.\n\n".repeat(200);
    pipeline.parse(&large, None).unwrap();
    pipeline.parse(&large, None).unwrap();
    assert_eq!(pipeline.cache_len(), 1);
    assert_eq!(pipeline.cache_stats().hits, 1);
}
