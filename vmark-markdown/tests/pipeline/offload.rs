use std::sync::Arc;
use vmark_markdown::ir::nodes::{Block, Inline, Root};
use vmark_markdown::offload::{OffloadAdapter, OffloadState, ParseJob};
use vmark_markdown::{FormatError, Pipeline, PipelineConfig, PipelineOptions};

fn job(
    f: impl Fn(&str, Option<&PipelineOptions>, bool) -> Result<Root, FormatError>
        + Send
        + Sync
        + 'static,
) -> ParseJob {
    Arc::new(f)
}

fn offloading_config() -> PipelineConfig {
    PipelineConfig {
        offload_threshold_bytes: 16,
        cache_min_bytes: 0,
        ..PipelineConfig::default()
    }
}

const LARGE: &str = "# Heading\n\nA paragraph with ==marks== and x^2^.\n";

#[tokio::test]
async fn test_large_inputs_are_offloaded() {
    let pipeline = Pipeline::new(offloading_config());
    let doc = pipeline.parse_async(LARGE, None).await.unwrap();
    assert_eq!(pipeline.offload_state(), OffloadState::Running);
    assert_eq!(pipeline.cache_len(), 1);

    pipeline.clear_cache();
    assert_eq!(pipeline.parse(LARGE, None).unwrap(), doc);
}

#[tokio::test]
async fn test_small_inputs_stay_in_place() {
    let pipeline = Pipeline::new(offloading_config());
    pipeline.parse_async("tiny", None).await.unwrap();
    assert_eq!(pipeline.offload_state(), OffloadState::Idle);
}

#[tokio::test]
async fn test_worker_crash_falls_back_for_good() {
    let job = job(|_, _, _| panic!("worker crashed"));
    let pipeline = Pipeline::with_offload(
        offloading_config(),
        OffloadAdapter::with_worker_job(16, true, job),
    );
    let expected = Pipeline::default().parse(LARGE, None).unwrap();

    let doc = pipeline.parse_async(LARGE, None).await.unwrap();
    assert_eq!(doc, expected);
    assert_eq!(pipeline.offload_state(), OffloadState::Failed);

    pipeline.clear_cache();
    let doc = pipeline.parse_async(LARGE, None).await.unwrap();
    assert_eq!(doc, expected);
}

#[tokio::test]
async fn test_worker_result_is_used_when_healthy() {
    let job = job(|_, _, _| {
        Ok(Root {
            children: vec![Block::Paragraph(vec![Inline::Text("from worker".into())])],
        })
    });
    let pipeline = Pipeline::with_offload(
        offloading_config(),
        OffloadAdapter::with_worker_job(16, true, job),
    );
    let doc = pipeline.parse_async(LARGE, None).await.unwrap();
    let markdown = pipeline.serialize(&doc, None).unwrap();
    assert_eq!(markdown, "from worker\n");
}

#[tokio::test]
async fn test_disabled_offload_parses_synchronously() {
    let pipeline = Pipeline::new(PipelineConfig {
        offload_enabled: false,
        ..offloading_config()
    });
    pipeline.parse_async(LARGE, None).await.unwrap();
    assert_eq!(pipeline.offload_state(), OffloadState::Failed);
}
