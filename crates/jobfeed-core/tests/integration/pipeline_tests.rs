use std::sync::Arc;

use jobfeed_core::pipeline::{NO_JOBS_TEXT, NO_NEW_JOBS_TEXT, RunRequest};
use jobfeed_core::{Aggregator, PipelineContext, PipelineOutcome, SeenStore, Source};

use crate::common::{
    AnyDestination, Delivered, LineExtractor, PageFetcher, RecordingMessenger, jobs_named, page_of,
};

const BOARD: &str = "https://board.test/";
const SLOW: &str = "https://slow.test/";

type Ctx = PipelineContext<PageFetcher, LineExtractor, RecordingMessenger, AnyDestination>;

async fn context(page: &str, store_path: &std::path::Path) -> (Ctx, RecordingMessenger) {
    let messenger = RecordingMessenger::default();
    let aggregator = Aggregator::new(
        PageFetcher::new(&[(BOARD, page)]),
        vec![
            Source::new("slow", SLOW, LineExtractor),
            Source::new("board", BOARD, LineExtractor),
        ],
    );
    let store = Arc::new(SeenStore::load(store_path).await);
    let ctx = PipelineContext::new(aggregator, store, messenger.clone(), Arc::new(AnyDestination));
    (ctx, messenger)
}

#[tokio::test]
async fn scheduled_refresh_delivers_once_then_reports_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let page = page_of(&jobs_named(&["A", "B", "C"]));
    let (ctx, messenger) = context(&page, &dir.path().join("seen.json")).await;

    let first = ctx.run_pipeline("team", &RunRequest::scheduled()).await.unwrap();
    assert_eq!(first.emitted(), 3);

    let second = ctx.run_pipeline("team", &RunRequest::scheduled()).await.unwrap();
    assert_eq!(second, PipelineOutcome::NoNewJobs);

    let log = messenger.log();
    assert_eq!(
        log.last(),
        Some(&Delivered::Text("team".into(), NO_NEW_JOBS_TEXT.into()))
    );
    assert_eq!(messenger.batches_for("team").len(), 1);
}

#[tokio::test]
async fn seen_state_carries_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    let page = page_of(&jobs_named(&["A", "B"]));

    let (ctx, _) = context(&page, &path).await;
    ctx.run_pipeline("team", &RunRequest::scheduled()).await.unwrap();
    drop(ctx);

    let (restarted, messenger) = context(&page, &path).await;
    let outcome = restarted
        .run_pipeline("team", &RunRequest::scheduled())
        .await
        .unwrap();
    assert_eq!(outcome, PipelineOutcome::NoNewJobs);
    assert!(messenger.batches_for("team").is_empty());
}

#[tokio::test]
async fn destinations_keep_separate_seen_sets() {
    let dir = tempfile::tempdir().unwrap();
    let page = page_of(&jobs_named(&["A", "B"]));
    let (ctx, messenger) = context(&page, &dir.path().join("seen.json")).await;
    let ctx = Arc::new(ctx);

    let request = RunRequest::scheduled();
    let (a, b) = tokio::join!(
        ctx.run_pipeline("team", &request),
        ctx.run_pipeline("ops", &request),
    );
    assert_eq!(a.unwrap().emitted(), 2);
    assert_eq!(b.unwrap().emitted(), 2);
    assert_eq!(messenger.batches_for("team").len(), 1);
    assert_eq!(messenger.batches_for("ops").len(), 1);
}

#[tokio::test]
async fn empty_board_reports_no_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, messenger) = context("", &dir.path().join("seen.json")).await;

    let outcome = ctx
        .run_pipeline("team", &RunRequest::listing())
        .await
        .unwrap();
    assert_eq!(outcome, PipelineOutcome::NoJobsFound);
    assert_eq!(
        messenger.log(),
        vec![Delivered::Text("team".into(), NO_JOBS_TEXT.into())]
    );
}
