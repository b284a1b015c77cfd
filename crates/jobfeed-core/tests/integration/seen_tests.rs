use std::sync::Arc;

use jobfeed_core::SeenStore;

use crate::common::{jobs_named, links};

#[tokio::test]
async fn abc_scenario_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SeenStore::load(dir.path().join("seen.json")).await);
    let jobs = jobs_named(&["A", "B", "C"]);

    let first = store.filter_new("team", &jobs).await;
    assert_eq!(first.links, links(&jobs));

    store.commit("team", &first.links).await.unwrap();
    let second = store.filter_new("team", &jobs).await;
    assert!(second.fresh.is_empty());

    // Another destination is unaffected.
    assert_eq!(store.filter_new("other", &jobs).await.fresh.len(), 3);
}

#[tokio::test]
async fn committed_links_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("seen.json");

    let store = Arc::new(SeenStore::load(&path).await);
    store.commit("team", &links(&jobs_named(&["A", "B"]))).await.unwrap();
    store.commit("ops", &links(&jobs_named(&["C"]))).await.unwrap();

    let reloaded = SeenStore::load(&path).await;
    assert_eq!(reloaded.snapshot().await, store.snapshot().await);
    assert_eq!(reloaded.seen_count("team").await, 2);
    assert_eq!(reloaded.seen_count("ops").await, 1);
}

#[tokio::test]
async fn corrupted_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    std::fs::write(&path, "{\"destinations\": {\"team\": [unterminated").unwrap();

    let store = Arc::new(SeenStore::load(&path).await);
    let jobs = jobs_named(&["A", "B", "C"]);
    assert_eq!(store.filter_new("team", &jobs).await.fresh.len(), 3);

    // The next commit replaces the broken file with a valid one.
    store.commit("team", &links(&jobs)).await.unwrap();
    let reloaded = SeenStore::load(&path).await;
    assert_eq!(reloaded.seen_count("team").await, 3);
}

#[tokio::test]
async fn concurrent_runs_for_one_destination_do_not_lose_links() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SeenStore::load(dir.path().join("seen.json")).await);

    let mut handles = Vec::new();
    for batch in [["A", "B"], ["B", "C"], ["C", "D"], ["D", "E"]] {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let guard = store.lock("team").await;
            let fresh = guard.filter_new(&jobs_named(&batch)).await;
            guard.commit(&fresh.links).await.unwrap();
            fresh.links
        }));
    }

    let mut delivered = Vec::new();
    for handle in handles {
        delivered.extend(handle.await.unwrap());
    }
    delivered.sort();
    // Every link delivered exactly once across the overlapping runs.
    assert_eq!(delivered.len(), 5);
    delivered.dedup();
    assert_eq!(delivered.len(), 5);
    assert_eq!(store.seen_count("team").await, 5);
}
