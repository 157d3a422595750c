//! Heatmap View Integration Tests
//!
//! Drives the full pipeline against a real SQLite store: request
//! validation, background rendering, caching, deduplication, and refresh.
//!
//! ## Scenarios Covered
//!
//! 1. Sets with fewer than two witnesses are rejected outright
//! 2. Uncollated sets (zero tokenized length) are rejected
//! 3. A cache miss schedules a render; the finished rendering is served
//!    from the cache on the next request
//! 4. Identical concurrent requests share one task id
//! 5. Refresh drops the cache and re-renders
//! 6. Canceled renders leave no cache entry

use std::sync::Arc;
use std::time::Duration;

use variorum_core::model::{AlignedAnnotation, Alignment, DiffGroup, Range, Witness};
use variorum_core::sources::HeatmapCache;
use variorum_core::VariorumError;
use variorum_engine::{view_heatmap, HeatmapRequest, HeatmapSources, HeatmapView, TaskManager};
use variorum_store::{db, migrations, SqliteStore};

fn new_store() -> Arc<SqliteStore> {
    let mut conn = db::open_in_memory().unwrap();
    migrations::apply_migrations(&mut conn).unwrap();
    Arc::new(SqliteStore::new(conn))
}

fn sources(store: &Arc<SqliteStore>) -> HeatmapSources {
    HeatmapSources {
        sets: store.clone(),
        alignments: store.clone(),
        tokens: store.clone(),
        content: store.clone(),
        notes: store.clone(),
        revisions: store.clone(),
        page_breaks: store.clone(),
        cache: store.clone(),
    }
}

/// Two-witness set over "to be or not to be" with one aligned difference
fn seed_collated_set(store: &SqliteStore) {
    let folio = "to be or not to be";
    store.insert_witness(&Witness::new(1, "Folio"), folio).unwrap();
    store.insert_witness(&Witness::new(2, "Quarto"), "to be or to be").unwrap();
    store.insert_set(10, "Hamlet III.i").unwrap();
    store.add_set_witness(10, 1, 0, folio.len() as u64).unwrap();
    store.add_set_witness(10, 2, 1, 14).unwrap();
    // "not " differs
    store
        .insert_alignment(
            10,
            &Alignment::new(
                1,
                DiffGroup::Deletion,
                vec![
                    AlignedAnnotation::new(1, Range::new(9, 13)),
                    AlignedAnnotation::new(2, Range::new(9, 9)),
                ],
            ),
        )
        .unwrap();
    for start in [0u64, 3, 6, 9, 13, 16] {
        store.insert_token_start(1, start).unwrap();
    }
}

fn request(set_id: i64) -> HeatmapRequest {
    HeatmapRequest {
        set_id,
        base_id: None,
        condensed: false,
        refresh: false,
        filter: Vec::new(),
    }
}

/// Poll until the request is answered from the cache
fn render_to_content(
    sources: &HeatmapSources,
    tasks: &TaskManager,
    req: &HeatmapRequest,
) -> String {
    for _ in 0..500 {
        match view_heatmap(sources, tasks, req).unwrap() {
            HeatmapView::Content(html) => return html,
            HeatmapView::Rendering { task_id } => {
                if let Some(info) = tasks.status(&task_id).unwrap() {
                    assert_ne!(
                        info.state,
                        variorum_engine::TaskState::Failed,
                        "render failed: {:?}",
                        info.note
                    );
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
    panic!("rendering never completed");
}

#[test]
fn test_single_witness_set_is_rejected() {
    let store = new_store();
    store.insert_witness(&Witness::new(1, "Only"), "alone").unwrap();
    store.insert_set(5, "lonely").unwrap();
    store.add_set_witness(5, 1, 0, 5).unwrap();

    let tasks = TaskManager::new(1);
    let err = view_heatmap(&sources(&store), &tasks, &request(5)).unwrap_err();
    assert_eq!(err, VariorumError::TooFewWitnesses { set_id: 5 });
    assert!(err.to_string().contains("Unable to view heatmap"));
}

#[test]
fn test_uncollated_set_asks_for_recollation() {
    let store = new_store();
    store.insert_witness(&Witness::new(1, "A"), "aaa").unwrap();
    store.insert_witness(&Witness::new(2, "B"), "bbb").unwrap();
    store.insert_set(6, "raw").unwrap();
    store.add_set_witness(6, 1, 0, 0).unwrap();
    store.add_set_witness(6, 2, 1, 0).unwrap();

    let tasks = TaskManager::new(1);
    let err = view_heatmap(&sources(&store), &tasks, &request(6)).unwrap_err();
    assert_eq!(err, VariorumError::MissingBaseLength { witness_id: 1 });
    assert!(err.to_string().contains("re-collate"));
}

#[test]
fn test_unknown_base_is_rejected() {
    let store = new_store();
    seed_collated_set(&store);
    let tasks = TaskManager::new(1);
    let mut req = request(10);
    req.base_id = Some(42);
    let err = view_heatmap(&sources(&store), &tasks, &req).unwrap_err();
    assert_eq!(err, VariorumError::WitnessNotFound { witness_id: 42 });
}

#[test]
fn test_render_then_serve_from_cache() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(2);

    // first request schedules a render
    let first = view_heatmap(&sources, &tasks, &request(10)).unwrap();
    assert!(matches!(first, HeatmapView::Rendering { .. }));

    let html = render_to_content(&sources, &tasks, &request(10));
    // the differing words carry a heat span; the rest of the text is plain
    assert!(html.contains("class=\"heatmap\""), "no heat span in: {html}");
    assert!(html.contains("to be or "));
    // full mode appends the witness change-index block
    assert!(html.contains("class=\"change-index\""));
    assert!(html.contains("\"id\":2"));
}

#[test]
fn test_condensed_rendering_omits_change_index() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(2);

    let mut req = request(10);
    req.condensed = true;
    let html = render_to_content(&sources, &tasks, &req);
    assert!(html.contains("class=\"heatmap\""));
    assert!(!html.contains("change-index"));
}

#[test]
fn test_identical_requests_share_one_task() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(2);

    let first = view_heatmap(&sources, &tasks, &request(10)).unwrap();
    let second = view_heatmap(&sources, &tasks, &request(10)).unwrap();
    match (first, second) {
        (HeatmapView::Rendering { task_id: a }, HeatmapView::Rendering { task_id: b }) => {
            assert_eq!(a, b);
        }
        (a, b) => panic!("expected two in-flight renderings, got {a:?} / {b:?}"),
    }
}

#[test]
fn test_distinct_filters_get_distinct_tasks() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(2);

    let plain = view_heatmap(&sources, &tasks, &request(10)).unwrap();
    let mut filtered_req = request(10);
    filtered_req.filter = vec![2];
    let filtered = view_heatmap(&sources, &tasks, &filtered_req).unwrap();
    match (plain, filtered) {
        (HeatmapView::Rendering { task_id: a }, HeatmapView::Rendering { task_id: b }) => {
            assert_ne!(a, b);
        }
        (a, b) => panic!("expected two in-flight renderings, got {a:?} / {b:?}"),
    }
}

#[test]
fn test_refresh_drops_cache_and_rerenders() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(2);

    let html = render_to_content(&sources, &tasks, &request(10));
    assert!(!html.is_empty());

    let mut refresh_req = request(10);
    refresh_req.refresh = true;
    let answer = view_heatmap(&sources, &tasks, &refresh_req).unwrap();
    assert!(matches!(answer, HeatmapView::Rendering { .. }));
}

#[test]
fn test_refresh_clears_cache_even_when_set_fails_validation() {
    // GIVEN a set that shrank to one witness after a rendering was cached
    let store = new_store();
    store.insert_witness(&Witness::new(1, "Only"), "alone").unwrap();
    store.insert_set(5, "lonely").unwrap();
    store.add_set_witness(5, 1, 0, 5).unwrap();
    store.write(5, "stalekey", false, "<span>stale</span>").unwrap();

    // WHEN a refresh request is rejected for too few witnesses
    let tasks = TaskManager::new(1);
    let mut req = request(5);
    req.refresh = true;
    let err = view_heatmap(&sources(&store), &tasks, &req).unwrap_err();
    assert_eq!(err, VariorumError::TooFewWitnesses { set_id: 5 });

    // THEN the stale rendering is gone anyway
    assert_eq!(store.read(5, "stalekey", false).unwrap(), None);
}

#[test]
fn test_canceled_render_leaves_no_cache_entry() {
    let store = new_store();
    seed_collated_set(&store);
    let sources = sources(&store);
    let tasks = TaskManager::new(1);

    // occupy the single worker so the render stays pending while we cancel
    tasks
        .submit(
            "blocker",
            Box::new(|_| {
                std::thread::sleep(Duration::from_millis(100));
                Ok(())
            }),
        )
        .unwrap();

    let task_id = match view_heatmap(&sources, &tasks, &request(10)).unwrap() {
        HeatmapView::Rendering { task_id } => task_id,
        other => panic!("expected rendering, got {other:?}"),
    };
    tasks.cancel(&task_id).unwrap();

    for _ in 0..500 {
        if let Some(info) = tasks.status(&task_id).unwrap() {
            if info.state.is_terminal() {
                assert_eq!(info.state, variorum_engine::TaskState::Canceled);
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let cached = store.read(10, &task_key(&task_id), false).unwrap();
    assert_eq!(cached, None);
}

/// Extract the visualization key back out of a heatmap task id
fn task_key(task_id: &str) -> String {
    // heatmap-{set}-{key}-{mode}
    let mut parts = task_id.split('-');
    let _tag = parts.next();
    let _set = parts.next();
    let key = parts.next().unwrap_or_default();
    key.to_string()
}
