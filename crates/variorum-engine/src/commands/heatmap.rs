//! Heatmap view orchestration.
//!
//! ## Request pipeline (in order):
//! 1. Explicit refresh drops every cached rendering for the set
//! 2. Membership check (fewer than two witnesses is a hard stop)
//! 3. Base resolution (explicit id or first member)
//! 4. Tokenized-length check (zero means the set needs re-collation)
//! 5. Visualization identity derivation
//! 6. Cache hit returns content immediately
//! 7. Cache miss submits a deduplicated background render task
//!
//! The render job itself builds the change list, streams the base text
//! through the injector pipeline, and writes the cache only on full
//! success. A canceled or failed job leaves no cache entry behind.

use std::sync::Arc;

use tracing::{debug, info};
use variorum_core::inject::{
    pipeline, BreakInjector, ChangeInjector, NoteInjector, RevisionInjector,
};
use variorum_core::model::{SetId, SetWitness, VisualizationInfo, WitnessId};
use variorum_core::sources::{
    AlignmentSource, ContentSource, HeatmapCache, NoteSource, PageBreakSource, RevisionSource,
    SetSource, TokenIndex,
};
use variorum_core::{build_change_list, render_stream, CancelToken, Result, VariorumError};

use crate::tasks::TaskManager;

/// Alignment fetch page size for render jobs
const ALIGNMENT_BATCH_SIZE: usize = 1000;

/// Everything a heatmap render needs to read. All trait objects so one
/// store can serve every role or tests can substitute fakes per concern.
#[derive(Clone)]
pub struct HeatmapSources {
    pub sets: Arc<dyn SetSource>,
    pub alignments: Arc<dyn AlignmentSource>,
    pub tokens: Arc<dyn TokenIndex>,
    pub content: Arc<dyn ContentSource>,
    pub notes: Arc<dyn NoteSource>,
    pub revisions: Arc<dyn RevisionSource>,
    pub page_breaks: Arc<dyn PageBreakSource>,
    pub cache: Arc<dyn HeatmapCache>,
}

/// One heatmap request
#[derive(Debug, Clone)]
pub struct HeatmapRequest {
    pub set_id: SetId,
    /// Base witness; defaults to the set's first member
    pub base_id: Option<WitnessId>,
    /// Condensed renderings omit the witness change-index block
    pub condensed: bool,
    /// Drop all cached renderings for the set before answering
    pub refresh: bool,
    /// Witness ids excluded from this visualization
    pub filter: Vec<WitnessId>,
}

/// Outcome of a heatmap request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeatmapView {
    /// A finished rendering, straight from the cache
    Content(String),
    /// A render task is in flight; poll its status and ask again
    Rendering { task_id: String },
}

/// Stable task id for a rendering, so identical requests share one job
pub fn heatmap_task_id(set_id: SetId, key: &str, condensed: bool) -> String {
    format!(
        "heatmap-{set_id}-{key}-{}",
        if condensed { 'c' } else { 'f' }
    )
}

/// Answer a heatmap request from the cache, or schedule a render.
///
/// # Errors
/// * `TooFewWitnesses` - the set has fewer than two members
/// * `WitnessNotFound` - the requested base is not in the set
/// * `MissingBaseLength` - the set was never collated (or needs it again)
pub fn view_heatmap(
    sources: &HeatmapSources,
    tasks: &TaskManager,
    request: &HeatmapRequest,
) -> Result<HeatmapView> {
    // refresh comes first, so the cache is cleared even when the set no
    // longer passes validation below
    if request.refresh {
        info!(set = request.set_id, "explicit refresh; clearing cached renderings");
        sources.cache.delete_all(request.set_id)?;
    }

    let witnesses = sources.sets.witnesses(request.set_id)?;
    if witnesses.len() < 2 {
        return Err(VariorumError::TooFewWitnesses {
            set_id: request.set_id,
        });
    }

    let base_id = match request.base_id {
        Some(id) => {
            if !witnesses.iter().any(|w| w.id == id) {
                return Err(VariorumError::WitnessNotFound { witness_id: id });
            }
            id
        }
        None => witnesses[0].id,
    };

    let base_len = sources.sets.tokenized_length(request.set_id, base_id)?;
    if base_len == 0 {
        return Err(VariorumError::MissingBaseLength { witness_id: base_id });
    }

    let info = VisualizationInfo::new(request.set_id, base_id, request.filter.iter().copied());

    if let Some(content) = sources
        .cache
        .read(request.set_id, info.key(), request.condensed)?
    {
        debug!(set = request.set_id, key = info.key(), "cache hit");
        return Ok(HeatmapView::Content(content));
    }

    let task_id = heatmap_task_id(request.set_id, info.key(), request.condensed);
    let job_sources = sources.clone();
    let condensed = request.condensed;
    tasks.submit(
        &task_id,
        Box::new(move |cancel| render_heatmap(&job_sources, &info, base_len, condensed, cancel)),
    )?;
    Ok(HeatmapView::Rendering { task_id })
}

/// Drop every cached rendering for a set. Called after re-collation and by
/// the explicit refresh path.
pub fn invalidate_heatmap(sources: &HeatmapSources, set_id: SetId) -> Result<()> {
    sources.cache.delete_all(set_id)
}

/// The render job body. Runs on a task worker; only a fully successful
/// pass writes the cache.
fn render_heatmap(
    sources: &HeatmapSources,
    info: &VisualizationInfo,
    base_len: u64,
    condensed: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let base_id = info.base_id();
    let members = sources.sets.witnesses(info.set_id())?;
    let witness_count = members.len();
    let mut witnesses: Vec<SetWitness> = members
        .into_iter()
        .map(|w| {
            let is_base = w.id == base_id;
            SetWitness::new(w, base_len, is_base)
        })
        .collect();

    let changes = build_change_list(
        sources.alignments.as_ref(),
        sources.tokens.as_ref(),
        info,
        base_len,
        &mut witnesses,
        ALIGNMENT_BATCH_SIZE,
        cancel,
    )?;

    let content = sources.content.content(base_id)?;
    let mut injectors = pipeline(
        RevisionInjector::new(sources.revisions.revisions(base_id)?),
        BreakInjector::new(sources.page_breaks.page_breaks(base_id)?),
        NoteInjector::new(sources.notes.notes(base_id)?),
        ChangeInjector::new(changes, witness_count),
    );

    let mut html = render_stream(&content, &mut injectors, cancel)?;
    if !condensed {
        let block = change_index_block(&witnesses)?;
        html.try_reserve(block.len())?;
        html.push_str(&block);
    }

    cancel.ensure_active()?;
    sources
        .cache
        .write(info.set_id(), info.key(), condensed, &html)?;
    info!(set = info.set_id(), key = info.key(), condensed, "heatmap cached");
    Ok(())
}

/// JSON block carrying each comparison witness's change index, appended to
/// full (non-condensed) renderings for client-side display ranking.
fn change_index_block(witnesses: &[SetWitness]) -> Result<String> {
    let entries: Vec<serde_json::Value> = witnesses
        .iter()
        .filter(|w| !w.is_base())
        .map(|w| {
            serde_json::json!({
                "id": w.id(),
                "ci": format!("{:.2}", w.change_index()),
            })
        })
        .collect();
    let body = serde_json::to_string(&entries)?;
    Ok(format!(
        "<script type=\"application/json\" class=\"change-index\">{body}</script>"
    ))
}
