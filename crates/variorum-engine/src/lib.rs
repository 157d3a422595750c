//! Variorum Engine - Orchestration layer
//!
//! Provides high-level command orchestration that coordinates between the
//! heatmap core and persistence, plus the deduplicating background task
//! manager render jobs run on.

pub mod commands;
pub mod tasks;

pub use commands::heatmap::{
    heatmap_task_id, invalidate_heatmap, view_heatmap, HeatmapRequest, HeatmapSources,
    HeatmapView,
};
pub use tasks::{Submission, TaskInfo, TaskManager, TaskState};
