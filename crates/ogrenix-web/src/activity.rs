//! In-memory activity feed for the log page.
//!
//! Every entry corresponds to something that actually happened: a generation
//! starting or finishing, a block rendering for the first time, an error.
//! Block entries are deduplicated by content, so re-rendered snapshots of a
//! growing document do not flood the feed.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use ogrenix_render::BlockRecord;

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// "start" | "chart" | "diagram" | "sketch" | "complete" | "error"
    pub stage: String,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<ActivityEntry>,
    seen_blocks: HashSet<(String, String)>,
}

#[derive(Default)]
pub struct ActivityLog {
    inner: Mutex<Inner>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_stage(&self, stage: &str, message: impl Into<String>) {
        self.push(stage, message.into(), None);
    }

    pub fn record_error(&self, message: impl Into<String>) {
        self.push("error", message.into(), None);
    }

    /// Records each block the first time its content renders. Later
    /// snapshots of the same block are silent.
    pub fn record_blocks(&self, blocks: &[BlockRecord]) {
        for block in blocks {
            if !block.complete {
                continue;
            }
            let key = (block.kind.label().to_string(), block.content_hash.clone());
            if !self.lock().seen_blocks.insert(key) {
                continue;
            }
            let message = match &block.error {
                Some(error) => format!("{} render failed: {error}", block.kind),
                None => format!("{} rendered", block.kind),
            };
            let short = &block.content_hash[..block.content_hash.len().min(12)];
            self.push(block.kind.label(), message, Some(format!("content {short}")));
        }
    }

    fn push(&self, stage: &str, message: String, details: Option<String>) {
        let mut inner = self.lock();
        inner.entries.push(ActivityEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            stage: stage.to_string(),
            message,
            details,
        });
        if inner.entries.len() > MAX_ENTRIES {
            let excess = inner.entries.len() - MAX_ENTRIES;
            inner.entries.drain(..excess);
        }
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let inner = self.lock();
        inner.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.seen_blocks.clear();
    }
}
