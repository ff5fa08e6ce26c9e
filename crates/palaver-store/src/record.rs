//! Flat, durable projection of a [`palaver_core::Draft`]. Records carry no
//! audio; the store may optionally also keep a side file of text.

use chrono::{DateTime, Utc};
use palaver_core::types::{Draft, DraftId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub draft_id: DraftId,
    pub parent_draft_id: Option<DraftId>,
    pub timestamp: f64,
    pub audio_start_time: f64,
    pub audio_end_time: f64,
    pub start_text: String,
    pub end_text: String,
    pub full_text: String,
    pub directory_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DraftRecord {
    pub fn from_draft(draft: &Draft, directory_path: Option<String>) -> Self {
        Self {
            draft_id: draft.draft_id,
            parent_draft_id: draft.parent_draft_id,
            timestamp: draft.timestamp,
            audio_start_time: draft.audio_start_time,
            audio_end_time: draft.audio_end_time,
            start_text: draft.start_text.clone(),
            end_text: draft.end_text.clone(),
            full_text: draft.full_text.clone(),
            directory_path,
            created_at: Utc::now(),
        }
    }
}

/// Ordering for [`crate::DraftStore::get_since`] / pagination queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

impl Order {
    pub(crate) fn sql_keyword(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// Result of [`crate::DraftStore::get_family`]: the draft itself, its parent
/// (if `parent_draft_id` was set), and any children that name it as parent.
#[derive(Debug, Clone, Default)]
pub struct DraftFamily {
    pub draft: Option<DraftRecord>,
    pub parent: Option<DraftRecord>,
    pub children: Vec<DraftRecord>,
}
