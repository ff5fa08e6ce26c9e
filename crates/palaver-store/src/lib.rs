//! DraftStore: durable persistence for drafts, keyed by
//! `draft_id`, with parent/child lookups for rescans and optional side-file
//! text export.

pub mod record;
pub mod side_files;
pub mod store;

pub use record::{DraftFamily, DraftRecord, Order};
pub use store::DraftStore;
