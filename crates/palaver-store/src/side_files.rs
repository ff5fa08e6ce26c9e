//! Optional side-file storage, gated by a single `enable_file_storage` flag.
//! When disabled the store never touches the filesystem beyond the SQLite
//! file itself.

use std::path::{Path, PathBuf};

use palaver_core::types::Draft;
use palaver_foundation::error::{PalaverError, StoreError};

/// Writes `first_draft.txt` and `first_draft.json` into a per-draft
/// directory under `base_dir`, mirroring the original recorder's layout.
/// Returns the directory path so it can be recorded alongside the draft.
pub fn write_side_files(base_dir: &Path, draft: &Draft) -> Result<String, PalaverError> {
    let created_at = chrono::DateTime::from_timestamp(draft.timestamp as i64, 0)
        .unwrap_or_else(chrono::Utc::now);
    let dir_name = format!("draft-{}", created_at.format("%Y-%m-%d_%H-%M-%S"));
    let dir: PathBuf = base_dir.join(dir_name);
    std::fs::create_dir_all(&dir).map_err(|e| PalaverError::Store(StoreError::Io(e.to_string())))?;

    std::fs::write(dir.join("first_draft.txt"), &draft.full_text)
        .map_err(|e| PalaverError::Store(StoreError::Io(e.to_string())))?;

    let json = serde_json::json!({
        "draft_id": draft.draft_id,
        "parent_draft_id": draft.parent_draft_id,
        "timestamp": draft.timestamp,
        "audio_start_time": draft.audio_start_time,
        "audio_end_time": draft.audio_end_time,
        "start_text": draft.start_text,
        "end_text": draft.end_text,
        "full_text": draft.full_text,
    });
    std::fs::write(
        dir.join("first_draft.json"),
        serde_json::to_string_pretty(&json).unwrap_or_default(),
    )
    .map_err(|e| PalaverError::Store(StoreError::Io(e.to_string())))?;

    Ok(dir.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_core::types::Draft;
    use uuid::Uuid;

    fn sample_draft() -> Draft {
        Draft {
            draft_id: Uuid::new_v4(),
            parent_draft_id: None,
            timestamp: 1_735_330_000.0,
            audio_start_time: 0.0,
            audio_end_time: 1.0,
            start_text: "rupert take this down".into(),
            end_text: "break break break".into(),
            full_text: "hello world".into(),
            start_matched_events: Vec::new(),
            end_matched_events: Vec::new(),
        }
    }

    #[test]
    fn writes_text_and_json_side_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_side_files(tmp.path(), &sample_draft()).unwrap();
        let txt = std::fs::read_to_string(Path::new(&dir).join("first_draft.txt")).unwrap();
        assert_eq!(txt, "hello world");
        assert!(Path::new(&dir).join("first_draft.json").exists());
    }
}
