//! Submission of a rescanned draft back to the source node. Grounded on
//! `save_rescan`: POSTs the revised draft, with `parent_draft_id` set to the
//! original's id, to a revision endpoint and awaits the reply.

use async_trait::async_trait;
use serde_json::json;

use palaver_core::types::Draft;
use palaver_foundation::error::{PalaverError, RouterError};

#[async_trait]
pub trait RevisionSink: Send + Sync {
    async fn submit(&self, revised: &Draft) -> Result<(), PalaverError>;
}

/// Posts to `{endpoint}` (e.g. `http://source-node:8080/new_draft`) over
/// plain HTTP; the routing/serialization on the receiving side is external
/// to this crate.
pub struct HttpRevisionSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRevisionSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RevisionSink for HttpRevisionSink {
    async fn submit(&self, revised: &Draft) -> Result<(), PalaverError> {
        let body = json!({
            "draft_id": revised.draft_id,
            "parent_draft_id": revised.parent_draft_id,
            "timestamp": revised.timestamp,
            "audio_start_time": revised.audio_start_time,
            "audio_end_time": revised.audio_end_time,
            "start_text": revised.start_text,
            "end_text": revised.end_text,
            "full_text": revised.full_text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PalaverError::Router(RouterError::RemoteProtocolError(e.to_string())))?;

        if !response.status().is_success() {
            return Err(PalaverError::Router(RouterError::RevisionSubmission {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            }));
        }
        Ok(())
    }
}
