use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata row for an uploaded CV. The bytes live in the storage bucket at
/// `storage_path`; this row and the object are created and removed together
/// (best effort, no cross-store transaction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,

    /// Owning candidate. One canonical column name; earlier revisions mixed
    /// `user_id` and `candidate_id`.
    pub candidate_id: Uuid,

    pub file_name: String,

    pub storage_path: String,

    #[serde(default)]
    pub file_type: Option<String>,

    pub uploaded_at: DateTime<Utc>,
}
