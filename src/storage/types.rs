use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one key in local storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Storage key
    pub key: String,
    /// Length of the stored value in bytes
    pub size: usize,
    /// When the key was last written
    pub updated_at: DateTime<Utc>,
}
