use serde::{Deserialize, Serialize};

/// A completed page fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub url: String,
    /// Unix seconds, captured just before the request went out.
    pub fetched_at: i64,
    /// Wall-clock duration of the full transfer, send through body read.
    pub duration_ms: i64,
    pub body: String,
}
