use serde::{Deserialize, Serialize};

/// Recognized URL operations. Anything else fails request deserialization
/// and is reported as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlOperation {
    Canonical,
    Redirection,
    All,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessUrlRequest {
    pub operation: UrlOperation,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessedUrlResponse {
    pub processed_url: String,
}
