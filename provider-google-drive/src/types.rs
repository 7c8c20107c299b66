//! Google Drive API types
//!
//! Data structures for Google Drive API v3 requests and responses.

use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Google Drive API file resource (only the fields the mirror asks for)
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Google Drive API files.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Reply of files.create with `fields=id`
#[derive(Debug, Deserialize)]
pub struct CreatedFile {
    pub id: String,
}

/// Metadata sent with files.create
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Error envelope returned by Drive API v3
///
/// See: https://developers.google.com/drive/api/guides/handle-errors
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reason: String,
}

/// Reasons Drive attaches to a `403` when the caller should back off.
pub const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

impl ApiErrorResponse {
    /// Whether the body reports a rate limit.
    pub fn is_rate_limited(body: &str) -> bool {
        serde_json::from_str::<ApiErrorResponse>(body)
            .map(|response| {
                response
                    .error
                    .errors
                    .iter()
                    .any(|detail| RATE_LIMIT_REASONS.contains(&detail.reason.as_str()))
            })
            .unwrap_or(false)
    }
}
