//! Google Drive API connector implementation
//!
//! Implements the `DestinationStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::DestinationResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::{DestinationStore, EntryKind, EntryQuery, RemoteEntry};
use bytes::{BufMut, Bytes, BytesMut};
use core_auth::AccessTokenSource;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{CreatedFile, FileMetadata, FilesListResponse, FOLDER_MIME_TYPE};

/// Google APIs host
const GOOGLE_API_BASE: &str = "https://www.googleapis.com";

/// Google Drive API connector
///
/// Every method makes exactly one API call; classification of failures into
/// transient and permanent happens here, retrying is left to the caller.
///
/// Metadata calls and media uploads can go through different clients: a
/// request timeout that suits a lookup aborts any upload slower than it.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::{DestinationStore, EntryQuery};
///
/// let connector = GoogleDriveConnector::new(http_client, token_store);
/// let hits = connector.find(&EntryQuery::folder("Panopto Videos", None)).await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    upload_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation, also used for uploads
    ///   until [`with_upload_client`](Self::with_upload_client) is called
    /// * `tokens` - bearer token source with the `drive` scope
    pub fn new(http_client: Arc<dyn HttpClient>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            upload_client: Arc::clone(&http_client),
            http_client,
            tokens,
            base_url: GOOGLE_API_BASE.to_string(),
        }
    }

    /// Send media uploads through `client`, typically one without a request timeout.
    pub fn with_upload_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.upload_client = client;
        self
    }

    /// Point the connector at another API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn authorized(&self, request: HttpRequest) -> Result<HttpRequest> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_token(token))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with(self.http_client.as_ref(), request).await
    }

    async fn send_with(&self, client: &dyn HttpClient, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.authorized(request).await?;
        let response = client.execute(request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            warn!(status = response.status, "Drive API request failed");
            Err(GoogleDriveError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            })
        }
    }

    async fn list(&self, query: &EntryQuery) -> Result<Vec<RemoteEntry>> {
        let url = format!(
            "{}/drive/v3/files?q={}&spaces=drive&fields={}",
            self.base_url,
            urlencoding::encode(&build_query(query)),
            urlencoding::encode("files(id,name)")
        );

        let response = self
            .send(HttpRequest::get(url).header("Accept", "application/json"))
            .await?;

        let list: FilesListResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })?;

        Ok(list
            .files
            .into_iter()
            .map(|file| RemoteEntry {
                id: file.id,
                name: file.name,
            })
            .collect())
    }

    async fn create(&self, client: &dyn HttpClient, request: HttpRequest) -> Result<String> {
        let response = self.send_with(client, request).await?;
        let created: CreatedFile = serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse create response: {}", e))
        })?;
        Ok(created.id)
    }
}

#[async_trait]
impl DestinationStore for GoogleDriveConnector {
    #[instrument(skip(self), fields(kind = ?query.kind, name = %query.name))]
    async fn find(&self, query: &EntryQuery) -> DestinationResult<Vec<RemoteEntry>> {
        let entries = self.list(query).await?;
        debug!(matches = entries.len(), "Drive lookup complete");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> DestinationResult<String> {
        let metadata = FileMetadata {
            name: name.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };

        let request = HttpRequest::post(format!("{}/drive/v3/files?fields=id", self.base_url))
            .json(&metadata)
            .map_err(GoogleDriveError::from)?;

        let id = self.create(self.http_client.as_ref(), request).await?;
        info!(folder_id = %id, "Created Drive folder");
        Ok(id)
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn create_file(
        &self,
        name: &str,
        parent: &str,
        mime_type: &str,
        content: Bytes,
    ) -> DestinationResult<String> {
        let metadata = FileMetadata {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: vec![parent.to_string()],
        };
        let boundary = format!("lecture-mirror-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, mime_type, &content)?;

        let request = HttpRequest::post(format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id",
            self.base_url
        ))
        .header(
            "Content-Type",
            format!("multipart/related; boundary={}", boundary),
        )
        .body(body);

        let id = self.create(self.upload_client.as_ref(), request).await?;
        info!(file_id = %id, "Uploaded file to Drive");
        Ok(id)
    }
}

/// Quote a value for a Drive search query string literal.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive search expression for an exact-name lookup.
pub fn build_query(query: &EntryQuery) -> String {
    let mut clauses = vec![format!("name = '{}'", escape_query_value(&query.name))];

    match query.kind {
        EntryKind::Folder => clauses.push(format!("mimeType = '{}'", FOLDER_MIME_TYPE)),
        EntryKind::File => clauses.push(format!("mimeType != '{}'", FOLDER_MIME_TYPE)),
    }

    if let Some(parent) = &query.parent {
        clauses.push(format!("'{}' in parents", escape_query_value(parent)));
    }

    clauses.push("trashed = false".to_string());
    clauses.join(" and ")
}

/// Assemble a `multipart/related` upload body: JSON metadata, then the media.
pub fn multipart_related(
    boundary: &str,
    metadata: &FileMetadata,
    mime_type: &str,
    content: &[u8],
) -> Result<Bytes> {
    let metadata_json = serde_json::to_vec(metadata)
        .map_err(|e| GoogleDriveError::ParseError(format!("Failed to encode metadata: {}", e)))?;

    let mut body = BytesMut::with_capacity(content.len() + metadata_json.len() + 256);
    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&metadata_json);
    body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Ok(body.freeze())
}
