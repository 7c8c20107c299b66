//! Panopto folder and session enumeration

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::PanoptoConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{PanoptoError, Result};
use crate::types::{FolderRecord, FolderRef, SessionsRequest, SessionsResponse, VideoRef};

const FOLDERS_PATH: &str = "/Panopto/Api/Folders?parentId=null&folderSet=1&includeMyFolder=false&includePersonalFolders=true&page=0&sort=Depth&names[0]=SessionCount";
const SESSIONS_PATH: &str = "/Panopto/Services/Data.svc/GetSessions";
const MANIFEST_SUFFIX: &str = ".hls/master.m3u8";
const DOWNLOAD_SUFFIX: &str = ".mp4";

/// Read side of the mirror: what lecture folders and recordings exist.
#[async_trait]
pub trait LectureSource: Send + Sync {
    /// Every top-level folder visible to the session.
    async fn list_top_folders(&self) -> Result<Vec<FolderRef>>;

    /// Up to `limit` recordings of `folder_id`.
    ///
    /// `Ok(None)` means the platform refused the listing for this folder;
    /// callers skip the folder and carry on.
    async fn list_videos(&self, folder_id: &str, limit: u32) -> Result<Option<Vec<VideoRef>>>;
}

/// Panopto web API client
///
/// Must be built on an authenticated session; every call is one request
/// with no retry.
///
/// # Example
///
/// ```ignore
/// use provider_panopto::{LectureSource, PanoptoClient};
///
/// let client = PanoptoClient::new(Arc::new(session), &config.panopto);
/// for folder in client.list_top_folders().await? {
///     println!("{} ({} sessions)", folder.name, folder.session_count);
/// }
/// ```
pub struct PanoptoClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl PanoptoClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &PanoptoConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl LectureSource for PanoptoClient {
    #[instrument(skip(self))]
    async fn list_top_folders(&self) -> Result<Vec<FolderRef>> {
        let request = HttpRequest::get(self.url(FOLDERS_PATH)).header("Accept", "application/json");
        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Folder listing failed");
            return Err(PanoptoError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let records: Vec<FolderRecord> = serde_json::from_slice(&response.body)
            .map_err(|e| PanoptoError::ParseError(format!("Failed to parse folder list: {}", e)))?;

        let folders: Vec<FolderRef> = records.into_iter().map(FolderRef::from).collect();
        info!(count = folders.len(), "Listed lecture folders");
        Ok(folders)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self, folder_id: &str, limit: u32) -> Result<Option<Vec<VideoRef>>> {
        let request = HttpRequest::post(self.url(SESSIONS_PATH))
            .json(&SessionsRequest::for_folder(folder_id, limit))?;
        let response = self.http_client.execute(request).await?;

        if response.status != 200 {
            warn!(
                status = response.status,
                folder_id = folder_id,
                "Session listing refused; skipping folder"
            );
            return Ok(None);
        }

        let sessions: SessionsResponse = serde_json::from_slice(&response.body).map_err(|e| {
            PanoptoError::ParseError(format!("Failed to parse session list: {}", e))
        })?;

        let videos: Vec<VideoRef> = sessions
            .d
            .results
            .into_iter()
            .filter_map(|record| match record.ios_video_url {
                Some(url) if !url.is_empty() => Some(VideoRef {
                    url: rewrite_manifest_url(&url),
                    name: record.session_name,
                }),
                _ => {
                    debug!(session = %record.session_name, "Session has no video URL");
                    None
                }
            })
            .collect();

        debug!(count = videos.len(), "Listed sessions");
        Ok(Some(videos))
    }
}

/// Turn an HLS manifest URL into the direct MP4 download URL.
///
/// Only a trailing `.hls/master.m3u8` is replaced; anything else is returned
/// unchanged.
///
/// ```
/// use provider_panopto::rewrite_manifest_url;
///
/// assert_eq!(
///     rewrite_manifest_url("https://cdn.example/abc.hls/master.m3u8"),
///     "https://cdn.example/abc.mp4"
/// );
/// ```
pub fn rewrite_manifest_url(url: &str) -> String {
    match url.strip_suffix(MANIFEST_SUFFIX) {
        Some(stem) => format!("{}{}", stem, DOWNLOAD_SUFFIX),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpMethod, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
            final_url: None,
        }
    }

    fn client(mock: MockHttpClient) -> PanoptoClient {
        PanoptoClient::new(Arc::new(mock), &PanoptoConfig::default())
    }

    #[test]
    fn test_rewrite_only_touches_suffix() {
        assert_eq!(
            rewrite_manifest_url("https://x/y.hls/master.m3u8"),
            "https://x/y.mp4"
        );
        assert_eq!(
            rewrite_manifest_url("https://x/y.hls/master.m3u8?token=1"),
            "https://x/y.hls/master.m3u8?token=1"
        );
        assert_eq!(
            rewrite_manifest_url("https://x/a.hls/master.m3u8/b.hls/master.m3u8"),
            "https://x/a.hls/master.m3u8/b.mp4"
        );
        assert_eq!(rewrite_manifest_url("https://x/y.mp4"), "https://x/y.mp4");
    }

    #[tokio::test]
    async fn test_list_top_folders() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url.starts_with("https://uw.hosted.panopto.com/Panopto/Api/Folders?parentId=null")
                    && req.url.ends_with("names[0]=SessionCount")
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"[{"Id":"f1","Name":"CSE 143 Au21","SessionCount":5},
                        {"Id":"f2","Name":"MATH 124","SessionCount":0}]"#,
                ))
            });

        let folders = client(mock).list_top_folders().await.unwrap();

        assert_eq!(
            folders,
            vec![
                FolderRef {
                    id: "f1".to_string(),
                    name: "CSE 143 Au21".to_string(),
                    session_count: 5
                },
                FolderRef {
                    id: "f2".to_string(),
                    name: "MATH 124".to_string(),
                    session_count: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_top_folders_error_status() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(401, "login required")));

        let err = client(mock).list_top_folders().await.unwrap_err();
        assert!(matches!(err, PanoptoError::ApiError { status_code: 401, .. }));
    }

    #[tokio::test]
    async fn test_list_videos_maps_results() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                let body = String::from_utf8_lossy(req.body.as_ref().unwrap()).to_string();
                req.method == HttpMethod::Post
                    && req.url == "https://uw.hosted.panopto.com/Panopto/Services/Data.svc/GetSessions"
                    && req.headers.get("Content-Type").map(String::as_str) == Some("application/json")
                    && body.contains(r#""folderID":"f1""#)
                    && body.contains(r#""maxResults":50"#)
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"d":{"Results":[
                        {"IosVideoUrl":"https://cdn/l1.hls/master.m3u8","SessionName":"Lecture 1"},
                        {"IosVideoUrl":null,"SessionName":"Audio only"},
                        {"IosVideoUrl":"https://cdn/l2.hls/master.m3u8","SessionName":"Lecture 2"}
                    ]}}"#,
                ))
            });

        let videos = client(mock).list_videos("f1", 50).await.unwrap().unwrap();

        assert_eq!(
            videos,
            vec![
                VideoRef {
                    url: "https://cdn/l1.mp4".to_string(),
                    name: "Lecture 1".to_string()
                },
                VideoRef {
                    url: "https://cdn/l2.mp4".to_string(),
                    name: "Lecture 2".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_videos_refused_is_gap() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "")));

        assert_eq!(client(mock).list_videos("f1", 50).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_videos_transport_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("reset".to_string())));

        let err = client(mock).list_videos("f1", 50).await.unwrap_err();
        assert!(matches!(err, PanoptoError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.url.starts_with("https://panopto.example.edu/Panopto/Api/Folders?"))
            .times(1)
            .returning(|_| Ok(response(200, "[]")));

        let config = PanoptoConfig {
            base_url: "https://panopto.example.edu/".to_string(),
            ..PanoptoConfig::default()
        };
        let client = PanoptoClient::new(Arc::new(mock), &config);
        assert!(client.list_top_folders().await.unwrap().is_empty());
    }
}
