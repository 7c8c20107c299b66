//! Panopto API types
//!
//! Domain references handed to the sync driver plus the wire records of the
//! folder and session listing endpoints.

use serde::{Deserialize, Serialize};

/// Top-level lecture folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
    /// Number of recorded sessions the platform reports for the folder
    pub session_count: u32,
}

/// Downloadable lecture recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    /// Direct MP4 download URL
    pub url: String,
    /// Display name, used as the destination file stem
    pub name: String,
}

/// Entry of `GET /Panopto/Api/Folders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub session_count: Option<u32>,
}

impl From<FolderRecord> for FolderRef {
    fn from(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            session_count: record.session_count.unwrap_or(0),
        }
    }
}

/// Body of `POST /Panopto/Services/Data.svc/GetSessions`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsRequest {
    pub query_parameters: SessionQuery,
}

/// Field order matches what the web client sends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub query: Option<String>,
    pub sort_column: u32,
    pub sort_ascending: bool,
    pub max_results: u32,
    pub page: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "folderID")]
    pub folder_id: String,
    pub bookmarked: bool,
    pub get_folder_data: bool,
    pub is_shared_with_me: bool,
    pub include_playlists: bool,
}

impl SessionsRequest {
    /// First page of a folder's sessions, oldest first.
    pub fn for_folder(folder_id: impl Into<String>, max_results: u32) -> Self {
        Self {
            query_parameters: SessionQuery {
                query: None,
                sort_column: 1,
                sort_ascending: true,
                max_results,
                page: 0,
                start_date: None,
                end_date: None,
                folder_id: folder_id.into(),
                bookmarked: false,
                get_folder_data: true,
                is_shared_with_me: false,
                include_playlists: true,
            },
        }
    }
}

/// Reply of the session listing; the payload sits under `d`.
#[derive(Debug, Deserialize)]
pub struct SessionsResponse {
    pub d: SessionsPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionsPayload {
    #[serde(default)]
    pub results: Vec<SessionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub ios_video_url: Option<String>,
    pub session_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_request_wire_format() {
        let body = serde_json::to_string(&SessionsRequest::for_folder("f-1", 50)).unwrap();

        assert_eq!(
            body,
            r#"{"queryParameters":{"query":null,"sortColumn":1,"sortAscending":true,"maxResults":50,"page":0,"startDate":null,"endDate":null,"folderID":"f-1","bookmarked":false,"getFolderData":true,"isSharedWithMe":false,"includePlaylists":true}}"#
        );
    }

    #[test]
    fn test_folder_record_missing_count() {
        let records: Vec<FolderRecord> =
            serde_json::from_str(r#"[{"Id":"a","Name":"CSE 143","SessionCount":null},{"Id":"b","Name":"MATH 124"}]"#)
                .unwrap();
        let folders: Vec<FolderRef> = records.into_iter().map(FolderRef::from).collect();

        assert_eq!(folders[0].session_count, 0);
        assert_eq!(folders[1].name, "MATH 124");
    }
}
