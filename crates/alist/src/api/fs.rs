//! `/api/fs/*` requests

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{Client, RequestBuilder};
use serde::de::IgnoredAny;
use serde::Serialize;
use url::Url;

use super::types::{Item, ListData, PutData};
use super::{endpoint, ApiError, ApiRequest};

/// List a directory. `per_page = 0` asks for every entry at once.
#[derive(Debug, Clone, Serialize)]
pub struct ListRequest {
    pub path: String,
    pub password: String,
    pub page: u32,
    pub per_page: u32,
    pub refresh: bool,
}

impl ListRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: String::new(),
            page: 1,
            per_page: 0,
            refresh: false,
        }
    }
}

impl ApiRequest for ListRequest {
    type Response = ListData;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/fs/list")?).json(&self))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetRequest {
    pub path: String,
}

impl ApiRequest for GetRequest {
    type Response = Item;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/fs/get")?).json(&self))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MkdirRequest {
    pub path: String,
}

impl ApiRequest for MkdirRequest {
    type Response = IgnoredAny;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/fs/mkdir")?).json(&self))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveRequest {
    pub dir: String,
    pub names: Vec<String>,
}

impl ApiRequest for RemoveRequest {
    type Response = IgnoredAny;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/fs/remove")?).json(&self))
    }
}

/// Rename the object at `path` to `name` within the same directory
#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest {
    pub path: String,
    pub name: String,
}

impl ApiRequest for RenameRequest {
    type Response = IgnoredAny;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/fs/rename")?).json(&self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Move,
    Copy,
}

/// Move or copy `names` from `src_dir` into `dst_dir`, keeping their names
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    #[serde(skip)]
    pub kind: TransferKind,
    pub src_dir: String,
    pub dst_dir: String,
    pub names: Vec<String>,
}

impl ApiRequest for TransferRequest {
    type Response = IgnoredAny;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let route = match self.kind {
            TransferKind::Move => "/api/fs/move",
            TransferKind::Copy => "/api/fs/copy",
        };
        Ok(client.post(endpoint(base_url, route)?).json(&self))
    }
}

/// Move the whole tree at `src_dir` to `dst_dir` in one call
#[derive(Debug, Clone, Serialize)]
pub struct RecursiveMoveRequest {
    pub src_dir: String,
    pub dst_dir: String,
    pub overwrite: bool,
}

impl ApiRequest for RecursiveMoveRequest {
    type Response = IgnoredAny;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client
            .post(endpoint(base_url, "/api/fs/recursive_move")?)
            .json(&self))
    }
}

/// Synchronous streaming upload to `path`
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub path: String,
    pub body: Bytes,
    pub modified: Option<DateTime<Utc>>,
}

impl ApiRequest for PutRequest {
    type Response = PutData;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let mut request = client
            .put(endpoint(base_url, "/api/fs/put")?)
            .header("File-Path", encode_file_path(&self.path))
            .header("As-Task", "false")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, self.body.len());
        if let Some(modified) = self.modified {
            request = request.header(LAST_MODIFIED, modified.timestamp_millis());
        }
        Ok(request.body(self.body))
    }
}

/// Percent-encode a path for the `File-Path` header. The server unescapes
/// it as a path, so spaces must be `%20` rather than `+`.
pub fn encode_file_path(path: &str) -> String {
    url::form_urlencoded::byte_serialize(path.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
