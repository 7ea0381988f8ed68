use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, RANGE};
use reqwest::{Client, StatusCode};
use url::Url;

use super::auth::{LoginRequest, MeRequest};
use super::error::{ApiError, CODE_OK};
use super::fs::{
    GetRequest, ListRequest, MkdirRequest, PutRequest, RecursiveMoveRequest, RemoveRequest,
    RenameRequest, TransferKind, TransferRequest,
};
use super::types::{Envelope, Item, PutData};
use super::{endpoint, ApiRequest};
use crate::remote::Remote;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ApiClient {
    remote: Url,
    client: Client,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("alistfs/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        // Routes are joined relative to the base, which needs a trailing slash
        let mut remote = remote.clone();
        if !remote.path().ends_with('/') {
            let path = format!("{}/", remote.path());
            remote.set_path(&path);
        }

        Ok(Self {
            remote,
            client,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<Option<T::Response>, ApiError> {
        let mut request_builder = request.build_request(&self.remote, &self.client)?;
        if let Some(token) = self.token() {
            request_builder = request_builder.header(AUTHORIZATION, token);
        }
        let response = request_builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?));
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T::Response> = serde_json::from_slice(&body)?;
        if envelope.code != CODE_OK {
            return Err(ApiError::api(envelope.code, envelope.message));
        }
        Ok(envelope.data)
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

/// `Range` header value for a half-open byte range
pub fn range_header(range: &Range<u64>) -> String {
    format!("bytes={}-{}", range.start, range.end.saturating_sub(1))
}

/// Cut `range` out of a full body
pub fn slice_range(body: Bytes, range: Range<u64>) -> Bytes {
    let len = body.len();
    let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(len);
    let end = usize::try_from(range.end).unwrap_or(usize::MAX).min(len);
    body.slice(start..end.max(start))
}

fn require<T>(data: Option<T>) -> Result<T, ApiError> {
    data.ok_or(ApiError::MissingData)
}

#[async_trait]
impl Remote for ApiClient {
    fn endpoint(&self) -> &Url {
        &self.remote
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    async fn ping(&self) -> Result<(), ApiError> {
        let response = self.client.get(endpoint(&self.remote, "/ping")?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?));
        }
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let data = self
            .call(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(require(data)?.token)
    }

    async fn whoami(&self) -> Result<String, ApiError> {
        Ok(require(self.call(MeRequest).await?)?.username)
    }

    async fn list(&self, path: &str) -> Result<Vec<Item>, ApiError> {
        let data = self.call(ListRequest::new(path)).await?;
        Ok(data.and_then(|d| d.content).unwrap_or_default())
    }

    async fn get_info(&self, path: &str) -> Result<Item, ApiError> {
        let data = self
            .call(GetRequest {
                path: path.to_string(),
            })
            .await?;
        require(data)
    }

    async fn mkdir(&self, path: &str) -> Result<(), ApiError> {
        self.call(MkdirRequest {
            path: path.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn remove(&self, dir: &str, names: &[String]) -> Result<(), ApiError> {
        self.call(RemoveRequest {
            dir: dir.to_string(),
            names: names.to_vec(),
        })
        .await?;
        Ok(())
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ApiError> {
        self.call(RenameRequest {
            path: path.to_string(),
            name: new_name.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn move_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError> {
        self.call(TransferRequest {
            kind: TransferKind::Move,
            src_dir: src_dir.to_string(),
            dst_dir: dst_dir.to_string(),
            names: names.to_vec(),
        })
        .await?;
        Ok(())
    }

    async fn copy_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError> {
        self.call(TransferRequest {
            kind: TransferKind::Copy,
            src_dir: src_dir.to_string(),
            dst_dir: dst_dir.to_string(),
            names: names.to_vec(),
        })
        .await?;
        Ok(())
    }

    async fn recursive_move(&self, src_dir: &str, dst_dir: &str, overwrite: bool) -> Result<(), ApiError> {
        self.call(RecursiveMoveRequest {
            src_dir: src_dir.to_string(),
            dst_dir: dst_dir.to_string(),
            overwrite,
        })
        .await?;
        Ok(())
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        modified: Option<DateTime<Utc>>,
    ) -> Result<Option<PutData>, ApiError> {
        self.call(PutRequest {
            path: path.to_string(),
            body,
            modified,
        })
        .await
    }

    async fn download(&self, raw_url: &str, range: Option<Range<u64>>) -> Result<Bytes, ApiError> {
        // Absolute raw URLs replace the base entirely
        let url = self.remote.join(raw_url)?;
        let mut request = self.client.get(url);
        if let Some(range) = &range {
            request = request.header(RANGE, range_header(range));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?));
        }
        let body = response.bytes().await?;

        match range {
            Some(range) if status != StatusCode::PARTIAL_CONTENT => {
                tracing::debug!(%status, "server ignored the range, slicing locally");
                Ok(slice_range(body, range))
            }
            _ => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header_is_inclusive() {
        assert_eq!(range_header(&(0..10)), "bytes=0-9");
        assert_eq!(range_header(&(5..6)), "bytes=5-5");
    }

    #[test]
    fn test_slice_range_clamps_to_body() {
        let body = Bytes::from_static(b"0123456789");
        assert_eq!(slice_range(body.clone(), 2..5).as_ref(), b"234");
        assert_eq!(slice_range(body.clone(), 8..100).as_ref(), b"89");
        assert!(slice_range(body, 20..30).is_empty());
    }
}
