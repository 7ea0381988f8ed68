//! Remote primitives the filesystem planner is built on
//!
//! Each method is exactly one round trip. Retries, cancellation and the
//! meaning of envelope codes are decided by the caller.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use url::Url;

use crate::api::{ApiError, Item, PutData};

#[async_trait]
pub trait Remote: Send + Sync {
    /// Identity of the server instance; two handles with equal endpoints
    /// can perform server-side moves between each other.
    fn endpoint(&self) -> &Url;

    /// Token sent with every subsequent call
    fn set_token(&self, token: Option<String>);

    async fn ping(&self) -> Result<(), ApiError>;

    /// Exchange credentials for a token
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError>;

    /// Name of the user the current token belongs to
    async fn whoami(&self) -> Result<String, ApiError>;

    async fn list(&self, path: &str) -> Result<Vec<Item>, ApiError>;

    async fn get_info(&self, path: &str) -> Result<Item, ApiError>;

    async fn mkdir(&self, path: &str) -> Result<(), ApiError>;

    async fn remove(&self, dir: &str, names: &[String]) -> Result<(), ApiError>;

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ApiError>;

    async fn move_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError>;

    async fn copy_items(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<(), ApiError>;

    async fn recursive_move(&self, src_dir: &str, dst_dir: &str, overwrite: bool) -> Result<(), ApiError>;

    /// Upload `body` to `path`. `None` means the server acknowledged without
    /// any data describing the result.
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        modified: Option<DateTime<Utc>>,
    ) -> Result<Option<PutData>, ApiError>;

    /// Fetch the content behind a raw URL, or only the bytes in `range`.
    /// The returned body never extends past the range, even when the
    /// server ignores it.
    async fn download(&self, raw_url: &str, range: Option<Range<u64>>) -> Result<Bytes, ApiError>;
}
