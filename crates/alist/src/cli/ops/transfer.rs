use std::fmt;

use owo_colors::OwoColorize;

use alistfs::{Fs, Object};
use common::{FsError, PathKey};
use tokio_util::sync::CancellationToken;

/// How a file ended up at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ServerSide,
    Client,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::ServerSide => write!(f, "{}", "server-side".green()),
            Method::Client => write!(f, "{}", "download + upload".yellow()),
        }
    }
}

/// Stream `src` through this process into `dst` of `dst_fs`
pub async fn copy_via_client(
    src: &Object,
    dst_fs: &Fs,
    dst: &PathKey,
    cancel: &CancellationToken,
) -> Result<Object, FsError> {
    let data = src.open(cancel).await?;
    dst_fs.put(dst, data, Some(src.modified()), cancel).await
}
