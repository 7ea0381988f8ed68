use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Local file to upload
    pub source: PathBuf,

    /// Destination file, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct PutOutput {
    pub target: RemotePath,
    pub size: u64,
    pub hash: Option<String>,
}

impl fmt::Display for PutOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} ({} bytes)",
            "Uploaded".green().bold(),
            self.target,
            self.size
        )?;
        write!(
            f,
            "  {} {}",
            "md5:".dimmed(),
            self.hash.as_deref().unwrap_or("-")
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("upload failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Put {
    type Error = PutError;
    type Output = PutOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let read_err = |e: std::io::Error| PutError::Io(self.source.clone(), e);
        let data = tokio::fs::read(&self.source).await.map_err(read_err)?;
        let modified = tokio::fs::metadata(&self.source)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let (fs, path) = ctx.open(&self.target).await?;
        let object = fs.put(&path, Bytes::from(data), modified, &ctx.cancel).await?;

        Ok(PutOutput {
            target: self.target.clone(),
            size: object.size(),
            hash: object.md5().value().map(str::to_string),
        })
    }
}
