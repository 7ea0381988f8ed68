use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Purge {
    /// Directory to remove with all of its contents, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct PurgeOutput {
    pub target: RemotePath,
}

impl fmt::Display for PurgeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Purged".red().bold(), self.target)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("purge failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Purge {
    type Error = PurgeError;
    type Output = PurgeOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        fs.purge(&path, &ctx.cancel).await?;
        Ok(PurgeOutput {
            target: self.target.clone(),
        })
    }
}
