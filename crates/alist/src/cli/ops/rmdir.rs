use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Rmdir {
    /// Empty directory to remove, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct RmdirOutput {
    pub target: RemotePath,
}

impl fmt::Display for RmdirOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Removed".green().bold(), self.target)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RmdirError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("rmdir failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rmdir {
    type Error = RmdirError;
    type Output = RmdirOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        fs.rmdir(&path, &ctx.cancel).await?;
        Ok(RmdirOutput {
            target: self.target.clone(),
        })
    }
}
