use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Directory to create, as remote:path. Missing parents are created too.
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct MkdirOutput {
    pub target: RemotePath,
}

impl fmt::Display for MkdirOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Created".green().bold(), self.target)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("mkdir failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = MkdirOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        fs.mkdir(&path, &ctx.cancel).await?;
        Ok(MkdirOutput {
            target: self.target.clone(),
        })
    }
}
