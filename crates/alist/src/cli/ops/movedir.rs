use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Movedir {
    /// Directory to move, as remote:path
    pub source: RemotePath,

    /// New location, as remote:path. Must not exist yet.
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct MovedirOutput {
    pub source: RemotePath,
    pub target: RemotePath,
}

impl fmt::Display for MovedirOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            "Moved directory".green().bold(),
            self.source,
            self.target
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MovedirError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("directory move failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Movedir {
    type Error = MovedirError;
    type Output = MovedirOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (src_fs, src_path) = ctx.open(&self.source).await?;
        let (dst_fs, dst_path) = ctx.open(&self.target).await?;
        dst_fs
            .dir_move(&src_fs, &src_path, &dst_path, &ctx.cancel)
            .await?;
        Ok(MovedirOutput {
            source: self.source.clone(),
            target: self.target.clone(),
        })
    }
}
