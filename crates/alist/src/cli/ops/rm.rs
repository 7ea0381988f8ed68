use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// File to delete, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct RmOutput {
    pub target: RemotePath,
    pub size: u64,
}

impl fmt::Display for RmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} bytes)",
            "Deleted".green().bold(),
            self.target,
            self.size
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("delete failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = RmOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        let object = fs.new_object(&path, &ctx.cancel).await?;
        object.remove(&ctx.cancel).await?;
        Ok(RmOutput {
            target: self.target.clone(),
            size: object.size(),
        })
    }
}
