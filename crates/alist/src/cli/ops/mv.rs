use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use super::transfer::{copy_via_client, Method};
use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// File to move, as remote:path
    pub source: RemotePath,

    /// Destination file, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct MvOutput {
    pub source: RemotePath,
    pub target: RemotePath,
    pub method: Method,
}

impl fmt::Display for MvOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({})",
            "Moved".green().bold(),
            self.source,
            self.target,
            self.method
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("move failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mv {
    type Error = MvError;
    type Output = MvOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (src_fs, src_path) = ctx.open(&self.source).await?;
        let (dst_fs, dst_path) = ctx.open(&self.target).await?;
        let object = src_fs.new_object(&src_path, &ctx.cancel).await?;

        let method = match dst_fs.move_object(&object, &dst_path, &ctx.cancel).await {
            Ok(_) => Method::ServerSide,
            Err(e) if e.fallback().is_some() => {
                tracing::info!(src = %self.source, dst = %self.target, reason = %e, "moving through the client");
                copy_via_client(&object, &dst_fs, &dst_path, &ctx.cancel).await?;
                object.remove(&ctx.cancel).await?;
                Method::Client
            }
            Err(e) => return Err(e.into()),
        };

        Ok(MvOutput {
            source: self.source.clone(),
            target: self.target.clone(),
            method,
        })
    }
}
