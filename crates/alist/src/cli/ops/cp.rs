use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use super::transfer::{copy_via_client, Method};
use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Cp {
    /// File to copy, as remote:path
    pub source: RemotePath,

    /// Destination file, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct CpOutput {
    pub source: RemotePath,
    pub target: RemotePath,
    pub method: Method,
}

impl fmt::Display for CpOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({})",
            "Copied".green().bold(),
            self.source,
            self.target,
            self.method
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CpError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("copy failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cp {
    type Error = CpError;
    type Output = CpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (src_fs, src_path) = ctx.open(&self.source).await?;
        let (dst_fs, dst_path) = ctx.open(&self.target).await?;
        let object = src_fs.new_object(&src_path, &ctx.cancel).await?;

        let method = match dst_fs.copy_object(&object, &dst_path, &ctx.cancel).await {
            Ok(_) => Method::ServerSide,
            Err(e) if e.fallback().is_some() => {
                tracing::info!(src = %self.source, dst = %self.target, reason = %e, "copying through the client");
                copy_via_client(&object, &dst_fs, &dst_path, &ctx.cancel).await?;
                Method::Client
            }
            Err(e) => return Err(e.into()),
        };

        Ok(CpOutput {
            source: self.source.clone(),
            target: self.target.clone(),
            method,
        })
    }
}
