use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use alistfs::RemoteInfo;
use common::{FsError, Md5};

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Stat {
    /// File or directory to inspect, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct StatOutput {
    pub target: RemotePath,
    pub info: RemoteInfo,
}

impl fmt::Display for StatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.info.is_dir { "directory" } else { "file" };
        writeln!(f, "{} ({})", self.target.to_string().bold(), kind)?;
        writeln!(f, "  {} {}", "remote path:".dimmed(), self.info.path)?;
        writeln!(f, "  {} {}", "size:".dimmed(), self.info.size)?;
        writeln!(
            f,
            "  {} {}",
            "modified:".dimmed(),
            self.info.modified.to_rfc3339()
        )?;
        let md5 = match &self.info.md5 {
            Md5::Known(hash) => hash.clone(),
            Md5::Missing | Md5::Unfetched => "-".to_string(),
        };
        write!(f, "  {} {}", "md5:".dimmed(), md5)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("stat failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Stat {
    type Error = StatError;
    type Output = StatOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        let info = fs.stat(&path, &ctx.cancel).await?;
        Ok(StatOutput {
            target: self.target.clone(),
            info,
        })
    }
}
