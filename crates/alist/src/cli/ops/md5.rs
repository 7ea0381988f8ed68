use std::fmt;

use clap::Args;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Md5 {
    /// File to hash, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct Md5Output {
    pub target: RemotePath,
    pub hash: Option<String>,
}

impl fmt::Display for Md5Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{}  {}", hash, self.target),
            None => write!(f, "{:32}  {}", "", self.target),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Md5Error {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("hash failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Md5 {
    type Error = Md5Error;
    type Output = Md5Output;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        let mut object = fs.new_object(&path, &ctx.cancel).await?;
        let hash = object.hash(&ctx.cancel).await?;
        Ok(Md5Output {
            target: self.target.clone(),
            hash,
        })
    }
}
