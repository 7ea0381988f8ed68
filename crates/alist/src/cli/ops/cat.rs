use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// File to print, as remote:path
    pub target: RemotePath,
    /// Start printing at this byte offset
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Print at most this many bytes
    #[arg(long)]
    pub count: Option<u64>,
}

impl Cat {
    /// The byte range to read, or `None` for the whole file
    fn range(&self) -> Option<std::ops::Range<u64>> {
        match (self.offset, self.count) {
            (0, None) => None,
            (offset, count) => Some(offset..count.map_or(u64::MAX, |c| offset.saturating_add(c))),
        }
    }
}

#[derive(Debug)]
pub enum CatContent {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug)]
pub struct CatOutput {
    pub target: RemotePath,
    pub size: usize,
    pub content: CatContent,
}

impl fmt::Display for CatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}  {} {} bytes",
            "File:".dimmed(),
            self.target.to_string().bold(),
            "Size:".dimmed(),
            self.size
        )?;
        match &self.content {
            CatContent::Text(text) => write!(f, "{text}"),
            CatContent::Binary(bytes) => {
                let hex = bytes
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{} {hex}", "Binary content (hex):".dimmed())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("read failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cat {
    type Error = CatError;
    type Output = CatOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        let object = fs.new_object(&path, &ctx.cancel).await?;
        let data = match self.range() {
            Some(range) => object.open_range(range, &ctx.cancel).await?,
            None => object.open(&ctx.cancel).await?,
        };

        let size = data.len();
        let content = match String::from_utf8(data.to_vec()) {
            Ok(text) => CatContent::Text(text),
            Err(e) => CatContent::Binary(e.into_bytes()),
        };
        Ok(CatOutput {
            target: self.target.clone(),
            size,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(offset: u64, count: Option<u64>) -> Cat {
        Cat {
            target: "remote:a.txt".parse().unwrap(),
            offset,
            count,
        }
    }

    #[test]
    fn test_cat_range() {
        assert_eq!(cat(0, None).range(), None);
        assert_eq!(cat(4, None).range(), Some(4..u64::MAX));
        assert_eq!(cat(4, Some(3)).range(), Some(4..7));
        assert_eq!(cat(0, Some(0)).range(), Some(0..0));
    }
}
