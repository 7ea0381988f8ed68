use std::fmt;

use clap::Args;
use comfy_table::Table;

use alistfs::ListEntry;
use common::FsError;

use crate::cli::op::{OpenError, RemotePath};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list, as remote:path
    pub target: RemotePath,
}

#[derive(Debug)]
pub struct LsItem {
    pub is_dir: bool,
    pub name: String,
    pub size: Option<u64>,
    pub modified: String,
}

#[derive(Debug)]
pub struct LsOutput {
    pub items: Vec<LsItem>,
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "No items found");
        }

        let mut table = Table::new();
        table.set_header(vec!["TYPE", "NAME", "SIZE", "MODIFIED"]);
        for item in &self.items {
            let type_str = if item.is_dir { "dir" } else { "file" };
            table.add_row(vec![
                type_str.to_string(),
                item.name.clone(),
                item.size.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                item.modified.clone(),
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("list failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (fs, path) = ctx.open(&self.target).await?;
        let entries = fs.list(&path, &ctx.cancel).await?;

        let mut items: Vec<LsItem> = entries
            .into_iter()
            .map(|entry| match entry {
                ListEntry::Dir(dir) => LsItem {
                    is_dir: true,
                    name: dir.name,
                    size: None,
                    modified: dir.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
                },
                ListEntry::Object(object) => LsItem {
                    is_dir: false,
                    name: object.path().leaf().to_string(),
                    size: Some(object.size()),
                    modified: object.modified().format("%Y-%m-%d %H:%M:%S").to_string(),
                },
            })
            .collect();
        items.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

        Ok(LsOutput { items })
    }
}
