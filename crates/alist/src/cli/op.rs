use std::fmt;
use std::str::FromStr;

use tokio_util::sync::CancellationToken;

use alistfs::{BackendRegistry, Config, ConfigError, Fs};
use common::{FsError, PathKey};

/// One CLI command
#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: fmt::Display + fmt::Debug + Send;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Everything a command needs to reach its remotes
#[derive(Debug)]
pub struct OpContext {
    pub config: Config,
    pub registry: BackendRegistry,
    pub cancel: CancellationToken,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open remote {0:?}: {1}")]
    Connect(String, FsError),
}

impl OpContext {
    pub fn new(config: Config, registry: BackendRegistry, cancel: CancellationToken) -> Self {
        Self {
            config,
            registry,
            cancel,
        }
    }

    /// Connect to the remote named by `target` and return the path inside it
    pub async fn open(&self, target: &RemotePath) -> Result<(Fs, PathKey), OpenError> {
        let config = self.config.remote(&target.remote)?;
        let (fs, _) = self
            .registry
            .connect(&target.remote, "", config, &self.cancel)
            .await
            .map_err(|e| OpenError::Connect(target.remote.clone(), e))?;
        Ok((fs, PathKey::parse(&target.path)))
    }
}

/// A `remote:path` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub remote: String,
    pub path: String,
}

impl FromStr for RemotePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((remote, path)) if !remote.is_empty() => Ok(Self {
                remote: remote.to_string(),
                path: path.to_string(),
            }),
            _ => Err(format!("expected remote:path, got {s:?}")),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote, self.path)
    }
}

/// Build a `Command` enum over a list of ops, along with the `OpOutput`
/// and `OpError` enums that wrap each op's results.
#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $op:ty)),* $(,)?) => {
        #[derive(clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($op),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$op as $crate::cli::op::Op>::Output),)*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(OpOutput::$variant(output) => write!(f, "{output}"),)*
                }
            }
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$op as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => op
                            .execute(ctx)
                            .await
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_path_parsing() {
        let target: RemotePath = "home:/docs/a.txt".parse().unwrap();
        assert_eq!(target.remote, "home");
        assert_eq!(target.path, "/docs/a.txt");

        let target: RemotePath = "home:".parse().unwrap();
        assert_eq!(target.path, "");
        assert_eq!(target.to_string(), "home:");

        assert!("no-colon".parse::<RemotePath>().is_err());
        assert!(":path".parse::<RemotePath>().is_err());
    }
}
