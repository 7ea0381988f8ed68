//! Remote definitions loaded from `config.toml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::{EncodingPolicy, PacerConfig, PathKey};
use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the config file inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("remote not found in config: {0}")]
    UnknownRemote(String),
    #[error("invalid api_url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{0} must be set when no token is configured")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteConfig>,
}

impl Config {
    /// `<config dir>/alistfs/config.toml` for the current platform
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("", "", "alistfs")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`, or from [`Config::default_path`]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn remote(&self, name: &str) -> Result<&RemoteConfig, ConfigError> {
        self.remotes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRemote(name.to_string()))
    }
}

fn default_backend() -> String {
    "alist".to_string()
}

/// One `[remotes.NAME]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(rename = "type", default = "default_backend")]
    pub backend: String,
    /// Server address, e.g. `http://localhost:5244`
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Remote path every filesystem path is resolved under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(default)]
    pub encoding: EncodingPolicy,
    #[serde(default)]
    pub pacer: PacerConfig,
}

/// How a connection authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Login { username: String, password: String },
}

impl RemoteConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            backend: default_backend(),
            api_url: api_url.into(),
            token: None,
            username: None,
            password: None,
            root_path: None,
            encoding: EncodingPolicy::default(),
            pacer: PacerConfig::default(),
        }
    }

    /// Parsed server URL: http or https, non-empty host, no trailing slash
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let raw = self.api_url.trim();
        let invalid = |reason: &str| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("only http and https are supported"));
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(url),
            _ => Err(invalid("missing host")),
        }
    }

    /// Static token when set, otherwise username and password
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token.to_string()));
        }
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingCredential("username"))?;
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingCredential("password"))?;
        Ok(Credentials::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        self.credentials()?;
        Ok(())
    }

    /// `root_path` joined ahead of the path given at connect time
    pub fn resolve_root(&self, root: &str) -> PathKey {
        match self.root_path.as_deref() {
            Some(base) => PathKey::parse(base).join(root),
            None => PathKey::parse(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_api_url_rules() {
        let url = RemoteConfig::new("http://localhost:5244/").api_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:5244/");
        let url = RemoteConfig::new("https://example.com/alist/").api_url().unwrap();
        assert_eq!(url.path(), "/alist");

        assert!(RemoteConfig::new("").api_url().is_err());
        assert!(RemoteConfig::new("ftp://example.com").api_url().is_err());
        assert!(RemoteConfig::new("not a url").api_url().is_err());
        assert!(RemoteConfig::new("file:///tmp").api_url().is_err());
    }

    #[test]
    fn test_credentials() {
        let mut config = RemoteConfig::new("http://localhost:5244");
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::MissingCredential("username"))
        ));

        config.username = Some("admin".into());
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::MissingCredential("password"))
        ));

        config.password = Some("secret".into());
        assert_eq!(
            config.credentials().unwrap(),
            Credentials::Login {
                username: "admin".into(),
                password: "secret".into()
            }
        );

        config.token = Some("tok".into());
        assert_eq!(config.credentials().unwrap(), Credentials::Token("tok".into()));
    }

    #[test]
    fn test_resolve_root() {
        let mut config = RemoteConfig::new("http://localhost:5244");
        assert_eq!(config.resolve_root("").as_str(), "/");
        assert_eq!(config.resolve_root("a/b/").as_str(), "/a/b");

        config.root_path = Some("/storage/".into());
        assert_eq!(config.resolve_root("").as_str(), "/storage");
        assert_eq!(config.resolve_root("/sub/dir").as_str(), "/storage/sub/dir");
    }

    #[test]
    fn test_from_file_toml() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[remotes.home]
type = "alist"
api_url = "http://localhost:5244"
token = "abc"
root_path = "/storage"
encoding = "none"

[remotes.home.pacer]
min_sleep_ms = 5

[remotes.work]
api_url = "https://alist.example.com"
username = "me"
password = "pw"
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        let home = config.remote("home").unwrap();
        assert_eq!(home.encoding, EncodingPolicy::None);
        assert_eq!(home.pacer.min_sleep_ms, 5);
        assert_eq!(home.pacer.max_sleep_ms, PacerConfig::default().max_sleep_ms);
        assert_eq!(home.root_path.as_deref(), Some("/storage"));

        let work = config.remote("work").unwrap();
        assert_eq!(work.backend, "alist");
        assert_eq!(work.encoding, EncodingPolicy::Default);
        assert!(work.validate().is_ok());

        assert!(matches!(
            config.remote("missing"),
            Err(ConfigError::UnknownRemote(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/alistfs.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
