use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ConfigError;
use crate::maven::coordinates::MavenVersion;
use crate::maven::layout::RepositoryLayout;

pub const CENTRAL_ID: &str = "central";
pub const CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// When a file already present in the local repository is checked against the remote again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    Always,
    Daily,
    Interval(Duration),
    Never,
}
impl UpdatePolicy {
    pub fn is_update_required(&self, last_updated: SystemTime, now: SystemTime) -> bool {
        let age = now.duration_since(last_updated).unwrap_or_default();
        match self {
            UpdatePolicy::Always => true,
            UpdatePolicy::Daily => age >= Duration::from_secs(24 * 60 * 60),
            UpdatePolicy::Interval(interval) => age >= *interval,
            UpdatePolicy::Never => false,
        }
    }
}
impl FromStr for UpdatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPolicy { setting: "update policy", value: s.to_string() };

        match s.trim() {
            "always" => Ok(UpdatePolicy::Always),
            "daily" => Ok(UpdatePolicy::Daily),
            "never" => Ok(UpdatePolicy::Never),
            other => {
                let minutes = other.strip_prefix("interval:")
                    .ok_or_else(invalid)?
                    .parse::<u64>()
                    .map_err(|_| invalid())?;
                Ok(UpdatePolicy::Interval(Duration::from_secs(minutes * 60)))
            }
        }
    }
}

/// What to do when a downloaded file does not match its published checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumPolicy {
    Fail,
    Warn,
    Ignore,
}
impl FromStr for ChecksumPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fail" => Ok(ChecksumPolicy::Fail),
            "warn" => Ok(ChecksumPolicy::Warn),
            "ignore" => Ok(ChecksumPolicy::Ignore),
            other => Err(ConfigError::InvalidPolicy { setting: "checksum policy", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryPolicy {
    pub enabled: bool,
    pub update: UpdatePolicy,
    pub checksum: ChecksumPolicy,
}
impl RepositoryPolicy {
    /// re-check on every request, accept checksum mismatches with a warning
    pub fn always_warn() -> RepositoryPolicy {
        RepositoryPolicy {
            enabled: true,
            update: UpdatePolicy::Always,
            checksum: ChecksumPolicy::Warn,
        }
    }

    pub fn disabled() -> RepositoryPolicy {
        RepositoryPolicy {
            enabled: false,
            ..RepositoryPolicy::default()
        }
    }
}
impl Default for RepositoryPolicy {
    fn default() -> Self {
        RepositoryPolicy {
            enabled: true,
            update: UpdatePolicy::Daily,
            checksum: ChecksumPolicy::Warn,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Authentication {
    pub username: String,
    pub password: String,
}
impl Authentication {
    pub fn basic_header(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.username, self.password)))
    }
}
impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub id: String,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub authentication: Option<Authentication>,
}
impl ProxySettings {
    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// A remote source of artifacts, fully configured and read-only once the repository list is built
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    pub layout: Arc<dyn RepositoryLayout>,
    pub releases: RepositoryPolicy,
    pub snapshots: RepositoryPolicy,
    pub proxy: Option<ProxySettings>,
    pub authentication: Option<Authentication>,
    /// ids of the repositories this one stands in for if it is a mirror
    pub mirrored_repositories: Vec<String>,
}
impl RemoteRepository {
    pub fn new(id: &str, url: &str, layout: Arc<dyn RepositoryLayout>, policy: RepositoryPolicy) -> RemoteRepository {
        RemoteRepository {
            id: id.to_string(),
            url: url.to_string(),
            layout,
            releases: policy,
            snapshots: policy,
            proxy: None,
            authentication: None,
            mirrored_repositories: vec![],
        }
    }

    pub fn policy_for(&self, version: &MavenVersion) -> &RepositoryPolicy {
        if version.is_snapshot() {
            &self.snapshots
        }
        else {
            &self.releases
        }
    }

    /// "http", "https", "file", ... in lower case
    pub fn protocol(&self) -> String {
        match self.url.find("://") {
            Some(idx) => self.url[..idx].to_ascii_lowercase(),
            None => "".to_string(),
        }
    }

    /// The host part of the URL, without user info and port
    pub fn host(&self) -> Option<&str> {
        let rest = &self.url[self.url.find("://")? + 3..];
        let authority = rest.split('/').next()?;
        let authority = authority.rsplit('@').next()?;
        let host = if authority.starts_with('[') {
            authority.split(']').next()?.trim_start_matches('[')
        }
        else {
            authority.split(':').next()?
        };
        Some(host)
    }
}
impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.url, self.layout.id())
    }
}
