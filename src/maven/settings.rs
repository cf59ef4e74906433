//! Session-wide settings in the format of Maven's settings.xml: local repository location,
//! mirrors, proxies, server credentials and repositories declared in active profiles.
//!
//! The injection functions decorate an already assembled repository list. They never reorder
//! or drop entries.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::maven::layout::{LayoutRegistry, DEFAULT_LAYOUT};
use crate::maven::repository::{Authentication, ProxySettings, RemoteRepository, RepositoryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub id: String,
    pub url: String,
    pub mirror_of: String,
    pub layout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub settings: ProxySettings,
    pub active: bool,
    pub non_proxy_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    pub authentication: Authentication,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRepository {
    pub id: String,
    pub url: String,
    pub layout: Option<String>,
    pub releases: RepositoryPolicy,
    pub snapshots: RepositoryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub active_by_default: bool,
    pub repositories: Vec<ProfileRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub local_repository: Option<PathBuf>,
    pub mirrors: Vec<Mirror>,
    pub proxies: Vec<Proxy>,
    pub servers: Vec<Server>,
    pub profiles: Vec<Profile>,
    pub active_profiles: Vec<String>,
}

impl Settings {
    /// A missing file means empty settings
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        let invalid = |message: String| ConfigError::InvalidSettings { path: path.to_path_buf(), message };
        let xml = std::fs::read_to_string(path)
            .map_err(|e| invalid(e.to_string()))?;
        Settings::parse(&xml)
            .map_err(invalid)
    }

    pub fn parse(xml: &str) -> Result<Settings, String> {
        let raw: settings_xml::Settings = serde_xml_rs::from_str(xml)
            .map_err(|e| e.to_string())?;
        raw.into_settings()
    }

    /// Repositories declared by profiles that are active, either explicitly or by default
    pub fn profile_repositories(&self, layouts: &LayoutRegistry) -> Result<Vec<RemoteRepository>, ConfigError> {
        let explicitly_activated = self.profiles.iter()
            .any(|p| self.active_profiles.contains(&p.id));

        let mut result = vec![];
        for profile in &self.profiles {
            let active = self.active_profiles.contains(&profile.id)
                || (profile.active_by_default && !explicitly_activated);
            if !active {
                continue;
            }

            for repo in &profile.repositories {
                let layout_id = repo.layout.as_deref().unwrap_or(DEFAULT_LAYOUT);
                let layout = layouts.lookup(layout_id)
                    .ok_or_else(|| ConfigError::InvalidLayout { id: layout_id.to_string() })?;

                let mut repository = RemoteRepository::new(&repo.id, &repo.url, layout, repo.releases);
                repository.snapshots = repo.snapshots;
                result.push(repository);
            }
        }
        Ok(result)
    }

    pub fn inject_mirrors(&self, repositories: Vec<RemoteRepository>, layouts: &LayoutRegistry) -> Result<Vec<RemoteRepository>, ConfigError> {
        repositories.into_iter()
            .map(|repo| match self.mirror_for(&repo) {
                None => Ok(repo),
                Some(mirror) => {
                    let layout_id = mirror.layout.as_deref()
                        .filter(|l| !l.is_empty())
                        .unwrap_or(DEFAULT_LAYOUT);
                    let layout = layouts.lookup(layout_id)
                        .ok_or_else(|| ConfigError::InvalidLayout { id: layout_id.to_string() })?;

                    debug!("using mirror {} ({}) for repository {}", mirror.id, mirror.url, repo.id);
                    Ok(RemoteRepository {
                        id: mirror.id.clone(),
                        url: mirror.url.clone(),
                        layout,
                        mirrored_repositories: vec![repo.id.clone()],
                        ..repo
                    })
                }
            })
            .collect()
    }

    pub fn inject_proxies(&self, repositories: Vec<RemoteRepository>) -> Vec<RemoteRepository> {
        repositories.into_iter()
            .map(|mut repo| {
                if repo.proxy.is_none() {
                    repo.proxy = self.proxy_for(&repo).map(|p| p.settings.clone());
                }
                repo
            })
            .collect()
    }

    pub fn inject_authentication(&self, repositories: Vec<RemoteRepository>) -> Vec<RemoteRepository> {
        repositories.into_iter()
            .map(|mut repo| {
                if repo.authentication.is_none() {
                    repo.authentication = self.servers.iter()
                        .find(|s| s.id == repo.id)
                        .map(|s| s.authentication.clone());
                }
                repo
            })
            .collect()
    }

    /// An exact id match wins over patterns, otherwise the first matching mirror in declaration order
    pub fn mirror_for(&self, repository: &RemoteRepository) -> Option<&Mirror> {
        self.mirrors.iter()
            .find(|m| m.mirror_of == repository.id)
            .or_else(|| self.mirrors.iter().find(|m| matches_mirror_pattern(&m.mirror_of, repository)))
    }

    pub fn proxy_for(&self, repository: &RemoteRepository) -> Option<&Proxy> {
        let protocol = repository.protocol();
        if protocol != "http" && protocol != "https" {
            return None;
        }
        let host = repository.host().unwrap_or("");

        self.proxies.iter()
            .filter(|p| p.active)
            .filter(|p| {
                let proxy_protocol = p.settings.protocol.to_ascii_lowercase();
                proxy_protocol == protocol || (proxy_protocol == "http" && protocol == "https")
            })
            .find(|p| !p.non_proxy_hosts.iter().any(|pattern| matches_host_pattern(pattern, host)))
    }
}

/// `*`, `external:*`, `external:http:*`, `id1,id2` and `!id` exclusions
fn matches_mirror_pattern(mirror_of: &str, repository: &RemoteRepository) -> bool {
    let mut result = false;

    for pattern in mirror_of.split(',').map(str::trim) {
        if let Some(excluded) = pattern.strip_prefix('!') {
            if excluded == repository.id {
                trace!("repository {} excluded from mirror pattern {}", repository.id, mirror_of);
                return false;
            }
            continue;
        }

        let matches = match pattern {
            "*" => true,
            "external:*" => !is_local(repository),
            "external:http:*" => !is_local(repository) && repository.protocol() == "http",
            id => id == repository.id,
        };
        result = result || matches;
    }
    result
}

fn is_local(repository: &RemoteRepository) -> bool {
    repository.protocol() == "file"
        || matches!(repository.host(), Some("localhost") | Some("127.0.0.1") | Some("::1"))
}

/// Case-insensitive match with an optional leading or trailing '*' wildcard
fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if pattern.is_empty() {
        false
    }
    else if let Some(suffix) = pattern.strip_prefix('*') {
        host.ends_with(suffix)
    }
    else if let Some(prefix) = pattern.strip_suffix('*') {
        host.starts_with(prefix)
    }
    else {
        host == pattern
    }
}

/// raw structure of settings.xml as far as it is relevant here
#[allow(non_snake_case)]
mod settings_xml {
    use serde::Deserialize;

    use crate::maven::repository::{Authentication, ChecksumPolicy, ProxySettings, RepositoryPolicy, UpdatePolicy};

    #[derive(Deserialize, Debug, Default)]
    pub struct Settings {
        pub localRepository: Option<String>,
        pub mirrors: Option<Mirrors>,
        pub proxies: Option<Proxies>,
        pub servers: Option<Servers>,
        pub profiles: Option<Profiles>,
        pub activeProfiles: Option<ActiveProfiles>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Mirrors {
        #[serde(default)]
        pub mirror: Vec<Mirror>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Mirror {
        pub id: Option<String>,
        pub url: String,
        pub mirrorOf: String,
        pub layout: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Proxies {
        #[serde(default)]
        pub proxy: Vec<Proxy>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Proxy {
        pub id: Option<String>,
        pub active: Option<bool>,
        pub protocol: Option<String>,
        pub host: String,
        pub port: Option<u16>,
        pub username: Option<String>,
        pub password: Option<String>,
        pub nonProxyHosts: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Servers {
        #[serde(default)]
        pub server: Vec<Server>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Server {
        pub id: String,
        pub username: Option<String>,
        pub password: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Profiles {
        #[serde(default)]
        pub profile: Vec<Profile>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Profile {
        pub id: String,
        pub activation: Option<Activation>,
        pub repositories: Option<Repositories>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Activation {
        pub activeByDefault: Option<bool>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Repositories {
        #[serde(default)]
        pub repository: Vec<Repository>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Repository {
        pub id: String,
        pub url: String,
        pub layout: Option<String>,
        pub releases: Option<Policy>,
        pub snapshots: Option<Policy>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Policy {
        pub enabled: Option<bool>,
        pub updatePolicy: Option<String>,
        pub checksumPolicy: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct ActiveProfiles {
        #[serde(default)]
        pub activeProfile: Vec<String>,
    }

    fn credentials(username: Option<String>, password: Option<String>) -> Option<Authentication> {
        username.map(|username| Authentication {
            username,
            password: password.unwrap_or_default(),
        })
    }

    fn policy(raw: Option<Policy>) -> Result<RepositoryPolicy, String> {
        let mut result = RepositoryPolicy::default();
        if let Some(raw) = raw {
            if let Some(enabled) = raw.enabled {
                result.enabled = enabled;
            }
            if let Some(update) = raw.updatePolicy {
                result.update = update.parse::<UpdatePolicy>().map_err(|e| e.to_string())?;
            }
            if let Some(checksum) = raw.checksumPolicy {
                result.checksum = checksum.parse::<ChecksumPolicy>().map_err(|e| e.to_string())?;
            }
        }
        Ok(result)
    }

    impl Settings {
        pub fn into_settings(self) -> Result<super::Settings, String> {
            let mirrors = self.mirrors.unwrap_or_default().mirror.into_iter()
                .map(|m| super::Mirror {
                    id: m.id.unwrap_or_else(|| "default".to_string()),
                    url: m.url.trim().to_string(),
                    mirror_of: m.mirrorOf.trim().to_string(),
                    layout: m.layout.map(|l| l.trim().to_string()),
                })
                .collect();

            let proxies = self.proxies.unwrap_or_default().proxy.into_iter()
                .map(|p| super::Proxy {
                    settings: ProxySettings {
                        id: p.id.unwrap_or_else(|| "default".to_string()),
                        protocol: p.protocol.unwrap_or_else(|| "http".to_string()).trim().to_string(),
                        host: p.host.trim().to_string(),
                        port: p.port.unwrap_or(8080),
                        authentication: credentials(p.username, p.password),
                    },
                    active: p.active.unwrap_or(true),
                    non_proxy_hosts: p.nonProxyHosts
                        .map(|h| h.split(['|', ',']).map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                        .unwrap_or_default(),
                })
                .collect();

            let servers = self.servers.unwrap_or_default().server.into_iter()
                .filter_map(|s| {
                    let id = s.id;
                    credentials(s.username, s.password)
                        .map(|authentication| super::Server { id, authentication })
                })
                .collect();

            let mut profiles = vec![];
            for p in self.profiles.unwrap_or_default().profile {
                let mut repositories = vec![];
                for r in p.repositories.unwrap_or_default().repository {
                    repositories.push(super::ProfileRepository {
                        id: r.id.trim().to_string(),
                        url: r.url.trim().to_string(),
                        layout: r.layout.map(|l| l.trim().to_string()),
                        releases: policy(r.releases)?,
                        snapshots: policy(r.snapshots)?,
                    });
                }
                profiles.push(super::Profile {
                    id: p.id,
                    active_by_default: p.activation.and_then(|a| a.activeByDefault).unwrap_or(false),
                    repositories,
                });
            }

            Ok(super::Settings {
                local_repository: self.localRepository.map(|p| p.trim().into()),
                mirrors,
                proxies,
                servers,
                profiles,
                active_profiles: self.activeProfiles.unwrap_or_default().activeProfile,
            })
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use rstest::*;
    use super::*;
    use crate::maven::layout::DefaultLayout;
    use crate::maven::repository::{ChecksumPolicy, UpdatePolicy};

    const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0">
  <localRepository>/var/cache/m2</localRepository>
  <mirrors>
    <mirror>
      <id>corp-mirror</id>
      <mirrorOf>external:*,!snapshots</mirrorOf>
      <url>https://nexus.corp/repository/public</url>
    </mirror>
  </mirrors>
  <proxies>
    <proxy>
      <id>corp-proxy</id>
      <active>true</active>
      <protocol>http</protocol>
      <host>proxy.corp</host>
      <port>3128</port>
      <username>proxyuser</username>
      <password>proxypass</password>
      <nonProxyHosts>localhost|*.corp</nonProxyHosts>
    </proxy>
  </proxies>
  <servers>
    <server>
      <id>corp-mirror</id>
      <username>deployer</username>
      <password>secret</password>
    </server>
  </servers>
  <profiles>
    <profile>
      <id>extra</id>
      <repositories>
        <repository>
          <id>snapshots</id>
          <url>https://nexus.corp/repository/snapshots</url>
          <releases>
            <enabled>false</enabled>
          </releases>
          <snapshots>
            <updatePolicy>always</updatePolicy>
            <checksumPolicy>fail</checksumPolicy>
          </snapshots>
        </repository>
      </repositories>
    </profile>
    <profile>
      <id>unused</id>
      <repositories>
        <repository>
          <id>unused</id>
          <url>https://unused.example</url>
        </repository>
      </repositories>
    </profile>
  </profiles>
  <activeProfiles>
    <activeProfile>extra</activeProfile>
  </activeProfiles>
</settings>
"#;

    fn repo(id: &str, url: &str) -> RemoteRepository {
        RemoteRepository::new(id, url, Arc::new(DefaultLayout), RepositoryPolicy::always_warn())
    }

    fn mirror(id: &str, mirror_of: &str) -> Mirror {
        Mirror {
            id: id.to_string(),
            url: format!("https://{}.example", id),
            mirror_of: mirror_of.to_string(),
            layout: None,
        }
    }

    #[test]
    fn test_parse() {
        let settings = Settings::parse(SETTINGS_XML).unwrap();

        assert_eq!(settings.local_repository, Some(PathBuf::from("/var/cache/m2")));
        assert_eq!(settings.mirrors, vec![Mirror {
            id: "corp-mirror".to_string(),
            url: "https://nexus.corp/repository/public".to_string(),
            mirror_of: "external:*,!snapshots".to_string(),
            layout: None,
        }]);

        let proxy = &settings.proxies[0];
        assert!(proxy.active);
        assert_eq!(proxy.settings.host, "proxy.corp");
        assert_eq!(proxy.settings.port, 3128);
        assert_eq!(proxy.settings.authentication.as_ref().unwrap().username, "proxyuser");
        assert_eq!(proxy.non_proxy_hosts, vec!["localhost".to_string(), "*.corp".to_string()]);

        assert_eq!(settings.servers[0].id, "corp-mirror");
        assert_eq!(settings.servers[0].authentication.password, "secret");

        let repository = &settings.profiles[0].repositories[0];
        assert!(!repository.releases.enabled);
        assert_eq!(repository.snapshots.update, UpdatePolicy::Always);
        assert_eq!(repository.snapshots.checksum, ChecksumPolicy::Fail);
        assert_eq!(settings.active_profiles, vec!["extra".to_string()]);
    }

    #[test]
    fn test_parse_empty() {
        let settings = Settings::parse("<settings></settings>").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.xml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");
        std::fs::write(&path, "<settings><mirrors>").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::InvalidSettings { .. })));
    }

    #[test]
    fn test_profile_repositories_only_from_active_profiles() {
        let settings = Settings::parse(SETTINGS_XML).unwrap();
        let repos = settings.profile_repositories(&LayoutRegistry::default()).unwrap();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].id, "snapshots");
        assert!(!repos[0].releases.enabled);
        assert_eq!(repos[0].snapshots.update, UpdatePolicy::Always);
    }

    #[test]
    fn test_active_by_default_profile() {
        let settings = Settings {
            profiles: vec![Profile {
                id: "default-repos".to_string(),
                active_by_default: true,
                repositories: vec![ProfileRepository {
                    id: "extra".to_string(),
                    url: "https://extra.example".to_string(),
                    layout: None,
                    releases: RepositoryPolicy::default(),
                    snapshots: RepositoryPolicy::disabled(),
                }],
            }],
            ..Settings::default()
        };
        let repos = settings.profile_repositories(&LayoutRegistry::default()).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].id, "extra");
    }

    #[rstest]
    #[case::star("*", "central", "https://repo.example", true)]
    #[case::exact("central", "central", "https://repo.example", true)]
    #[case::other_id("central", "temp", "https://repo.example", false)]
    #[case::list("a,central", "central", "https://repo.example", true)]
    #[case::external_remote("external:*", "central", "https://repo.example", true)]
    #[case::external_localhost("external:*", "local", "http://localhost:8081/repo", false)]
    #[case::external_file("external:*", "base", "file:///var/m2", false)]
    #[case::external_http_on_https("external:http:*", "central", "https://repo.example", false)]
    #[case::external_http_on_http("external:http:*", "central", "http://repo.example", true)]
    #[case::exclusion("*,!central", "central", "https://repo.example", false)]
    #[case::exclusion_other("*,!temp", "central", "https://repo.example", true)]
    fn test_matches_mirror_pattern(#[case] pattern: &str, #[case] id: &str, #[case] url: &str, #[case] expected: bool) {
        assert_eq!(matches_mirror_pattern(pattern, &repo(id, url)), expected);
    }

    #[test]
    fn test_exact_mirror_beats_pattern() {
        let settings = Settings {
            mirrors: vec![mirror("everything", "*"), mirror("central-only", "central")],
            ..Settings::default()
        };
        assert_eq!(settings.mirror_for(&repo("central", "https://repo.example")).unwrap().id, "central-only");
        assert_eq!(settings.mirror_for(&repo("temp", "https://repo.example")).unwrap().id, "everything");
    }

    #[test]
    fn test_inject_mirrors_keeps_order_and_unmatched() {
        let settings = Settings {
            mirrors: vec![mirror("m", "central")],
            ..Settings::default()
        };
        let mut central = repo("central", "https://central.example");
        central.snapshots = RepositoryPolicy::disabled();

        let repos = settings.inject_mirrors(
            vec![repo("first", "https://first.example"), central, repo("temp", "https://temp.example")],
            &LayoutRegistry::default(),
        ).unwrap();

        let ids: Vec<&str> = repos.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "m", "temp"]);
        assert_eq!(repos[1].url, "https://m.example");
        assert_eq!(repos[1].mirrored_repositories, vec!["central".to_string()]);
        assert!(!repos[1].snapshots.enabled);
    }

    #[test]
    fn test_inject_mirrors_unknown_layout() {
        let mut m = mirror("m", "*");
        m.layout = Some("legacy".to_string());
        let settings = Settings { mirrors: vec![m], ..Settings::default() };

        let result = settings.inject_mirrors(vec![repo("central", "https://repo.example")], &LayoutRegistry::default());
        assert!(matches!(result, Err(ConfigError::InvalidLayout { id }) if id == "legacy"));
    }

    #[rstest]
    #[case::remote("https://repo.example", true)]
    #[case::plain_http("http://repo.example", true)]
    #[case::non_proxy_exact("http://localhost:8081", false)]
    #[case::non_proxy_wildcard("https://nexus.corp/repo", false)]
    #[case::file("file:///var/m2", false)]
    fn test_inject_proxies(#[case] url: &str, #[case] proxied: bool) {
        let settings = Settings::parse(SETTINGS_XML).unwrap();
        let repos = settings.inject_proxies(vec![repo("r", url)]);
        assert_eq!(repos[0].proxy.is_some(), proxied);
    }

    #[test]
    fn test_inactive_proxy_is_ignored() {
        let mut settings = Settings::parse(SETTINGS_XML).unwrap();
        settings.proxies[0].active = false;
        let repos = settings.inject_proxies(vec![repo("r", "https://repo.example")]);
        assert!(repos[0].proxy.is_none());
    }

    #[test]
    fn test_inject_authentication_by_id() {
        let settings = Settings::parse(SETTINGS_XML).unwrap();
        let repos = settings.inject_authentication(vec![
            repo("corp-mirror", "https://nexus.corp"),
            repo("central", "https://repo.example"),
        ]);
        assert_eq!(repos[0].authentication.as_ref().unwrap().username, "deployer");
        assert!(repos[1].authentication.is_none());
    }

    #[rstest]
    #[case("*.corp", "nexus.corp", true)]
    #[case("*.corp", "corp.example", false)]
    #[case("192.168.*", "192.168.1.7", true)]
    #[case("LOCALHOST", "localhost", true)]
    #[case("", "localhost", false)]
    fn test_matches_host_pattern(#[case] pattern: &str, #[case] host: &str, #[case] expected: bool) {
        assert_eq!(matches_host_pattern(pattern, host), expected);
    }
}
