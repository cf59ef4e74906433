use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::maven::coordinates::{ArtifactCoordinate, MavenArtifactRef, MavenVersion};
use crate::maven::metadata_xml::{self, Metadata};
use crate::maven::paths::parse_snapshot_version;
use crate::maven::repository::RemoteRepository;
use crate::maven::version::{highest, ComparableVersion, VersionRange};
use crate::resolve::connector::RepositoryConnector;

const RELEASE: &str = "RELEASE";
const LATEST: &str = "LATEST";

/// Turns version requirements (RELEASE, LATEST, ranges) into concrete versions, and '-SNAPSHOT'
///  versions into the timestamped file version a repository actually holds
pub struct VersionResolver {
    connector: Arc<dyn RepositoryConnector>,
}
impl VersionResolver {
    pub fn new(connector: Arc<dyn RepositoryConnector>) -> VersionResolver {
        VersionResolver {
            connector,
        }
    }

    pub async fn resolve(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<MavenVersion, ResolveError> {
        let requirement = coordinate.version.trim();

        let range = if VersionRange::is_range(requirement) {
            let range = VersionRange::parse(requirement)
                .map_err(|message| ResolveError::InvalidVersionRequirement {
                    artifact: format!("{}:{}", coordinate.group_id.0, coordinate.artifact_id.0),
                    requirement: requirement.to_string(),
                    message,
                })?;
            Some(range)
        }
        else if requirement == RELEASE || requirement == LATEST {
            None
        }
        else {
            return Ok(MavenVersion::parse(requirement));
        };

        let mut candidates: Vec<String> = vec![];
        for repo in repositories {
            if !repo.releases.enabled && !repo.snapshots.enabled {
                continue;
            }
            let Some(metadata) = self.metadata(repo, coordinate, None).await else {
                continue;
            };

            let candidate = match (&range, requirement) {
                (Some(range), _) => range.select_highest(metadata.versions().iter().map(String::as_str)),
                (None, RELEASE) => metadata.release()
                    .or_else(|| highest(metadata.versions().iter().map(String::as_str).filter(|v| !v.ends_with("-SNAPSHOT")))),
                (None, _) => metadata.latest()
                    .or_else(|| highest(metadata.versions().iter().map(String::as_str))),
            };
            if let Some(c) = candidate {
                trace!("{} offers {} for {}:{}", repo.id, c, coordinate.group_id.0, coordinate.artifact_id.0);
                candidates.push(c.to_string());
            }
        }

        let result = candidates.iter()
            .max_by_key(|c| ComparableVersion::parse(c))
            .ok_or_else(|| ResolveError::VersionNotResolved {
                artifact: format!("{}:{}", coordinate.group_id.0, coordinate.artifact_id.0),
                requirement: requirement.to_string(),
            })?;

        debug!("resolved version '{}' of {}:{} to {}", requirement, coordinate.group_id.0, coordinate.artifact_id.0, result);
        Ok(MavenVersion::parse(result))
    }

    /// The artifact as it is named in this particular repository. Non-snapshots and repositories
    ///  without usable snapshot metadata yield the artifact unchanged.
    pub async fn resolve_snapshot(&self, repository: &RemoteRepository, artifact_ref: &MavenArtifactRef) -> MavenArtifactRef {
        let MavenVersion::Snapshot(base_version) = &artifact_ref.coordinates.version else {
            return artifact_ref.clone();
        };

        let coordinate = ArtifactCoordinate::new(
            &artifact_ref.coordinates.group_id.0,
            &artifact_ref.coordinates.artifact_id.0,
            base_version,
        );
        let Some(metadata) = self.metadata(repository, &coordinate, Some(base_version)).await else {
            return artifact_ref.clone();
        };

        let from_snapshot_versions = metadata.snapshot_value(artifact_ref.classifier.as_str(), &artifact_ref.file_extension)
            .and_then(|value| parse_snapshot_version(value, base_version));

        let from_snapshot = || {
            let snapshot = metadata.snapshot()?;
            if snapshot.localCopy == Some(true) {
                return None;
            }
            Some(MavenVersion::TimestampedSnapshot {
                version: base_version.clone(),
                timestamp: snapshot.timestamp.clone()?,
                build_number: snapshot.buildNumber,
            })
        };

        match from_snapshot_versions.or_else(from_snapshot) {
            Some(version) => {
                debug!("{} in {} is {}", artifact_ref, repository.id, version);
                artifact_ref.with_version(version)
            }
            None => artifact_ref.clone(),
        }
    }

    /// artifact-level (no version) or version-level metadata, `None` if unavailable or unreadable
    async fn metadata(&self, repository: &RemoteRepository, coordinate: &ArtifactCoordinate, version: Option<&str>) -> Option<Metadata> {
        let path = repository.layout.metadata_path_of(&coordinate.group_id, &coordinate.artifact_id, version);

        let result: anyhow::Result<Option<Metadata>> = async {
            match self.connector.get(repository, &path).await? {
                None => Ok(None),
                Some(blob) => {
                    let data = blob.into_bytes().await?;
                    Ok(Some(metadata_xml::parse(&data)?))
                }
            }
        }.await;

        match result {
            Ok(m) => m,
            Err(e) => {
                debug!("could not read {} from {}: {:#}", path, repository.id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;
    use crate::maven::coordinates::{MavenArtifactId, MavenClassifier, MavenCoordinates, MavenGroupId};
    use crate::maven::layout::DefaultLayout;
    use crate::maven::repository::RepositoryPolicy;
    use crate::resolve::connector::testing::InMemoryConnector;

    const METADATA_PATH: &str = "org/example/lib/maven-metadata.xml";

    fn metadata(release: Option<&str>, latest: Option<&str>, versions: &[&str]) -> String {
        let release = release.map(|r| format!("<release>{}</release>", r)).unwrap_or_default();
        let latest = latest.map(|l| format!("<latest>{}</latest>", l)).unwrap_or_default();
        let versions: String = versions.iter().map(|v| format!("<version>{}</version>", v)).collect();
        format!("<metadata><groupId>org.example</groupId><artifactId>lib</artifactId><versioning>{}{}<versions>{}</versions></versioning></metadata>", latest, release, versions)
    }

    fn repo(id: &str) -> RemoteRepository {
        RemoteRepository::new(id, &format!("https://{}.example", id), Arc::new(DefaultLayout), RepositoryPolicy::always_warn())
    }

    fn setup() -> (Arc<InMemoryConnector>, VersionResolver) {
        let connector = Arc::new(InMemoryConnector::new());
        let resolver = VersionResolver::new(connector.clone());
        (connector, resolver)
    }

    #[tokio::test]
    async fn test_literal_version_needs_no_metadata() {
        let (connector, resolver) = setup();
        let version = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", "1.0"), &[repo("a")]).await.unwrap();
        assert_eq!(version, MavenVersion::Release("1.0".to_string()));
        assert!(connector.requests().is_empty());
    }

    #[rstest]
    #[case::release("RELEASE", "1.2")]
    #[case::latest("LATEST", "1.3-SNAPSHOT")]
    #[case::range("[1.0,1.2)", "1.1")]
    #[case::exact_range("[1.0]", "1.0")]
    #[tokio::test]
    async fn test_resolve_from_metadata(#[case] requirement: &str, #[case] expected: &str) {
        let (connector, resolver) = setup();
        connector.add("a", METADATA_PATH, metadata(Some("1.2"), Some("1.3-SNAPSHOT"), &["1.0", "1.1", "1.2", "1.3-SNAPSHOT"]));

        let version = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", requirement), &[repo("a")]).await.unwrap();
        assert_eq!(version.base_version(), expected);
    }

    #[tokio::test]
    async fn test_release_without_release_element() {
        let (connector, resolver) = setup();
        connector.add("a", METADATA_PATH, metadata(None, None, &["1.0", "1.10", "1.9", "2.0-SNAPSHOT"]));

        let version = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", "RELEASE"), &[repo("a")]).await.unwrap();
        assert_eq!(version.base_version(), "1.10");
    }

    #[tokio::test]
    async fn test_highest_across_repositories() {
        let (connector, resolver) = setup();
        connector.add("a", METADATA_PATH, metadata(Some("1.2"), None, &["1.2"]));
        connector.add("b", METADATA_PATH, metadata(Some("1.4"), None, &["1.4"]));
        connector.set_unreachable("c");

        let version = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", "RELEASE"), &[repo("a"), repo("c"), repo("b")]).await.unwrap();
        assert_eq!(version.base_version(), "1.4");
    }

    #[tokio::test]
    async fn test_unresolvable_range() {
        let (connector, resolver) = setup();
        connector.add("a", METADATA_PATH, metadata(Some("1.2"), None, &["1.0", "1.2"]));

        let result = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", "[2.0,)"), &[repo("a")]).await;
        assert!(matches!(result, Err(ResolveError::VersionNotResolved { .. })));
    }

    #[tokio::test]
    async fn test_invalid_range() {
        let (_, resolver) = setup();
        let result = resolver.resolve(&ArtifactCoordinate::new("org.example", "lib", "[2.0"), &[repo("a")]).await;
        assert!(matches!(result, Err(ResolveError::InvalidVersionRequirement { .. })));
    }

    fn snapshot_ref(classifier: Option<&str>) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId("org.example".to_string()),
                artifact_id: MavenArtifactId("lib".to_string()),
                version: MavenVersion::parse("1.0-SNAPSHOT"),
            },
            classifier: MavenClassifier::from_optional(classifier),
            file_extension: "jar".to_string(),
        }
    }

    const SNAPSHOT_METADATA_PATH: &str = "org/example/lib/1.0-SNAPSHOT/maven-metadata.xml";

    #[rstest]
    #[case::main(None, "1.0-20200608.005752-3")]
    #[case::sources(Some("sources"), "1.0-20200608.005750-2")]
    #[case::unlisted_classifier_uses_snapshot_element(Some("javadoc"), "1.0-20200608.005752-3")]
    #[tokio::test]
    async fn test_resolve_snapshot(#[case] classifier: Option<&str>, #[case] expected: &str) {
        let (connector, resolver) = setup();
        connector.add("a", SNAPSHOT_METADATA_PATH, r#"<metadata>
  <versioning>
    <snapshot><timestamp>20200608.005752</timestamp><buildNumber>3</buildNumber></snapshot>
    <snapshotVersions>
      <snapshotVersion><extension>jar</extension><value>1.0-20200608.005752-3</value></snapshotVersion>
      <snapshotVersion><classifier>sources</classifier><extension>jar</extension><value>1.0-20200608.005750-2</value></snapshotVersion>
    </snapshotVersions>
  </versioning>
</metadata>"#);

        let resolved = resolver.resolve_snapshot(&repo("a"), &snapshot_ref(classifier)).await;
        assert_eq!(resolved.coordinates.version.file_version(), expected);
        assert_eq!(resolved.coordinates.version.base_version(), "1.0-SNAPSHOT");
    }

    #[tokio::test]
    async fn test_resolve_snapshot_without_metadata() {
        let (_, resolver) = setup();
        let artifact_ref = snapshot_ref(None);
        assert_eq!(resolver.resolve_snapshot(&repo("a"), &artifact_ref).await, artifact_ref);
    }
}
