

use lazy_static::lazy_static;
use regex::Regex;
use crate::maven::coordinates::*;

lazy_static! {
    static ref TIMESTAMP_REGEX: Regex = Regex::new(r"^(\d{8}\.\d{6})(?:-(\d+))?$").unwrap();
}

pub const MAVEN_METADATA_XML: &str = "maven-metadata.xml";


/// The relative path of an artifact inside a remote repository with default layout. Timestamped
///  snapshots live in the '-SNAPSHOT' directory under their timestamped file name.
pub fn as_maven_path(artifact_ref: &MavenArtifactRef) -> String {
    format!(
        "{}/{}",
        version_directory(artifact_ref),
        maven_file_name(artifact_ref),
    )
}

/// The relative path of an artifact inside a local repository: snapshots are always stored
///  under their '-SNAPSHOT' name, whichever build was downloaded.
pub fn as_local_path(artifact_ref: &MavenArtifactRef) -> String {
    format!(
        "{}/{}",
        version_directory(artifact_ref),
        local_file_name(artifact_ref),
    )
}

fn version_directory(artifact_ref: &MavenArtifactRef) -> String {
    format!(
        "{}/{}/{}",
        artifact_ref.coordinates.group_id.0.replace('.', "/"),
        artifact_ref.coordinates.artifact_id.0,
        artifact_ref.coordinates.version.base_version(),
    )
}

/// Path of maven-metadata.xml on artifact level (no version) or on version level
pub fn metadata_path(group_id: &MavenGroupId, artifact_id: &MavenArtifactId, version: Option<&str>) -> String {
    match version {
        None => format!("{}/{}/{}", group_id.0.replace('.', "/"), artifact_id.0, MAVEN_METADATA_XML),
        Some(v) => format!("{}/{}/{}/{}", group_id.0.replace('.', "/"), artifact_id.0, v, MAVEN_METADATA_XML),
    }
}

/// <artifactId>-<version>[-<classifier>].<extension>
pub fn maven_file_name(artifact_ref: &MavenArtifactRef) -> String {
    file_name(artifact_ref, &artifact_ref.coordinates.version.file_version())
}

fn local_file_name(artifact_ref: &MavenArtifactRef) -> String {
    file_name(artifact_ref, artifact_ref.coordinates.version.base_version())
}

fn file_name(artifact_ref: &MavenArtifactRef, version_string: &str) -> String {
    let classifier_string = match &artifact_ref.classifier {
        MavenClassifier::Unclassified => "".to_string(),
        MavenClassifier::Classified(c) => format!("-{}", c),
    };

    format!("{}-{}{}.{}",
            artifact_ref.coordinates.artifact_id.0,
            version_string,
            classifier_string,
            artifact_ref.file_extension,
    )
}

/// Parses the '<timestamp>-<buildNumber>' suffix of a deployed snapshot's version string, e.g.
///  "1.0-20200608.005752-3" for base version "1.0-SNAPSHOT"
pub fn parse_snapshot_version(value: &str, base_version: &str) -> Option<MavenVersion> {
    let prefix = base_version.strip_suffix("-SNAPSHOT")?;
    let suffix = value.strip_prefix(prefix)?.strip_prefix('-')?;

    if suffix == "SNAPSHOT" {
        return Some(MavenVersion::Snapshot(base_version.to_string()));
    }

    let captures = TIMESTAMP_REGEX.captures(suffix)?;
    let build_number = match captures.get(2) {
        None => None,
        Some(n) => Some(n.as_str().parse::<u32>().ok()?),
    };

    Some(MavenVersion::TimestampedSnapshot {
        version: base_version.to_string(),
        timestamp: captures[1].to_string(),
        build_number,
    })
}


#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    fn artifact(version: MavenVersion, classifier: Option<&str>, extension: &str) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId("com.github.vincentrussell".to_string()),
                artifact_id: MavenArtifactId("cool-artifact".to_string()),
                version,
            },
            classifier: MavenClassifier::from_optional(classifier),
            file_extension: extension.to_string(),
        }
    }

    fn timestamped(build_number: Option<u32>) -> MavenVersion {
        MavenVersion::TimestampedSnapshot {
            version: "1.0-SNAPSHOT".to_string(),
            timestamp: "20200608.005752".to_string(),
            build_number,
        }
    }

    #[rstest]
    #[case::release(artifact(MavenVersion::parse("1.0"), None, "jar"), "com/github/vincentrussell/cool-artifact/1.0/cool-artifact-1.0.jar")]
    #[case::classifier(artifact(MavenVersion::parse("1.0"), Some("sources"), "jar"), "com/github/vincentrussell/cool-artifact/1.0/cool-artifact-1.0-sources.jar")]
    #[case::pom(artifact(MavenVersion::parse("2.4"), None, "pom"), "com/github/vincentrussell/cool-artifact/2.4/cool-artifact-2.4.pom")]
    #[case::snapshot(artifact(MavenVersion::parse("1.0-SNAPSHOT"), None, "jar"), "com/github/vincentrussell/cool-artifact/1.0-SNAPSHOT/cool-artifact-1.0-SNAPSHOT.jar")]
    #[case::timestamped(artifact(timestamped(Some(3)), Some("sources"), "jar"), "com/github/vincentrussell/cool-artifact/1.0-SNAPSHOT/cool-artifact-1.0-20200608.005752-3-sources.jar")]
    fn test_as_maven_path(#[case] artifact_ref: MavenArtifactRef, #[case] expected: &str) {
        assert_eq!(as_maven_path(&artifact_ref), expected);
    }

    #[test]
    fn test_local_path_uses_snapshot_name() {
        let artifact_ref = artifact(timestamped(Some(3)), Some("sources"), "jar");
        assert_eq!(
            as_local_path(&artifact_ref),
            "com/github/vincentrussell/cool-artifact/1.0-SNAPSHOT/cool-artifact-1.0-SNAPSHOT-sources.jar"
        );
    }

    #[rstest]
    #[case::artifact_level(None, "org/example/lib/maven-metadata.xml")]
    #[case::version_level(Some("1.0-SNAPSHOT"), "org/example/lib/1.0-SNAPSHOT/maven-metadata.xml")]
    fn test_metadata_path(#[case] version: Option<&str>, #[case] expected: &str) {
        let actual = metadata_path(&MavenGroupId("org.example".to_string()), &MavenArtifactId("lib".to_string()), version);
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::build_number("1.0-20200608.005752-3", "1.0-SNAPSHOT", Some(timestamped(Some(3))))]
    #[case::no_build_number("1.0-20200608.005752", "1.0-SNAPSHOT", Some(timestamped(None)))]
    #[case::unique_snapshot_disabled("1.0-SNAPSHOT", "1.0-SNAPSHOT", Some(MavenVersion::Snapshot("1.0-SNAPSHOT".to_string())))]
    #[case::other_version("1.1-20200608.005752-3", "1.0-SNAPSHOT", None)]
    #[case::release_base("1.0-20200608.005752-3", "1.0", None)]
    #[case::malformed_timestamp("1.0-2020060.005752-3", "1.0-SNAPSHOT", None)]
    #[case::malformed_build_number("1.0-20200608.005752-x", "1.0-SNAPSHOT", None)]
    fn test_parse_snapshot_version(#[case] value: &str, #[case] base: &str, #[case] expected: Option<MavenVersion>) {
        assert_eq!(parse_snapshot_version(value, base), expected);
    }
}
