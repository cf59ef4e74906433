use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_PACKAGING: &str = "jar";

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum MavenVersion {
    Release(String),
    /// a '-SNAPSHOT' version as it is named in the local repository
    Snapshot(String),
    /// a snapshot pinned to one deployed build
    TimestampedSnapshot {
        version: String, // ending in '-SNAPSHOT'
        timestamp: String,
        build_number: Option<u32>,
    },
}
impl MavenVersion {
    pub fn parse(version: &str) -> MavenVersion {
        if version.ends_with("-SNAPSHOT") {
            MavenVersion::Snapshot(version.to_string())
        }
        else {
            MavenVersion::Release(version.to_string())
        }
    }

    pub fn is_snapshot(&self) -> bool {
        !matches!(self, MavenVersion::Release(_))
    }

    /// The version as it appears in directory names, i.e. without snapshot timestamp
    pub fn base_version(&self) -> &str {
        match self {
            MavenVersion::Release(v) => v,
            MavenVersion::Snapshot(v) => v,
            MavenVersion::TimestampedSnapshot { version, .. } => version,
        }
    }

    /// The version as it appears in remote file names
    pub fn file_version(&self) -> String {
        match self {
            MavenVersion::Release(v) | MavenVersion::Snapshot(v) => v.clone(),
            MavenVersion::TimestampedSnapshot { version, timestamp, build_number } => {
                let build_number_string = match build_number {
                    None => "".to_string(),
                    Some(n) => format!("-{}", n),
                };
                format!("{}-{}{}", version.trim_end_matches("-SNAPSHOT"), timestamp, build_number_string)
            }
        }
    }
}
impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_version())
    }
}

#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct MavenArtifactId(pub String);

#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct MavenGroupId(pub String);

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenCoordinates {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
    pub version: MavenVersion,
}

#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum MavenClassifier {
    Unclassified,
    Classified(String),
}
impl MavenClassifier {
    /// empty and missing classifiers are the same thing
    pub fn from_optional(classifier: Option<&str>) -> MavenClassifier {
        match classifier {
            None | Some("") => MavenClassifier::Unclassified,
            Some(c) => MavenClassifier::Classified(c.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MavenClassifier::Unclassified => "",
            MavenClassifier::Classified(c) => c,
        }
    }
}

/// A concrete file in a Maven repository: fully resolved version, classifier and extension
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenArtifactRef {
    pub coordinates: MavenCoordinates,
    pub classifier: MavenClassifier,
    pub file_extension: String, // without leading '.', e.g. "jar"
}
impl MavenArtifactRef {
    pub fn with_version(&self, version: MavenVersion) -> MavenArtifactRef {
        let mut result = self.clone();
        result.coordinates.version = version;
        result
    }
}
impl fmt::Display for MavenArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.coordinates.group_id.0, self.coordinates.artifact_id.0, self.file_extension)?;
        if let MavenClassifier::Classified(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        write!(f, ":{}", self.coordinates.version)
    }
}

/// What a user asks for: the version may still be a range or a keyword like RELEASE, and
///  the packaging is a type that still needs mapping to a file extension.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ArtifactCoordinate {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
    pub version: String,
    pub packaging: String,
    pub classifier: MavenClassifier,
}
impl ArtifactCoordinate {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> ArtifactCoordinate {
        ArtifactCoordinate {
            group_id: MavenGroupId(group_id.to_string()),
            artifact_id: MavenArtifactId(artifact_id.to_string()),
            version: version.to_string(),
            packaging: DEFAULT_PACKAGING.to_string(),
            classifier: MavenClassifier::Unclassified,
        }
    }

    /// `groupId:artifactId:version[:packaging[:classifier]]`
    ///
    /// Tokens are not validated beyond their count, an empty group or artifact id is passed on
    pub fn parse(spec: &str) -> Result<ArtifactCoordinate, ConfigError> {
        let tokens: Vec<&str> = spec.split(':').collect();
        if tokens.len() < 3 || tokens.len() > 5 {
            return Err(ConfigError::InvalidCoordinate { spec: spec.to_string() });
        }

        let mut result = ArtifactCoordinate::new(tokens[0], tokens[1], tokens[2]);
        if let Some(packaging) = tokens.get(3) {
            result.packaging = packaging.to_string();
        }
        if let Some(classifier) = tokens.get(4) {
            result.classifier = MavenClassifier::from_optional(Some(classifier));
        }
        Ok(result)
    }

    pub fn with_packaging(mut self, packaging: &str) -> ArtifactCoordinate {
        self.packaging = packaging.to_string();
        self
    }

    pub fn with_classifier(mut self, classifier: MavenClassifier) -> ArtifactCoordinate {
        self.classifier = classifier;
        self
    }

    pub fn with_version(mut self, version: &str) -> ArtifactCoordinate {
        self.version = version.to_string();
        self
    }

    /// groupId:artifactId, the identity used for conflict resolution
    pub fn key(&self) -> (String, String) {
        (self.group_id.0.clone(), self.artifact_id.0.clone())
    }
}
impl FromStr for ArtifactCoordinate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactCoordinate::parse(s)
    }
}
impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.group_id.0, self.artifact_id.0, self.version, self.packaging)?;
        if let MavenClassifier::Classified(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::minimal("g:a:1.0", "g", "a", "1.0", "jar", MavenClassifier::Unclassified)]
    #[case::packaging("g:a:1.0:war", "g", "a", "1.0", "war", MavenClassifier::Unclassified)]
    #[case::classifier("g:a:1.0:war:linux", "g", "a", "1.0", "war", MavenClassifier::Classified("linux".to_string()))]
    #[case::sources("com.github.vincentrussell:cool-artifact:1.0:jar:sources", "com.github.vincentrussell", "cool-artifact", "1.0", "jar", MavenClassifier::Classified("sources".to_string()))]
    #[case::empty_classifier("g:a:1.0:jar:", "g", "a", "1.0", "jar", MavenClassifier::Unclassified)]
    #[case::empty_group(":a:1.0", "", "a", "1.0", "jar", MavenClassifier::Unclassified)]
    #[case::range("g:a:[1.0,2.0)", "g", "a", "[1.0,2.0)", "jar", MavenClassifier::Unclassified)]
    fn test_parse(
        #[case] spec: &str,
        #[case] group_id: &str,
        #[case] artifact_id: &str,
        #[case] version: &str,
        #[case] packaging: &str,
        #[case] classifier: MavenClassifier,
    ) {
        let actual = ArtifactCoordinate::parse(spec).unwrap();
        assert_eq!(actual.group_id.0, group_id);
        assert_eq!(actual.artifact_id.0, artifact_id);
        assert_eq!(actual.version, version);
        assert_eq!(actual.packaging, packaging);
        assert_eq!(actual.classifier, classifier);
    }

    #[rstest]
    #[case::too_few("g:a")]
    #[case::too_many("g:a:1:w:c:x")]
    #[case::single("g")]
    fn test_parse_invalid(#[case] spec: &str) {
        let err = ArtifactCoordinate::parse(spec).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCoordinate { .. }));
        assert!(err.to_string().contains(spec));
    }

    #[rstest]
    #[case::release(MavenVersion::parse("1.0"), "1.0", "1.0", false)]
    #[case::snapshot(MavenVersion::parse("1.0-SNAPSHOT"), "1.0-SNAPSHOT", "1.0-SNAPSHOT", true)]
    #[case::timestamped(MavenVersion::TimestampedSnapshot { version: "1.0-SNAPSHOT".to_string(), timestamp: "20200608.005752".to_string(), build_number: Some(3) }, "1.0-SNAPSHOT", "1.0-20200608.005752-3", true)]
    #[case::timestamped_without_build_number(MavenVersion::TimestampedSnapshot { version: "1.0-SNAPSHOT".to_string(), timestamp: "20200608.005752".to_string(), build_number: None }, "1.0-SNAPSHOT", "1.0-20200608.005752", true)]
    #[case::lowercase_snapshot(MavenVersion::parse("1.0-snapshot"), "1.0-snapshot", "1.0-snapshot", false)]
    fn test_version_strings(#[case] version: MavenVersion, #[case] base: &str, #[case] file: &str, #[case] is_snapshot: bool) {
        assert_eq!(version.base_version(), base);
        assert_eq!(version.file_version(), file);
        assert_eq!(version.is_snapshot(), is_snapshot);
    }

    #[test]
    fn test_display() {
        let coordinate = ArtifactCoordinate::parse("g:a:1.0:jar:sources").unwrap();
        assert_eq!(coordinate.to_string(), "g:a:1.0:jar:sources");
        assert_eq!(ArtifactCoordinate::parse("g:a:1.0").unwrap().to_string(), "g:a:1.0:jar");
    }
}
