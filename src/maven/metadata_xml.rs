#![allow(non_snake_case)]

//! maven-metadata.xml as described at
//!  https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html

use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
pub struct Metadata {
    pub groupId: Option<String>,
    pub artifactId: Option<String>,
    pub version: Option<String>,
    pub versioning: Option<Versioning>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Versioning {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Option<Versions>,
    pub lastUpdated: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub snapshotVersions: Option<SnapshotVersions>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Versions {
    #[serde(default)]
    pub version: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct Snapshot {
    pub timestamp: Option<String>,
    pub buildNumber: Option<u32>,
    pub localCopy: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SnapshotVersions {
    #[serde(default)]
    pub snapshotVersion: Vec<SnapshotVersion>,
}

#[derive(Deserialize, Debug)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: String,
    pub value: String,
    pub updated: Option<String>,
}

pub fn parse(xml: &[u8]) -> anyhow::Result<Metadata> {
    Ok(serde_xml_rs::from_reader(xml)?)
}

impl Metadata {
    /// all versions listed on artifact level, in document order
    pub fn versions(&self) -> &[String] {
        self.versioning.as_ref()
            .and_then(|v| v.versions.as_ref())
            .map(|v| v.version.as_slice())
            .unwrap_or(&[])
    }

    pub fn release(&self) -> Option<&str> {
        self.versioning.as_ref()?.release.as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn latest(&self) -> Option<&str> {
        self.versioning.as_ref()?.latest.as_deref()
            .filter(|s| !s.is_empty())
    }

    /// the deployed file version of a snapshot for a classifier / extension combination
    pub fn snapshot_value(&self, classifier: &str, extension: &str) -> Option<&str> {
        self.versioning.as_ref()?
            .snapshotVersions.as_ref()?
            .snapshotVersion.iter()
            .find(|sv| sv.classifier.as_deref().unwrap_or("") == classifier && sv.extension == extension)
            .map(|sv| sv.value.as_str())
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.versioning.as_ref()?.snapshot.as_ref()
    }
}
