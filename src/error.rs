//! Error taxonomy
//!
//! - [`ConfigError`]: malformed or missing input, always fatal and raised before any I/O
//! - [`ResolveError`]: an artifact, version or descriptor could not be obtained
//! - [`GetError`]: what the driver reports to its caller

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("You must specify an artifact, e.g. --artifact org.apache.maven.plugins:maven-downloader-plugin:1.0")]
    MissingArtifact,

    #[error("Invalid artifact, you must specify groupId:artifactId:version[:packaging[:classifier]] {spec}")]
    InvalidCoordinate { spec: String },

    #[error("Invalid syntax for repository: {token}. Use \"id::layout::url\" or \"URL\".")]
    InvalidRepositorySyntax { token: String },

    #[error("Invalid repository layout: {id}")]
    InvalidLayout { id: String },

    #[error("invalid {setting} '{value}'")]
    InvalidPolicy { setting: &'static str, value: String },

    #[error("failed to read settings {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("no local repository configured and no home directory to default to")]
    NoLocalRepository,
}

/// One repository's reason for not delivering an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFailure {
    pub repository: String,
    pub reason: String,
}

impl fmt::Display for RepositoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.repository, self.reason)
    }
}

fn describe_failures(failures: &[RepositoryFailure]) -> String {
    if failures.is_empty() {
        return "no repositories available".to_string();
    }
    failures.iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("artifact not found: {artifact} ({})", describe_failures(.failures))]
    ArtifactNotFound {
        artifact: String,
        failures: Vec<RepositoryFailure>,
    },

    #[error("could not resolve version '{requirement}' of {artifact}")]
    VersionNotResolved {
        artifact: String,
        requirement: String,
    },

    #[error("invalid version requirement '{requirement}' of {artifact}: {message}")]
    InvalidVersionRequirement {
        artifact: String,
        requirement: String,
        message: String,
    },

    #[error("failed to read descriptor of {artifact}: {source}")]
    Descriptor {
        artifact: String,
        #[source]
        source: Box<ResolveError>,
    },

    #[error("invalid descriptor {path}: {message}")]
    InvalidDescriptor { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum GetError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Couldn't download artifact: {0}")]
    Resolve(#[from] ResolveError),

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
