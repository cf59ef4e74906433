use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::get::GetRequest;
use crate::maven::coordinates::DEFAULT_PACKAGING;

/// Fetches an artifact, and optionally its transitive dependencies, into the local Maven
/// repository
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "arti-get")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct GetArgs {
    /// groupId:artifactId:version[:packaging[:classifier]]
    #[arg(long)]
    pub artifact: Option<String>,

    #[arg(long)]
    pub group_id: Option<String>,

    #[arg(long)]
    pub artifact_id: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub classifier: Option<String>,

    #[arg(long, default_value = DEFAULT_PACKAGING)]
    pub packaging: String,

    /// also fetch the artifact's dependencies
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub transitive: bool,

    /// comma separated, each either a URL or id::layout::url
    #[arg(long)]
    pub remote_repositories: Option<String>,

    /// a directory in local repository format to fetch from before any remote repository
    #[arg(long)]
    pub repository_base: Option<PathBuf>,

    /// copy every fetched file into this directory
    #[arg(long)]
    pub output_directory: Option<PathBuf>,

    /// default: the settings' localRepository, else ~/.m2/repository
    #[arg(long)]
    pub local_repository: Option<PathBuf>,

    /// default: ~/.m2/settings.xml
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// write a JSON report of fetched and failed artifacts
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}
impl GetArgs {
    pub fn request(&self) -> GetRequest {
        GetRequest {
            artifact: self.artifact.clone(),
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            classifier: self.classifier.clone(),
            packaging: self.packaging.clone(),
            transitive: self.transitive,
            remote_repositories: self.remote_repositories.clone(),
            repository_base: self.repository_base.clone(),
            output_directory: self.output_directory.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// default directive for the log filter if RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        }
        else if self.quiet {
            "warn"
        }
        else {
            "info"
        }
    }
}
