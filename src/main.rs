use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use arti_get::config::GetArgs;
use arti_get::error::ConfigError;
use arti_get::get::GetGoal;
use arti_get::maven::layout::LayoutRegistry;
use arti_get::maven::registry::project_repositories;
use arti_get::maven::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = GetArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn m2_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".m2"))
}

async fn run(args: &GetArgs) -> anyhow::Result<()> {
    let request = args.request();
    request.coordinate()?;

    let settings = match args.settings.clone().or_else(|| m2_dir().map(|d| d.join("settings.xml"))) {
        Some(path) => {
            debug!("reading settings from {}", path.display());
            Settings::load(&path)?
        }
        None => Settings::default(),
    };

    let local_repository = args.local_repository.clone()
        .or_else(|| settings.local_repository.clone())
        .or_else(|| m2_dir().map(|d| d.join("repository")))
        .ok_or(ConfigError::NoLocalRepository)?;
    debug!("local repository is {}", local_repository.display());

    let project = project_repositories(&settings, &LayoutRegistry::default())?;
    let goal = GetGoal::standard(&local_repository, settings, project, args.timeout());

    let report = goal.execute(&request).await?;

    if let Some(path) = &args.report {
        let json = report.to_json()?;
        tokio::fs::write(path, json).await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }
    Ok(())
}
