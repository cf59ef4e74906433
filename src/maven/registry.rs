//! Assembles the ordered list of repositories a request is resolved against: project repositories
//! first, then the user's overrides, then mirror, proxy and credential injection from settings.

use tracing::debug;

use crate::error::ConfigError;
use crate::maven::layout::{LayoutRegistry, DEFAULT_LAYOUT};
use crate::maven::repository::{RemoteRepository, RepositoryPolicy, CENTRAL_ID, CENTRAL_URL};
use crate::maven::settings::Settings;

/// id of repositories given as a bare URL
pub const TEMP_REPOSITORY_ID: &str = "temp";

const SEPARATOR: &str = "::";

/// Parses one token of the override string: either `id::layout::url` or a bare URL
pub fn parse_repository(token: &str, layouts: &LayoutRegistry, policy: RepositoryPolicy) -> Result<RemoteRepository, ConfigError> {
    let token = token.trim();

    let (id, layout_id, url) = if token.contains(SEPARATOR) {
        let parts: Vec<&str> = token.split(SEPARATOR).map(str::trim).collect();
        match parts.as_slice() {
            [id, layout, url] if !id.is_empty() && !url.is_empty() => {
                let layout = if layout.is_empty() { DEFAULT_LAYOUT } else { layout };
                (*id, layout, *url)
            }
            _ => return Err(ConfigError::InvalidRepositorySyntax { token: token.to_string() }),
        }
    }
    else {
        (TEMP_REPOSITORY_ID, DEFAULT_LAYOUT, token)
    };

    let layout = layouts.lookup(layout_id)
        .ok_or_else(|| ConfigError::InvalidLayout { id: layout_id.to_string() })?;

    Ok(RemoteRepository::new(id, url, layout, policy))
}

/// Parses a comma separated override string, skipping empty tokens
pub fn parse_repositories(overrides: &str, layouts: &LayoutRegistry) -> Result<Vec<RemoteRepository>, ConfigError> {
    overrides.split(',')
        .filter(|token| !token.trim().is_empty())
        .map(|token| parse_repository(token, layouts, RepositoryPolicy::always_warn()))
        .collect()
}

/// The built-in repository every project implicitly declares
pub fn central_repository(layouts: &LayoutRegistry) -> Result<RemoteRepository, ConfigError> {
    let layout = layouts.lookup(DEFAULT_LAYOUT)
        .ok_or_else(|| ConfigError::InvalidLayout { id: DEFAULT_LAYOUT.to_string() })?;

    let mut result = RemoteRepository::new(CENTRAL_ID, CENTRAL_URL, layout, RepositoryPolicy::default());
    result.snapshots = RepositoryPolicy::disabled();
    Ok(result)
}

/// Repositories of active settings profiles followed by central
pub fn project_repositories(settings: &Settings, layouts: &LayoutRegistry) -> Result<Vec<RemoteRepository>, ConfigError> {
    let mut result = settings.profile_repositories(layouts)?;
    if !result.iter().any(|r| r.id == CENTRAL_ID) {
        result.push(central_repository(layouts)?);
    }
    Ok(result)
}

pub fn build_repository_list(
    project: &[RemoteRepository],
    overrides: Option<&str>,
    layouts: &LayoutRegistry,
    settings: &Settings,
) -> Result<Vec<RemoteRepository>, ConfigError> {
    let mut repositories = project.to_vec();
    if let Some(overrides) = overrides {
        repositories.extend(parse_repositories(overrides, layouts)?);
    }

    let repositories = settings.inject_mirrors(repositories, layouts)?;
    let repositories = settings.inject_proxies(repositories);
    let repositories = settings.inject_authentication(repositories);

    for repo in &repositories {
        debug!("repository {}", repo);
    }
    Ok(repositories)
}
