use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::maven::coordinates::ArtifactCoordinate;
use crate::maven::repository::RemoteRepository;
use crate::resolve::descriptor_reader::{ArtifactDescriptor, DeclaredDependency, DependencyScope, DescriptorReader};

/// One artifact in the dependency graph, the root having depth 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub coordinate: ArtifactCoordinate,
    pub depth: usize,
    pub scope: DependencyScope,
}

/// Walks the dependency graph breadth-first. Each groupId:artifactId is visited once, the
///  declaration nearest to the root wins.
pub struct DependencyCollector {
    reader: Arc<dyn DescriptorReader>,
}

struct Pending {
    node: DependencyNode,
    exclusions: Vec<(String, String)>,
    descriptor: Option<ArtifactDescriptor>,
}

struct Walk {
    reader: Arc<dyn DescriptorReader>,
    repositories: Arc<[RemoteRepository]>,
    queue: VecDeque<Pending>,
    seen: HashSet<(String, String)>,
}

impl DependencyCollector {
    pub fn new(reader: Arc<dyn DescriptorReader>) -> DependencyCollector {
        DependencyCollector {
            reader,
        }
    }

    /// The root is the first node. Failing to read the root's descriptor is an error, failing to
    ///  read any other node's descriptor only prunes that node's subtree.
    pub async fn collect(&self, root: &ArtifactCoordinate, repositories: Arc<[RemoteRepository]>) -> Result<BoxStream<'static, DependencyNode>, ResolveError> {
        let descriptor = self.reader.read(root, &repositories).await
            .map_err(|e| ResolveError::Descriptor {
                artifact: root.to_string(),
                source: Box::new(e),
            })?;

        let mut walk = Walk {
            reader: self.reader.clone(),
            repositories,
            queue: VecDeque::new(),
            seen: HashSet::new(),
        };
        walk.seen.insert(root.key());
        walk.queue.push_back(Pending {
            node: DependencyNode {
                coordinate: root.clone(),
                depth: 0,
                scope: DependencyScope::Compile,
            },
            exclusions: vec![],
            descriptor: Some(descriptor),
        });

        Ok(stream::unfold(walk, |mut walk| async move {
            let Some(next) = walk.queue.pop_front() else {
                return None;
            };
            walk.visit(next).await
        }).boxed())
    }
}

impl Walk {
    async fn visit(mut self, pending: Pending) -> Option<(DependencyNode, Walk)> {
        let descriptor = match pending.descriptor {
            Some(d) => Some(d),
            None => match self.reader.read(&pending.node.coordinate, &self.repositories).await {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("could not read descriptor of {}, skipping its dependencies: {}", pending.node.coordinate, e);
                    None
                }
            },
        };

        for dependency in descriptor.map(|d| d.dependencies).unwrap_or_default() {
            if !is_followed(&pending.node, &dependency) {
                debug!("not following {} ({}) of {}", dependency.coordinate, dependency.scope.as_str(), pending.node.coordinate);
                continue;
            }
            if is_excluded(&pending.exclusions, &dependency.coordinate) {
                debug!("{} is excluded below {}", dependency.coordinate, pending.node.coordinate);
                continue;
            }
            if !self.seen.insert(dependency.coordinate.key()) {
                continue;
            }

            let scope = if pending.node.depth == 0 {
                dependency.scope
            }
            else {
                pending.node.scope.propagate(dependency.scope)
            };
            let mut exclusions = pending.exclusions.clone();
            exclusions.extend(dependency.exclusions);

            self.queue.push_back(Pending {
                node: DependencyNode {
                    coordinate: dependency.coordinate,
                    depth: pending.node.depth + 1,
                    scope,
                },
                exclusions,
                descriptor: None,
            });
        }

        Some((pending.node, self))
    }
}

/// The root's own dependencies are followed in every scope that refers to an artifact,
///  transitive ones only if they are needed at runtime
fn is_followed(parent: &DependencyNode, dependency: &DeclaredDependency) -> bool {
    if parent.depth == 0 {
        return !matches!(dependency.scope, DependencyScope::System | DependencyScope::Import);
    }
    !dependency.optional && matches!(dependency.scope, DependencyScope::Compile | DependencyScope::Runtime)
}

fn is_excluded(exclusions: &[(String, String)], coordinate: &ArtifactCoordinate) -> bool {
    let matches = |pattern: &str, value: &str| pattern == "*" || pattern == value;
    exclusions.iter()
        .any(|(g, a)| matches(g, &coordinate.group_id.0) && matches(a, &coordinate.artifact_id.0))
}
