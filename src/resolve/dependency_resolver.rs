use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tracing::info;

use crate::error::ResolveError;
use crate::maven::coordinates::ArtifactCoordinate;
use crate::maven::repository::RemoteRepository;
use crate::resolve::artifact_resolver::{ArtifactResolver, ResolvedArtifact};
use crate::resolve::dependency_collector::DependencyCollector;

/// A graph node that could not be resolved
#[derive(Debug)]
pub struct NodeFailure {
    pub coordinate: ArtifactCoordinate,
    pub error: ResolveError,
}

pub type NodeOutcome = Result<ResolvedArtifact, NodeFailure>;

#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// One outcome per node of the root's dependency graph, root first. Only a failure to read
    ///  the root's descriptor is an error of the whole operation.
    async fn resolve_transitive(&self, root: &ArtifactCoordinate, repositories: Arc<[RemoteRepository]>) -> Result<BoxStream<'static, NodeOutcome>, ResolveError>;
}

/// Resolves every node of the dependency graph in the root's classifier: asking for the
///  'sources' of an artifact gets the 'sources' of all its dependencies.
pub struct TransitiveResolver {
    collector: DependencyCollector,
    resolver: Arc<dyn ArtifactResolver>,
}
impl TransitiveResolver {
    pub fn new(collector: DependencyCollector, resolver: Arc<dyn ArtifactResolver>) -> TransitiveResolver {
        TransitiveResolver {
            collector,
            resolver,
        }
    }
}

#[async_trait]
impl DependencyResolver for TransitiveResolver {
    async fn resolve_transitive(&self, root: &ArtifactCoordinate, repositories: Arc<[RemoteRepository]>) -> Result<BoxStream<'static, NodeOutcome>, ResolveError> {
        let nodes = self.collector.collect(root, repositories.clone()).await?;

        let classifier = root.classifier.clone();
        let resolver = self.resolver.clone();

        let outcomes = nodes.then(move |node| {
            let coordinate = node.coordinate.with_classifier(classifier.clone());
            let resolver = resolver.clone();
            let repositories = repositories.clone();
            async move {
                info!("Resolving {}", coordinate);
                let result = resolver.resolve(&coordinate, &repositories).await;
                result.map_err(|error| NodeFailure { coordinate, error })
            }
        });
        Ok(outcomes.boxed())
    }
}
