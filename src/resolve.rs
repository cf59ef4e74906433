pub mod artifact_resolver;
pub mod connector;
pub mod dependency_collector;
pub mod dependency_resolver;
pub mod descriptor_reader;
pub mod version_resolver;
