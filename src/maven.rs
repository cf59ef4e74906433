pub mod coordinates;
pub mod handlers;
pub mod layout;
pub mod metadata_xml;
pub mod paths;
pub mod pom;
pub mod registry;
pub mod repository;
pub mod settings;
pub mod version;
