pub mod config;
pub mod error;
pub mod get;
pub mod local;
pub mod maven;
pub mod resolve;
pub mod util;
