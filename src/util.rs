pub mod blob;
pub mod proxy_connector;
pub mod validating_http_downloader;
pub mod validating_stream;
