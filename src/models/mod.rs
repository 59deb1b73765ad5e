pub mod catalog_client;
pub mod catalog_kind;
pub mod catalog_reader;
pub mod codec;
pub mod content_store;
pub mod errors;
pub mod file_info;
pub mod filter;
pub mod host_bridge;
pub mod id;
pub mod preload;
pub mod records;
pub mod task_scope;
pub mod token;
pub mod uploader;
