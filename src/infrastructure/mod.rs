pub mod encryption;
pub mod logging;
pub mod metadata_client;
