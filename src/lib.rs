pub mod config;
pub mod ethereum;
pub mod server;
