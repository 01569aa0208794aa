pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod server;
pub mod store;
pub mod types;
pub mod validate;
