pub mod app;
pub mod cli;
pub mod client;
pub mod error;
pub mod metadata;
pub mod server;
pub mod session;
pub mod shell;
pub mod store;
pub mod sync;
pub mod types;
