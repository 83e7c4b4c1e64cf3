pub mod agents;
pub mod aggregate;
pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod fetch;
pub mod history;
pub mod merge;
pub mod names;
pub mod profile;
pub mod server;
pub mod slate;
pub mod team;
