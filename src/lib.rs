pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod server;

#[cfg(test)]
pub mod testing;
