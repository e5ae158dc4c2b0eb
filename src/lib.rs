pub mod args;
pub mod capture;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod contract;
pub mod db;
pub mod export;
pub mod reconcile;
pub mod relay_http_server;
pub mod terminal;
