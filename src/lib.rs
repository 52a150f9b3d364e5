pub mod config;
pub mod errors;
pub mod journal;
pub mod models;
pub mod retention;
pub mod server;
pub mod service;
pub mod services;
pub mod utils;
