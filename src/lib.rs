pub mod api;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod plugin;

pub mod database;
pub mod gateway;
