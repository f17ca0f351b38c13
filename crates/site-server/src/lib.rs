pub mod config;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;
