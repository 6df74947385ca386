pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod llm;
pub mod mail;
pub mod mood;
pub mod routes;
pub mod scheduler;
mod state;
pub mod wellness;

pub use state::AppState;
