pub mod adapters;
pub mod alerts;
pub mod config;
pub mod detector;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod reports;
pub mod scheduler;
pub mod snapshot;
pub mod utils;

pub use config::AppConfig;
pub use utils::error::{AppError, Result};
