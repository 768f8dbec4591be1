pub mod error;
pub mod loader;

pub use error::{AppError, Result};
