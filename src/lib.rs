pub mod backend;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod services;

pub use backend::{build_router, AppState};
pub use config::AppConfig;
pub use error::{AppError, FieldErrors};
