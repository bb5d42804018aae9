pub mod capture;
pub mod config;
pub mod extract;
pub mod fields;
pub mod models;
pub mod reconcile;
pub mod snapshot;
pub mod submit;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use extract::PriceResolver;
pub use models::{ImportPayload, ProductRecord};
pub use snapshot::PageSnapshot;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
