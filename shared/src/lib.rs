pub mod config;
pub mod errors;
pub mod models;
pub mod progress;
pub mod response;
pub mod services;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use models::*;
pub use progress::{reconcile, Reconciliation};
pub use response::*;
pub use services::*;
pub use utils::*;
