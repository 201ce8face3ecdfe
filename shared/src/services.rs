pub mod bedrock_service;
pub mod postgres_repository;
pub mod progress_service;
pub mod registration_service;
pub mod repository;
pub mod ses_service;

pub use bedrock_service::*;
pub use postgres_repository::*;
pub use progress_service::*;
pub use registration_service::*;
pub use repository::*;
pub use ses_service::*;
