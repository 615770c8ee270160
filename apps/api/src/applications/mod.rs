pub mod handlers;
pub mod intake;
pub mod repository;

pub use repository::{ApplicationRepository, PgApplicationRepository};
