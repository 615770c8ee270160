pub mod filter;
pub mod handlers;
pub mod repository;

pub use repository::{JobRepository, PgJobRepository};
