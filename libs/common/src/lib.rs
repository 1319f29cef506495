//! Common library for the expense reimbursement system
//!
//! This crate provides shared infrastructure used by the reimbursement
//! service: PostgreSQL connectivity, schema migrations and the persistence
//! error type.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;

pub use database::DatabaseConfig;
pub use error::{DatabaseError, DatabaseResult};
