//! Expense reimbursement service
//!
//! Employees submit reimbursement requests and managers approve or deny
//! them. The [`lifecycle`] components hold the rules; [`routes`] exposes
//! them over HTTP and [`repositories`] persists them.

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod money;
pub mod notification;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod state;
pub mod validation;

pub use error::{ErsError, ErsResult};
pub use state::AppState;
