//! Lifecycle components
//!
//! Every operation takes the caller's [`Identity`](crate::models::Identity)
//! explicitly and validates its input before any store call.

pub mod requests;
pub mod users;

pub use requests::RequestLifecycle;
pub use users::{NewEmployeeForm, ProfileForm, UserLifecycle};
