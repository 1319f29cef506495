//! Reimbursement service models

pub mod request;
pub mod user;

// Re-export for convenience
pub use request::{
    NewRequest, ReimbursementRequest, RequestId, RequestResponse, RequestStatus, StatusFilter,
};
pub use user::{
    Identity, NewUser, ProfileUpdate, REDACTED_PASSWORD, Role, User, UserId, UserKind,
};
