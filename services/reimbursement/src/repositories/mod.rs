//! Repositories for database operations
//!
//! The lifecycles only see the [`UserStore`] and [`RequestStore`] traits.
//! PostgreSQL adapters back them in production and [`memory::MemoryStore`]
//! backs them in tests. Every adapter turns stored rows into domain values
//! through [`UserRecord`] and [`RequestRecord`], so password redaction and
//! status decoding happen in exactly one place.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::FromRow;

use crate::models::{
    NewRequest, NewUser, ProfileUpdate, REDACTED_PASSWORD, ReimbursementRequest, RequestId,
    RequestStatus, Role, StatusFilter, User, UserId, UserKind,
};

pub mod memory;
pub mod request;
pub mod user;

pub use memory::MemoryStore;
pub use request::RequestRepository;
pub use user::UserRepository;

/// Persistence contract for users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user and return the generated id
    async fn add_new_user(&self, new_user: &NewUser) -> DatabaseResult<UserId>;

    /// Replace a user's mutable fields; false when no user matched
    async fn update_user(&self, update: &ProfileUpdate) -> DatabaseResult<bool>;

    /// Look up a user by credentials
    async fn authenticate_user(
        &self,
        user_id: UserId,
        password: &str,
    ) -> DatabaseResult<Option<User>>;

    /// Find a user by id
    async fn get_user(&self, user_id: UserId) -> DatabaseResult<Option<User>>;

    /// All employees ordered by id
    async fn get_all_employees(&self) -> DatabaseResult<Vec<User>>;

    /// True when no user holds `email`, compared case-insensitively
    async fn email_is_available(&self, email: &str) -> DatabaseResult<bool>;
}

/// Persistence contract for reimbursement requests
///
/// Listings are returned most recently submitted first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a Pending request and return the generated id
    async fn add_request(&self, request: &NewRequest) -> DatabaseResult<RequestId>;

    /// Move a Pending request to `status`, stamping resolver and time
    ///
    /// Only matches requests that are still Pending, so a request is
    /// stamped at most once.
    async fn resolve_request(
        &self,
        resolver_id: UserId,
        request_id: RequestId,
        status: RequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    /// Find a request by id
    async fn get_request(&self, request_id: RequestId)
    -> DatabaseResult<Option<ReimbursementRequest>>;

    /// Requests matching `filter`, optionally restricted to one submitter
    async fn query_requests(
        &self,
        submitter_id: Option<UserId>,
        filter: StatusFilter,
    ) -> DatabaseResult<Vec<ReimbursementRequest>>;

    async fn get_requests(&self, user_id: UserId) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(Some(user_id), StatusFilter::All).await
    }

    async fn get_pending_requests(
        &self,
        user_id: UserId,
    ) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(Some(user_id), StatusFilter::Pending)
            .await
    }

    async fn get_resolved_requests(
        &self,
        user_id: UserId,
    ) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(Some(user_id), StatusFilter::Resolved)
            .await
    }

    async fn get_all_requests(&self) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(None, StatusFilter::All).await
    }

    async fn get_all_pending_requests(&self) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(None, StatusFilter::Pending).await
    }

    async fn get_all_resolved_requests(&self) -> DatabaseResult<Vec<ReimbursementRequest>> {
        self.query_requests(None, StatusFilter::Resolved).await
    }
}

/// Stored shape of a user, without the password hash
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub user_id: UserId,
    pub user_type: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UserRecord {
    /// Build the stored shape of a new user
    pub fn from_new_user(user_id: UserId, new_user: &NewUser) -> Self {
        Self {
            user_id,
            user_type: new_user.kind.role().as_str().to_string(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            email: match &new_user.kind {
                UserKind::Employee { email, .. } => Some(email.clone()),
                UserKind::Manager => None,
            },
            date_of_birth: new_user.date_of_birth,
        }
    }

    /// Convert into a user whose password is the redaction token
    pub fn into_user(self) -> DatabaseResult<User> {
        let kind = match Role::parse(&self.user_type) {
            Some(Role::Employee) => UserKind::employee(self.email.unwrap_or_default()),
            Some(Role::Manager) => UserKind::Manager,
            None => {
                return Err(DatabaseError::Corrupt(format!(
                    "user {} has unknown type '{}'",
                    self.user_id, self.user_type
                )));
            }
        };

        Ok(User {
            user_id: self.user_id,
            password: REDACTED_PASSWORD.to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            kind,
        })
    }
}

/// Stored shape of a reimbursement request
#[derive(Debug, Clone, FromRow)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub submitter_id: UserId,
    pub resolver_id: Option<UserId>,
    pub amount_cents: i64,
    pub category: String,
    pub description: String,
    pub time_submitted: DateTime<Utc>,
    pub time_resolved: Option<DateTime<Utc>>,
    pub status: String,
}

impl RequestRecord {
    pub fn into_request(self) -> DatabaseResult<ReimbursementRequest> {
        let status = self
            .status
            .parse::<RequestStatus>()
            .map_err(|e| DatabaseError::Corrupt(format!("request {}: {}", self.request_id, e)))?;

        Ok(ReimbursementRequest {
            request_id: self.request_id,
            submitter_id: self.submitter_id,
            resolver_id: self.resolver_id,
            amount_cents: self.amount_cents,
            category: self.category,
            description: self.description,
            time_submitted: self.time_submitted,
            time_resolved: self.time_resolved,
            status,
        })
    }
}
