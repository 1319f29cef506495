//! In-memory store implementing both persistence contracts
//!
//! Mirrors the PostgreSQL adapters closely enough for lifecycle and HTTP
//! tests: serial ids from 1, hashed credentials, case-insensitive email
//! lookups and the Pending-only conditional resolve.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::credentials::{hash_password, verify_password};
use crate::validation::emails_match;
use crate::models::{
    NewRequest, NewUser, ProfileUpdate, ReimbursementRequest, RequestId, RequestStatus, Role,
    StatusFilter, User, UserId,
};
use crate::repositories::{RequestRecord, RequestStore, UserRecord, UserStore};

#[derive(Debug)]
struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, StoredUser>,
    requests: BTreeMap<RequestId, RequestRecord>,
    last_user_id: UserId,
    last_request_id: RequestId,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn add_new_user(&self, new_user: &NewUser) -> DatabaseResult<UserId> {
        let password_hash = hash_password(&new_user.password)?;

        let mut state = self.state.lock().await;
        state.last_user_id += 1;
        let user_id = state.last_user_id;

        state.users.insert(
            user_id,
            StoredUser {
                record: UserRecord::from_new_user(user_id, new_user),
                password_hash,
            },
        );

        Ok(user_id)
    }

    async fn update_user(&self, update: &ProfileUpdate) -> DatabaseResult<bool> {
        let password_hash = hash_password(&update.password)?;

        let mut state = self.state.lock().await;
        let Some(stored) = state.users.get_mut(&update.user_id) else {
            return Ok(false);
        };

        stored.password_hash = password_hash;
        stored.record.first_name = update.first_name.clone();
        stored.record.last_name = update.last_name.clone();
        stored.record.email = update.email.clone();
        stored.record.date_of_birth = update.date_of_birth;

        Ok(true)
    }

    async fn authenticate_user(
        &self,
        user_id: UserId,
        password: &str,
    ) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;
        let Some(stored) = state.users.get(&user_id) else {
            return Ok(None);
        };

        if !verify_password(password, &stored.password_hash)? {
            return Ok(None);
        }

        stored.record.clone().into_user().map(Some)
    }

    async fn get_user(&self, user_id: UserId) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;

        state
            .users
            .get(&user_id)
            .map(|stored| stored.record.clone().into_user())
            .transpose()
    }

    async fn get_all_employees(&self) -> DatabaseResult<Vec<User>> {
        let state = self.state.lock().await;

        state
            .users
            .values()
            .filter(|stored| Role::parse(&stored.record.user_type) == Some(Role::Employee))
            .map(|stored| stored.record.clone().into_user())
            .collect()
    }

    async fn email_is_available(&self, email: &str) -> DatabaseResult<bool> {
        let state = self.state.lock().await;

        Ok(!state.users.values().any(|stored| {
            stored
                .record
                .email
                .as_deref()
                .is_some_and(|taken| emails_match(taken, email))
        }))
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn add_request(&self, request: &NewRequest) -> DatabaseResult<RequestId> {
        let mut state = self.state.lock().await;
        state.last_request_id += 1;
        let request_id = state.last_request_id;

        state.requests.insert(
            request_id,
            RequestRecord {
                request_id,
                submitter_id: request.submitter_id,
                resolver_id: None,
                amount_cents: request.amount_cents,
                category: request.category.clone(),
                description: request.description.clone(),
                time_submitted: request.time_submitted,
                time_resolved: None,
                status: RequestStatus::Pending.as_str().to_string(),
            },
        );

        Ok(request_id)
    }

    async fn resolve_request(
        &self,
        resolver_id: UserId,
        request_id: RequestId,
        status: RequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let mut state = self.state.lock().await;
        let Some(record) = state.requests.get_mut(&request_id) else {
            return Ok(false);
        };

        if record.status != RequestStatus::Pending.as_str() {
            return Ok(false);
        }

        record.status = status.as_str().to_string();
        record.resolver_id = Some(resolver_id);
        record.time_resolved = Some(resolved_at);

        Ok(true)
    }

    async fn get_request(
        &self,
        request_id: RequestId,
    ) -> DatabaseResult<Option<ReimbursementRequest>> {
        let state = self.state.lock().await;

        state
            .requests
            .get(&request_id)
            .map(|record| record.clone().into_request())
            .transpose()
    }

    async fn query_requests(
        &self,
        submitter_id: Option<UserId>,
        filter: StatusFilter,
    ) -> DatabaseResult<Vec<ReimbursementRequest>> {
        let state = self.state.lock().await;

        let mut requests = state
            .requests
            .values()
            .filter(|record| submitter_id.is_none_or(|id| record.submitter_id == id))
            .map(|record| record.clone().into_request())
            .collect::<DatabaseResult<Vec<_>>>()?;

        requests.retain(|request| filter.matches(request.status));
        requests.sort_by(|a, b| {
            b.time_submitted
                .cmp(&a.time_submitted)
                .then(b.request_id.cmp(&a.request_id))
        });

        Ok(requests)
    }
}
