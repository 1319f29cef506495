//! Application state shared across handlers

use std::sync::Arc;

use crate::jwt::JwtService;
use crate::lifecycle::{RequestLifecycle, UserLifecycle};
use crate::notification::Notifications;
use crate::repositories::{RequestStore, UserStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserLifecycle,
    pub requests: RequestLifecycle,
    pub jwt_service: JwtService,
}

impl AppState {
    /// Wire both lifecycles over the given stores
    pub fn new(
        user_store: Arc<dyn UserStore>,
        request_store: Arc<dyn RequestStore>,
        notifications: Notifications,
        jwt_service: JwtService,
        min_password_length: usize,
    ) -> Self {
        Self {
            users: UserLifecycle::new(
                Arc::clone(&user_store),
                notifications.clone(),
                min_password_length,
            ),
            requests: RequestLifecycle::new(request_store, user_store, notifications),
            jwt_service,
        }
    }
}
