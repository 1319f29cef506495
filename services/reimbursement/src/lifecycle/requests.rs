//! Request lifecycle: submission, resolution and listings
//!
//! A request is created Pending and resolved at most once, to Approved or
//! Denied. Resolution re-checks the stored state and then relies on the
//! store's conditional update, so concurrent resolvers cannot both win.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ErsError, ErsResult};
use crate::models::{
    Identity, NewRequest, ReimbursementRequest, RequestId, RequestStatus, StatusFilter, UserId,
};
use crate::money::parse_money;
use crate::notification::{Notifications, resolution_message};
use crate::repositories::{RequestStore, UserStore};

#[derive(Clone)]
pub struct RequestLifecycle {
    requests: Arc<dyn RequestStore>,
    users: Arc<dyn UserStore>,
    notifications: Notifications,
}

impl RequestLifecycle {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        users: Arc<dyn UserStore>,
        notifications: Notifications,
    ) -> Self {
        Self {
            requests,
            users,
            notifications,
        }
    }

    /// Submit a Pending request on behalf of the calling employee
    pub async fn submit_new_request(
        &self,
        identity: &Identity,
        amount: &str,
        category: &str,
        description: &str,
    ) -> ErsResult<RequestId> {
        identity.require_employee()?;

        let amount_cents = parse_money(amount)?;
        info!(
            "User {} submitting {} request for {} cents",
            identity.user_id, category, amount_cents
        );

        let request = NewRequest {
            submitter_id: identity.user_id,
            amount_cents,
            category: category.to_string(),
            description: description.to_string(),
            time_submitted: Utc::now(),
        };

        Ok(self.requests.add_request(&request).await?)
    }

    /// Approve or deny a Pending request
    ///
    /// Fails with `AlreadyResolved` when the request has left Pending.
    /// Returns `Ok(false)` when another resolver got there between the check
    /// and the update.
    pub async fn resolve_request(
        &self,
        identity: &Identity,
        request_id: RequestId,
        approved: bool,
    ) -> ErsResult<bool> {
        identity.require_manager()?;

        let mut request = self.find_request(request_id).await?;
        if request.status.is_resolved() {
            return Err(ErsError::AlreadyResolved);
        }

        let status = RequestStatus::from_approval(approved);
        let resolved_at = Utc::now();
        info!(
            "Manager {} resolving request {} as {}",
            identity.user_id, request_id, status
        );

        if !self
            .requests
            .resolve_request(identity.user_id, request_id, status, resolved_at)
            .await?
        {
            warn!("Request {} was resolved concurrently", request_id);
            return Ok(false);
        }

        request.status = status;
        request.resolver_id = Some(identity.user_id);
        request.time_resolved = Some(resolved_at);
        self.notify_submitter(&request).await;

        Ok(true)
    }

    async fn notify_submitter(&self, request: &ReimbursementRequest) {
        match self.users.get_user(request.submitter_id).await {
            Ok(Some(submitter)) => {
                if let Some(message) = resolution_message(&submitter, request) {
                    self.notifications.dispatch(message);
                }
            }
            Ok(None) => warn!(
                "Submitter {} of request {} no longer exists",
                request.submitter_id, request.request_id
            ),
            Err(e) => warn!(
                "Could not load submitter {} for notification: {}",
                request.submitter_id, e
            ),
        }
    }

    async fn find_request(&self, request_id: RequestId) -> ErsResult<ReimbursementRequest> {
        self.requests
            .get_request(request_id)
            .await?
            .ok_or_else(|| ErsError::NotFound(format!("Request {} not found", request_id)))
    }

    /// A single request; employees may only see their own
    pub async fn view_request(
        &self,
        identity: &Identity,
        request_id: RequestId,
    ) -> ErsResult<ReimbursementRequest> {
        let request = self.find_request(request_id).await?;
        identity.require_access_to(request.submitter_id)?;

        Ok(request)
    }

    /// Requests submitted by `user_id`, newest first
    pub async fn list_requests(
        &self,
        identity: &Identity,
        user_id: UserId,
        filter: StatusFilter,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        identity.require_access_to(user_id)?;
        info!("Listing {:?} requests of user {}", filter, user_id);

        Ok(self.requests.query_requests(Some(user_id), filter).await?)
    }

    /// Requests from every submitter, newest first
    pub async fn list_all_requests(
        &self,
        identity: &Identity,
        filter: StatusFilter,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        identity.require_manager()?;
        info!("Manager {} listing all {:?} requests", identity.user_id, filter);

        Ok(self.requests.query_requests(None, filter).await?)
    }

    pub async fn view_requests(
        &self,
        identity: &Identity,
        user_id: UserId,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_requests(identity, user_id, StatusFilter::All)
            .await
    }

    pub async fn view_pending_requests(
        &self,
        identity: &Identity,
        user_id: UserId,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_requests(identity, user_id, StatusFilter::Pending)
            .await
    }

    pub async fn view_resolved_requests(
        &self,
        identity: &Identity,
        user_id: UserId,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_requests(identity, user_id, StatusFilter::Resolved)
            .await
    }

    pub async fn view_all_requests(
        &self,
        identity: &Identity,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_all_requests(identity, StatusFilter::All).await
    }

    pub async fn view_all_pending_requests(
        &self,
        identity: &Identity,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_all_requests(identity, StatusFilter::Pending)
            .await
    }

    pub async fn view_all_resolved_requests(
        &self,
        identity: &Identity,
    ) -> ErsResult<Vec<ReimbursementRequest>> {
        self.list_all_requests(identity, StatusFilter::Resolved)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role, UserKind};
    use crate::notification::MockNotifier;
    use crate::repositories::{MemoryStore, MockRequestStore};
    use common::error::DatabaseError;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const MANAGER: Identity = Identity {
        user_id: 1,
        role: Role::Manager,
    };

    fn quiet_notifications() -> Notifications {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_, _, _| Ok(()));
        Notifications::new(Arc::new(notifier))
    }

    fn lifecycle(store: &MemoryStore) -> RequestLifecycle {
        RequestLifecycle::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            quiet_notifications(),
        )
    }

    async fn seed_employee(store: &MemoryStore, email: &str) -> Identity {
        let user_id = store
            .add_new_user(&NewUser {
                password: "afsdfsad1".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                date_of_birth: None,
                kind: UserKind::employee(email),
            })
            .await
            .unwrap();
        Identity::new(user_id, Role::Employee)
    }

    #[tokio::test]
    async fn test_submitted_request_is_pending() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);
        let employee = seed_employee(&store, "ada@example.com").await;

        let id = requests
            .submit_new_request(&employee, "123.23", "Travel", "Train fare")
            .await
            .unwrap();

        let request = requests.view_request(&employee, id).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.amount_cents, 12323);
        assert_eq!(request.submitter_id, employee.user_id);
        assert_eq!(request.resolver_id, None);
        assert_eq!(request.time_resolved, None);
    }

    #[tokio::test]
    async fn test_invalid_amount_never_reaches_store() {
        let mut store = MockRequestStore::new();
        store.expect_add_request().never();
        let requests = RequestLifecycle::new(
            Arc::new(store),
            Arc::new(MemoryStore::new()),
            quiet_notifications(),
        );
        let employee = Identity::new(2, Role::Employee);

        for amount in ["123.345", "-12", "123a", "123.23.", ""] {
            assert!(
                matches!(
                    requests
                        .submit_new_request(&employee, amount, "Travel", "")
                        .await,
                    Err(ErsError::InvalidAmount(_))
                ),
                "{:?} should be rejected",
                amount
            );
        }
    }

    #[tokio::test]
    async fn test_missing_identity_is_persistence_error() {
        let mut store = MockRequestStore::new();
        store
            .expect_add_request()
            .returning(|_| Err(DatabaseError::NoIdentity("requests")));
        let requests = RequestLifecycle::new(
            Arc::new(store),
            Arc::new(MemoryStore::new()),
            quiet_notifications(),
        );

        let result = requests
            .submit_new_request(&Identity::new(2, Role::Employee), "10", "Meals", "")
            .await;

        assert!(matches!(result, Err(ErsError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_managers_cannot_submit() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);

        let result = requests
            .submit_new_request(&MANAGER, "10", "Meals", "")
            .await;

        assert!(matches!(result, Err(ErsError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_request_resolves_exactly_once() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);
        let employee = seed_employee(&store, "ada@example.com").await;
        let id = requests
            .submit_new_request(&employee, "50", "Meals", "Team lunch")
            .await
            .unwrap();

        assert!(requests.resolve_request(&MANAGER, id, true).await.unwrap());
        let resolved = requests.view_request(&MANAGER, id).await.unwrap();
        assert_eq!(resolved.status, RequestStatus::Approved);
        assert_eq!(resolved.resolver_id, Some(MANAGER.user_id));
        assert!(resolved.time_resolved.is_some());

        let other_manager = Identity::new(7, Role::Manager);
        assert!(matches!(
            requests.resolve_request(&other_manager, id, false).await,
            Err(ErsError::AlreadyResolved)
        ));

        let unchanged = requests.view_request(&MANAGER, id).await.unwrap();
        assert_eq!(unchanged, resolved);
    }

    #[tokio::test]
    async fn test_resolve_checks_capability_and_existence() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);
        let employee = seed_employee(&store, "ada@example.com").await;
        let id = requests
            .submit_new_request(&employee, "50", "Meals", "")
            .await
            .unwrap();

        assert!(matches!(
            requests.resolve_request(&employee, id, true).await,
            Err(ErsError::Forbidden(_))
        ));
        assert!(matches!(
            requests.resolve_request(&MANAGER, id + 100, true).await,
            Err(ErsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lost_race_reports_false() {
        let mut store = MockRequestStore::new();
        store.expect_get_request().returning(|request_id| {
            Ok(Some(ReimbursementRequest {
                request_id,
                submitter_id: 2,
                resolver_id: None,
                amount_cents: 100,
                category: "Meals".to_string(),
                description: String::new(),
                time_submitted: Utc::now(),
                time_resolved: None,
                status: RequestStatus::Pending,
            }))
        });
        store
            .expect_resolve_request()
            .times(1)
            .returning(|_, _, _, _| Ok(false));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();
        let requests = RequestLifecycle::new(
            Arc::new(store),
            Arc::new(MemoryStore::new()),
            Notifications::new(Arc::new(notifier)),
        );

        assert!(!requests.resolve_request(&MANAGER, 3, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolution_notifies_submitter() {
        let store = MemoryStore::new();
        let employee = seed_employee(&store, "ada@example.com").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(move |to, _, body| {
            let _ = tx.send((to.to_string(), body.to_string()));
            Ok(())
        });
        let requests = RequestLifecycle::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Notifications::new(Arc::new(notifier)),
        );

        let id = requests
            .submit_new_request(&employee, "123.23", "Travel", "")
            .await
            .unwrap();
        requests.resolve_request(&MANAGER, id, false).await.unwrap();

        let (to, body) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(to, "ada@example.com");
        assert!(body.contains("$123.23 has been Denied"));
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_fail_resolution() {
        let store = MemoryStore::new();
        let employee = seed_employee(&store, "ada@example.com").await;

        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_, _, _| {
            Err(crate::notification::NotificationError::Transport(
                "relay down".to_string(),
            ))
        });
        let requests = RequestLifecycle::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Notifications::new(Arc::new(notifier)),
        );

        let id = requests
            .submit_new_request(&employee, "5", "Meals", "")
            .await
            .unwrap();

        assert!(requests.resolve_request(&MANAGER, id, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_listing_is_filtered_and_newest_first() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);
        let ada = seed_employee(&store, "ada@example.com").await;
        let bob = seed_employee(&store, "bob@example.com").await;

        let first = requests
            .submit_new_request(&ada, "1", "Meals", "")
            .await
            .unwrap();
        let second = requests
            .submit_new_request(&bob, "2", "Meals", "")
            .await
            .unwrap();
        let third = requests
            .submit_new_request(&ada, "3", "Meals", "")
            .await
            .unwrap();
        requests.resolve_request(&MANAGER, second, true).await.unwrap();

        let pending = requests.view_all_pending_requests(&MANAGER).await.unwrap();
        assert!(pending.iter().all(|r| r.status == RequestStatus::Pending));
        assert_eq!(
            pending.iter().map(|r| r.request_id).collect::<Vec<_>>(),
            vec![third, first]
        );
        assert!(
            pending
                .windows(2)
                .all(|pair| pair[0].time_submitted >= pair[1].time_submitted)
        );

        let resolved = requests.view_all_resolved_requests(&MANAGER).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].request_id, second);
        assert_eq!(requests.view_all_requests(&MANAGER).await.unwrap().len(), 3);

        assert_eq!(requests.view_requests(&ada, ada.user_id).await.unwrap().len(), 2);
        assert_eq!(
            requests
                .view_pending_requests(&MANAGER, bob.user_id)
                .await
                .unwrap()
                .len(),
            0
        );
        assert_eq!(
            requests
                .view_resolved_requests(&bob, bob.user_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_employees_only_see_their_own_requests() {
        let store = MemoryStore::new();
        let requests = lifecycle(&store);
        let ada = seed_employee(&store, "ada@example.com").await;
        let bob = seed_employee(&store, "bob@example.com").await;
        let id = requests
            .submit_new_request(&bob, "9.99", "Books", "")
            .await
            .unwrap();

        assert!(matches!(
            requests.view_request(&ada, id).await,
            Err(ErsError::Forbidden(_))
        ));
        assert!(matches!(
            requests.view_requests(&ada, bob.user_id).await,
            Err(ErsError::Forbidden(_))
        ));
        assert!(matches!(
            requests.view_all_requests(&ada).await,
            Err(ErsError::Forbidden(_))
        ));
        assert!(matches!(
            requests.view_request(&ada, id + 50).await,
            Err(ErsError::NotFound(_))
        ));
    }
}
