//! Email notifications
//!
//! Notifications are a side channel: [`Notifications::dispatch`] hands the
//! message to a background task and any failure ends as a warning in the
//! log. Lifecycle operations never wait on or observe the outcome.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::{ReimbursementRequest, User, UserId};
use crate::settings::NotificationSettings;

/// Error raised by a notifier
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Invalid email address entered: {0}")]
    InvalidAddress(String),

    #[error("Error sending email: {0}")]
    Transport(String),
}

/// Outbound email channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// An email ready to be dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

fn check_address(to: &str) -> Result<(), NotificationError> {
    match to.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(NotificationError::InvalidAddress(to.to_string())),
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts messages as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailRelay {
    client: reqwest::Client,
    relay_url: String,
    sender: String,
}

impl HttpMailRelay {
    pub fn new(relay_url: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: relay_url.into(),
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailRelay {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        check_address(to)?;

        self.client
            .post(&self.relay_url)
            .json(&RelayPayload {
                from: &self.sender,
                to,
                subject,
                body,
            })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotificationError> {
        check_address(to)?;
        info!("Email from {} to {}: {}", self.sender, to, subject);
        Ok(())
    }
}

/// Fire-and-forget front for a [`Notifier`]
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
}

impl Notifications {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Relay when one is configured, otherwise the log
    pub fn from_settings(settings: &NotificationSettings) -> Self {
        let notifier: Arc<dyn Notifier> = match &settings.relay_url {
            Some(url) => Arc::new(HttpMailRelay::new(url.clone(), settings.sender.clone())),
            None => Arc::new(LogNotifier::new(settings.sender.clone())),
        };
        Self::new(notifier)
    }

    /// Send in the background; failures are logged and swallowed
    ///
    /// Must be called from within a tokio runtime. The handle may be
    /// dropped; it is returned so callers can wait for delivery in tests.
    pub fn dispatch(&self, message: EmailMessage) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            if let Err(e) = notifier
                .send(&message.to, &message.subject, &message.body)
                .await
            {
                warn!(
                    "Email notification '{}' to {} failed: {}",
                    message.subject, message.to, e
                );
            }
        })
    }
}

/// Welcome email for a newly created employee
pub fn welcome_message(
    user_id: UserId,
    first_name: &str,
    last_name: &str,
    email: &str,
    temporary_password: Option<&str>,
) -> EmailMessage {
    let credentials = match temporary_password {
        Some(password) => format!(
            " and a temporary password of {}. At your earliest convenience please use these \
             credentials to log in to your account and create a new password.",
            password
        ),
        None => ". Please log in with the password provided by your manager.".to_string(),
    };

    EmailMessage {
        to: email.to_string(),
        subject: "Welcome to ERS".to_string(),
        body: format!(
            "Hello {} {},\n\nYour new ERS account has been created with an employee id of {}{}\
             \n\nThis is an automated message. For any questions or concerns please contact \
             your direct manager.\n\nERS IT Department",
            first_name, last_name, user_id, credentials
        ),
    }
}

/// Resolution email for the submitter; `None` when the submitter has no email
pub fn resolution_message(submitter: &User, request: &ReimbursementRequest) -> Option<EmailMessage> {
    let to = submitter.email().filter(|email| !email.is_empty())?;

    Some(EmailMessage {
        to: to.to_string(),
        subject: "Reimbursement Request Resolution".to_string(),
        body: format!(
            "{},\n\nYour reimbursement request for {} in the amount of {} has been {}.\
             \n\nThis is an automated message. For any questions or concerns please contact \
             your direct manager.\n\nERS Department of Billing",
            submitter.first_name,
            request.category,
            request.display_amount(),
            request.status
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{REDACTED_PASSWORD, RequestStatus, UserKind};
    use chrono::Utc;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_sends_message() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|to, subject, _| to.contains("ada@example.com") && subject.contains("Subject"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let notifications = Notifications::new(Arc::new(notifier));
        notifications.dispatch(message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(NotificationError::Transport("smtp down".to_string())));

        let notifications = Notifications::new(Arc::new(notifier));
        assert!(notifications.dispatch(message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier_rejects_bad_address() {
        let notifier = LogNotifier::new("notifications@ers.local");

        assert!(notifier.send("ada@example.com", "s", "b").await.is_ok());
        assert!(matches!(
            notifier.send("not-an-address", "s", "b").await,
            Err(NotificationError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_welcome_message_mentions_temporary_password() {
        let message = welcome_message(12, "Ada", "Lovelace", "ada@example.com", Some("a1!bcde"));

        assert_eq!(message.subject, "Welcome to ERS");
        assert!(message.body.contains("employee id of 12"));
        assert!(message.body.contains("a1!bcde"));

        let message = welcome_message(12, "Ada", "Lovelace", "ada@example.com", None);
        assert!(message.body.contains("provided by your manager"));
    }

    #[test]
    fn test_resolution_message() {
        let submitter = User {
            user_id: 3,
            password: REDACTED_PASSWORD.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: None,
            kind: UserKind::employee("ada@example.com"),
        };
        let request = ReimbursementRequest {
            request_id: 1,
            submitter_id: 3,
            resolver_id: Some(1),
            amount_cents: 12323,
            category: "Travel".to_string(),
            description: "Train".to_string(),
            time_submitted: Utc::now(),
            time_resolved: Some(Utc::now()),
            status: RequestStatus::Approved,
        };

        let message = resolution_message(&submitter, &request).unwrap();
        assert_eq!(message.to, "ada@example.com");
        assert!(message.body.contains("Travel in the amount of $123.23 has been Approved"));

        let manager = User {
            kind: UserKind::Manager,
            ..submitter
        };
        assert!(resolution_message(&manager, &request).is_none());
    }
}
