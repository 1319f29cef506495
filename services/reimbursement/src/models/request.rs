//! Reimbursement request model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::user::UserId;
use crate::money::format_cents;

/// Identity assigned by the store
pub type RequestId = i32;

/// Lifecycle state of a request
///
/// `Pending` is the only non terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Denied => "Denied",
        }
    }

    /// Terminal status for a manager's decision
    pub fn from_approval(approved: bool) -> Self {
        if approved {
            RequestStatus::Approved
        } else {
            RequestStatus::Denied
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("Pending") => Ok(RequestStatus::Pending),
            s if s.eq_ignore_ascii_case("Approved") => Ok(RequestStatus::Approved),
            s if s.eq_ignore_ascii_case("Denied") => Ok(RequestStatus::Denied),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// Which statuses a listing includes; `Resolved` covers Approved and Denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Resolved,
}

impl StatusFilter {
    pub fn matches(&self, status: RequestStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == RequestStatus::Pending,
            StatusFilter::Resolved => status.is_resolved(),
        }
    }
}

/// Reimbursement request entity
#[derive(Debug, Clone, PartialEq)]
pub struct ReimbursementRequest {
    pub request_id: RequestId,
    pub submitter_id: UserId,
    /// Set together with `time_resolved`, only when leaving Pending
    pub resolver_id: Option<UserId>,
    pub amount_cents: i64,
    pub category: String,
    pub description: String,
    pub time_submitted: DateTime<Utc>,
    pub time_resolved: Option<DateTime<Utc>>,
    pub status: RequestStatus,
}

impl ReimbursementRequest {
    /// Amount rendered as `$D.CC`
    pub fn display_amount(&self) -> String {
        format_cents(self.amount_cents)
    }
}

/// New request creation payload; stored with status Pending
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub submitter_id: UserId,
    pub amount_cents: i64,
    pub category: String,
    pub description: String,
    pub time_submitted: DateTime<Utc>,
}

/// Response for request operations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    #[serde(rename = "submitterID")]
    pub submitter_id: UserId,
    #[serde(rename = "resolverID")]
    pub resolver_id: Option<UserId>,
    pub amount: String,
    pub amount_cents: i64,
    pub category: String,
    pub description: String,
    pub time_submitted: DateTime<Utc>,
    pub time_resolved: Option<DateTime<Utc>>,
    pub status: RequestStatus,
}

impl From<ReimbursementRequest> for RequestResponse {
    fn from(request: ReimbursementRequest) -> Self {
        Self {
            amount: request.display_amount(),
            request_id: request.request_id,
            submitter_id: request.submitter_id,
            resolver_id: request.resolver_id,
            amount_cents: request.amount_cents,
            category: request.category,
            description: request.description,
            time_submitted: request.time_submitted,
            time_resolved: request.time_resolved,
            status: request.status,
        }
    }
}
