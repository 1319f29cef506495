//! User model and related functionality

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErsError, ErsResult};
use crate::models::request::ReimbursementRequest;

/// Identity assigned by the store
pub type UserId = i32;

/// Placeholder returned in place of a stored password
pub const REDACTED_PASSWORD: &str = "**********";

/// Capability set held by a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    /// Discriminant stored in the `user_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Manager => "Manager",
        }
    }

    /// Parse a stored discriminant, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("Employee") {
            Some(Role::Employee)
        } else if value.eq_ignore_ascii_case("Manager") {
            Some(Role::Manager)
        } else {
            None
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant specific user data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "userType")]
pub enum UserKind {
    #[serde(rename_all = "camelCase")]
    Employee {
        email: String,
        /// Requests attached when the employee was built; never filled by reads
        #[serde(skip)]
        requests: Vec<ReimbursementRequest>,
    },
    Manager,
}

impl UserKind {
    /// Employee variant without attached requests
    pub fn employee(email: impl Into<String>) -> Self {
        UserKind::Employee {
            email: email.into(),
            requests: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            UserKind::Employee { .. } => Role::Employee,
            UserKind::Manager => Role::Manager,
        }
    }
}

/// User entity as returned by every read path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(flatten)]
    pub kind: UserKind,
}

impl User {
    pub fn role(&self) -> Role {
        self.kind.role()
    }

    /// Email of an employee, `None` for managers
    pub fn email(&self) -> Option<&str> {
        match &self.kind {
            UserKind::Employee { email, .. } => Some(email),
            UserKind::Manager => None,
        }
    }

    /// Explicit identity for this user
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: self.role(),
        }
    }
}

/// New user creation payload; the password is in cleartext until stored
#[derive(Debug, Clone)]
pub struct NewUser {
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub kind: UserKind,
}

/// Full replacement of a user's mutable fields
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub user_id: UserId,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
}

/// The authenticated caller of a lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Fail with `Forbidden` unless the caller holds the Manager capability
    pub fn require_manager(&self) -> ErsResult<()> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(ErsError::Forbidden(
                "This action is restricted to managers".to_string(),
            ))
        }
    }

    /// Fail with `Forbidden` unless the caller is an employee
    pub fn require_employee(&self) -> ErsResult<()> {
        match self.role {
            Role::Employee => Ok(()),
            Role::Manager => Err(ErsError::Forbidden(
                "This action is restricted to employees".to_string(),
            )),
        }
    }

    /// Managers may act on anyone, everyone else only on themselves
    pub fn require_access_to(&self, user_id: UserId) -> ErsResult<()> {
        if self.is_manager() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ErsError::Forbidden(
                "Access to another user's records is not allowed".to_string(),
            ))
        }
    }
}
