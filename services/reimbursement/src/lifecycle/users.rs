//! User lifecycle: authentication, profiles and employee onboarding

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ErsError, ErsResult};
use crate::models::{Identity, NewUser, ProfileUpdate, Role, User, UserId, UserKind};
use crate::notification::{Notifications, welcome_message};
use crate::repositories::UserStore;
use crate::validation::{
    emails_match, generate_temporary_password, validate_date_of_birth, validate_email_available,
    validate_name, validate_password,
};

/// Replacement values for the caller's own profile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
}

/// Details of an employee being added by a manager
///
/// A temporary password is generated when none is supplied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployeeForm {
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
}

#[derive(Clone)]
pub struct UserLifecycle {
    users: Arc<dyn UserStore>,
    notifications: Notifications,
    min_password_length: usize,
}

impl UserLifecycle {
    pub fn new(
        users: Arc<dyn UserStore>,
        notifications: Notifications,
        min_password_length: usize,
    ) -> Self {
        Self {
            users,
            notifications,
            min_password_length,
        }
    }

    /// Check credentials; a mismatch is `Ok(None)`, not an error
    pub async fn authenticate(&self, user_id: UserId, password: &str) -> ErsResult<Option<User>> {
        info!("Login attempt for user: {}", user_id);

        let user = self.users.authenticate_user(user_id, password).await?;
        if user.is_none() {
            debug!("Credentials rejected for user: {}", user_id);
        }

        Ok(user)
    }

    pub async fn get_profile(&self, identity: &Identity, user_id: UserId) -> ErsResult<User> {
        identity.require_access_to(user_id)?;

        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| ErsError::NotFound(format!("User {} not found", user_id)))
    }

    /// Replace the caller's mutable profile fields
    ///
    /// Every field is validated before the store is touched. The email
    /// availability check is skipped when the email is the caller's current
    /// one, ignoring case.
    pub async fn update_profile(&self, identity: &Identity, form: ProfileForm) -> ErsResult<bool> {
        identity.require_employee()?;
        info!("Updating profile for user: {}", identity.user_id);

        validate_name(&form.first_name, &form.last_name)?;
        validate_password(&form.password, self.min_password_length)?;
        validate_date_of_birth(form.date_of_birth, Utc::now().date_naive())?;

        let current = self.get_profile(identity, identity.user_id).await?;
        let unchanged = current
            .email()
            .is_some_and(|email| emails_match(email, &form.email));
        if !unchanged {
            validate_email_available(self.users.as_ref(), &form.email).await?;
        }

        let update = ProfileUpdate {
            user_id: identity.user_id,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
            date_of_birth: form.date_of_birth,
            email: Some(form.email),
        };

        Ok(self.users.update_user(&update).await?)
    }

    /// Create an employee and send the welcome email
    pub async fn add_new_employee(
        &self,
        identity: &Identity,
        form: NewEmployeeForm,
    ) -> ErsResult<UserId> {
        identity.require_manager()?;
        info!(
            "Manager {} adding employee: {} {}",
            identity.user_id, form.first_name, form.last_name
        );

        validate_name(&form.first_name, &form.last_name)?;
        validate_date_of_birth(form.date_of_birth, Utc::now().date_naive())?;

        let (password, temporary) = match form.password {
            Some(password) => {
                validate_password(&password, self.min_password_length)?;
                (password, false)
            }
            None => (generate_temporary_password(self.min_password_length), true),
        };

        validate_email_available(self.users.as_ref(), &form.email).await?;

        let new_user = NewUser {
            password,
            first_name: form.first_name,
            last_name: form.last_name,
            date_of_birth: form.date_of_birth,
            kind: UserKind::employee(form.email.clone()),
        };
        let user_id = self.users.add_new_user(&new_user).await?;

        info!("Employee {} created", user_id);

        self.notifications.dispatch(welcome_message(
            user_id,
            &new_user.first_name,
            &new_user.last_name,
            &form.email,
            temporary.then_some(new_user.password.as_str()),
        ));

        Ok(user_id)
    }

    /// A single employee; managers are reported as not found
    pub async fn view_employee(&self, identity: &Identity, user_id: UserId) -> ErsResult<User> {
        identity.require_manager()?;

        self.users
            .get_user(user_id)
            .await?
            .filter(|user| user.role() == Role::Employee)
            .ok_or_else(|| ErsError::NotFound(format!("Employee {} not found", user_id)))
    }

    pub async fn list_all_employees(&self, identity: &Identity) -> ErsResult<Vec<User>> {
        identity.require_manager()?;
        info!("Manager {} listing employees", identity.user_id);

        Ok(self.users.get_all_employees().await?)
    }
}
