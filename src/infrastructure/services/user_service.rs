//! User service
//!
//! Cached user entries hold a [`UserProfile`], never the password hash.
//! Credential checks always go to the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::cache::ListParams;
use crate::domain::storage::{Filter, Page, Resource, SortOrder};
use crate::domain::user::{
    validate_email, validate_password, validate_username, User, UserProfile, UserRole,
};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;
use super::password::PasswordHasher;

/// Request for registering a user
#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Request for changing a user's password
#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone)]
pub struct UserService {
    ctx: ServiceContext,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(ctx: ServiceContext, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { ctx, hasher }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserProfile, DomainError> {
        validate_username(&request.username).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password).map_err(|e| DomainError::validation(e.to_string()))?;

        info!(username = %request.username, role = %request.role, "Registering user");

        let password_hash = self.hasher.hash(&request.password)?;
        let user = User::new(
            request.username,
            request.email.to_lowercase(),
            password_hash,
            request.role,
        );

        let user = self.ctx.insert(&user).await?;
        self.ctx.invalidate::<User>(Change::created(&user)).await;

        Ok(user.profile())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        let key = self.ctx.keys().entity(User::KIND, &id.to_string());
        let filter = Filter::by_id(id);

        self.ctx
            .cache()
            .cached_optional(&key, self.ctx.ttls().entity, || async move {
                let user: Option<User> = self.ctx.load(&filter).await?;
                Ok::<_, DomainError>(user.as_ref().map(User::profile))
            })
            .await
    }

    /// Users by username; `role` narrows to one role
    pub async fn list(
        &self,
        params: &ListParams,
        role: Option<UserRole>,
    ) -> Result<Page<UserProfile>, DomainError> {
        let params = params.unfiltered().with_optional_filter("role", role);
        let mut filter = Filter::new();

        if let Some(role) = role {
            filter = filter.eq("role", role.as_str());
        }
        if let Some(term) = params.search() {
            filter = filter.search(["username", "email"], term);
        }

        let key = self.ctx.keys().list(User::KIND, &params);

        self.ctx
            .cache()
            .cached(key, self.ctx.ttls().list, || async move {
                let users: Page<User> = self
                    .ctx
                    .load_page(filter, &params, ("username", SortOrder::Asc))
                    .await?;
                Ok::<_, DomainError>(users.map(|user| user.profile()))
            })
            .await
    }

    pub async fn update_role(&self, id: Uuid, role: UserRole) -> Result<UserProfile, DomainError> {
        info!(id = %id, role = %role, "Updating user role");

        let before: User = self.ctx.load_existing(id).await?;
        let mut user = before.clone();
        user.role = role;
        user.updated_at = Utc::now();

        self.commit_update(&before, &user).await
    }

    pub async fn change_password(
        &self,
        id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<UserProfile, DomainError> {
        let before: User = self.ctx.load_existing(id).await?;

        if !self.hasher.verify(&request.current_password, &before.password_hash) {
            return Err(DomainError::validation("Current password is incorrect"));
        }

        validate_password(&request.new_password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(id = %id, "Changing user password");

        let mut user = before.clone();
        user.password_hash = self.hasher.hash(&request.new_password)?;
        user.updated_at = Utc::now();

        self.commit_update(&before, &user).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting user");

        let user: User = self.ctx.load_existing(id).await?;
        self.ctx.remove::<User>(id).await?;
        self.ctx.invalidate::<User>(Change::deleted(&user)).await;

        Ok(())
    }

    /// Returns the profile when `password` matches the stored hash
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserProfile>, DomainError> {
        let Some(user) = self
            .ctx
            .load::<User>(&Filter::new().eq("username", username))
            .await?
        else {
            debug!(username, "Unknown username");
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            debug!(username, "Password mismatch");
            return Ok(None);
        }

        Ok(Some(user.profile()))
    }

    async fn commit_update(&self, before: &User, user: &User) -> Result<UserProfile, DomainError> {
        let user = self.ctx.replace(user).await?;
        self.ctx
            .invalidate::<User>(Change::updated(before, &user))
            .await;

        Ok(user.profile())
    }
}
