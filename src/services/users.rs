//! Accounts: registration, login and the bootstrap admin

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Actor, JwtValidator, Role};
use crate::db::schemas::UserDoc;
use crate::store::UserStore;
use crate::types::{Result, TrackerError};

pub struct UserService {
    users: Arc<dyn UserStore>,
    jwt: JwtValidator,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtValidator) -> Self {
        Self { users, jwt }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    /// Create a regular user account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<UserDoc> {
        self.create_account(email, password, full_name, Role::User).await
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
        role: Role,
    ) -> Result<UserDoc> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(TrackerError::InvalidInput("Password is required".into()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(TrackerError::Conflict("Email already registered".into()));
        }

        let hashed = hash_password(password)?;
        let full_name = full_name.filter(|n| !n.trim().is_empty());
        let user = self
            .users
            .insert(UserDoc::new(email, hashed, full_name, role))
            .await?;

        info!(email = %user.email, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Verify credentials and issue a bearer token
    pub async fn login(&self, email: &str, password: &str) -> Result<(UserDoc, String)> {
        let email = normalize_email(email)?;
        let invalid = || TrackerError::Unauthorized("Invalid credentials".into());

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "Login failed - user not found");
            return Err(invalid());
        };

        if !verify_password(password, &user.hashed_password)? {
            warn!(email = %email, "Login failed - invalid password");
            return Err(invalid());
        }

        let token = self.issue_token(&user)?;
        info!(email = %email, "Login successful");
        Ok((user, token))
    }

    pub fn issue_token(&self, user: &UserDoc) -> Result<String> {
        let id = user
            ._id
            .ok_or_else(|| TrackerError::Internal("User has no id".into()))?;
        self.jwt.generate_token(&id.to_hex(), user.role)
    }

    /// Profile of the caller
    pub async fn me(&self, actor: &Actor) -> Result<UserDoc> {
        self.get(&actor.user_id).await
    }

    pub async fn get(&self, id: &ObjectId) -> Result<UserDoc> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound("User not found".into()))
    }

    /// Create the configured admin account unless the email is already taken
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        let normalized = normalize_email(email)?;
        if let Some(existing) = self.users.find_by_email(&normalized).await? {
            if existing.role != Role::Admin {
                warn!(email = %normalized, "Bootstrap admin email belongs to a regular user");
            }
            return Ok(());
        }

        self.create_account(&normalized, password, Some("Administrator".into()), Role::Admin)
            .await?;
        info!(email = %normalized, "Created bootstrap admin");
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(TrackerError::InvalidInput("A valid email is required".into()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()), JwtValidator::new_dev())
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let svc = service();
        let user = svc
            .register("Ana@Example.com ", "secret-pass", Some("Ana".into()))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.streak, 0);

        let (logged_in, token) = svc.login("ana@example.com", "secret-pass").await.unwrap();
        assert_eq!(logged_in._id, user._id);

        let claims = svc.jwt().verify_token(&token).claims.unwrap();
        assert_eq!(claims.sub, user._id.unwrap().to_hex());
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let svc = service();
        assert!(matches!(
            svc.register("not-an-email", "pw", None).await,
            Err(TrackerError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register("a@b.c", "", None).await,
            Err(TrackerError::InvalidInput(_))
        ));

        svc.register("a@b.c", "pw", None).await.unwrap();
        assert!(matches!(
            svc.register("A@B.C", "pw", None).await,
            Err(TrackerError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let svc = service();
        svc.register("a@b.c", "right", None).await.unwrap();

        let wrong_pw = svc.login("a@b.c", "wrong").await.unwrap_err();
        let no_user = svc.login("x@b.c", "right").await.unwrap_err();
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
        assert!(matches!(wrong_pw, TrackerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let svc = service();
        svc.ensure_admin("root@example.com", "pw").await.unwrap();
        svc.ensure_admin("root@example.com", "pw").await.unwrap();

        let (admin, _) = svc.login("root@example.com", "pw").await.unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
