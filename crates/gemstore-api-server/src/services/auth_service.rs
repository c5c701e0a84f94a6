use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::password;
use crate::auth::JwtManager;
use crate::database::{Repository, User};
use crate::utils::error::ApiError;

pub struct LoginResult {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    repository: Arc<Repository>,
    jwt_manager: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(repository: Arc<Repository>, jwt_manager: Arc<JwtManager>) -> Self {
        Self {
            repository,
            jwt_manager,
        }
    }

    pub async fn register(&self, username: &str, password_plain: &str) -> Result<User, ApiError> {
        if self
            .repository
            .find_user_by_username(username)
            .await?
            .is_some()
        {
            warn!("Registration failed, username taken: {}", username);
            return Err(ApiError::Conflict(format!(
                "Username already exists: {}",
                username
            )));
        }

        let hash = password::hash_password(password_plain)?;
        let user = self.repository.create_user(username, &hash).await?;

        info!("Registered user: {}", user.username);
        Ok(user)
    }

    pub async fn login(&self, username: &str, password_plain: &str) -> Result<LoginResult, ApiError> {
        let user = self
            .repository
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| {
                warn!("Login failed, unknown username: {}", username);
                ApiError::Unauthorized("Invalid credentials".to_string())
            })?;

        if !password::verify_password(password_plain, &user.password_hash)? {
            warn!("Login failed, bad password for: {}", username);
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.jwt_manager.generate_token(user.id, &user.username)?;

        info!("Login successful: {}", user.username);
        Ok(LoginResult { user, token })
    }
}
