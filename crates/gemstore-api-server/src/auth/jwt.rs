use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::utils::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID (Subject)
    pub exp: usize,  // Expiration
    pub username: String,
    pub user_id: Uuid,
}

pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expiration_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_seconds,
        }
    }

    pub fn generate_token(&self, user_id: Uuid, username: &str) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::InternalError(e.to_string()))?
            .as_secs() as usize;
        let expiration = now + self.expiration_seconds as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration,
            username: username.to_string(),
            user_id,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::InternalError(format!("Token generation failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_validates() {
        let manager = JwtManager::new("test-secret", 3600);
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id, "admin").unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "admin");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let manager = JwtManager::new("secret-a", 3600);
        let other = JwtManager::new("secret-b", 3600);

        let token = manager.generate_token(Uuid::new_v4(), "admin").unwrap();
        assert!(other.validate_token(&token).is_err());
    }
}
