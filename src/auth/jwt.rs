use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user ID
    pub username: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub scopes: Vec<String>,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    session_token_expiry_secs: i64,
}

impl JwtManager {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        if config.jwt_secret.len() < 32 {
            return Err(AppError::Internal(
                "JWT_SECRET must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            session_token_expiry_secs: config.session_token_expiry_secs,
        })
    }

    pub fn issue_session_token(
        &self,
        user_id: &str,
        username: &str,
        scopes: Vec<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: self.issuer.clone(),
            exp: now + self.session_token_expiry_secs,
            iat: now,
            scopes,
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(AppError::Jwt)
    }

    pub fn verify_session_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    pub fn session_token_expiry_secs(&self) -> i64 {
        self.session_token_expiry_secs
    }
}
