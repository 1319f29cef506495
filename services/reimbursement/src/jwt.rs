//! JWT service for access token generation and validation
//!
//! Tokens are signed with HS256 using the configured secret and carry the
//! caller's id and capability, which is all a lifecycle operation needs.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Result,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::models::{Identity, Role, UserId};
use crate::settings::AuthSettings;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: UserId,
    /// Capability held by the user
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub, self.role)
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_expiry: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(secret: &str, token_expiry: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_expiry,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.jwt_secret, settings.token_expiry_seconds)
    }

    /// Generate an access token for an authenticated caller
    pub fn generate_token(&self, identity: &Identity) -> Result<String> {
        let now = get_current_timestamp();

        let claims = Claims {
            sub: identity.user_id,
            role: identity.role,
            iat: now,
            exp: now + self.token_expiry,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds
    pub fn token_expiry(&self) -> u64 {
        self.token_expiry
    }
}
