//! JWT session tokens
//!
//! HS256 tokens carrying the user id and a snapshot of the user's roles taken at
//! login. Tokens are self-contained: nothing is stored server-side, and a token
//! stays valid until its `exp` passes.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default session token lifetime (1 hour)
const TOKEN_EXPIRATION_MINUTES: i64 = 60;

/// Longest accepted session token lifetime (one week)
pub const MAX_EXPIRATION_MINUTES: i64 = 7 * 24 * 60;

/// Default token issuer
const DEFAULT_ISSUER: &str = "medadmin";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Session token lifetime in minutes
    pub expiration_minutes: i64,
    /// Token issuer
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_minutes", &self.expiration_minutes)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_minutes: TOKEN_EXPIRATION_MINUTES,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self, JwtError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    ///
    /// `JWT_SECRET` is mandatory and must not be blank; there is no built-in
    /// fallback key. `JWT_EXPIRATION_MINUTES`, when set, must be a whole number
    /// of minutes in `1..=MAX_EXPIRATION_MINUTES`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, JwtError> {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(JwtError::MissingSecret)?;

        let expiration = match lookup("JWT_EXPIRATION_MINUTES").filter(|v| !v.trim().is_empty()) {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_EXPIRATION_MINUTES).contains(m))
                .ok_or(JwtError::InvalidExpiration(value))?,
            None => TOKEN_EXPIRATION_MINUTES,
        };

        let issuer = lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        Ok(Self {
            secret,
            expiration_minutes: expiration,
            issuer,
        })
    }

    /// Set token expiration
    pub fn expiration(mut self, minutes: i64) -> Self {
        self.expiration_minutes = minutes;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT_SECRET environment variable not set")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token decoding failed: {0}")]
    DecodingError(String),

    #[error(
        "JWT_EXPIRATION_MINUTES must be between 1 and {max}, got {0:?}",
        max = MAX_EXPIRATION_MINUTES
    )]
    InvalidExpiration(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => JwtError::InvalidToken,
            _ => JwtError::DecodingError(err.to_string()),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role names held by the user when the token was issued
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    /// Get the numeric user ID
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidToken)
    }
}

/// A freshly minted session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// Encoded JWT
    pub token: String,
    /// Expiration (Unix timestamp)
    pub expires_at: i64,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create JWT service from environment variables
    pub fn from_env() -> Result<Self, JwtError> {
        let config = JwtConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Token lifetime in minutes
    pub fn expiration_minutes(&self) -> i64 {
        self.config.expiration_minutes
    }

    /// Issue a session token for a user, valid from now
    pub fn issue(&self, user_id: i64, roles: &[String]) -> Result<SessionToken, JwtError> {
        self.issue_at(user_id, roles, Utc::now())
    }

    /// Issue a session token as if it had been minted at `issued_at`
    pub fn issue_at(
        &self,
        user_id: i64,
        roles: &[String],
        issued_at: DateTime<Utc>,
    ) -> Result<SessionToken, JwtError> {
        let exp = Duration::try_minutes(self.config.expiration_minutes)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                JwtError::EncodingError(format!(
                    "token lifetime of {} minutes is out of range",
                    self.config.expiration_minutes
                ))
            })?;

        let claims = Claims {
            sub: user_id.to_string(),
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(SessionToken {
            token,
            expires_at: exp.timestamp(),
        })
    }

    /// Validate and decode a token.
    ///
    /// Signature is checked before expiry, so a tampered token reports
    /// `InvalidToken` even when it is also stale.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        // Set leeway to 0 for strict expiration checking
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = token_data.claims;

        // A token whose subject is not a user id is unusable downstream
        claims.user_id()?;

        Ok(claims)
    }
}
