//! Password hashing
//!
//! bcrypt with an automatic per-hash salt. The async variants move the work onto
//! Tokio's blocking pool so a login burst does not stall the request executors.
//!
//! bcrypt only reads the first 72 bytes of its input, so longer passwords are
//! refused rather than silently truncated.

/// Default bcrypt work factor
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Longest password bcrypt can hash without truncation, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task failed: {0}")]
    Join(String),
}

/// bcrypt-backed password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    /// Create a hasher with the given work factor
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password. Passwords over [`MAX_PASSWORD_BYTES`] are an error.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        bcrypt::non_truncating_hash(password, self.cost)
            .map_err(|e| HashError::Hashing(e.to_string()))
    }

    /// Compare a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`, and so is a password too long to have been
    /// hashed; only an unparseable hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        match bcrypt::non_truncating_verify(password, hash) {
            Ok(matches) => Ok(matches),
            Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
            Err(e) => Err(HashError::MalformedHash(e.to_string())),
        }
    }

    /// [`hash`](Self::hash) on the blocking pool
    pub async fn hash_async(&self, password: &str) -> Result<String, HashError> {
        let hasher = *self;
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HashError::Join(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool
    pub async fn verify_async(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let hasher = *self;
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| HashError::Join(e.to_string()))?
    }
}
