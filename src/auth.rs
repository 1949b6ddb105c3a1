use bcrypt::DEFAULT_COST;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("credential hashing failed: {0}")]
pub struct HashError(String);

/// One-way password hashing used by signup, password updates and login.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;
    fn verify(&self, password: &str, hashed: &str) -> Result<bool, HashError>;
}

/// bcrypt with a fresh random salt per hash.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        bcrypt::hash(password.as_bytes(), self.cost).map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, password: &str, hashed: &str) -> Result<bool, HashError> {
        bcrypt::verify(password.as_bytes(), hashed).map_err(|e| HashError(e.to_string()))
    }
}
