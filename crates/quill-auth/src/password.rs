use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::AuthError;

/// Default Argon2id memory cost in KiB, calibrated so a verify takes on
/// the order of 100ms on reference hardware.
pub const DEFAULT_MEMORY_COST_KIB: u32 = 19 * 1024;
pub const DEFAULT_TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

/// Password hasher with a configurable cost parameter.
#[derive(Clone)]
pub struct PasswordKdf {
    params: Params,
}

impl PasswordKdf {
    pub fn new(memory_cost_kib: u32, time_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_cost_kib, time_cost, PARALLELISM, None)
            .map_err(|e| AuthError::Kdf(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn with_defaults() -> Self {
        Self {
            params: Params::new(DEFAULT_MEMORY_COST_KIB, DEFAULT_TIME_COST, PARALLELISM, None)
                .expect("default argon2 params are valid"),
        }
    }

    /// Hash a password into a PHC string. The cost parameters travel in
    /// the string, so verification works across cost changes.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Kdf(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Kdf(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Kdf(e.to_string())),
        }
    }
}
