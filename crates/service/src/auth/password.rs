//! Password hashing primitives shared by the credential store backends.

use argon2::{
    password_hash::{PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use super::errors::StoreError;

pub const PASSWORD_ALGORITHM: &str = "argon2id";

/// Length in bytes of the random part of a token; the key is its hex form.
pub const TOKEN_BYTES: usize = 20;

/// Argon2id hasher with fixed cost parameters.
pub struct PasswordHashing {
    argon2: Argon2<'static>,
    // hash of a throwaway secret, verified against when the user is unknown
    decoy: Option<String>,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl std::fmt::Debug for PasswordHashing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHashing").field("params", self.argon2.params()).finish()
    }
}

impl PasswordHashing {
    pub fn new(params: Params) -> Self {
        let mut hashing = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy: None,
        };
        // ready before the first unknown-email lookup
        hashing.decoy = hashing.hash("decoy-password").ok();
        hashing
    }

    /// Build from memory cost (KiB), iterations and lanes.
    pub fn from_costs(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, StoreError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        Ok(Self::new(params))
    }

    /// Cheapest parameters argon2 accepts. Only for tests and benches.
    pub fn insecure_fast() -> Self {
        Self::new(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap_or_default())
    }

    /// Salted one-way hash in PHC string format.
    pub fn hash(&self, raw: &str) -> Result<String, StoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| StoreError::Hash(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Check `raw` against a stored PHC string. Unparseable hashes never match.
    pub fn verify(&self, raw: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok()
    }

    /// Spend the same work as a real verification without a stored hash.
    pub fn verify_decoy(&self, raw: &str) {
        if let Some(stored) = &self.decoy {
            let _ = self.verify(raw, stored);
        }
    }
}

/// Fresh opaque token key: 40 lowercase hex characters.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifiable() {
        let hashing = PasswordHashing::insecure_fast();
        let a = hashing.hash("hunter22").unwrap();
        let b = hashing.hash("hunter22").unwrap();
        assert_ne!(a, "hunter22");
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(hashing.verify("hunter22", &a));
        assert!(hashing.verify("hunter22", &b));
        assert!(!hashing.verify("hunter23", &a));
    }

    #[test]
    fn whitespace_is_significant() {
        let hashing = PasswordHashing::insecure_fast();
        let h = hashing.hash(" padded ").unwrap();
        assert!(hashing.verify(" padded ", &h));
        assert!(!hashing.verify("padded", &h));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        let hashing = PasswordHashing::insecure_fast();
        assert!(!hashing.verify("anything", "plaintext-not-a-hash"));
        hashing.verify_decoy("anything");
    }

    #[test]
    fn decoy_hash_exists_before_first_use() {
        let hashing = PasswordHashing::insecure_fast();
        let decoy = hashing.decoy.as_deref().unwrap();
        assert!(decoy.starts_with("$argon2id$"));
        assert!(hashing.verify("decoy-password", decoy));
    }

    #[test]
    fn token_keys_are_hex_and_unique() {
        let a = generate_token_key();
        let b = generate_token_key();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_costs_are_rejected() {
        assert!(PasswordHashing::from_costs(0, 0, 0).is_err());
        assert!(PasswordHashing::from_costs(19 * 1024, 2, 1).is_ok());
    }
}
