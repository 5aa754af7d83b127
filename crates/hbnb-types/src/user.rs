//! User accounts

use crate::base::BaseModel;
use serde::{Deserialize, Serialize};

/// User account
///
/// `password` only ever holds a digest. Every path that takes a plaintext
/// password from a client goes through [`User::set_password`]; rehydration
/// from a stored record keeps the digest as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl User {
    pub fn new(email: impl Into<String>, password: &str) -> Self {
        let mut user = Self {
            email: email.into(),
            ..Default::default()
        };
        user.set_password(password);
        user
    }

    pub fn set_password(&mut self, plaintext: &str) {
        self.password = hash_password(plaintext);
    }

    pub fn verify_password(&self, plaintext: &str) -> bool {
        self.password == hash_password(plaintext)
    }
}

/// Deterministic one-way digest (hex BLAKE3)
pub fn hash_password(plaintext: &str) -> String {
    blake3::hash(plaintext.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_hashed() {
        let user = User::new("a@b.com", "secret");
        assert_ne!(user.password, "secret");
        assert_eq!(user.password.len(), 64);
        assert!(user.verify_password("secret"));
        assert!(!user.verify_password("Secret"));
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_password("pw"), hash_password("pw"));
        assert_ne!(hash_password("pw"), hash_password("pw2"));
    }
}
