use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Passenger,
    Manager,
}

/// Static logins, as read from configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub passengers: HashMap<String, String>,
    #[serde(default)]
    pub managers: HashMap<String, String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            passengers: HashMap::from([
                ("user".to_string(), "password".to_string()),
                ("user2".to_string(), "123".to_string()),
            ]),
            managers: HashMap::from([("manager".to_string(), "admin123".to_string())]),
        }
    }
}

struct Account {
    role: Role,
    password_hash: String,
}

/// Configured accounts with their passwords hashed at load time
pub struct CredentialStore {
    accounts: HashMap<String, Account>,
}

impl CredentialStore {
    pub fn from_config(config: &CredentialsConfig) -> AppResult<Self> {
        let argon2 = Argon2::default();
        let mut accounts = HashMap::new();

        // Managers first so a passenger entry with the same name wins, as in the login order
        let entries = config
            .managers
            .iter()
            .map(|(name, pw)| (name, pw, Role::Manager))
            .chain(config.passengers.iter().map(|(name, pw)| (name, pw, Role::Passenger)));

        for (username, password, role) in entries {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
                .to_string();
            accounts.insert(username.clone(), Account { role, password_hash });
        }

        Ok(Self { accounts })
    }

    /// Check a username/password pair and return the account's role
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<Role> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let account = self.accounts.get(username).ok_or_else(invalid)?;

        let parsed_hash = PasswordHash::new(&account.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        Ok(account.role)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accounts_authenticate_with_roles() {
        let store = CredentialStore::from_config(&CredentialsConfig::default()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.authenticate("user", "password").unwrap(), Role::Passenger);
        assert_eq!(store.authenticate("user2", "123").unwrap(), Role::Passenger);
        assert_eq!(store.authenticate("manager", "admin123").unwrap(), Role::Manager);
    }

    #[test]
    fn test_empty_config_has_no_accounts() {
        let store = CredentialStore::from_config(&CredentialsConfig {
            passengers: HashMap::new(),
            managers: HashMap::new(),
        })
        .unwrap();

        assert!(store.is_empty());
        assert!(matches!(
            store.authenticate("user", "password"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_bad_credentials_are_rejected() {
        let store = CredentialStore::from_config(&CredentialsConfig::default()).unwrap();

        assert!(matches!(
            store.authenticate("user", "wrong"),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            store.authenticate("nobody", "password"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
