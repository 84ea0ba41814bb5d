use std::collections::HashMap;

use thiserror::Error;

use crate::principal::{Principal, Role};

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to hash password for '{username}'")]
    Hash {
        username: String,
        #[source]
        source: bcrypt::BcryptError,
    },
}

#[derive(Debug, Clone)]
struct Account {
    password_hash: String,
    role: Role,
}

/// Fixed set of accounts with bcrypt-hashed passwords.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    accounts: HashMap<String, Account>,
}

impl CredentialStore {
    /// The catalog's two accounts: `user` (USER) and `admin` (ADMIN),
    /// each with its name as password, hashed at `cost`.
    pub fn builtin(cost: u32) -> Result<Self, CredentialError> {
        let mut store = Self::default();
        store.add_account("user", "user", Role::User, cost)?;
        store.add_account("admin", "admin", Role::Admin, cost)?;
        Ok(store)
    }

    pub fn add_account(
        &mut self,
        username: &str,
        password: &str,
        role: Role,
        cost: u32,
    ) -> Result<(), CredentialError> {
        let password_hash =
            bcrypt::hash(password, cost).map_err(|source| CredentialError::Hash {
                username: username.to_string(),
                source,
            })?;
        self.accounts.insert(
            username.to_string(),
            Account {
                password_hash,
                role,
            },
        );
        Ok(())
    }

    /// Check a username/password pair. CPU-bound; run it off the async executor.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        let account = self.accounts.get(username)?;
        match bcrypt::verify(password, &account.password_hash) {
            Ok(true) => Some(Principal::new(username, account.role)),
            Ok(false) => None,
            Err(error) => {
                tracing::warn!(%username, %error, "stored password hash is unreadable");
                None
            }
        }
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
    fn builtin_accounts_authenticate_with_their_roles() {
        let store = CredentialStore::builtin(4).unwrap();
        assert_eq!(store.len(), 2);

        assert_eq!(
            store.authenticate("user", "user"),
            Some(Principal::new("user", Role::User))
        );
        assert_eq!(
            store.authenticate("admin", "admin"),
            Some(Principal::new("admin", Role::Admin))
        );
    }

    #[test]
    fn wrong_password_or_unknown_user_fails() {
        let store = CredentialStore::builtin(4).unwrap();
        assert_eq!(store.authenticate("user", "xxxxx"), None);
        assert_eq!(store.authenticate("nobody", "user"), None);
    }

    #[test]
    fn passwords_are_not_stored_in_clear() {
        let store = CredentialStore::builtin(4).unwrap();
        let account = &store.accounts["user"];
        assert_ne!(account.password_hash, "user");
        assert!(account.password_hash.starts_with("$2"));
    }

    #[test]
    fn invalid_cost_is_an_error() {
        let mut store = CredentialStore::default();
        assert!(store.add_account("x", "y", Role::User, 1).is_err());
    }
}
