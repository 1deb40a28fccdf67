//! In-memory credential and authorization store.

use crate::permission::Permission;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A decoded Basic-auth identity, carried for the lifetime of one HTTP request.
///
/// No session or cookie state is kept: each request re-authenticates from
/// its `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// The login supplied in the Basic-auth header.
    pub login: String,
}

impl Principal {
    /// Build a principal for the given login.
    pub fn new(login: impl Into<String>) -> Self {
        Self { login: login.into() }
    }
}

/// Maps `(principal, repo, required capability)` to an authorization decision.
///
/// Implementations are expected to be cheap and side-effect free; the HTTP
/// adapter calls `authenticate` and `authorize` on every request.
pub trait CredentialChecker: Send + Sync {
    /// Verify a login/password pair, returning the resulting principal on success.
    fn authenticate(&self, login: &str, password: &str) -> Option<Principal>;

    /// Decide whether `principal` holds at least `required` on `repo_key`
    /// (`"{owner}/{name}"`).
    fn authorize(&self, principal: &Principal, repo_key: &str, required: Permission) -> bool;
}

/// Minimal in-memory [`CredentialChecker`]: the repository owner always
/// holds `Admin`, and every other grant comes from an explicit collaborator
/// map. Exists so the HTTP adapter and its tests don't depend on an
/// external identity provider.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    /// login -> password. Plaintext, for local/test use only.
    passwords: RwLock<HashMap<String, String>>,
    /// repo_key -> (login -> permission).
    collaborators: RwLock<HashMap<String, HashMap<String, Permission>>>,
}

impl InMemoryCredentialStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a login's password.
    pub fn set_password(&self, login: impl Into<String>, password: impl Into<String>) {
        self.passwords.write().insert(login.into(), password.into());
    }

    /// Grant `login` at least `permission` on `repo_key`.
    ///
    /// A later call for the same `(repo_key, login)` pair replaces the
    /// previous grant rather than combining with it.
    pub fn grant(&self, repo_key: impl Into<String>, login: impl Into<String>, permission: Permission) {
        self.collaborators
            .write()
            .entry(repo_key.into())
            .or_default()
            .insert(login.into(), permission);
    }

    /// Revoke any grant `login` holds on `repo_key`.
    pub fn revoke(&self, repo_key: &str, login: &str) {
        if let Some(grants) = self.collaborators.write().get_mut(repo_key) {
            grants.remove(login);
        }
    }

    /// The repository owner implicitly holds `Admin`: `repo_key` is
    /// `"{owner}/{name}"`, so the owner is the text before the first `/`.
    fn owner_of(repo_key: &str) -> Option<&str> {
        repo_key.split('/').next().filter(|s| !s.is_empty())
    }
}

impl CredentialChecker for InMemoryCredentialStore {
    fn authenticate(&self, login: &str, password: &str) -> Option<Principal> {
        let passwords = self.passwords.read();
        let expected = passwords.get(login)?;
        if expected == password {
            Some(Principal::new(login))
        } else {
            None
        }
    }

    fn authorize(&self, principal: &Principal, repo_key: &str, required: Permission) -> bool {
        if Self::owner_of(repo_key) == Some(principal.login.as_str()) {
            return Permission::Admin.has(required);
        }

        self.collaborators
            .read()
            .get(repo_key)
            .and_then(|grants| grants.get(&principal.login))
            .is_some_and(|granted| granted.has(required))
    }
}
