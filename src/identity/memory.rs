use argon2::{
    Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use rand_core::OsRng;
use uuid::Uuid;

use super::{
    AccountId, AuthListener, AuthState, AuthStateChannel, AuthSubscription, CreateAccountError,
    IdentityProvider, SignInError,
};
use crate::logging::SanitizedEmail;
use crate::validation::validate_email;

/// Shortest password the provider itself accepts, independent of form rules.
pub const PROVIDER_MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
struct AccountRecord {
    id: AccountId,
    password_hash: String,
}

/// Identity provider that keeps argon2-hashed accounts in process memory.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: DashMap<String, AccountRecord>,
    params: Params,
    auth_state: AuthStateChannel,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Uses custom argon2 cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            accounts: DashMap::new(),
            params,
            auth_state: AuthStateChannel::new(),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn current_state(&self) -> AuthState {
        self.auth_state.current()
    }

    fn hasher(params: Params) -> Argon2<'static> {
        Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    #[tracing::instrument(name = "memory_create_account", skip_all)]
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, CreateAccountError> {
        let email = normalize_email(email);
        if !validate_email(&email).is_valid() {
            return Err(CreateAccountError::InvalidEmail);
        }

        if password.chars().count() < PROVIDER_MIN_PASSWORD_LENGTH {
            return Err(CreateAccountError::WeakPassword);
        }

        if self.accounts.contains_key(&email) {
            return Err(CreateAccountError::EmailAlreadyInUse);
        }

        let password_hash = {
            let password = password.to_string();
            let params = self.params.clone();
            tokio::task::spawn_blocking(move || -> Result<String, CreateAccountError> {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Self::hasher(params)
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|err| CreateAccountError::Other(err.to_string()))?;
                Ok(hash.to_string())
            })
            .await
            .map_err(|err| CreateAccountError::Other(err.to_string()))??
        };

        // Another request may have claimed the address while we were hashing.
        let id = match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => return Err(CreateAccountError::EmailAlreadyInUse),
            Entry::Vacant(entry) => {
                let id = AccountId::new(Uuid::new_v4().to_string());
                entry.insert(AccountRecord {
                    id: id.clone(),
                    password_hash,
                });
                id
            }
        };

        tracing::debug!(
            email = %SanitizedEmail::new(&email),
            account_id = %id,
            "Account stored"
        );

        self.auth_state.publish(AuthState::SignedIn(id.clone()));
        Ok(id)
    }

    #[tracing::instrument(name = "memory_sign_in", skip_all)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountId, SignInError> {
        let email = normalize_email(email);
        let record = self
            .accounts
            .get(&email)
            .map(|entry| entry.value().clone())
            .ok_or(SignInError::InvalidCredential)?;

        let verified = {
            let password = password.to_string();
            let params = self.params.clone();
            let stored_hash = record.password_hash.clone();
            tokio::task::spawn_blocking(move || -> Result<bool, SignInError> {
                let parsed = PasswordHash::new(&stored_hash)
                    .map_err(|err| SignInError::Other(err.to_string()))?;
                Ok(Self::hasher(params)
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok())
            })
            .await
            .map_err(|err| SignInError::Other(err.to_string()))??
        };

        if !verified {
            return Err(SignInError::InvalidCredential);
        }

        self.auth_state.publish(AuthState::SignedIn(record.id.clone()));
        Ok(record.id)
    }

    async fn sign_out(&self) {
        self.auth_state.publish(AuthState::SignedOut);
    }

    fn on_auth_state_changed(&self, listener: AuthListener) -> AuthSubscription {
        self.auth_state.subscribe(listener)
    }
}

#[cfg(test)]
pub(crate) fn test_provider() -> InMemoryIdentityProvider {
    InMemoryIdentityProvider::with_params(
        Params::new(Params::MIN_M_COST, 1, 1, None).expect("minimal argon2 params are valid"),
    )
}
