//! Boundary to the external identity service.
//!
//! Forms only see [`IdentityProvider`]; the concrete backends are an in-memory store
//! for local development and tests, and the Firebase Identity Toolkit REST API.

pub mod firebase;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use firebase::FirebaseIdentityProvider;
pub use memory::InMemoryIdentityProvider;

/// Opaque account identifier issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(AccountId),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateAccountError {
    #[error("email address is already in use")]
    EmailAlreadyInUse,
    #[error("email address is invalid")]
    InvalidEmail,
    #[error("password is too weak")]
    WeakPassword,
    #[error("account creation failed: {0}")]
    Other(String),
}

impl CreateAccountError {
    /// Maps a provider error code. Both the SDK style (`auth/email-already-in-use`) and
    /// the REST style (`EMAIL_EXISTS`) are understood; anything else is `Other`.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        match code {
            "auth/email-already-in-use" | "EMAIL_EXISTS" => CreateAccountError::EmailAlreadyInUse,
            "auth/invalid-email" | "INVALID_EMAIL" => CreateAccountError::InvalidEmail,
            "auth/weak-password" => CreateAccountError::WeakPassword,
            // REST appends a reason: "WEAK_PASSWORD : Password should be at least 6 characters"
            other if other.starts_with("WEAK_PASSWORD") => CreateAccountError::WeakPassword,
            other => CreateAccountError::Other(other.to_string()),
        }
    }

    /// Banner text shown above the account-creation form.
    pub fn user_message(&self) -> &'static str {
        match self {
            CreateAccountError::EmailAlreadyInUse => {
                "This email is already in use. Please try another email or sign in."
            }
            CreateAccountError::InvalidEmail => "The email address is not valid.",
            CreateAccountError::WeakPassword => {
                "The password is too weak. Please choose a stronger password."
            }
            CreateAccountError::Other(_) => {
                "An error occurred during account creation. Please try again."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignInError {
    #[error("invalid email or password")]
    InvalidCredential,
    #[error("sign in failed: {0}")]
    Other(String),
}

impl SignInError {
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        match code {
            "auth/invalid-credential"
            | "auth/wrong-password"
            | "auth/user-not-found"
            | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND" => SignInError::InvalidCredential,
            other => SignInError::Other(other.to_string()),
        }
    }

    /// Banner text shown above the sign-in form.
    pub fn user_message(&self) -> &'static str {
        match self {
            SignInError::InvalidCredential => "Invalid email or password.",
            SignInError::Other(_) => "An error occurred during sign in. Please try again.",
        }
    }
}

pub type AuthListener = Box<dyn Fn(AuthState) + Send + Sync + 'static>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, CreateAccountError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountId, SignInError>;

    /// Ends the current session. Never fails from the caller's point of view.
    async fn sign_out(&self);

    /// Calls `listener` with the current state right away and again on every change,
    /// until the returned subscription is unsubscribed or dropped.
    fn on_auth_state_changed(&self, listener: AuthListener) -> AuthSubscription;
}

/// Handle for an auth-state listener. Delivery stops when it is unsubscribed or
/// dropped.
#[derive(Debug)]
pub struct AuthSubscription {
    task: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    /// Wraps the task that delivers notifications to one listener.
    pub(crate) fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Current auth state plus fan-out to listeners, shared by the provider backends.
#[derive(Debug)]
pub(crate) struct AuthStateChannel {
    sender: watch::Sender<AuthState>,
}

impl AuthStateChannel {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(AuthState::SignedOut);
        Self { sender }
    }

    pub(crate) fn current(&self) -> AuthState {
        self.sender.borrow().clone()
    }

    /// Publishes `state`; listeners are only notified when it differs from the
    /// current one.
    pub(crate) fn publish(&self, state: AuthState) {
        self.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub(crate) fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        let mut receiver = self.sender.subscribe();
        let initial = receiver.borrow_and_update().clone();
        listener(initial);

        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let state = receiver.borrow_and_update().clone();
                listener(state);
            }
        });

        AuthSubscription::from_task(task)
    }
}
