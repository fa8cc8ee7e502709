use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::identity::{AuthState, AuthSubscription, IdentityProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// No auth-state notification has arrived yet.
    Loading,
    SignedIn,
    SignedOut,
}

/// What pressing the nav-bar auth button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    SignOut,
    OpenSignIn,
}

/// Nav-bar view of the identity provider's session, kept current by an auth-state
/// subscription that is released when this value is dropped.
#[derive(Debug)]
pub struct AuthStatus {
    phase: Arc<Mutex<AuthPhase>>,
    _subscription: AuthSubscription,
}

impl AuthStatus {
    pub fn observe<P>(provider: &P) -> Self
    where
        P: IdentityProvider + ?Sized,
    {
        let phase = Arc::new(Mutex::new(AuthPhase::Loading));
        let listener_phase = Arc::clone(&phase);
        let subscription = provider.on_auth_state_changed(Box::new(move |state| {
            let next = match state {
                AuthState::SignedIn(_) => AuthPhase::SignedIn,
                AuthState::SignedOut => AuthPhase::SignedOut,
            };
            tracing::debug!(phase = ?next, "Auth state changed");
            *listener_phase.lock() = next;
        }));

        Self {
            phase,
            _subscription: subscription,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        *self.phase.lock()
    }

    pub fn label(&self) -> &'static str {
        match self.phase() {
            AuthPhase::Loading => "Loading...",
            AuthPhase::SignedIn => "Sign Out",
            AuthPhase::SignedOut => "Sign In",
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.phase() == AuthPhase::Loading
    }

    /// `None` while loading, since the button cannot be pressed then.
    pub fn action(&self) -> Option<NavAction> {
        match self.phase() {
            AuthPhase::Loading => None,
            AuthPhase::SignedIn => Some(NavAction::SignOut),
            AuthPhase::SignedOut => Some(NavAction::OpenSignIn),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::identity::memory::test_provider;
    use crate::identity::{AccountId, AuthListener, CreateAccountError, SignInError};

    /// Provider whose first notification arrives after a delay, like a remote SDK.
    struct SlowProvider;

    #[async_trait]
    impl IdentityProvider for SlowProvider {
        async fn create_account(&self, _: &str, _: &str) -> Result<AccountId, CreateAccountError> {
            Err(CreateAccountError::Other("unsupported".into()))
        }

        async fn sign_in(&self, _: &str, _: &str) -> Result<AccountId, SignInError> {
            Err(SignInError::Other("unsupported".into()))
        }

        async fn sign_out(&self) {}

        fn on_auth_state_changed(&self, listener: AuthListener) -> AuthSubscription {
            AuthSubscription::from_task(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                listener(AuthState::SignedOut);
            }))
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_until_first_notification() {
        let status = AuthStatus::observe(&SlowProvider);
        assert_eq!(status.phase(), AuthPhase::Loading);
        assert_eq!(status.label(), "Loading...");
        assert!(status.is_disabled());
        assert_eq!(status.action(), None);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(status.phase(), AuthPhase::SignedOut);
        assert_eq!(status.label(), "Sign In");
        assert_eq!(status.action(), Some(NavAction::OpenSignIn));
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_sign_out() {
        let provider = test_provider();
        let status = AuthStatus::observe(&provider);
        assert_eq!(status.phase(), AuthPhase::SignedOut);

        provider
            .create_account("user@example.com", "Abcdefg1!")
            .await
            .expect("account");
        settle().await;
        assert_eq!(status.phase(), AuthPhase::SignedIn);
        assert_eq!(status.label(), "Sign Out");
        assert_eq!(status.action(), Some(NavAction::SignOut));

        provider.sign_out().await;
        settle().await;
        assert_eq!(status.phase(), AuthPhase::SignedOut);
    }

    #[tokio::test]
    async fn test_dropped_status_stops_listening() {
        let provider = test_provider();
        let status = AuthStatus::observe(&provider);
        let phase = Arc::clone(&status.phase);
        drop(status);

        provider
            .create_account("user@example.com", "Abcdefg1!")
            .await
            .expect("account");
        settle().await;
        assert_eq!(*phase.lock(), AuthPhase::SignedOut);
    }
}
