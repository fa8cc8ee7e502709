use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    AccountId, AuthListener, AuthState, AuthStateChannel, AuthSubscription, CreateAccountError,
    IdentityProvider, SignInError,
};

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Why a REST call did not yield an account.
#[derive(Debug, PartialEq, Eq)]
enum CallFailure {
    /// The service answered with an error code such as `EMAIL_EXISTS`.
    Code(String),
    /// The request never produced a usable answer.
    Transport(String),
}

/// Identity provider backed by the Firebase Identity Toolkit REST API.
///
/// Session tokens are not kept; the provider only tracks which account signed in
/// last so auth-state listeners can follow along.
#[derive(Debug)]
pub struct FirebaseIdentityProvider {
    client: Client,
    api_key: String,
    base_url: String,
    auth_state: AuthStateChannel,
}

impl FirebaseIdentityProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Points the provider at another endpoint, e.g. the auth emulator.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("talent-vault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_state: AuthStateChannel::new(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url, method)
    }

    async fn call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, CallFailure> {
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|err| CallFailure::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| CallFailure::Transport(err.to_string()))?;

        if status.is_success() {
            let account: AccountResponse = serde_json::from_slice(&body)
                .map_err(|err| CallFailure::Transport(format!("unexpected response: {err}")))?;
            Ok(AccountId::new(account.local_id))
        } else {
            Err(parse_failure(status.as_u16(), &body))
        }
    }
}

fn parse_failure(status: u16, body: &[u8]) -> CallFailure {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => CallFailure::Code(envelope.error.message),
        Err(_) => CallFailure::Transport(format!("identity service returned HTTP {status}")),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[tracing::instrument(name = "firebase_create_account", skip_all)]
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, CreateAccountError> {
        let id = self
            .call("signUp", email, password)
            .await
            .map_err(|failure| match failure {
                CallFailure::Code(code) => CreateAccountError::from_code(&code),
                CallFailure::Transport(reason) => {
                    tracing::error!(error = %reason, "Identity service unreachable");
                    CreateAccountError::Other(reason)
                }
            })?;

        self.auth_state.publish(AuthState::SignedIn(id.clone()));
        Ok(id)
    }

    #[tracing::instrument(name = "firebase_sign_in", skip_all)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountId, SignInError> {
        let id = self
            .call("signInWithPassword", email, password)
            .await
            .map_err(|failure| match failure {
                CallFailure::Code(code) => SignInError::from_code(&code),
                CallFailure::Transport(reason) => {
                    tracing::error!(error = %reason, "Identity service unreachable");
                    SignInError::Other(reason)
                }
            })?;

        self.auth_state.publish(AuthState::SignedIn(id.clone()));
        Ok(id)
    }

    async fn sign_out(&self) {
        self.auth_state.publish(AuthState::SignedOut);
    }

    fn on_auth_state_changed(&self, listener: AuthListener) -> AuthSubscription {
        self.auth_state.subscribe(listener)
    }
}
