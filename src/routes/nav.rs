use axum::{Extension, Json, Router, extract::Query, routing::get};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::nav::{
    AuthPhase, DEFAULT_PROGRESS_DURATION, NavAction, NavLinkView, is_route_change, nav_links,
};

pub fn router() -> Router {
    Router::new().route("/nav", get(navigation))
}

#[derive(Debug, Deserialize)]
pub struct NavQuery {
    #[serde(default = "root_path")]
    path: String,
    /// The route the client is leaving, if this is an in-app navigation.
    #[serde(default)]
    from: Option<String>,
}

fn root_path() -> String {
    "/".to_string()
}

#[derive(Debug, Serialize)]
struct AuthButton {
    phase: AuthPhase,
    label: &'static str,
    disabled: bool,
    action: Option<NavAction>,
}

#[derive(Debug, Serialize)]
pub struct NavResponse {
    links: Vec<NavLinkView>,
    /// Whether this navigation should show the loading indicator.
    loading: bool,
    /// How long the client keeps the indicator up after the change.
    progress_ms: u64,
    auth: AuthButton,
}

/// Nav bar model for the page at `path`. `loading` depends only on this request, so
/// one client's navigation never shows up in another's response.
#[tracing::instrument(name = "navigation", skip(state))]
pub async fn navigation(
    Extension(state): Extension<AppState>,
    Query(query): Query<NavQuery>,
) -> Json<NavResponse> {
    let loading = is_route_change(query.from.as_deref(), &query.path);

    let status = &state.auth_status;
    Json(NavResponse {
        links: nav_links(&query.path),
        loading,
        progress_ms: DEFAULT_PROGRESS_DURATION.as_millis() as u64,
        auth: AuthButton {
            phase: status.phase(),
            label: status.label(),
            disabled: status.is_disabled(),
            action: status.action(),
        },
    })
}
