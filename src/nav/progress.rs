use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::session::Debouncer;

/// How long the loading overlay stays up after a route change.
pub const DEFAULT_PROGRESS_DURATION: Duration = Duration::from_millis(500);

/// Whether moving from `from` to `to` counts as a route change.
///
/// Stateless, so each caller can judge its own navigation. A first load with no
/// previous route shows nothing.
pub fn is_route_change(from: Option<&str>, to: &str) -> bool {
    from.is_some_and(|from| from != to)
}

/// Loading indicator shown briefly whenever the route changes, for a single viewer.
#[derive(Debug)]
pub struct NavigationProgress {
    visible: Arc<AtomicBool>,
    route: Mutex<Option<String>>,
    hide: Debouncer,
}

impl NavigationProgress {
    pub fn new(duration: Duration) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(false)),
            route: Mutex::new(None),
            hide: Debouncer::new(duration),
        }
    }

    /// Shows the indicator for a new route and restarts the hide timer. Reporting
    /// the route that is already current does nothing.
    pub fn route_changed(&self, route: &str) {
        {
            let mut current = self.route.lock();
            if current.as_deref() == Some(route) {
                return;
            }
            *current = Some(route.to_string());
        }

        self.visible.store(true, Ordering::Release);
        let visible = Arc::clone(&self.visible);
        if let Err(hide) = self.hide.schedule(move || visible.store(false, Ordering::Release)) {
            hide();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

impl Default for NavigationProgress {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_visible_until_duration_elapses() {
        let progress = NavigationProgress::default();
        assert!(!progress.is_visible());

        progress.route_changed("/dashboard");
        assert!(progress.is_visible());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(progress.is_visible());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!progress.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_route_restarts_timer() {
        let progress = NavigationProgress::default();
        progress.route_changed("/dashboard");
        tokio::time::sleep(Duration::from_millis(400)).await;

        progress.route_changed("/vault");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(progress.is_visible());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert!(!progress.is_visible());
    }

    #[test]
    fn test_route_change_needs_a_different_previous_route() {
        assert!(is_route_change(Some("/"), "/vault"));
        assert!(!is_route_change(Some("/vault"), "/vault"));
        assert!(!is_route_change(None, "/vault"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_route_is_ignored() {
        let progress = NavigationProgress::default();
        progress.route_changed("/vault");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!progress.is_visible());

        progress.route_changed("/vault");
        assert!(!progress.is_visible());
    }
}
