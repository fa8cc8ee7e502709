use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::errors::AppError;
use crate::logging::{SanitizedIpAddr, SecurityEvent};

/// Buckets idle for this many windows are dropped on the next sweep.
const STALE_WINDOWS: u32 = 4;

/// Reverse proxies whose `X-Forwarded-For` and `X-Real-IP` headers are believed.
///
/// Requests from any other peer are keyed by the socket address, so a client cannot
/// pick its own rate-limit bucket by sending those headers.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    pub fn new(proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        Self(proxies.into_iter().collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug, Clone)]
pub struct RateLimiterState {
    name: &'static str,
    max_requests: u32,
    window: Duration,
    trusted: TrustedProxies,
    buckets: Arc<DashMap<IpAddr, RateWindow>>,
}

impl RateLimiterState {
    pub fn new(name: &'static str, calls: NonZeroU32, window: Duration) -> Self {
        Self {
            name,
            max_requests: calls.get(),
            window,
            trusted: TrustedProxies::none(),
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Reads the client address from forwarding headers set by these proxies.
    pub fn trusting(mut self, proxies: TrustedProxies) -> Self {
        self.trusted = proxies;
        self
    }

    /// Account creation: 5 attempts per 5 minutes.
    pub fn create_account() -> Self {
        Self::new(
            "create_account",
            NonZeroU32::new(5).expect("burst must be non-zero"),
            Duration::from_secs(5 * 60),
        )
    }

    /// Sign-in: 10 attempts per minute.
    pub fn sign_in() -> Self {
        Self::new(
            "sign_in",
            NonZeroU32::new(10).expect("burst must be non-zero"),
            Duration::from_secs(60),
        )
    }

    /// Live field validation is called on keystrokes, so it gets a wide budget.
    pub fn validation() -> Self {
        Self::new(
            "validate",
            NonZeroU32::new(120).expect("burst must be non-zero"),
            Duration::from_secs(60),
        )
    }

    fn register(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        match self.buckets.entry(ip) {
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                let elapsed = now.duration_since(bucket.started_at);

                if elapsed >= self.window {
                    bucket.started_at = now;
                    bucket.hits = 0;
                }

                if bucket.hits >= self.max_requests {
                    let retry_after = self.window.saturating_sub(elapsed.min(self.window));
                    return Err(retry_after);
                }

                bucket.hits += 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(RateWindow {
                    started_at: now,
                    hits: 1,
                });
                Ok(())
            }
        }
    }

    /// Drops buckets that have not been touched for several windows.
    fn sweep(&self, now: Instant) {
        let horizon = self.window * STALE_WINDOWS;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.started_at) < horizon);
    }
}

pub async fn enforce_rate_limit(
    State(state): State<RateLimiterState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = select_client_ip(request.headers(), addr.ip(), &state.trusted);
    let now = Instant::now();

    if let Err(retry_after) = state.register(client_ip, now) {
        crate::log_security_event!(
            SecurityEvent::RateLimitExceeded,
            limiter = state.name,
            client_ip = %SanitizedIpAddr::new(client_ip),
            "Rate limit exceeded for client"
        );

        return Err(AppError::RateLimitExceeded {
            retry_after: Some(retry_after.max(Duration::from_secs(1))),
        });
    }

    if state.buckets.len() > 10_000 {
        state.sweep(now);
    }

    Ok(next.run(request).await)
}

fn select_client_ip(headers: &HeaderMap, peer: IpAddr, trusted: &TrustedProxies) -> IpAddr {
    if !trusted.contains(&peer) {
        return peer;
    }

    // Proxies append to the right, so the nearest hop not run by us is the client.
    let hops: Vec<IpAddr> = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.split(',').filter_map(|ip| ip.trim().parse().ok()).collect())
        .unwrap_or_default();
    let forwarded = hops
        .iter()
        .rev()
        .find(|ip| !trusted.contains(ip))
        .or(hops.first())
        .copied();

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or(real_ip).unwrap_or(peer)
}

#[derive(Debug)]
struct RateWindow {
    started_at: Instant,
    hits: u32,
}
