//! Governor-based rate limiting middleware.
//!
//! Each protected route group gets its own keyed limiter. Clients are keyed by
//! peer IP; without connection info every request shares one key. A client may
//! burst `max_requests` and regains the full allowance over `window_secs`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reelgate_common::Error;

use super::error::AppError;
use crate::config::RateLimitConfig;

/// A shared keyed rate limiter instance.
pub type SharedLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

/// Key used when the peer address is unknown.
const GLOBAL_KEY: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Create a limiter allowing `max_requests` per `window_secs` per client.
pub fn create_limiter(config: &RateLimitConfig) -> SharedLimiter {
    let max = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
    let window = Duration::from_secs(config.window_secs.max(1));
    let quota = Quota::with_period(window / max.get())
        .unwrap_or_else(|| Quota::per_minute(max))
        .allow_burst(max);
    Arc::new(RateLimiter::keyed(quota))
}

/// Rate limiting middleware. Returns 429 Too Many Requests when exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<SharedLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match limiter.check_key(&key) {
        Ok(()) => next.run(request).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            tracing::warn!(client = %key, "Rate limit exceeded");
            AppError::from(Error::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            })
            .into_response()
        }
    }
}

fn client_key(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(GLOBAL_KEY)
}

/// Periodically forget clients whose allowance has fully recovered.
pub fn start_cleanup_task(limiter: SharedLimiter, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    })
}
