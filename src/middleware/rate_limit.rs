use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const WINDOW: Duration = Duration::from_secs(60);
const PRUNE_ABOVE: usize = 4096;

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-minute window per client address.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    per_window: u32,
    clients: Arc<Mutex<HashMap<IpAddr, WindowState>>>,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self {
            per_window: limit.max(1),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allow(&self, client: IpAddr) -> bool {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if clients.len() > PRUNE_ABOVE {
            clients.retain(|_, w| now.duration_since(w.start) < WINDOW);
        }

        let window = clients.entry(client).or_insert(WindowState { start: now, count: 0 });
        if now.duration_since(window.start) >= WINDOW {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.per_window {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn limit_by_client(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Requests served without connect info (tests, some proxies) share one bucket.
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.allow(client) {
        tracing::warn!(client = %client, path = %req.uri().path(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please wait a minute and try again.",
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_applies_per_client() {
        let limiter = RateLimiter::per_minute(2);
        let now = Instant::now();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.allow_at(a, now));
        assert!(limiter.allow_at(a, now));
        assert!(!limiter.allow_at(a, now));
        assert!(limiter.allow_at(b, now));
    }

    #[test]
    fn window_resets_after_a_minute() {
        let limiter = RateLimiter::per_minute(1);
        let start = Instant::now();
        let client: IpAddr = "192.168.1.9".parse().unwrap();

        assert!(limiter.allow_at(client, start));
        assert!(!limiter.allow_at(client, start + Duration::from_secs(59)));
        assert!(limiter.allow_at(client, start + Duration::from_secs(60)));
    }

    #[test]
    fn zero_limit_still_admits_one_request() {
        let limiter = RateLimiter::per_minute(0);
        let client: IpAddr = "::1".parse().unwrap();
        assert!(limiter.allow(client));
        assert!(!limiter.allow(client));
    }
}
