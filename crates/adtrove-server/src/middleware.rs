use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER, WWW_AUTHENTICATE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "ADTROVE_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id for one request, stored as a request extension and echoed
/// back in `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Adopts a caller-supplied id when it is short printable ASCII,
    /// otherwise mints a fresh `UUIDv4`.
    fn from_header(value: Option<&HeaderValue>) -> Self {
        value
            .and_then(|v| v.to_str().ok())
            .filter(|id| is_acceptable_request_id(id))
            .map_or_else(Self::generate, |id| Self(id.to_owned()))
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

fn is_acceptable_request_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

/// Bearer key set guarding the protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `ADTROVE_API_KEYS` (comma-separated bearer tokens).
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        Self::from_raw(std::env::var(API_KEYS_VAR).ok().as_deref(), is_development)
    }

    /// Missing keys turn auth off in development and fail startup elsewhere.
    pub fn from_raw(raw: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_api_keys(raw.unwrap_or_default());

        if keys.is_empty() && !is_development {
            anyhow::bail!(
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
        }
        if keys.is_empty() {
            tracing::warn!("{API_KEYS_VAR} not set; ingest and read routes are open");
        } else {
            tracing::debug!(keys = keys.len(), "bearer auth enabled");
        }

        Ok(Self {
            enabled: !keys.is_empty(),
            api_keys: Arc::new(keys),
        })
    }

    /// Compares against every configured key without short-circuiting.
    fn allows(&self, token: &str) -> bool {
        let matched = self
            .api_keys
            .iter()
            .fold(subtle::Choice::from(0u8), |acc, key| {
                acc | key.as_bytes().ct_eq(token.as_bytes())
            });
        matched.into()
    }
}

fn parse_api_keys(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Counter for one fixed window. The window restarts on the first request
/// after it expires rather than on a timer.
#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    opened_at: Instant,
    admitted: usize,
}

impl FixedWindow {
    fn open(now: Instant) -> Self {
        Self {
            opened_at: now,
            admitted: 0,
        }
    }

    /// Admits one request at `now`, or returns how long until the window
    /// reopens.
    fn try_acquire(&mut self, now: Instant, limit: usize, length: Duration) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed >= length {
            *self = Self::open(now);
        }
        if self.admitted >= limit {
            return Err(length.saturating_sub(elapsed));
        }
        self.admitted += 1;
        Ok(())
    }
}

/// Process-wide request budget shared by every protected route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    limit: usize,
    length: Duration,
    window: Arc<Mutex<FixedWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            limit: max_requests,
            length: window,
            window: Arc::new(Mutex::new(FixedWindow::open(Instant::now()))),
        }
    }

    async fn try_acquire(&self) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        window.try_acquire(Instant::now(), self.limit, self.length)
    }
}

/// Whole seconds for `Retry-After`, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(|| "unknown".to_string(), |id| id.0.clone())
}

/// Attaches a [`RequestId`] to the request and mirrors it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_header(req.headers().get(REQUEST_ID_HEADER));
    let echoed = HeaderValue::from_str(&id.0);
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    if let Ok(value) = echoed {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Rejects requests without a configured bearer key while auth is enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    if let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        if auth.allows(token) {
            return next.run(req).await;
        }
    }

    let request_id = request_id_of(&req);
    tracing::debug!(request_id, path = %req.uri().path(), "bearer auth rejected");
    let mut res =
        ApiError::new(request_id, "unauthorized", "missing or invalid bearer token").into_response();
    res.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

/// Sheds requests over the shared budget with `429` and `Retry-After`.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let Err(wait) = rate_limit.try_acquire().await else {
        return next.run(req).await;
    };

    let request_id = request_id_of(&req);
    let retry_after = retry_after_secs(wait);
    tracing::warn!(request_id, retry_after, "rate limit exceeded");
    let mut res = ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    res.headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    res
}

/// Scheme match is case-insensitive; surrounding spaces around the token are dropped.
fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = value?.to_str().ok()?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_ignores_scheme_case() {
        let header = HeaderValue::from_static("bearer  test-token ");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_or_empty() {
        for raw in ["Basic abc123", "Bearer ", "Bearer", "test-token"] {
            let header = HeaderValue::from_static(raw);
            assert_eq!(extract_bearer_token(Some(&header)), None, "{raw}");
        }
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn auth_state_disables_when_no_keys_in_dev() {
        let state = AuthState::from_raw(None, true).expect("dev should allow missing keys");
        assert!(!state.enabled);
    }

    #[test]
    fn auth_state_requires_keys_outside_dev() {
        assert!(AuthState::from_raw(Some(" , "), false).is_err());
    }

    #[test]
    fn auth_state_accepts_any_configured_key() {
        let state = AuthState::from_raw(Some("alpha, beta"), false).expect("keys");
        assert!(state.enabled);
        assert!(state.allows("alpha"));
        assert!(state.allows("beta"));
        assert!(!state.allows("alph"));
        assert!(!state.allows("gamma"));
    }

    #[test]
    fn request_id_keeps_sane_caller_value() {
        let header = HeaderValue::from_static("req-42.abc");
        assert_eq!(RequestId::from_header(Some(&header)).0, "req-42.abc");
    }

    #[test]
    fn request_id_replaces_unusable_caller_value() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let candidates = [
            HeaderValue::from_static(""),
            HeaderValue::from_static("has space"),
            HeaderValue::from_str(&long).expect("header"),
        ];
        for header in &candidates {
            let id = RequestId::from_header(Some(header)).0;
            assert!(Uuid::parse_str(&id).is_ok(), "expected generated id, got {id}");
        }
        assert!(Uuid::parse_str(&RequestId::from_header(None).0).is_ok());
    }

    #[test]
    fn fixed_window_admits_up_to_limit_then_reports_wait() {
        let start = Instant::now();
        let length = Duration::from_secs(60);
        let mut window = FixedWindow::open(start);

        assert!(window.try_acquire(start, 2, length).is_ok());
        assert!(window.try_acquire(start + Duration::from_secs(1), 2, length).is_ok());
        let wait = window
            .try_acquire(start + Duration::from_secs(20), 2, length)
            .expect_err("over limit");

        assert_eq!(wait, Duration::from_secs(40));
    }

    #[test]
    fn fixed_window_reopens_after_its_length() {
        let start = Instant::now();
        let length = Duration::from_secs(10);
        let mut window = FixedWindow::open(start);
        assert!(window.try_acquire(start, 1, length).is_ok());
        assert!(window.try_acquire(start, 1, length).is_err());

        let later = start + Duration::from_secs(10);
        assert!(window.try_acquire(later, 1, length).is_ok());
        assert_eq!(window.opened_at, later);
        assert_eq!(window.admitted, 1);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let start = Instant::now();
        let mut window = FixedWindow::open(start);
        assert!(window.try_acquire(start, 0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(2500)), 3);
        assert_eq!(retry_after_secs(Duration::from_secs(40)), 40);
    }
}
