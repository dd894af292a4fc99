// Fire-and-forget click analytics.
// A reachability probe gates every attempt; while the service is offline
// tracking is a silent no-op. The probe is repeated when it is older than
// `PROBE_INTERVAL`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const PROBE_INTERVAL: Duration = Duration::from_secs(30);
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
}

#[derive(Serialize)]
struct ClickBody<'a> {
    button: &'a str,
    page: &'a str,
}

/// The wire side of the tracker.
pub trait ClickTransport: Send + Sync {
    /// True when the service answers its health check.
    fn probe(&self) -> bool;
    fn post_click(&self, button: &str, page: &str) -> Result<(), TrackError>;
}

pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TrackError> {
        let client = Client::builder().user_agent("beyond-the-brush").timeout(TIMEOUT).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }
}

impl ClickTransport for HttpTransport {
    fn probe(&self) -> bool {
        match self.client.get(format!("{}/api/test", self.base_url)).send() {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!("click service unreachable: {e}");
                false
            }
        }
    }

    fn post_click(&self, button: &str, page: &str) -> Result<(), TrackError> {
        let resp = self
            .client
            .post(format!("{}/api/clicks", self.base_url))
            .json(&ClickBody { button, page })
            .send()?;
        if resp.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(TrackError::Status(resp.status().as_u16()))
        }
    }
}

pub struct ClickTracker {
    transport: Option<Box<dyn ClickTransport>>,
    online: AtomicBool,
    last_probe: Mutex<Option<Instant>>,
}

impl ClickTracker {
    pub fn new(transport: Box<dyn ClickTransport>) -> Self {
        Self { transport: Some(transport), online: AtomicBool::new(false), last_probe: Mutex::new(None) }
    }

    /// HTTP tracker for `base_url`; falls back to [`ClickTracker::offline`]
    /// when no client can be built.
    pub fn http(base_url: &str) -> Self {
        match HttpTransport::new(base_url) {
            Ok(t) => Self::new(Box::new(t)),
            Err(e) => {
                tracing::warn!("click tracking disabled: {e}");
                Self::offline()
            }
        }
    }

    /// A tracker that never sends anything.
    pub fn offline() -> Self {
        Self { transport: None, online: AtomicBool::new(false), last_probe: Mutex::new(None) }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Run the reachability probe now.
    pub fn check_connection(&self) -> bool {
        let Some(transport) = &self.transport else { return false };
        let online = transport.probe();
        self.online.store(online, Ordering::Relaxed);
        if let Ok(mut last) = self.last_probe.lock() {
            *last = Some(Instant::now());
        }
        if !online {
            tracing::warn!("click tracking offline");
        }
        online
    }

    fn probe_is_stale(&self) -> bool {
        match self.last_probe.lock() {
            Ok(last) => last.is_none_or(|t| t.elapsed() >= PROBE_INTERVAL),
            Err(_) => true,
        }
    }

    /// Record a click. Returns whether the service accepted it; offline and
    /// failed attempts return false without surfacing an error.
    pub fn track(&self, button: &str, page: &str) -> bool {
        let Some(transport) = &self.transport else { return false };
        if self.probe_is_stale() {
            self.check_connection();
        }
        if !self.is_online() {
            tracing::debug!(button, page, "offline, click not tracked");
            return false;
        }
        match transport.post_click(button, page) {
            Ok(()) => {
                tracing::debug!(button, page, "click tracked");
                true
            }
            Err(e) => {
                tracing::warn!(button, page, "click tracking failed: {e}");
                self.online.store(false, Ordering::Relaxed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeService {
        up: AtomicBool,
        accept: AtomicBool,
        probes: AtomicUsize,
        posts: AtomicUsize,
    }

    struct Fake(Arc<FakeService>);

    impl ClickTransport for Fake {
        fn probe(&self) -> bool {
            self.0.probes.fetch_add(1, Ordering::SeqCst);
            self.0.up.load(Ordering::SeqCst)
        }

        fn post_click(&self, _button: &str, _page: &str) -> Result<(), TrackError> {
            self.0.posts.fetch_add(1, Ordering::SeqCst);
            if self.0.accept.load(Ordering::SeqCst) { Ok(()) } else { Err(TrackError::Status(500)) }
        }
    }

    #[test]
    fn offline_tracker_is_a_silent_no_op() {
        let t = ClickTracker::offline();
        assert!(!t.track("btb_saved_canvas", "beyondthebrush_app"));
        assert!(!t.check_connection());
    }

    #[test]
    fn unreachable_service_skips_posting() {
        let svc = Arc::new(FakeService::default());
        let t = ClickTracker::new(Box::new(Fake(svc.clone())));
        assert!(!t.track("b", "p"));
        assert_eq!(svc.posts.load(Ordering::SeqCst), 0);
        // The failed probe is fresh, so a second attempt does not re-probe
        assert!(!t.track("b", "p"));
        assert_eq!(svc.probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_post_marks_offline() {
        let svc = Arc::new(FakeService::default());
        svc.up.store(true, Ordering::SeqCst);
        svc.accept.store(true, Ordering::SeqCst);
        let t = ClickTracker::new(Box::new(Fake(svc.clone())));
        assert!(t.track("b", "p"));
        assert!(t.is_online());

        svc.accept.store(false, Ordering::SeqCst);
        assert!(!t.track("b", "p"));
        assert!(!t.is_online());
        assert!(!t.track("b", "p"));
        assert_eq!(svc.posts.load(Ordering::SeqCst), 2);
    }
}
