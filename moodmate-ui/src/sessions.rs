//! Cookie-keyed session store
//!
//! Each browser gets a random session id in the `moodmate_session` cookie.
//! The id maps to a [`SessionContext`] plus the state of the live video
//! feed, if one is running. Sessions nobody has used for a while are
//! evicted by [`SessionStore::spawn_idle_sweeper`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use moodmate_common::SessionContext;

use crate::client::{BackendClient, ClientResult};
use crate::AppState;

pub const SESSION_COOKIE: &str = "moodmate_session";

/// Id of the caller's session, placed in request extensions by
/// [`session_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

#[derive(Debug)]
enum LiveFeed {
    /// Proxied to the browser until the token is cancelled
    Running(CancellationToken),
    /// Browser went away; the backend `/stop` is in flight
    Stopping(JoinHandle<ClientResult<String>>),
}

/// What an explicit Stop has to do, see [`SessionStore::finish_live_feed`]
#[derive(Debug)]
pub enum FeedStop {
    /// A feed was running and is now cancelled; the caller sends `/stop`
    Cancelled,
    /// `/stop` was already sent when the browser dropped the feed; await it
    InFlight(JoinHandle<ClientResult<String>>),
    /// No feed was running
    Idle,
}

#[derive(Debug)]
struct SessionEntry {
    context: SessionContext,
    live_feed: Option<LiveFeed>,
    last_seen: DateTime<Utc>,
}

impl Default for SessionEntry {
    fn default() -> Self {
        Self {
            context: SessionContext::default(),
            live_feed: None,
            last_seen: Utc::now(),
        }
    }
}

impl SessionEntry {
    fn is_streaming(&self) -> bool {
        matches!(&self.live_feed, Some(LiveFeed::Running(token)) if !token.is_cancelled())
    }

    fn shut_down_feed(&mut self) {
        // A pending stop task keeps running detached
        if let Some(LiveFeed::Running(token)) = self.live_feed.take() {
            token.cancel();
        }
    }
}

/// All live sessions of this front end
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, SessionEntry::default());
        debug!(session = %id, "Session created");
        SessionId(id)
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id.0)
    }

    /// Mark the session as used now; false if it does not exist
    pub async fn touch(&self, id: SessionId) -> bool {
        match self.sessions.write().await.get_mut(&id.0) {
            Some(entry) => {
                entry.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the session's context (empty if the session is gone)
    pub async fn context(&self, id: SessionId) -> SessionContext {
        self.sessions
            .read()
            .await
            .get(&id.0)
            .map(|entry| entry.context.clone())
            .unwrap_or_default()
    }

    /// Apply `f` to the session's context under the store lock
    pub async fn update<R>(&self, id: SessionId, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id.0).or_default();
        f(&mut entry.context)
    }

    /// Register a new live feed, cancelling any feed already running
    pub async fn start_live_feed(&self, id: SessionId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id.0).or_default();
        match entry.live_feed.replace(LiveFeed::Running(token.clone())) {
            Some(LiveFeed::Running(previous)) => {
                debug!(session = %id.0, "Replacing running live feed");
                previous.cancel();
            }
            Some(LiveFeed::Stopping(_)) => {
                debug!(session = %id.0, "Previous live feed still stopping; its label is discarded");
            }
            None => {}
        }
        token
    }

    /// Take over the session's live feed for an explicit Stop
    pub async fn finish_live_feed(&self, id: SessionId) -> FeedStop {
        let feed = self
            .sessions
            .write()
            .await
            .get_mut(&id.0)
            .and_then(|entry| entry.live_feed.take());
        match feed {
            Some(LiveFeed::Running(token)) if !token.is_cancelled() => {
                token.cancel();
                FeedStop::Cancelled
            }
            Some(LiveFeed::Stopping(pending)) => FeedStop::InFlight(pending),
            Some(LiveFeed::Running(_)) | None => FeedStop::Idle,
        }
    }

    /// Stop the backend for a feed the browser dropped
    ///
    /// Does nothing, and returns false, when `feed` was already cancelled
    /// by an explicit Stop, a newer feed or the end of the session.
    /// Otherwise the `/stop` request is started and parked in the session so
    /// that a Stop arriving later reuses its answer.
    pub async fn stop_abandoned_feed(
        &self,
        id: SessionId,
        feed: &CancellationToken,
        backend: &BackendClient,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.get_mut(&id.0) else {
            return false;
        };
        // Only the current feed's token can still be live
        if feed.is_cancelled() || !entry.is_streaming() {
            return false;
        }
        feed.cancel();

        info!(session = %id.0, "Browser left the live feed; stopping backend");
        let backend = backend.clone();
        let pending = tokio::spawn(async move {
            let result = backend.stop_live().await;
            match &result {
                Ok(label) => debug!(label = %label, "Backend stopped after live feed was dropped"),
                Err(e) => warn!(error = %e, "Could not stop backend after live feed was dropped"),
            }
            result
        });
        entry.live_feed = Some(LiveFeed::Stopping(pending));
        true
    }

    /// End the session: stop its live feed and forget its context
    pub async fn end(&self, id: SessionId) {
        if let Some(mut entry) = self.sessions.write().await.remove(&id.0) {
            entry.shut_down_feed();
            debug!(session = %id.0, "Session ended");
        }
    }

    /// Drop sessions unused for longer than `max_idle`
    ///
    /// Sessions still streaming a live feed are kept. Returns the number of
    /// sessions removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|max_idle| Utc::now().checked_sub_signed(max_idle))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.evict_idle_before(cutoff).await
    }

    /// Drop sessions last used before `cutoff`
    pub async fn evict_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            if entry.last_seen >= cutoff || entry.is_streaming() {
                return true;
            }
            entry.shut_down_feed();
            debug!(session = %id, "Idle session evicted");
            false
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Evict idle sessions every `every` in a background task
    pub fn spawn_idle_sweeper(&self, max_idle: Duration, every: Duration) -> JoinHandle<()> {
        info!(
            "Session sweeper started (idle limit: {}s, every {}s)",
            max_idle.as_secs(),
            every.as_secs()
        );
        let store = self.clone();
        tokio::spawn(async move {
            let mut timer = interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                store.evict_idle(max_idle).await;
            }
        })
    }
}

/// Session id from the request's `Cookie` header, if well-formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(SessionId)
}

pub fn session_cookie(id: SessionId) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id.0)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Attach a [`SessionId`] to every request
///
/// Requests without a cookie, or with one naming an unknown session, get a
/// fresh session and a `Set-Cookie` on the response.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut existing = session_id_from_headers(request.headers());
    if let Some(id) = existing {
        if !state.sessions.touch(id).await {
            debug!(session = %id.0, "Unknown session cookie; starting a new session");
            existing = None;
        }
    }

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (state.sessions.create().await, true),
    };

    request.extensions_mut().insert(id);
    let mut response = next.run(request).await;

    if is_new && !response.headers().contains_key(header::SET_COOKIE) {
        match HeaderValue::from_str(&session_cookie(id)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Could not encode session cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodmate_common::Modality;

    #[test]
    fn test_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id))
                .unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(SessionId(id)));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("moodmate_session=garbage"));
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_update_and_snapshot() {
        let store = SessionStore::new();
        let id = store.create().await;
        store
            .update(id, |ctx| ctx.record_classification(Modality::Text, "happy"))
            .await;

        let snapshot = store.context(id).await;
        assert_eq!(snapshot.dominant_mood().to_string(), "Joy");

        store.end(id).await;
        assert!(!store.contains(id).await);
        assert!(store.context(id).await.slots().is_empty());
    }

    /// Client for a port nothing listens on; `/stop` fails fast
    fn offline_backend() -> BackendClient {
        BackendClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_live_feed_tokens() {
        let store = SessionStore::new();
        let id = store.create().await;

        let first = store.start_live_feed(id).await;
        let second = store.start_live_feed(id).await;
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(matches!(store.finish_live_feed(id).await, FeedStop::Cancelled));
        assert!(second.is_cancelled());
        assert!(matches!(store.finish_live_feed(id).await, FeedStop::Idle));
    }

    #[tokio::test]
    async fn test_abandoned_feed_parks_its_stop() {
        let store = SessionStore::new();
        let id = store.create().await;
        let backend = offline_backend();
        let feed = store.start_live_feed(id).await;

        assert!(store.stop_abandoned_feed(id, &feed, &backend).await);
        assert!(feed.is_cancelled());
        // Only one stop per feed
        assert!(!store.stop_abandoned_feed(id, &feed, &backend).await);

        match store.finish_live_feed(id).await {
            FeedStop::InFlight(pending) => assert!(pending.await.unwrap().is_err()),
            other => panic!("expected the parked stop, got {:?}", other),
        }
        assert!(matches!(store.finish_live_feed(id).await, FeedStop::Idle));
    }

    #[tokio::test]
    async fn test_stopped_or_replaced_feed_is_not_stopped_again() {
        let store = SessionStore::new();
        let id = store.create().await;
        let backend = offline_backend();

        let old = store.start_live_feed(id).await;
        let current = store.start_live_feed(id).await;
        assert!(!store.stop_abandoned_feed(id, &old, &backend).await);
        assert!(!current.is_cancelled());

        assert!(matches!(store.finish_live_feed(id).await, FeedStop::Cancelled));
        assert!(!store.stop_abandoned_feed(id, &current, &backend).await);
        assert!(matches!(store.finish_live_feed(id).await, FeedStop::Idle));
    }

    #[tokio::test]
    async fn test_end_cancels_live_feed() {
        let store = SessionStore::new();
        let id = store.create().await;
        let token = store.start_live_feed(id).await;
        store.end(id).await;
        assert!(token.is_cancelled());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let stale = store.create().await;
        let touched = store.create().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cutoff = Utc::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.touch(touched).await);
        let fresh = store.create().await;

        assert_eq!(store.evict_idle_before(cutoff).await, 1);
        assert!(!store.contains(stale).await);
        assert!(store.contains(touched).await);
        assert!(store.contains(fresh).await);
        assert!(!store.touch(stale).await);
    }

    #[tokio::test]
    async fn test_evict_idle_uses_the_idle_limit() {
        let store = SessionStore::new();
        store.create().await;
        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.evict_idle(Duration::from_millis(5)).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_eviction_keeps_streaming_sessions() {
        let store = SessionStore::new();
        let watching = store.create().await;
        let feed = store.start_live_feed(watching).await;
        let stopped = store.create().await;
        let stopped_feed = store.start_live_feed(stopped).await;
        stopped_feed.cancel();

        let evicted = store.evict_idle_before(Utc::now() + chrono::Duration::seconds(1)).await;
        assert_eq!(evicted, 1);
        assert!(store.contains(watching).await);
        assert!(!feed.is_cancelled());
        assert!(!store.contains(stopped).await);

        assert!(matches!(store.finish_live_feed(watching).await, FeedStop::Cancelled));
        assert_eq!(store.evict_idle_before(Utc::now() + chrono::Duration::seconds(1)).await, 1);
        assert!(store.is_empty().await);
    }
}
