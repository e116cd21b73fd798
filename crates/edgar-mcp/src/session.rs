//! Session table
//!
//! Each transport connection owns one [`Session`]:
//! `Connecting → Open → Closed`. Only `Open` sessions are reachable
//! through [`SessionTable::get`]. Closing clears every listener, evicts
//! the session and drops its outbound sender, which ends the push stream.
//! Dropping the [`SessionGuard`] held by the connection closes it.

use crate::events::{DomainEvent, EventKind, EventPublisher, EventSink};
use crate::protocol::McpResponse;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Something queued for delivery on the session's push stream.
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(McpResponse),
    Event(DomainEvent),
}

pub type Listener = Box<dyn Fn(&DomainEvent) + Send + Sync>;

struct Subscription {
    kind: EventKind,
    listener: Listener,
}

pub struct Session {
    id: String,
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<Subscription>>,
    // taken on close so the receiving stream sees end-of-stream
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Session {
    fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Mutex::new(SessionState::Connecting),
            listeners: Mutex::new(Vec::new()),
            outbound: Mutex::new(Some(outbound)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Handshake complete.
    pub fn activate(&self) {
        let mut state = lock(&self.state);
        if *state == SessionState::Connecting {
            *state = SessionState::Open;
        }
    }

    /// Register a listener. Ignored once the session is closed.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        if self.state() == SessionState::Closed {
            return;
        }
        lock(&self.listeners).push(Subscription {
            kind,
            listener: Box::new(listener),
        });
    }

    /// Subscribe listeners that push the chosen events onto the outbound stream.
    pub fn forward_events(&self, kinds: &[EventKind]) {
        let Some(tx) = lock(&self.outbound).clone() else {
            return;
        };
        for kind in kinds {
            let tx = tx.clone();
            self.subscribe(*kind, move |event| {
                let _ = tx.send(Outbound::Event(event.clone()));
            });
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Queue a message for the client. Returns false if the session is not open.
    pub fn send(&self, message: Outbound) -> bool {
        if !self.is_open() {
            return false;
        }
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    pub fn publisher(self: &Arc<Self>) -> EventPublisher {
        let weak: Weak<Session> = Arc::downgrade(self);
        let weak: Weak<dyn EventSink> = weak;
        EventPublisher::new(weak)
    }

    fn close(&self) -> bool {
        let was_open = {
            let mut state = lock(&self.state);
            let was_open = *state != SessionState::Closed;
            *state = SessionState::Closed;
            was_open
        };
        lock(&self.listeners).clear();
        lock(&self.outbound).take();
        was_open
    }
}

impl EventSink for Session {
    fn publish(&self, event: DomainEvent) {
        if !self.is_open() {
            return;
        }
        let kind = event.kind();
        for sub in lock(&self.listeners).iter().filter(|s| s.kind == kind) {
            (sub.listener)(&event);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a session in `Connecting` state. The caller subscribes
    /// listeners, then calls [`Session::activate`].
    pub fn open(self: &Arc<Self>) -> (SessionGuard, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session::new(tx));
        self.sessions.insert(session.id.clone(), session.clone());
        debug!(session = %session.id, "Session opened");

        let guard = SessionGuard {
            table: Arc::clone(self),
            session,
        };
        (guard, rx)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|s| s.is_open())
    }

    pub fn close(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            if session.close() {
                info!(session = %id, "Session closed");
            }
        }
    }

    /// Server shutdown.
    pub fn close_all(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.close(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Owned by the connection; closes the session on drop.
pub struct SessionGuard {
    table: Arc<SessionTable>,
    session: Arc<Session>,
}

impl SessionGuard {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.table.close(&self.session.id);
        // already evicted by close_all; still make sure listeners are gone
        self.session.close();
    }
}
