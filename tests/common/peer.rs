//! A session that records everything it observes.

use super::wait_until;
use parking_lot::Mutex;
use roomlink::config::SessionConfig;
use roomlink::{PeerId, Rendezvous, Session, StatusEvent, StatusKind};
use serde_json::Value;
use std::sync::Arc;

/// One test participant.
pub struct TestPeer {
    pub session: Session,
    statuses: Arc<Mutex<Vec<StatusEvent>>>,
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

#[allow(dead_code)]
impl TestPeer {
    /// A disconnected peer recording status and the given events.
    pub fn new(name: &str, rendezvous: Arc<dyn Rendezvous>, events: &[&str]) -> Self {
        Self::with_config(name, rendezvous, events, SessionConfig::default())
    }

    pub fn with_config(
        name: &str,
        rendezvous: Arc<dyn Rendezvous>,
        events: &[&str],
        config: SessionConfig,
    ) -> Self {
        let session = Session::with_identity(PeerId::new(name), rendezvous, config);

        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        session.on_status(move |status| sink.lock().push(status.clone()));

        let recorded = Arc::new(Mutex::new(Vec::new()));
        for event in events {
            let sink = Arc::clone(&recorded);
            let name = event.to_string();
            session.on(event, move |payload| sink.lock().push((name.clone(), payload.clone())));
        }

        Self {
            session,
            statuses,
            events: recorded,
        }
    }

    pub fn statuses(&self) -> Vec<StatusEvent> {
        self.statuses.lock().clone()
    }

    pub fn status_kinds(&self) -> Vec<StatusKind> {
        self.statuses.lock().iter().map(|s| s.status).collect()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    /// Payloads recorded for `event`, in arrival order.
    pub fn payloads(&self, event: &str) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn wait_for_events(&self, count: usize) -> bool {
        let events = Arc::clone(&self.events);
        wait_until(move || events.lock().len() >= count).await
    }

    pub async fn wait_for_status(&self, kind: StatusKind, label: &str) -> bool {
        let statuses = Arc::clone(&self.statuses);
        let label = label.to_string();
        wait_until(move || {
            statuses
                .lock()
                .iter()
                .any(|s| s.status == kind && s.label == label)
        })
        .await
    }
}
