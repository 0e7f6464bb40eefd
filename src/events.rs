//! # Events — Structured Event Bus for Catalog Activity
//!
//! A bounded, thread-safe event log collecting structured events from the
//! repository routes and the purchase workflow, transformed into capped
//! notifications for frontend polling or broadcast delivery.
//!
//! | Variant | Emitted When |
//! |---------|-------------|
//! | `GrantSubmitted` | A purchase confirmation emits a pending access grant |
//! | `GrantConfirmed` | Settlement confirms a grant |
//! | `GrantFailed` | Settlement rejects a grant |
//! | `PledgeRecorded` | A backer's pledge lands on a campaign |
//! | `UpdatePosted` | A researcher posts a progress update |
//! | `DataFileAdded` | A data artifact is uploaded and hashed |
//! | `Warning` | Non-fatal issues worth surfacing |

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

/// Events emitted by catalog and purchase activity.
#[derive(Clone, Debug)]
pub enum Event {
    GrantSubmitted {
        experiment_id: String,
        wallet: String,
        price: f64,
    },
    GrantConfirmed {
        experiment_id: String,
        wallet: String,
    },
    GrantFailed {
        experiment_id: String,
        wallet: String,
        reason: String,
    },
    PledgeRecorded {
        experiment_id: String,
        amount: f64,
        tier: Option<String>,
    },
    UpdatePosted {
        experiment_id: String,
        title: String,
    },
    DataFileAdded {
        experiment_id: String,
        name: String,
        hash: String,
    },
    Warning {
        context: String,
        message: String,
    },
}

/// A notification ready for delivery to the frontend.
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: String,
    pub title: String,
    pub details: Vec<String>,
    pub timestamp_ms: u64,
}

/// An entry in the bounded recent-event log.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    pub kind: String,
    pub message: String,
    pub elapsed_secs: f64,
}

const RECENT_EVENTS_CAP: usize = 200;
const NOTIFICATIONS_CAP: usize = 50;

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Central event bus: routes and workflows emit events, the bus handles
/// logging, buffering, and notification fan-out.
pub struct EventBus {
    recent: Mutex<VecDeque<EventRecord>>,
    notifications: Mutex<VecDeque<Notification>>,
    next_id: AtomicU64,
    sender: Mutex<Option<tokio::sync::broadcast::Sender<String>>>,
    start: Instant,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            recent: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAP)),
            notifications: Mutex::new(VecDeque::with_capacity(NOTIFICATIONS_CAP)),
            next_id: AtomicU64::new(1),
            sender: Mutex::new(None),
            start: Instant::now(),
        }
    }

    /// Set the broadcast sender for push delivery.
    pub fn set_sender(&self, sender: tokio::sync::broadcast::Sender<String>) {
        *self.sender.lock().unwrap() = Some(sender);
    }

    /// Emit an event. Safe from any thread (no async).
    pub fn emit(&self, event: Event) {
        let elapsed = self.start.elapsed().as_secs_f64();
        match &event {
            Event::GrantSubmitted {
                experiment_id,
                wallet,
                price,
            } => {
                info!(experiment = %experiment_id, wallet = %wallet, price, "grant submitted");
                self.push_record(
                    "grant_submitted",
                    &format!("{} by {} ({} EDU)", experiment_id, wallet, price),
                    elapsed,
                );
                self.push_notification(
                    "grant_submitted",
                    format!("Access purchase submitted: {}", experiment_id),
                    vec![format!("{} EDU from {}", price, wallet)],
                );
            }
            Event::GrantConfirmed {
                experiment_id,
                wallet,
            } => {
                info!(experiment = %experiment_id, wallet = %wallet, "grant confirmed");
                self.push_record(
                    "grant_confirmed",
                    &format!("{} for {}", experiment_id, wallet),
                    elapsed,
                );
                self.push_notification(
                    "grant_confirmed",
                    format!("Access granted: {}", experiment_id),
                    vec![format!("wallet {}", wallet)],
                );
            }
            Event::GrantFailed {
                experiment_id,
                wallet,
                reason,
            } => {
                warn!(experiment = %experiment_id, wallet = %wallet, reason = %reason, "grant failed");
                self.push_record(
                    "grant_failed",
                    &format!("{} for {}: {}", experiment_id, wallet, reason),
                    elapsed,
                );
                self.push_notification(
                    "grant_failed",
                    format!("Purchase failed: {}", experiment_id),
                    vec![reason.clone()],
                );
            }
            Event::PledgeRecorded {
                experiment_id,
                amount,
                tier,
            } => {
                info!(experiment = %experiment_id, amount, tier = tier.as_deref(), "pledge recorded");
                self.push_record(
                    "pledge",
                    &format!("{} +{} EDU", experiment_id, amount),
                    elapsed,
                );
                let mut details = vec![format!("{} EDU", amount)];
                if let Some(t) = tier {
                    details.push(format!("tier: {}", t));
                }
                self.push_notification(
                    "pledge",
                    format!("New backer on {}", experiment_id),
                    details,
                );
            }
            Event::UpdatePosted {
                experiment_id,
                title,
            } => {
                info!(experiment = %experiment_id, title = %title, "update posted");
                self.push_record("update", &format!("{}: {}", experiment_id, title), elapsed);
                self.push_notification(
                    "update",
                    format!("Update on {}: {}", experiment_id, title),
                    vec![],
                );
            }
            Event::DataFileAdded {
                experiment_id,
                name,
                hash,
            } => {
                info!(experiment = %experiment_id, file = %name, hash = %hash, "data file added");
                self.push_record(
                    "data_file",
                    &format!("{}: {} ({})", experiment_id, name, hash),
                    elapsed,
                );
                self.push_notification(
                    "data_file",
                    format!("New data on {}: {}", experiment_id, name),
                    vec![format!("hash {}", hash)],
                );
            }
            Event::Warning { context, message } => {
                warn!(context = %context, "{}", message);
                self.push_record("warning", &format!("[{}] {}", context, message), elapsed);
            }
        }
    }

    /// Recent events, newest last.
    pub fn recent(&self) -> Vec<EventRecord> {
        self.recent.lock().unwrap().iter().cloned().collect()
    }

    /// Pending notifications, newest last.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().iter().cloned().collect()
    }

    fn push_record(&self, kind: &str, message: &str, elapsed_secs: f64) {
        let mut recent = self.recent.lock().unwrap();
        if recent.len() >= RECENT_EVENTS_CAP {
            recent.pop_front();
        }
        recent.push_back(EventRecord {
            kind: kind.to_string(),
            message: message.to_string(),
            elapsed_secs,
        });
    }

    fn push_notification(&self, kind: &str, title: String, details: Vec<String>) {
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind: kind.to_string(),
            title,
            details,
            timestamp_ms: now_ms(),
        };
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            if let Ok(json) = serde_json::to_string(&notification) {
                let _ = sender.send(json);
            }
        }
        let mut notifications = self.notifications.lock().unwrap();
        if notifications.len() >= NOTIFICATIONS_CAP {
            notifications.pop_front();
        }
        notifications.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_are_capped() {
        let bus = EventBus::new();
        for i in 0..(NOTIFICATIONS_CAP + 10) {
            bus.emit(Event::PledgeRecorded {
                experiment_id: format!("exp-{}", i),
                amount: 100.0,
                tier: None,
            });
        }
        let notifications = bus.notifications();
        assert_eq!(notifications.len(), NOTIFICATIONS_CAP);
        // Oldest entries were evicted
        assert!(notifications[0].title.contains("exp-10"));
    }

    #[test]
    fn warnings_log_but_do_not_notify() {
        let bus = EventBus::new();
        bus.emit(Event::Warning {
            context: "upload".into(),
            message: "empty file".into(),
        });
        assert_eq!(bus.recent().len(), 1);
        assert!(bus.notifications().is_empty());
    }
}
