//! Daemon status register.
//!
//! Holds the loop status, the time of the last successful cycle and the
//! last cycle error. A single observer is notified with a snapshot after
//! every effective write, in write order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the background loop is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonStatus {
    Stopped,
    /// Loop active, sleeping between cycles.
    Running,
    /// A cycle is in progress.
    Checking,
}

impl DaemonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonStatus::Stopped => "stopped",
            DaemonStatus::Running => "running",
            DaemonStatus::Checking => "checking",
        }
    }
}

impl std::fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub status: DaemonStatus,
    /// `None` until the first successful cycle.
    pub last_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl StateSnapshot {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            status: DaemonStatus::Stopped,
            last_check: None,
            last_error: None,
        }
    }
}

/// Callback receiving every snapshot. Must not write to the register.
pub type StateObserver = Arc<dyn Fn(&StateSnapshot) + Send + Sync>;

/// Shared status register.
#[derive(Default)]
pub struct StateRegister {
    state: Mutex<StateSnapshot>,
    observer: Mutex<Option<StateObserver>>,
    /// Held across write and notification so observers see writes in order.
    notify: Mutex<()>,
}

impl std::fmt::Debug for StateRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegister")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl StateRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        lock(&self.state).clone()
    }

    pub fn status(&self) -> DaemonStatus {
        lock(&self.state).status
    }

    /// Install the observer, replacing any previous one.
    pub fn set_observer(&self, observer: StateObserver) {
        *lock(&self.observer) = Some(observer);
    }

    pub fn clear_observer(&self) {
        *lock(&self.observer) = None;
    }

    /// Returns false (and notifies nobody) when the status is unchanged.
    pub fn set_status(&self, status: DaemonStatus) -> bool {
        self.update(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        })
    }

    pub fn set_last_check(&self, at: DateTime<Utc>) {
        self.update(|state| {
            state.last_check = Some(at);
            true
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| {
            state.last_error = error;
            true
        });
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// A cycle finished: stamp the check time and clear the error in one write.
    pub fn record_success(&self, at: DateTime<Utc>) {
        self.update(|state| {
            state.last_check = Some(at);
            state.last_error = None;
            true
        });
    }

    fn update(&self, apply: impl FnOnce(&mut StateSnapshot) -> bool) -> bool {
        let _order = lock(&self.notify);
        let snapshot = {
            let mut state = lock(&self.state);
            if !apply(&mut state) {
                return false;
            }
            state.clone()
        };
        let observer = lock(&self.observer).clone();
        if let Some(observer) = observer {
            observer(&snapshot);
        }
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(register: &StateRegister) -> Arc<Mutex<Vec<StateSnapshot>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        register.set_observer(Arc::new(move |s: &StateSnapshot| {
            sink.lock().unwrap().push(s.clone());
        }));
        seen
    }

    #[test]
    fn test_initial_state() {
        let register = StateRegister::new();
        let snapshot = register.snapshot();
        assert_eq!(snapshot.status, DaemonStatus::Stopped);
        assert!(snapshot.last_check.is_none());
        assert!(!snapshot.has_error());
    }

    #[test]
    fn test_same_status_does_not_notify() {
        let register = StateRegister::new();
        let seen = recording(&register);

        assert!(!register.set_status(DaemonStatus::Stopped));
        assert!(register.set_status(DaemonStatus::Running));
        assert!(!register.set_status(DaemonStatus::Running));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].status, DaemonStatus::Running);
    }

    #[test]
    fn test_error_and_check_always_notify() {
        let register = StateRegister::new();
        let seen = recording(&register);

        register.clear_error();
        register.clear_error();
        register.set_error(Some("tracker down".to_string()));
        let now = Utc::now();
        register.record_success(now);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[2].last_error.as_deref(), Some("tracker down"));
        assert_eq!(seen[3].last_check, Some(now));
        assert!(seen[3].last_error.is_none());
    }

    #[test]
    fn test_notifications_follow_write_order() {
        let register = Arc::new(StateRegister::new());
        let seen = recording(&register);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let register = Arc::clone(&register);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        register.set_error(Some(format!("{}-{}", i, j)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        // The last notification carries the final state.
        assert_eq!(seen.last().unwrap(), &register.snapshot());
    }

    #[test]
    fn test_observer_can_read_register() {
        let register = Arc::new(StateRegister::new());
        let reader = Arc::clone(&register);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        register.set_observer(Arc::new(move |_| {
            *sink.lock().unwrap() = Some(reader.status());
        }));

        register.set_status(DaemonStatus::Checking);
        assert_eq!(*seen.lock().unwrap(), Some(DaemonStatus::Checking));
        register.clear_observer();
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DaemonStatus::Checking).unwrap(),
            "\"checking\""
        );
        assert_eq!(DaemonStatus::Running.to_string(), "running");
    }
}
