//! Notification Scheduler
//!
//! Gate between achievement-earned events and the presentation layer:
//! dedup, classification into toast or modal, and toast rate limiting.
//!
//! Deferred toasts reserve their display slot at submission time, so they
//! surface in arrival order spaced by the cooldown. Every deferred task is
//! tracked and aborted on [`NotificationScheduler::reset`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::ledger::DedupLedger;
use super::types::{
    AchievementEvent, DismissReason, Notification, NotificationError, NotificationEvent,
    NotificationSnapshot, Presentation, Rarity, SubmitOutcome,
};
use crate::config::NotificationsConfig;

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Repeats of a key inside this window are suppressed
    pub dedup_window: Duration,
    /// Ledger entries older than this are swept
    pub ledger_retention: Duration,
    /// Minimum spacing between consecutive toasts
    pub toast_cooldown: Duration,
    /// Rarities promoted to modal presentation
    pub modal_rarities: HashSet<Rarity>,
    /// Promote global-first achievements to modal
    pub global_first_is_modal: bool,
    /// Remove visible toasts after this long
    pub toast_auto_dismiss: Option<Duration>,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(30),
            ledger_retention: Duration::from_secs(60),
            toast_cooldown: Duration::from_millis(2000),
            modal_rarities: HashSet::from([Rarity::Legendary]),
            global_first_is_modal: true,
            toast_auto_dismiss: None,
            event_capacity: 256,
        }
    }
}

impl SchedulerConfig {
    /// Decide how an event is presented
    pub fn classify(&self, event: &AchievementEvent) -> Presentation {
        if self.modal_rarities.contains(&event.achievement.rarity)
            || (self.global_first_is_modal && event.is_global_first)
        {
            Presentation::Modal
        } else {
            Presentation::Toast
        }
    }
}

impl From<&NotificationsConfig> for SchedulerConfig {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            dedup_window: Duration::from_secs(config.dedup_window_secs),
            ledger_retention: Duration::from_secs(config.ledger_retention_secs),
            toast_cooldown: Duration::from_millis(config.toast_cooldown_ms),
            modal_rarities: config
                .modal_rarities
                .iter()
                .map(|r| Rarity::from(r.as_str()))
                .collect(),
            global_first_is_modal: config.global_first_is_modal,
            toast_auto_dismiss: config
                .toast_auto_dismiss_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            ..Default::default()
        }
    }
}

/// Owned, explicitly constructed notification scheduler.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct NotificationScheduler {
    inner: Arc<Shared>,
}

struct Shared {
    state: Mutex<SchedulerState>,
    events: broadcast::Sender<NotificationEvent>,
    config: SchedulerConfig,
}

struct SchedulerState {
    toasts: VecDeque<Notification>,
    modal: Option<Notification>,
    ledger: DedupLedger,
    /// Slot reserved by the most recent toast
    last_toast_slot: Option<Instant>,
    /// Bumped on reset; tasks from an older generation do nothing
    generation: u64,
    /// Deferred enqueue tasks by notification id
    deferred: HashMap<Uuid, JoinHandle<()>>,
    /// Auto-dismiss tasks by notification id
    expiries: HashMap<Uuid, JoinHandle<()>>,
}

impl SchedulerState {
    fn remove_toast(&mut self, id: Uuid) -> bool {
        match self.toasts.iter().position(|n| n.id == id) {
            Some(pos) => {
                self.toasts.remove(pos);
                true
            }
            None => false,
        }
    }

    fn abort_tasks(&mut self) -> usize {
        let count = self.deferred.len() + self.expiries.len();
        for (_, handle) in self.deferred.drain().chain(self.expiries.drain()) {
            handle.abort();
        }
        count
    }
}

impl NotificationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let ledger = DedupLedger::new(config.dedup_window, config.ledger_retention);

        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    toasts: VecDeque::new(),
                    modal: None,
                    ledger,
                    last_toast_slot: None,
                    generation: 0,
                    deferred: HashMap::new(),
                    expiries: HashMap::new(),
                }),
                events,
                config,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Submit an achievement-earned event.
    ///
    /// Fails only when the achievement has no usable identifier. Repeats
    /// inside the dedup window return [`SubmitOutcome::Suppressed`].
    pub async fn submit(&self, event: AchievementEvent) -> Result<SubmitOutcome, NotificationError> {
        let key = event.achievement.dedup_key()?;
        let now = Instant::now();

        let mut state = self.inner.state.lock().await;

        if !state.ledger.check_and_record(&key, now) {
            tracing::debug!(key = %key, "Duplicate achievement suppressed");
            return Ok(SubmitOutcome::Suppressed);
        }

        let presentation = self.inner.config.classify(&event);
        let notification = Notification::new(event, presentation);
        let id = notification.id;

        match presentation {
            Presentation::Modal => {
                if let Some(previous) = state.modal.replace(notification.clone()) {
                    tracing::debug!(replaced = %previous.id, "Modal replaced");
                }
                tracing::info!(
                    notification_id = %id,
                    key = %key,
                    rarity = %notification.achievement().rarity,
                    global_first = notification.event.is_global_first,
                    "Modal achievement shown"
                );
                self.inner.emit(NotificationEvent::ModalShown { notification });
                Ok(SubmitOutcome::Modal { id })
            }
            Presentation::Toast => {
                let slot = match state.last_toast_slot {
                    Some(last) => (last + self.inner.config.toast_cooldown).max(now),
                    None => now,
                };
                state.last_toast_slot = Some(slot);
                let delay = slot.saturating_duration_since(now);

                if delay.is_zero() {
                    Shared::show_toast(&self.inner, &mut state, notification);
                } else {
                    tracing::debug!(
                        notification_id = %id,
                        delay_ms = delay.as_millis() as u64,
                        "Toast deferred by cooldown"
                    );
                    let generation = state.generation;
                    let inner = Arc::clone(&self.inner);
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep_until(slot).await;
                        let mut state = inner.state.lock().await;
                        if state.generation != generation {
                            return;
                        }
                        state.deferred.remove(&id);
                        Shared::show_toast(&inner, &mut state, notification);
                    });
                    state.deferred.insert(id, handle);
                }

                Ok(SubmitOutcome::Toast { id, delay })
            }
        }
    }

    /// Replay a backlog of unnotified achievements, most prestigious first.
    ///
    /// Events without an identifier are skipped. The toast cooldown spaces
    /// out the rest.
    pub async fn submit_backlog(&self, mut events: Vec<AchievementEvent>) -> Vec<SubmitOutcome> {
        events.sort_by(|a, b| b.achievement.rarity.rank().cmp(&a.achievement.rarity.rank()));

        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            match self.submit(event).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "Skipping backlog entry"),
            }
        }

        tracing::info!(submitted = outcomes.len(), "Achievement backlog replayed");
        outcomes
    }

    /// Remove a visible toast. Returns `false` if no such toast is shown.
    pub async fn dismiss(&self, id: Uuid) -> bool {
        let mut state = self.inner.state.lock().await;

        if let Some(handle) = state.expiries.remove(&id) {
            handle.abort();
        }

        let removed = state.remove_toast(id);
        if removed {
            self.inner.emit(NotificationEvent::ToastDismissed {
                id,
                reason: DismissReason::Manual,
            });
        }
        removed
    }

    /// Clear the modal holder. Returns `false` if it was already empty.
    pub async fn dismiss_modal(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        match state.modal.take() {
            Some(modal) => {
                self.inner.emit(NotificationEvent::ModalDismissed { id: modal.id });
                true
            }
            None => false,
        }
    }

    /// Clear toasts, modal and dedup ledger, and cancel deferred work
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;

        state.generation += 1;
        let cancelled = state.abort_tasks();
        state.toasts.clear();
        state.modal = None;
        state.ledger.clear();
        state.last_toast_slot = None;

        tracing::info!(cancelled_tasks = cancelled, "Notification state reset");
        self.inner.emit(NotificationEvent::Reset);
    }

    /// Current presentation state
    pub async fn snapshot(&self) -> NotificationSnapshot {
        let state = self.inner.state.lock().await;
        NotificationSnapshot {
            toasts: state.toasts.iter().cloned().collect(),
            modal: state.modal.clone(),
            pending: state.deferred.len(),
        }
    }

    /// Toasts still waiting out the cooldown
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.deferred.len()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.events.subscribe()
    }

    /// Cancel all deferred work. Visible state is left intact.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        state.generation += 1;
        let cancelled = state.abort_tasks();
        tracing::info!(cancelled_tasks = cancelled, "Notification scheduler stopped");
    }
}

impl Default for NotificationScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Shared {
    fn emit(&self, event: NotificationEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn show_toast(inner: &Arc<Shared>, state: &mut SchedulerState, notification: Notification) {
        let id = notification.id;
        state.toasts.push_back(notification.clone());

        tracing::info!(
            notification_id = %id,
            rarity = %notification.achievement().rarity,
            queued = state.toasts.len(),
            "Toast achievement shown"
        );
        inner.emit(NotificationEvent::ToastShown { notification });

        if let Some(ttl) = inner.config.toast_auto_dismiss {
            let generation = state.generation;
            let task_inner = Arc::clone(inner);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut state = task_inner.state.lock().await;
                if state.generation != generation {
                    return;
                }
                state.expiries.remove(&id);
                if state.remove_toast(id) {
                    task_inner.emit(NotificationEvent::ToastDismissed {
                        id,
                        reason: DismissReason::Expired,
                    });
                }
            });
            state.expiries.insert(id, handle);
        }
    }
}
