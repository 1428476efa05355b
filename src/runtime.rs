//! Tokio host for one mounted card.
//!
//! A frame task ticks at display rate, firing debounce deadlines and due
//! frames. History fetches run as their own tasks and report back over a
//! channel; a collector task hands results to the card, which drops them if
//! it was torn down or reconfigured in the meantime.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cards::build_card;
use crate::error::ConfigError;
use crate::hass::{CardEvent, HassState};
use crate::history::{HistoryRequest, HistorySample, HistorySource, HistoryTicket};
use crate::instance::DynCard;
use crate::theme::CssVarCache;

/// Roughly one display refresh.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

type HistoryResult = (HistoryTicket, anyhow::Result<Vec<HistorySample>>);

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

pub struct CardRuntime {
    card: Arc<Mutex<Box<dyn DynCard>>>,
    source: Arc<dyn HistorySource>,
    history_tx: mpsc::UnboundedSender<HistoryResult>,
    shutdown: Arc<Notify>,
    _frame_handle: task::JoinHandle<()>,
    _history_handle: task::JoinHandle<()>,
}

impl CardRuntime {
    /// Builds the card named by `raw` and starts its tasks. Must be called
    /// inside a Tokio runtime.
    pub fn start(
        raw: &Value,
        theme: Arc<CssVarCache>,
        source: Arc<dyn HistorySource>,
    ) -> Result<Self, ConfigError> {
        Self::with_frame_interval(raw, theme, source, FRAME_INTERVAL)
    }

    pub fn with_frame_interval(
        raw: &Value,
        theme: Arc<CssVarCache>,
        source: Arc<dyn HistorySource>,
        frame_interval: Duration,
    ) -> Result<Self, ConfigError> {
        let card = Arc::new(Mutex::new(build_card(raw, theme)?));
        let shutdown = Arc::new(Notify::new());
        let (history_tx, history_rx) = mpsc::unbounded_channel();

        let _frame_handle = task::spawn(Self::frame_task(card.clone(), frame_interval, shutdown.clone()));
        let _history_handle = task::spawn(Self::history_task(card.clone(), history_rx, shutdown.clone()));

        Ok(Self {
            card,
            source,
            history_tx,
            shutdown,
            _frame_handle,
            _history_handle,
        })
    }

    async fn frame_task(card: Arc<Mutex<Box<dyn DynCard>>>, every: Duration, shutdown: Arc<Notify>) {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("Shutting down frame loop");
                    break;
                }
                _ = interval.tick() => {
                    let mut card = card.lock().await;
                    if card.is_torn_down() {
                        break;
                    }
                    let now = now();
                    card.poll_timers(now);
                    card.run_due_frames(now);
                }
            }
        }
    }

    async fn history_task(
        card: Arc<Mutex<Box<dyn DynCard>>>,
        mut results: mpsc::UnboundedReceiver<HistoryResult>,
        shutdown: Arc<Notify>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("Shutting down history collector");
                    break;
                }
                result = results.recv() => match result {
                    Some((ticket, result)) => {
                        let mut card = card.lock().await;
                        card.deliver_history(&ticket, result);
                        if card.is_torn_down() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    fn spawn_fetches(&self, requests: Vec<HistoryRequest>) {
        for request in requests {
            let source = self.source.clone();
            let tx = self.history_tx.clone();
            task::spawn(async move {
                let result = source.fetch(&request.query).await;
                if tx.send((request.ticket, result)).is_err() {
                    debug!("Runtime gone, dropping history for {}", request.query.entity_id);
                }
            });
        }
    }

    pub async fn set_hass(&self, hass: &HassState) {
        let requests = self.card.lock().await.set_hass(hass, now());
        self.spawn_fetches(requests);
    }

    pub async fn set_visible(&self, visible: bool) {
        self.card.lock().await.set_visible(visible);
    }

    pub async fn reconfigure(&self, raw: &Value) -> Result<(), ConfigError> {
        let requests = self.card.lock().await.reconfigure(raw, now())?;
        self.spawn_fetches(requests);
        Ok(())
    }

    pub async fn tap(&self, target: &str) -> Option<CardEvent> {
        self.card.lock().await.tap(target)
    }

    pub async fn markup(&self) -> String {
        self.card.lock().await.markup()
    }

    pub async fn patches(&self) -> u64 {
        self.card.lock().await.patches()
    }

    pub async fn kind(&self) -> &'static str {
        self.card.lock().await.kind()
    }

    pub async fn card_size(&self) -> u32 {
        self.card.lock().await.card_size()
    }

    /// Tears the card down and stops both tasks. Fetches still in flight
    /// complete into a closed channel.
    pub async fn shutdown(&self) {
        self.card.lock().await.teardown();
        self.shutdown.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::history::HistoryQuery;

    struct Empty;

    #[async_trait]
    impl HistorySource for Empty {
        async fn fetch(&self, _query: &HistoryQuery) -> anyhow::Result<Vec<HistorySample>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn collector_stops_when_shutdown_lands_during_a_delivery() {
        let runtime = CardRuntime::start(
            &json!({ "type": "neon-thermo-card", "entity": "sensor.t", "show_history": false }),
            Arc::new(CssVarCache::default()),
            Arc::new(Empty),
        )
        .unwrap();

        // The collector takes the result, then waits on the card lock.
        let mut card = runtime.card.lock().await;
        let ticket = HistoryTicket {
            generation: 0,
            entity_id: "sensor.t".to_string(),
        };
        runtime.history_tx.send((ticket, Ok(Vec::new()))).unwrap();
        time::sleep(Duration::from_millis(5)).await;

        card.teardown();
        runtime.shutdown.notify_waiters();
        drop(card);
        time::sleep(Duration::from_millis(50)).await;

        assert!(runtime._history_handle.is_finished());
        assert!(runtime._frame_handle.is_finished());
    }
}
