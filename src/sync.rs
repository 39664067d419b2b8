use thiserror::Error;
use tokio::sync::broadcast;

use crate::api::{ApiError, BotApi};
use crate::command::{BotStatus, Command};
use crate::store::BotStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("bot {id} is not in the local store")]
    Lookup { id: u64 },
    #[error("failed to refresh bot list: {source}")]
    Refresh { source: ApiError },
    #[error("control command for bot {id} failed: {source}")]
    Command { id: u64, source: ApiError },
}

/// Keeps the local bot store in step with the remote service.
///
/// A control command is applied optimistically before the request is
/// sent, so the view reflects intent with zero latency. On a failed
/// command the optimistic write is never inverted locally; ground truth
/// is pulled back in with a full refresh instead. A failed refresh
/// leaves the store untouched.
pub struct ControlSync<A> {
    store: BotStore,
    api: A,
    tx: broadcast::Sender<Command>,
}

impl<A: BotApi> ControlSync<A> {
    pub fn new(api: A, tx: broadcast::Sender<Command>) -> ControlSync<A> {
        ControlSync {
            store: BotStore::new(),
            api,
            tx,
        }
    }

    pub fn store(&self) -> &BotStore {
        &self.store
    }

    fn emit_snapshot(&self) {
        let _ = self.tx.send(Command::BotsUpdated(self.store.snapshot()));
    }

    /// Pulls the authoritative bot list and replaces the store wholesale.
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        let bots = self
            .api
            .fetch_active_bots()
            .await
            .map_err(|source| SyncError::Refresh { source })?;
        self.store.replace_all(bots);
        self.emit_snapshot();
        Ok(())
    }

    /// Applies `desired` optimistically, then asks the server to confirm.
    ///
    /// The desired value is taken as given; computing the toggle from the
    /// currently displayed status is the caller's job, so a retried
    /// command cannot double-toggle.
    pub async fn dispatch(&mut self, id: u64, desired: BotStatus) -> Result<(), SyncError> {
        if !self.store.set_status(id, desired) {
            return Err(SyncError::Lookup { id });
        }
        // The snapshot goes out before any network latency is incurred.
        self.emit_snapshot();
        match self.api.control_bot(id, desired).await {
            Ok(()) => {
                self.store.mark_confirmed(id);
                self.emit_snapshot();
                Ok(())
            }
            Err(source) => {
                // Note: this reconciliation refresh replaces the whole
                // store, so an unrelated command's still-pending optimistic
                // write can be clobbered by it. Accepted race.
                if let Err(refresh_err) = self.refresh().await {
                    let _ = self.tx.send(Command::Error(refresh_err.to_string()));
                }
                Err(SyncError::Command { id, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::command::Bot;
    use crate::store::SyncState;

    #[derive(Default)]
    struct ScriptedApi {
        fetch_results: Mutex<VecDeque<Result<Vec<Bot>, ApiError>>>,
        control_results: Mutex<VecDeque<Result<(), ApiError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn push_fetch(&self, result: Result<Vec<Bot>, ApiError>) {
            self.fetch_results.lock().unwrap().push_back(result);
        }

        fn push_control(&self, result: Result<(), ApiError>) {
            self.control_results.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotApi for &ScriptedApi {
        async fn fetch_active_bots(&self) -> Result<Vec<Bot>, ApiError> {
            self.calls.lock().unwrap().push("fetch".to_string());
            self.fetch_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn control_bot(&self, id: u64, new_status: BotStatus) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("control {id} {}", new_status.as_str()));
            self.control_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    fn bot(id: u64, status: BotStatus) -> Bot {
        Bot {
            id,
            strategy: format!("Strategy {id}"),
            pair: "BTC/USDT".to_string(),
            status,
            pnl: 1.0,
            trades: 2,
        }
    }

    fn sync_with(api: &ScriptedApi) -> (ControlSync<&ScriptedApi>, broadcast::Receiver<Command>) {
        let (tx, rx) = broadcast::channel(16);
        (ControlSync::new(api, tx), rx)
    }

    fn next_snapshot(rx: &mut broadcast::Receiver<Command>) -> Vec<crate::command::BotRow> {
        loop {
            match rx.try_recv().expect("expected a buffered command") {
                Command::BotsUpdated(rows) => return rows,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn unknown_id_is_rejected_without_a_network_call() {
        let api = ScriptedApi::default();
        let (mut sync, _rx) = sync_with(&api);
        let err = sync.dispatch(7, BotStatus::Paused).await.unwrap_err();
        assert!(matches!(err, SyncError::Lookup { id: 7 }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn optimistic_status_is_visible_before_the_call_resolves() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        api.push_control(Ok(()));
        let (mut sync, mut rx) = sync_with(&api);
        sync.refresh().await.unwrap();
        let _ = next_snapshot(&mut rx);

        sync.dispatch(1, BotStatus::Paused).await.unwrap();

        // First snapshot after dispatch carries the optimistic value and
        // the pending marker; it was emitted before the control request.
        let optimistic = next_snapshot(&mut rx);
        assert_eq!(optimistic[0].bot.status, BotStatus::Paused);
        assert!(optimistic[0].pending);

        // Confirmation only clears the marker; no re-fetch happened.
        let confirmed = next_snapshot(&mut rx);
        assert_eq!(confirmed[0].bot.status, BotStatus::Paused);
        assert!(!confirmed[0].pending);
        assert_eq!(api.calls(), vec!["fetch", "control 1 Paused"]);
    }

    #[tokio::test]
    async fn failed_command_converges_to_the_refreshed_value() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        api.push_control(Err(ApiError::Status { code: 500 }));
        // Ground truth disagrees with both the optimistic guess and the
        // pre-command value.
        api.push_fetch(Ok(vec![bot(1, BotStatus::Paused)]));
        let (mut sync, mut rx) = sync_with(&api);
        sync.refresh().await.unwrap();
        let _ = next_snapshot(&mut rx);

        let err = sync.dispatch(1, BotStatus::Paused).await.unwrap_err();
        assert!(matches!(err, SyncError::Command { id: 1, .. }));

        let record = sync.store().get(1).unwrap();
        assert_eq!(record.bot.status, BotStatus::Paused);
        assert_eq!(record.sync, SyncState::Confirmed);
        assert_eq!(
            api.calls(),
            vec!["fetch", "control 1 Paused", "fetch"],
            "a failed command must trigger exactly one reconciliation fetch"
        );
    }

    #[tokio::test]
    async fn server_ground_truth_wins_over_the_optimistic_guess() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        api.push_control(Err(ApiError::Invalid("rejected".to_string())));
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        let (mut sync, mut rx) = sync_with(&api);
        sync.refresh().await.unwrap();
        let _ = next_snapshot(&mut rx);

        let err = sync.dispatch(1, BotStatus::Paused).await.unwrap_err();
        assert!(matches!(err, SyncError::Command { id: 1, .. }));

        let optimistic = next_snapshot(&mut rx);
        assert_eq!(optimistic[0].bot.status, BotStatus::Paused);
        let reconciled = next_snapshot(&mut rx);
        assert_eq!(reconciled[0].bot.status, BotStatus::Running);
        assert!(!reconciled[0].pending);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_known_good_state_alone() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        api.push_fetch(Err(ApiError::Status { code: 502 }));
        let (mut sync, _rx) = sync_with(&api);
        sync.refresh().await.unwrap();

        let err = sync.refresh().await.unwrap_err();
        assert!(matches!(err, SyncError::Refresh { .. }));
        assert_eq!(sync.store().len(), 1);
        assert_eq!(
            sync.store().get(1).unwrap().bot.status,
            BotStatus::Running
        );
    }

    #[tokio::test]
    async fn failed_reconcile_keeps_the_optimistic_value_pending() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running)]));
        api.push_control(Err(ApiError::Status { code: 500 }));
        api.push_fetch(Err(ApiError::Status { code: 502 }));
        let (mut sync, _rx) = sync_with(&api);
        sync.refresh().await.unwrap();

        let err = sync.dispatch(1, BotStatus::Paused).await.unwrap_err();
        assert!(matches!(err, SyncError::Command { id: 1, .. }));
        // Nothing authoritative came back, so the optimistic value stays
        // on display until a later refresh succeeds.
        let record = sync.store().get(1).unwrap();
        assert_eq!(record.bot.status, BotStatus::Paused);
        assert_eq!(record.sync, SyncState::Pending);
    }

    #[tokio::test]
    async fn refresh_drops_bots_missing_from_the_new_list() {
        let api = ScriptedApi::default();
        api.push_fetch(Ok(vec![bot(1, BotStatus::Running), bot(2, BotStatus::Paused)]));
        api.push_fetch(Ok(vec![bot(2, BotStatus::Paused)]));
        let (mut sync, _rx) = sync_with(&api);
        sync.refresh().await.unwrap();
        sync.refresh().await.unwrap();
        assert!(!sync.store().contains(1));
        assert!(sync.store().contains(2));
    }
}
