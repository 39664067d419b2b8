use crate::command::{Bot, BotRow, BotStatus};

/// Whether a bot's displayed status came from a full refresh or from an
/// optimistic write that has not been confirmed by the server yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone)]
pub struct BotRecord {
    pub bot: Bot,
    pub sync: SyncState,
}

/// Last known state of every bot, in server order. Holds at most one
/// record per id; only the refresh fetcher and the command dispatcher
/// mutate it.
#[derive(Debug, Default)]
pub struct BotStore {
    records: Vec<BotRecord>,
}

impl BotStore {
    pub fn new() -> BotStore {
        BotStore {
            records: Vec::new(),
        }
    }

    /// Wholesale replacement from an authoritative refresh. Every record
    /// becomes `Confirmed`; bots absent from the new list are dropped.
    pub fn replace_all(&mut self, bots: Vec<Bot>) {
        self.records = bots
            .into_iter()
            .map(|bot| BotRecord {
                bot,
                sync: SyncState::Confirmed,
            })
            .collect();
    }

    /// Optimistic status overwrite for one bot. The record is tagged
    /// `Pending` until a command confirmation or refresh resolves it.
    /// Returns false when the id is unknown.
    pub fn set_status(&mut self, id: u64, status: BotStatus) -> bool {
        match self.records.iter_mut().find(|record| record.bot.id == id) {
            Some(record) => {
                record.bot.status = status;
                record.sync = SyncState::Pending;
                true
            }
            None => false,
        }
    }

    /// Flips a pending record back to `Confirmed` after the server
    /// acknowledged the command. The status itself is left untouched.
    pub fn mark_confirmed(&mut self, id: u64) {
        if let Some(record) = self.records.iter_mut().find(|record| record.bot.id == id) {
            record.sync = SyncState::Confirmed;
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.iter().any(|record| record.bot.id == id)
    }

    pub fn get(&self, id: u64) -> Option<&BotRecord> {
        self.records.iter().find(|record| record.bot.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> Vec<BotRow> {
        self.records
            .iter()
            .map(|record| BotRow {
                bot: record.bot.clone(),
                pending: record.sync == SyncState::Pending,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: u64, status: BotStatus) -> Bot {
        Bot {
            id,
            strategy: format!("Strategy {id}"),
            pair: "BTC/USDT".to_string(),
            status,
            pnl: 0.0,
            trades: 0,
        }
    }

    #[test]
    fn replace_all_is_wholesale_and_confirmed() {
        let mut store = BotStore::new();
        store.replace_all(vec![bot(1, BotStatus::Running), bot(2, BotStatus::Paused)]);
        store.set_status(1, BotStatus::Paused);
        assert_eq!(store.get(1).unwrap().sync, SyncState::Pending);

        store.replace_all(vec![bot(1, BotStatus::Running)]);
        assert_eq!(store.len(), 1);
        assert!(!store.contains(2));
        let record = store.get(1).unwrap();
        assert_eq!(record.bot.status, BotStatus::Running);
        assert_eq!(record.sync, SyncState::Confirmed);
    }

    #[test]
    fn replace_all_is_idempotent() {
        let mut store = BotStore::new();
        let bots = vec![bot(1, BotStatus::Running), bot(2, BotStatus::Paused)];
        store.replace_all(bots.clone());
        let first = store.snapshot();
        store.replace_all(bots);
        assert_eq!(store.snapshot(), first);
    }

    #[test]
    fn set_status_misses_unknown_ids() {
        let mut store = BotStore::new();
        store.replace_all(vec![bot(1, BotStatus::Running)]);
        assert!(!store.set_status(99, BotStatus::Paused));
        assert_eq!(store.get(1).unwrap().bot.status, BotStatus::Running);
    }

    #[test]
    fn mark_confirmed_keeps_the_optimistic_status() {
        let mut store = BotStore::new();
        store.replace_all(vec![bot(1, BotStatus::Running)]);
        store.set_status(1, BotStatus::Paused);
        store.mark_confirmed(1);
        let record = store.get(1).unwrap();
        assert_eq!(record.bot.status, BotStatus::Paused);
        assert_eq!(record.sync, SyncState::Confirmed);
    }

    #[test]
    fn snapshot_reports_pending_rows() {
        let mut store = BotStore::new();
        store.replace_all(vec![bot(1, BotStatus::Running), bot(2, BotStatus::Paused)]);
        store.set_status(2, BotStatus::Running);
        let rows = store.snapshot();
        assert!(!rows[0].pending);
        assert!(rows[1].pending);
    }
}
