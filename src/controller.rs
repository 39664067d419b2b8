use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::api::ApiClient;
use crate::command::{Command, UiRequest};
use crate::error_log::ErrorLogStore;
use crate::sync::ControlSync;

/// Owns the bot store (via `ControlSync`) and the API client. The TUI
/// never touches either directly: it sends `UiRequest`s in and receives
/// `Command` events back, so all store mutation stays in one task.
pub struct Controller {
    sync: ControlSync<ApiClient>,
    api: ApiClient,
    tx: broadcast::Sender<Command>,
    rx: mpsc::Receiver<UiRequest>,
    refresh_interval: Duration,
    error_log: ErrorLogStore,
}

impl Controller {
    pub fn new(
        api: ApiClient,
        tx: broadcast::Sender<Command>,
        rx: mpsc::Receiver<UiRequest>,
        refresh_interval: Duration,
        error_log: ErrorLogStore,
    ) -> Controller {
        let sync = ControlSync::new(api.clone(), tx.clone());
        Controller {
            sync,
            api,
            tx,
            rx,
            refresh_interval,
            error_log,
        }
    }

    pub async fn run(mut self) -> Result<(), anyhow::Error> {
        // The first tick fires immediately and doubles as the startup
        // fetch of the bot list.
        let mut refresh_tick = time::interval(self.refresh_interval);
        refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = refresh_tick.tick() => {
                    if let Err(err) = self.sync.refresh().await {
                        self.report("refresh", &err.to_string());
                    }
                }
                request = self.rx.recv() => match request {
                    Some(request) => self.handle(request).await,
                    // The TUI dropped its sender; time to go.
                    None => break,
                }
            }
        }
        Ok(())
    }

    async fn handle(&mut self, request: UiRequest) {
        match request {
            UiRequest::RefreshBots => match self.sync.refresh().await {
                Ok(()) => {
                    let _ = self.tx.send(Command::Notice("Bot list refreshed".to_string()));
                }
                Err(err) => self.report("refresh", &err.to_string()),
            },
            UiRequest::ControlBot { id, desired } => {
                match self.sync.dispatch(id, desired).await {
                    Ok(()) => {
                        let _ = self.tx.send(Command::Notice(format!(
                            "Bot {id} set to {}",
                            desired.as_str()
                        )));
                    }
                    Err(err) => self.report("control", &err.to_string()),
                }
            }
            UiRequest::LoadChart { symbol } => {
                match self.api.fetch_chart_data(&symbol).await {
                    Ok(series) => {
                        let _ = self.tx.send(Command::ChartLoaded(series));
                        match self.api.fetch_simulation(&symbol).await {
                            Ok(stats) => {
                                let _ = self.tx.send(Command::SimulationLoaded(stats));
                            }
                            Err(err) => self.report(
                                "simulate",
                                &format!("simulation stats for {symbol}: {err}"),
                            ),
                        }
                    }
                    Err(err) => self.report("chart", &format!("chart data for {symbol}: {err}")),
                }
            }
            UiRequest::LoadDashboard => {
                match self.api.fetch_dashboard_summary().await {
                    Ok(cards) => {
                        let _ = self.tx.send(Command::SummaryLoaded(cards));
                    }
                    Err(err) => self.report("summary", &format!("dashboard summary: {err}")),
                }
                match self.api.fetch_equity_curve().await {
                    Ok(curve) => {
                        let _ = self.tx.send(Command::EquityLoaded(curve));
                    }
                    Err(err) => self.report("equity", &format!("equity curve: {err}")),
                }
            }
            UiRequest::LoadTradeLogs => match self.api.fetch_trade_logs().await {
                Ok(logs) => {
                    let _ = self.tx.send(Command::TradeLogsLoaded(logs));
                }
                Err(err) => self.report("trades", &format!("trade logs: {err}")),
            },
            UiRequest::LoadMarket { ticker } => {
                match self.api.fetch_market_history(&ticker).await {
                    Ok(candles) => {
                        let _ = self.tx.send(Command::MarketLoaded(candles));
                    }
                    Err(err) => {
                        self.report("market", &format!("market history for {ticker}: {err}"))
                    }
                }
            }
        }
    }

    fn report(&self, kind: &str, message: &str) {
        let _ = self.tx.send(Command::Error(message.to_string()));
        if let Err(err) = self.error_log.append(kind, message) {
            let _ = self
                .tx
                .send(Command::Error(format!("failed to write error log: {err}")));
        }
    }
}
