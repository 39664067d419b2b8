use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Duration;

use crate::command::{
    Bot, BotStatus, ChartSeries, EquityPoint, MarketCandle, SimulationStats, StatCard,
    TradeLogRecord,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server returned HTTP {code}")]
    Status { code: u16 },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("server reported: {0}")]
    Logical(String),
    #[error("malformed response: {0}")]
    Invalid(String),
}

/// The two calls the control synchronizer depends on. Split out as a
/// trait so the dispatcher can be exercised against a scripted remote.
#[async_trait]
pub trait BotApi {
    async fn fetch_active_bots(&self) -> Result<Vec<Bot>, ApiError>;
    async fn control_bot(&self, id: u64, new_status: BotStatus) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ControlBody {
    new_status: BotStatus,
}

#[derive(Debug, serde::Deserialize)]
struct ChartPayload {
    #[serde(default)]
    dates: Vec<String>,
    #[serde(default)]
    prices: Vec<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<ApiClient, ApiError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(ApiError::Transport)?;
        Ok(ApiClient { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    pub async fn fetch_chart_data(&self, symbol: &str) -> Result<ChartSeries, ApiError> {
        let payload: ChartPayload = self
            .get_json(&format!("/api/chart-data/{symbol}"), &[])
            .await?;
        validate_chart_payload(symbol, payload)
    }

    pub async fn fetch_simulation(&self, symbol: &str) -> Result<SimulationStats, ApiError> {
        self.get_json(&format!("/api/simulate/{symbol}"), &[]).await
    }

    pub async fn fetch_dashboard_summary(&self) -> Result<Vec<StatCard>, ApiError> {
        self.get_json("/api/dashboard/summary", &[]).await
    }

    pub async fn fetch_equity_curve(&self) -> Result<Vec<EquityPoint>, ApiError> {
        self.get_json("/api/dashboard/equity_curve", &[]).await
    }

    pub async fn fetch_trade_logs(&self) -> Result<Vec<TradeLogRecord>, ApiError> {
        self.get_json("/api/trades/logs", &[]).await
    }

    pub async fn fetch_market_history(&self, ticker: &str) -> Result<Vec<MarketCandle>, ApiError> {
        self.get_json("/api/market/history", &[("ticker", ticker)])
            .await
    }
}

#[async_trait]
impl BotApi for ApiClient {
    async fn fetch_active_bots(&self) -> Result<Vec<Bot>, ApiError> {
        let bots: Vec<Bot> = self.get_json("/api/bots/active", &[]).await?;
        validate_bots(bots)
    }

    async fn control_bot(&self, id: u64, new_status: BotStatus) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/bots/{id}/control")))
            .json(&ControlBody { new_status })
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
            });
        }
        // The response body carries no information the dispatcher consumes.
        Ok(())
    }
}

/// Shape check at the boundary: a malformed list must never be admitted
/// into the store.
pub fn validate_bots(bots: Vec<Bot>) -> Result<Vec<Bot>, ApiError> {
    let mut seen = HashSet::new();
    for bot in &bots {
        if !seen.insert(bot.id) {
            return Err(ApiError::Invalid(format!(
                "duplicate bot id {} in active list",
                bot.id
            )));
        }
        if bot.strategy.trim().is_empty() || bot.pair.trim().is_empty() {
            return Err(ApiError::Invalid(format!(
                "bot {} is missing a strategy or pair label",
                bot.id
            )));
        }
    }
    Ok(bots)
}

fn validate_chart_payload(symbol: &str, payload: ChartPayload) -> Result<ChartSeries, ApiError> {
    if let Some(message) = payload.error {
        return Err(ApiError::Logical(message));
    }
    if payload.dates.is_empty() || payload.prices.is_empty() {
        return Err(ApiError::Invalid(format!("no chart data for {symbol}")));
    }
    if payload.dates.len() != payload.prices.len() {
        return Err(ApiError::Invalid(format!(
            "chart data for {symbol} has {} dates but {} prices",
            payload.dates.len(),
            payload.prices.len()
        )));
    }
    Ok(ChartSeries {
        symbol: symbol.to_string(),
        dates: payload.dates,
        prices: payload.prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: u64, status: BotStatus) -> Bot {
        Bot {
            id,
            strategy: "Grid Trading".to_string(),
            pair: "BTC/USDT".to_string(),
            status,
            pnl: 12.5,
            trades: 4,
        }
    }

    #[test]
    fn bots_payload_round_trips() {
        let raw = r#"[
            {"id": 1, "strategy": "Grid Trading", "pair": "BTC/USDT",
             "status": "Running", "pnl": 152.3, "trades": 18},
            {"id": 2, "strategy": "Mean Reversal", "pair": "ETH/USDT",
             "status": "Paused", "pnl": -12.0, "trades": 7}
        ]"#;
        let bots: Vec<Bot> = serde_json::from_str(raw).unwrap();
        let bots = validate_bots(bots).unwrap();
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].status, BotStatus::Running);
        assert_eq!(bots[1].status, BotStatus::Paused);
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        let raw = r#"[{"id": 1, "strategy": "Grid", "pair": "BTC/USDT",
                       "status": "Stopped", "pnl": 0.0, "trades": 0}]"#;
        assert!(serde_json::from_str::<Vec<Bot>>(raw).is_err());
    }

    #[test]
    fn duplicate_bot_ids_are_rejected() {
        let bots = vec![bot(1, BotStatus::Running), bot(1, BotStatus::Paused)];
        let err = validate_bots(bots).unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }

    #[test]
    fn blank_labels_are_rejected() {
        let mut broken = bot(3, BotStatus::Running);
        broken.pair = "  ".to_string();
        assert!(validate_bots(vec![broken]).is_err());
    }

    #[test]
    fn chart_error_field_wins_over_http_success() {
        let payload = ChartPayload {
            dates: vec!["d1".to_string()],
            prices: vec![100.0],
            error: Some("no data for symbol".to_string()),
        };
        let err = validate_chart_payload("BTC-USD", payload).unwrap_err();
        assert!(matches!(err, ApiError::Logical(_)));
    }

    #[test]
    fn chart_length_mismatch_is_rejected() {
        let payload = ChartPayload {
            dates: vec!["d1".to_string(), "d2".to_string()],
            prices: vec![100.0],
            error: None,
        };
        assert!(matches!(
            validate_chart_payload("BTC-USD", payload),
            Err(ApiError::Invalid(_))
        ));
    }

    #[test]
    fn chart_payload_is_accepted_when_aligned() {
        let payload = ChartPayload {
            dates: vec!["d1".to_string(), "d2".to_string()],
            prices: vec![100.0, 90.0],
            error: None,
        };
        let series = validate_chart_payload("BTC-USD", payload).unwrap();
        assert_eq!(series.symbol, "BTC-USD");
        assert_eq!(series.prices, vec![100.0, 90.0]);
    }

    #[test]
    fn control_body_uses_wire_field_name() {
        let body = ControlBody {
            new_status: BotStatus::Paused,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"new_status":"Paused"}"#);
    }
}
