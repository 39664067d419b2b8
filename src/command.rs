use serde::{Deserialize, Serialize};

/// Events fanned out to the TUI over the broadcast channel.
#[derive(Debug, Clone)]
pub enum Command {
    BotsUpdated(Vec<BotRow>),
    ChartLoaded(ChartSeries),
    SimulationLoaded(SimulationStats),
    SummaryLoaded(Vec<StatCard>),
    EquityLoaded(Vec<EquityPoint>),
    TradeLogsLoaded(Vec<TradeLogRecord>),
    MarketLoaded(Vec<MarketCandle>),
    Notice(String),
    Error(String),
}

/// Requests the TUI sends to the controller task.
#[derive(Debug, Clone)]
pub enum UiRequest {
    RefreshBots,
    ControlBot { id: u64, desired: BotStatus },
    LoadChart { symbol: String },
    LoadDashboard,
    LoadTradeLogs,
    LoadMarket { ticker: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BotStatus {
    Running,
    Paused,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Running => "Running",
            BotStatus::Paused => "Paused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bot {
    pub id: u64,
    pub strategy: String,
    pub pair: String,
    pub status: BotStatus,
    pub pnl: f64,
    pub trades: u64,
}

/// One bot as the view sees it: the latest snapshot plus whether the
/// displayed status is still awaiting remote confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct BotRow {
    pub bot: Bot,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub symbol: String,
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationStats {
    pub symbol: String,
    pub total_return: f64,
    pub win_rate: f64,
    pub total_trades: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    pub change: String,
    #[serde(rename = "isPositive")]
    pub is_positive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub day: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeLogRecord {
    pub id: u64,
    pub time: String,
    pub pair: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub qty: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketCandle {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
