use ratatui::style::Color;

use crate::command::{BotStatus, ChartSeries, EquityPoint};

pub const UP_COLOR: Color = Color::Green;
pub const DOWN_COLOR: Color = Color::Red;

/// A series trends up when the last price is at or above the first.
/// The comparison is inclusive, so a flat series renders as up.
pub fn trend_up(prices: &[f64]) -> bool {
    match (prices.first(), prices.last()) {
        (Some(first), Some(last)) => last >= first,
        _ => true,
    }
}

pub fn trend_color(up: bool) -> Color {
    if up { UP_COLOR } else { DOWN_COLOR }
}

pub fn status_badge(status: BotStatus) -> (&'static str, Color) {
    match status {
        BotStatus::Running => ("Running", Color::Green),
        BotStatus::Paused => ("Paused", Color::Yellow),
    }
}

/// Label for the control action offered next to a bot: a running bot
/// gets a Pause button, a paused bot gets a Run button.
pub fn action_label(status: BotStatus) -> &'static str {
    match status {
        BotStatus::Running => "Pause",
        BotStatus::Paused => "Run",
    }
}

/// The desired status a control command should carry, computed from the
/// currently displayed status. The dispatcher applies this value as
/// given and never toggles on its own.
pub fn desired_status(displayed: BotStatus) -> BotStatus {
    match displayed {
        BotStatus::Running => BotStatus::Paused,
        BotStatus::Paused => BotStatus::Running,
    }
}

pub fn pnl_color(pnl: f64) -> Color {
    if pnl >= 0.0 { UP_COLOR } else { DOWN_COLOR }
}

/// Chart points indexed by position; the date labels carry the real axis.
pub fn chart_points(series: &ChartSeries) -> Vec<(f64, f64)> {
    series
        .prices
        .iter()
        .enumerate()
        .map(|(idx, price)| (idx as f64, *price))
        .collect()
}

pub fn equity_points(curve: &[EquityPoint]) -> Vec<(f64, f64)> {
    curve
        .iter()
        .enumerate()
        .map(|(idx, point)| (idx as f64, point.value))
        .collect()
}

/// Min and max of the finite values in a series, padded so a flat line
/// does not collapse the axis.
pub fn value_bounds(points: &[(f64, f64)]) -> [f64; 2] {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, value) in points {
        if value.is_finite() {
            min = min.min(*value);
            max = max.max(*value);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if (max - min).abs() < f64::EPSILON {
        let padding = (max.abs() * 0.05).max(1.0);
        return [min - padding, max + padding];
    }
    let padding = (max - min) * 0.05;
    [min - padding, max + padding]
}
