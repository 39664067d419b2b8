use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct CliParams {
    /// Base URL of the trading API service
    #[clap(
        long = "api-base",
        env = "QUANTDECK_API_BASE",
        default_value = "http://localhost:8000"
    )]
    pub api_base: String,

    /// Symbol shown on the chart page at startup (e.g. BTC-USD)
    #[clap(short = 's', long = "symbol", default_value = "BTC-USD")]
    pub symbol: String,

    /// Ticker queried on the market history page (e.g. BTC/USDT)
    #[clap(long = "ticker", default_value = "BTC/USDT")]
    pub ticker: String,

    /// Interval between background refreshes of the bot list (e.g., 15s, 1m)
    #[clap(long = "refresh", value_name = "DURATION", default_value = "30s")]
    pub refresh: DurationSpec,

    /// File that failed requests and rejected commands are appended to
    #[clap(long = "error-log", default_value = "quantdeck_errors.jsonl")]
    pub error_log: PathBuf,
}

impl CliParams {
    pub fn api_base(&self) -> String {
        normalize_endpoint(&self.api_base)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh.as_duration()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for DurationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = parse_duration_spec(s)?;
        Ok(DurationSpec(duration))
    }
}

fn parse_duration_spec(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration spec cannot be empty (examples: 15s, 1m, 1h)".to_string());
    }
    let split_idx = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| "duration spec must end with a unit like s, m, or h".to_string())?;
    if split_idx == 0 {
        return Err("duration spec must start with a number (examples: 15s, 1m)".to_string());
    }
    let (value_part, unit_part) = trimmed.split_at(split_idx);
    let value: f64 = value_part.parse().map_err(|_| {
        format!(
            "invalid numeric portion `{}` in duration spec `{}`",
            value_part, trimmed
        )
    })?;
    let seconds_multiplier = match unit_part.trim().to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60.0 * 60.0,
        other => {
            return Err(format!(
                "unsupported duration unit `{}` (use s, m, or h)",
                other
            ));
        }
    };
    let seconds = value * seconds_multiplier;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("duration must be positive: `{}`", trimmed));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn normalize_endpoint(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "http://localhost:8000".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(
            parse_duration_spec("15s").unwrap(),
            Duration::from_secs(15)
        );
        assert_eq!(parse_duration_spec("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(
            parse_duration_spec("1.5h").unwrap(),
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(parse_duration_spec("").is_err());
        assert!(parse_duration_spec("10").is_err());
        assert!(parse_duration_spec("m").is_err());
        assert!(parse_duration_spec("0s").is_err());
        assert!(parse_duration_spec("5d").is_err());
    }

    #[test]
    fn normalizes_api_base() {
        assert_eq!(
            normalize_endpoint("http://localhost:8000/"),
            "http://localhost:8000"
        );
        assert_eq!(normalize_endpoint("  "), "http://localhost:8000");
        assert_eq!(
            normalize_endpoint("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
