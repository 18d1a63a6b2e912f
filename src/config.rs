// ===============================
// src/config.rs
// ===============================
use std::env;

use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Args {
    pub symbols: Vec<String>,
    pub metrics_port: u16,
    pub record_file: Option<String>,
    /// grace period after each load phase for in-flight reports to drain
    pub settle_secs: u64,
}

/// Knobs for the load-generation harness.
#[derive(Clone, Debug)]
pub struct LoadCfg {
    pub symbols: Vec<String>,
    /// stop once this many orders are confirmed by the counterparty
    pub order_count: u64,
    pub duration_secs: u64,
    pub order_pace_ms: u64,
    pub cancel_pace_ms: u64,
    pub max_qty: i64,
    // limit price band
    pub px_min: f64,
    pub px_max: f64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

pub fn load() -> (Args, LoadCfg) {
    let _ = dotenv();

    // SYMBOLS=MSFT,AAPL,BAC
    let symbols: Vec<String> = env::var("SYMBOLS")
        .ok()
        .map(|s| {
            s.split(',')
                .map(|x| x.trim())
                .filter(|x| !x.is_empty())
                .map(|x| x.to_ascii_uppercase())
                .collect()
        })
        .filter(|v: &Vec<String>| !v.is_empty())
        .unwrap_or_else(|| vec!["MSFT".into(), "AAPL".into(), "BAC".into()]);

    let args = Args {
        symbols: symbols.clone(),
        metrics_port: env_parse("METRICS_PORT", 9898),
        record_file: env::var("RECORD_FILE").ok(),
        settle_secs: env_parse("SETTLE_SECS", 30),
    };

    let load = LoadCfg {
        symbols,
        order_count: env_parse("ORDER_COUNT", 1000),
        duration_secs: env_parse("DURATION_SECS", 300),
        order_pace_ms: env_parse("ORDER_PACE_MS", 100),
        cancel_pace_ms: env_parse("CANCEL_PACE_MS", 100),
        max_qty: env_parse("MAX_QTY", 100),
        px_min: env_parse("PX_MIN", 100.0),
        px_max: env_parse("PX_MAX", 200.0),
    };

    (args, load)
}
