// ===============================
// src/stats.rs (trading statistics over the trade history)
// ===============================
//
// Pure and stateless: every function works on a point-in-time snapshot of
// the trade history. Volume and VWAP are rounded to 2 decimals per symbol;
// PnL follows the realized cash-flow convention (buys pay out, sells and
// shorts take in), not mark-to-market.
//
use ahash::AHashMap;
use tracing::info;

use crate::domain::{Order, PositionState, Side, TradeRecord};
use crate::orders::Counters;

pub fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

#[derive(Debug, Default)]
pub struct Statistics {
    pub total_volume: AHashMap<String, f64>,
    pub pnl: AHashMap<String, f64>,
    pub vwap: AHashMap<String, f64>,
}

impl Statistics {
    pub fn aggregate_volume(&self) -> f64 {
        round2(self.total_volume.values().sum())
    }

    pub fn aggregate_pnl(&self) -> f64 {
        round2(self.pnl.values().sum())
    }
}

/// Notional traded per symbol (price * quantity), rounded to 2 decimals.
pub fn total_volume(trades: &[TradeRecord]) -> AHashMap<String, f64> {
    let mut volume: AHashMap<String, f64> = AHashMap::new();
    for t in trades {
        *volume.entry(t.symbol.clone()).or_insert(0.0) += t.price * t.quantity as f64;
    }
    for v in volume.values_mut() {
        *v = round2(*v);
    }
    volume
}

/// Realized cash-flow PnL per symbol: -price*qty on buys, +price*qty on
/// sells and shorts.
pub fn pnl(trades: &[TradeRecord]) -> AHashMap<String, f64> {
    let mut pnl: AHashMap<String, f64> = AHashMap::new();
    for t in trades {
        let flow = t.price * t.quantity as f64;
        let entry = pnl.entry(t.symbol.clone()).or_insert(0.0);
        match t.side {
            Side::Buy => *entry -= flow,
            Side::Sell | Side::SellShort => *entry += flow,
        }
    }
    pnl
}

/// Volume-weighted average price per symbol, rounded to 2 decimals.
/// Symbols with no trades are simply absent; no division by zero.
pub fn vwap(trades: &[TradeRecord]) -> AHashMap<String, f64> {
    let mut value: AHashMap<String, f64> = AHashMap::new();
    let mut quantity: AHashMap<String, i64> = AHashMap::new();
    for t in trades {
        *value.entry(t.symbol.clone()).or_insert(0.0) += t.price * t.quantity as f64;
        *quantity.entry(t.symbol.clone()).or_insert(0) += t.quantity;
    }

    let mut out = AHashMap::new();
    for (symbol, v) in value {
        if let Some(&q) = quantity.get(&symbol) {
            if q != 0 {
                out.insert(symbol, round2(v / q as f64));
            }
        }
    }
    out
}

pub fn calculate(trades: &[TradeRecord]) -> Statistics {
    Statistics {
        total_volume: total_volume(trades),
        pnl: pnl(trades),
        vwap: vwap(trades),
    }
}

/// Log the full summary: per-symbol stats, counters, active orders and
/// positions. Called between load phases and at shutdown.
pub fn report(
    trades: &[TradeRecord],
    counters: &Counters,
    active: &[(String, Order)],
    positions: &[(String, PositionState)],
) {
    let st = calculate(trades);

    let mut symbols: Vec<&String> = st.total_volume.keys().collect();
    symbols.sort();
    for symbol in symbols {
        info!(
            %symbol,
            volume = st.total_volume.get(symbol).copied().unwrap_or(0.0),
            pnl = round2(st.pnl.get(symbol).copied().unwrap_or(0.0)),
            vwap = st.vwap.get(symbol).copied(),
            "symbol statistics"
        );
    }
    info!(
        total_volume = st.aggregate_volume(),
        pnl = st.aggregate_pnl(),
        trades = trades.len(),
        "aggregate statistics"
    );
    info!(
        orders_confirmed = counters.confirmed(),
        orders_cancelled = counters.cancelled(),
        active_orders = active.len(),
        "order counters"
    );
    for (symbol, pos) in positions {
        info!(
            %symbol,
            net_qty = pos.net_qty,
            total_cost = round2(pos.total_cost),
            avg_price = pos.avg_price,
            "position"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(symbol: &str, price: f64, quantity: i64, side: Side) -> TradeRecord {
        TradeRecord { symbol: symbol.into(), price, quantity, side }
    }

    #[test]
    fn vwap_weights_by_quantity() {
        let trades = vec![
            trade("MSFT", 100.0, 10, Side::Buy),
            trade("MSFT", 200.0, 10, Side::Buy),
        ];
        assert_eq!(vwap(&trades)["MSFT"], 150.00);
    }

    #[test]
    fn pnl_is_realized_cash_flow() {
        let trades = vec![
            trade("MSFT", 100.0, 10, Side::Buy),
            trade("MSFT", 110.0, 10, Side::Sell),
        ];
        let p = pnl(&trades);
        assert_eq!(round2(p["MSFT"]), 100.00);
    }

    #[test]
    fn short_sales_count_as_inflow() {
        let trades = vec![trade("AAPL", 50.0, 4, Side::SellShort)];
        assert_eq!(pnl(&trades)["AAPL"], 200.0);
    }

    #[test]
    fn volume_rounds_per_symbol_and_aggregates() {
        let trades = vec![
            trade("MSFT", 100.333, 1, Side::Buy),
            trade("AAPL", 200.555, 1, Side::Sell),
        ];
        let st = calculate(&trades);
        assert_eq!(st.total_volume["MSFT"], 100.33);
        assert_eq!(st.total_volume["AAPL"], 200.56);
        assert_eq!(st.aggregate_volume(), 300.89);
    }

    #[test]
    fn empty_history_yields_empty_stats() {
        let st = calculate(&[]);
        assert!(st.total_volume.is_empty());
        assert!(st.pnl.is_empty());
        assert!(st.vwap.is_empty());
        assert_eq!(st.aggregate_volume(), 0.0);
        assert_eq!(st.aggregate_pnl(), 0.0);
    }

    #[test]
    fn vwap_absent_for_untraded_symbol() {
        let trades = vec![trade("MSFT", 100.0, 10, Side::Buy)];
        let v = vwap(&trades);
        assert!(v.contains_key("MSFT"));
        assert!(!v.contains_key("AAPL"));
    }
}
