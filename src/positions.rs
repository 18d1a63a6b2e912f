// ===============================
// src/positions.rs (net position & average cost per symbol)
// ===============================
use ahash::AHashMap;
use parking_lot::RwLock;

use crate::domain::{PositionState, Side};
use crate::metrics::POSITION_QTY;

/// Per-symbol net position and volume-weighted average cost, a pure
/// function of the trade stream. Entries are created lazily on the first
/// trade for a symbol.
///
/// Sell and SellShort decrement identically; the ledger does not
/// distinguish closing a long from opening a short.
#[derive(Debug, Default)]
pub struct PositionLedger {
    inner: RwLock<AHashMap<String, PositionState>>,
}

impl PositionLedger {
    pub fn new() -> Self { Self::default() }

    pub fn apply_trade(&self, symbol: &str, price: f64, quantity: i64, side: Side) {
        let mut map = self.inner.write();
        let pos = map.entry(symbol.to_string()).or_default();

        pos.net_qty += side.sign() * quantity;
        pos.total_cost += side.sign() as f64 * price * quantity as f64;
        // Recomputed from scratch off the post-update values; undefined at flat.
        pos.avg_price = if pos.net_qty != 0 {
            Some((pos.total_cost / pos.net_qty as f64).abs())
        } else {
            None
        };

        POSITION_QTY.with_label_values(&[symbol]).set(pos.net_qty);
    }

    pub fn get(&self, symbol: &str) -> Option<PositionState> {
        self.inner.read().get(symbol).copied()
    }

    pub fn snapshot(&self) -> Vec<(String, PositionState)> {
        let mut out: Vec<_> = self
            .inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
