// ===============================
// src/orders.rs (active order store + trade history)
// ===============================
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::domain::{Fill, Order, TradeRecord};

/// Confirmed server-side transitions: `confirmed` counts NEW acks,
/// `cancelled` counts cancel confirmations. Neither counts client intent.
#[derive(Debug, Default)]
pub struct Counters {
    confirmed: AtomicU64,
    cancelled: AtomicU64,
}

impl Counters {
    pub fn inc_confirmed(&self) { self.confirmed.fetch_add(1, Ordering::Relaxed); }
    pub fn inc_cancelled(&self) { self.cancelled.fetch_add(1, Ordering::Relaxed); }
    pub fn confirmed(&self) -> u64 { self.confirmed.load(Ordering::Relaxed) }
    pub fn cancelled(&self) -> u64 { self.cancelled.load(Ordering::Relaxed) }
}

/// Outcome of applying one fill under the store lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome { Working, Completed }

/// Live orders keyed by client order id. Every mutator takes the write
/// lock for its whole transition, so a fill can never interleave with a
/// concurrent removal of the same order.
#[derive(Debug, Default)]
pub struct OrderStore {
    inner: RwLock<AHashMap<String, Order>>,
}

impl OrderStore {
    pub fn new() -> Self { Self::default() }

    /// Track an order confirmed by the counterparty. Returns false (and
    /// leaves the existing entry untouched) if the id is already tracked.
    pub fn insert_on_ack(&self, cl_ord_id: &str, order: Order) -> bool {
        let mut map = self.inner.write();
        if map.contains_key(cl_ord_id) {
            return false;
        }
        map.insert(cl_ord_id.to_string(), order);
        true
    }

    /// Apply one fill delta. The completion check runs after the delta is
    /// applied; a completed order is removed in the same lock acquisition.
    /// None if the id is not tracked.
    pub fn apply_fill(&self, cl_ord_id: &str, price: f64, quantity: i64) -> Option<FillOutcome> {
        let mut map = self.inner.write();
        let order = map.get_mut(cl_ord_id)?;
        order.filled_quantity += quantity;
        order.fills.push(Fill { price, quantity });
        if order.filled_quantity >= order.quantity {
            map.remove(cl_ord_id);
            Some(FillOutcome::Completed)
        } else {
            Some(FillOutcome::Working)
        }
    }

    pub fn remove(&self, cl_ord_id: &str) -> Option<Order> {
        self.inner.write().remove(cl_ord_id)
    }

    pub fn contains(&self, cl_ord_id: &str) -> bool {
        self.inner.read().contains_key(cl_ord_id)
    }

    pub fn get(&self, cl_ord_id: &str) -> Option<Order> {
        self.inner.read().get(cl_ord_id).cloned()
    }

    /// Consistent point-in-time copy of all active orders.
    pub fn snapshot(&self) -> Vec<(String, Order)> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize { self.inner.read().len() }

    pub fn is_empty(&self) -> bool { self.inner.read().is_empty() }
}

/// Global trade history: one record per fill event, append-only.
#[derive(Debug, Default)]
pub struct TradeLog {
    inner: RwLock<Vec<TradeRecord>>,
}

impl TradeLog {
    pub fn new() -> Self { Self::default() }

    pub fn append(&self, trade: TradeRecord) {
        self.inner.write().push(trade);
    }

    pub fn snapshot(&self) -> Vec<TradeRecord> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize { self.inner.read().len() }
}
