// ===============================
// src/domain.rs
// ===============================
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell, SellShort }
impl Side {
    // Sell and SellShort carry the same sign: the ledger does not
    // distinguish a sell that reduces a long from one that opens a short.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell | Side::SellShort => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdType { Market, Limit }

/// Execution type of an inbound report (closed set, matched exhaustively).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecType { New, PartialFill, Fill, Cancelled, CancelReject, Other }

/// Counterparty execution report as delivered by the session transport.
/// Optional fields are type-specific; absence where the type requires one
/// is a protocol error handled by the interpreter, never defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecReport {
    pub cl_ord_id: String,
    pub orig_cl_ord_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub exec_type: ExecType,
    pub order_qty: Option<i64>,
    pub price: Option<f64>,
    pub last_px: Option<f64>,
    pub last_qty: Option<i64>,
    pub ts_ns: i128,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fill { pub price: f64, pub quantity: i64 }

/// An order tracked by the store, created on the NEW acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: Option<f64>, // None => market order
    pub filled_quantity: i64,
    pub fills: Vec<Fill>,
}

impl Order {
    pub fn new(symbol: String, side: Side, quantity: i64, price: Option<f64>) -> Self {
        Self { symbol, side, quantity, price, filled_quantity: 0, fills: Vec::new() }
    }

    pub fn remaining(&self) -> i64 { self.quantity - self.filled_quantity }
}

/// One fill event in the global trade history. Append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord { pub symbol: String, pub price: f64, pub quantity: i64, pub side: Side }

/// Net position per symbol. avg_price is undefined exactly at zero net qty.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PositionState {
    pub net_qty: i64,
    pub total_cost: f64,
    pub avg_price: Option<f64>,
}

// Outbound request shapes handed to the transport for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub cl_ord_id: String,
    pub symbol: String,
    pub side: Side,
    pub ord_type: OrdType,
    pub quantity: i64,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub orig_cl_ord_id: String,
    pub cl_ord_id: String,
    pub symbol: String,
    pub side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutboundMsg { NewOrder(NewOrderRequest), Cancel(CancelRequest) }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event { Out(OutboundMsg), Exec(ExecReport), Trade(TradeRecord), Note(String) }
