// ===============================
// src/interpreter.rs (execution report state machine)
// ===============================
//
// Single sequential consumer of the inbound report stream. Each report
// drives exactly one transition against the order store, trade history and
// position ledger. Reports are trusted to arrive in the order the
// counterparty sent them; out-of-order delivery for one id surfaces here
// as an UnknownOrder error, it is never silently corrected.
//
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{Event, ExecReport, ExecType, Order, TradeRecord};
use crate::metrics::{
    ACTIVE_ORDERS, EXEC_REPORTS, ORDERS_CANCELLED, ORDERS_CONFIRMED, REPORT_ERRORS, TRADES,
};
use crate::orders::{Counters, FillOutcome, OrderStore, TradeLog};
use crate::positions::PositionLedger;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report references unknown order {0}")]
    UnknownOrder(String),
    #[error("malformed report for {cl_ord_id}: missing {field}")]
    Malformed { cl_ord_id: String, field: &'static str },
    #[error("duplicate acknowledgement for {0}")]
    DuplicateAck(String),
}

impl ReportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::UnknownOrder(_) => "unknown_order",
            ReportError::Malformed { .. } => "malformed",
            ReportError::DuplicateAck(_) => "duplicate_ack",
        }
    }
}

fn exec_type_label(t: ExecType) -> &'static str {
    match t {
        ExecType::New => "new",
        ExecType::PartialFill => "partial_fill",
        ExecType::Fill => "fill",
        ExecType::Cancelled => "cancelled",
        ExecType::CancelReject => "cancel_reject",
        ExecType::Other => "other",
    }
}

pub struct Interpreter {
    orders: Arc<OrderStore>,
    positions: Arc<PositionLedger>,
    trades: Arc<TradeLog>,
    counters: Arc<Counters>,
    rec_tx: Option<mpsc::Sender<Event>>,
}

impl Interpreter {
    pub fn new(
        orders: Arc<OrderStore>,
        positions: Arc<PositionLedger>,
        trades: Arc<TradeLog>,
        counters: Arc<Counters>,
        rec_tx: Option<mpsc::Sender<Event>>,
    ) -> Self {
        Self { orders, positions, trades, counters, rec_tx }
    }

    /// Apply one report. Errors are locally recoverable: the caller logs
    /// them and keeps consuming.
    pub fn on_report(&self, er: &ExecReport) -> Result<(), ReportError> {
        EXEC_REPORTS.with_label_values(&[exec_type_label(er.exec_type)]).inc();
        match er.exec_type {
            ExecType::New => self.on_ack(er),
            ExecType::PartialFill | ExecType::Fill => self.on_fill(er),
            ExecType::Cancelled => self.on_cancelled(er),
            ExecType::CancelReject => {
                info!(cl_ord_id = %er.cl_ord_id, orig = ?er.orig_cl_ord_id, "order cancel reject");
                Ok(())
            }
            ExecType::Other => {
                info!(cl_ord_id = %er.cl_ord_id, "unhandled execution report");
                Ok(())
            }
        }
    }

    fn on_ack(&self, er: &ExecReport) -> Result<(), ReportError> {
        let quantity = er.order_qty.ok_or(ReportError::Malformed {
            cl_ord_id: er.cl_ord_id.clone(),
            field: "order_qty",
        })?;
        // Market-order acks carry no price; fills bring their own.
        let order = Order::new(er.symbol.clone(), er.side, quantity, er.price);
        if !self.orders.insert_on_ack(&er.cl_ord_id, order) {
            return Err(ReportError::DuplicateAck(er.cl_ord_id.clone()));
        }
        self.counters.inc_confirmed();
        ORDERS_CONFIRMED.inc();
        ACTIVE_ORDERS.set(self.orders.len() as i64);
        info!(cl_ord_id = %er.cl_ord_id, symbol = %er.symbol, quantity, "added new order");
        Ok(())
    }

    fn on_fill(&self, er: &ExecReport) -> Result<(), ReportError> {
        let last_px = er.last_px.ok_or(ReportError::Malformed {
            cl_ord_id: er.cl_ord_id.clone(),
            field: "last_px",
        })?;
        let last_qty = er.last_qty.ok_or(ReportError::Malformed {
            cl_ord_id: er.cl_ord_id.clone(),
            field: "last_qty",
        })?;

        let outcome = self
            .orders
            .apply_fill(&er.cl_ord_id, last_px, last_qty)
            .ok_or_else(|| ReportError::UnknownOrder(er.cl_ord_id.clone()))?;

        let trade = TradeRecord {
            symbol: er.symbol.clone(),
            price: last_px,
            quantity: last_qty,
            side: er.side,
        };
        self.trades.append(trade.clone());
        self.positions.apply_trade(&er.symbol, last_px, last_qty, er.side);

        TRADES.with_label_values(&[&er.symbol]).inc();
        ACTIVE_ORDERS.set(self.orders.len() as i64);
        if let Some(tx) = &self.rec_tx {
            let _ = tx.try_send(Event::Trade(trade));
        }

        match outcome {
            FillOutcome::Completed => {
                info!(cl_ord_id = %er.cl_ord_id, px = last_px, qty = last_qty, "updated fill, order complete")
            }
            FillOutcome::Working => {
                info!(cl_ord_id = %er.cl_ord_id, px = last_px, qty = last_qty, "updated partial fill")
            }
        }
        Ok(())
    }

    fn on_cancelled(&self, er: &ExecReport) -> Result<(), ReportError> {
        let orig = er.orig_cl_ord_id.as_deref().ok_or(ReportError::Malformed {
            cl_ord_id: er.cl_ord_id.clone(),
            field: "orig_cl_ord_id",
        })?;

        // The order may be tracked under either id depending on upstream
        // behavior; try both, but a confirm matching neither is an error
        // and must not bump the counter.
        let removed_own = self.orders.remove(&er.cl_ord_id).is_some();
        let removed_orig = self.orders.remove(orig).is_some();
        if !removed_own && !removed_orig {
            return Err(ReportError::UnknownOrder(orig.to_string()));
        }

        self.counters.inc_cancelled();
        ORDERS_CANCELLED.inc();
        ACTIVE_ORDERS.set(self.orders.len() as i64);
        info!(cl_ord_id = %er.cl_ord_id, orig_cl_ord_id = %orig, "removed cancelled order");
        Ok(())
    }
}

/// Consumer task: drains the transport's report stream one at a time. A
/// bad report is logged and skipped; the loop never dies on one.
pub async fn run(mut exec_rx: mpsc::Receiver<ExecReport>, interp: Interpreter) {
    while let Some(er) = exec_rx.recv().await {
        if let Some(tx) = &interp.rec_tx {
            let _ = tx.try_send(Event::Exec(er.clone()));
        }
        if let Err(e) = interp.on_report(&er) {
            REPORT_ERRORS.with_label_values(&[e.kind()]).inc();
            warn!(error = %e, exec_type = ?er.exec_type, "execution report dropped");
        }
    }
    info!("execution report stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    fn interp() -> Interpreter {
        Interpreter::new(
            Arc::new(OrderStore::new()),
            Arc::new(PositionLedger::new()),
            Arc::new(TradeLog::new()),
            Arc::new(Counters::default()),
            None,
        )
    }

    fn report(cl_ord_id: &str, exec_type: ExecType) -> ExecReport {
        ExecReport {
            cl_ord_id: cl_ord_id.into(),
            orig_cl_ord_id: None,
            symbol: "MSFT".into(),
            side: Side::Buy,
            exec_type,
            order_qty: None,
            price: None,
            last_px: None,
            last_qty: None,
            ts_ns: 0,
        }
    }

    fn ack(cl_ord_id: &str, qty: i64, price: Option<f64>) -> ExecReport {
        ExecReport { order_qty: Some(qty), price, ..report(cl_ord_id, ExecType::New) }
    }

    fn fill(cl_ord_id: &str, exec_type: ExecType, px: f64, qty: i64) -> ExecReport {
        ExecReport { last_px: Some(px), last_qty: Some(qty), ..report(cl_ord_id, exec_type) }
    }

    #[test]
    fn ack_creates_order_and_counts_confirmation() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();

        assert!(it.orders.contains("1"));
        assert_eq!(it.counters.confirmed(), 1);
        assert_eq!(it.orders.get("1").unwrap().filled_quantity, 0);
    }

    #[test]
    fn duplicate_ack_is_rejected_and_not_double_counted() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();
        let err = it.on_report(&ack("1", 100, Some(150.0))).unwrap_err();

        assert!(matches!(err, ReportError::DuplicateAck(_)));
        assert_eq!(it.counters.confirmed(), 1);
        assert_eq!(it.orders.len(), 1);
    }

    #[test]
    fn partial_then_completing_fill_removes_once_and_records_two_trades() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();
        it.on_report(&fill("1", ExecType::PartialFill, 150.0, 60)).unwrap();
        assert!(it.orders.contains("1"));

        it.on_report(&fill("1", ExecType::Fill, 151.0, 40)).unwrap();
        assert!(!it.orders.contains("1"));

        let trades = it.trades.snapshot();
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].price, trades[0].quantity), (150.0, 60));
        assert_eq!((trades[1].price, trades[1].quantity), (151.0, 40));
        assert_eq!(it.positions.get("MSFT").unwrap().net_qty, 100);
    }

    #[test]
    fn fill_on_unknown_order_leaves_no_state() {
        let it = interp();
        let err = it.on_report(&fill("ghost", ExecType::Fill, 150.0, 10)).unwrap_err();

        assert!(matches!(err, ReportError::UnknownOrder(_)));
        assert_eq!(it.trades.len(), 0);
        assert!(it.positions.get("MSFT").is_none());
    }

    #[test]
    fn market_order_ack_without_price_is_accepted() {
        let it = interp();
        it.on_report(&ack("1", 50, None)).unwrap();
        assert_eq!(it.orders.get("1").unwrap().price, None);
    }

    #[test]
    fn malformed_fill_is_skipped_and_stream_stays_live() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();

        // missing last_qty
        let mut bad = fill("1", ExecType::PartialFill, 150.0, 10);
        bad.last_qty = None;
        let err = it.on_report(&bad).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "last_qty", .. }));
        assert_eq!(it.orders.get("1").unwrap().filled_quantity, 0);
        assert_eq!(it.trades.len(), 0);

        // the next well-formed report still applies
        it.on_report(&fill("1", ExecType::PartialFill, 150.0, 10)).unwrap();
        assert_eq!(it.orders.get("1").unwrap().filled_quantity, 10);
    }

    #[test]
    fn cancel_removes_under_either_id() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();

        let mut cancel = report("7", ExecType::Cancelled);
        cancel.orig_cl_ord_id = Some("1".into());
        it.on_report(&cancel).unwrap();

        assert!(!it.orders.contains("1"));
        assert_eq!(it.counters.cancelled(), 1);
    }

    #[test]
    fn cancel_for_unknown_id_has_no_effect() {
        let it = interp();
        let mut cancel = report("7", ExecType::Cancelled);
        cancel.orig_cl_ord_id = Some("ghost".into());

        let err = it.on_report(&cancel).unwrap_err();
        assert!(matches!(err, ReportError::UnknownOrder(_)));
        assert_eq!(it.counters.cancelled(), 0);
        assert!(it.orders.is_empty());
    }

    #[test]
    fn cancel_without_orig_id_is_malformed() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();

        let err = it.on_report(&report("7", ExecType::Cancelled)).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "orig_cl_ord_id", .. }));
        assert!(it.orders.contains("1"));
        assert_eq!(it.counters.cancelled(), 0);
    }

    #[test]
    fn cancel_reject_and_other_do_not_mutate() {
        let it = interp();
        it.on_report(&ack("1", 100, Some(150.0))).unwrap();

        it.on_report(&report("7", ExecType::CancelReject)).unwrap();
        it.on_report(&report("8", ExecType::Other)).unwrap();

        assert_eq!(it.orders.len(), 1);
        assert_eq!(it.counters.cancelled(), 0);
        assert_eq!(it.trades.len(), 0);
    }

    #[test]
    fn ack_without_quantity_is_malformed() {
        let it = interp();
        let err = it.on_report(&report("1", ExecType::New)).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "order_qty", .. }));
        assert!(it.orders.is_empty());
        assert_eq!(it.counters.confirmed(), 0);
    }
}
