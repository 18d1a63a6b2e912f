// ===============================
// src/gateway.rs (mock counterparty: ack -> fills / resting -> cancel)
// ===============================
//
// Stands in for the FIX engine plus the exchange behind it so the whole
// pipeline runs without a live session. One task, one ordered report
// stream: per client order id the counterparty emits
// ack -> zero or more partial fills -> (full fill | cancelled).
//
use ahash::AHashMap;
use chrono::Utc;
use rand::Rng;
use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};
use tracing::{debug, info};

use crate::domain::{ExecReport, ExecType, NewOrderRequest, OutboundMsg};
use crate::stats::round2;

#[derive(Debug, Clone)]
pub struct GatewayCfg {
    pub fill_ms: u64,
    /// share of orders left resting (cancellable) instead of filling
    pub rest_prob: f64,
    /// share of filled orders executed as partial + completing fill
    pub partial_prob: f64,
    // execution price band for market orders
    pub px_min: f64,
    pub px_max: f64,
}

impl Default for GatewayCfg {
    fn default() -> Self {
        Self { fill_ms: 20, rest_prob: 0.3, partial_prob: 0.4, px_min: 100.0, px_max: 200.0 }
    }
}

fn now_ns() -> i128 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0) as i128
}

fn report_for(o: &NewOrderRequest, exec_type: ExecType) -> ExecReport {
    ExecReport {
        cl_ord_id: o.cl_ord_id.clone(),
        orig_cl_ord_id: None,
        symbol: o.symbol.clone(),
        side: o.side,
        exec_type,
        order_qty: None,
        price: None,
        last_px: None,
        last_qty: None,
        ts_ns: now_ns(),
    }
}

pub async fn run_mock(
    mut rx: mpsc::Receiver<OutboundMsg>,
    exec_tx: mpsc::Sender<ExecReport>,
    cfg: GatewayCfg,
) {
    info!(fill_ms = cfg.fill_ms, rest_prob = cfg.rest_prob, "mock counterparty started");
    let mut resting: AHashMap<String, NewOrderRequest> = AHashMap::new();

    while let Some(msg) = rx.recv().await {
        match msg {
            OutboundMsg::NewOrder(o) => {
                let mut ack = report_for(&o, ExecType::New);
                ack.order_qty = Some(o.quantity);
                ack.price = o.price; // absent for market orders
                let _ = exec_tx.send(ack).await;

                // decide the order's fate before the first await
                let (rest, partial, px) = {
                    let mut rng = rand::thread_rng();
                    let roll: f64 = rng.gen();
                    let px = o
                        .price
                        .unwrap_or_else(|| round2(rng.gen_range(cfg.px_min..cfg.px_max)));
                    (roll < cfg.rest_prob, roll < cfg.rest_prob + cfg.partial_prob, px)
                };

                if rest {
                    debug!(cl_ord_id = %o.cl_ord_id, "order resting");
                    resting.insert(o.cl_ord_id.clone(), o);
                    continue;
                }

                sleep(Duration::from_millis(cfg.fill_ms)).await;

                if partial && o.quantity > 1 {
                    let first = rand::thread_rng().gen_range(1..o.quantity);
                    let mut part = report_for(&o, ExecType::PartialFill);
                    part.last_px = Some(px);
                    part.last_qty = Some(first);
                    let _ = exec_tx.send(part).await;

                    sleep(Duration::from_millis(cfg.fill_ms)).await;

                    let mut full = report_for(&o, ExecType::Fill);
                    full.last_px = Some(px);
                    full.last_qty = Some(o.quantity - first);
                    let _ = exec_tx.send(full).await;
                } else {
                    let mut full = report_for(&o, ExecType::Fill);
                    full.last_px = Some(px);
                    full.last_qty = Some(o.quantity);
                    let _ = exec_tx.send(full).await;
                }
            }
            OutboundMsg::Cancel(c) => {
                let exec_type = if resting.remove(&c.orig_cl_ord_id).is_some() {
                    ExecType::Cancelled
                } else {
                    ExecType::CancelReject
                };
                let er = ExecReport {
                    cl_ord_id: c.cl_ord_id.clone(),
                    orig_cl_ord_id: Some(c.orig_cl_ord_id.clone()),
                    symbol: c.symbol.clone(),
                    side: c.side,
                    exec_type,
                    order_qty: None,
                    price: None,
                    last_px: None,
                    last_qty: None,
                    ts_ns: now_ns(),
                };
                let _ = exec_tx.send(er).await;
            }
        }
    }
    info!("mock counterparty stopped");
}
