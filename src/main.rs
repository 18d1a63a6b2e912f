// ===============================
// src/main.rs
// ===============================
/*
=============================================================================
Project : fix_bot_rust — FIX trading client with async order tracking
Version : 0.5.0

Summary : Submits randomized orders and cancellations through a FIX-style
          session boundary, interprets the counterparty's execution
          reports into live order / position / trade state, and derives
          trading statistics (volume, PnL, VWAP). Session mechanics are a
          pluggable collaborator; a mock counterparty gateway stands in
          so the whole pipeline runs end-to-end. Exposes Prometheus
          metrics and records JSONL events.
=============================================================================
*/
mod config;
mod domain;
mod gateway;
mod interpreter;
mod loadgen;
mod metrics;
mod orders;
mod positions;
mod recorder;
mod session;
mod stats;

use std::sync::Arc;

use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};
use tracing::info;

use crate::domain::{Event, ExecReport, OutboundMsg};

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt().with_env_filter("info").init();

    // ---- Load config ----
    let (args, load_cfg) = config::load();

    // ---- Metrics ----
    metrics::init();
    tokio::spawn(metrics::serve_metrics(args.metrics_port));
    for s in &args.symbols {
        metrics::CONFIG_SYMBOL.with_label_values(&[s]).set(1);
    }

    info!(
        symbols = ?args.symbols,
        order_count = load_cfg.order_count,
        duration_secs = load_cfg.duration_secs,
        settle_secs = args.settle_secs,
        "startup config"
    );

    // ---- Buses ----
    // outbound requests -> counterparty; execution reports -> interpreter
    let (out_tx, out_rx) = mpsc::channel::<OutboundMsg>(2048);
    let (exec_tx, exec_rx) = mpsc::channel::<ExecReport>(4096);

    // ---- Recorder (optional) ----
    let (rec_tx, rec_rx) = mpsc::channel::<Event>(8192);
    let rec_tx = if let Some(path) = args.record_file.clone() {
        tokio::spawn(recorder::run(rec_rx, path));
        Some(rec_tx)
    } else {
        None
    };

    // ---- Shared books ----
    let orders = Arc::new(orders::OrderStore::new());
    let trades = Arc::new(orders::TradeLog::new());
    let positions = Arc::new(positions::PositionLedger::new());
    let counters = Arc::new(orders::Counters::default());

    // ---- Counterparty (mock FIX engine + exchange) ----
    tokio::spawn(gateway::run_mock(out_rx, exec_tx, gateway::GatewayCfg::default()));

    // ---- Execution report interpreter (single sequential consumer) ----
    let interp = interpreter::Interpreter::new(
        orders.clone(),
        positions.clone(),
        trades.clone(),
        counters.clone(),
        rec_tx.clone(),
    );
    tokio::spawn(interpreter::run(exec_rx, interp));

    // ---- Session boundary ----
    let session = Arc::new(session::SessionHandle::new(out_tx, rec_tx.clone()));

    // ---- Phase 1: random orders ----
    let gen = tokio::spawn(loadgen::run_orders(session.clone(), counters.clone(), load_cfg.clone()));
    let _ = gen.await;

    // let in-flight acks and fills drain
    sleep(Duration::from_secs(args.settle_secs)).await;
    stats::report(&trades.snapshot(), &counters, &orders.snapshot(), &positions.snapshot());

    // ---- Phase 2: random cancellations for whatever is still resting ----
    let can = tokio::spawn(loadgen::run_cancels(session.clone(), orders.clone(), load_cfg.clone()));
    let _ = can.await;

    sleep(Duration::from_secs(args.settle_secs)).await;
    stats::report(&trades.snapshot(), &counters, &orders.snapshot(), &positions.snapshot());

    info!("done");
}
