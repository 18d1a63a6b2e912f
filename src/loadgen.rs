// ===============================
// src/loadgen.rs (random order / cancellation harness)
// ===============================
//
// A client of the core, not part of it: both workers talk to the session
// boundary only, plus a read-only store snapshot for cancel candidates.
// Each runs as an independent task, paced by sleeps, bounded by a
// deadline; aborting one mid-loop cannot leave shared state torn because
// all mutation happens inside the store/ledger under their locks.
//
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::config::LoadCfg;
use crate::domain::{OrdType, Side};
use crate::orders::{Counters, OrderStore};
use crate::session::SessionHandle;
use crate::stats::round2;

const SIDES: [Side; 3] = [Side::Buy, Side::Sell, Side::SellShort];

/// Submit random orders until `order_count` orders are *confirmed* (the
/// original stop condition: counterparty acks, not submissions) or the
/// deadline passes.
pub async fn run_orders(session: Arc<SessionHandle>, counters: Arc<Counters>, cfg: LoadCfg) {
    let deadline = Instant::now() + Duration::from_secs(cfg.duration_secs);
    info!(order_count = cfg.order_count, duration_secs = cfg.duration_secs, "order generator started");

    while counters.confirmed() < cfg.order_count && Instant::now() < deadline {
        // draw everything before the await; ThreadRng must not cross it
        let (symbol, side, ord_type, quantity, price) = {
            let mut rng = rand::thread_rng();
            let symbol = cfg
                .symbols
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| "MSFT".into());
            let side = *SIDES.choose(&mut rng).unwrap();
            let ord_type = if rng.gen_bool(0.5) { OrdType::Market } else { OrdType::Limit };
            let quantity = rng.gen_range(1..=cfg.max_qty);
            let price = (ord_type == OrdType::Limit)
                .then(|| round2(rng.gen_range(cfg.px_min..cfg.px_max)));
            (symbol, side, ord_type, quantity, price)
        };

        if let Err(e) = session.submit_order(&symbol, side, ord_type, quantity, price).await {
            warn!(error = %e, "order submission rejected");
        }

        sleep(Duration::from_millis(cfg.order_pace_ms)).await;
    }

    info!(confirmed = counters.confirmed(), "order generator finished");
}

/// Cancel random active orders until the deadline passes.
pub async fn run_cancels(session: Arc<SessionHandle>, orders: Arc<OrderStore>, cfg: LoadCfg) {
    let deadline = Instant::now() + Duration::from_secs(cfg.duration_secs);
    info!(duration_secs = cfg.duration_secs, "cancel generator started");

    while Instant::now() < deadline {
        let pick = {
            let snap = orders.snapshot();
            let mut rng = rand::thread_rng();
            snap.choose(&mut rng).cloned()
        };

        if let Some((cl_ord_id, order)) = pick {
            if let Err(e) = session.cancel_order(&cl_ord_id, &order.symbol, order.side).await {
                warn!(error = %e, "cancel submission failed");
            }
        }

        sleep(Duration::from_millis(cfg.cancel_pace_ms)).await;
    }

    info!("cancel generator finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OutboundMsg};
    use tokio::sync::mpsc;

    fn cfg() -> LoadCfg {
        LoadCfg {
            symbols: vec!["MSFT".into()],
            order_count: 3,
            duration_secs: 5,
            order_pace_ms: 1,
            cancel_pace_ms: 1,
            max_qty: 100,
            px_min: 100.0,
            px_max: 200.0,
        }
    }

    #[tokio::test]
    async fn order_generator_stops_at_confirmed_count() {
        let (out_tx, mut out_rx) = mpsc::channel(64);
        let session = Arc::new(SessionHandle::new(out_tx, None));
        let counters = Arc::new(Counters::default());

        // confirm every submission immediately, as the counterparty would
        let counters_ack = counters.clone();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if matches!(msg, OutboundMsg::NewOrder(_)) {
                    counters_ack.inc_confirmed();
                }
            }
        });

        run_orders(session, counters.clone(), cfg()).await;
        assert!(counters.confirmed() >= 3);
    }

    #[tokio::test]
    async fn cancel_generator_only_targets_active_orders() {
        // roomy enough that the un-drained channel never backpressures
        let (out_tx, mut out_rx) = mpsc::channel(4096);
        let session = Arc::new(SessionHandle::new(out_tx, None));
        let orders = Arc::new(OrderStore::new());
        orders.insert_on_ack("live", Order::new("MSFT".into(), Side::Buy, 10, Some(150.0)));

        let mut short = cfg();
        short.duration_secs = 1;
        run_cancels(session, orders, short).await;

        while let Ok(msg) = out_rx.try_recv() {
            match msg {
                OutboundMsg::Cancel(c) => assert_eq!(c.orig_cl_ord_id, "live"),
                other => panic!("unexpected message: {other:?}"),
            }
        }
    }
}
