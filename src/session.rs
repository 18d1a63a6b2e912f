// ===============================
// src/session.rs (outbound boundary to the FIX engine)
// ===============================
//
// The engine itself (logon, heartbeats, sequence numbers, encoding) is an
// external collaborator; this side only builds well-formed requests,
// assigns client order ids and hands them to the transport channel
// fire-and-forget. Nothing here waits on execution report processing.
//
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{CancelRequest, Event, NewOrderRequest, OrdType, OutboundMsg, Side};
use crate::metrics::{CANCELS_SENT, ORDERS_SENT};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("price must be set for limit orders")]
    MissingLimitPrice,
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("transport channel closed")]
    ChannelClosed,
}

pub struct SessionHandle {
    out_tx: mpsc::Sender<OutboundMsg>,
    rec_tx: Option<mpsc::Sender<Event>>,
    next_id: AtomicU64,
}

impl SessionHandle {
    pub fn new(out_tx: mpsc::Sender<OutboundMsg>, rec_tx: Option<mpsc::Sender<Event>>) -> Self {
        Self { out_tx, rec_tx, next_id: AtomicU64::new(0) }
    }

    // Monotonic counter + epoch millis keeps ids unique across restarts
    // of the counterparty within one session.
    fn next_cl_ord_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}", n, chrono::Utc::now().timestamp_millis())
    }

    /// Validate and submit a new order. Precondition violations are
    /// surfaced before any transmission attempt.
    pub async fn submit_order(
        &self,
        symbol: &str,
        side: Side,
        ord_type: OrdType,
        quantity: i64,
        price: Option<f64>,
    ) -> Result<String, SubmitError> {
        if quantity <= 0 {
            return Err(SubmitError::InvalidQuantity(quantity));
        }
        if ord_type == OrdType::Limit && price.is_none() {
            return Err(SubmitError::MissingLimitPrice);
        }

        let cl_ord_id = self.next_cl_ord_id();
        let req = NewOrderRequest {
            cl_ord_id: cl_ord_id.clone(),
            symbol: symbol.to_string(),
            side,
            ord_type,
            quantity,
            // market orders carry no price on the wire
            price: price.filter(|_| ord_type == OrdType::Limit),
        };

        if let Some(tx) = &self.rec_tx {
            let _ = tx.try_send(Event::Out(OutboundMsg::NewOrder(req.clone())));
        }
        self.out_tx
            .send(OutboundMsg::NewOrder(req))
            .await
            .map_err(|_| SubmitError::ChannelClosed)?;
        ORDERS_SENT.inc();
        Ok(cl_ord_id)
    }

    /// Request cancellation of a previously submitted order.
    pub async fn cancel_order(
        &self,
        orig_cl_ord_id: &str,
        symbol: &str,
        side: Side,
    ) -> Result<String, SubmitError> {
        let cl_ord_id = self.next_cl_ord_id();
        let req = CancelRequest {
            orig_cl_ord_id: orig_cl_ord_id.to_string(),
            cl_ord_id: cl_ord_id.clone(),
            symbol: symbol.to_string(),
            side,
        };

        if let Some(tx) = &self.rec_tx {
            let _ = tx.try_send(Event::Out(OutboundMsg::Cancel(req.clone())));
        }
        self.out_tx
            .send(OutboundMsg::Cancel(req))
            .await
            .map_err(|_| SubmitError::ChannelClosed)?;
        CANCELS_SENT.inc();
        Ok(cl_ord_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (SessionHandle, mpsc::Receiver<OutboundMsg>) {
        let (tx, rx) = mpsc::channel(16);
        (SessionHandle::new(tx, None), rx)
    }

    #[tokio::test]
    async fn limit_order_without_price_rejected_before_transmission() {
        let (s, mut rx) = session();
        let err = s
            .submit_order("MSFT", Side::Buy, OrdType::Limit, 10, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::MissingLimitPrice));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_positive_quantity_rejected() {
        let (s, mut rx) = session();
        let err = s
            .submit_order("MSFT", Side::Buy, OrdType::Market, 0, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::InvalidQuantity(0)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn market_order_drops_price_from_wire() {
        let (s, mut rx) = session();
        s.submit_order("MSFT", Side::Buy, OrdType::Market, 10, Some(150.0))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            OutboundMsg::NewOrder(req) => {
                assert_eq!(req.ord_type, OrdType::Market);
                assert_eq!(req.price, None);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn submitted_orders_get_unique_ids() {
        let (s, mut rx) = session();
        let a = s
            .submit_order("MSFT", Side::Buy, OrdType::Limit, 10, Some(150.0))
            .await
            .unwrap();
        let b = s
            .submit_order("AAPL", Side::Sell, OrdType::Market, 5, None)
            .await
            .unwrap();
        assert_ne!(a, b);

        match rx.recv().await.unwrap() {
            OutboundMsg::NewOrder(req) => assert_eq!(req.cl_ord_id, a),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_carries_both_ids() {
        let (s, mut rx) = session();
        let new_id = s.cancel_order("42_100", "MSFT", Side::Buy).await.unwrap();

        match rx.recv().await.unwrap() {
            OutboundMsg::Cancel(req) => {
                assert_eq!(req.orig_cl_ord_id, "42_100");
                assert_eq!(req.cl_ord_id, new_id);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
