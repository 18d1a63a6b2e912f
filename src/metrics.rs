// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Outbound --------
pub static ORDERS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orders_sent_total", "new order requests handed to the transport").unwrap()
});

pub static CANCELS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("cancel_requests_sent_total", "cancel requests handed to the transport")
        .unwrap()
});

// -------- Confirmed transitions --------
pub static ORDERS_CONFIRMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orders_confirmed_total", "orders acknowledged by the counterparty").unwrap()
});

pub static ORDERS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orders_cancelled_total", "orders cancel-confirmed by the counterparty")
        .unwrap()
});

// -------- Report stream --------
pub static EXEC_REPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("exec_reports_total", "execution reports by execution type"),
        &["exec_type"],
    )
    .unwrap()
});

pub static REPORT_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("report_errors_total", "reports dropped by the interpreter, by kind"),
        &["kind"],
    )
    .unwrap()
});

pub static TRADES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("trades_total", "trade records per symbol"), &["symbol"]).unwrap()
});

// -------- Books --------
pub static ACTIVE_ORDERS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("active_orders", "orders currently tracked by the store").unwrap());

pub static POSITION_QTY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("position_net_qty", "net position per symbol"), &["symbol"])
        .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_SYMBOL: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("config_symbol", "configured symbols (label: symbol)"), &["symbol"])
        .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(ORDERS_SENT.clone())),
        REGISTRY.register(Box::new(CANCELS_SENT.clone())),
        REGISTRY.register(Box::new(ORDERS_CONFIRMED.clone())),
        REGISTRY.register(Box::new(ORDERS_CANCELLED.clone())),
        REGISTRY.register(Box::new(EXEC_REPORTS.clone())),
        REGISTRY.register(Box::new(REPORT_ERRORS.clone())),
        REGISTRY.register(Box::new(TRADES.clone())),
        REGISTRY.register(Box::new(ACTIVE_ORDERS.clone())),
        REGISTRY.register(Box::new(POSITION_QTY.clone())),
        REGISTRY.register(Box::new(CONFIG_SYMBOL.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics) — tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Run the metrics server in a dedicated OS thread (keeps Tokio runtime clean)
pub async fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = TcpListener::bind(&addr)
            .unwrap_or_else(|e| panic!("metrics bind {} failed: {}", addr, e));
        eprintln!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => eprintln!("metrics accept error: {}", e),
            }
        }
    });
}
