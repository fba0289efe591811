//! Observability and Metrics
//!
//! Counters for monitoring relay traffic and health.
//!
//! Uses atomic counters for thread-safe metrics collection; every connection
//! worker shares one [`Metrics`] through an `Arc`.

use crate::protocol::codes::ResponseCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for relay operations
#[derive(Debug)]
pub struct Metrics {
    /// Total connections accepted
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Requests framed and dispatched
    pub requests_total: AtomicU64,
    /// Connections closed because the request could not be framed
    pub decode_errors: AtomicU64,
    /// Users registered
    pub registrations: AtomicU64,
    /// Messages accepted into a mailbox
    pub messages_stored: AtomicU64,
    /// Responses carrying a failure code
    pub failed_requests: AtomicU64,
    /// Requests with an unrecognised code
    pub unknown_requests: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            messages_stored: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            unknown_requests: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection, returning how many are now open
    pub fn connection_established(&self) -> u64 {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a request that could not be framed
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched request and the code it was answered with
    pub fn request_handled(&self, request_bytes: u64, response_code: u16, response_bytes: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(request_bytes, Ordering::Relaxed);
        self.bytes_sent.fetch_add(response_bytes, Ordering::Relaxed);

        match ResponseCode::try_from(response_code) {
            Ok(ResponseCode::Registered) => {
                self.registrations.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ResponseCode::MessageAccepted) => {
                self.messages_stored.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ResponseCode::UnknownRequest) => {
                self.unknown_requests.fetch_add(1, Ordering::Relaxed);
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
            }
            Ok(code) if code.is_success() => {}
            _ => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            messages_stored: self.messages_stored.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            unknown_requests: self.unknown_requests.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            requests_total = snapshot.requests_total,
            decode_errors = snapshot.decode_errors,
            registrations = snapshot.registrations,
            messages_stored = snapshot.messages_stored,
            failed_requests = snapshot.failed_requests,
            unknown_requests = snapshot.unknown_requests,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            uptime_seconds = snapshot.uptime_seconds,
            "Relay metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub requests_total: u64,
    pub decode_errors: u64,
    pub registrations: u64,
    pub messages_stored: u64,
    pub failed_requests: u64,
    pub unknown_requests: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub uptime_seconds: u64,
}
