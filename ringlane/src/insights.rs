//! Insights - Observability for ringlane.
//!
//! Tracing hooks for construction, backpressure and CAS contention. Zero-cost
//! when disabled; the successful hand-off path never calls into here.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! ringlane = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Tracy profiler
//! ```toml
//! ringlane = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! ringlane::init_tracy();
//! ```

/// Initialize Tracy profiler (call once at startup)
#[cfg(feature = "tracy")]
pub fn init_tracy() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    )
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() -> Result<(), std::convert::Infallible> {
    Ok(())
}

/// Record ring construction
#[cfg(feature = "tracing")]
#[inline]
pub fn record_created(kind: &'static str, capacity: usize) {
    tracing::debug!(kind, capacity, "ring buffer created");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_created(_kind: &'static str, _capacity: usize) {}

/// Record backpressure (write rejected, buffer full)
#[cfg(feature = "tracing")]
#[inline]
pub fn record_full() {
    let _span = tracing::trace_span!("full").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_full() {}

/// Record an empty poll
#[cfg(feature = "tracing")]
#[inline]
pub fn record_empty() {
    let _span = tracing::trace_span!("empty").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_empty() {}

/// Record an MPSC claim that needed more than one CAS
#[cfg(feature = "tracing")]
#[inline]
pub fn record_contention(attempts: u32) {
    tracing::trace!(attempts, "contended claim");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_contention(_attempts: u32) {}

/// Record a producer yielding after exhausting its spin budget
#[cfg(feature = "tracing")]
#[inline]
pub fn record_yield(attempts: u32) {
    tracing::debug!(attempts, "spin limit reached, yielding");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_yield(_attempts: u32) {}
