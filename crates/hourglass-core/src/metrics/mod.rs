//! Metric events.
//!
//! Components describe what happened as small event structs and hand them to
//! [`emit!`]. Each event records its counters and histograms through the
//! `metrics` facade, so nothing is recorded until the binary installs a
//! recorder.

pub mod events;

/// Macro for emitting metric events.
///
/// # Example
///
/// ```
/// use hourglass_core::emit;
/// use hourglass_core::metrics::events::DateMathResolved;
///
/// emit!(DateMathResolved { success: true });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
