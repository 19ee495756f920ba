//! Trace propagation across the queue boundary (§4.6).
//!
//! There is no OpenTelemetry dependency anywhere in this stack, so trace identity is carried by
//! hand: a 128-bit `trace_id` and a 64-bit `span_id`, both lowercase hex, traveling inside the
//! task payload itself. `rand` (already a dependency for the teacher's own jittered retry logic)
//! mints fresh ids when a task has no parent to inherit from.

use crate::domain::tasks::TraceContext;
use rand::RngCore;
use std::time::Duration;
use tracing::Span;

/// Mint a fresh root trace identity.
pub fn mint() -> TraceContext {
    let mut rng = rand::rng();
    let trace_hi = rng.next_u64();
    let trace_lo = rng.next_u64();
    let span = rng.next_u64();
    TraceContext {
        trace_id: format!("{trace_hi:016x}{trace_lo:016x}"),
        span_id: format!("{span:016x}"),
    }
}

/// Mint a trace identity from the caller's ambient span, if one is active (§4.6 enqueue-side
/// minting). There is no OpenTelemetry layer in this stack to read a real trace/span id back out
/// of `Span::current()`, so a fresh identity is minted whenever a recording span is open; a
/// caller with no ambient span (a bare background task) gets `None` and the task travels with no
/// trace context.
pub fn context_from_current_span() -> Option<TraceContext> {
    Span::current().id().map(|_| mint())
}

/// Open the `task.process` span a dispatched handler executes within (§4.6). Carries the trace
/// identity (inherited, or freshly minted if the payload carried none — a malformed or legacy
/// producer), the task type, and the measured queue-wait.
pub fn open_task_span(
    task_type: &str,
    trace_context: Option<&TraceContext>,
    queue_wait: Duration,
    enqueued_at_nanos: i64,
) -> Span {
    let owned;
    let ctx = match trace_context {
        Some(ctx) => ctx,
        None => {
            owned = mint();
            &owned
        }
    };

    tracing::info_span!(
        "task.process",
        trace_id = %ctx.trace_id,
        span_id = %ctx.span_id,
        task_type = %task_type,
        queue_wait_secs = queue_wait.as_secs_f64(),
        enqueued_at = enqueued_at_nanos,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_produces_expected_hex_lengths() {
        let ctx = mint();
        assert_eq!(ctx.trace_id.len(), 32);
        assert_eq!(ctx.span_id.len(), 16);
        assert!(ctx.trace_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(ctx.span_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn mint_is_not_deterministic() {
        assert_ne!(mint().trace_id, mint().trace_id);
    }

    #[test]
    fn context_from_current_span_is_none_outside_a_span() {
        assert!(context_from_current_span().is_none());
    }

    #[test]
    fn context_from_current_span_mints_inside_a_span() {
        let _dispatch_guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let span = tracing::info_span!("test");
        let _enter = span.enter();
        assert!(context_from_current_span().is_some());
    }
}
