//! Scenario tests for the delivery queue.
//!
//! - `harness.rs`     - Recording sink with scripted behaviors, fast configs
//! - `retry_flow.rs`  - Failed attempts requeue, back off, then drop
//! - `readiness.rs`   - Not-yet-eligible envelopes cycle through the tail
//! - `backpressure.rs`- A saturated pool blocks submission instead of dropping
//! - `shutdown.rs`    - Closing the store stops the loop and wakes blockers

mod readiness;
mod shutdown;
