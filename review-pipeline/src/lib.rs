//! MR review orchestration.
//!
//! 1) **Target selection** — filter opened MRs by review label, approval
//!    state, and target-branch exclusion rules
//! 2) **Admission** — at most one in-flight review per MR iid
//! 3) **Pipeline** — fetch diffs → build prompt → query the LLM → post the
//!    review comment → always apply the review label → record usage
//!
//! Two front ends feed the pipeline: the poll-loop scheduler (full sweep
//! over filtered MRs) and the webhook receiver (one MR per accepted
//! event). Both go through the same admission gate, so no MR is ever
//! reviewed by two executions at once within this process.
//!
//! Uses `tracing` for per-stage debug logging and enum-dispatch over the
//! thin provider clients; no async-trait, no `Box<dyn ...>`.

pub mod dedup;
pub mod filter;
pub mod pipeline;
pub mod prompt;
pub mod scheduler;
pub mod tokens;

pub use dedup::{ProcessingGuard, ProcessingState};
pub use pipeline::ReviewContext;
