//! Coastwatch Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the verification
//! engine to run in both **Production** (tokio) and **Simulation**
//! (virtual clock) environments.
//!
//! # Core Concept: The Reactor Pattern
//!
//! The engine races every external validation layer against a timeout.
//! For Deterministic Simulation Testing (DST), we intercept the sources
//! of non-determinism behind that race:
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Task scheduling (`spawn()`)
//!
//! A simulation context can expire a five-second timeout instantly, which
//! makes every degradation path (hung model, slow upstream) reproducible
//! from a seed number.
//!
//! # Example
//!
//! ```ignore
//! use coastwatch_env::{CoastwatchContext, TokioContext};
//!
//! async fn verify_loop<Ctx: CoastwatchContext>(ctx: &Ctx) {
//!     tokio::select! {
//!         result = evaluate_layer() => record(result),
//!         _ = ctx.sleep(Duration::from_secs(5)) => record_skipped(),
//!     }
//! }
//! ```

mod context;
mod tokio_impl;

pub use context::CoastwatchContext;
pub use tokio_impl::TokioContext;
