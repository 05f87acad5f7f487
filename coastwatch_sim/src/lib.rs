//! Coastwatch Deterministic Scenario Harness
//!
//! This crate drives the verification engine through controlled
//! degradation scenarios, deterministically.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: a virtual clock; a layer timeout expires instantly
//! - **External layers**: scripted stubs (respond / error / hang)
//! - **Randomness**: report jitter derived from a single 64-bit seed
//!
//! Any failed assertion is reproducible from its seed number.
//!
//! # Usage
//!
//! ```ignore
//! use coastwatch_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42).with_reports(20);
//! let result = runner.run(ScenarioId::SignalBlackout).await;
//! assert!(result.passed);
//! ```

mod context;
mod runner;
mod stubs;
pub mod scenarios;

pub use context::SimContext;
pub use runner::{DecisionTally, ScenarioResult, ScenarioRunner};
pub use stubs::{StubBehavior, StubLayer};
