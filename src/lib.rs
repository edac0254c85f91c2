//! Themed countdown engine.
//!
//! The countdown clock, animation-state resolution, resource tracking and the
//! theme lifecycle state machine live here so they can be tested natively.
//! The Yew shell in `main.rs` only wires them to the page.

pub mod config;
pub mod countdown;
pub mod diagnostics;
pub mod environment;
pub mod motion;
pub mod orchestrator;
pub mod params;
pub mod renderer;
pub mod resources;
pub mod themes;
pub mod timezone;

pub use countdown::{compute_remaining, CountdownConfig, CountdownMode, TimeRemaining};
pub use orchestrator::{OrchestratorHandle, Phase};
pub use params::{ConfigError, CountdownParams};
