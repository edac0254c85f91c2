//! Thread-local telemetry for the running countdown.
//!
//! The store survives component re-renders and is fed by
//! [`TelemetryMonitor`], which the app injects into the orchestrator. Browser
//! tests and the console read it through `countdownDiagnostics()`.
//!
//! # Snapshot fields
//! - `theme`: theme currently mounted, if any
//! - `phase`: orchestrator phase
//! - `remainingTotal`: seconds left at the last tick
//! - `totalElements` / `animatedElements`: renderer element counts
//! - `mounts` / `destroys` / `failures`: renderer lifecycle counters

use log::{info, warn};
use serde::Serialize;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

use crate::motion::AnimationStateContext;
use crate::orchestrator::{LifecycleMonitor, Phase, Tick};
use crate::renderer::RendererError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub theme: Option<String>,
    pub phase: Phase,
    pub should_animate: bool,
    pub prefers_reduced_motion: bool,
    pub remaining_total: u64,
    pub total_elements: usize,
    pub animated_elements: usize,
    pub mounts: u32,
    pub destroys: u32,
    pub failures: u32,
    pub last_error: Option<String>,
}

thread_local! {
    /// Latest lifecycle counters and tick values, read by `countdownDiagnostics()`.
    pub static DIAGNOSTICS: RefCell<DiagnosticsSnapshot> =
        RefCell::new(DiagnosticsSnapshot::default());
}

pub fn snapshot() -> DiagnosticsSnapshot {
    DIAGNOSTICS.with(|d| d.borrow().clone())
}

pub fn reset() {
    DIAGNOSTICS.with(|d| *d.borrow_mut() = DiagnosticsSnapshot::default());
}

fn update(edit: impl FnOnce(&mut DiagnosticsSnapshot)) {
    DIAGNOSTICS.with(|d| edit(&mut d.borrow_mut()));
}

/// Logs lifecycle events and mirrors them into [`DIAGNOSTICS`].
pub struct TelemetryMonitor;

impl LifecycleMonitor for TelemetryMonitor {
    fn renderer_mounted(&self, theme: &str) {
        update(|d| {
            d.theme = Some(theme.to_string());
            d.mounts += 1;
        });
    }

    fn renderer_destroyed(&self, theme: &str) {
        update(|d| {
            if d.theme.as_deref() == Some(theme) {
                d.theme = None;
            }
            d.destroys += 1;
            d.total_elements = 0;
            d.animated_elements = 0;
        });
    }

    fn renderer_failed(&self, theme: &str, error: &RendererError) {
        warn!("Theme '{}' degraded to a blank background", theme);
        update(|d| {
            d.failures += 1;
            d.last_error = Some(format!("{}: {}", theme, error));
        });
    }

    fn phase_changed(&self, phase: Phase) {
        info!("Countdown phase: {}", phase.as_str());
        update(|d| d.phase = phase);
    }

    fn ticked(&self, tick: &Tick, context: &AnimationStateContext) {
        update(|d| {
            d.phase = tick.phase;
            d.remaining_total = tick.remaining.total;
            d.total_elements = tick.elements.total;
            d.animated_elements = tick.elements.animated;
            d.should_animate = context.should_animate;
            d.prefers_reduced_motion = context.prefers_reduced_motion;
        });
    }
}

/// Current diagnostics as a plain JS object.
#[wasm_bindgen(js_name = countdownDiagnostics)]
pub fn countdown_diagnostics() -> JsValue {
    serde_wasm_bindgen::to_value(&snapshot()).unwrap_or(JsValue::NULL)
}
