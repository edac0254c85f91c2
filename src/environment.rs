//! Browser event sources for the animation-state resolver.
//!
//! Listens to `prefers-reduced-motion` and document visibility, and keeps
//! `data-reduced-motion` on `<html>` in step with the resolver. Every
//! listener and subscription is held by a [`ResourceTracker`], so dropping
//! the binding detaches all of them.

use gloo_events::EventListener;
use gloo_utils::{document, document_element, window};
use log::{debug, warn};
use web_sys::{Document, MediaQueryList, VisibilityState};

use crate::config::{REDUCED_MOTION_ATTR, REDUCED_MOTION_QUERY};
use crate::motion::AnimationStateResolver;
use crate::resources::{ResourceKind, ResourceTracker};

pub struct EnvironmentBinding {
    tracker: ResourceTracker,
}

impl EnvironmentBinding {
    /// Seed `resolver` with the current environment and start listening.
    pub fn install(resolver: &AnimationStateResolver) -> Self {
        let tracker = ResourceTracker::new();

        match reduced_motion_query() {
            Some(query) => {
                resolver.set_reduced_motion(query.matches());
                let resolver = resolver.clone();
                let source = query.clone();
                let listener = EventListener::new(&query, "change", move |_| {
                    resolver.set_reduced_motion(source.matches());
                });
                tracker.track(ResourceKind::Listener, listener);
            }
            None => {
                warn!("matchMedia unavailable, assuming no reduced-motion preference");
                resolver.set_reduced_motion(false);
            }
        }

        let doc = document();
        resolver.set_visible(is_visible(&doc));
        {
            let resolver = resolver.clone();
            let source = doc.clone();
            let listener = EventListener::new(&doc, "visibilitychange", move |_| {
                let visible = is_visible(&source);
                debug!("Document visibility changed: visible={}", visible);
                resolver.set_visible(visible);
            });
            tracker.track(ResourceKind::Listener, listener);
        }

        write_reduced_motion_attr(resolver.current().prefers_reduced_motion);
        let subscription =
            resolver.subscribe(|context| write_reduced_motion_attr(context.prefers_reduced_motion));
        tracker.track(ResourceKind::Subscription, subscription);

        Self { tracker }
    }

    /// Listeners and subscriptions currently held.
    pub fn live_handles(&self) -> usize {
        self.tracker.len()
    }
}

fn reduced_motion_query() -> Option<MediaQueryList> {
    window().match_media(REDUCED_MOTION_QUERY).ok().flatten()
}

fn is_visible(doc: &Document) -> bool {
    doc.visibility_state() != VisibilityState::Hidden
}

fn write_reduced_motion_attr(reduced: bool) {
    let value = if reduced { "true" } else { "false" };
    if let Err(e) = document_element().set_attribute(REDUCED_MOTION_ATTR, value) {
        warn!("Could not set {}: {:?}", REDUCED_MOTION_ATTR, e);
    }
}

/// Current viewport size in CSS pixels.
pub fn viewport_size() -> (f64, f64) {
    let win = window();
    let width = win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let height = win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    (width, height)
}
