//! Resolves a single "should animate" decision from reduced-motion, tab
//! visibility and explicit pause, and notifies subscribers when it changes.

use log::debug;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::resources::Revocable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PauseReason {
    ReducedMotion,
    Hidden,
    Paused,
}

impl PauseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseReason::ReducedMotion => "reduced-motion",
            PauseReason::Hidden => "hidden",
            PauseReason::Paused => "paused",
        }
    }
}

/// Raw inputs, each updated independently by its own event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionInputs {
    pub prefers_reduced_motion: bool,
    pub visible: bool,
    pub paused: bool,
}

impl Default for MotionInputs {
    fn default() -> Self {
        Self {
            prefers_reduced_motion: false,
            visible: true,
            paused: false,
        }
    }
}

/// Read-only snapshot handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationStateContext {
    pub should_animate: bool,
    pub prefers_reduced_motion: bool,
    pub reason: Option<PauseReason>,
}

impl AnimationStateContext {
    pub fn resolve(inputs: MotionInputs) -> Self {
        let reason = if inputs.prefers_reduced_motion {
            Some(PauseReason::ReducedMotion)
        } else if !inputs.visible {
            Some(PauseReason::Hidden)
        } else if inputs.paused {
            Some(PauseReason::Paused)
        } else {
            None
        };
        Self {
            should_animate: reason.is_none(),
            prefers_reduced_motion: inputs.prefers_reduced_motion,
            reason,
        }
    }

    fn same_decision(&self, other: &Self) -> bool {
        self.should_animate == other.should_animate
            && self.prefers_reduced_motion == other.prefers_reduced_motion
    }
}

impl Default for AnimationStateContext {
    fn default() -> Self {
        Self::resolve(MotionInputs::default())
    }
}

type Listener = Rc<dyn Fn(&AnimationStateContext)>;

struct ResolverInner {
    inputs: Cell<MotionInputs>,
    snapshot: RefCell<AnimationStateContext>,
    subscribers: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
    generation: Cell<u64>,
}

/// Shared handle; clones observe and drive the same state.
#[derive(Clone)]
pub struct AnimationStateResolver {
    inner: Rc<ResolverInner>,
}

impl AnimationStateResolver {
    pub fn new(inputs: MotionInputs) -> Self {
        Self {
            inner: Rc::new(ResolverInner {
                inputs: Cell::new(inputs),
                snapshot: RefCell::new(AnimationStateContext::resolve(inputs)),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                generation: Cell::new(0),
            }),
        }
    }

    pub fn current(&self) -> AnimationStateContext {
        self.inner.snapshot.borrow().clone()
    }

    pub fn inputs(&self) -> MotionInputs {
        self.inner.inputs.get()
    }

    pub fn set_reduced_motion(&self, prefers_reduced_motion: bool) {
        self.update(|inputs| inputs.prefers_reduced_motion = prefers_reduced_motion);
    }

    pub fn set_visible(&self, visible: bool) {
        self.update(|inputs| inputs.visible = visible);
    }

    pub fn set_paused(&self, paused: bool) {
        self.update(|inputs| inputs.paused = paused);
    }

    /// Register `listener` for future changes. Dropping the returned
    /// [`Subscription`] unsubscribes.
    #[must_use]
    pub fn subscribe(&self, listener: impl Fn(&AnimationStateContext) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            resolver: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    fn update(&self, edit: impl FnOnce(&mut MotionInputs)) {
        let mut inputs = self.inner.inputs.get();
        edit(&mut inputs);
        self.inner.inputs.set(inputs);

        let next = AnimationStateContext::resolve(inputs);
        let previous = self.inner.snapshot.replace(next.clone());
        if previous.same_decision(&next) {
            return;
        }
        debug!(
            "Animation state changed: should_animate={} reduced_motion={} reason={:?}",
            next.should_animate, next.prefers_reduced_motion, next.reason
        );
        self.notify(&next);
    }

    fn notify(&self, context: &AnimationStateContext) {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        let listeners: Vec<Listener> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            // A listener changed an input; the newer notification already
            // reached everyone, so this stale one stops here.
            if self.inner.generation.get() != generation {
                break;
            }
            listener(context);
        }
    }
}

impl Default for AnimationStateResolver {
    fn default() -> Self {
        Self::new(MotionInputs::default())
    }
}

/// Disposer returned by [`AnimationStateResolver::subscribe`].
#[must_use]
pub struct Subscription {
    resolver: Weak<ResolverInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.resolver.upgrade() {
            inner
                .subscribers
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl Revocable for Subscription {
    fn revoke(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        resolver: &AnimationStateResolver,
    ) -> (Rc<RefCell<Vec<AnimationStateContext>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = resolver.subscribe(move |ctx| sink.borrow_mut().push(ctx.clone()));
        (seen, subscription)
    }

    #[test]
    fn reduced_motion_toggle_notifies_twice() {
        let resolver = AnimationStateResolver::default();
        let (seen, _sub) = recorder(&resolver);

        resolver.set_reduced_motion(false);
        resolver.set_reduced_motion(true);
        resolver.set_reduced_motion(true);
        resolver.set_reduced_motion(false);
        resolver.set_reduced_motion(false);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].should_animate);
        assert!(seen[0].prefers_reduced_motion);
        assert_eq!(seen[0].reason, Some(PauseReason::ReducedMotion));
        assert!(seen[1].should_animate);
        assert!(!seen[1].prefers_reduced_motion);
    }

    #[test]
    fn overlapping_inputs_only_notify_on_decision_change() {
        let resolver = AnimationStateResolver::default();
        let (seen, _sub) = recorder(&resolver);

        resolver.set_visible(false);
        resolver.set_paused(true);
        resolver.set_visible(true);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(resolver.current().reason, Some(PauseReason::Paused));

        resolver.set_paused(false);
        assert_eq!(seen.borrow().len(), 2);
        assert!(resolver.current().should_animate);
    }

    #[test]
    fn reduced_motion_change_while_hidden_still_notifies() {
        let resolver = AnimationStateResolver::default();
        resolver.set_visible(false);
        let (seen, _sub) = recorder(&resolver);

        resolver.set_reduced_motion(true);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].should_animate);
        assert!(seen[0].prefers_reduced_motion);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let resolver = AnimationStateResolver::default();
        let (seen, sub) = recorder(&resolver);
        assert_eq!(resolver.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(resolver.subscriber_count(), 0);

        resolver.set_paused(true);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn nested_changes_leave_everyone_on_the_latest_state() {
        let resolver = AnimationStateResolver::default();
        let driver = resolver.clone();
        let _pauser = resolver.subscribe(move |ctx| {
            if ctx.reason == Some(PauseReason::Hidden) {
                driver.set_reduced_motion(true);
            }
        });
        let (seen, _sub) = recorder(&resolver);

        resolver.set_visible(false);
        let seen = seen.borrow();
        assert_eq!(seen.last().map(|ctx| ctx.prefers_reduced_motion), Some(true));
        assert!(seen.iter().all(|ctx| ctx.prefers_reduced_motion));
    }

    #[test]
    fn initial_snapshot_reflects_inputs() {
        let resolver = AnimationStateResolver::new(MotionInputs {
            prefers_reduced_motion: true,
            ..MotionInputs::default()
        });
        assert!(!resolver.current().should_animate);
        assert_eq!(AnimationStateContext::default().reason, None);
    }
}
