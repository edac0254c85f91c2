//! Registry of revocable resources owned by a single renderer.
//!
//! Every interval, animation frame, event listener and subscription a theme
//! creates goes through a [`ResourceTracker`], so tearing the theme down is one
//! `release_all` call. Handles are moved out of the registry before they are
//! revoked, which makes release safe to trigger from inside a tracked
//! callback and guarantees each handle is revoked at most once.

use gloo_events::EventListener;
use gloo_render::AnimationFrame;
use gloo_timers::callback::{Interval, Timeout};
use std::cell::RefCell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Interval,
    Timeout,
    AnimationFrame,
    Listener,
    Subscription,
    Node,
}

/// A handle that can be cancelled exactly once.
pub trait Revocable {
    fn revoke(self: Box<Self>);
}

/// Arbitrary cleanup closure, e.g. removing a DOM node.
pub struct Disposer(Box<dyn FnOnce()>);

impl Disposer {
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self(Box::new(dispose))
    }
}

impl Revocable for Disposer {
    fn revoke(self: Box<Self>) {
        (self.0)()
    }
}

impl Revocable for Interval {
    fn revoke(self: Box<Self>) {
        drop((*self).cancel());
    }
}

impl Revocable for Timeout {
    fn revoke(self: Box<Self>) {
        drop((*self).cancel());
    }
}

// Dropping these cancels the frame request / removes the listener.
impl Revocable for AnimationFrame {
    fn revoke(self: Box<Self>) {}
}

impl Revocable for EventListener {
    fn revoke(self: Box<Self>) {}
}

impl Revocable for Box<dyn Revocable> {
    fn revoke(self: Box<Self>) {
        <dyn Revocable as Revocable>::revoke(*self)
    }
}

type Entry = (ResourceKind, Box<dyn Revocable>);

#[derive(Default)]
pub struct ResourceTracker {
    entries: RefCell<Vec<Entry>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, kind: ResourceKind, handle: impl Revocable + 'static) {
        self.entries.borrow_mut().push((kind, Box::new(handle)));
    }

    /// Revoke every tracked handle and empty the registry. No-op when empty.
    pub fn release_all(&self) {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        revoke_each(drained);
    }

    /// Revoke only handles of `kind`, leaving the rest tracked.
    pub fn release_kind(&self, kind: ResourceKind) {
        let drained = {
            let mut entries = self.entries.borrow_mut();
            let (matching, kept): (Vec<Entry>, Vec<Entry>) =
                std::mem::take(&mut *entries)
                    .into_iter()
                    .partition(|(k, _)| *k == kind);
            *entries = kept;
            matching
        };
        revoke_each(drained);
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

fn revoke_each(entries: Vec<Entry>) {
    // The registry borrow is already released; handles may re-enter the tracker.
    for (_, handle) in entries {
        handle.revoke();
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ResourceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTracker")
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_disposer(counter: &Rc<Cell<u32>>) -> Disposer {
        let counter = counter.clone();
        Disposer::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn release_all_revokes_each_handle_once() {
        let tracker = ResourceTracker::new();
        let revoked = Rc::new(Cell::new(0));
        tracker.track(ResourceKind::Interval, counting_disposer(&revoked));
        tracker.track(ResourceKind::AnimationFrame, counting_disposer(&revoked));
        tracker.track(ResourceKind::Listener, counting_disposer(&revoked));

        tracker.release_all();
        assert_eq!(revoked.get(), 3);
        assert!(tracker.is_empty());

        tracker.release_all();
        assert_eq!(revoked.get(), 3);
    }

    #[test]
    fn release_on_empty_tracker_is_noop() {
        let tracker = ResourceTracker::new();
        tracker.release_all();
        tracker.release_kind(ResourceKind::Timeout);
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn release_from_inside_a_tracked_callback() {
        let tracker = Rc::new(ResourceTracker::new());
        let revoked = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&tracker);
        let inner = revoked.clone();
        tracker.track(
            ResourceKind::Timeout,
            Disposer::new(move || {
                inner.set(inner.get() + 1);
                // Teardown triggered from the resource's own dispose path.
                if let Some(tracker) = weak.upgrade() {
                    tracker.release_all();
                }
            }),
        );
        tracker.track(ResourceKind::Interval, counting_disposer(&revoked));

        tracker.release_all();
        assert_eq!(revoked.get(), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn tracking_resumes_after_release() {
        let tracker = ResourceTracker::new();
        let revoked = Rc::new(Cell::new(0));
        tracker.track(ResourceKind::Node, counting_disposer(&revoked));
        tracker.release_all();

        tracker.track(ResourceKind::Node, counting_disposer(&revoked));
        assert_eq!(tracker.count(ResourceKind::Node), 1);
        drop(tracker);
        assert_eq!(revoked.get(), 2);
    }

    #[test]
    fn release_kind_is_selective() {
        let tracker = ResourceTracker::new();
        let frames = Rc::new(Cell::new(0));
        let others = Rc::new(Cell::new(0));
        tracker.track(ResourceKind::AnimationFrame, counting_disposer(&frames));
        tracker.track(ResourceKind::AnimationFrame, counting_disposer(&frames));
        tracker.track(ResourceKind::Listener, counting_disposer(&others));

        tracker.release_kind(ResourceKind::AnimationFrame);
        assert_eq!(frames.get(), 2);
        assert_eq!(others.get(), 0);
        assert_eq!(tracker.count(ResourceKind::AnimationFrame), 0);
        assert_eq!(tracker.count(ResourceKind::Listener), 1);
    }

    #[test]
    fn handles_tracked_during_release_stay_live() {
        let tracker = Rc::new(ResourceTracker::new());
        let weak = Rc::downgrade(&tracker);
        tracker.track(
            ResourceKind::Timeout,
            Disposer::new(move || {
                if let Some(tracker) = weak.upgrade() {
                    tracker.track(ResourceKind::Node, Disposer::new(|| {}));
                }
            }),
        );
        tracker.release_all();
        assert_eq!(tracker.count(ResourceKind::Node), 1);
    }
}
