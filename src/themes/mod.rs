//! Built-in web themes and the shared plumbing they are built from.
//!
//! Each theme owns a [`ThemeStage`] (lifecycle guard and tracker)
//! and drives its animation through a [`FrameLoop`]. Visual detail is kept
//! deliberately small; the point of these renderers is the lifecycle.

use gloo_render::request_animation_frame;
use gloo_utils::document;
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use web_sys::Element;

use crate::config::{ACTIVE_COUNT_ATTR, DEFAULT_THEME};
use crate::renderer::{ElementCount, RendererError, RendererLifecycle, ThemeRegistry};
use crate::resources::{Disposer, ResourceKind, ResourceTracker, Revocable};

pub mod contribution_graph;
pub mod fireworks;
mod sparkle;
pub mod starfield;

use contribution_graph::ContributionGraph;
use fireworks::Fireworks;
use starfield::Starfield;

/// Registry of every theme shipped with the app.
pub fn registry() -> ThemeRegistry<Element> {
    ThemeRegistry::new(DEFAULT_THEME)
        .register(
            contribution_graph::ID,
            "Contribution Graph",
            "Countdown Team",
            || Box::new(ContributionGraph::new()),
        )
        .register(fireworks::ID, "Fireworks", "Countdown Team", || {
            Box::new(Fireworks::new())
        })
        .register(starfield::ID, "Starfield", "Countdown Team", || {
            Box::new(Starfield::new())
        })
}

/// Lifecycle guard and resource tracker shared by every web theme.
pub(crate) struct ThemeStage {
    id: &'static str,
    lifecycle: RendererLifecycle,
    tracker: Rc<ResourceTracker>,
}

impl ThemeStage {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            lifecycle: RendererLifecycle::new(),
            tracker: Rc::new(ResourceTracker::new()),
        }
    }

    /// Create the theme's root `tag` inside `container`.
    ///
    /// The node's removal is tracked as soon as it is attached, so a later
    /// failure in the theme's own mount still gets cleaned up by `destroy`.
    pub fn mount(&mut self, container: &Element, tag: &str) -> Result<Element, RendererError> {
        self.lifecycle.begin_mount()?;

        let root = document().create_element(tag)?;
        root.set_class_name(&format!("theme theme--{}", self.id));
        root.set_attribute("data-testid", &format!("theme-{}", self.id))?;
        root.set_attribute(ACTIVE_COUNT_ATTR, "0")?;
        container.append_child(&root)?;

        let node = root.clone();
        self.tracker
            .track(ResourceKind::Node, Disposer::new(move || node.remove()));
        Ok(root)
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    pub fn tracker(&self) -> &Rc<ResourceTracker> {
        &self.tracker
    }

    /// Returns `false` if the stage was already destroyed.
    pub fn destroy(&mut self) -> bool {
        if !self.lifecycle.begin_destroy() {
            return false;
        }
        self.tracker.release_all();
        true
    }
}

/// Mirror the animated count onto the theme root's status attribute.
pub(crate) fn publish_count(root: &Element, count: ElementCount) {
    // Status only; failure leaves the previous value in place.
    let _ = root.set_attribute(ACTIVE_COUNT_ATTR, &count.animated.to_string());
}

type Step = Rc<RefCell<dyn FnMut(f64) -> bool>>;

/// Requests one frame callback and returns the handle that cancels it.
pub(crate) type FrameScheduler = Rc<dyn Fn(Box<dyn FnOnce(f64)>) -> Box<dyn Revocable>>;

fn browser_frames() -> FrameScheduler {
    Rc::new(|callback: Box<dyn FnOnce(f64)>| -> Box<dyn Revocable> {
        Box::new(request_animation_frame(callback))
    })
}

/// One animation frame in flight at a time, tracked by the owner's tracker.
pub(crate) struct FrameLoop {
    tracker: Weak<ResourceTracker>,
    running: Rc<Cell<bool>>,
    step: Step,
    schedule: FrameScheduler,
}

impl FrameLoop {
    /// `step` receives the frame timestamp and returns whether to continue.
    pub fn new(tracker: &Rc<ResourceTracker>, step: impl FnMut(f64) -> bool + 'static) -> Self {
        Self::with_scheduler(tracker, browser_frames(), step)
    }

    pub fn with_scheduler(
        tracker: &Rc<ResourceTracker>,
        schedule: FrameScheduler,
        step: impl FnMut(f64) -> bool + 'static,
    ) -> Self {
        Self {
            tracker: Rc::downgrade(tracker),
            running: Rc::new(Cell::new(false)),
            step: Rc::new(RefCell::new(step)),
            schedule,
        }
    }

    pub fn start(&self) {
        if self.running.replace(true) {
            return;
        }
        self.request();
    }

    /// Cancels the in-flight frame, not just future ones.
    pub fn stop(&self) {
        self.running.set(false);
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.release_kind(ResourceKind::AnimationFrame);
        }
    }

    fn request(&self) {
        request(FrameLoop {
            tracker: self.tracker.clone(),
            running: self.running.clone(),
            step: self.step.clone(),
            schedule: self.schedule.clone(),
        });
    }
}

fn request(frames: FrameLoop) {
    let Some(owner) = frames.tracker.upgrade() else {
        frames.running.set(false);
        return;
    };
    let schedule = frames.schedule.clone();
    let handle = schedule(Box::new(move |timestamp| {
        // This frame has fired; drop its handle before scheduling the next.
        if let Some(owner) = frames.tracker.upgrade() {
            owner.release_kind(ResourceKind::AnimationFrame);
        }
        if !frames.running.get() {
            return;
        }
        let keep_going = (&mut *frames.step.borrow_mut())(timestamp);
        if keep_going && frames.running.get() {
            frames.request();
        } else {
            frames.running.set(false);
        }
    }));
    owner.track(ResourceKind::AnimationFrame, handle);
}

/// Short-lived highlights over a pool of indexed elements (lit cells,
/// twinkling stars). Pure bookkeeping; the caller applies the classes.
#[derive(Debug)]
pub(crate) struct Highlights {
    active: Vec<(usize, f64)>,
    last_spawn: Option<f64>,
    spawn_every_ms: f64,
    lifetime_ms: f64,
    max_active: usize,
}

impl Highlights {
    pub fn new(spawn_every_ms: f64, lifetime_ms: f64, max_active: usize) -> Self {
        Self {
            active: Vec::new(),
            last_spawn: None,
            spawn_every_ms,
            lifetime_ms,
            max_active,
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Indices whose lifetime ended at or before `now`.
    pub fn expire(&mut self, now: f64) -> Vec<usize> {
        let mut expired = Vec::new();
        self.active.retain(|&(index, until)| {
            if until <= now {
                expired.push(index);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Start a new highlight if one is due, returning its index.
    pub fn spawn(&mut self, now: f64, pool: usize, rng: &mut impl Rng) -> Option<usize> {
        if pool == 0 || self.active.len() >= self.max_active.min(pool) {
            return None;
        }
        if let Some(last) = self.last_spawn {
            if now - last < self.spawn_every_ms {
                return None;
            }
        }
        self.last_spawn = Some(now);
        for _ in 0..8 {
            let index = rng.random_range(0..pool);
            if !self.active.iter().any(|&(i, _)| i == index) {
                self.active.push((index, now + self.lifetime_ms));
                return Some(index);
            }
        }
        None
    }

    /// Forget every highlight, returning the indices to reset.
    pub fn drain(&mut self) -> Vec<usize> {
        self.last_spawn = None;
        self.active.drain(..).map(|(index, _)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type Pending = Rc<RefCell<Vec<(Rc<Cell<bool>>, Box<dyn FnOnce(f64)>)>>>;

    /// Frames queue up here until the test fires them.
    fn manual_frames() -> (FrameScheduler, Pending) {
        let pending: Pending = Rc::new(RefCell::new(Vec::new()));
        let queue = pending.clone();
        let schedule: FrameScheduler =
            Rc::new(move |callback: Box<dyn FnOnce(f64)>| -> Box<dyn Revocable> {
                let live = Rc::new(Cell::new(true));
                queue.borrow_mut().push((live.clone(), callback));
                Box::new(Disposer::new(move || live.set(false)))
            });
        (schedule, pending)
    }

    /// Run every queued frame that was not cancelled. Returns how many ran.
    fn fire(pending: &Pending, timestamp: f64) -> usize {
        let due = std::mem::take(&mut *pending.borrow_mut());
        let mut ran = 0;
        for (live, callback) in due {
            if live.get() {
                callback(timestamp);
                ran += 1;
            }
        }
        ran
    }

    fn counting(steps: &Rc<Cell<usize>>) -> impl FnMut(f64) -> bool {
        let steps = steps.clone();
        move |_| {
            steps.set(steps.get() + 1);
            true
        }
    }

    #[test]
    fn frame_loop_keeps_one_frame_in_flight() {
        let tracker = Rc::new(ResourceTracker::new());
        let (schedule, pending) = manual_frames();
        let steps = Rc::new(Cell::new(0));
        let frames = FrameLoop::with_scheduler(&tracker, schedule, counting(&steps));

        frames.start();
        frames.start();
        assert_eq!(tracker.count(ResourceKind::AnimationFrame), 1);
        for frame in 1..=5 {
            assert_eq!(fire(&pending, f64::from(frame) * 16.0), 1);
            assert_eq!(tracker.count(ResourceKind::AnimationFrame), 1);
        }
        assert_eq!(steps.get(), 5);
    }

    #[test]
    fn stop_cancels_the_frame_in_flight() {
        let tracker = Rc::new(ResourceTracker::new());
        let (schedule, pending) = manual_frames();
        let steps = Rc::new(Cell::new(0));
        let frames = FrameLoop::with_scheduler(&tracker, schedule, counting(&steps));

        frames.start();
        fire(&pending, 16.0);
        frames.stop();
        assert_eq!(tracker.count(ResourceKind::AnimationFrame), 0);
        assert_eq!(fire(&pending, 32.0), 0);
        assert_eq!(steps.get(), 1);

        frames.start();
        assert_eq!(tracker.count(ResourceKind::AnimationFrame), 1);
        assert_eq!(fire(&pending, 48.0), 1);
        assert_eq!(steps.get(), 2);
    }

    #[test]
    fn loop_ends_when_the_step_declines() {
        let tracker = Rc::new(ResourceTracker::new());
        let (schedule, pending) = manual_frames();
        let frames = FrameLoop::with_scheduler(&tracker, schedule, |_| false);

        frames.start();
        assert_eq!(fire(&pending, 16.0), 1);
        assert!(tracker.is_empty());
        assert!(pending.borrow().is_empty());

        // Not stuck in the running state.
        frames.start();
        assert_eq!(tracker.count(ResourceKind::AnimationFrame), 1);
    }

    #[test]
    fn stage_destroy_releases_everything_once() {
        let mut stage = ThemeStage::new("test");
        let removed = Rc::new(Cell::new(0));
        {
            let removed = removed.clone();
            stage.tracker().track(
                ResourceKind::Node,
                Disposer::new(move || removed.set(removed.get() + 1)),
            );
        }
        let (schedule, pending) = manual_frames();
        let steps = Rc::new(Cell::new(0));
        let frames = FrameLoop::with_scheduler(stage.tracker(), schedule, counting(&steps));
        frames.start();

        assert!(stage.destroy());
        assert_eq!(removed.get(), 1);
        assert!(stage.tracker().is_empty());
        assert_eq!(fire(&pending, 16.0), 0);

        assert!(!stage.destroy());
        assert_eq!(removed.get(), 1);
        assert!(!stage.is_live());
        assert_eq!(steps.get(), 0);
    }

    #[test]
    fn highlights_respect_cadence_and_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut highlights = Highlights::new(100.0, 1_000.0, 2);

        assert!(highlights.spawn(0.0, 10, &mut rng).is_some());
        assert!(highlights.spawn(50.0, 10, &mut rng).is_none());
        assert!(highlights.spawn(100.0, 10, &mut rng).is_some());
        assert!(highlights.spawn(200.0, 10, &mut rng).is_none());
        assert_eq!(highlights.len(), 2);
    }

    #[test]
    fn highlights_expire_and_drain() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut highlights = Highlights::new(0.0, 500.0, 5);
        let first = highlights.spawn(0.0, 50, &mut rng).unwrap();
        highlights.spawn(300.0, 50, &mut rng).unwrap();

        assert_eq!(highlights.expire(499.0), Vec::<usize>::new());
        assert_eq!(highlights.expire(500.0), vec![first]);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights.drain().len(), 1);
        assert_eq!(highlights.len(), 0);
    }

    #[test]
    fn highlights_never_repeat_an_index() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut highlights = Highlights::new(0.0, 10_000.0, 4);
        let mut seen = Vec::new();
        for step in 0..40 {
            if let Some(index) = highlights.spawn(step as f64, 4, &mut rng) {
                assert!(!seen.contains(&index));
                seen.push(index);
            }
        }
        assert!(seen.len() <= 4);
        assert!(highlights.spawn(100.0, 0, &mut rng).is_none());
    }
}
