//! Countdown lifecycle state machine.
//!
//! The [`Orchestrator`] owns the countdown clock and at most one live theme
//! renderer. [`OrchestratorHandle`] shares it with browser callbacks and
//! subscribes to the [`AnimationStateResolver`] exactly once.
//!
//! # Ordering
//! A resolver change that arrives while the orchestrator is in the middle of
//! an operation (for example a theme switch whose `mount` causes a media
//! query to flip) is parked and applied as soon as that operation returns.
//! The renderer that is active at delivery time receives it, so a freshly
//! mounted theme always ends up with the latest animation state.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use crate::countdown::{compute_remaining, CelebrationState, CountdownConfig, TimeRemaining};
use crate::motion::{AnimationStateContext, AnimationStateResolver, Subscription};
use crate::renderer::{ElementCount, RendererError, ThemeRegistry, ThemeRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Celebrating,
    Celebrated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Celebrating => "celebrating",
            Phase::Celebrated => "celebrated",
        }
    }
}

/// Hooks for telemetry. Injected so tests can pass [`NullMonitor`].
pub trait LifecycleMonitor {
    fn renderer_mounted(&self, _theme: &str) {}
    fn renderer_destroyed(&self, _theme: &str) {}
    fn renderer_failed(&self, _theme: &str, _error: &RendererError) {}
    fn phase_changed(&self, _phase: Phase) {}
    fn ticked(&self, _tick: &Tick, _context: &AnimationStateContext) {}
}

pub struct NullMonitor;

impl LifecycleMonitor for NullMonitor {}

/// Result of one clock poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tick {
    pub remaining: TimeRemaining,
    pub phase: Phase,
    pub elements: ElementCount,
    /// True only on the tick that crossed zero.
    pub celebration_started: bool,
}

struct ActiveRenderer<C> {
    theme: &'static str,
    renderer: Box<dyn ThemeRenderer<C>>,
}

pub struct Orchestrator<C> {
    registry: Rc<ThemeRegistry<C>>,
    monitor: Rc<dyn LifecycleMonitor>,
    config: Option<CountdownConfig>,
    container: Option<C>,
    active: Option<ActiveRenderer<C>>,
    context: AnimationStateContext,
    celebration: Option<CelebrationState>,
    size: Option<(f64, f64)>,
}

impl<C> Orchestrator<C> {
    pub fn new(
        registry: Rc<ThemeRegistry<C>>,
        monitor: Rc<dyn LifecycleMonitor>,
        context: AnimationStateContext,
    ) -> Self {
        Self {
            registry,
            monitor,
            config: None,
            container: None,
            active: None,
            context,
            celebration: None,
            size: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.celebration {
            None => Phase::Idle,
            Some(CelebrationState::Counting) => Phase::Running,
            Some(CelebrationState::Celebrating { .. }) => Phase::Celebrating,
            Some(CelebrationState::Celebrated) => Phase::Celebrated,
        }
    }

    pub fn active_theme(&self) -> Option<&'static str> {
        self.active.as_ref().map(|active| active.theme)
    }

    pub fn context(&self) -> &AnimationStateContext {
        &self.context
    }

    pub fn element_count(&self) -> ElementCount {
        self.active
            .as_ref()
            .map(|active| active.renderer.element_count())
            .unwrap_or_default()
    }

    /// Begin counting down into `container`. Restarting tears down first.
    pub fn start(&mut self, config: CountdownConfig, container: C, now: DateTime<Utc>) -> Tick {
        if self.phase() != Phase::Idle {
            self.teardown();
        }
        let theme = self.registry.resolve_id(config.theme());
        self.config = Some(config.with_theme(theme));
        self.container = Some(container);
        self.celebration = Some(CelebrationState::Counting);
        self.monitor.phase_changed(Phase::Running);
        self.mount_theme(theme);
        self.tick(now)
    }

    /// Poll the clock and advance the celebration state.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        let (Some(config), Some(previous)) = (self.config.as_ref(), self.celebration) else {
            return Tick {
                remaining: TimeRemaining::ZERO,
                phase: Phase::Idle,
                elements: ElementCount::default(),
                celebration_started: false,
            };
        };

        let remaining = compute_remaining(config, now);
        let next = previous.advance(&remaining, now);
        self.celebration = Some(next);
        let celebration_started = previous == CelebrationState::Counting
            && matches!(next, CelebrationState::Celebrating { .. });

        let phase = self.phase();
        if previous.as_str() != next.as_str() {
            info!("Countdown {} → {}", previous.as_str(), next.as_str());
            self.monitor.phase_changed(phase);
        }

        let tick = Tick {
            remaining,
            phase,
            elements: self.element_count(),
            celebration_started,
        };
        self.monitor.ticked(&tick, &self.context);
        tick
    }

    /// Replace the active renderer: destroy, create, mount. Returns the
    /// theme that ended up selected, or `None` before `start`.
    pub fn switch_theme(&mut self, requested: &str) -> Option<&'static str> {
        let config = self.config.as_ref()?;
        let theme = self.registry.resolve_id(requested);
        if self.active_theme() == Some(theme) {
            return Some(theme);
        }
        self.config = Some(config.with_theme(theme));
        self.destroy_active();
        self.mount_theme(theme);
        Some(theme)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Some((width, height));
        if let Some(active) = self.active.as_mut() {
            active.renderer.set_size(width, height);
        }
    }

    /// Forward a resolver snapshot to whichever renderer is live right now.
    pub fn apply_animation_state(&mut self, context: AnimationStateContext) {
        self.context = context;
        if let Some(active) = self.active.as_mut() {
            debug!(
                "Forwarding should_animate={} to '{}'",
                self.context.should_animate, active.theme
            );
            active.renderer.on_animation_state_change(&self.context);
        }
    }

    /// Destroy the renderer and return to idle.
    pub fn teardown(&mut self) {
        self.destroy_active();
        self.config = None;
        self.container = None;
        if self.celebration.take().is_some() {
            self.monitor.phase_changed(Phase::Idle);
        }
    }

    fn mount_theme(&mut self, theme: &'static str) {
        let Some(container) = self.container.as_ref() else {
            return;
        };
        let Some(mut renderer) = self.registry.create(theme) else {
            warn!("Theme '{}' has no renderer", theme);
            return;
        };

        match renderer.mount(container, &self.context) {
            Ok(()) => {
                if let Some((width, height)) = self.size {
                    renderer.set_size(width, height);
                }
                info!("Mounted theme '{}'", theme);
                self.monitor.renderer_mounted(theme);
                self.active = Some(ActiveRenderer { theme, renderer });
            }
            Err(e) => {
                // Leave a blank background rather than a half-built theme.
                error!("Theme '{}' failed to mount: {}", theme, e);
                renderer.destroy();
                self.monitor.renderer_failed(theme, &e);
            }
        }
    }

    fn destroy_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.renderer.destroy();
            info!("Destroyed theme '{}'", active.theme);
            self.monitor.renderer_destroyed(active.theme);
        }
    }
}

impl<C> Drop for Orchestrator<C> {
    fn drop(&mut self) {
        self.destroy_active();
    }
}

struct Shared<C> {
    orchestrator: RefCell<Orchestrator<C>>,
    pending: RefCell<Option<AnimationStateContext>>,
    subscription: RefCell<Option<Subscription>>,
}

impl<C> Shared<C> {
    fn deliver(&self, context: AnimationStateContext) {
        match self.orchestrator.try_borrow_mut() {
            Ok(mut orchestrator) => orchestrator.apply_animation_state(context),
            Err(_) => {
                // Mid-operation; the latest parked snapshot wins.
                *self.pending.borrow_mut() = Some(context);
                return;
            }
        }
        self.drain_pending();
    }

    fn drain_pending(&self) {
        loop {
            let next = self.pending.borrow_mut().take();
            match next {
                Some(context) => self.orchestrator.borrow_mut().apply_animation_state(context),
                None => break,
            }
        }
    }
}

/// Shared, clonable access to an [`Orchestrator`] wired to a resolver.
pub struct OrchestratorHandle<C> {
    shared: Rc<Shared<C>>,
    resolver: AnimationStateResolver,
}

impl<C> Clone for OrchestratorHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<C: 'static> OrchestratorHandle<C> {
    pub fn new(
        registry: Rc<ThemeRegistry<C>>,
        monitor: Rc<dyn LifecycleMonitor>,
        resolver: AnimationStateResolver,
    ) -> Self {
        let shared = Rc::new(Shared {
            orchestrator: RefCell::new(Orchestrator::new(registry, monitor, resolver.current())),
            pending: RefCell::new(None),
            subscription: RefCell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        let subscription = resolver.subscribe(move |context| {
            if let Some(shared) = weak.upgrade() {
                shared.deliver(context.clone());
            }
        });
        *shared.subscription.borrow_mut() = Some(subscription);

        Self { shared, resolver }
    }

    fn with<R>(&self, op: impl FnOnce(&mut Orchestrator<C>) -> R) -> R {
        let result = op(&mut self.shared.orchestrator.borrow_mut());
        self.shared.drain_pending();
        result
    }

    pub fn start(&self, config: CountdownConfig, container: C, now: DateTime<Utc>) -> Tick {
        self.with(|orchestrator| orchestrator.start(config, container, now))
    }

    pub fn tick(&self, now: DateTime<Utc>) -> Tick {
        self.with(|orchestrator| orchestrator.tick(now))
    }

    /// Like [`tick`](Self::tick), but yields `None` instead of re-entering
    /// an operation that is still in progress.
    pub fn try_tick(&self, now: DateTime<Utc>) -> Option<Tick> {
        let tick = self.shared.orchestrator.try_borrow_mut().ok()?.tick(now);
        self.shared.drain_pending();
        Some(tick)
    }

    pub fn switch_theme(&self, theme: &str) -> Option<&'static str> {
        self.with(|orchestrator| orchestrator.switch_theme(theme))
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.with(|orchestrator| orchestrator.resize(width, height))
    }

    pub fn set_paused(&self, paused: bool) {
        self.resolver.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.resolver.inputs().paused
    }

    /// Destroy the renderer and stop listening to the resolver.
    pub fn teardown(&self) {
        self.with(|orchestrator| orchestrator.teardown());
        self.shared.subscription.borrow_mut().take();
        self.shared.pending.borrow_mut().take();
    }

    pub fn phase(&self) -> Phase {
        self.shared.orchestrator.borrow().phase()
    }

    pub fn active_theme(&self) -> Option<&'static str> {
        self.shared.orchestrator.borrow().active_theme()
    }

    pub fn element_count(&self) -> ElementCount {
        self.shared.orchestrator.borrow().element_count()
    }

    pub fn context(&self) -> AnimationStateContext {
        self.shared.orchestrator.borrow().context().clone()
    }
}
