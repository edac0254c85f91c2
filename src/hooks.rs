use chrono::Utc;
use gloo_events::EventListener;
use gloo_timers::callback::Interval;
use gloo_utils::{document, window};
use log::{debug, error, info, warn};
use std::rc::Rc;
use theme_countdown::config::{DOCUMENT_TITLE_SUFFIX, LAYOUT_BREAKPOINT_PX, TICK_MS};
use theme_countdown::countdown::{CountdownConfig, TimeRemaining};
use theme_countdown::diagnostics::TelemetryMonitor;
use theme_countdown::environment::{viewport_size, EnvironmentBinding};
use theme_countdown::motion::{AnimationStateResolver, MotionInputs};
use theme_countdown::orchestrator::{OrchestratorHandle, Phase, Tick};
use theme_countdown::renderer::ThemeRegistry;
use theme_countdown::resources::{ResourceKind, ResourceTracker};
use wasm_bindgen::JsValue;
use web_sys::{Element, UrlSearchParams};
use yew::prelude::*;

/// What the countdown UI shows after the latest tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountdownView {
    pub remaining: TimeRemaining,
    pub phase: Phase,
    pub theme: Option<&'static str>,
    pub animated: usize,
    pub paused: bool,
}

/// State and callbacks returned by [`use_countdown`].
#[derive(Clone)]
pub struct CountdownControls {
    pub view: CountdownView,
    /// Callback for the theme picker. Takes a theme id.
    pub on_theme: Callback<String>,
    /// Callback for the pause button.
    pub on_toggle_pause: Callback<()>,
}

type SharedHandle = Rc<std::cell::RefCell<Option<OrchestratorHandle<Element>>>>;

/// Runs the countdown for `config` inside the element behind `container`.
///
/// Everything the effect installs (tick interval, resize listener,
/// environment listeners, the live theme) is released by its destructor.
#[hook]
pub fn use_countdown(
    config: Rc<CountdownConfig>,
    container: NodeRef,
    registry: Rc<ThemeRegistry<Element>>,
) -> CountdownControls {
    let view = use_state(CountdownView::default);
    let handle: SharedHandle = use_mut_ref(|| None);

    {
        let view = view.clone();
        let handle = handle.clone();
        use_effect_with(config, move |config| {
            let resolver = AnimationStateResolver::new(MotionInputs::default());
            // Seed the resolver from the page before the first theme mounts.
            let environment = EnvironmentBinding::install(&resolver);
            debug!("Environment bound with {} handles", environment.live_handles());
            let orchestrator =
                OrchestratorHandle::new(registry, Rc::new(TelemetryMonitor), resolver.clone());
            let tracker = ResourceTracker::new();

            // Subscribed after the orchestrator, so the theme has already
            // reacted when the status is re-read.
            let status = {
                let orchestrator = orchestrator.clone();
                let view = view.clone();
                resolver.subscribe(move |_| refresh(&view, &orchestrator))
            };
            tracker.track(ResourceKind::Subscription, status);

            match container.cast::<Element>() {
                Some(element) => {
                    set_compact(&element, viewport_size().0);
                    let tick = orchestrator.start((**config).clone(), element.clone(), Utc::now());
                    publish(&view, &orchestrator, &tick, config);

                    let interval = {
                        let orchestrator = orchestrator.clone();
                        let view = view.clone();
                        let config = config.clone();
                        Interval::new(TICK_MS, move || {
                            let tick = orchestrator.tick(Utc::now());
                            publish(&view, &orchestrator, &tick, &config);
                        })
                    };
                    tracker.track(ResourceKind::Interval, interval);

                    let listener = {
                        let orchestrator = orchestrator.clone();
                        EventListener::new(&window(), "resize", move |_| {
                            let (viewport_width, _) = viewport_size();
                            set_compact(&element, viewport_width);
                            orchestrator.resize(
                                f64::from(element.client_width()),
                                f64::from(element.client_height()),
                            );
                        })
                    };
                    tracker.track(ResourceKind::Listener, listener);
                }
                None => error!("Theme container is not in the document; countdown not started"),
            }

            *handle.borrow_mut() = Some(orchestrator.clone());

            move || {
                tracker.release_all();
                orchestrator.teardown();
                drop(environment);
                handle.borrow_mut().take();
            }
        });
    }

    let on_theme = {
        let view = view.clone();
        let handle = handle.clone();
        Callback::from(move |requested: String| {
            let Some(orchestrator) = handle.borrow().clone() else {
                return;
            };
            if let Some(theme) = orchestrator.switch_theme(&requested) {
                info!("Switched theme to '{}'", theme);
                if let Err(e) = replace_theme_param(theme) {
                    warn!("Could not update the theme query parameter: {:?}", e);
                }
            }
            refresh(&view, &orchestrator);
        })
    };

    let on_toggle_pause = {
        let view = view.clone();
        let handle = handle.clone();
        Callback::from(move |_| {
            let Some(orchestrator) = handle.borrow().clone() else {
                return;
            };
            orchestrator.set_paused(!orchestrator.is_paused());
            refresh(&view, &orchestrator);
        })
    };

    CountdownControls {
        view: (*view).clone(),
        on_theme,
        on_toggle_pause,
    }
}

fn snapshot(orchestrator: &OrchestratorHandle<Element>, tick: &Tick) -> CountdownView {
    CountdownView {
        remaining: tick.remaining,
        phase: tick.phase,
        theme: orchestrator.active_theme(),
        animated: tick.elements.animated,
        paused: orchestrator.is_paused(),
    }
}

fn publish(
    view: &UseStateHandle<CountdownView>,
    orchestrator: &OrchestratorHandle<Element>,
    tick: &Tick,
    config: &CountdownConfig,
) {
    view.set(snapshot(orchestrator, tick));
    document().set_title(&document_title(tick, config.message()));
}

/// Re-read the orchestrator outside the regular tick cadence. Skipped while
/// an operation is running; its caller refreshes once it returns.
fn refresh(view: &UseStateHandle<CountdownView>, orchestrator: &OrchestratorHandle<Element>) {
    if let Some(tick) = orchestrator.try_tick(Utc::now()) {
        view.set(snapshot(orchestrator, &tick));
    }
}

fn document_title(tick: &Tick, message: &str) -> String {
    match tick.phase {
        Phase::Celebrating | Phase::Celebrated => {
            format!("{} | {}", message, DOCUMENT_TITLE_SUFFIX)
        }
        _ => format!("{} | {}", tick.remaining.clock_label(), DOCUMENT_TITLE_SUFFIX),
    }
}

/// Below the breakpoint the overlay switches to its compact layout. The
/// theme container stays mounted either way.
fn is_compact(viewport_width: f64) -> bool {
    viewport_width < LAYOUT_BREAKPOINT_PX
}

fn set_compact(container: &Element, viewport_width: f64) {
    let compact = is_compact(viewport_width);
    if let Err(e) = container.class_list().toggle_with_force("compact", compact) {
        warn!("Could not toggle compact layout: {:?}", e);
    }
}

/// Rewrite `?theme=` in place so a reload keeps the chosen theme.
fn replace_theme_param(theme: &str) -> Result<(), JsValue> {
    let win = window();
    let location = win.location();
    let params = UrlSearchParams::new_with_str(&location.search()?)?;
    params.set("theme", theme);
    let url = format!(
        "{}?{}{}",
        location.pathname()?,
        String::from(params.to_string()),
        location.hash()?
    );
    win.history()?
        .replace_state_with_url(&JsValue::NULL, "", Some(&url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use theme_countdown::renderer::ElementCount;

    fn tick(total: u64, phase: Phase) -> Tick {
        Tick {
            remaining: TimeRemaining::from_total_secs(total),
            phase,
            elements: ElementCount::default(),
            celebration_started: false,
        }
    }

    #[test]
    fn title_shows_clock_while_running() {
        assert_eq!(
            document_title(&tick(3_725, Phase::Running), "Launch!"),
            "01:02:05 | Countdown"
        );
        assert_eq!(
            document_title(&tick(90_000, Phase::Running), "Launch!"),
            "01:01:00:00 | Countdown"
        );
    }

    #[test]
    fn compact_layout_below_the_breakpoint() {
        assert!(is_compact(375.0));
        assert!(is_compact(1049.5));
        assert!(!is_compact(1050.0));
        assert!(!is_compact(1920.0));
    }

    #[test]
    fn title_shows_message_once_celebrating() {
        assert_eq!(
            document_title(&tick(0, Phase::Celebrating), "Launch!"),
            "Launch! | Countdown"
        );
        assert_eq!(
            document_title(&tick(0, Phase::Celebrated), "Launch!"),
            "Launch! | Countdown"
        );
    }
}
