//! Pure Yew view components for the countdown UI.
//!
//! Everything here renders from props only; the running countdown is owned
//! by the `use_countdown` hook.

use chrono::{DateTime, Utc};
use std::rc::Rc;
use theme_countdown::countdown::{CountdownConfig, CountdownMode, TimeRemaining};
use theme_countdown::orchestrator::Phase;
use theme_countdown::timezone::format_offset_label;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

/// Display units, largest first. Days are only shown when any remain.
fn clock_units(remaining: &TimeRemaining) -> Vec<(&'static str, u64)> {
    let mut units = Vec::with_capacity(4);
    if remaining.days > 0 {
        units.push(("Days", remaining.days));
    }
    units.push(("Hours", remaining.hours));
    units.push(("Minutes", remaining.minutes));
    units.push(("Seconds", remaining.seconds));
    units
}

/// Timezone line under the clock. Timers have none.
pub fn target_caption(
    config: &CountdownConfig,
    user_tz: &str,
    now: &DateTime<Utc>,
) -> Option<String> {
    if config.mode() == CountdownMode::Timer {
        return None;
    }
    let zone = config.timezone().name();
    Some(format!("{} ({})", zone, format_offset_label(zone, user_tz, now)))
}

#[derive(Properties, PartialEq)]
pub struct CountdownDisplayProps {
    pub remaining: TimeRemaining,
    pub phase: Phase,
    pub animated: usize,
    #[prop_or_default]
    pub caption: Option<String>,
}

#[function_component(CountdownDisplay)]
pub fn countdown_display(props: &CountdownDisplayProps) -> Html {
    html! {
        <section class="countdown-display"
            data-testid="countdown-display"
            data-phase={props.phase.as_str()}
            data-active-count={props.animated.to_string()}
            aria-live="polite">
            <div class="countdown-units">
                { clock_units(&props.remaining).into_iter().map(|(label, value)| html! {
                    <div class="countdown-unit">
                        <span class="countdown-value">{ format!("{:02}", value) }</span>
                        <span class="countdown-label">{ label }</span>
                    </div>
                }).collect::<Html>() }
            </div>
            { if let Some(caption) = &props.caption {
                html! { <p class="countdown-caption">{ caption }</p> }
            } else { html! {} } }
        </section>
    }
}

/// Shown instead of the countdown when the query string is unusable.
#[derive(Properties, PartialEq)]
pub struct ConfigErrorPanelProps {
    pub message: String,
}

#[function_component(ConfigErrorPanel)]
pub fn config_error_panel(props: &ConfigErrorPanelProps) -> Html {
    html! {
        <section class="config-error" role="alert" data-testid="config-error">
            <h2>{ "This countdown link is not valid" }</h2>
            <p>{ &props.message }</p>
            <p class="config-error-hint">
                { "Example: ?mode=timer&duration=300 or ?mode=absolute&target=2030-01-01T00:00:00Z" }
            </p>
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct ThemePickerProps {
    /// `(id, display name)` pairs in registry order.
    pub themes: Rc<Vec<(&'static str, &'static str)>>,
    pub selected: Option<&'static str>,
    pub onchange: Callback<String>,
}

#[function_component(ThemePicker)]
pub fn theme_picker(props: &ThemePickerProps) -> Html {
    let onchange = {
        let onchange = props.onchange.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            onchange.emit(select.value());
        })
    };

    html! {
        <div class="form-group">
            <label for="theme-picker">{ "Theme:" }</label>
            <select id="theme-picker" data-testid="theme-picker" {onchange}>
                { props.themes.iter().map(|&(id, name)| html! {
                    <option value={id} selected={props.selected == Some(id)}>{ name }</option>
                }).collect::<Html>() }
            </select>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct PauseToggleProps {
    pub paused: bool,
    pub onclick: Callback<()>,
}

#[function_component(PauseToggle)]
pub fn pause_toggle(props: &PauseToggleProps) -> Html {
    let onclick = props.onclick.reform(|_: MouseEvent| ());
    let label = if props.paused { "Resume animation" } else { "Pause animation" };
    html! {
        <button type="button" class="pause-toggle" data-testid="pause-toggle"
            aria-pressed={props.paused.to_string()} {onclick}>
            { label }
        </button>
    }
}

#[derive(Properties, PartialEq)]
pub struct CelebrationBannerProps {
    pub phase: Phase,
    pub message: String,
}

#[function_component(CelebrationBanner)]
pub fn celebration_banner(props: &CelebrationBannerProps) -> Html {
    match props.phase {
        Phase::Celebrating | Phase::Celebrated => html! {
            <div class={classes!("celebration", props.phase.as_str())}
                data-testid="celebration-banner" role="status">
                { &props.message }
            </div>
        },
        _ => html! {},
    }
}
