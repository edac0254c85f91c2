//! Yew shell for the themed countdown.
//! Reads the query string, then hands the page to the countdown hook.

use chrono::Utc;
use gloo_utils::window;
use log::warn;
use std::rc::Rc;
use theme_countdown::countdown::CountdownConfig;
use theme_countdown::params::CountdownParams;
use theme_countdown::renderer::ThemeRegistry;
use theme_countdown::themes;
use theme_countdown::timezone::detect_user_timezone;
use web_sys::{Element, UrlSearchParams};
use yew::prelude::*;

mod components;
mod hooks;

use components::{
    target_caption, CelebrationBanner, ConfigErrorPanel, CountdownDisplay, PauseToggle,
    ThemePicker,
};
use hooks::use_countdown;

/// Parameters from `window.location.search`.
fn query_params() -> CountdownParams {
    let search = window().location().search().unwrap_or_default();
    match UrlSearchParams::new_with_str(&search) {
        Ok(params) => CountdownParams::from_lookup(|key| params.get(key)),
        Err(e) => {
            warn!("Could not parse the query string: {:?}", e);
            CountdownParams::default()
        }
    }
}

#[derive(Properties, PartialEq)]
struct CountdownProps {
    config: Rc<CountdownConfig>,
    user_tz: Rc<str>,
}

#[function_component(Countdown)]
fn countdown(props: &CountdownProps) -> Html {
    let container = use_node_ref();
    let registry: Rc<ThemeRegistry<Element>> = use_memo((), |_| themes::registry());
    let theme_list = {
        let registry = registry.clone();
        use_memo((), move |_| {
            registry
                .get_theme_ids()
                .into_iter()
                .map(|id| (id, registry.get_theme_display_name(id).unwrap_or(id)))
                .collect::<Vec<_>>()
        })
    };
    let controls = use_countdown(props.config.clone(), container.clone(), registry);
    let view = &controls.view;
    let caption = target_caption(&props.config, &props.user_tz, &Utc::now());

    html! {
        <main class={classes!("countdown-app", view.phase.as_str())}>
            <div class="theme-container" data-testid="theme-container" ref={container}></div>
            <div class="countdown-overlay">
                <CountdownDisplay
                    remaining={view.remaining}
                    phase={view.phase}
                    animated={view.animated}
                    {caption}
                />
                <CelebrationBanner phase={view.phase} message={props.config.message().to_string()} />
                <div class="countdown-controls">
                    <ThemePicker
                        themes={theme_list}
                        selected={view.theme}
                        onchange={controls.on_theme.clone()}
                    />
                    <PauseToggle paused={view.paused} onclick={controls.on_toggle_pause.clone()} />
                </div>
            </div>
        </main>
    }
}

/// Root component: a countdown, or an error panel for a bad link.
#[function_component]
pub fn App() -> Html {
    let user_tz: Rc<str> = use_memo((), |_| detect_user_timezone())
        .as_str()
        .into();
    let loaded = {
        let user_tz = user_tz.clone();
        use_memo((), move |_| query_params().into_config(Utc::now(), &user_tz))
    };

    match &*loaded {
        Ok(config) => html! {
            <Countdown config={Rc::new(config.clone())} {user_tz} />
        },
        Err(e) => {
            warn!("Invalid countdown configuration: {}", e);
            html! { <ConfigErrorPanel message={e.to_string()} /> }
        }
    }
}

/// Entry point: logging, panic hook, then the Yew renderer.
fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    yew::Renderer::<App>::new().render();
}
