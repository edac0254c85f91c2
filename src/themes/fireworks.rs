//! Fireworks drawn on a canvas: periodic bursts of particles under gravity.

use log::warn;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement};

use super::{publish_count, FrameLoop, ThemeStage};
use crate::motion::AnimationStateContext;
use crate::renderer::{ElementCount, RendererError, ThemeRenderer};

pub const ID: &str = "fireworks";

const LAUNCH_EVERY_MS: f64 = 650.0;
const BURST_SIZE: usize = 36;
const MAX_PARTICLES: usize = 400;
const PARTICLE_LIFE_MS: f64 = 1_600.0;
/// px per ms², downward
const GRAVITY: f64 = 0.000_12;
const SPEED_MEAN: f64 = 0.22;
const SPEED_SD: f64 = 0.06;
const MIN_SPEED: f64 = 0.02;
/// Long gaps (tab switch, debugger) are treated as a single short frame.
const MAX_FRAME_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Particle {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    age_ms: f64,
    hue: u16,
}

/// Particles flying outward from `(x, y)` in an even ring.
fn burst(x: f64, y: f64, speed: &Normal<f64>, rng: &mut impl Rng) -> Vec<Particle> {
    let hue = rng.random_range(0..360);
    (0..BURST_SIZE)
        .map(|i| {
            let angle = i as f64 / BURST_SIZE as f64 * TAU + rng.random_range(-0.1..0.1);
            let v = speed.sample(rng).max(MIN_SPEED);
            Particle {
                x,
                y,
                vx: angle.cos() * v,
                vy: angle.sin() * v,
                age_ms: 0.0,
                hue,
            }
        })
        .collect()
}

/// Integrate `dt` ms of motion and drop particles past their lifetime.
fn advance(particles: &mut Vec<Particle>, dt: f64) {
    for p in particles.iter_mut() {
        p.vy += GRAVITY * dt;
        p.x += p.vx * dt;
        p.y += p.vy * dt;
        p.age_ms += dt;
    }
    particles.retain(|p| p.age_ms < PARTICLE_LIFE_MS);
}

struct Sky {
    root: Element,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    speed: Normal<f64>,
    particles: Vec<Particle>,
    last_frame: Option<f64>,
    last_launch: Option<f64>,
}

impl Sky {
    fn resize(&mut self, width: f64, height: f64) {
        self.canvas.set_width(width.max(0.0) as u32);
        self.canvas.set_height(height.max(0.0) as u32);
    }

    fn step(&mut self, now: f64) {
        let dt = self
            .last_frame
            .map(|last| (now - last).clamp(0.0, MAX_FRAME_MS))
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        let due = self
            .last_launch
            .is_none_or(|last| now - last >= LAUNCH_EVERY_MS);
        if due && self.particles.len() + BURST_SIZE <= MAX_PARTICLES {
            self.last_launch = Some(now);
            let (w, h) = (f64::from(self.canvas.width()), f64::from(self.canvas.height()));
            let mut rng = rand::rng();
            let x = rng.random_range(0.15..=0.85) * w;
            let y = rng.random_range(0.15..=0.5) * h;
            self.particles.extend(burst(x, y, &self.speed, &mut rng));
        }

        advance(&mut self.particles, dt);
        self.draw();
        publish_count(&self.root, self.count());
    }

    fn draw(&self) {
        let (w, h) = (f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        self.ctx.clear_rect(0.0, 0.0, w, h);
        for p in &self.particles {
            self.ctx.set_global_alpha(1.0 - p.age_ms / PARTICLE_LIFE_MS);
            self.ctx
                .set_fill_style_str(&format!("hsl({}, 90%, 62%)", p.hue));
            self.ctx.fill_rect(p.x - 1.0, p.y - 1.0, 3.0, 3.0);
        }
        self.ctx.set_global_alpha(1.0);
    }

    fn clear(&mut self) {
        self.particles.clear();
        self.last_frame = None;
        self.last_launch = None;
        let (w, h) = (f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        self.ctx.clear_rect(0.0, 0.0, w, h);
        publish_count(&self.root, self.count());
    }

    fn count(&self) -> ElementCount {
        ElementCount {
            total: self.particles.len(),
            animated: self.particles.len(),
        }
    }
}

pub struct Fireworks {
    stage: ThemeStage,
    sky: Option<Rc<RefCell<Sky>>>,
    frames: Option<FrameLoop>,
}

impl Fireworks {
    pub fn new() -> Self {
        Self {
            stage: ThemeStage::new(ID),
            sky: None,
            frames: None,
        }
    }
}

impl Default for Fireworks {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRenderer<Element> for Fireworks {
    fn mount(
        &mut self,
        container: &Element,
        context: &AnimationStateContext,
    ) -> Result<(), RendererError> {
        let root = self.stage.mount(container, "canvas")?;
        let canvas = root
            .clone()
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| RendererError::Dom("theme root is not a canvas".to_string()))?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| RendererError::Dom("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RendererError::Dom("unexpected 2d context type".to_string()))?;
        let speed =
            Normal::new(SPEED_MEAN, SPEED_SD).map_err(|e| RendererError::Setup(e.to_string()))?;

        let mut sky = Sky {
            root,
            canvas,
            ctx,
            speed,
            particles: Vec::new(),
            last_frame: None,
            last_launch: None,
        };
        sky.resize(
            f64::from(container.client_width()),
            f64::from(container.client_height()),
        );
        let sky = Rc::new(RefCell::new(sky));
        self.sky = Some(sky.clone());

        let weak = Rc::downgrade(&sky);
        self.frames = Some(FrameLoop::new(self.stage.tracker(), move |now| {
            match weak.upgrade() {
                Some(sky) => {
                    sky.borrow_mut().step(now);
                    true
                }
                None => false,
            }
        }));
        self.on_animation_state_change(context);
        Ok(())
    }

    fn set_size(&mut self, width: f64, height: f64) {
        if !self.stage.is_live() {
            return;
        }
        if let Some(sky) = &self.sky {
            sky.borrow_mut().resize(width, height);
        }
    }

    fn on_animation_state_change(&mut self, context: &AnimationStateContext) {
        if !self.stage.is_live() {
            return;
        }
        let (Some(frames), Some(sky)) = (&self.frames, &self.sky) else {
            warn!("{}: animation state change on a partial mount", ID);
            return;
        };
        if context.should_animate {
            frames.start();
        } else {
            frames.stop();
            sky.borrow_mut().clear();
        }
    }

    fn destroy(&mut self) {
        if let Some(frames) = &self.frames {
            frames.stop();
        }
        if self.stage.destroy() {
            self.frames = None;
            self.sky = None;
        }
    }

    fn element_count(&self) -> ElementCount {
        match (&self.sky, self.stage.is_live()) {
            (Some(sky), true) => sky.borrow().count(),
            _ => ElementCount::default(),
        }
    }
}
