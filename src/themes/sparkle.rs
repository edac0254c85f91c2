//! Renderer for themes made of many small DOM elements where a random
//! subset is briefly highlighted (grid cells, stars).

use gloo_utils::document;
use log::warn;
use rand::Rng;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use web_sys::Element;

use super::{publish_count, FrameLoop, Highlights, ThemeStage};
use crate::motion::AnimationStateContext;
use crate::renderer::{ElementCount, RendererError, ThemeRenderer};

/// Layout and styling for a sparkle theme.
pub trait SparkleLayout: 'static {
    const ID: &'static str;
    const SPAWN_EVERY_MS: f64;
    const LIFETIME_MS: f64;
    const MAX_ACTIVE: usize;

    /// Changes only when the elements must be rebuilt for a new size.
    fn layout_key(width: f64, height: f64) -> usize;

    /// Create and position `layout_key` elements under `root`.
    fn build(root: &Element, width: f64, height: f64) -> Result<Vec<Element>, RendererError>;

    fn idle_class() -> &'static str;

    fn lit_class(rng: &mut impl Rng) -> String;
}

struct Field<L> {
    root: Element,
    items: Vec<Element>,
    highlights: Highlights,
    key: Option<usize>,
    _layout: PhantomData<L>,
}

impl<L: SparkleLayout> Field<L> {
    fn new(root: Element) -> Self {
        Self {
            root,
            items: Vec::new(),
            highlights: Highlights::new(L::SPAWN_EVERY_MS, L::LIFETIME_MS, L::MAX_ACTIVE),
            key: None,
            _layout: PhantomData,
        }
    }

    fn layout(&mut self, width: f64, height: f64) -> Result<(), RendererError> {
        let key = L::layout_key(width, height);
        if self.key == Some(key) {
            return Ok(());
        }
        self.clear_highlights();
        for item in self.items.drain(..) {
            item.remove();
        }
        self.key = Some(key);
        self.items = L::build(&self.root, width, height)?;
        publish_count(&self.root, self.count());
        Ok(())
    }

    fn step(&mut self, now: f64) {
        for index in self.highlights.expire(now) {
            self.set_class(index, L::idle_class());
        }
        let mut rng = rand::rng();
        if let Some(index) = self.highlights.spawn(now, self.items.len(), &mut rng) {
            let class = L::lit_class(&mut rng);
            self.set_class(index, &class);
        }
        publish_count(&self.root, self.count());
    }

    fn clear_highlights(&mut self) {
        for index in self.highlights.drain() {
            self.set_class(index, L::idle_class());
        }
        publish_count(&self.root, self.count());
    }

    fn set_class(&self, index: usize, class: &str) {
        if let Some(item) = self.items.get(index) {
            item.set_class_name(class);
        }
    }

    fn count(&self) -> ElementCount {
        ElementCount {
            total: self.items.len(),
            animated: self.highlights.len(),
        }
    }
}

pub struct SparkleTheme<L> {
    stage: ThemeStage,
    field: Option<Rc<RefCell<Field<L>>>>,
    frames: Option<FrameLoop>,
}

impl<L: SparkleLayout> SparkleTheme<L> {
    pub fn new() -> Self {
        Self {
            stage: ThemeStage::new(L::ID),
            field: None,
            frames: None,
        }
    }
}

impl<L: SparkleLayout> Default for SparkleTheme<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: SparkleLayout> ThemeRenderer<Element> for SparkleTheme<L> {
    fn mount(
        &mut self,
        container: &Element,
        context: &AnimationStateContext,
    ) -> Result<(), RendererError> {
        let root = self.stage.mount(container, "div")?;
        let field = Rc::new(RefCell::new(Field::<L>::new(root)));
        self.field = Some(field.clone());

        let width = f64::from(container.client_width());
        let height = f64::from(container.client_height());
        field.borrow_mut().layout(width, height)?;

        let weak = Rc::downgrade(&field);
        self.frames = Some(FrameLoop::new(self.stage.tracker(), move |now| {
            match weak.upgrade() {
                Some(field) => {
                    field.borrow_mut().step(now);
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
        if let Some(field) = &self.field {
            if let Err(e) = field.borrow_mut().layout(width, height) {
                warn!("{}: relayout failed: {}", L::ID, e);
            }
        }
    }

    fn on_animation_state_change(&mut self, context: &AnimationStateContext) {
        if !self.stage.is_live() {
            return;
        }
        let (Some(frames), Some(field)) = (&self.frames, &self.field) else {
            return;
        };
        if context.should_animate {
            frames.start();
        } else {
            frames.stop();
            field.borrow_mut().clear_highlights();
        }
    }

    fn destroy(&mut self) {
        if let Some(frames) = &self.frames {
            frames.stop();
        }
        if self.stage.destroy() {
            self.frames = None;
            self.field = None;
        }
    }

    fn element_count(&self) -> ElementCount {
        match (&self.field, self.stage.is_live()) {
            (Some(field), true) => field.borrow().count(),
            _ => ElementCount::default(),
        }
    }
}

/// Create `count` elements of `tag` under `root`, styled by `style_for`.
pub(crate) fn build_items(
    root: &Element,
    tag: &str,
    class: &str,
    count: usize,
    mut style_for: impl FnMut(usize) -> Option<String>,
) -> Result<Vec<Element>, RendererError> {
    let doc = document();
    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        let item = doc.create_element(tag)?;
        item.set_class_name(class);
        if let Some(style) = style_for(index) {
            item.set_attribute("style", &style)?;
        }
        root.append_child(&item)?;
        items.push(item);
    }
    Ok(items)
}
