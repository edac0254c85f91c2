//! The contract every theme implements, plus the registry that maps theme
//! identifiers to renderer factories.

use log::warn;
use serde::Serialize;
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::motion::AnimationStateContext;

/// Diagnostic snapshot of a renderer's visual elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ElementCount {
    pub total: usize,
    pub animated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    #[error("renderer is already mounted")]
    AlreadyMounted,
    #[error("renderer has been destroyed")]
    Destroyed,
    #[error("DOM operation failed: {0}")]
    Dom(String),
    #[error("theme setup failed: {0}")]
    Setup(String),
}

impl From<JsValue> for RendererError {
    fn from(value: JsValue) -> Self {
        RendererError::Dom(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

/// Lifecycle contract for a theme, generic over the container it mounts into.
///
/// A renderer is mounted at most once and destroyed at most once. After
/// `destroy` every method is a no-op.
pub trait ThemeRenderer<C> {
    /// Attach visual resources to `container`. Anything that must later be
    /// revoked is tracked before the step that could fail.
    fn mount(&mut self, container: &C, context: &AnimationStateContext)
        -> Result<(), RendererError>;

    /// Recompute layout-dependent state. Does not resize the container.
    fn set_size(&mut self, width: f64, height: f64);

    /// Start or stop the animation loop. Stopping cancels in-flight frames
    /// and drops the animated count to zero.
    fn on_animation_state_change(&mut self, context: &AnimationStateContext);

    /// Release every tracked resource and detach owned nodes.
    fn destroy(&mut self);

    fn element_count(&self) -> ElementCount;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Created,
    Mounted,
    Destroyed,
}

/// Enforces the mount-once / destroy-once rules for a renderer.
#[derive(Debug, Default)]
pub struct RendererLifecycle {
    phase: LifecyclePhase,
}

impl RendererLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Marks the renderer mounted. Later failures are cleaned up by `destroy`.
    pub fn begin_mount(&mut self) -> Result<(), RendererError> {
        match self.phase {
            LifecyclePhase::Created => {
                self.phase = LifecyclePhase::Mounted;
                Ok(())
            }
            LifecyclePhase::Mounted => Err(RendererError::AlreadyMounted),
            LifecyclePhase::Destroyed => Err(RendererError::Destroyed),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.phase == LifecyclePhase::Mounted
    }

    /// Returns `true` only for the first call.
    pub fn begin_destroy(&mut self) -> bool {
        if self.phase == LifecyclePhase::Destroyed {
            return false;
        }
        self.phase = LifecyclePhase::Destroyed;
        true
    }
}

pub type RendererFactory<C> = Rc<dyn Fn() -> Box<dyn ThemeRenderer<C>>>;

pub struct ThemeDescriptor<C> {
    pub id: &'static str,
    pub display_name: &'static str,
    pub author: &'static str,
    factory: RendererFactory<C>,
}

/// Theme identifier → renderer factory. Resolved once per theme switch.
pub struct ThemeRegistry<C> {
    themes: Vec<ThemeDescriptor<C>>,
    default_id: &'static str,
}

impl<C> ThemeRegistry<C> {
    pub fn new(default_id: &'static str) -> Self {
        Self {
            themes: Vec::new(),
            default_id,
        }
    }

    pub fn register<F>(
        mut self,
        id: &'static str,
        display_name: &'static str,
        author: &'static str,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Box<dyn ThemeRenderer<C>> + 'static,
    {
        self.themes.retain(|theme| theme.id != id);
        self.themes.push(ThemeDescriptor {
            id,
            display_name,
            author,
            factory: Rc::new(factory),
        });
        self
    }

    pub fn get_theme_ids(&self) -> Vec<&'static str> {
        self.themes.iter().map(|theme| theme.id).collect()
    }

    pub fn get_theme_display_name(&self, id: &str) -> Option<&'static str> {
        self.find(id).map(|theme| theme.display_name)
    }

    pub fn get_theme_author(&self, id: &str) -> Option<&'static str> {
        self.find(id).map(|theme| theme.author)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn default_theme_id(&self) -> &'static str {
        self.default_id
    }

    /// `requested` when registered, otherwise the default theme.
    pub fn resolve_id(&self, requested: &str) -> &'static str {
        match self.find(requested) {
            Some(theme) => theme.id,
            None => {
                warn!(
                    "Unknown theme '{}', using '{}'",
                    requested, self.default_id
                );
                self.default_id
            }
        }
    }

    pub fn create(&self, id: &str) -> Option<Box<dyn ThemeRenderer<C>>> {
        self.find(id).map(|theme| (theme.factory)())
    }

    fn find(&self, id: &str) -> Option<&ThemeDescriptor<C>> {
        self.themes.iter().find(|theme| theme.id == id)
    }
}
