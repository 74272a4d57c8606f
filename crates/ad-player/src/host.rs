//! Host collaborator interfaces.
//!
//! The engine never owns the media player or the page. It borrows them through
//! these traits, injected once into [`AdPlayer`](crate::AdPlayer).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::{EventHub, PageEvent, PlayerEvent, SurfaceEvent};
use crate::model::{StyleMap, VideoFile};

/// An element rendering video (the primary surface or the ad sibling).
pub trait PlaybackSurface: Send + Sync {
    fn id(&self) -> &str;

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    /// Media duration in seconds; `NaN` while unknown.
    fn duration(&self) -> f64;

    /// `false` once the surface has been removed from the page.
    fn is_attached(&self) -> bool;

    fn load(&self, url: &str);

    fn play(&self);

    fn pause(&self);

    fn set_visible(&self, visible: bool);

    fn events(&self) -> &EventHub<SurfaceEvent>;
}

/// Visibility and size of the host control bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlBarState {
    pub visible: bool,
    pub height: f64,
}

/// The host media player.
#[async_trait]
pub trait HostPlayer: Send + Sync {
    /// Player instance identity; scopes every inserted page element.
    fn id(&self) -> &str;

    /// The primary playback surface, if present.
    fn playback_surface(&self) -> Option<Arc<dyn PlaybackSurface>>;

    /// First file whose format this player can play.
    fn compatible_source(&self, files: &[VideoFile]) -> Option<VideoFile>;

    /// Switch the primary surface to `source`.
    ///
    /// Resolves once the new source is ready to play.
    async fn switch_source(&self, source: &VideoFile) -> Result<Arc<dyn PlaybackSurface>>;

    /// The secondary ad surface layered over the primary one, created on
    /// first use.
    fn sibling_surface(&self) -> Result<Arc<dyn PlaybackSurface>>;

    /// Remove the secondary surface if it exists.
    fn remove_sibling_surface(&self);

    fn control_bar(&self) -> ControlBarState;

    fn show_control_bar(&self, force: bool);

    fn restore_controls_hover(&self);

    fn hide_spinner(&self);

    /// Switch the host UI into ad playback mode.
    fn enter_ad_mode(&self);

    /// Best-effort propagation to cross-boundary listeners (embedding pages).
    fn notify_external(&self, event: &str, payload: serde_json::Value);

    fn events(&self) -> &EventHub<PlayerEvent>;
}

/// What an inserted page element is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Notice,
    SkipButton,
    Overlay,
    CloseButton,
    /// Page-declared container, e.g. a companion target.
    Container,
}

/// Element the engine asks the page to insert into the player interface.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    pub id: String,
    pub kind: ElementKind,
    /// Parent element id; `None` appends to the player interface.
    pub parent: Option<String>,
    pub text: Option<String>,
    pub style: StyleMap,
}

impl PageElement {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: None,
            text: None,
            style: StyleMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Merge style entries; later entries override earlier ones.
    pub fn with_style<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in entries {
            self.style.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn with_style_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.style.insert(key.to_string(), value.into());
        self
    }
}

/// Overlay placement inside the player interface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub width: f64,
    pub height: f64,
    /// Horizontal anchor, percent of the interface width.
    pub left_percent: f64,
    pub margin_left: f64,
    pub bottom: f64,
}

/// How a layout change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Immediate,
    Animated,
}

/// Page insertion points, scoped to one player instance.
pub trait PageInterface: Send + Sync {
    fn has_element(&self, id: &str) -> bool;

    fn insert_element(&self, element: PageElement);

    fn remove_element(&self, id: &str);

    /// Replace the text of an element. Returns `false` if it does not exist.
    fn set_text(&self, id: &str, text: &str) -> bool;

    /// Replace the markup of an element. Returns `false` if it does not exist.
    fn set_html(&self, id: &str, html: &str) -> bool;

    fn apply_layout(&self, id: &str, layout: &OverlayLayout, transition: Transition);

    fn fade_in(&self, id: &str);

    fn fade_out(&self, id: &str);

    /// Open `url` in a new browsing context.
    fn open_window(&self, url: &str);

    fn events(&self) -> &EventHub<PageEvent>;
}
