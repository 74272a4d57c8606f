//! In-memory host collaborators.
//!
//! A headless player, page and beacon recorder that implement the host traits
//! without a browser. Used by the `adslot` simulator and by tests; every
//! mutation is recorded so callers can inspect what the engine did.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::beacon::BeaconSender;
use crate::error::{AdPlayerError, Result};
use crate::events::{EventHub, PageEvent, PlayerEvent, Propagation, SurfaceEvent};
use crate::host::{
    ControlBarState, HostPlayer, OverlayLayout, PageElement, PageInterface, PlaybackSurface,
    Transition,
};
use crate::model::VideoFile;

/// A playback surface whose clock is driven by the caller.
#[derive(Debug)]
pub struct HeadlessSurface {
    id: String,
    position: Mutex<f64>,
    duration: Mutex<f64>,
    source: Mutex<Option<String>>,
    attached: AtomicBool,
    visible: AtomicBool,
    playing: AtomicBool,
    events: EventHub<SurfaceEvent>,
}

impl HeadlessSurface {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            position: Mutex::new(0.0),
            duration: Mutex::new(duration),
            source: Mutex::new(None),
            attached: AtomicBool::new(true),
            visible: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            events: EventHub::new(),
        }
    }

    pub fn set_position(&self, position: f64) {
        *self.position.lock() = position;
    }

    pub fn set_duration(&self, duration: f64) {
        *self.duration.lock() = duration;
    }

    /// Advance the clock by `delta` seconds while playing.
    ///
    /// Emits `Ended` (once) when the position reaches the duration. Returns
    /// `true` if playback ended on this call.
    pub fn advance(&self, delta: f64) -> bool {
        if !self.playing.load(Ordering::SeqCst) {
            return false;
        }
        let duration = *self.duration.lock();
        let reached_end = {
            let mut position = self.position.lock();
            *position += delta;
            if duration.is_finite() && *position >= duration {
                *position = duration;
                true
            } else {
                false
            }
        };
        if reached_end {
            self.end();
        }
        reached_end
    }

    /// Jump to `position` and emit `Seeked`.
    pub fn seek_to(&self, position: f64) {
        self.set_position(position);
        self.events.emit(&SurfaceEvent::Seeked);
    }

    /// Stop playback and emit `Ended`.
    pub fn end(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.events.emit(&SurfaceEvent::Ended);
    }

    /// Remove the surface from the page.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn source(&self) -> Option<String> {
        self.source.lock().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl PlaybackSurface for HeadlessSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn current_time(&self) -> f64 {
        *self.position.lock()
    }

    fn duration(&self) -> f64 {
        *self.duration.lock()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn load(&self, url: &str) {
        *self.source.lock() = Some(url.to_string());
        self.set_position(0.0);
    }

    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
        self.events.emit(&SurfaceEvent::Play);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.events.emit(&SurfaceEvent::Pause);
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn events(&self) -> &EventHub<SurfaceEvent> {
        &self.events
    }
}

/// A host player backed by [`HeadlessSurface`]s.
#[derive(Debug)]
pub struct HeadlessPlayer {
    id: String,
    supported_formats: Vec<String>,
    ad_duration: f64,
    primary: Mutex<Option<Arc<HeadlessSurface>>>,
    sibling: Mutex<Option<Arc<HeadlessSurface>>>,
    control_bar: Mutex<ControlBarState>,
    fail_switch: AtomicBool,
    calls: Mutex<Vec<String>>,
    notifications: Mutex<Vec<(String, Value)>>,
    events: EventHub<PlayerEvent>,
}

impl HeadlessPlayer {
    /// Player with a primary surface playing `content_duration` seconds of
    /// content. Ad sources load with `ad_duration` seconds.
    pub fn new(id: impl Into<String>, content_duration: f64, ad_duration: f64) -> Self {
        let id = id.into();
        let primary = Arc::new(HeadlessSurface::new(format!("{id}_video"), content_duration));
        Self {
            id,
            supported_formats: vec!["video/mp4".to_string()],
            ad_duration,
            primary: Mutex::new(Some(primary)),
            sibling: Mutex::new(None),
            control_bar: Mutex::new(ControlBarState::default()),
            fail_switch: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            events: EventHub::new(),
        }
    }

    pub fn with_supported_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Make the next source switches fail.
    pub fn fail_source_switch(&self, fail: bool) {
        self.fail_switch.store(fail, Ordering::SeqCst);
    }

    pub fn primary(&self) -> Option<Arc<HeadlessSurface>> {
        self.primary.lock().clone()
    }

    /// Remove the primary surface (e.g. the player was torn down).
    pub fn remove_primary(&self) {
        if let Some(primary) = self.primary.lock().take() {
            primary.detach();
        }
    }

    pub fn sibling(&self) -> Option<Arc<HeadlessSurface>> {
        self.sibling.lock().clone()
    }

    /// The surface currently playing the ad, sibling first.
    pub fn active_surface(&self) -> Option<Arc<HeadlessSurface>> {
        self.sibling().or_else(|| self.primary())
    }

    /// Number of visible surfaces (primary and sibling).
    pub fn visible_surfaces(&self) -> usize {
        [self.primary(), self.sibling()]
            .into_iter()
            .flatten()
            .filter(|s| s.is_attached() && s.is_visible())
            .count()
    }

    /// Mutating calls the engine made, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notifications.lock().clone()
    }

    /// Simulate a user click on the player.
    pub fn click(&self) -> Propagation {
        self.events.emit(&PlayerEvent::Click)
    }

    pub fn emit(&self, event: PlayerEvent) -> Propagation {
        self.events.emit(&event)
    }

    /// Show or hide the control bar, emitting the matching player event.
    pub fn set_control_bar(&self, visible: bool, height: f64) {
        *self.control_bar.lock() = ControlBarState { visible, height };
        let event = if visible {
            PlayerEvent::ControlBarShown { height }
        } else {
            PlayerEvent::ControlBarHidden
        };
        self.events.emit(&event);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl HostPlayer for HeadlessPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn playback_surface(&self) -> Option<Arc<dyn PlaybackSurface>> {
        self.primary()
            .filter(|s| s.is_attached())
            .map(|s| s as Arc<dyn PlaybackSurface>)
    }

    fn compatible_source(&self, files: &[VideoFile]) -> Option<VideoFile> {
        files
            .iter()
            .find(|f| self.supported_formats.iter().any(|fmt| fmt == &f.format))
            .cloned()
    }

    async fn switch_source(&self, source: &VideoFile) -> Result<Arc<dyn PlaybackSurface>> {
        self.record(format!("switch_source:{}", source.url));
        if self.fail_switch.load(Ordering::SeqCst) {
            return Err(AdPlayerError::source_switch(&source.url, "simulated failure"));
        }
        let primary = self
            .primary()
            .ok_or_else(|| AdPlayerError::surface("no primary surface"))?;
        primary.load(&source.url);
        primary.set_duration(self.ad_duration);
        primary.play();
        Ok(primary as Arc<dyn PlaybackSurface>)
    }

    fn sibling_surface(&self) -> Result<Arc<dyn PlaybackSurface>> {
        let mut sibling = self.sibling.lock();
        let surface = match sibling.as_ref() {
            Some(existing) => existing.clone(),
            None => {
                self.record("create_sibling");
                let created = Arc::new(HeadlessSurface::new(
                    format!("{}_adSibling", self.id),
                    self.ad_duration,
                ));
                *sibling = Some(created.clone());
                created
            }
        };
        Ok(surface as Arc<dyn PlaybackSurface>)
    }

    fn remove_sibling_surface(&self) {
        if let Some(sibling) = self.sibling.lock().take() {
            self.record("remove_sibling");
            sibling.detach();
        }
    }

    fn control_bar(&self) -> ControlBarState {
        *self.control_bar.lock()
    }

    fn show_control_bar(&self, force: bool) {
        self.record(format!("show_control_bar:{force}"));
        self.control_bar.lock().visible = true;
    }

    fn restore_controls_hover(&self) {
        self.record("restore_controls_hover");
    }

    fn hide_spinner(&self) {
        self.record("hide_spinner");
    }

    fn enter_ad_mode(&self) {
        self.record("enter_ad_mode");
    }

    fn notify_external(&self, event: &str, payload: Value) {
        self.record(format!("notify_external:{event}"));
        self.notifications.lock().push((event.to_string(), payload));
    }

    fn events(&self) -> &EventHub<PlayerEvent> {
        &self.events
    }
}

/// Recorded state of one page element.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessElement {
    pub element: PageElement,
    pub text: Option<String>,
    pub html: Option<String>,
    pub visible: bool,
    pub layouts: Vec<(OverlayLayout, Transition)>,
}

/// A page that keeps inserted elements in memory.
#[derive(Debug, Default)]
pub struct HeadlessPage {
    elements: Mutex<BTreeMap<String, HeadlessElement>>,
    opened_windows: Mutex<Vec<String>>,
    events: EventHub<PageEvent>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a pre-existing page container (e.g. a companion target).
    pub fn add_container(&self, id: &str) {
        self.insert_element(PageElement::new(id, crate::host::ElementKind::Container));
    }

    pub fn element(&self, id: &str) -> Option<HeadlessElement> {
        self.elements.lock().get(id).cloned()
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.element(id).and_then(|e| e.text)
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.element(id).and_then(|e| e.html)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.element(id).is_some_and(|e| e.visible)
    }

    pub fn opened_windows(&self) -> Vec<String> {
        self.opened_windows.lock().clone()
    }

    /// Simulate a user click on an element.
    pub fn click(&self, id: &str) -> Propagation {
        self.events.emit(&PageEvent::Click {
            element_id: id.to_string(),
        })
    }
}

impl PageInterface for HeadlessPage {
    fn has_element(&self, id: &str) -> bool {
        self.elements.lock().contains_key(id)
    }

    fn insert_element(&self, element: PageElement) {
        let visible = element.kind != crate::host::ElementKind::Overlay;
        let text = element.text.clone();
        self.elements.lock().insert(
            element.id.clone(),
            HeadlessElement {
                element,
                text,
                html: None,
                visible,
                layouts: Vec::new(),
            },
        );
    }

    fn remove_element(&self, id: &str) {
        let mut elements = self.elements.lock();
        elements.remove(id);
        elements.retain(|_, e| e.element.parent.as_deref() != Some(id));
    }

    fn set_text(&self, id: &str, text: &str) -> bool {
        match self.elements.lock().get_mut(id) {
            Some(element) => {
                element.text = Some(text.to_string());
                true
            }
            None => false,
        }
    }

    fn set_html(&self, id: &str, html: &str) -> bool {
        let mut elements = self.elements.lock();
        let Some(element) = elements.get_mut(id) else {
            return false;
        };
        element.html = Some(html.to_string());
        // New markup replaces children.
        elements.retain(|_, e| e.element.parent.as_deref() != Some(id));
        true
    }

    fn apply_layout(&self, id: &str, layout: &OverlayLayout, transition: Transition) {
        if let Some(element) = self.elements.lock().get_mut(id) {
            element.layouts.push((*layout, transition));
        }
    }

    fn fade_in(&self, id: &str) {
        if let Some(element) = self.elements.lock().get_mut(id) {
            element.visible = true;
        }
    }

    fn fade_out(&self, id: &str) {
        if let Some(element) = self.elements.lock().get_mut(id) {
            element.visible = false;
        }
    }

    fn open_window(&self, url: &str) {
        self.opened_windows.lock().push(url.to_string());
    }

    fn events(&self) -> &EventHub<PageEvent> {
        &self.events
    }
}

/// Records every beacon URL instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingBeacons {
    urls: Mutex<Vec<String>>,
}

impl RecordingBeacons {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.urls.lock().len()
    }

    /// Number of recorded URLs ending with `suffix`.
    pub fn count_ending_with(&self, suffix: &str) -> usize {
        self.urls.lock().iter().filter(|u| u.ends_with(suffix)).count()
    }
}

impl BeaconSender for RecordingBeacons {
    fn send(&self, url: &str) {
        self.urls.lock().push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_ends_once_at_duration() {
        let surface = HeadlessSurface::new("s", 2.0);
        surface.play();
        assert!(!surface.advance(1.0));
        assert!(surface.advance(1.5));
        assert_eq!(surface.current_time(), 2.0);
        // Not playing anymore.
        assert!(!surface.advance(1.0));
    }

    #[test]
    fn test_compatible_source_prefers_file_order() {
        let player = HeadlessPlayer::new("p", 60.0, 15.0)
            .with_supported_formats(["video/webm", "video/mp4"]);
        let files = vec![
            VideoFile::new("https://a/x.flv", "video/x-flv"),
            VideoFile::new("https://a/x.mp4", "video/mp4"),
            VideoFile::new("https://a/x.webm", "video/webm"),
        ];
        assert_eq!(
            player.compatible_source(&files).unwrap().url,
            "https://a/x.mp4"
        );
    }

    #[test]
    fn test_remove_element_drops_children() {
        let page = HeadlessPage::new();
        page.insert_element(PageElement::new("o", crate::host::ElementKind::Overlay));
        page.insert_element(
            PageElement::new("o_close", crate::host::ElementKind::CloseButton).with_parent("o"),
        );
        page.remove_element("o");
        assert!(!page.has_element("o_close"));
    }
}
