use tracing::{debug, info};

use crate::dom::dom_model::{ListenerKind, NodeId, OverlayHost, OverlayLayer, PageDom, Rect};
use crate::picker::picker_model::{PickerEvent, PickerKey, PickerOptions, PickerState};
use crate::synth::synthesizer::Synthesizer;

const INFO_BOX_HEIGHT: f64 = 22.0;
const INFO_BOX_WIDTH: f64 = 240.0;

#[derive(Debug, Clone, Copy)]
struct Chrome {
    capture: NodeId,
    highlight: NodeId,
    info: Option<NodeId>,
}

/// Interactive element picker.
///
/// The session does not own the page: every input is delivered together with
/// the page it happened on, which must be the page `start` was called with.
pub struct PickerSession {
    options: PickerOptions,
    synthesizer: Synthesizer,
    state: PickerState,
    chrome: Option<Chrome>,
    listeners: Vec<ListenerKind>,
    shadow_hosts: Vec<NodeId>,
    target: Option<NodeId>,
}

impl PickerSession {
    pub fn new(options: PickerOptions, synthesizer: Synthesizer) -> Self {
        Self {
            options,
            synthesizer,
            state: PickerState::Idle,
            chrome: None,
            listeners: Vec::new(),
            shadow_hosts: Vec::new(),
            target: None,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PickerState::Active
    }

    pub fn options(&self) -> &PickerOptions {
        &self.options
    }

    /// Element currently highlighted, if any.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Shadow hosts recorded when the session started.
    pub fn tracked_shadow_hosts(&self) -> &[NodeId] {
        &self.shadow_hosts
    }

    /// Idle → Active. Returns `false` (and does nothing) when already active.
    pub fn start<P: PageDom + OverlayHost + ?Sized>(&mut self, page: &mut P) -> bool {
        if self.is_active() {
            debug!("picker already active");
            return false;
        }

        self.shadow_hosts = page.shadow_hosts();

        let capture = page.mount_layer(OverlayLayer::Capture);
        let highlight = page.mount_layer(OverlayLayer::Highlight);
        page.set_layer_hidden(highlight, true);
        let info = self.options.show_info_box.then(|| {
            let info = page.mount_layer(OverlayLayer::InfoBox);
            page.set_layer_hidden(info, true);
            info
        });
        self.chrome = Some(Chrome {
            capture,
            highlight,
            info,
        });

        self.listeners = vec![ListenerKind::PointerMove, ListenerKind::Click];
        if self.options.allow_broaden {
            self.listeners.push(ListenerKind::ContextMenu);
        }
        if self.options.keyboard_shortcuts {
            self.listeners.push(ListenerKind::KeyDown);
        }
        for kind in &self.listeners {
            page.add_capture_listener(*kind);
        }
        page.set_cursor(Some(&self.options.cursor));

        self.target = None;
        self.state = PickerState::Active;
        info!(shadow_hosts = self.shadow_hosts.len(), "picker started");
        true
    }

    /// Active → Idle, removing every trace of the session from the page.
    /// Returns `false` without touching the page when already idle.
    pub fn stop<P: PageDom + OverlayHost + ?Sized>(&mut self, page: &mut P) -> bool {
        if !self.is_active() {
            return false;
        }

        if let Some(chrome) = self.chrome.take() {
            if let Some(info) = chrome.info {
                page.unmount_layer(info);
            }
            page.unmount_layer(chrome.highlight);
            page.unmount_layer(chrome.capture);
        }
        for kind in self.listeners.drain(..) {
            page.remove_capture_listener(kind);
        }
        page.set_cursor(None);

        self.shadow_hosts.clear();
        self.target = None;
        self.state = PickerState::Idle;
        info!("picker stopped");
        true
    }

    /// Re-targets the element under the pointer and redraws the highlight.
    pub fn pointer_move<P: PageDom + OverlayHost + ?Sized>(
        &mut self,
        page: &mut P,
        x: f64,
        y: f64,
    ) -> Option<NodeId> {
        if !self.is_active() {
            return None;
        }
        let hit = self.hit_test(page, x, y)?;
        if self.target != Some(hit) {
            debug!(?hit, x, y, "picker target changed");
        }
        self.target = Some(hit);
        self.redraw(page, hit);
        Some(hit)
    }

    /// Picks the current target, or whatever lies under `(x, y)` when no
    /// target has been highlighted yet.
    pub fn click<P: PageDom + OverlayHost + ?Sized>(
        &mut self,
        page: &mut P,
        x: f64,
        y: f64,
    ) -> Option<PickerEvent> {
        if !self.is_active() {
            return None;
        }
        let target = match self.target {
            Some(target) => Some(target),
            None => self.hit_test(page, x, y),
        };
        self.pick(page, target)
    }

    /// Broadens the target to its parent element. Returns the new target.
    pub fn context_menu<P: PageDom + OverlayHost + ?Sized>(&mut self, page: &mut P) -> Option<NodeId> {
        if !self.is_active() || !self.options.allow_broaden {
            return None;
        }
        let current = self.target?;
        let broadened = page.parent_element(current).unwrap_or(current);
        debug!(from = ?current, to = ?broadened, "picker target broadened");
        self.target = Some(broadened);
        self.redraw(page, broadened);
        Some(broadened)
    }

    pub fn key_down<P: PageDom + OverlayHost + ?Sized>(
        &mut self,
        page: &mut P,
        key: PickerKey,
    ) -> Option<PickerEvent> {
        if !self.is_active() {
            return None;
        }
        match key {
            PickerKey::Escape => {
                info!("picker cancelled");
                self.stop(page);
                None
            }
            PickerKey::Enter if self.options.keyboard_shortcuts => {
                let target = self.target?;
                self.pick(page, Some(target))
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------

    /// Tears the overlay down before extraction so picker chrome never takes
    /// part in uniqueness checks.
    fn pick<P: PageDom + OverlayHost + ?Sized>(
        &mut self,
        page: &mut P,
        target: Option<NodeId>,
    ) -> Option<PickerEvent> {
        self.stop(page);
        let target = target?;
        let snapshot = self.synthesizer.extract_element_data(&*page, target)?;
        info!(tag = %snapshot.tag_name, selector = %snapshot.selector, "element picked");
        Some(PickerEvent::element_selected(snapshot))
    }

    fn hit_test<P: PageDom + OverlayHost + ?Sized>(&self, page: &mut P, x: f64, y: f64) -> Option<NodeId> {
        let capture = self.chrome.map(|c| c.capture);
        if let Some(capture) = capture {
            page.set_layer_hidden(capture, true);
        }

        let mut hit = page.element_from_point(x, y);
        while let Some(el) = hit {
            if !self.shadow_hosts.contains(&el) {
                break;
            }
            match page.shadow_element_from_point(el, x, y) {
                Some(inner) if inner != el => hit = Some(inner),
                _ => break,
            }
        }

        if let Some(capture) = capture {
            page.set_layer_hidden(capture, false);
        }
        hit
    }

    fn redraw<P: PageDom + OverlayHost + ?Sized>(&self, page: &mut P, el: NodeId) {
        let Some(chrome) = self.chrome else { return };
        let rect = page.bounding_rect(el);

        page.position_layer(chrome.highlight, rect);
        page.set_layer_hidden(chrome.highlight, false);

        if let Some(info) = chrome.info {
            let label = info_label(&*page, el, rect);
            let top = if rect.top() >= INFO_BOX_HEIGHT {
                rect.top() - INFO_BOX_HEIGHT
            } else {
                rect.bottom()
            };
            page.position_layer(info, Rect::new(rect.left(), top, INFO_BOX_WIDTH, INFO_BOX_HEIGHT));
            page.set_layer_label(info, &label);
            page.set_layer_hidden(info, false);
        }
    }
}

/// `tag#id.class1.class2  W×H`
pub fn info_label<D: PageDom + ?Sized>(dom: &D, el: NodeId, rect: Rect) -> String {
    let mut label = dom.tag_name(el).unwrap_or_default();
    if let Some(id) = dom.element_id(el) {
        label.push('#');
        label.push_str(&id);
    }
    for class in dom.class_list(el) {
        label.push('.');
        label.push_str(&class);
    }
    format!(
        "{label}  {}×{}",
        rect.width.round() as i64,
        rect.height.round() as i64
    )
}
