mod common;

use element_anchor::{
    dom::{
        document::Document,
        dom_model::{ElementLocator, ListenerKind, PageDom, Rect},
    },
    picker::{
        picker_model::{PickerEvent, PickerKey, PickerOptions, PickerState},
        session::{PickerSession, info_label},
    },
    synth::{selectors::SelectorStrategy, synthesizer::Synthesizer},
};

use crate::common::utils::{find, fixture, login_page};

fn session() -> PickerSession {
    PickerSession::new(PickerOptions::default(), Synthesizer::default())
}

fn session_with(options: PickerOptions) -> PickerSession {
    PickerSession::new(options, Synthesizer::default())
}

fn layers(doc: &Document) -> usize {
    doc.query_selector_all("[data-anchor-layer]").len()
}

fn layer(doc: &Document, name: &str) -> element_anchor::dom::dom_model::NodeId {
    find(doc, &format!("[data-anchor-layer=\"{name}\"]"))
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn start_mounts_overlay_listeners_and_cursor() {
    let mut doc = login_page();
    let mut picker = session();

    assert!(picker.start(&mut doc));
    assert_eq!(picker.state(), PickerState::Active);
    assert_eq!(layers(&doc), 3);
    assert_eq!(
        doc.listeners(),
        &[
            ListenerKind::PointerMove,
            ListenerKind::Click,
            ListenerKind::ContextMenu,
            ListenerKind::KeyDown
        ]
    );
    assert_eq!(doc.cursor(), Some("wait"));

    let capture = layer(&doc, "capture");
    assert_eq!(doc.bounding_rect(capture), Rect::new(0.0, 0.0, 1280.0, 800.0));
    assert_eq!(doc.computed_style(capture, "position").as_deref(), Some("fixed"));
    assert_eq!(
        doc.computed_style(layer(&doc, "highlight"), "display").as_deref(),
        Some("none")
    );
}

#[test]
fn second_start_is_a_no_op() {
    let mut doc = login_page();
    let mut picker = session();

    assert!(picker.start(&mut doc));
    let revision = doc.revision();
    assert!(!picker.start(&mut doc));
    assert_eq!(doc.revision(), revision);
    assert_eq!(layers(&doc), 3);
}

#[test]
fn stop_when_idle_touches_nothing() {
    let mut doc = login_page();
    let mut picker = session();
    let revision = doc.revision();

    assert!(!picker.stop(&mut doc));
    assert_eq!(doc.revision(), revision);
    assert_eq!(doc.cursor(), None);
}

#[test]
fn stop_removes_every_trace() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 430.0, 160.0);

    assert!(picker.stop(&mut doc));
    assert_eq!(picker.state(), PickerState::Idle);
    assert_eq!(picker.target(), None);
    assert_eq!(layers(&doc), 0);
    assert!(doc.listeners().is_empty());
    assert_eq!(doc.cursor(), None);
}

#[test]
fn idle_session_ignores_input() {
    let mut doc = login_page();
    let mut picker = session();

    assert_eq!(picker.pointer_move(&mut doc, 430.0, 160.0), None);
    assert_eq!(picker.click(&mut doc, 430.0, 160.0), None);
    assert_eq!(picker.context_menu(&mut doc), None);
    assert_eq!(picker.key_down(&mut doc, PickerKey::Enter), None);
}

// =========================================================================
// Highlight and pick
// =========================================================================

#[test]
fn pointer_move_highlights_the_element_under_the_pointer() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    let email = find(&doc, "#email");

    assert_eq!(picker.pointer_move(&mut doc, 430.0, 160.0), Some(email));
    assert_eq!(picker.target(), Some(email));

    let highlight = layer(&doc, "highlight");
    assert_eq!(doc.bounding_rect(highlight), doc.bounding_rect(email));
    assert_eq!(doc.computed_style(highlight, "display").as_deref(), Some("block"));

    let info = layer(&doc, "info");
    assert_eq!(doc.text_content(info), "input#email  300×32");
    assert_eq!(doc.bounding_rect(info), Rect::new(420.0, 128.0, 240.0, 22.0));

    // The capture layer is back in place after hit testing.
    let capture = layer(&doc, "capture");
    assert_eq!(doc.computed_style(capture, "display").as_deref(), Some("block"));
}

#[test]
fn click_emits_element_selected_and_tears_down() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 430.0, 160.0);

    let event = picker.click(&mut doc, 430.0, 160.0).unwrap();
    assert_eq!(event.action, PickerEvent::ELEMENT_SELECTED);
    assert_eq!(event.data.selector, "#email");
    assert_eq!(picker.state(), PickerState::Idle);
    assert_eq!(layers(&doc), 0);
    assert!(doc.listeners().is_empty());

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "elementSelected");
    assert_eq!(json["data"]["selector"], "#email");
}

#[test]
fn click_without_prior_move_hit_tests_the_click_point() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);

    let event = picker.click(&mut doc, 450.0, 355.0).unwrap();
    assert_eq!(event.data.tag_name, "button");
    assert_eq!(event.data.selector, "button /* text: \"Sign in\" */");
    assert_eq!(event.data.strategy, Some(SelectorStrategy::Content));
}

#[test]
fn click_on_empty_space_stops_without_event() {
    let mut doc = Document::new();
    let mut picker = session();
    picker.start(&mut doc);

    assert_eq!(picker.click(&mut doc, 10.0, 10.0), None);
    assert!(!picker.is_active());
    assert_eq!(layers(&doc), 0);
}

#[test]
fn overlay_never_takes_part_in_selectors() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 5.0, 790.0);

    let event = picker.click(&mut doc, 5.0, 790.0).unwrap();
    assert_eq!(event.data.selector, ".promo-banner");
    assert_eq!(event.data.absolute_path, "html > body > div");
}

// =========================================================================
// Broadening and keys
// =========================================================================

#[test]
fn context_menu_broadens_to_the_parent() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 430.0, 160.0);

    let form = find(&doc, "#login-form");
    assert_eq!(picker.context_menu(&mut doc), Some(form));
    assert_eq!(doc.bounding_rect(layer(&doc, "highlight")), doc.bounding_rect(form));

    let event = picker.click(&mut doc, 430.0, 160.0).unwrap();
    assert_eq!(event.data.tag_name, "form");
    assert_eq!(event.data.selector, "#login-form");
}

#[test]
fn context_menu_stops_at_the_root_element() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 5.0, 5.0);

    let html = doc.root_element().unwrap();
    picker.context_menu(&mut doc);
    assert_eq!(picker.context_menu(&mut doc), Some(html));
    assert_eq!(picker.context_menu(&mut doc), Some(html));
}

#[test]
fn escape_cancels() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);
    picker.pointer_move(&mut doc, 430.0, 160.0);

    assert_eq!(picker.key_down(&mut doc, PickerKey::from_key("Escape")), None);
    assert_eq!(picker.state(), PickerState::Idle);
    assert_eq!(layers(&doc), 0);
}

#[test]
fn enter_picks_the_highlighted_target() {
    let mut doc = login_page();
    let mut picker = session();
    picker.start(&mut doc);

    assert_eq!(picker.key_down(&mut doc, PickerKey::Enter), None);
    assert!(picker.is_active(), "nothing highlighted yet");

    picker.pointer_move(&mut doc, 430.0, 160.0);
    assert_eq!(picker.key_down(&mut doc, PickerKey::Other), None);
    let event = picker.key_down(&mut doc, PickerKey::Enter).unwrap();
    assert_eq!(event.data.selector, "#email");
    assert!(!picker.is_active());
}

#[test]
fn key_mapping() {
    assert_eq!(PickerKey::from_key("Escape"), PickerKey::Escape);
    assert_eq!(PickerKey::from_key("Esc"), PickerKey::Escape);
    assert_eq!(PickerKey::from_key("Enter"), PickerKey::Enter);
    assert_eq!(PickerKey::from_key("a"), PickerKey::Other);
}

// =========================================================================
// Options
// =========================================================================

#[test]
fn options_shape_the_session() {
    let mut doc = login_page();
    let mut picker = session_with(PickerOptions {
        show_info_box: false,
        allow_broaden: false,
        keyboard_shortcuts: false,
        cursor: "cell".into(),
    });
    picker.start(&mut doc);

    assert_eq!(layers(&doc), 2);
    assert_eq!(doc.listeners(), &[ListenerKind::PointerMove, ListenerKind::Click]);
    assert_eq!(doc.cursor(), Some("cell"));

    picker.pointer_move(&mut doc, 430.0, 160.0);
    assert_eq!(picker.context_menu(&mut doc), None);
    assert_eq!(picker.key_down(&mut doc, PickerKey::Enter), None);
    assert!(picker.is_active());

    assert_eq!(picker.key_down(&mut doc, PickerKey::Escape), None);
    assert!(!picker.is_active());
}

// =========================================================================
// Shadow DOM
// =========================================================================

#[test]
fn picker_descends_into_shadow_roots() {
    let mut doc = fixture("shadow_widget.json");
    let mut picker = session();
    picker.start(&mut doc);
    assert_eq!(picker.tracked_shadow_hosts().len(), 1);

    let inner = picker.pointer_move(&mut doc, 30.0, 80.0).unwrap();
    assert_eq!(doc.tag_name(inner).as_deref(), Some("button"));
    assert_eq!(doc.text_content(layer(&doc, "info")), "button.pay-action  120×40");

    let event = picker.click(&mut doc, 30.0, 80.0).unwrap();
    assert!(event.data.in_shadow_dom);
    assert_eq!(event.data.tag_name, "button");
    assert_eq!(event.data.selector, "button:nth-of-type(1)");
    assert_eq!(event.data.text, "Pay now");
}

#[test]
fn info_label_format() {
    let doc = login_page();
    let button = find(&doc, "button");

    assert_eq!(
        info_label(&doc, button, Rect::new(0.0, 0.0, 119.6, 40.2)),
        "button.btn.btn-primary  120×40"
    );
}
