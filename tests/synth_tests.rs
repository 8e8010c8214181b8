mod common;

use element_anchor::{
    dom::{
        document::Document,
        dom_model::{ElementLocator, NodeId, PageDom, Rect},
    },
    synth::{
        fingerprint::ContentFingerprint,
        policy::{HeuristicPolicy, SelectorPolicy},
        selectors::{SelectorStrategy, is_unique},
        snapshot::Affordance,
        synthesizer::{SynthesisConfig, Synthesizer},
    },
};

use crate::common::utils::{add, add_boxed, find, login_page, welcome_page};

// =========================================================================
// Heuristic policy
// =========================================================================

#[test]
fn dynamic_ids_are_recognized() {
    let policy = HeuristicPolicy;
    for id in [
        "ember482",
        "a1b2c3d4e5",
        "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
        ":r1:",
        "react-select-3-input",
        "item_12",
        "user-12345",
        "ng-c123",
    ] {
        assert!(policy.is_dynamic_id(id), "{id} should be dynamic");
    }
    for id in ["email", "login-form", "main-nav", "content", "welcome-note"] {
        assert!(!policy.is_dynamic_id(id), "{id} should be stable");
    }
    assert_eq!(policy.version(), 1);
}

#[test]
fn utility_classes_are_recognized() {
    let policy = HeuristicPolicy;
    for class in [
        "btn",
        "btn-primary",
        "mt-4",
        "p-2",
        "text-center",
        "flex",
        "md:flex",
        "hover:bg-blue-500",
        "w-full",
        "col-6",
        "active",
        "x1",
        "3col",
        "css-1x2y3z",
    ] {
        assert!(policy.is_utility_class(class), "{class} should be utility");
    }
    for class in ["product-tile", "site-header", "promo-banner", "checkout-summary"] {
        assert!(!policy.is_utility_class(class), "{class} should be semantic");
    }
}

// =========================================================================
// Selector generation
// =========================================================================

#[test]
fn stable_unique_id_wins() {
    let doc = login_page();
    let email = find(&doc, "#email");
    let set = Synthesizer::default().generate_selectors(&doc, email).unwrap();

    assert_eq!(set.primary, "#email");
    assert_eq!(set.strategy, SelectorStrategy::StableId);
    assert_eq!(
        set.fallbacks,
        vec!["input[name=\"email\"]".to_string(), "input:nth-of-type(1)".to_string()]
    );
}

#[test]
fn generated_id_and_utility_class_fall_through_to_content() {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let bar = add(&mut doc, body, "div", &[("class", "actions-bar")], "");
    let submit = add(&mut doc, bar, "button", &[("id", "ember482"), ("class", "btn")], "Submit");
    let other = add(&mut doc, body, "div", &[], "");
    add(&mut doc, other, "button", &[], "Cancel");

    let synth = Synthesizer::default();
    let set = synth.generate_selectors(&doc, submit).unwrap();

    assert_eq!(set.primary, "button /* text: \"Submit\" */");
    assert_eq!(set.strategy, SelectorStrategy::Content);
    assert_eq!(doc.query_selector_all(&set.primary), vec![submit]);
    assert_eq!(set.fallbacks, vec![".actions-bar > button".to_string()]);
    assert!(!set.fallbacks.iter().any(|s| s.contains("ember482")));

    assert_eq!(
        synth.absolute_path(&doc, submit),
        "html > body > div:nth-of-type(1) > button"
    );
}

#[test]
fn attribute_and_class_strategies() {
    let doc = login_page();
    let synth = Synthesizer::default();

    let password = find(&doc, "input[type=\"password\"]");
    let set = synth.generate_selectors(&doc, password).unwrap();
    assert_eq!(set.primary, "input[name=\"password\"]");
    assert_eq!(set.strategy, SelectorStrategy::Attribute);

    let option = find(&doc, "option[value=\"de\"]");
    let set = synth.generate_selectors(&doc, option).unwrap();
    assert_eq!(set.primary, "option[value=\"de\"]");

    let banner = find(&doc, "div");
    let set = synth.generate_selectors(&doc, banner).unwrap();
    assert_eq!(set.primary, ".promo-banner");
    assert_eq!(set.strategy, SelectorStrategy::Class);
}

#[test]
fn overlong_attribute_values_are_skipped() {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let long = "x".repeat(60);
    let field = add(&mut doc, body, "textarea", &[("name", long.as_str())], "");
    add(&mut doc, body, "textarea", &[("name", "short")], "");

    let set = Synthesizer::default().generate_selectors(&doc, field).unwrap();
    assert_eq!(set.primary, "textarea:nth-of-type(1)");
    assert_eq!(set.strategy, SelectorStrategy::Positional);

    let generous = Synthesizer::new(SynthesisConfig {
        max_attribute_len: 100,
        ..SynthesisConfig::default()
    });
    let set = generous.generate_selectors(&doc, field).unwrap();
    assert_eq!(set.strategy, SelectorStrategy::Attribute);
}

#[test]
fn submit_inputs_are_qualified_by_their_form() {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let checkout = add(&mut doc, body, "form", &[("id", "checkout")], "");
    let first = add(
        &mut doc,
        checkout,
        "input",
        &[("type", "submit"), ("value", "Place order")],
        "",
    );
    let newsletter = add(&mut doc, body, "form", &[("name", "newsletter")], "");
    let second = add(
        &mut doc,
        newsletter,
        "input",
        &[("type", "submit"), ("value", "Place order")],
        "",
    );

    let synth = Synthesizer::default();
    let set = synth.generate_selectors(&doc, first).unwrap();
    assert_eq!(set.primary, "form#checkout input[type=\"submit\"]");
    assert_eq!(set.strategy, SelectorStrategy::Content);

    let set = synth.generate_selectors(&doc, second).unwrap();
    assert_eq!(set.primary, "form[name=\"newsletter\"] input[type=\"submit\"]");
}

#[test]
fn positional_and_absolute_paths() {
    let doc = login_page();
    let synth = Synthesizer::default();
    let span = find(&doc, "span");
    let button = find(&doc, "button");
    let password = find(&doc, "input[name=\"password\"]");

    let set = synth.generate_selectors(&doc, span).unwrap();
    assert_eq!(set.primary, "span");
    assert_eq!(set.strategy, SelectorStrategy::Positional);

    assert_eq!(synth.absolute_path(&doc, span), "html > body > div > span");
    assert_eq!(synth.absolute_path(&doc, button), "#login-form > button");
    assert_eq!(
        synth.absolute_path(&doc, password),
        "#login-form > input:nth-of-type(2)"
    );
}

/// Two `div#dup` siblings under body, each wrapping one plain div.
fn duplicate_id_page() -> (Document, NodeId) {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let first = add(&mut doc, body, "div", &[("id", "dup")], "");
    add(&mut doc, first, "div", &[], "one");
    let second = add(&mut doc, body, "div", &[("id", "dup")], "");
    add(&mut doc, second, "div", &[], "two");
    (doc, first)
}

#[test]
fn duplicate_ids_do_not_anchor_paths() {
    let (doc, first) = duplicate_id_page();
    let synth = Synthesizer::default();

    assert_eq!(synth.absolute_path(&doc, first), "html > body > div:nth-of-type(1)");
    let inner = doc.query_selector("#dup > div").unwrap();
    assert_eq!(
        synth.absolute_path(&doc, inner),
        "html > body > div:nth-of-type(1) > div"
    );

    let set = synth.generate_selectors(&doc, first).unwrap();
    assert_eq!(set.primary, "html > body > div:nth-of-type(1)");
    assert_eq!(set.strategy, SelectorStrategy::AbsolutePath);
}

#[test]
fn every_primary_resolves_to_exactly_its_element() {
    let synth = Synthesizer::default();

    for doc in [login_page(), duplicate_id_page().0] {
        for el in doc.query_selector_all("*") {
            let set = synth.generate_selectors(&doc, el).unwrap();
            assert!(
                is_unique(&doc, &set.primary, el),
                "{} does not resolve uniquely to <{}>",
                set.primary,
                doc.tag_name(el).unwrap()
            );
            assert!(!set.fallbacks.contains(&set.primary));
        }
    }
}

#[test]
fn non_elements_yield_nothing() {
    let doc = login_page();
    let synth = Synthesizer::default();
    let stale = element_anchor::dom::dom_model::NodeId(10_000);

    assert!(synth.generate_selectors(&doc, stale).is_none());
    assert!(synth.fingerprint(&doc, stale).is_none());
    assert!(synth.extract_element_data(&doc, stale).is_none());
}

// =========================================================================
// Content fingerprint
// =========================================================================

#[test]
fn fingerprint_components() {
    let doc = login_page();
    let synth = Synthesizer::default();
    let fp = synth.fingerprint(&doc, find(&doc, "button")).unwrap();

    assert_eq!(fp.tag_name, "button");
    assert_eq!(fp.text_snippet, "Sign in");
    assert_eq!(fp.attribute_signature, "class=btn btn-primary");
    assert_eq!(fp.class_count, 2);
    assert_eq!(fp.child_count, 0);

    let email = find(&doc, "#email");
    assert_eq!(
        synth.attribute_signature(&doc, email),
        "id=email|name=email|placeholder=you@example.com|type=email"
    );
}

#[test]
fn fingerprint_digest_tracks_content() {
    let mut doc = login_page();
    let synth = Synthesizer::default();
    let button = find(&doc, "button");

    let before = synth.fingerprint(&doc, button).unwrap();
    let reloaded = login_page();
    let same = synth.fingerprint(&reloaded, find(&reloaded, "button")).unwrap();
    assert_eq!(before.digest(), same.digest());
    assert_eq!(before.digest().len(), 40);

    doc.set_text(button, "Log in");
    let after = synth.fingerprint(&doc, button).unwrap();
    assert_ne!(before.digest(), after.digest());

    doc.set_style(button, "color", Some("red"));
    let restyled = synth.fingerprint(&doc, button).unwrap();
    assert_eq!(after.digest(), restyled.digest());
}

#[test]
fn reanchor_candidates_scan_same_tag_elements() {
    let (doc, note) = welcome_page();
    let synth = Synthesizer::default();
    let fp = synth.fingerprint(&doc, note).unwrap();

    assert_eq!(synth.reanchor_candidates(&doc, &fp), vec![note]);
    assert!(
        synth
            .reanchor_candidates(&doc, &ContentFingerprint::default())
            .is_empty()
    );
}

// =========================================================================
// Element snapshot
// =========================================================================

#[test]
fn snapshot_of_text_input() {
    let doc = login_page();
    let snapshot = Synthesizer::default()
        .extract_element_data(&doc, find(&doc, "#email"))
        .unwrap();

    assert_eq!(snapshot.tag_name, "input");
    assert_eq!(snapshot.id.as_deref(), Some("email"));
    assert_eq!(snapshot.selector, "#email");
    assert_eq!(snapshot.strategy, Some(SelectorStrategy::StableId));
    assert_eq!(snapshot.absolute_path, "#email");
    assert_eq!(snapshot.policy_version, 1);
    assert_eq!(snapshot.rect, Rect::new(420.0, 150.0, 300.0, 32.0));
    assert_eq!(snapshot.document_rect, Rect::new(420.0, 250.0, 300.0, 32.0));
    assert!(snapshot.is_visible);
    assert!(snapshot.is_clickable);
    assert!(snapshot.is_interactive);
    assert!(snapshot.in_viewport);
    assert!(snapshot.is_connected);
    assert!(!snapshot.in_shadow_dom);

    let form = snapshot.form.as_ref().unwrap();
    assert_eq!(form.input_type.as_deref(), Some("email"));
    assert_eq!(form.name.as_deref(), Some("email"));
    assert_eq!(form.placeholder.as_deref(), Some("you@example.com"));
    assert_eq!(form.form.as_deref(), Some("login-form"));
    assert_eq!(form.value, None);

    let context = &snapshot.context;
    assert_eq!(context.parent.as_ref().unwrap().id.as_deref(), Some("login-form"));
    assert_eq!(context.previous_sibling.as_ref().unwrap().tag_name, "label");
    assert_eq!(context.next_sibling.as_ref().unwrap().tag_name, "input");
    assert_eq!(context.sibling_count, 5);
    assert_eq!(context.index_in_parent, 1);

    assert!(snapshot.examples.contains_key(&Affordance::Click));
    assert!(snapshot.examples.contains_key(&Affordance::Focus));
    assert!(!snapshot.examples.contains_key(&Affordance::Check));
    let set_value = &snapshot.examples[&Affordance::SetValue];
    assert!(set_value.contains("document.querySelector(\"#email\")"));
    assert!(set_value.contains("el.value = \"new value\""));
}

#[test]
fn snapshot_of_checkbox_and_select() {
    let doc = login_page();
    let synth = Synthesizer::default();

    let checkbox = synth
        .extract_element_data(&doc, find(&doc, "input[type=\"checkbox\"]"))
        .unwrap();
    assert!(!checkbox.form.as_ref().unwrap().checked);
    assert!(checkbox.examples.contains_key(&Affordance::Check));
    assert!(checkbox.examples.contains_key(&Affordance::Uncheck));
    assert!(!checkbox.examples.contains_key(&Affordance::SetValue));

    let select = synth.extract_element_data(&doc, find(&doc, "select")).unwrap();
    let form = select.form.as_ref().unwrap();
    assert_eq!(form.value.as_deref(), Some("de"));
    assert_eq!(form.selected_index, Some(1));
    assert_eq!(form.options.len(), 2);
    assert_eq!(form.options[0].text, "English");
    assert!(!form.options[0].selected);
    assert!(form.options[1].selected);
    assert!(select.examples[&Affordance::SelectOption].contains("el.value = \"en\""));
}

#[test]
fn snapshot_of_content_button_uses_text_search_examples() {
    let doc = login_page();
    let snapshot = Synthesizer::default()
        .extract_element_data(&doc, find(&doc, "button"))
        .unwrap();

    assert_eq!(snapshot.strategy, Some(SelectorStrategy::Content));
    assert_eq!(snapshot.styles.get("cursor").map(String::as_str), Some("pointer"));
    assert_eq!(snapshot.text, "Sign in");
    assert_eq!(snapshot.fingerprint.text_snippet, "Sign in");
    assert_eq!(
        snapshot.examples[&Affordance::Click],
        "[...document.querySelectorAll(\"button\")].find(el => el.textContent.trim() === \"Sign in\").click();"
    );
}

#[test]
fn snapshot_of_plain_span_has_no_affordances() {
    let doc = login_page();
    let snapshot = Synthesizer::default()
        .extract_element_data(&doc, find(&doc, "span"))
        .unwrap();

    assert!(!snapshot.is_clickable);
    assert!(!snapshot.is_interactive);
    assert!(snapshot.form.is_none());
    assert!(snapshot.examples.is_empty());
    assert!(snapshot.html.starts_with("<span>"));
}

#[test]
fn snapshot_collects_data_aria_and_handlers() {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let buy = add_boxed(
        &mut doc,
        body,
        "div",
        &[
            ("data-test-id", "buy"),
            ("aria-label", "Buy now"),
            ("aria-pressed", "false"),
            ("role", "button"),
            ("onclick", "buy()"),
            ("tabindex", "2"),
        ],
        "Buy",
        Rect::new(10.0, 10.0, 80.0, 30.0),
    );

    let snapshot = Synthesizer::default().extract_element_data(&doc, buy).unwrap();
    assert_eq!(snapshot.data_attributes.get("test-id").map(String::as_str), Some("buy"));
    assert_eq!(snapshot.event_handlers, vec!["click".to_string()]);
    assert_eq!(snapshot.accessibility.role.as_deref(), Some("button"));
    assert_eq!(snapshot.accessibility.label.as_deref(), Some("Buy now"));
    assert_eq!(snapshot.accessibility.tab_index, Some(2));
    assert_eq!(snapshot.accessibility.aria.len(), 2);
    assert!(snapshot.is_clickable);
    assert!(snapshot.is_interactive);
}

#[test]
fn hidden_elements_are_not_visible() {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let rect = Rect::new(0.0, 0.0, 50.0, 50.0);
    let gone = add_boxed(&mut doc, body, "p", &[("class", "gone-note")], "x", rect);
    let faded = add_boxed(&mut doc, body, "p", &[("class", "faded-note")], "y", rect);
    let empty = add(&mut doc, body, "p", &[("class", "empty-note")], "z");
    doc.set_style(gone, "display", Some("none"));
    doc.set_style(faded, "opacity", Some("0"));

    let synth = Synthesizer::default();
    for el in [gone, faded, empty] {
        assert!(!synth.extract_element_data(&doc, el).unwrap().is_visible);
    }
}

#[test]
fn snapshot_serializes_camel_case() {
    let doc = login_page();
    let snapshot = Synthesizer::default()
        .extract_element_data(&doc, find(&doc, "#email"))
        .unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["tagName"], "input");
    assert_eq!(json["strategy"], "stableId");
    assert_eq!(json["form"]["type"], "email");
    assert!(json["examples"]["setValue"].is_string());
}
