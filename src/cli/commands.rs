use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use crate::cli::config::AppConfig;
use crate::dom::document::Document;
use crate::dom::dom_model::ElementLocator;
use crate::dom::mutation::MutationWatcher;
use crate::picker::picker_model::PickerEvent;
use crate::picker::session::PickerSession;
use crate::registry::registry::ElementRegistry;
use crate::registry::registry_model::{CapturedElement, ElementCapture};
use crate::registry::store::FileStore;
use crate::synth::synthesizer::Synthesizer;

pub async fn open_registry(
    config: &AppConfig,
    watcher: Option<Arc<dyn MutationWatcher>>,
) -> ElementRegistry {
    let store = Arc::new(FileStore::new(config.store_dir()));
    ElementRegistry::load(
        store,
        watcher,
        Synthesizer::new(config.synthesis.clone()),
        config.registry_config(),
    )
    .await
}

fn load_page(path: &str) -> Result<Document> {
    Document::load(path).with_context(|| format!("loading page dump {path}"))
}

fn print_record_line(record: &CapturedElement) {
    let validity = match record.is_valid {
        Some(true) => "valid",
        Some(false) => "invalid",
        None => "unverified",
    };
    println!(
        "{:<20} {:<10} {:<10} {}",
        record.name,
        record.snapshot.tag_name,
        validity,
        record.primary_selector
    );
}

// ============================================================================
// capture subcommand
// ============================================================================

pub async fn cmd_capture(
    config: &AppConfig,
    page: &str,
    at: Option<(f64, f64)>,
    selector: Option<&str>,
    broaden: usize,
    track: bool,
) -> Result<()> {
    let mut doc = load_page(page)?;
    let synthesizer = Synthesizer::new(config.synthesis.clone());

    let event = match (at, selector) {
        (Some((x, y)), _) => pick_at(config, &mut doc, synthesizer, x, y, broaden)?,
        (None, Some(selector)) => {
            let el = doc
                .query_selector(selector)
                .ok_or_else(|| anyhow!("no element matches {selector:?}"))?;
            let snapshot = synthesizer
                .extract_element_data(&doc, el)
                .ok_or_else(|| anyhow!("matched node is not an element"))?;
            PickerEvent::element_selected(snapshot)
        }
        (None, None) => bail!("either --at or --selector is required"),
    };

    let watcher: Arc<dyn MutationWatcher> = doc.mutation_watcher();
    let registry = open_registry(config, Some(watcher)).await;
    let assignment = registry
        .add_element(ElementCapture::from(event).tracked(track))
        .await;

    println!("Registered {} -> {}", assignment.name, assignment.data.primary_selector);
    for fallback in &assignment.data.fallback_selectors {
        println!("  fallback: {fallback}");
    }
    Ok(())
}

fn pick_at(
    config: &AppConfig,
    doc: &mut Document,
    synthesizer: Synthesizer,
    x: f64,
    y: f64,
    broaden: usize,
) -> Result<PickerEvent> {
    let mut picker = PickerSession::new(config.picker.clone(), synthesizer);
    picker.start(doc);

    if picker.pointer_move(doc, x, y).is_none() {
        picker.stop(doc);
        bail!("no element under ({x}, {y})");
    }
    for _ in 0..broaden {
        picker.context_menu(doc);
    }
    picker
        .click(doc, x, y)
        .ok_or_else(|| anyhow!("picker produced no element"))
}

// ============================================================================
// synth subcommand
// ============================================================================

pub fn cmd_synth(config: &AppConfig, page: &str, selector: &str, full: bool) -> Result<()> {
    let doc = load_page(page)?;
    let el = doc
        .query_selector(selector)
        .ok_or_else(|| anyhow!("no element matches {selector:?}"))?;
    let synthesizer = Synthesizer::new(config.synthesis.clone());

    if full {
        let snapshot = synthesizer
            .extract_element_data(&doc, el)
            .ok_or_else(|| anyhow!("matched node is not an element"))?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let set = synthesizer
        .generate_selectors(&doc, el)
        .ok_or_else(|| anyhow!("matched node is not an element"))?;
    println!("primary:   {} ({:?})", set.primary, set.strategy);
    for fallback in &set.fallbacks {
        println!("fallback:  {fallback}");
    }
    println!("path:      {}", synthesizer.absolute_path(&doc, el));
    Ok(())
}

// ============================================================================
// registry subcommands
// ============================================================================

pub async fn cmd_list(config: &AppConfig) -> Result<()> {
    let registry = open_registry(config, None).await;
    let records = registry.get_all_elements();
    if records.is_empty() {
        println!("No elements registered");
        return Ok(());
    }
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

pub async fn cmd_show(config: &AppConfig, name: &str) -> Result<()> {
    let registry = open_registry(config, None).await;
    let record = registry
        .get_element(name)
        .ok_or_else(|| anyhow!("element not found: {name}"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub async fn cmd_rename(config: &AppConfig, old: &str, new: &str) -> Result<()> {
    let registry = open_registry(config, None).await;
    let key = registry.rename_element(old, new).await?;
    println!("Renamed {old} -> {key}");
    Ok(())
}

pub async fn cmd_delete(config: &AppConfig, name: &str) -> Result<()> {
    let registry = open_registry(config, None).await;
    let removed = registry.delete_element(name).await?;
    println!("Deleted {}", removed.name);
    Ok(())
}

/// Verify and report whether the record is still valid.
pub async fn cmd_verify(config: &AppConfig, name: &str, page: &str) -> Result<bool> {
    let doc = load_page(page)?;
    let registry = open_registry(config, None).await;
    let report = registry.verify_element(name, &doc).await?;
    println!(
        "{}: {:?} -> {} ({})",
        report.name,
        report.outcome,
        report.primary_selector,
        if report.is_valid { "valid" } else { "invalid" }
    );
    Ok(report.is_valid)
}

pub async fn cmd_track(config: &AppConfig, name: &str, enabled: bool) -> Result<()> {
    let registry = open_registry(config, None).await;
    registry.set_track_changes(name, enabled).await?;
    println!(
        "Change tracking {} for {name}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn cmd_refs(config: &AppConfig, text: &str) -> Result<()> {
    let registry = open_registry(config, None).await;
    let records = registry.process_references(text);
    if records.is_empty() {
        println!("No references resolved");
    }
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

pub async fn cmd_clear(config: &AppConfig) -> Result<()> {
    let registry = open_registry(config, None).await;
    let count = registry.clear().await;
    println!("Removed {count} elements");
    Ok(())
}
