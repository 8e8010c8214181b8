use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::picker::picker_model::PickerOptions;
use crate::registry::registry::{DEFAULT_NAMESPACE, RegistryConfig};
use crate::registry::tracking::DEFAULT_QUEUE_CAPACITY;
use crate::synth::synthesizer::SynthesisConfig;

pub const DEFAULT_CONFIG_FILE: &str = "element-anchor.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "element-anchor",
    version,
    about = "Capture page elements, synthesize robust selectors and keep a named registry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: element-anchor.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory holding the registry file (overrides storage.dir)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,

    /// Storage key of the registry (overrides storage.namespace)
    #[arg(long, global = true)]
    pub namespace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pick an element on a page dump and register it
    Capture {
        /// Page dump JSON file
        #[arg(long)]
        page: String,

        /// Pointer position to pick at, as X,Y
        #[arg(long, value_parser = parse_point, conflicts_with = "selector")]
        at: Option<(f64, f64)>,

        /// Pick the first element matching this selector instead of a point
        #[arg(long)]
        selector: Option<String>,

        /// Right-click this many times before picking (broaden to ancestors)
        #[arg(long, default_value_t = 0)]
        broaden: usize,

        /// Watch the element for mutations
        #[arg(long)]
        track: bool,
    },

    /// Print synthesized selectors for an element without registering it
    Synth {
        #[arg(long)]
        page: String,

        /// Selector locating the element
        #[arg(long)]
        selector: String,

        /// Print the full element snapshot
        #[arg(long)]
        full: bool,
    },

    /// List registered elements in creation order
    List,

    /// Print one record as JSON
    Show { name: String },

    /// Rename a record (use its default id to drop the custom name)
    Rename { old: String, new: String },

    /// Delete a record
    Delete { name: String },

    /// Re-resolve a record against a page dump
    Verify {
        name: String,

        #[arg(long)]
        page: String,
    },

    /// Turn change tracking on or off for a record
    Track {
        name: String,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Resolve @name references in free text
    Refs { text: String },

    /// Remove every record
    Clear,
}

fn parse_point(raw: &str) -> Result<(f64, f64), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {raw:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `element-anchor.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub picker: PickerOptions,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_store_dir")]
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

// Serde default helpers
fn default_namespace() -> String { DEFAULT_NAMESPACE.to_string() }
fn default_store_dir() -> String { ".element-anchor".to_string() }
fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }
fn default_filter() -> String { "info".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    /// Applies the global CLI overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.store_dir {
            self.storage.dir = dir.clone();
        }
        if let Some(namespace) = &cli.namespace {
            self.storage.namespace = namespace.clone();
        }
        self
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            namespace: self.storage.namespace.clone(),
            queue_capacity: self.tracking.queue_capacity,
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.dir)
    }
}
