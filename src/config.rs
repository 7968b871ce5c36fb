// Tue Jan 20 2026 - Alex

use crate::output::{Aggregate, ReportFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CACHELINE_SIZE: u64 = 64;

/// What to do with the struct named by `class_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMode {
    #[default]
    Layout,
    Reorganize,
    Containers,
    PointersTo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulated word size in bytes; `None` keeps the native one.
    pub word_size: Option<u8>,
    /// 0 disables cacheline-aware output and repacking.
    pub cacheline_size: u64,
    pub class_name: Option<String>,
    pub class_mode: ClassMode,
    pub recursive: bool,
    pub show_reorg_steps: bool,
    pub verbose: bool,
    pub defined_in: bool,
    pub packable: bool,
    pub include_anonymous: bool,
    pub include_nested_anonymous: bool,
    pub flatten_anonymous: bool,
    pub include_prefix: Option<String>,
    pub exclude_prefix: Option<String>,
    pub decl_exclude_prefix: Option<String>,
    pub cu_exclude_prefix: Option<String>,
    pub min_holes: usize,
    pub min_bit_holes: usize,
    pub hole_size_ge: Option<u64>,
    pub type_id: Option<u32>,
    pub format: ReportFormat,
    pub aggregate: Option<Aggregate>,
    pub separator: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            word_size: None,
            cacheline_size: DEFAULT_CACHELINE_SIZE,
            class_name: None,
            class_mode: ClassMode::Layout,
            recursive: false,
            show_reorg_steps: false,
            verbose: false,
            defined_in: false,
            packable: false,
            include_anonymous: false,
            include_nested_anonymous: false,
            flatten_anonymous: true,
            include_prefix: None,
            exclude_prefix: None,
            decl_exclude_prefix: None,
            cu_exclude_prefix: None,
            min_holes: 0,
            min_bit_holes: 0,
            hole_size_ge: None,
            type_id: None,
            format: ReportFormat::Layout,
            aggregate: None,
            separator: '\t',
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&text).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
    }

    pub fn with_word_size(mut self, word_size: u8) -> Self {
        self.word_size = Some(word_size);
        self
    }

    pub fn with_cacheline_size(mut self, cacheline_size: u64) -> Self {
        self.cacheline_size = cacheline_size;
        self
    }

    pub fn with_class(mut self, name: &str, mode: ClassMode) -> Self {
        self.class_name = Some(name.to_string());
        self.class_mode = mode;
        self
    }

    pub fn with_packable(mut self, packable: bool) -> Self {
        self.packable = packable;
        self
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn with_hole_thresholds(mut self, min_holes: usize, min_bit_holes: usize, hole_size_ge: Option<u64>) -> Self {
        self.min_holes = min_holes;
        self.min_bit_holes = min_bit_holes;
        self.hole_size_ge = hole_size_ge;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(word_size) = self.word_size {
            if word_size == 0 || word_size > 16 || !word_size.is_power_of_two() {
                return Err(format!("word_size must be a power of two in 1..=16, got {}", word_size));
            }
        }
        if self.cacheline_size != 0 && !self.cacheline_size.is_power_of_two() {
            return Err(format!(
                "cacheline_size must be 0 or a power of two, got {}",
                self.cacheline_size
            ));
        }
        if self.class_name.is_none() {
            if self.defined_in {
                return Err("defined_in requires class_name".to_string());
            }
            if self.class_mode != ClassMode::Layout {
                return Err("class_mode requires class_name".to_string());
            }
        }
        if self.hole_size_ge == Some(0) {
            return Err("hole_size_ge must be greater than 0".to_string());
        }
        if self.separator == '\n' {
            return Err("separator cannot be a newline".to_string());
        }
        Ok(())
    }
}
