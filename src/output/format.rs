// Tue Jan 20 2026 - Alex

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How each selected struct is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// C-like dump with hole comments and a summary.
    #[default]
    Layout,
    /// Name, size and number of holes.
    Sizes,
    NameLength,
    MemberCount,
    Names,
    /// Name, old size, new size and savings.
    Packable,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportFormat::Layout => "layout",
            ReportFormat::Sizes => "sizes",
            ReportFormat::NameLength => "name-length",
            ReportFormat::MemberCount => "member-count",
            ReportFormat::Names => "names",
            ReportFormat::Packable => "packable",
        };
        write!(f, "{}", name)
    }
}

/// Per-registry-entry report printed once the scan is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// Number of units defining each struct.
    Definitions,
    /// Number of function parameters pointing at each struct.
    Methods,
}
