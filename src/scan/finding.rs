// Tue Jan 20 2026 - Alex

use crate::layout::LayoutView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedSize {
    pub old_size: u64,
    pub new_size: u64,
    pub savings: u64,
}

#[derive(Debug, Clone)]
pub struct ClassFinding {
    /// Effective name, or `file(line)` for anonymous structs.
    pub name: String,
    pub view: LayoutView,
    pub packed: Option<PackedSize>,
}

#[derive(Debug, Clone)]
pub struct StepView {
    pub moved: String,
    pub offset: u64,
    pub view: LayoutView,
}

#[derive(Debug, Clone)]
pub struct Reorganized {
    pub steps: Vec<StepView>,
    pub result: LayoutView,
    pub savings: u64,
    pub cacheline_savings: u64,
}

/// One reportable result of a scan, detached from the type graph.
#[derive(Debug, Clone)]
pub enum Finding {
    Class(Box<ClassFinding>),
    Reorganized(Box<Reorganized>),
    Container { name: String, depth: usize, count: usize },
    PointerMember { struct_name: String, member: String },
    DefinedIn { unit: String },
    Layout(Box<LayoutView>),
    TypeName(String),
    Aggregate { name: String, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub findings: Vec<Finding>,
    pub flow: Flow,
}

impl UnitOutcome {
    pub fn proceed(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            flow: Flow::Continue,
        }
    }

    pub fn stop(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            flow: Flow::Stop,
        }
    }
}
