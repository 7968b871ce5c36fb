// Tue Jan 20 2026 - Alex

use crate::graph::{CompilationUnit, MemberKind, Strings, StructType};
use crate::layout::{LayoutKind, LayoutReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRow {
    Member {
        type_name: String,
        name: String,
        offset: u64,
        size: u64,
        bits: Option<(u16, u16)>,
    },
    Hole(u64),
    BitHole(u64),
    CachelineBoundary(u64),
}

/// Printable snapshot of a layout, detached from the graph.
#[derive(Debug, Clone)]
pub struct LayoutView {
    pub keyword: &'static str,
    pub name: Option<String>,
    pub typedef_alias: Option<String>,
    pub decl: Option<(String, u32)>,
    pub rows: Vec<LayoutRow>,
    pub size: u64,
    pub nr_members: usize,
    pub member_bytes: u64,
    pub nr_holes: usize,
    pub hole_bytes: u64,
    pub nr_bit_holes: usize,
    pub bit_hole_bits: u64,
    pub padding: u64,
    pub cachelines: u64,
    pub cacheline_size: u64,
}

impl LayoutView {
    pub fn build(
        unit: &CompilationUnit,
        s: &StructType,
        report: &LayoutReport,
        strings: &Strings,
        cacheline_size: u64,
    ) -> Self {
        let mut rows = Vec::with_capacity(s.members.len() * 2);
        let mut current_line = 0;

        for hole in report.holes.iter().filter(|h| h.after.is_none() && !h.nested) {
            rows.push(LayoutRow::Hole(hole.size));
        }

        for slot in &report.slots {
            let member = &s.members[slot.index];
            if cacheline_size > 0 && report.kind == LayoutKind::Struct {
                let line = slot.offset / cacheline_size;
                if line > current_line {
                    current_line = line;
                    rows.push(LayoutRow::CachelineBoundary(line));
                }
            }
            let name = match (member.name, member.kind) {
                (Some(n), _) => strings.get(n).to_string(),
                (None, MemberKind::Inheritance) => "<ancestor>".to_string(),
                (None, MemberKind::Field) => String::new(),
            };
            rows.push(LayoutRow::Member {
                type_name: unit.type_name(Some(member.type_id), strings),
                name,
                offset: slot.offset,
                size: slot.size,
                bits: member.bitfield.map(|bf| (bf.bit_offset, bf.bit_size)),
            });
            if let Some(bit_hole) = report.bit_hole_after(slot.index) {
                rows.push(LayoutRow::BitHole(bit_hole.bits));
            }
            if let Some(hole) = report.holes.iter().find(|h| h.after == Some(slot.index) && !h.nested) {
                rows.push(LayoutRow::Hole(hole.size));
            }
        }

        Self {
            keyword: report.kind.keyword(),
            name: s.name.map(|n| strings.get(n).to_string()),
            typedef_alias: None,
            decl: s.decl.map(|d| (strings.get(d.file).to_string(), d.line)),
            rows,
            size: s.size,
            nr_members: s.members.len(),
            member_bytes: report.member_bytes,
            nr_holes: report.nr_holes(),
            hole_bytes: report.holes.iter().map(|h| h.size).sum(),
            nr_bit_holes: report.nr_bit_holes(),
            bit_hole_bits: report.bit_hole_bits(),
            padding: report.padding_bytes(),
            cachelines: report.nr_cachelines(cacheline_size),
            cacheline_size,
        }
    }

    pub fn with_typedef_alias(mut self, alias: Option<String>) -> Self {
        self.typedef_alias = alias;
        self
    }

    pub fn display_name(&self) -> String {
        match (&self.name, &self.typedef_alias) {
            (Some(name), _) => name.clone(),
            (None, Some(alias)) => alias.clone(),
            (None, None) => String::new(),
        }
    }
}
