// Mon Jan 19 2026 - Alex

use crate::graph::{BitField, CompilationUnit, GraphError, MemberKind, StructType, TypeId, TypeNode};
use crate::layout::alignment::{nr_cachelines, straddles};
use crate::layout::{BitHole, Hole};
use log::{trace, warn};

const MAX_NESTING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Struct,
    Union,
}

impl LayoutKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }

    pub fn of(node: &TypeNode) -> Option<Self> {
        match node {
            TypeNode::Struct(_) => Some(Self::Struct),
            TypeNode::Union(_) => Some(Self::Union),
            _ => None,
        }
    }
}

/// A member with its type's size and alignment resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSlot {
    /// Declaration index within the owning struct.
    pub index: usize,
    pub offset: u64,
    pub size: u64,
    pub align: u64,
    pub bitfield: Option<BitField>,
}

impl MemberSlot {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Absolute `[start, end)` bit range of a bitfield member.
    pub fn bit_range(&self) -> Option<(u64, u64)> {
        self.bitfield.map(|bf| {
            let start = self.offset * 8 + bf.bit_offset as u64;
            (start, start + bf.bit_size as u64)
        })
    }
}

#[derive(Debug, Clone)]
pub struct LayoutReport {
    pub kind: LayoutKind,
    pub size: u64,
    pub alignment: u64,
    pub slots: Vec<MemberSlot>,
    pub holes: Vec<Hole>,
    pub bit_holes: Vec<BitHole>,
    /// Trailing padding after the last member.
    pub padding: Option<Hole>,
    /// Bytes occupied by members, shared storage counted once.
    pub member_bytes: u64,
}

impl LayoutReport {
    pub fn nr_holes(&self) -> usize {
        self.holes.len()
    }

    pub fn nr_bit_holes(&self) -> usize {
        self.bit_holes.len()
    }

    /// Bytes in holes between this layout's own members.
    pub fn hole_bytes(&self) -> u64 {
        self.holes.iter().filter(|h| !h.nested).map(|h| h.size).sum()
    }

    pub fn bit_hole_bits(&self) -> u64 {
        self.bit_holes.iter().map(|h| h.bits).sum()
    }

    pub fn padding_bytes(&self) -> u64 {
        self.padding.map(|p| p.size).unwrap_or(0)
    }

    pub fn has_hole_at_least(&self, size: u64) -> bool {
        self.holes.iter().any(|h| h.size >= size)
    }

    pub fn nr_cachelines(&self, cacheline_size: u64) -> u64 {
        nr_cachelines(self.size, cacheline_size)
    }

    /// Declaration indices of members that straddle a cacheline boundary.
    pub fn cacheline_crossings(&self, cacheline_size: u64) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|s| s.bitfield.is_none() && straddles(s.offset, s.size, cacheline_size))
            .map(|s| s.index)
            .collect()
    }

    /// Members, holes and padding add up to the declared size.
    pub fn is_accounted(&self) -> bool {
        self.member_bytes + self.hole_bytes() + self.padding_bytes() == self.size
    }

    pub fn bit_hole_after(&self, index: usize) -> Option<&BitHole> {
        self.bit_holes.iter().find(|h| h.after == Some(index))
    }
}

#[derive(Default)]
struct HoleScan {
    cursor: u64,
    member_bytes: u64,
    last: Option<usize>,
    holes: Vec<Hole>,
    bit_holes: Vec<BitHole>,
}

impl HoleScan {
    fn occupy(&mut self, start: u64, end: u64) {
        if end > self.cursor {
            self.member_bytes += end - start.max(self.cursor);
            self.cursor = end;
        }
    }

    fn place(&mut self, slot: &MemberSlot) {
        if slot.offset > self.cursor {
            self.holes.push(Hole::new(self.cursor, slot.offset - self.cursor, self.last));
        }
        self.occupy(slot.offset, slot.end());
        self.last = Some(slot.index);
    }

    /// A run of consecutive bitfields, measured in absolute bits. Storage
    /// ends at the last byte a bitfield touches; whole unused bytes between
    /// bitfields are byte holes, as between plain members.
    fn place_bitfields(&mut self, group: &[MemberSlot]) {
        let mut ranges: Vec<(u64, u64, usize)> = group
            .iter()
            .filter_map(|s| s.bit_range().map(|(start, end)| (start, end, s.index)))
            .collect();
        ranges.sort_by_key(|&(start, _, index)| (start, index));

        let first_byte = match ranges.first() {
            Some(&(start, _, _)) => start / 8,
            None => return,
        };
        if first_byte > self.cursor {
            self.holes.push(Hole::new(self.cursor, first_byte - self.cursor, self.last));
            self.cursor = first_byte;
        }

        // a bitfield may share its first byte with the previous member
        let mut bit_cursor = if first_byte < self.cursor {
            ranges[0].0.max(self.cursor * 8)
        } else {
            first_byte * 8
        };
        let mut run_start = bit_cursor / 8;
        for &(start, end, index) in &ranges {
            if start > bit_cursor {
                let run_end = (bit_cursor + 7) / 8;
                let next_byte = start / 8;
                if next_byte > run_end {
                    self.close_bit_run(run_start, bit_cursor);
                    self.holes.push(Hole::new(run_end, next_byte - run_end, self.last));
                    run_start = next_byte;
                    bit_cursor = next_byte * 8;
                }
                if start > bit_cursor {
                    self.bit_holes.push(BitHole::new(bit_cursor, start - bit_cursor, self.last));
                }
            }
            bit_cursor = bit_cursor.max(end);
            self.last = Some(index);
        }
        self.close_bit_run(run_start, bit_cursor);
    }

    fn close_bit_run(&mut self, start_byte: u64, bit_cursor: u64) {
        let end_byte = (bit_cursor + 7) / 8;
        let tail_bits = end_byte * 8 - bit_cursor;
        if tail_bits > 0 {
            self.bit_holes.push(BitHole::new(bit_cursor, tail_bits, self.last));
        }
        self.occupy(start_byte, end_byte);
    }
}

/// Finds holes, bit holes and padding in struct and union layouts.
pub struct LayoutAnalyzer {
    flatten_anonymous: bool,
}

impl LayoutAnalyzer {
    pub fn new() -> Self {
        Self {
            flatten_anonymous: true,
        }
    }

    pub fn with_flatten_anonymous(mut self, flatten: bool) -> Self {
        self.flatten_anonymous = flatten;
        self
    }

    pub fn analyze(&self, unit: &CompilationUnit, id: TypeId) -> Result<LayoutReport, GraphError> {
        let node = unit.resolve(id)?;
        let kind = LayoutKind::of(node).ok_or(GraphError::NotComposite(id))?;
        let s = node.as_composite().ok_or(GraphError::NotComposite(id))?;
        self.analyze_layout(unit, s, kind)
    }

    /// Works on detached clones as well as on graph nodes.
    pub fn analyze_layout(
        &self,
        unit: &CompilationUnit,
        s: &StructType,
        kind: LayoutKind,
    ) -> Result<LayoutReport, GraphError> {
        self.analyze_depth(unit, s, kind, 0)
    }

    pub fn slots(unit: &CompilationUnit, s: &StructType) -> Result<Vec<MemberSlot>, GraphError> {
        s.members
            .iter()
            .enumerate()
            .map(|(index, m)| {
                Ok(MemberSlot {
                    index,
                    offset: m.offset,
                    size: unit.type_size(m.type_id)?,
                    align: unit.type_alignment(m.type_id)?,
                    bitfield: m.bitfield,
                })
            })
            .collect()
    }

    fn analyze_depth(
        &self,
        unit: &CompilationUnit,
        s: &StructType,
        kind: LayoutKind,
        depth: usize,
    ) -> Result<LayoutReport, GraphError> {
        let slots = Self::slots(unit, s)?;
        let mut scan = HoleScan::default();

        match kind {
            LayoutKind::Struct => {
                let mut i = 0;
                while i < slots.len() {
                    if slots[i].bitfield.is_some() {
                        let mut j = i + 1;
                        while j < slots.len() && slots[j].bitfield.is_some() {
                            j += 1;
                        }
                        scan.place_bitfields(&slots[i..j]);
                        i = j;
                    } else {
                        scan.place(&slots[i]);
                        i += 1;
                    }
                }
            }
            LayoutKind::Union => {
                for slot in &slots {
                    scan.occupy(0, slot.end());
                    scan.last = Some(slot.index);
                }
            }
        }

        let padding = if s.size > scan.cursor {
            Some(Hole::new(scan.cursor, s.size - scan.cursor, scan.last))
        } else {
            if scan.cursor > s.size && s.size > 0 {
                warn!("Members end at {} past declared size {}", scan.cursor, s.size);
            }
            None
        };

        if self.flatten_anonymous && depth < MAX_NESTING {
            self.flatten_nested(unit, s, depth, &mut scan)?;
        }

        trace!(
            "{} layout: {} holes, {} bit holes, padding {:?}",
            kind.keyword(),
            scan.holes.len(),
            scan.bit_holes.len(),
            padding.map(|p| p.size)
        );

        Ok(LayoutReport {
            kind,
            size: s.size,
            alignment: unit.struct_alignment(s)?,
            slots,
            holes: scan.holes,
            bit_holes: scan.bit_holes,
            padding,
            member_bytes: scan.member_bytes,
        })
    }

    fn flatten_nested(
        &self,
        unit: &CompilationUnit,
        s: &StructType,
        depth: usize,
        scan: &mut HoleScan,
    ) -> Result<(), GraphError> {
        for member in &s.members {
            if member.name.is_some() || member.kind != MemberKind::Field {
                continue;
            }
            let inner_id = match unit.strip(member.type_id)? {
                Some(id) => id,
                None => continue,
            };
            let node = unit.resolve(inner_id)?;
            let (inner, kind) = match (node.as_composite(), LayoutKind::of(node)) {
                (Some(inner), Some(kind)) if inner.is_anonymous() => (inner, kind),
                _ => continue,
            };
            let report = self.analyze_depth(unit, inner, kind, depth + 1)?;
            scan.holes
                .extend(report.holes.iter().chain(report.padding.iter()).map(|h| h.shifted(member.offset)));
            scan.bit_holes
                .extend(report.bit_holes.iter().map(|h| h.shifted(member.offset)));
        }
        Ok(())
    }
}

impl Default for LayoutAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
