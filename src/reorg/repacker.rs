// Tue Jan 20 2026 - Alex

use crate::graph::{CompilationUnit, GraphError, Member, StructType, TypeId};
use crate::layout::{nr_cachelines, straddles, Alignment, LayoutAnalyzer, LayoutKind};
use crate::reorg::{PlacementGroup, ReorgError};
use itertools::Itertools;
use log::{debug, warn};
use std::cmp::Reverse;

/// Layout after one placement, for step-by-step tracing.
#[derive(Debug, Clone)]
pub struct ReorgStep {
    /// Declaration index of the member that was just placed.
    pub member: usize,
    pub offset: u64,
    pub layout: StructType,
}

/// A privately owned, reordered clone of a struct.
#[derive(Debug, Clone)]
pub struct Repacked {
    pub original_size: u64,
    pub clone: StructType,
    pub steps: Vec<ReorgStep>,
}

impl Repacked {
    pub fn new_size(&self) -> u64 {
        self.clone.size
    }

    pub fn savings(&self) -> u64 {
        self.original_size.saturating_sub(self.clone.size)
    }

    pub fn cacheline_savings(&self, cacheline_size: u64) -> u64 {
        nr_cachelines(self.original_size, cacheline_size)
            .saturating_sub(nr_cachelines(self.clone.size, cacheline_size))
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    offset: u64,
    grows: bool,
}

pub struct Repacker {
    cacheline_size: u64,
    trace: bool,
}

impl Repacker {
    pub fn new(cacheline_size: u64) -> Self {
        Self {
            cacheline_size,
            trace: false,
        }
    }

    /// Record the layout after every placement.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn repack(&self, unit: &CompilationUnit, id: TypeId) -> Result<Repacked, ReorgError> {
        let node = unit.resolve(id)?;
        let kind = LayoutKind::of(node).ok_or(GraphError::NotComposite(id))?;
        let s = unit.struct_type(id)?;
        self.repack_layout(unit, s, kind)
    }

    pub fn repack_layout(
        &self,
        unit: &CompilationUnit,
        s: &StructType,
        kind: LayoutKind,
    ) -> Result<Repacked, ReorgError> {
        let mut clone = CompilationUnit::clone_struct(s)?;
        let unchanged = |clone: StructType| Repacked {
            original_size: s.size,
            clone,
            steps: Vec::new(),
        };
        if kind == LayoutKind::Union || s.members.len() < 2 {
            return Ok(unchanged(clone));
        }

        let slots = LayoutAnalyzer::slots(unit, s)?;
        let (tail, movable): (Vec<PlacementGroup>, Vec<PlacementGroup>) =
            PlacementGroup::collect(&slots).into_iter().partition(|g| g.size == 0);
        let ordered = movable
            .into_iter()
            .sorted_by_key(|g| (Reverse(g.align), Reverse(g.size), g.first))
            .collect::<Vec<_>>();

        let mut placed: Vec<(u64, &PlacementGroup)> = Vec::with_capacity(ordered.len() + tail.len());
        let mut steps = Vec::new();
        let mut end = 0;
        for group in &ordered {
            let offset = self.choose_offset(&placed, end, group);
            placed.push((offset, group));
            end = end.max(offset + group.size);
            if self.trace {
                let layout = Self::materialize(s, &placed, Alignment::new(group.align).align(end));
                steps.push(ReorgStep {
                    member: group.first,
                    offset,
                    layout,
                });
            }
        }
        // zero-sized members (flexible arrays) stay at the end
        for group in &tail {
            let offset = Alignment::new(group.align).align(end);
            placed.push((offset, group));
            end = end.max(offset);
        }

        let new_size = Alignment::new(unit.struct_alignment(s)?).align(end);
        if new_size > s.size {
            warn!(
                "Reorganized layout would grow from {} to {} bytes, keeping original",
                s.size, new_size
            );
            return Ok(unchanged(clone));
        }

        clone.members = Self::materialize(s, &placed, new_size).members;
        clone.size = new_size;
        debug!("Repacked {} -> {} bytes", s.size, new_size);
        Ok(Repacked {
            original_size: s.size,
            clone,
            steps,
        })
    }

    fn free_gaps(placed: &[(u64, &PlacementGroup)]) -> Vec<(u64, u64)> {
        let mut gaps = Vec::new();
        let mut cursor = 0;
        for (offset, group) in placed.iter().sorted_by_key(|(offset, g)| (*offset, g.first)) {
            if *offset > cursor {
                gaps.push((cursor, *offset));
            }
            cursor = cursor.max(offset + group.size);
        }
        gaps
    }

    fn choose_offset(&self, placed: &[(u64, &PlacementGroup)], end: u64, group: &PlacementGroup) -> u64 {
        let align = Alignment::new(group.align);
        let mut candidates: Vec<Candidate> = Self::free_gaps(placed)
            .into_iter()
            .filter_map(|(start, stop)| {
                let offset = align.align(start);
                (offset + group.size <= stop).then_some(Candidate { offset, grows: false })
            })
            .collect();
        candidates.push(Candidate {
            offset: align.align(end),
            grows: true,
        });

        let best = candidates[0];
        let cacheline = self.cacheline_size;
        if cacheline == 0 || group.size > cacheline || !straddles(best.offset, group.size, cacheline) {
            return best.offset;
        }
        candidates
            .iter()
            .find(|c| c.grows == best.grows && !straddles(c.offset, group.size, cacheline))
            .map(|c| c.offset)
            .unwrap_or(best.offset)
    }

    fn materialize(s: &StructType, placed: &[(u64, &PlacementGroup)], size: u64) -> StructType {
        let members: Vec<Member> = placed
            .iter()
            .flat_map(|(offset, group)| {
                group
                    .members
                    .iter()
                    .map(move |&(index, rel)| (offset + rel, index))
            })
            .sorted()
            .map(|(offset, index)| {
                let mut member = s.members[index].clone();
                member.offset = offset;
                member
            })
            .collect();
        StructType {
            name: s.name,
            members,
            size,
            alignment: s.alignment,
            flags: s.flags,
            decl: s.decl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Strings, UnitBuilder};

    fn char_long_char() -> (Strings, CompilationUnit, TypeId) {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let long = b.base("long int", 8);
        let id = b
            .structure(Some("s"), 24)
            .member("a", ch, 0)
            .member("b", long, 8)
            .member("c", ch, 16)
            .build();
        let unit = b.finish();
        (strings, unit, id)
    }

    fn member_names(strings: &Strings, s: &StructType) -> Vec<(String, u64)> {
        s.members
            .iter()
            .map(|m| (strings.get(m.name.unwrap()).to_string(), m.offset))
            .collect()
    }

    #[test]
    fn test_repack_char_long_char() {
        let (strings, unit, id) = char_long_char();
        let repacked = Repacker::new(0).repack(&unit, id).unwrap();

        assert_eq!(repacked.new_size(), 16);
        assert_eq!(repacked.savings(), 8);
        assert_eq!(
            member_names(&strings, &repacked.clone),
            vec![("b".to_string(), 0), ("a".to_string(), 8), ("c".to_string(), 9)]
        );

        let report = LayoutAnalyzer::new()
            .analyze_layout(&unit, &repacked.clone, LayoutKind::Struct)
            .unwrap();
        assert_eq!(report.nr_holes(), 0);
        assert_eq!(report.padding_bytes(), 6);
        // the graph node is untouched
        assert_eq!(unit.struct_type(id).unwrap().size, 24);
    }

    #[test]
    fn test_optimal_layout_has_no_savings() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let long = b.base("long int", 8);
        let id = b
            .structure(Some("s"), 16)
            .member("b", long, 0)
            .member("a", ch, 8)
            .member("c", ch, 9)
            .build();
        let unit = b.finish();

        let repacked = Repacker::new(0).repack(&unit, id).unwrap();
        assert_eq!(repacked.savings(), 0);
        assert_eq!(repacked.new_size(), 16);
    }

    #[test]
    fn test_member_set_preserved() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let short = b.base("short int", 2);
        let int = b.base("int", 4);
        let ptr = b.pointer(None);
        let id = b
            .structure(Some("mix"), 32)
            .member("a", ch, 0)
            .member("p", ptr, 8)
            .member("s", short, 16)
            .member("i", int, 20)
            .member("b", ch, 24)
            .build();
        let unit = b.finish();

        let repacked = Repacker::new(0).repack(&unit, id).unwrap();
        let mut before = member_names(&strings, unit.struct_type(id).unwrap())
            .into_iter()
            .map(|(n, _)| n)
            .collect::<Vec<_>>();
        let mut after = member_names(&strings, &repacked.clone)
            .into_iter()
            .map(|(n, _)| n)
            .collect::<Vec<_>>();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        // p@0 i@8 s@12 a@14 b@15
        assert_eq!(repacked.new_size(), 16);
        assert_eq!(repacked.savings(), 16);
    }

    #[test]
    fn test_bitfields_stay_together() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let uint = b.base("unsigned int", 4);
        let long = b.base("long int", 8);
        let id = b
            .structure(Some("bits"), 24)
            .bitfield("x", uint, 0, 0, 4)
            .bitfield("y", uint, 0, 4, 4)
            .member("l", long, 8)
            .member("z", uint, 16)
            .build();
        let unit = b.finish();

        let repacked = Repacker::new(0).repack(&unit, id).unwrap();
        assert_eq!(repacked.new_size(), 16);
        let x = repacked.clone.members.iter().find(|m| strings.get(m.name.unwrap()) == "x").unwrap();
        let y = repacked.clone.members.iter().find(|m| strings.get(m.name.unwrap()) == "y").unwrap();
        assert_eq!(x.offset, y.offset);
        assert_eq!(y.bitfield.unwrap().bit_offset, 4);
    }

    #[test]
    fn test_flexible_array_stays_last() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let long = b.base("long int", 8);
        let flex = b.array(ch, &[0]);
        let id = b
            .structure(Some("msg"), 16)
            .member("len", ch, 0)
            .member("seq", long, 8)
            .member("data", flex, 16)
            .build();
        let unit = b.finish();

        let repacked = Repacker::new(0).repack(&unit, id).unwrap();
        let last = repacked.clone.members.last().unwrap();
        assert_eq!(strings.get(last.name.unwrap()), "data");
        assert!(repacked.new_size() <= 16);
    }

    #[test]
    fn test_union_is_not_reordered() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let long = b.base("long int", 8);
        let id = b.union(Some("u"), 8).member("c", ch, 0).member("l", long, 0).build();
        let unit = b.finish();

        let repacked = Repacker::new(64).repack(&unit, id).unwrap();
        assert_eq!(repacked.savings(), 0);
        assert_eq!(repacked.clone, *unit.struct_type(id).unwrap());
    }

    #[test]
    fn test_trace_does_not_change_result() {
        let (_strings, unit, id) = char_long_char();
        let plain = Repacker::new(0).repack(&unit, id).unwrap();
        let traced = Repacker::new(0).with_trace(true).repack(&unit, id).unwrap();

        assert_eq!(plain.clone, traced.clone);
        assert_eq!(traced.steps.len(), 3);
        assert_eq!(traced.steps[0].member, 1);
        assert_eq!(traced.steps[0].layout.members.len(), 1);
        assert!(plain.steps.is_empty());
    }

    #[test]
    fn test_cacheline_aware_hole_choice() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let int = b.base("int", 4);
        let long_double = b.base("long double", 10);
        let tag = b.array(ch, &[6]);
        let blk = b.structure(Some("blk"), 4).align(32).member("v", int, 0).build();
        let id = b
            .structure(Some("cl"), 96)
            .member("tag", tag, 0)
            .member("b0", blk, 32)
            .member("ld", long_double, 48)
            .member("b1", blk, 64)
            .build();
        let unit = b.finish();

        let offset_of = |repacked: &Repacked, name: &str| {
            repacked
                .clone
                .members
                .iter()
                .find(|m| strings.get(m.name.unwrap()) == name)
                .map(|m| m.offset)
                .unwrap()
        };

        // b0@0 b1@32 ld@16 leave gaps [4, 16) and [26, 32)
        let plain = Repacker::new(0).repack(&unit, id).unwrap();
        assert_eq!(offset_of(&plain, "ld"), 16);
        assert_eq!(offset_of(&plain, "tag"), 4);

        // 4..10 crosses an 8-byte line, 26..32 does not
        let aware = Repacker::new(8).repack(&unit, id).unwrap();
        assert_eq!(offset_of(&aware, "tag"), 26);
        assert_eq!(plain.new_size(), 64);
        assert_eq!(aware.new_size(), 64);
        assert_eq!(aware.savings(), 32);
    }
}
