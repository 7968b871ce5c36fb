// Tue Jan 20 2026 - Alex

use crate::graph::{CompilationUnit, NameId, Strings, TypeId, TypeNode};
use crate::layout::{Alignment, LayoutAnalyzer};
use crate::reorg::PlacementGroup;
use crate::resize::ResizeError;
use log::{debug, info, trace};

pub const LONG_INT: &str = "long int";
pub const LONG_UNSIGNED_INT: &str = "long unsigned int";

/// Interned names of the base types whose width follows the word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTypes {
    long_int: NameId,
    long_unsigned_int: NameId,
}

impl LongTypes {
    pub fn find(strings: &Strings) -> Result<Self, ResizeError> {
        match (strings.lookup(LONG_INT), strings.lookup(LONG_UNSIGNED_INT)) {
            (Some(long_int), Some(long_unsigned_int)) => Ok(Self {
                long_int,
                long_unsigned_int,
            }),
            _ => Err(ResizeError::MissingLongType),
        }
    }

    pub fn matches(&self, name: NameId) -> bool {
        name == self.long_int || name == self.long_unsigned_int
    }
}

/// Per-type record of one resize run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeMemo {
    pub visited: bool,
    /// Signed size change; `None` while the type is still being resized.
    delta: Option<i64>,
}

impl ResizeMemo {
    pub fn size_delta(&self) -> u64 {
        self.delta.unwrap_or(0).unsigned_abs()
    }

    pub fn signed_delta(&self) -> i64 {
        self.delta.unwrap_or(0)
    }

}

#[derive(Debug, Clone)]
pub struct ResizeOutcome {
    pub original_word_size: u8,
    pub word_size: u8,
    memo: Vec<ResizeMemo>,
}

impl ResizeOutcome {
    pub fn memo(&self, id: TypeId) -> Option<&ResizeMemo> {
        self.memo.get(id.index())
    }

    pub fn size_delta(&self, id: TypeId) -> u64 {
        self.memo(id).map(|m| m.size_delta()).unwrap_or(0)
    }

    /// Number of structs and unions whose size changed.
    pub fn nr_resized(&self) -> usize {
        self.memo.iter().filter(|m| m.signed_delta() != 0).count()
    }
}

/// Simulates a different pointer width over a unit's type graph, in place.
pub struct WordResizer {
    word_size: u8,
    long_types: LongTypes,
}

impl WordResizer {
    /// Fails fast when the long base types were never seen.
    pub fn new(word_size: u8, strings: &Strings) -> Result<Self, ResizeError> {
        if word_size == 0 || word_size > 16 || !word_size.is_power_of_two() {
            return Err(ResizeError::InvalidWordSize(word_size));
        }
        Ok(Self {
            word_size,
            long_types: LongTypes::find(strings)?,
        })
    }

    pub fn word_size(&self) -> u8 {
        self.word_size
    }

    pub fn resize(&self, unit: &mut CompilationUnit) -> Result<ResizeOutcome, ResizeError> {
        let original = unit.addr_size();
        info!("Resizing {} from word size {} to {}", unit.name(), original, self.word_size);
        unit.set_addr_size(self.word_size);

        let mut run = ResizeRun {
            memo: vec![ResizeMemo::default(); unit.len()],
            unit,
            long_types: self.long_types,
            word_diff: self.word_size as i64 - original as i64,
        };
        run.rewrite_long_base_types(self.word_size)?;

        let ids: Vec<TypeId> = run.unit.type_ids().collect();
        for id in ids {
            match run.unit.resolve(id)? {
                TypeNode::Struct(_) => run.resize_struct(id)?,
                TypeNode::Union(_) => run.resize_union(id)?,
                _ => {}
            }
        }

        Ok(ResizeOutcome {
            original_word_size: original,
            word_size: self.word_size,
            memo: run.memo,
        })
    }
}

struct ResizeRun<'u> {
    unit: &'u mut CompilationUnit,
    long_types: LongTypes,
    word_diff: i64,
    memo: Vec<ResizeMemo>,
}

impl<'u> ResizeRun<'u> {
    fn rewrite_long_base_types(&mut self, word_size: u8) -> Result<(), ResizeError> {
        let ids: Vec<TypeId> = self.unit.type_ids().collect();
        for id in ids {
            if let TypeNode::Base(base) = self.unit.resolve_mut(id)? {
                if self.long_types.matches(base.name) {
                    base.bit_size = word_size as u32 * 8;
                }
            }
        }
        Ok(())
    }

    /// Strips typedefs and qualifiers and unwraps arrays, returning the
    /// element type and how many instances of it the member holds.
    fn effective_type(&self, id: TypeId) -> Result<(Option<TypeId>, u64), ResizeError> {
        let mut count = 1u64;
        let mut current = self.unit.strip(id)?;
        while let Some(ty) = current {
            let (elements, element) = match self.unit.resolve(ty)? {
                TypeNode::Array(a) => (a.element_count(), a.element),
                _ => break,
            };
            let elements = elements
                .ok_or_else(|| self.unit.invalid(format!("array {} has too many elements", ty)))?;
            count = count.saturating_mul(elements);
            current = self.unit.strip(element)?;
        }
        Ok((current, count))
    }

    fn per_instance_diff(&mut self, id: Option<TypeId>) -> Result<i64, ResizeError> {
        let id = match id {
            Some(id) => id,
            None => return Ok(0),
        };
        let diff = match self.unit.resolve(id)? {
            TypeNode::Pointer(_) => self.word_diff,
            TypeNode::Base(base) if self.long_types.matches(base.name) => self.word_diff,
            TypeNode::Struct(_) => {
                self.resize_struct(id)?;
                self.memo[id.index()].signed_delta()
            }
            TypeNode::Union(_) => {
                self.resize_union(id)?;
                self.memo[id.index()].signed_delta()
            }
            _ => 0,
        };
        Ok(diff)
    }

    fn member_diffs(&mut self, id: TypeId) -> Result<Vec<i64>, ResizeError> {
        let types: Vec<TypeId> = self.unit.struct_type(id)?.members.iter().map(|m| m.type_id).collect();
        let mut diffs = Vec::with_capacity(types.len());
        for ty in types {
            let (element, count) = self.effective_type(ty)?;
            let diff = self.per_instance_diff(element)?;
            diffs.push(diff.saturating_mul(count as i64));
        }
        Ok(diffs)
    }

    fn resize_struct(&mut self, id: TypeId) -> Result<(), ResizeError> {
        // a type met again while still in progress contributes 0
        if self.memo[id.index()].visited {
            return Ok(());
        }
        self.memo[id.index()].visited = true;

        let diffs = self.member_diffs(id)?;
        let s = self.unit.struct_type_mut(id)?;
        let original_size = s.size;
        let mut changed = false;
        let mut i = 0;
        while i < diffs.len() {
            // bitfields sharing one storage unit resize it once
            let mut last = i;
            while last + 1 < s.members.len()
                && s.members[last + 1].is_bitfield()
                && s.members[i].is_bitfield()
                && s.members[last + 1].offset == s.members[i].offset
            {
                last += 1;
            }
            let diff = diffs[i];
            if diff != 0 {
                s.size = (s.size as i64 + diff).max(0) as u64;
                // grown members must not overlap their successors when regrouped
                s.shift_offsets_after(last, diff);
                changed = true;
            }
            i = last + 1;
        }

        if changed {
            self.fixup_alignment(id)?;
        }
        let new_size = self.unit.struct_type(id)?.size;
        let delta = new_size as i64 - original_size as i64;
        if delta != 0 {
            debug!("struct {} resized {} -> {}", id, original_size, new_size);
        }
        self.memo[id.index()].delta = Some(delta);
        Ok(())
    }

    /// Re-lays members in declaration order at their new natural alignment.
    fn fixup_alignment(&mut self, id: TypeId) -> Result<(), ResizeError> {
        let s = self.unit.struct_type(id)?;
        let slots = LayoutAnalyzer::slots(self.unit, s)?;
        let groups = PlacementGroup::collect(&slots);
        let struct_align = Alignment::new(self.unit.struct_alignment(s)?);

        let mut offsets = vec![0u64; s.members.len()];
        let mut cursor = 0u64;
        for group in &groups {
            let base = Alignment::new(group.align).align(cursor);
            for &(index, rel) in &group.members {
                offsets[index] = base + rel;
            }
            cursor = base + group.size;
        }
        let size = struct_align.align(cursor);
        trace!("struct {} realigned to {} bytes", id, size);

        let s = self.unit.struct_type_mut(id)?;
        for (member, offset) in s.members.iter_mut().zip(offsets) {
            member.offset = offset;
        }
        s.size = size;
        Ok(())
    }

    fn resize_union(&mut self, id: TypeId) -> Result<(), ResizeError> {
        if self.memo[id.index()].visited {
            return Ok(());
        }
        self.memo[id.index()].visited = true;

        let diffs = self.member_diffs(id)?;
        let s = self.unit.struct_type(id)?;
        let original_size = s.size;
        let mut new_size = original_size;
        if diffs.iter().any(|&d| d != 0) {
            let mut max_size = 0;
            for member in &s.members {
                max_size = max_size.max(self.unit.type_size(member.type_id)?);
            }
            new_size = Alignment::new(self.unit.struct_alignment(s)?).align(max_size);
            self.unit.struct_type_mut(id)?.size = new_size;
        }
        self.memo[id.index()].delta = Some(new_size as i64 - original_size as i64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphError, UnitBuilder};

    fn strings_with_longs() -> Strings {
        let mut strings = Strings::new();
        strings.intern(LONG_INT);
        strings.intern(LONG_UNSIGNED_INT);
        strings
    }

    #[test]
    fn test_single_long_shrinks() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let long = b.base(LONG_INT, 8);
        let id = b.structure(Some("one"), 8).member("l", long, 0).build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        assert_eq!(outcome.size_delta(id), 4);
        assert_eq!(unit.struct_type(id).unwrap().size, 4);
        assert_eq!(unit.type_size(long).unwrap(), 4);
        assert_eq!(unit.addr_size(), 4);
    }

    #[test]
    fn test_non_long_struct_unchanged() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let int = b.base("int", 4);
        let id = b
            .structure(Some("plain"), 12)
            .member("c", ch, 0)
            .member("i", int, 4)
            .member("d", ch, 8)
            .build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        assert_eq!(outcome.size_delta(id), 0);
        assert_eq!(unit.struct_type(id).unwrap().size, 12);
        assert_eq!(outcome.nr_resized(), 0);
    }

    #[test]
    fn test_holes_collapse_after_shrink() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let ulong = b.base(LONG_UNSIGNED_INT, 8);
        let ptr = b.pointer(Some(ch));
        let arr = b.array(ulong, &[2]);
        let id = b
            .structure(Some("mixed"), 40)
            .member("c", ch, 0)
            .member("p", ptr, 8)
            .member("v", arr, 16)
            .member("d", ch, 32)
            .build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        let s = unit.struct_type(id).unwrap();
        let offsets: Vec<u64> = s.members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16]);
        assert_eq!(s.size, 20);
        assert_eq!(outcome.size_delta(id), 20);
    }

    #[test]
    fn test_grow_to_64bit() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 4, &mut strings);
        let int = b.base("int", 4);
        let long = b.base(LONG_INT, 4);
        let id = b.structure(Some("s"), 8).member("i", int, 0).member("l", long, 4).build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(8, &strings).unwrap().resize(&mut unit).unwrap();
        let s = unit.struct_type(id).unwrap();
        assert_eq!(s.members[1].offset, 8);
        assert_eq!(s.size, 16);
        assert_eq!(outcome.size_delta(id), 8);
    }

    #[test]
    fn test_grown_long_keeps_next_member_separate() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 4, &mut strings);
        let long = b.base(LONG_INT, 4);
        let int = b.base("int", 4);
        let id = b.structure(Some("s"), 8).member("l", long, 0).member("i", int, 4).build();
        let mut unit = b.finish();

        WordResizer::new(8, &strings).unwrap().resize(&mut unit).unwrap();
        let s = unit.struct_type(id).unwrap();
        assert_eq!(s.members.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![0, 8]);
        assert_eq!(s.size, 16);
    }

    #[test]
    fn test_oversized_array_member_is_an_error() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let long = b.base(LONG_INT, 8);
        let arr = b.array(long, &[1 << 40, 1 << 40]);
        b.structure(Some("big"), 8).member("v", arr, 0).build();
        let mut unit = b.finish();

        let err = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap_err();
        assert!(matches!(err, ResizeError::Graph(GraphError::InvalidUnit { .. })));
    }

    #[test]
    fn test_nested_struct_and_union() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let int = b.base("int", 4);
        let long = b.base(LONG_INT, 8);
        let inner = b.structure(Some("inner"), 16).member("a", long, 0).member("b", long, 8).build();
        let un = b.union(Some("u"), 8).member("i", int, 0).member("l", long, 0).build();
        let outer = b
            .structure(Some("outer"), 32)
            .member("in", inner, 0)
            .member("u", un, 16)
            .member("x", int, 24)
            .build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        assert_eq!(unit.struct_type(inner).unwrap().size, 8);
        assert_eq!(unit.struct_type(un).unwrap().size, 4);
        assert_eq!(outcome.size_delta(un), 4);
        let s = unit.struct_type(outer).unwrap();
        assert_eq!(s.members.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![0, 8, 12]);
        assert_eq!(s.size, 16);
    }

    #[test]
    fn test_self_referential_struct_terminates() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let long = b.base(LONG_INT, 8);
        let node = b.forward_struct(Some("node"));
        let next = b.pointer(Some(node));
        b.complete_struct(node).size(16).member("next", next, 0).member("val", long, 8).build();
        let mut unit = b.finish();

        let outcome = WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        assert_eq!(unit.struct_type(node).unwrap().size, 8);
        let memo = outcome.memo(node).unwrap();
        assert!(memo.visited);
        assert_eq!(memo.size_delta(), 8);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let long = b.base(LONG_INT, 8);
        let id = b.structure(Some("s"), 16).member("c", ch, 0).member("l", long, 8).build();
        let mut unit = b.finish();

        let resizer = WordResizer::new(4, &strings).unwrap();
        resizer.resize(&mut unit).unwrap();
        let first = unit.struct_type(id).unwrap().clone();
        let outcome = resizer.resize(&mut unit).unwrap();
        assert_eq!(*unit.struct_type(id).unwrap(), first);
        assert_eq!(outcome.size_delta(id), 0);
        assert_eq!(first.size, 8);
    }

    #[test]
    fn test_missing_long_types_fail_fast() {
        let mut strings = Strings::new();
        strings.intern(LONG_INT);
        let err = WordResizer::new(4, &strings).err().unwrap();
        assert!(matches!(err, ResizeError::MissingLongType));
    }

    #[test]
    fn test_invalid_word_size() {
        let strings = strings_with_longs();
        assert!(matches!(WordResizer::new(3, &strings), Err(ResizeError::InvalidWordSize(3))));
        assert!(matches!(WordResizer::new(0, &strings), Err(ResizeError::InvalidWordSize(0))));
    }

    #[test]
    fn test_long_bitfields_resize_storage_once() {
        let mut strings = strings_with_longs();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ulong = b.base(LONG_UNSIGNED_INT, 8);
        let int = b.base("int", 4);
        let id = b
            .structure(Some("flags"), 16)
            .bitfield("a", ulong, 0, 0, 3)
            .bitfield("b", ulong, 0, 3, 5)
            .member("n", int, 8)
            .build();
        let mut unit = b.finish();

        WordResizer::new(4, &strings).unwrap().resize(&mut unit).unwrap();
        let s = unit.struct_type(id).unwrap();
        assert_eq!(s.members[0].offset, s.members[1].offset);
        assert_eq!(s.members[2].offset, 4);
        assert_eq!(s.size, 8);
    }
}
