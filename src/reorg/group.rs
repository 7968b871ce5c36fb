// Tue Jan 20 2026 - Alex

use crate::layout::MemberSlot;

/// Members that must move together: a bitfield storage unit, or anything
/// overlapping it. Relative offsets inside the group are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlacementGroup {
    pub first: usize,
    pub members: Vec<(usize, u64)>,
    pub size: u64,
    pub align: u64,
}

impl PlacementGroup {
    pub fn collect(slots: &[MemberSlot]) -> Vec<Self> {
        let mut groups: Vec<PlacementGroup> = Vec::new();
        let mut base = 0;
        let mut end = 0;
        for slot in slots {
            let joins = match groups.last() {
                Some(_) => slot.offset < end && slot.offset >= base && slot.size > 0,
                None => false,
            };
            if let (true, Some(group)) = (joins, groups.last_mut()) {
                group.members.push((slot.index, slot.offset - base));
                end = end.max(slot.end());
                group.size = end - base;
                group.align = group.align.max(slot.align);
                continue;
            }
            base = slot.offset;
            end = slot.end();
            groups.push(PlacementGroup {
                first: slot.index,
                members: vec![(slot.index, 0)],
                size: slot.size,
                align: slot.align.max(1),
            });
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(index: usize, offset: u64, size: u64, align: u64) -> MemberSlot {
        MemberSlot {
            index,
            offset,
            size,
            align,
            bitfield: None,
        }
    }

    #[test]
    fn test_disjoint_members_form_singletons() {
        let groups = PlacementGroup::collect(&[slot(0, 0, 1, 1), slot(1, 8, 8, 8), slot(2, 16, 1, 1)]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].first, 1);
        assert_eq!(groups[1].align, 8);
    }

    #[test]
    fn test_overlapping_members_share_a_group() {
        // int a:4 at 0, char b at 1 inside a's storage
        let groups = PlacementGroup::collect(&[slot(0, 0, 4, 4), slot(1, 1, 1, 1), slot(2, 4, 4, 4)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![(0, 0), (1, 1)]);
        assert_eq!(groups[0].size, 4);
    }
}
