//! Repeating-section layout
//!
//! Forms with repeating entries (employers, diagnoses) describe each capacity
//! unit as an [`EntrySlot`]: a page, an anchor `base_y`, and a
//! [`CoordinateDeltaTable`] of named vertical offsets from that anchor. The
//! same logical field set is reused across slots that sit at very different
//! physical positions; only the anchor, and where the printed layout drifts,
//! the delta table, changes.

use crate::warning::{Warning, Warnings};

/// Named vertical offsets relative to an entry's anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateDeltaTable {
    offsets: &'static [(&'static str, f32)],
}

impl CoordinateDeltaTable {
    pub const fn new(offsets: &'static [(&'static str, f32)]) -> Self {
        Self { offsets }
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.offsets
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, offset)| *offset)
    }
}

/// One capacity unit of a repeating section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySlot {
    pub page: usize,
    pub base_y: f32,
    pub deltas: CoordinateDeltaTable,
}

impl EntrySlot {
    pub const fn new(page: usize, base_y: f32, deltas: CoordinateDeltaTable) -> Self {
        Self {
            page,
            base_y,
            deltas,
        }
    }

    /// Absolute y of a named field group, or `None` if this slot's layout has
    /// no such group.
    pub fn y(&self, key: &str) -> Option<f32> {
        self.deltas.get(key).map(|d| self.base_y + d)
    }
}

/// Pair entries with slots positionally. Entries beyond the slot count are
/// dropped and reported as [`Warning::EntriesDropped`].
pub fn assign_entries<'a, T>(
    entries: &'a [T],
    slots: &'a [EntrySlot],
    section: &str,
    warnings: &mut Warnings,
) -> Vec<(&'a EntrySlot, &'a T)> {
    if entries.len() > slots.len() {
        let dropped = entries.len() - slots.len();
        tracing::debug!(section, capacity = slots.len(), dropped, "section over capacity");
        warnings.push(Warning::EntriesDropped {
            section: section.to_string(),
            capacity: slots.len(),
            dropped,
        });
    }
    slots.iter().zip(entries.iter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOP: CoordinateDeltaTable =
        CoordinateDeltaTable::new(&[("dates", 0.0), ("facility", -42.0), ("duties", -180.0)]);
    const LOWER: CoordinateDeltaTable =
        CoordinateDeltaTable::new(&[("dates", 0.0), ("facility", -37.0)]);

    const SLOTS: [EntrySlot; 3] = [
        EntrySlot::new(0, 468.0, TOP),
        EntrySlot::new(1, 761.0, LOWER),
        EntrySlot::new(1, 460.0, LOWER),
    ];

    #[test]
    fn test_slot_y_adds_base() {
        assert_eq!(SLOTS[0].y("facility"), Some(426.0));
        assert_eq!(SLOTS[2].y("facility"), Some(423.0));
        assert_eq!(SLOTS[1].y("duties"), None);
    }

    #[test]
    fn test_delta_table_lookup() {
        assert_eq!(TOP.get("duties"), Some(-180.0));
        assert_eq!(LOWER.get("duties"), None);
    }

    #[test]
    fn test_assign_within_capacity() {
        let mut warnings = Warnings::new();
        let entries = ["a", "b"];
        let assigned = assign_entries(&entries, &SLOTS, "employers", &mut warnings);
        assert_eq!(assigned.len(), 2);
        assert_eq!(assigned[1].0.page, 1);
        assert_eq!(*assigned[1].1, "b");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_assign_over_capacity_warns() {
        let mut warnings = Warnings::new();
        let entries = ["a", "b", "c", "d", "e"];
        let assigned = assign_entries(&entries, &SLOTS, "employers", &mut warnings);
        assert_eq!(
            assigned.iter().map(|(_, e)| **e).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            warnings.into_vec(),
            vec![Warning::EntriesDropped {
                section: "employers".to_string(),
                capacity: 3,
                dropped: 2,
            }]
        );
    }
}
