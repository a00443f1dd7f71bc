//! The unit table: the only owner of unit state
//!
//! Units live in a dense vector addressed by [`UnitIndex`]. Removal is
//! swap-with-last-and-pop, so the last unit changes index; the returned
//! [`Relocation`] tells the caller which references to rebind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::UnitTemplate;
use crate::core::types::{Side, UnitId, UnitIndex, Vec2};
use crate::unit::model::Unit;
use crate::unit::state::Posture;

/// A unit that moved to a new index during removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub id: UnitId,
    pub from: UnitIndex,
    pub to: UnitIndex,
}

impl Relocation {
    /// Rebind an index held elsewhere after `removed` was swap-removed.
    ///
    /// Returns `None` when the reference pointed at the removed unit.
    pub fn rebind(relocation: Option<Relocation>, removed: UnitIndex, held: UnitIndex) -> Option<UnitIndex> {
        if held == removed {
            return None;
        }
        match relocation {
            Some(r) if r.from == held => Some(r.to),
            _ => Some(held),
        }
    }
}

/// Result of a removal
#[derive(Debug, Clone)]
pub struct Removal {
    pub unit: Unit,
    pub index: UnitIndex,
    pub relocation: Option<Relocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitTable {
    units: Vec<Unit>,
    index_of: BTreeMap<UnitId, UnitIndex>,
    next_id: u32,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and append a unit. Ids are never reused.
    pub fn spawn(&mut self, template: &UnitTemplate, side: Side, position: Vec2, posture: Posture) -> (UnitId, UnitIndex) {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        let index = UnitIndex(self.units.len());
        self.units.push(Unit::spawn(id, template, side, position, posture));
        self.index_of.insert(id, index);
        (id, index)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, index: UnitIndex) -> Option<&Unit> {
        self.units.get(index.0)
    }

    pub fn get_mut(&mut self, index: UnitIndex) -> Option<&mut Unit> {
        self.units.get_mut(index.0)
    }

    /// Current index of a stable id
    pub fn resolve(&self, id: UnitId) -> Option<UnitIndex> {
        self.index_of.get(&id).copied()
    }

    pub fn by_id(&self, id: UnitId) -> Option<&Unit> {
        self.resolve(id).and_then(|index| self.get(index))
    }

    pub fn by_id_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        let index = self.resolve(id)?;
        self.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Unit] {
        &self.units
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitIndex, &Unit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitIndex(i), u))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitIndex, &mut Unit)> {
        self.units.iter_mut().enumerate().map(|(i, u)| (UnitIndex(i), u))
    }

    /// Swap-remove the unit at `index`. Every holder of an index must be
    /// rebound with the returned relocation before the next tick.
    pub fn swap_remove(&mut self, index: UnitIndex) -> Option<Removal> {
        if index.0 >= self.units.len() {
            return None;
        }
        let last = UnitIndex(self.units.len() - 1);
        let unit = self.units.swap_remove(index.0);
        self.index_of.remove(&unit.id);

        let relocation = if index != last {
            let moved = &self.units[index.0];
            self.index_of.insert(moved.id, index);
            Some(Relocation { id: moved.id, from: last, to: index })
        } else {
            None
        };

        Some(Removal { unit, index, relocation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;

    fn table_of(n: usize) -> UnitTable {
        let content = Content::standard().unwrap();
        let template = content.template("rifleman").unwrap();
        let mut table = UnitTable::new();
        for i in 0..n {
            table.spawn(template, Side(0), Vec2::new(i as f32, 0.0), Posture::Standing);
        }
        table
    }

    #[test]
    fn test_ids_are_stable_and_fresh() {
        let mut table = table_of(3);
        let removed = table.swap_remove(UnitIndex(0)).unwrap();
        assert_eq!(removed.unit.id, UnitId(0));

        let content = Content::standard().unwrap();
        let (id, index) = table.spawn(content.template("scout").unwrap(), Side(1), Vec2::ZERO, Posture::Standing);
        assert_eq!(id, UnitId(3));
        assert_eq!(index, UnitIndex(2));
        assert_eq!(table.resolve(UnitId(0)), None);
    }

    #[test]
    fn test_remove_index_three_of_ten_relocates_last() {
        let mut table = table_of(10);
        let nine = table.get(UnitIndex(9)).unwrap().id;

        let removal = table.swap_remove(UnitIndex(3)).unwrap();

        assert_eq!(
            removal.relocation,
            Some(Relocation { id: nine, from: UnitIndex(9), to: UnitIndex(3) })
        );
        assert_eq!(table.resolve(nine), Some(UnitIndex(3)));
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_remove_last_has_no_relocation() {
        let mut table = table_of(4);
        let removal = table.swap_remove(UnitIndex(3)).unwrap();
        assert_eq!(removal.relocation, None);
        assert!(table.swap_remove(UnitIndex(7)).is_none());
    }

    #[test]
    fn test_rebind() {
        let r = Some(Relocation { id: UnitId(9), from: UnitIndex(9), to: UnitIndex(3) });
        assert_eq!(Relocation::rebind(r, UnitIndex(3), UnitIndex(9)), Some(UnitIndex(3)));
        assert_eq!(Relocation::rebind(r, UnitIndex(3), UnitIndex(3)), None);
        assert_eq!(Relocation::rebind(r, UnitIndex(3), UnitIndex(5)), Some(UnitIndex(5)));
    }
}
