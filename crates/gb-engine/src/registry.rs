//! The set of live machines, in registration order.

use gb_ir::{ConnectionKind, MachineId};
use slotmap::SlotMap;

use crate::unit::Unit;

/// Longest base used for generated names.
const NAME_BASE_LEN: usize = 12;
/// Suffixes tried before giving up on a unique name.
const NAME_ATTEMPTS: u32 = 9999;

/// Owns every machine instance.
///
/// Handles stay stable across insertions and removals; `order` keeps the
/// registration order used for ticking and evaluation.
#[derive(Default)]
pub struct Registry {
    units: SlotMap<MachineId, Unit>,
    order: Vec<MachineId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, unit: Unit) -> MachineId {
        let id = self.units.insert(unit);
        self.order.push(id);
        id
    }

    pub(crate) fn remove(&mut self, id: MachineId) -> Option<Unit> {
        let unit = self.units.remove(id)?;
        self.order.retain(|&o| o != id);
        Some(unit)
    }

    pub fn get(&self, id: MachineId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: MachineId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    pub fn contains(&self, id: MachineId) -> bool {
        self.units.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Handles in registration order.
    pub fn order(&self) -> &[MachineId] {
        &self.order
    }

    /// Storage and order borrowed separately, for passes that walk the
    /// order while mutating units.
    pub(crate) fn split_mut(&mut self) -> (&mut SlotMap<MachineId, Unit>, &[MachineId]) {
        (&mut self.units, &self.order)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MachineId, &Unit)> {
        self.order.iter().filter_map(|&id| self.units.get(id).map(|u| (id, u)))
    }

    pub fn find(&self, name: &str) -> Option<MachineId> {
        self.iter().find(|(_, u)| u.name == name).map(|(id, _)| id)
    }

    /// A name not used by any machine: `base`, then `base2`, `base3`, ...
    pub fn new_machine_name(&self, base: &str) -> String {
        let base: String = base.chars().take(NAME_BASE_LEN).collect();
        for i in 0..NAME_ATTEMPTS {
            let name = if i == 0 { base.clone() } else { format!("{base}{}", i + 1) };
            if self.find(&name).is_none() {
                return name;
            }
        }
        format!("_(error){base}")
    }

    /// True if audio from `upstream` reaches `downstream`, directly or
    /// through other machines.
    pub(crate) fn feeds(&self, upstream: MachineId, downstream: MachineId) -> bool {
        let mut stack = vec![downstream];
        let mut seen = Vec::new();
        while let Some(id) = stack.pop() {
            if id == upstream {
                return true;
            }
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(unit) = self.units.get(id) {
                stack.extend(
                    unit.inputs
                        .iter()
                        .filter(|c| c.kind() == ConnectionKind::Audio)
                        .map(|c| c.from),
                );
            }
        }
        false
    }
}

impl std::ops::Index<MachineId> for Registry {
    type Output = Unit;

    fn index(&self, id: MachineId) -> &Unit {
        &self.units[id]
    }
}
