//! Default choices for newly created recipe nodes: machine, modules, fuel.

use crate::catalog::{Catalog, MachineDef, ModuleDef};
use crate::id::*;
use crate::settings::{GraphSettings, MachineStyle, ModuleStyle};
use std::cmp::Ordering;

/// Pick the machine a new node for `recipe` should use.
pub fn default_machine(catalog: &Catalog, recipe: RecipeId, settings: &GraphSettings) -> Option<MachineId> {
    let recipe = catalog.recipe(recipe)?;
    let usable = |m: &MachineDef| settings.include_disabled || (m.enabled && m.available);
    let candidates = recipe
        .machines
        .iter()
        .filter_map(|&id| catalog.machine(id).map(|m| (id, m)))
        .filter(|(_, m)| usable(m));

    // Ties keep the first candidate.
    match settings.machine_style {
        MachineStyle::Fastest => candidates
            .reduce(|best, next| if next.1.speed > best.1.speed { next } else { best })
            .map(|(id, _)| id),
        MachineStyle::Slowest => candidates
            .reduce(|best, next| if next.1.speed < best.1.speed { next } else { best })
            .map(|(id, _)| id),
    }
}

/// Modules filling every slot of `machine`, per the module style.
pub fn default_modules(catalog: &Catalog, machine: MachineId, settings: &GraphSettings) -> Vec<ModuleId> {
    let Some(machine) = catalog.machine(machine) else {
        return Vec::new();
    };
    let score: fn(&ModuleDef) -> f64 = match settings.module_style {
        ModuleStyle::None => return Vec::new(),
        ModuleStyle::Speed => |m: &ModuleDef| m.speed_bonus,
        ModuleStyle::Productivity => |m: &ModuleDef| m.productivity_bonus,
        ModuleStyle::Efficiency => |m: &ModuleDef| -m.consumption_bonus,
    };

    let best = catalog
        .modules()
        .filter(|(_, m)| settings.include_disabled || m.enabled)
        .filter(|(_, m)| score(m) > 0.0)
        .reduce(|best, next| {
            if score(next.1).total_cmp(&score(best.1)) == Ordering::Greater {
                next
            } else {
                best
            }
        });

    match best {
        Some((id, _)) => vec![id; machine.module_slots as usize],
        None => Vec::new(),
    }
}

/// Remembers which fuels the user picked, most recent first, and offers
/// them again for new burner nodes.
#[derive(Debug, Clone, Default)]
pub struct FuelSelector {
    preferred: Vec<ItemId>,
}

impl FuelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fuel` as the most recent choice.
    pub fn use_fuel(&mut self, fuel: ItemId) {
        self.preferred.retain(|&f| f != fuel);
        self.preferred.insert(0, fuel);
    }

    pub fn preferred(&self) -> &[ItemId] {
        &self.preferred
    }

    /// Fuel for a burner machine: the most recently used fuel it accepts,
    /// else the accepted fuel with the highest fuel value. `None` for
    /// non-burners.
    pub fn fuel_for(&self, catalog: &Catalog, machine: MachineId) -> Option<ItemId> {
        let machine = catalog.machine(machine)?;
        let burner = machine.burner.as_ref()?;

        if let Some(&fuel) = self.preferred.iter().find(|&&f| machine.accepts_fuel(f)) {
            return Some(fuel);
        }

        burner
            .fuels
            .iter()
            .filter_map(|&f| catalog.item(f).and_then(|def| def.fuel_value).map(|v| (f, v)))
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
            .map(|(f, _)| f)
    }
}
