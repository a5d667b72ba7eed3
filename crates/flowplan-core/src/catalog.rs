//! Immutable catalog of items, recipes, machines, modules, beacons and
//! quality tiers.
//!
//! Built through [`CatalogBuilder`] (register -> mutate -> build) and frozen
//! into a [`Catalog`] that nodes and the graph only ever read.

use crate::id::*;
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Temperature ranges
// ---------------------------------------------------------------------------

/// An inclusive temperature range accepted or produced for a fluid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

impl TempRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range holding exactly one temperature.
    pub fn point(temperature: f64) -> Self {
        Self {
            min: temperature,
            max: temperature,
        }
    }

    pub fn contains(&self, temperature: f64) -> bool {
        temperature >= self.min && temperature <= self.max
    }

    /// The overlap of two ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &TempRange) -> Option<TempRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min <= max { Some(TempRange { min, max }) } else { None }
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// An item definition.
#[derive(Debug, Clone, Default)]
pub struct ItemDef {
    pub name: String,
    pub friendly_name: String,
    pub temperature_dependent: bool,
    /// Energy released by burning one unit, in kJ. `None` for non-fuels.
    pub fuel_value: Option<f64>,
    pub burn_result: Option<ItemId>,
    pub spoil_result: Option<ItemId>,
    pub plant_result: Option<ItemId>,
    /// Items whose burn result is this item. Filled in by `build()`.
    pub burn_origins: Vec<ItemId>,
    /// Items that spoil into this item. Filled in by `build()`.
    pub spoil_origins: Vec<ItemId>,
    /// Seeds that grow into this item. Filled in by `build()`.
    pub plant_origins: Vec<ItemId>,
}

impl ItemDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            ..Self::default()
        }
    }
}

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub item: ItemId,
    pub amount: f64,
    /// Accepted temperatures for temperature-dependent fluids.
    pub temperature: Option<TempRange>,
}

/// One product of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeProduct {
    pub item: ItemId,
    pub amount: f64,
    /// Output temperature for temperature-dependent fluids.
    pub temperature: Option<f64>,
}

/// A recipe definition. Ingredient and product keys are unique.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub friendly_name: String,
    /// Craft time in seconds at machine speed 1.
    pub time: f64,
    pub ingredients: Vec<RecipeIngredient>,
    pub products: Vec<RecipeProduct>,
    pub enabled: bool,
    pub available: bool,
    /// Machines able to run this recipe.
    pub machines: Vec<MachineId>,
}

impl RecipeDef {
    pub fn new(name: &str, time: f64) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            time,
            ingredients: Vec::new(),
            products: Vec::new(),
            enabled: true,
            available: true,
            machines: Vec::new(),
        }
    }

    pub fn ingredient(&self, item: ItemId) -> Option<&RecipeIngredient> {
        self.ingredients.iter().find(|i| i.item == item)
    }

    pub fn product(&self, item: ItemId) -> Option<&RecipeProduct> {
        self.products.iter().find(|p| p.item == item)
    }

    pub fn has_ingredient(&self, item: ItemId) -> bool {
        self.ingredient(item).is_some()
    }

    pub fn has_product(&self, item: ItemId) -> bool {
        self.product(item).is_some()
    }
}

/// The fuel side of a burner machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurnerDef {
    pub fuels: Vec<ItemId>,
}

/// A machine definition (assembler, furnace, chemical plant, ...).
#[derive(Debug, Clone)]
pub struct MachineDef {
    pub name: String,
    pub friendly_name: String,
    pub speed: f64,
    /// Energy drawn while working, in kW.
    pub energy_consumption: f64,
    pub energy_effectivity: f64,
    pub module_slots: u32,
    pub base_productivity_bonus: f64,
    /// `Some` for fuel-burning machines.
    pub burner: Option<BurnerDef>,
    pub enabled: bool,
    pub available: bool,
}

impl MachineDef {
    pub fn new(name: &str, speed: f64) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            speed,
            energy_consumption: 0.0,
            energy_effectivity: 1.0,
            module_slots: 0,
            base_productivity_bonus: 0.0,
            burner: None,
            enabled: true,
            available: true,
        }
    }

    pub fn is_burner(&self) -> bool {
        self.burner.is_some()
    }

    pub fn accepts_fuel(&self, item: ItemId) -> bool {
        self.burner
            .as_ref()
            .map(|b| b.fuels.contains(&item))
            .unwrap_or(false)
    }
}

/// A module definition. Bonuses are fractions: 0.5 = +50%.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
    pub name: String,
    pub friendly_name: String,
    pub speed_bonus: f64,
    pub productivity_bonus: f64,
    pub consumption_bonus: f64,
    pub pollution_bonus: f64,
    pub enabled: bool,
}

impl ModuleDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            enabled: true,
            ..Self::default()
        }
    }
}

/// A beacon definition.
#[derive(Debug, Clone)]
pub struct BeaconDef {
    pub name: String,
    pub friendly_name: String,
    pub module_slots: u32,
    /// Multiplier applied to every bonus the beacon distributes.
    pub effectivity: f64,
    pub enabled: bool,
}

impl BeaconDef {
    pub fn new(name: &str, module_slots: u32, effectivity: f64) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            module_slots,
            effectivity,
            enabled: true,
        }
    }
}

/// A quality tier. Level 0 is the baseline.
#[derive(Debug, Clone)]
pub struct QualityDef {
    pub name: String,
    pub friendly_name: String,
    pub level: u32,
    pub enabled: bool,
}

impl QualityDef {
    pub fn new(name: &str, level: u32) -> Self {
        Self {
            name: name.to_string(),
            friendly_name: name.to_string(),
            level,
            enabled: true,
        }
    }
}

/// Name given to the quality synthesised when a preset defines none.
pub const DEFAULT_QUALITY_NAME: &str = "normal";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    items: Vec<ItemDef>,
    recipes: Vec<RecipeDef>,
    machines: Vec<MachineDef>,
    modules: Vec<ModuleDef>,
    beacons: Vec<BeaconDef>,
    qualities: Vec<QualityDef>,
    item_names: HashMap<String, ItemId>,
    recipe_names: HashMap<String, RecipeId>,
    machine_names: HashMap<String, MachineId>,
    module_names: HashMap<String, ModuleId>,
    beacon_names: HashMap<String, BeaconId>,
    quality_names: HashMap<String, QualityId>,
    duplicates: Vec<(&'static str, String)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item. Returns its ID.
    pub fn register_item(&mut self, def: ItemDef) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        if self.item_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("item", def.name.clone()));
        }
        self.items.push(def);
        id
    }

    /// Phase 1: Register a recipe. Returns its ID.
    pub fn register_recipe(&mut self, def: RecipeDef) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        if self.recipe_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("recipe", def.name.clone()));
        }
        self.recipes.push(def);
        id
    }

    /// Phase 1: Register a machine. Returns its ID.
    pub fn register_machine(&mut self, def: MachineDef) -> MachineId {
        let id = MachineId(self.machines.len() as u32);
        if self.machine_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("machine", def.name.clone()));
        }
        self.machines.push(def);
        id
    }

    /// Phase 1: Register a module. Returns its ID.
    pub fn register_module(&mut self, def: ModuleDef) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        if self.module_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("module", def.name.clone()));
        }
        self.modules.push(def);
        id
    }

    /// Phase 1: Register a beacon. Returns its ID.
    pub fn register_beacon(&mut self, def: BeaconDef) -> BeaconId {
        let id = BeaconId(self.beacons.len() as u32);
        if self.beacon_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("beacon", def.name.clone()));
        }
        self.beacons.push(def);
        id
    }

    /// Phase 1: Register a quality tier. Returns its ID.
    pub fn register_quality(&mut self, def: QualityDef) -> QualityId {
        let id = QualityId(self.qualities.len() as u32);
        if self.quality_names.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("quality", def.name.clone()));
        }
        self.qualities.push(def);
        id
    }

    /// Phase 2: Mutate an existing item by name.
    pub fn mutate_item<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut ItemDef),
    {
        let id = self
            .item_names
            .get(name)
            .ok_or(CatalogError::NotFound(name.to_string()))?;
        f(&mut self.items[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut RecipeDef),
    {
        let id = self
            .recipe_names
            .get(name)
            .ok_or(CatalogError::NotFound(name.to_string()))?;
        f(&mut self.recipes[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing machine by name.
    pub fn mutate_machine<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut MachineDef),
    {
        let id = self
            .machine_names
            .get(name)
            .ok_or(CatalogError::NotFound(name.to_string()))?;
        f(&mut self.machines[id.0 as usize]);
        Ok(())
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_names.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_names.get(name).copied()
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineId> {
        self.machine_names.get(name).copied()
    }

    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.module_names.get(name).copied()
    }

    pub fn beacon_id(&self, name: &str) -> Option<BeaconId> {
        self.beacon_names.get(name).copied()
    }

    pub fn quality_id(&self, name: &str) -> Option<QualityId> {
        self.quality_names.get(name).copied()
    }

    /// Phase 3: Validate cross references and build the immutable catalog.
    pub fn build(mut self) -> Result<Catalog, CatalogError> {
        if let Some((kind, name)) = self.duplicates.first() {
            return Err(CatalogError::DuplicateName {
                kind,
                name: name.clone(),
            });
        }

        let item_count = self.items.len();
        let check_item = |id: ItemId| {
            if (id.0 as usize) < item_count {
                Ok(())
            } else {
                Err(CatalogError::InvalidItemRef(id))
            }
        };

        for item in &self.items {
            for related in [item.burn_result, item.spoil_result, item.plant_result]
                .into_iter()
                .flatten()
            {
                check_item(related)?;
            }
            if let Some(value) = item.fuel_value
                && value <= 0.0
            {
                return Err(CatalogError::InvalidDefinition {
                    name: item.name.clone(),
                    reason: "fuel value must be positive",
                });
            }
        }

        for recipe in &self.recipes {
            if recipe.time <= 0.0 {
                return Err(CatalogError::InvalidDefinition {
                    name: recipe.name.clone(),
                    reason: "craft time must be positive",
                });
            }
            let mut seen = HashSet::new();
            for ingredient in &recipe.ingredients {
                check_item(ingredient.item)?;
                if !seen.insert(ingredient.item) {
                    return Err(CatalogError::DuplicateIngredient {
                        recipe: recipe.name.clone(),
                        item: ingredient.item,
                    });
                }
            }
            seen.clear();
            for product in &recipe.products {
                check_item(product.item)?;
                if !seen.insert(product.item) {
                    return Err(CatalogError::DuplicateProduct {
                        recipe: recipe.name.clone(),
                        item: product.item,
                    });
                }
            }
            for machine in &recipe.machines {
                if machine.0 as usize >= self.machines.len() {
                    return Err(CatalogError::InvalidMachineRef(*machine));
                }
            }
        }

        for machine in &self.machines {
            if machine.speed <= 0.0 || machine.energy_effectivity <= 0.0 {
                return Err(CatalogError::InvalidDefinition {
                    name: machine.name.clone(),
                    reason: "speed and energy effectivity must be positive",
                });
            }
            if let Some(burner) = &machine.burner {
                for &fuel in &burner.fuels {
                    check_item(fuel)?;
                    if self.items[fuel.0 as usize].fuel_value.is_none() {
                        return Err(CatalogError::InvalidDefinition {
                            name: machine.name.clone(),
                            reason: "burner accepts an item without a fuel value",
                        });
                    }
                }
            }
        }

        // Reverse relations.
        for idx in 0..self.items.len() {
            let origin = ItemId(idx as u32);
            let (burn, spoil, plant) = {
                let item = &self.items[idx];
                (item.burn_result, item.spoil_result, item.plant_result)
            };
            if let Some(target) = burn {
                self.items[target.0 as usize].burn_origins.push(origin);
            }
            if let Some(target) = spoil {
                self.items[target.0 as usize].spoil_origins.push(origin);
            }
            if let Some(target) = plant {
                self.items[target.0 as usize].plant_origins.push(origin);
            }
        }

        if self.qualities.is_empty() {
            self.register_quality(QualityDef::new(DEFAULT_QUALITY_NAME, 0));
        }
        let default_quality = self
            .qualities
            .iter()
            .enumerate()
            .min_by_key(|(_, q)| q.level)
            .map(|(idx, _)| QualityId(idx as u32))
            .unwrap_or(QualityId(0));

        Ok(Catalog {
            items: self.items,
            recipes: self.recipes,
            machines: self.machines,
            modules: self.modules,
            beacons: self.beacons,
            qualities: self.qualities,
            item_names: self.item_names,
            recipe_names: self.recipe_names,
            machine_names: self.machine_names,
            module_names: self.module_names,
            beacon_names: self.beacon_names,
            quality_names: self.quality_names,
            default_quality,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after `build()`. Thread-safe to share.
#[derive(Debug)]
pub struct Catalog {
    items: Vec<ItemDef>,
    recipes: Vec<RecipeDef>,
    machines: Vec<MachineDef>,
    modules: Vec<ModuleDef>,
    beacons: Vec<BeaconDef>,
    qualities: Vec<QualityDef>,
    item_names: HashMap<String, ItemId>,
    recipe_names: HashMap<String, RecipeId>,
    machine_names: HashMap<String, MachineId>,
    module_names: HashMap<String, ModuleId>,
    beacon_names: HashMap<String, BeaconId>,
    quality_names: HashMap<String, QualityId>,
    default_quality: QualityId,
}

impl Catalog {
    pub fn item(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn machine(&self, id: MachineId) -> Option<&MachineDef> {
        self.machines.get(id.0 as usize)
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleDef> {
        self.modules.get(id.0 as usize)
    }

    pub fn beacon(&self, id: BeaconId) -> Option<&BeaconDef> {
        self.beacons.get(id.0 as usize)
    }

    pub fn quality(&self, id: QualityId) -> Option<&QualityDef> {
        self.qualities.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_names.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_names.get(name).copied()
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineId> {
        self.machine_names.get(name).copied()
    }

    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.module_names.get(name).copied()
    }

    pub fn beacon_id(&self, name: &str) -> Option<BeaconId> {
        self.beacon_names.get(name).copied()
    }

    pub fn quality_id(&self, name: &str) -> Option<QualityId> {
        self.quality_names.get(name).copied()
    }

    /// The lowest-level quality tier.
    pub fn default_quality(&self) -> QualityId {
        self.default_quality
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn beacon_count(&self) -> usize {
        self.beacons.len()
    }

    pub fn quality_count(&self) -> usize {
        self.qualities.len()
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &ItemDef)> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, i)| (ItemId(idx as u32), i))
    }

    pub fn machines(&self) -> impl Iterator<Item = (MachineId, &MachineDef)> {
        self.machines
            .iter()
            .enumerate()
            .map(|(idx, m)| (MachineId(idx as u32), m))
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &ModuleDef)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(idx, m)| (ModuleId(idx as u32), m))
    }

    // Name resolution for saved data: unknown names become `Missing`.

    pub fn item_ref(&self, name: &str) -> CatalogRef<ItemId> {
        resolve(self.item_id(name), name)
    }

    pub fn recipe_ref(&self, name: &str) -> CatalogRef<RecipeId> {
        resolve(self.recipe_id(name), name)
    }

    pub fn machine_ref(&self, name: &str) -> CatalogRef<MachineId> {
        resolve(self.machine_id(name), name)
    }

    pub fn module_ref(&self, name: &str) -> CatalogRef<ModuleId> {
        resolve(self.module_id(name), name)
    }

    pub fn beacon_ref(&self, name: &str) -> CatalogRef<BeaconId> {
        resolve(self.beacon_id(name), name)
    }

    // Display names, falling back to the saved name for missing entries.

    pub fn item_name(&self, item: &CatalogRef<ItemId>) -> String {
        match item {
            CatalogRef::Resolved(id) => self
                .item(*id)
                .map(|i| i.friendly_name.clone())
                .unwrap_or_default(),
            CatalogRef::Missing(name) => name.clone(),
        }
    }

    pub fn recipe_name(&self, recipe: &CatalogRef<RecipeId>) -> String {
        match recipe {
            CatalogRef::Resolved(id) => self
                .recipe(*id)
                .map(|r| r.friendly_name.clone())
                .unwrap_or_default(),
            CatalogRef::Missing(name) => name.clone(),
        }
    }

    pub fn machine_name(&self, machine: &CatalogRef<MachineId>) -> String {
        match machine {
            CatalogRef::Resolved(id) => self
                .machine(*id)
                .map(|m| m.friendly_name.clone())
                .unwrap_or_default(),
            CatalogRef::Missing(name) => name.clone(),
        }
    }

    pub fn beacon_name(&self, beacon: &CatalogRef<BeaconId>) -> String {
        match beacon {
            CatalogRef::Resolved(id) => self
                .beacon(*id)
                .map(|b| b.friendly_name.clone())
                .unwrap_or_default(),
            CatalogRef::Missing(name) => name.clone(),
        }
    }

    pub fn module_name(&self, module: &CatalogRef<ModuleId>) -> String {
        match module {
            CatalogRef::Resolved(id) => self
                .module(*id)
                .map(|m| m.friendly_name.clone())
                .unwrap_or_default(),
            CatalogRef::Missing(name) => name.clone(),
        }
    }
}

fn resolve<T>(id: Option<T>, name: &str) -> CatalogRef<T> {
    match id {
        Some(id) => CatalogRef::Resolved(id),
        None => CatalogRef::Missing(name.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemId),
    #[error("invalid machine reference: {0:?}")]
    InvalidMachineRef(MachineId),
    #[error("recipe {recipe} lists ingredient {item:?} twice")]
    DuplicateIngredient { recipe: String, item: ItemId },
    #[error("recipe {recipe} lists product {item:?} twice")]
    DuplicateProduct { recipe: String, item: ItemId },
    #[error("invalid definition for {name}: {reason}")]
    InvalidDefinition { name: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        let ore = b.register_item(ItemDef::new("iron-ore"));
        let plate = b.register_item(ItemDef::new("iron-plate"));
        let ash = b.register_item(ItemDef::new("ash"));
        b.register_item(ItemDef {
            fuel_value: Some(4000.0),
            burn_result: Some(ash),
            ..ItemDef::new("coal")
        });
        let furnace = b.register_machine(MachineDef::new("stone-furnace", 1.0));
        let mut smelt = RecipeDef::new("smelt-iron", 3.2);
        smelt.ingredients.push(RecipeIngredient {
            item: ore,
            amount: 1.0,
            temperature: None,
        });
        smelt.products.push(RecipeProduct {
            item: plate,
            amount: 1.0,
            temperature: None,
        });
        smelt.machines.push(furnace);
        b.register_recipe(smelt);
        b
    }

    #[test]
    fn register_and_build() {
        let catalog = setup_builder().build().unwrap();
        assert_eq!(catalog.item_count(), 4);
        assert_eq!(catalog.recipe_count(), 1);
        assert_eq!(catalog.machine_count(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let catalog = setup_builder().build().unwrap();
        assert!(catalog.item_id("iron-ore").is_some());
        assert!(catalog.item_id("nonexistent").is_none());
        assert_eq!(
            catalog.item_ref("nonexistent"),
            CatalogRef::Missing("nonexistent".to_string())
        );
    }

    #[test]
    fn default_quality_synthesised() {
        let catalog = setup_builder().build().unwrap();
        assert_eq!(catalog.quality_count(), 1);
        let q = catalog.quality(catalog.default_quality()).unwrap();
        assert_eq!(q.name, DEFAULT_QUALITY_NAME);
        assert_eq!(q.level, 0);
    }

    #[test]
    fn default_quality_is_lowest_level() {
        let mut b = setup_builder();
        b.register_quality(QualityDef::new("rare", 2));
        let normal = b.register_quality(QualityDef::new("normal", 0));
        let catalog = b.build().unwrap();
        assert_eq!(catalog.default_quality(), normal);
    }

    #[test]
    fn burn_origins_derived() {
        let catalog = setup_builder().build().unwrap();
        let ash = catalog.item_id("ash").unwrap();
        let coal = catalog.item_id("coal").unwrap();
        assert_eq!(catalog.item(ash).unwrap().burn_origins, vec![coal]);
    }

    #[test]
    fn mutate_recipe() {
        let mut b = setup_builder();
        let ash = b.item_id("ash").unwrap();
        b.mutate_recipe("smelt-iron", |r| {
            r.products.push(RecipeProduct {
                item: ash,
                amount: 0.5,
                temperature: None,
            })
        })
        .unwrap();
        let catalog = b.build().unwrap();
        let recipe = catalog.recipe(catalog.recipe_id("smelt-iron").unwrap()).unwrap();
        assert_eq!(recipe.products.len(), 2);
        assert!(recipe.has_product(ash));
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut b = setup_builder();
        let result = b.mutate_recipe("nonexistent", |_| {});
        assert!(matches!(result, Err(CatalogError::NotFound(name)) if name == "nonexistent"));
    }

    #[test]
    fn duplicate_ingredient_rejected() {
        let mut b = setup_builder();
        let ore = b.item_id("iron-ore").unwrap();
        b.mutate_recipe("smelt-iron", |r| {
            r.ingredients.push(RecipeIngredient {
                item: ore,
                amount: 2.0,
                temperature: None,
            })
        })
        .unwrap();
        assert!(matches!(
            b.build(),
            Err(CatalogError::DuplicateIngredient { .. })
        ));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut b = setup_builder();
        b.register_item(ItemDef::new("iron-ore"));
        let err = b.build().unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("duplicate item name"), "got: {msg}");
    }

    #[test]
    fn invalid_item_ref_fails() {
        let mut b = CatalogBuilder::new();
        let mut bad = RecipeDef::new("bad", 1.0);
        bad.products.push(RecipeProduct {
            item: ItemId(999),
            amount: 1.0,
            temperature: None,
        });
        b.register_recipe(bad);
        assert!(matches!(
            b.build(),
            Err(CatalogError::InvalidItemRef(ItemId(999)))
        ));
    }

    #[test]
    fn burner_fuel_requires_fuel_value() {
        let mut b = setup_builder();
        let ore = b.item_id("iron-ore").unwrap();
        b.mutate_machine("stone-furnace", |m| {
            m.burner = Some(BurnerDef { fuels: vec![ore] })
        })
        .unwrap();
        assert!(matches!(
            b.build(),
            Err(CatalogError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn non_positive_craft_time_rejected() {
        let mut b = CatalogBuilder::new();
        b.register_recipe(RecipeDef::new("instant", 0.0));
        assert!(b.build().is_err());
    }

    #[test]
    fn temp_range_intersection() {
        let a = TempRange::new(15.0, 100.0);
        let b = TempRange::new(90.0, 500.0);
        assert_eq!(a.intersect(&b), Some(TempRange::new(90.0, 100.0)));
        assert_eq!(a.intersect(&TempRange::point(165.0)), None);
        assert!(a.contains(15.0));
        assert!(!a.contains(100.5));
    }

    #[test]
    fn empty_catalog_builds() {
        let catalog = CatalogBuilder::new().build().unwrap();
        assert_eq!(catalog.item_count(), 0);
        assert_eq!(catalog.quality_count(), 1);
    }
}
