//! Recipe nodes: one production step bound to a recipe, a machine, its
//! modules, an optional beacon loadout and, for burner machines, a fuel.
//!
//! All rate math lives here. Rates come in two flavours:
//!
//! - `input_rate_for` / `output_rate_for`: the unscaled per-cycle amount of
//!   an item, including the burner contribution for fuel and burnt items.
//! - `consume_rate` / `supply_rate` on [`Node`](crate::node::Node): the above
//!   scaled by the node's `ActualRate` and rounded once to `rounding_dp`.

use crate::catalog::{Catalog, MachineDef, ModuleDef, RecipeDef};
use crate::id::*;
use crate::node::NodeIssue;
use crate::rate::RateContext;

/// Machines never draw less than this fraction of their nominal energy.
pub const MIN_CONSUMPTION_MULTIPLIER: f64 = 0.2;

/// A production step running one recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeNode {
    recipe: CatalogRef<RecipeId>,
    quality: QualityId,
    machine: Option<CatalogRef<MachineId>>,
    machine_modules: Vec<CatalogRef<ModuleId>>,
    beacon: Option<CatalogRef<BeaconId>>,
    beacon_count: f64,
    beacon_modules: Vec<CatalogRef<ModuleId>>,
    fuel: Option<CatalogRef<ItemId>>,
    /// Burn result restored from a save that no longer matches the fuel.
    burnt_override: Option<CatalogRef<ItemId>>,
}

/// Items whose links must be severed after a fuel change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FuelChange {
    pub orphaned_input: Option<ItemId>,
    pub orphaned_output: Option<ItemId>,
}

impl RecipeNode {
    /// An unconfigured node: no machine, modules, beacon or fuel.
    pub fn new(recipe: impl Into<CatalogRef<RecipeId>>, quality: QualityId) -> Self {
        Self {
            recipe: recipe.into(),
            quality,
            machine: None,
            machine_modules: Vec::new(),
            beacon: None,
            beacon_count: 0.0,
            beacon_modules: Vec::new(),
            fuel: None,
            burnt_override: None,
        }
    }

    pub fn with_machine(mut self, machine: impl Into<CatalogRef<MachineId>>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    pub fn with_modules<M>(mut self, modules: impl IntoIterator<Item = M>) -> Self
    where
        M: Into<CatalogRef<ModuleId>>,
    {
        self.machine_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_beacon<M>(
        mut self,
        beacon: impl Into<CatalogRef<BeaconId>>,
        count: f64,
        modules: impl IntoIterator<Item = M>,
    ) -> Self
    where
        M: Into<CatalogRef<ModuleId>>,
    {
        self.beacon = Some(beacon.into());
        self.beacon_count = count;
        self.beacon_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fuel(mut self, fuel: impl Into<CatalogRef<ItemId>>) -> Self {
        self.fuel = Some(fuel.into());
        self
    }

    pub fn with_burnt_override(mut self, burnt: impl Into<CatalogRef<ItemId>>) -> Self {
        self.burnt_override = Some(burnt.into());
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn recipe(&self) -> &CatalogRef<RecipeId> {
        &self.recipe
    }

    pub fn quality(&self) -> QualityId {
        self.quality
    }

    pub fn machine(&self) -> Option<&CatalogRef<MachineId>> {
        self.machine.as_ref()
    }

    pub fn machine_modules(&self) -> &[CatalogRef<ModuleId>] {
        &self.machine_modules
    }

    pub fn beacon(&self) -> Option<&CatalogRef<BeaconId>> {
        self.beacon.as_ref()
    }

    pub fn beacon_count(&self) -> f64 {
        self.beacon_count
    }

    pub fn beacon_modules(&self) -> &[CatalogRef<ModuleId>] {
        &self.beacon_modules
    }

    pub fn fuel(&self) -> Option<&CatalogRef<ItemId>> {
        self.fuel.as_ref()
    }

    pub fn burnt_override(&self) -> Option<&CatalogRef<ItemId>> {
        self.burnt_override.as_ref()
    }

    /// The resolved fuel item, if any.
    pub fn fuel_item(&self) -> Option<ItemId> {
        self.fuel.as_ref().and_then(CatalogRef::resolved)
    }

    /// The item left after burning: the override if present, else the fuel's
    /// natural burn result.
    pub fn burnt_item(&self, catalog: &Catalog) -> Option<CatalogRef<ItemId>> {
        if let Some(burnt) = &self.burnt_override {
            return Some(burnt.clone());
        }
        self.natural_burn_result(catalog).map(CatalogRef::Resolved)
    }

    /// The resolved burnt item, if any.
    pub fn burnt_item_id(&self, catalog: &Catalog) -> Option<ItemId> {
        self.burnt_item(catalog).and_then(|b| b.resolved())
    }

    fn natural_burn_result(&self, catalog: &Catalog) -> Option<ItemId> {
        self.fuel_item()
            .and_then(|fuel| catalog.item(fuel))
            .and_then(|def| def.burn_result)
    }

    pub fn recipe_def<'a>(&self, catalog: &'a Catalog) -> Option<&'a RecipeDef> {
        self.recipe.resolved().and_then(|id| catalog.recipe(id))
    }

    pub fn machine_def<'a>(&self, catalog: &'a Catalog) -> Option<&'a MachineDef> {
        self.machine
            .as_ref()
            .and_then(CatalogRef::resolved)
            .and_then(|id| catalog.machine(id))
    }

    // -----------------------------------------------------------------------
    // Mutation (graph-internal: link severing happens in the graph)
    // -----------------------------------------------------------------------

    pub(crate) fn set_machine(&mut self, machine: Option<CatalogRef<MachineId>>) {
        self.machine = machine;
    }

    pub(crate) fn set_machine_modules(&mut self, modules: Vec<CatalogRef<ModuleId>>) {
        self.machine_modules = modules;
    }

    pub(crate) fn set_beacon(&mut self, beacon: Option<CatalogRef<BeaconId>>) {
        self.beacon = beacon;
    }

    pub(crate) fn set_beacon_count(&mut self, count: f64) {
        self.beacon_count = count;
    }

    pub(crate) fn set_beacon_modules(&mut self, modules: Vec<CatalogRef<ModuleId>>) {
        self.beacon_modules = modules;
    }

    /// Swap the fuel. Clears the burn-result override and reports which old
    /// fuel/burnt items only existed because of the burner.
    pub(crate) fn replace_fuel(
        &mut self,
        fuel: Option<CatalogRef<ItemId>>,
        catalog: &Catalog,
    ) -> FuelChange {
        let recipe = self.recipe_def(catalog);
        let orphaned_input = self
            .fuel_item()
            .filter(|&f| !recipe.is_some_and(|r| r.has_ingredient(f)));
        let orphaned_output = self
            .burnt_item_id(catalog)
            .filter(|&b| !recipe.is_some_and(|r| r.has_product(b)));

        self.fuel = fuel;
        self.burnt_override = None;

        FuelChange {
            orphaned_input,
            orphaned_output,
        }
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Distinct consumed items: recipe ingredients, then the fuel unless it is
    /// already an ingredient.
    pub fn inputs<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = ItemId> + 'a {
        let recipe = self.recipe_def(catalog);
        let ingredients = recipe
            .into_iter()
            .flat_map(|r| r.ingredients.iter().map(|i| i.item));
        let fuel = self
            .fuel_item()
            .filter(move |&f| !recipe.is_some_and(|r| r.has_ingredient(f)));
        ingredients.chain(fuel)
    }

    /// Distinct produced items: recipe products, then the burnt item unless it
    /// is already a product.
    pub fn outputs<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = ItemId> + 'a {
        let recipe = self.recipe_def(catalog);
        let products = recipe
            .into_iter()
            .flat_map(|r| r.products.iter().map(|p| p.item));
        let burnt = self
            .burnt_item_id(catalog)
            .filter(move |&b| !recipe.is_some_and(|r| r.has_product(b)));
        products.chain(burnt)
    }

    /// True if the item is on the input side only because of the burner.
    pub fn is_fuel_only(&self, item: ItemId, catalog: &Catalog) -> bool {
        self.fuel_item() == Some(item)
            && !self
                .recipe_def(catalog)
                .is_some_and(|r| r.has_ingredient(item))
    }

    /// True if the item is on the output side only because of the burner.
    pub fn is_burnt_only(&self, item: ItemId, catalog: &Catalog) -> bool {
        self.burnt_item_id(catalog) == Some(item)
            && !self.recipe_def(catalog).is_some_and(|r| r.has_product(item))
    }

    // -----------------------------------------------------------------------
    // Rates
    // -----------------------------------------------------------------------

    /// Unscaled rate at which `item` is consumed.
    ///
    /// # Panics
    /// If `item` is the fuel while the machine is absent or not a burner, or
    /// if the node does not consume `item` at all.
    pub fn input_rate_for(&self, item: ItemId, ctx: &RateContext<'_>) -> f64 {
        let recipe_rate = self
            .recipe_def(ctx.catalog)
            .and_then(|r| r.ingredient(item))
            .map(|i| i.amount);

        if self.fuel_item() == Some(item) {
            recipe_rate.unwrap_or(0.0) + self.burner_rate(item, ctx)
        } else {
            recipe_rate.unwrap_or_else(|| {
                panic!(
                    "input rate requested for {item:?}, which recipe node {:?} does not consume",
                    self.recipe
                )
            })
        }
    }

    /// Unscaled rate at which `item` is produced.
    ///
    /// # Panics
    /// If `item` is the burnt item while the machine is absent or not a
    /// burner, or if the node does not produce `item` at all.
    pub fn output_rate_for(&self, item: ItemId, ctx: &RateContext<'_>) -> f64 {
        let recipe_rate = self
            .recipe_def(ctx.catalog)
            .and_then(|r| r.product(item))
            .map(|p| p.amount);

        if self.burnt_item_id(ctx.catalog) == Some(item) {
            recipe_rate.unwrap_or(0.0) + self.burner_rate(item, ctx)
        } else {
            recipe_rate.unwrap_or_else(|| {
                panic!(
                    "output rate requested for {item:?}, which recipe node {:?} does not produce",
                    self.recipe
                )
            })
        }
    }

    /// Fuel units burnt per recipe cycle. Shared by the fuel (input) and the
    /// burnt item (output) sides.
    fn burner_rate(&self, item: ItemId, ctx: &RateContext<'_>) -> f64 {
        let machine = match self.machine_def(ctx.catalog) {
            Some(m) if m.is_burner() => m,
            _ => panic!(
                "burner rate requested for {item:?} while the machine of recipe node {:?} is either absent or not a burner",
                self.recipe
            ),
        };

        let fuel_value = match self
            .fuel_item()
            .and_then(|f| ctx.catalog.item(f))
            .and_then(|def| def.fuel_value)
        {
            Some(v) if v > 0.0 => v,
            // Not a fuel: the node is invalid and nothing can be burnt.
            _ => return 0.0,
        };

        let time = self.recipe_def(ctx.catalog).map(|r| r.time).unwrap_or(0.0);
        let craft_seconds = time / (machine.speed * self.speed_multiplier(ctx.catalog));
        let energy = machine.energy_consumption * self.consumption_multiplier(ctx.catalog)
            / machine.energy_effectivity;
        craft_seconds * energy / fuel_value
    }

    /// Number of machines needed to run at `actual_rate` recipe cycles.
    /// Zero without a resolved machine.
    pub fn base_number_of_machines(&self, actual_rate: f64, ctx: &RateContext<'_>) -> f64 {
        let Some(machine) = self.machine_def(ctx.catalog) else {
            return 0.0;
        };
        let time = self.recipe_def(ctx.catalog).map(|r| r.time).unwrap_or(0.0);
        ctx.round(actual_rate * time / (machine.speed * self.speed_multiplier(ctx.catalog)))
    }

    // -----------------------------------------------------------------------
    // Multipliers
    // -----------------------------------------------------------------------

    /// Sum of one bonus over machine modules plus beacon modules scaled by
    /// `effectivity * beacon_count`. Missing entries contribute nothing.
    fn module_bonus(&self, catalog: &Catalog, bonus: impl Fn(&ModuleDef) -> f64) -> f64 {
        let sum = |modules: &[CatalogRef<ModuleId>]| -> f64 {
            modules
                .iter()
                .filter_map(CatalogRef::resolved)
                .filter_map(|id| catalog.module(id))
                .map(&bonus)
                .sum()
        };

        let mut total = sum(&self.machine_modules);
        if let Some(beacon) = self
            .beacon
            .as_ref()
            .and_then(CatalogRef::resolved)
            .and_then(|id| catalog.beacon(id))
        {
            total += sum(&self.beacon_modules) * beacon.effectivity * self.beacon_count;
        }
        total
    }

    pub fn speed_multiplier(&self, catalog: &Catalog) -> f64 {
        1.0 + self.module_bonus(catalog, |m| m.speed_bonus)
    }

    pub fn productivity_multiplier(&self, catalog: &Catalog) -> f64 {
        let base = self
            .machine_def(catalog)
            .map(|m| m.base_productivity_bonus)
            .unwrap_or(0.0);
        1.0 + base + self.module_bonus(catalog, |m| m.productivity_bonus)
    }

    /// Floored at [`MIN_CONSUMPTION_MULTIPLIER`].
    pub fn consumption_multiplier(&self, catalog: &Catalog) -> f64 {
        let multiplier = 1.0 + self.module_bonus(catalog, |m| m.consumption_bonus);
        multiplier.max(MIN_CONSUMPTION_MULTIPLIER)
    }

    pub fn pollution_multiplier(&self, catalog: &Catalog) -> f64 {
        1.0 + self.module_bonus(catalog, |m| m.pollution_bonus)
    }

    // -----------------------------------------------------------------------
    // Validity
    // -----------------------------------------------------------------------

    /// Every configuration problem, in a stable order. Never stops early.
    pub fn errors(&self, catalog: &Catalog) -> Vec<NodeIssue> {
        let mut issues = Vec::new();

        if let CatalogRef::Missing(name) = &self.recipe {
            issues.push(NodeIssue::RecipeMissing(name.clone()));
        }

        match &self.machine {
            None => issues.push(NodeIssue::NoMachine),
            Some(CatalogRef::Missing(name)) => {
                issues.push(NodeIssue::MachineMissing(name.clone()));
                if self.machine_modules.iter().any(CatalogRef::is_missing) {
                    issues.push(NodeIssue::ModuleMissing);
                }
            }
            Some(CatalogRef::Resolved(id)) => {
                if let Some(machine) = catalog.machine(*id) {
                    if machine.is_burner() {
                        self.fuel_issues(machine, catalog, &mut issues);
                    }
                    if self.machine_modules.iter().any(CatalogRef::is_missing) {
                        issues.push(NodeIssue::ModuleMissing);
                    }
                    if self.machine_modules.len() > machine.module_slots as usize {
                        issues.push(NodeIssue::TooManyModules {
                            count: self.machine_modules.len(),
                            slots: machine.module_slots,
                        });
                    }
                }
            }
        }

        if let Some(beacon) = &self.beacon {
            let slots = match beacon {
                CatalogRef::Missing(name) => {
                    issues.push(NodeIssue::BeaconMissing(name.clone()));
                    None
                }
                CatalogRef::Resolved(id) => catalog.beacon(*id).map(|b| b.module_slots),
            };
            if self.beacon_modules.iter().any(CatalogRef::is_missing) {
                issues.push(NodeIssue::BeaconModuleMissing);
            }
            if let Some(slots) = slots
                && self.beacon_modules.len() > slots as usize
            {
                issues.push(NodeIssue::TooManyBeaconModules {
                    count: self.beacon_modules.len(),
                    slots,
                });
            }
        }

        issues
    }

    fn fuel_issues(&self, machine: &MachineDef, catalog: &Catalog, issues: &mut Vec<NodeIssue>) {
        match &self.fuel {
            None => issues.push(NodeIssue::NoFuel),
            Some(CatalogRef::Missing(name)) => issues.push(NodeIssue::FuelMissing(name.clone())),
            Some(CatalogRef::Resolved(fuel)) => {
                if !machine.accepts_fuel(*fuel) {
                    let name = catalog.item_name(&CatalogRef::Resolved(*fuel));
                    issues.push(NodeIssue::InvalidFuel(name));
                }
            }
        }

        if let Some(burnt) = &self.burnt_override {
            let natural = self.natural_burn_result(catalog).map(CatalogRef::Resolved);
            if natural.as_ref() != Some(burnt) {
                issues.push(NodeIssue::BurntMismatch);
            }
        }
    }

    pub fn is_valid(&self, catalog: &Catalog) -> bool {
        self.errors(catalog).is_empty()
    }
}
