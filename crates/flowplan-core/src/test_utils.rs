//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::*;
use crate::graph::ProductionGraph;
use crate::id::*;
use crate::node::Location;
use crate::settings::GraphSettings;
use std::sync::Arc;

// ===========================================================================
// Sample catalog
// ===========================================================================

/// A small smelting preset with handles to everything in it.
pub struct Sample {
    pub catalog: Arc<Catalog>,
    pub normal: QualityId,
    pub uncommon: QualityId,

    pub iron_ore: ItemId,
    pub iron_plate: ItemId,
    pub coal: ItemId,
    pub wood: ItemId,
    pub ash: ItemId,
    pub coke: ItemId,
    pub raw_fish: ItemId,
    pub spoilage: ItemId,
    pub tree_seed: ItemId,

    pub smelt_iron: RecipeId,
    pub coke_coal: RecipeId,

    pub stone_furnace: MachineId,
    pub electric_furnace: MachineId,
    /// Burner that only takes wood. Not listed by any recipe.
    pub wood_stove: MachineId,

    pub speed_module: ModuleId,
    pub productivity_module: ModuleId,
    pub efficiency_module: ModuleId,
    pub beacon: BeaconId,
}

pub fn sample_catalog() -> Sample {
    let mut b = CatalogBuilder::new();

    let normal = b.register_quality(QualityDef::new("normal", 0));
    let uncommon = b.register_quality(QualityDef::new("uncommon", 1));

    let iron_ore = b.register_item(ItemDef::new("iron-ore"));
    let iron_plate = b.register_item(ItemDef::new("iron-plate"));
    let ash = b.register_item(ItemDef::new("ash"));
    let coal = b.register_item(ItemDef {
        fuel_value: Some(4000.0),
        burn_result: Some(ash),
        ..ItemDef::new("coal")
    });
    let wood = b.register_item(ItemDef {
        fuel_value: Some(2000.0),
        ..ItemDef::new("wood")
    });
    let coke = b.register_item(ItemDef::new("coke"));
    let spoilage = b.register_item(ItemDef::new("spoilage"));
    let raw_fish = b.register_item(ItemDef {
        spoil_result: Some(spoilage),
        ..ItemDef::new("raw-fish")
    });
    let tree_seed = b.register_item(ItemDef {
        plant_result: Some(wood),
        ..ItemDef::new("tree-seed")
    });

    let stone_furnace = b.register_machine(MachineDef {
        energy_consumption: 90.0,
        burner: Some(BurnerDef {
            fuels: vec![coal, wood],
        }),
        ..MachineDef::new("stone-furnace", 1.0)
    });
    let electric_furnace = b.register_machine(MachineDef {
        energy_consumption: 180.0,
        module_slots: 2,
        ..MachineDef::new("electric-furnace", 2.0)
    });
    let wood_stove = b.register_machine(MachineDef {
        energy_consumption: 90.0,
        burner: Some(BurnerDef { fuels: vec![wood] }),
        ..MachineDef::new("wood-stove", 1.0)
    });

    let mut smelt = RecipeDef::new("smelt-iron", 3.2);
    smelt.ingredients.push(RecipeIngredient {
        item: iron_ore,
        amount: 1.0,
        temperature: None,
    });
    smelt.products.push(RecipeProduct {
        item: iron_plate,
        amount: 1.0,
        temperature: None,
    });
    smelt.machines = vec![stone_furnace, electric_furnace];
    let smelt_iron = b.register_recipe(smelt);

    let mut coking = RecipeDef::new("coke-coal", 2.0);
    coking.ingredients.push(RecipeIngredient {
        item: coal,
        amount: 2.0,
        temperature: None,
    });
    coking.products.push(RecipeProduct {
        item: coke,
        amount: 1.0,
        temperature: None,
    });
    coking.machines = vec![stone_furnace];
    let coke_coal = b.register_recipe(coking);

    let speed_module = b.register_module(ModuleDef {
        speed_bonus: 0.5,
        consumption_bonus: 0.7,
        ..ModuleDef::new("speed-module")
    });
    let productivity_module = b.register_module(ModuleDef {
        speed_bonus: -0.15,
        productivity_bonus: 0.1,
        consumption_bonus: 0.8,
        pollution_bonus: 0.1,
        ..ModuleDef::new("productivity-module")
    });
    let efficiency_module = b.register_module(ModuleDef {
        consumption_bonus: -0.5,
        ..ModuleDef::new("efficiency-module")
    });
    let beacon = b.register_beacon(BeaconDef::new("beacon", 2, 0.5));

    Sample {
        catalog: Arc::new(b.build().expect("sample catalog is valid")),
        normal,
        uncommon,
        iron_ore,
        iron_plate,
        coal,
        wood,
        ash,
        coke,
        raw_fish,
        spoilage,
        tree_seed,
        smelt_iron,
        coke_coal,
        stone_furnace,
        electric_furnace,
        wood_stove,
        speed_module,
        productivity_module,
        efficiency_module,
        beacon,
    }
}

// ===========================================================================
// Sample graphs
// ===========================================================================

/// `width` parallel ore -> smelter -> plate lines, each running at `rate`.
/// Smelters use the burner furnace, so every line also carries coal.
pub fn smelting_lines(s: &Sample, width: usize, rate: f64) -> ProductionGraph {
    let mut graph = ProductionGraph::new(Arc::clone(&s.catalog), GraphSettings::default());
    let ore = ItemQuality::new(s.iron_ore, s.normal);
    let plate = ItemQuality::new(s.iron_plate, s.normal);
    let coal = ItemQuality::new(s.coal, s.normal);

    let coal_supply = graph
        .add_supplier(s.coal, s.normal, Location::new(0, -1))
        .expect("coal supplier");
    for row in 0..width as i32 {
        let supply = graph
            .add_supplier(s.iron_ore, s.normal, Location::new(0, row))
            .expect("ore supplier");
        let smelter = graph
            .add_recipe_node(s.smelt_iron, s.normal, Location::new(1, row))
            .expect("smelter");
        graph
            .set_machine(smelter, Some(s.stone_furnace))
            .expect("burner furnace");
        let sink = graph
            .add_consumer(s.iron_plate, s.normal, Location::new(2, row))
            .expect("plate consumer");

        graph.add_link(supply, smelter, ore).expect("ore link");
        graph.add_link(coal_supply, smelter, coal).expect("coal link");
        graph.add_link(smelter, sink, plate).expect("plate link");

        for node in [supply, smelter, sink] {
            graph.set_actual_rate(node, rate).expect("rate");
        }
    }
    graph
}
