//! Serde data file structs for preset definitions.
//!
//! These structs define the on-disk format for items, recipes, machines,
//! modules, beacons and quality tiers. They are deserialized from RON, JSON,
//! or TOML data files and then resolved into catalog types by the loader.
//! Cross references are by internal name.

use serde::Deserialize;

fn default_true() -> bool {
    true
}

fn default_effectivity() -> f64 {
    1.0
}

// ===========================================================================
// Items
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    /// Display name. Falls back to `name`.
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub temperature_dependent: bool,
    #[serde(default)]
    pub fuel_value: Option<f64>,
    #[serde(default)]
    pub burn_result: Option<String>,
    #[serde(default)]
    pub spoil_result: Option<String>,
    #[serde(default)]
    pub plant_result: Option<String>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe ingredient, in short tuple form or full form with an accepted
/// temperature range.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    /// Short form: `("item_name", amount)`.
    Short(String, f64),
    Full {
        item: String,
        amount: f64,
        #[serde(default)]
        min_temperature: Option<f64>,
        #[serde(default)]
        max_temperature: Option<f64>,
    },
}

/// A recipe product, in short tuple form or full form with an output
/// temperature.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductData {
    /// Short form: `("item_name", amount)`.
    Short(String, f64),
    Full {
        item: String,
        amount: f64,
        #[serde(default)]
        temperature: Option<f64>,
    },
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Craft time in seconds.
    pub time: f64,
    pub ingredients: Vec<IngredientData>,
    pub products: Vec<ProductData>,
    /// Machines able to run the recipe, by name.
    pub machines: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub available: bool,
}

// ===========================================================================
// Machines
// ===========================================================================

/// A machine definition in a data file. A machine listing `fuels` is a
/// burner.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    pub speed: f64,
    #[serde(default)]
    pub energy_consumption: f64,
    #[serde(default = "default_effectivity")]
    pub energy_effectivity: f64,
    #[serde(default)]
    pub module_slots: u32,
    #[serde(default)]
    pub base_productivity: f64,
    #[serde(default)]
    pub fuels: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub available: bool,
}

// ===========================================================================
// Modules, beacons, qualities
// ===========================================================================

/// A module definition. Bonuses are fractions: `0.5` is +50%.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleData {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub productivity: f64,
    #[serde(default)]
    pub consumption: f64,
    #[serde(default)]
    pub pollution: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeaconData {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    pub module_slots: u32,
    pub effectivity: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityData {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_defaults() {
        let item: ItemData = serde_json::from_str(r#"{"name": "coal", "fuel_value": 4000}"#).unwrap();
        assert_eq!(item.name, "coal");
        assert_eq!(item.fuel_value, Some(4000.0));
        assert!(item.friendly_name.is_none());
        assert!(!item.temperature_dependent);
        assert!(item.burn_result.is_none());
    }

    #[test]
    fn recipe_short_and_full_entries() {
        let recipe: RecipeData = ron::from_str(
            r#"(
                name: "steam",
                time: 1.0,
                ingredients: [("water", 10.0)],
                products: [(item: "steam", amount: 10.0, temperature: Some(165.0))],
                machines: ["boiler"],
            )"#,
        )
        .unwrap();
        assert!(matches!(&recipe.ingredients[0], IngredientData::Short(item, amount) if item == "water" && *amount == 10.0));
        assert!(matches!(
            &recipe.products[0],
            ProductData::Full { temperature: Some(t), .. } if *t == 165.0
        ));
        assert!(recipe.enabled && recipe.available);
    }

    #[test]
    fn machine_defaults() {
        let machine: MachineData = toml::from_str(
            r#"
            name = "stone-furnace"
            speed = 1.0
            fuels = ["coal"]
            "#,
        )
        .unwrap();
        assert_eq!(machine.energy_effectivity, 1.0);
        assert_eq!(machine.module_slots, 0);
        assert_eq!(machine.fuels.as_deref(), Some(&["coal".to_string()][..]));
    }

    #[test]
    fn module_bonuses_default_to_zero() {
        let module: ModuleData = serde_json::from_str(r#"{"name": "speed-module", "speed": 0.5}"#).unwrap();
        assert_eq!(module.speed, 0.5);
        assert_eq!(module.productivity, 0.0);
        assert_eq!(module.consumption, 0.0);
        assert!(module.enabled);
    }
}
