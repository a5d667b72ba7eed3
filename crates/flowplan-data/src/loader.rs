//! Loading pipeline: reads preset files, resolves name references, builds
//! the catalog, and reads/writes saved graphs.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers shared by the preset and save loaders.

use crate::schema::*;
use flowplan_core::catalog::*;
use flowplan_core::graph::ProductionGraph;
use flowplan_core::persist::{GraphRecord, LoadReport};
use flowplan_core::settings::GraphSettings;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A serialization error occurred while writing a save.
    #[error("could not write {file}: {detail}")]
    Serialize { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions failed catalog validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML has no top-level arrays, so for TOML
/// files the array is read from `toml_key` in the top-level table. RON and
/// JSON files hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Turn a failed lookup into an `UnresolvedRef` error.
pub fn resolve_name<T>(
    found: Option<T>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<T, DataLoadError> {
    found.ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Return a `DuplicateName` error if the name is already registered.
pub fn check_duplicate<T>(existing: Option<T>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    match existing {
        Some(_) => Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

fn display_name(name: &str, friendly: &Option<String>) -> String {
    friendly.clone().unwrap_or_else(|| name.to_string())
}

// ===========================================================================
// Presets
// ===========================================================================

pub const ITEMS_FILE: &str = "items";
pub const RECIPES_FILE: &str = "recipes";
pub const MACHINES_FILE: &str = "machines";
pub const MODULES_FILE: &str = "modules";
pub const BEACONS_FILE: &str = "beacons";
pub const QUALITIES_FILE: &str = "qualities";
pub const SETTINGS_FILE: &str = "settings";

/// A loaded preset directory: the catalog plus the graph settings.
#[derive(Debug, Clone)]
pub struct Preset {
    pub catalog: Arc<Catalog>,
    pub settings: GraphSettings,
}

/// Load the catalog and settings from a preset directory.
pub fn load_preset(dir: &Path) -> Result<Preset, DataLoadError> {
    Ok(Preset {
        catalog: Arc::new(load_catalog(dir)?),
        settings: load_settings(dir)?,
    })
}

/// Load a catalog from a preset directory.
///
/// `items`, `machines` and `recipes` are required; `qualities`, `modules`
/// and `beacons` are optional. Each may be RON, TOML or JSON.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    if let Some(path) = find_data_file(dir, QUALITIES_FILE)? {
        for q in deserialize_list::<QualityData>(&path, "qualities")? {
            check_duplicate(builder.quality_id(&q.name), &q.name, &path)?;
            builder.register_quality(QualityDef {
                friendly_name: display_name(&q.name, &q.friendly_name),
                enabled: q.enabled,
                ..QualityDef::new(&q.name, q.level)
            });
        }
    }

    let items_path = require_data_file(dir, ITEMS_FILE)?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    load_items(&mut builder, &items, &items_path)?;

    let machines_path = require_data_file(dir, MACHINES_FILE)?;
    for m in deserialize_list::<MachineData>(&machines_path, "machines")? {
        check_duplicate(builder.machine_id(&m.name), &m.name, &machines_path)?;
        let burner = match &m.fuels {
            Some(fuels) => Some(BurnerDef {
                fuels: fuels
                    .iter()
                    .map(|f| resolve_name(builder.item_id(f), f, &machines_path, "item"))
                    .collect::<Result<_, _>>()?,
            }),
            None => None,
        };
        builder.register_machine(MachineDef {
            friendly_name: display_name(&m.name, &m.friendly_name),
            energy_consumption: m.energy_consumption,
            energy_effectivity: m.energy_effectivity,
            module_slots: m.module_slots,
            base_productivity_bonus: m.base_productivity,
            burner,
            enabled: m.enabled,
            available: m.available,
            ..MachineDef::new(&m.name, m.speed)
        });
    }

    let recipes_path = require_data_file(dir, RECIPES_FILE)?;
    for r in deserialize_list::<RecipeData>(&recipes_path, "recipes")? {
        check_duplicate(builder.recipe_id(&r.name), &r.name, &recipes_path)?;
        let def = recipe_def(&builder, &r, &recipes_path)?;
        builder.register_recipe(def);
    }

    if let Some(path) = find_data_file(dir, MODULES_FILE)? {
        for m in deserialize_list::<ModuleData>(&path, "modules")? {
            check_duplicate(builder.module_id(&m.name), &m.name, &path)?;
            builder.register_module(ModuleDef {
                friendly_name: display_name(&m.name, &m.friendly_name),
                speed_bonus: m.speed,
                productivity_bonus: m.productivity,
                consumption_bonus: m.consumption,
                pollution_bonus: m.pollution,
                enabled: m.enabled,
                ..ModuleDef::new(&m.name)
            });
        }
    }

    if let Some(path) = find_data_file(dir, BEACONS_FILE)? {
        for b in deserialize_list::<BeaconData>(&path, "beacons")? {
            check_duplicate(builder.beacon_id(&b.name), &b.name, &path)?;
            builder.register_beacon(BeaconDef {
                friendly_name: display_name(&b.name, &b.friendly_name),
                enabled: b.enabled,
                ..BeaconDef::new(&b.name, b.module_slots, b.effectivity)
            });
        }
    }

    let catalog = builder.build()?;
    info!(
        dir = %dir.display(),
        items = catalog.item_count(),
        recipes = catalog.recipe_count(),
        machines = catalog.machine_count(),
        modules = catalog.module_count(),
        beacons = catalog.beacon_count(),
        qualities = catalog.quality_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Register every item first, then wire burn/spoil/plant results, which may
/// point forward in the file.
fn load_items(builder: &mut CatalogBuilder, items: &[ItemData], path: &Path) -> Result<(), DataLoadError> {
    for item in items {
        check_duplicate(builder.item_id(&item.name), &item.name, path)?;
        builder.register_item(ItemDef {
            friendly_name: display_name(&item.name, &item.friendly_name),
            temperature_dependent: item.temperature_dependent,
            fuel_value: item.fuel_value,
            ..ItemDef::new(&item.name)
        });
    }

    for item in items {
        let lookup = |name: &Option<String>| -> Result<Option<_>, DataLoadError> {
            name.as_deref()
                .map(|n| resolve_name(builder.item_id(n), n, path, "item"))
                .transpose()
        };
        let burn_result = lookup(&item.burn_result)?;
        let spoil_result = lookup(&item.spoil_result)?;
        let plant_result = lookup(&item.plant_result)?;
        if burn_result.is_none() && spoil_result.is_none() && plant_result.is_none() {
            continue;
        }
        builder.mutate_item(&item.name, |def| {
            def.burn_result = burn_result;
            def.spoil_result = spoil_result;
            def.plant_result = plant_result;
        })?;
    }
    Ok(())
}

fn recipe_def(builder: &CatalogBuilder, data: &RecipeData, path: &Path) -> Result<RecipeDef, DataLoadError> {
    let item = |name: &str| resolve_name(builder.item_id(name), name, path, "item");

    let mut def = RecipeDef::new(&data.name, data.time);
    def.friendly_name = display_name(&data.name, &data.friendly_name);
    def.enabled = data.enabled;
    def.available = data.available;

    for ingredient in &data.ingredients {
        def.ingredients.push(match ingredient {
            IngredientData::Short(name, amount) => RecipeIngredient {
                item: item(name)?,
                amount: *amount,
                temperature: None,
            },
            IngredientData::Full {
                item: name,
                amount,
                min_temperature,
                max_temperature,
            } => {
                let temperature = match (min_temperature, max_temperature) {
                    (None, None) => None,
                    (min, max) => Some(TempRange::new(
                        min.unwrap_or(f64::NEG_INFINITY),
                        max.unwrap_or(f64::INFINITY),
                    )),
                };
                RecipeIngredient {
                    item: item(name)?,
                    amount: *amount,
                    temperature,
                }
            }
        });
    }

    for product in &data.products {
        def.products.push(match product {
            ProductData::Short(name, amount) => RecipeProduct {
                item: item(name)?,
                amount: *amount,
                temperature: None,
            },
            ProductData::Full {
                item: name,
                amount,
                temperature,
            } => RecipeProduct {
                item: item(name)?,
                amount: *amount,
                temperature: *temperature,
            },
        });
    }

    def.machines = data
        .machines
        .iter()
        .map(|m| resolve_name(builder.machine_id(m), m, path, "machine"))
        .collect::<Result<_, _>>()?;
    Ok(def)
}

/// Load `settings.{ron,toml,json}` from a preset directory. Missing fields,
/// or a missing file, fall back to the defaults.
pub fn load_settings(dir: &Path) -> Result<GraphSettings, DataLoadError> {
    match find_data_file(dir, SETTINGS_FILE)? {
        Some(path) => {
            let settings: GraphSettings = deserialize_file(&path)?;
            debug!(file = %path.display(), ?settings, "settings loaded");
            Ok(settings)
        }
        None => {
            debug!(dir = %dir.display(), "no settings file; using defaults");
            Ok(GraphSettings::default())
        }
    }
}

// ===========================================================================
// Saved graphs
// ===========================================================================

/// Read a saved graph (RON, JSON or TOML) and rebuild it against `catalog`.
/// Unknown names do not fail the load; they are listed in the report.
pub fn load_graph(
    path: &Path,
    catalog: Arc<Catalog>,
    settings: GraphSettings,
) -> Result<(ProductionGraph, LoadReport), DataLoadError> {
    let record: GraphRecord = deserialize_file(path)?;
    let (graph, report) = ProductionGraph::from_record(catalog, settings, &record);
    if !report.is_clean() {
        warn!(
            file = %path.display(),
            missing = report.missing.len(),
            dropped_links = report.dropped_links.len(),
            dropped_fuels = report.dropped_fuels.len(),
            duplicate_ids = report.duplicate_ids.len(),
            "saved graph did not fully match the catalog"
        );
    }
    Ok((graph, report))
}

/// Write a graph as pretty RON or JSON, chosen by the file extension.
pub fn save_graph(graph: &ProductionGraph, path: &Path) -> Result<(), DataLoadError> {
    let record = graph.to_record();
    let serialize_error = |detail: String| DataLoadError::Serialize {
        file: path.to_path_buf(),
        detail,
    };

    let content = match detect_format(path)? {
        Format::Ron => ron::ser::to_string_pretty(&record, ron::ser::PrettyConfig::default())
            .map_err(|e| serialize_error(e.to_string()))?,
        Format::Json => serde_json::to_string_pretty(&record).map_err(|e| serialize_error(e.to_string()))?,
        Format::Toml => {
            return Err(DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            });
        }
    };
    std::fs::write(path, content)?;
    info!(
        file = %path.display(),
        nodes = record.nodes.len(),
        links = record.links.len(),
        "graph saved"
    );
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
