//! Flowplan Data -- on-disk presets and saved graphs.
//!
//! A preset directory holds `items`, `recipes` and `machines` files, plus
//! optional `modules`, `beacons`, `qualities` and `settings`, each in RON,
//! TOML or JSON. [`loader::load_preset`] turns one into a
//! [`Catalog`](flowplan_core::catalog::Catalog) and
//! [`GraphSettings`](flowplan_core::settings::GraphSettings).
//! Saved graphs are read and written with [`loader::load_graph`] and
//! [`loader::save_graph`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Preset, load_catalog, load_graph, load_preset, load_settings, save_graph};
