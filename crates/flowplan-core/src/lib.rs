//! Flowplan Core -- the production-chain planning model.
//!
//! This crate holds the catalog of items, recipes and machines, and the
//! production graph built on top of it: recipe nodes with their machine,
//! module, beacon and fuel configuration, the links carrying items between
//! them, and the per-item tabs that aggregate link rates and flag
//! oversupply.
//!
//! # Rate Model
//!
//! Every node exposes an unscaled per-item rate (`input_rate_for`,
//! `output_rate_for`). Scaled by the node's externally assigned
//! `ActualRate` and rounded once, these become `consume_rate` and
//! `supply_rate`. Links carry no rate of their own: a link's share is the
//! source's supply (or destination's demand) split evenly over the links
//! for that item.
//!
//! # Graph Mutation Pattern
//!
//! Mutations are immediate and transactional. Each one either fails with a
//! [`graph::GraphError`] and changes nothing, or applies fully and
//! refreshes the tabs of every affected node before returning:
//!
//! ```rust,ignore
//! let smelter = graph.add_recipe_node(smelt_iron, normal, Location::default())?;
//! graph.set_machine(smelter, Some(stone_furnace))?;
//! graph.add_link(ore_supply, smelter, ItemQuality::new(iron_ore, normal))?;
//! ```
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable preset data, frozen at build time.
//! - [`graph::ProductionGraph`] -- Nodes, links and tabs in slot-map arenas.
//! - [`node::Node`] -- One of six node kinds sharing one interface.
//! - [`recipe_node::RecipeNode`] -- Multipliers, burner math, validity.
//! - [`tab::ItemTab`] -- Per-item aggregation point with oversupply flag.
//! - [`persist::GraphRecord`] -- Name-based save form, tolerant of missing
//!   catalog entries.
//! - [`snapshot`] -- Versioned binary snapshots via bitcode.

pub mod catalog;
pub mod graph;
pub mod id;
pub mod link;
pub mod node;
pub mod persist;
pub mod rate;
pub mod recipe_node;
pub mod selector;
pub mod settings;
pub mod snapshot;
pub mod tab;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
