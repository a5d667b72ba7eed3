//! Save records: a name-based, catalog-independent form of a production
//! graph.
//!
//! Records reference catalog entries by internal name so a save outlives
//! preset changes. Loading never fails on unknown names: they become
//! [`CatalogRef::Missing`] and are listed in the [`LoadReport`].

use crate::catalog::Catalog;
use crate::graph::ProductionGraph;
use crate::id::*;
use crate::node::{ConversionNode, ItemNode, Location, Node, NodeKind};
use crate::rate::RateMode;
use crate::recipe_node::RecipeNode;
use crate::settings::GraphSettings;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Save-local id referenced by links.
    pub id: u32,
    pub location: Location,
    pub rate_mode: RateMode,
    pub actual_rate: f64,
    pub kind: NodeKindRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKindRecord {
    Recipe(RecipeRecord),
    Supplier { item: String, quality: String },
    Consumer { item: String, quality: String },
    Passthrough { item: String, quality: String },
    Spoil { input: String, output: String, quality: String },
    Plant { seed: String, output: String, quality: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub recipe: String,
    pub quality: String,
    pub machine: Option<String>,
    pub machine_modules: Vec<String>,
    pub fuel: Option<String>,
    /// The burn result at save time.
    pub burnt: Option<String>,
    pub beacon: Option<String>,
    pub beacon_count: f64,
    pub beacon_modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub supplier: u32,
    pub consumer: u32,
    pub item: String,
    pub quality: String,
}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// A name that did not resolve against the active catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    pub kind: &'static str,
    pub name: String,
}

/// A saved link that could not be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLink {
    pub supplier: u32,
    pub consumer: u32,
    pub item: String,
    pub reason: String,
}

/// Everything a load had to paper over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub missing: Vec<MissingEntry>,
    pub dropped_links: Vec<DroppedLink>,
    /// Fuels dropped because their node had no burner machine.
    pub dropped_fuels: Vec<String>,
    /// Saved node ids that appeared more than once. The last node with the
    /// id is kept.
    pub duplicate_ids: Vec<u32>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.dropped_links.is_empty()
            && self.dropped_fuels.is_empty()
            && self.duplicate_ids.is_empty()
    }

    fn note<T>(&mut self, kind: &'static str, reference: &CatalogRef<T>) {
        if let CatalogRef::Missing(name) = reference {
            warn!(kind, name = name.as_str(), "unresolved name in saved graph");
            let entry = MissingEntry {
                kind,
                name: name.clone(),
            };
            if !self.missing.contains(&entry) {
                self.missing.push(entry);
            }
        }
    }

    fn drop_link(&mut self, link: &LinkRecord, reason: String) {
        warn!(
            supplier = link.supplier,
            consumer = link.consumer,
            item = link.item.as_str(),
            reason = reason.as_str(),
            "saved link dropped"
        );
        self.dropped_links.push(DroppedLink {
            supplier: link.supplier,
            consumer: link.consumer,
            item: link.item.clone(),
            reason,
        });
    }
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

fn ref_name<T: Copy>(reference: &CatalogRef<T>, lookup: impl Fn(T) -> Option<String>) -> String {
    match reference {
        CatalogRef::Resolved(id) => lookup(*id).unwrap_or_default(),
        CatalogRef::Missing(name) => name.clone(),
    }
}

fn item_name(catalog: &Catalog, item: &CatalogRef<ItemId>) -> String {
    ref_name(item, |id| catalog.item(id).map(|d| d.name.clone()))
}

fn module_names(catalog: &Catalog, modules: &[CatalogRef<ModuleId>]) -> Vec<String> {
    modules
        .iter()
        .map(|m| ref_name(m, |id| catalog.module(id).map(|d| d.name.clone())))
        .collect()
}

fn quality_name(catalog: &Catalog, quality: QualityId) -> String {
    catalog.quality(quality).map(|q| q.name.clone()).unwrap_or_default()
}

fn recipe_record(catalog: &Catalog, node: &RecipeNode) -> RecipeRecord {
    RecipeRecord {
        recipe: ref_name(node.recipe(), |id| catalog.recipe(id).map(|d| d.name.clone())),
        quality: quality_name(catalog, node.quality()),
        machine: node
            .machine()
            .map(|m| ref_name(m, |id| catalog.machine(id).map(|d| d.name.clone()))),
        machine_modules: module_names(catalog, node.machine_modules()),
        fuel: node.fuel().map(|f| item_name(catalog, f)),
        burnt: node.burnt_item(catalog).map(|b| item_name(catalog, &b)),
        beacon: node
            .beacon()
            .map(|b| ref_name(b, |id| catalog.beacon(id).map(|d| d.name.clone()))),
        beacon_count: node.beacon_count(),
        beacon_modules: module_names(catalog, node.beacon_modules()),
    }
}

fn kind_record(catalog: &Catalog, kind: &NodeKind) -> NodeKindRecord {
    let pair = |n: &ItemNode| (item_name(catalog, &n.item), quality_name(catalog, n.quality));
    match kind {
        NodeKind::Recipe(r) => NodeKindRecord::Recipe(recipe_record(catalog, r)),
        NodeKind::Supplier(n) => {
            let (item, quality) = pair(n);
            NodeKindRecord::Supplier { item, quality }
        }
        NodeKind::Consumer(n) => {
            let (item, quality) = pair(n);
            NodeKindRecord::Consumer { item, quality }
        }
        NodeKind::Passthrough(n) => {
            let (item, quality) = pair(n);
            NodeKindRecord::Passthrough { item, quality }
        }
        NodeKind::Spoil(n) => NodeKindRecord::Spoil {
            input: item_name(catalog, &n.input),
            output: item_name(catalog, &n.output),
            quality: quality_name(catalog, n.quality),
        },
        NodeKind::Plant(n) => NodeKindRecord::Plant {
            seed: item_name(catalog, &n.input),
            output: item_name(catalog, &n.output),
            quality: quality_name(catalog, n.quality),
        },
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    catalog: &'a Catalog,
    report: LoadReport,
}

impl Resolver<'_> {
    fn item(&mut self, name: &str) -> CatalogRef<ItemId> {
        let item = self.catalog.item_ref(name);
        self.report.note("item", &item);
        item
    }

    fn quality(&mut self, name: &str) -> QualityId {
        match self.catalog.quality_id(name) {
            Some(q) => q,
            None => {
                self.report
                    .note::<QualityId>("quality", &CatalogRef::Missing(name.to_string()));
                self.catalog.default_quality()
            }
        }
    }

    fn modules(&mut self, names: &[String]) -> Vec<CatalogRef<ModuleId>> {
        names
            .iter()
            .map(|name| {
                let module = self.catalog.module_ref(name);
                self.report.note("module", &module);
                module
            })
            .collect()
    }

    fn item_node(&mut self, item: &str, quality: &str) -> ItemNode {
        ItemNode {
            item: self.item(item),
            quality: self.quality(quality),
        }
    }

    fn conversion(&mut self, input: &str, output: &str, quality: &str) -> ConversionNode {
        ConversionNode {
            input: self.item(input),
            output: self.item(output),
            quality: self.quality(quality),
        }
    }

    fn recipe(&mut self, record: &RecipeRecord) -> RecipeNode {
        let catalog = self.catalog;
        let recipe = catalog.recipe_ref(&record.recipe);
        self.report.note("recipe", &recipe);
        let quality = self.quality(&record.quality);
        let mut node = RecipeNode::new(recipe, quality);

        let machine = record.machine.as_deref().map(|name| catalog.machine_ref(name));
        if let Some(machine) = &machine {
            self.report.note("machine", machine);
        }
        let is_burner = machine
            .as_ref()
            .and_then(CatalogRef::resolved)
            .and_then(|id| catalog.machine(id))
            .is_some_and(|m| m.is_burner());
        node.set_machine(machine);
        node.set_machine_modules(self.modules(&record.machine_modules));

        if let Some(beacon_name) = &record.beacon {
            let beacon = catalog.beacon_ref(beacon_name);
            self.report.note("beacon", &beacon);
            node.set_beacon(Some(beacon));
        }
        node.set_beacon_count(record.beacon_count);
        node.set_beacon_modules(self.modules(&record.beacon_modules));

        if let Some(fuel_name) = &record.fuel {
            if is_burner {
                let fuel = self.item(fuel_name);
                node = node.with_fuel(fuel);
                // Keep a saved burn result that no longer matches the fuel.
                if let Some(burnt_name) = &record.burnt {
                    let natural = node.burnt_item(catalog).map(|b| item_name(catalog, &b));
                    if natural.as_deref() != Some(burnt_name.as_str()) {
                        let burnt = self.item(burnt_name);
                        node = node.with_burnt_override(burnt);
                    }
                }
            } else {
                warn!(
                    recipe = record.recipe.as_str(),
                    fuel = fuel_name.as_str(),
                    "fuel dropped: machine is not a burner"
                );
                self.report.dropped_fuels.push(fuel_name.clone());
            }
        }
        node
    }

    fn kind(&mut self, record: &NodeKindRecord) -> NodeKind {
        match record {
            NodeKindRecord::Recipe(r) => NodeKind::Recipe(self.recipe(r)),
            NodeKindRecord::Supplier { item, quality } => NodeKind::Supplier(self.item_node(item, quality)),
            NodeKindRecord::Consumer { item, quality } => NodeKind::Consumer(self.item_node(item, quality)),
            NodeKindRecord::Passthrough { item, quality } => {
                NodeKind::Passthrough(self.item_node(item, quality))
            }
            NodeKindRecord::Spoil { input, output, quality } => {
                NodeKind::Spoil(self.conversion(input, output, quality))
            }
            NodeKindRecord::Plant { seed, output, quality } => {
                NodeKind::Plant(self.conversion(seed, output, quality))
            }
        }
    }
}

impl ProductionGraph {
    /// Capture the graph as a name-based record. Node ids are renumbered
    /// from zero in arena order.
    pub fn to_record(&self) -> GraphRecord {
        let catalog = self.catalog();
        let mut ids: SecondaryMap<NodeId, u32> = SecondaryMap::new();
        let nodes = self
            .nodes()
            .enumerate()
            .map(|(index, (id, node))| {
                ids.insert(id, index as u32);
                NodeRecord {
                    id: index as u32,
                    location: node.location(),
                    rate_mode: node.rate().mode,
                    actual_rate: node.rate().actual,
                    kind: kind_record(catalog, node.kind()),
                }
            })
            .collect();

        let links = self
            .links()
            .map(|(_, link)| LinkRecord {
                supplier: ids[link.source()],
                consumer: ids[link.destination()],
                item: item_name(catalog, &CatalogRef::Resolved(link.item().item)),
                quality: quality_name(catalog, link.item().quality),
            })
            .collect();

        GraphRecord { nodes, links }
    }

    /// Rebuild a graph from a record. Unknown names load as missing
    /// references; links that no longer fit are dropped. Both are listed in
    /// the returned report.
    pub fn from_record(
        catalog: Arc<Catalog>,
        settings: GraphSettings,
        record: &GraphRecord,
    ) -> (ProductionGraph, LoadReport) {
        let mut graph = ProductionGraph::new(Arc::clone(&catalog), settings);
        let mut resolver = Resolver {
            catalog: &catalog,
            report: LoadReport::default(),
        };

        let mut ids: HashMap<u32, NodeId> = HashMap::new();
        for node_record in &record.nodes {
            let mut node = Node::new(resolver.kind(&node_record.kind), node_record.location);
            let rate = node.rate_mut();
            rate.mode = node_record.rate_mode;
            rate.actual = node_record.actual_rate;
            let id = graph.insert_node(node);
            if let Some(previous) = ids.insert(node_record.id, id) {
                warn!(id = node_record.id, "duplicate node id in saved graph; later node wins");
                graph.remove_node(previous).ok();
                resolver.report.duplicate_ids.push(node_record.id);
            }
        }

        for link in &record.links {
            let (Some(&source), Some(&destination)) = (ids.get(&link.supplier), ids.get(&link.consumer)) else {
                resolver.report.drop_link(link, "unknown node id".to_string());
                continue;
            };
            let Some(item) = catalog.item_id(&link.item) else {
                resolver.report.drop_link(link, format!("unknown item {}", link.item));
                continue;
            };
            let Some(quality) = catalog.quality_id(&link.quality) else {
                resolver.report.drop_link(link, format!("unknown quality {}", link.quality));
                continue;
            };
            match graph.validate_link(source, destination, ItemQuality::new(item, quality)) {
                Ok(valid) => {
                    graph.connect(valid);
                }
                Err(err) => resolver.report.drop_link(link, err.to_string()),
            }
        }

        graph.refresh_all();
        let report = resolver.report;
        info!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            missing = report.missing.len(),
            dropped_links = report.dropped_links.len(),
            "graph loaded"
        );
        (graph, report)
    }
}
