//! Production nodes: the closed set of vertex kinds in a production graph.
//!
//! Every variant answers the same questions (which items go in and out, at
//! what rate, and is the configuration valid) through enum dispatch on
//! [`NodeKind`].

use crate::catalog::{Catalog, TempRange};
use crate::id::*;
use crate::rate::{NodeRate, RateContext};
use crate::recipe_node::RecipeNode;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Validity issues
// ---------------------------------------------------------------------------

/// A configuration problem on a node. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeIssue {
    #[error("Recipe \"{0}\" doesn't exist in preset!")]
    RecipeMissing(String),
    #[error("Item \"{0}\" doesn't exist in preset!")]
    ItemMissing(String),
    #[error("No machine exists for this recipe!")]
    NoMachine,
    #[error("Machine \"{0}\" doesn't exist in preset!")]
    MachineMissing(String),
    #[error("Burner machine has no fuel set!")]
    NoFuel,
    #[error("Burner machine has an invalid fuel set ({0})!")]
    InvalidFuel(String),
    #[error("Burner machine's fuel \"{0}\" doesn't exist in preset!")]
    FuelMissing(String),
    #[error("Burning result doesn't match fuel's burn result!")]
    BurntMismatch,
    #[error("Some of the machine modules don't exist in preset!")]
    ModuleMissing,
    #[error("Machine has too many modules ({count}/{slots})!")]
    TooManyModules { count: usize, slots: u32 },
    #[error("Beacon \"{0}\" doesn't exist in preset!")]
    BeaconMissing(String),
    #[error("Some of the beacon modules don't exist in preset!")]
    BeaconModuleMissing,
    #[error("Beacon has too many modules ({count}/{slots})!")]
    TooManyBeaconModules { count: usize, slots: u32 },
    #[error("Spoil result doesn't match the spoiling item!")]
    SpoilMismatch,
    #[error("Plant result doesn't match the seed!")]
    PlantMismatch,
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// A node handling exactly one item: supplier, consumer or passthrough.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub item: CatalogRef<ItemId>,
    pub quality: QualityId,
}

/// A node turning one item into another without a recipe (spoiling, planting).
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionNode {
    pub input: CatalogRef<ItemId>,
    pub output: CatalogRef<ItemId>,
    pub quality: QualityId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Recipe(RecipeNode),
    Supplier(ItemNode),
    Consumer(ItemNode),
    Passthrough(ItemNode),
    Spoil(ConversionNode),
    Plant(ConversionNode),
}

/// Position on the editing canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A vertex in the production graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    rate: NodeRate,
    location: Location,
}

impl Node {
    pub fn new(kind: NodeKind, location: Location) -> Self {
        Self {
            kind,
            rate: NodeRate::default(),
            location,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn rate(&self) -> NodeRate {
        self.rate
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn as_recipe(&self) -> Option<&RecipeNode> {
        match &self.kind {
            NodeKind::Recipe(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn as_recipe_mut(&mut self) -> Option<&mut RecipeNode> {
        match &mut self.kind {
            NodeKind::Recipe(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn rate_mut(&mut self) -> &mut NodeRate {
        &mut self.rate
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Short human-readable label.
    pub fn display_name(&self, catalog: &Catalog) -> String {
        match &self.kind {
            NodeKind::Recipe(r) => catalog.recipe_name(r.recipe()),
            NodeKind::Supplier(n) => format!("Supply: {}", catalog.item_name(&n.item)),
            NodeKind::Consumer(n) => format!("Output: {}", catalog.item_name(&n.item)),
            NodeKind::Passthrough(n) => format!("Pass: {}", catalog.item_name(&n.item)),
            NodeKind::Spoil(n) => format!("Spoil: {}", catalog.item_name(&n.input)),
            NodeKind::Plant(n) => format!("Plant: {}", catalog.item_name(&n.input)),
        }
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Distinct consumed item/quality pairs. Burner fuel flows at the
    /// catalog's default quality; everything else at the node's quality.
    pub fn inputs<'a>(&'a self, catalog: &'a Catalog) -> Box<dyn Iterator<Item = ItemQuality> + 'a> {
        match &self.kind {
            NodeKind::Recipe(r) => {
                let default = catalog.default_quality();
                Box::new(r.inputs(catalog).map(move |item| {
                    let quality = if r.is_fuel_only(item, catalog) {
                        default
                    } else {
                        r.quality()
                    };
                    ItemQuality::new(item, quality)
                }))
            }
            NodeKind::Supplier(_) => Box::new(std::iter::empty()),
            NodeKind::Consumer(n) | NodeKind::Passthrough(n) => Box::new(single(&n.item, n.quality)),
            NodeKind::Spoil(n) | NodeKind::Plant(n) => Box::new(single(&n.input, n.quality)),
        }
    }

    /// Distinct produced item/quality pairs. The burnt item flows at the
    /// catalog's default quality.
    pub fn outputs<'a>(&'a self, catalog: &'a Catalog) -> Box<dyn Iterator<Item = ItemQuality> + 'a> {
        match &self.kind {
            NodeKind::Recipe(r) => {
                let default = catalog.default_quality();
                Box::new(r.outputs(catalog).map(move |item| {
                    let quality = if r.is_burnt_only(item, catalog) {
                        default
                    } else {
                        r.quality()
                    };
                    ItemQuality::new(item, quality)
                }))
            }
            NodeKind::Consumer(_) => Box::new(std::iter::empty()),
            NodeKind::Supplier(n) | NodeKind::Passthrough(n) => Box::new(single(&n.item, n.quality)),
            NodeKind::Spoil(n) | NodeKind::Plant(n) => Box::new(single(&n.output, n.quality)),
        }
    }

    pub fn has_input(&self, item: ItemQuality, catalog: &Catalog) -> bool {
        self.inputs(catalog).any(|i| i == item)
    }

    pub fn has_output(&self, item: ItemQuality, catalog: &Catalog) -> bool {
        self.outputs(catalog).any(|o| o == item)
    }

    /// Accepted temperature range of an input, for temperature-dependent
    /// fluids. `None` means any temperature.
    pub fn input_temperature(&self, item: ItemId, catalog: &Catalog) -> Option<TempRange> {
        let r = self.as_recipe()?;
        r.recipe_def(catalog)?.ingredient(item)?.temperature
    }

    /// Produced temperature of an output, as a single-point range.
    pub fn output_temperature(&self, item: ItemId, catalog: &Catalog) -> Option<TempRange> {
        let r = self.as_recipe()?;
        r.recipe_def(catalog)?
            .product(item)?
            .temperature
            .map(TempRange::point)
    }

    // -----------------------------------------------------------------------
    // Rates
    // -----------------------------------------------------------------------

    /// Unscaled consumption of `item` per unit of `ActualRate`.
    ///
    /// # Panics
    /// If the node does not consume `item`, or on a fuel request without a
    /// burner machine.
    pub fn input_rate_for(&self, item: ItemQuality, ctx: &RateContext<'_>) -> f64 {
        match &self.kind {
            NodeKind::Recipe(r) => r.input_rate_for(item.item, ctx),
            _ if self.has_input(item, ctx.catalog) => 1.0,
            _ => panic!("input rate requested for {item:?}, which this node does not consume"),
        }
    }

    /// Unscaled production of `item` per unit of `ActualRate`.
    ///
    /// # Panics
    /// If the node does not produce `item`, or on a burnt-item request
    /// without a burner machine.
    pub fn output_rate_for(&self, item: ItemQuality, ctx: &RateContext<'_>) -> f64 {
        match &self.kind {
            NodeKind::Recipe(r) => r.output_rate_for(item.item, ctx),
            _ if self.has_output(item, ctx.catalog) => 1.0,
            _ => panic!("output rate requested for {item:?}, which this node does not produce"),
        }
    }

    /// Scaled and rounded consumption at the node's `ActualRate`.
    pub fn consume_rate(&self, item: ItemQuality, ctx: &RateContext<'_>) -> f64 {
        ctx.round(self.input_rate_for(item, ctx) * self.rate.actual)
    }

    /// Scaled and rounded production at the node's `ActualRate`.
    pub fn supply_rate(&self, item: ItemQuality, ctx: &RateContext<'_>) -> f64 {
        ctx.round(self.output_rate_for(item, ctx) * self.rate.actual)
    }

    // -----------------------------------------------------------------------
    // Validity
    // -----------------------------------------------------------------------

    pub fn errors(&self, catalog: &Catalog) -> Vec<NodeIssue> {
        match &self.kind {
            NodeKind::Recipe(r) => r.errors(catalog),
            NodeKind::Supplier(n) | NodeKind::Consumer(n) | NodeKind::Passthrough(n) => {
                missing_item(&n.item).into_iter().collect()
            }
            NodeKind::Spoil(n) => conversion_errors(n, catalog, |def| def.spoil_result, NodeIssue::SpoilMismatch),
            NodeKind::Plant(n) => conversion_errors(n, catalog, |def| def.plant_result, NodeIssue::PlantMismatch),
        }
    }

    pub fn is_valid(&self, catalog: &Catalog) -> bool {
        self.errors(catalog).is_empty()
    }

    /// All issue messages, one per line.
    pub fn error_text(&self, catalog: &Catalog) -> String {
        self.errors(catalog)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn single(item: &CatalogRef<ItemId>, quality: QualityId) -> impl Iterator<Item = ItemQuality> {
    item.resolved()
        .map(|item| ItemQuality::new(item, quality))
        .into_iter()
}

fn missing_item(item: &CatalogRef<ItemId>) -> Option<NodeIssue> {
    match item {
        CatalogRef::Missing(name) => Some(NodeIssue::ItemMissing(name.clone())),
        CatalogRef::Resolved(_) => None,
    }
}

fn conversion_errors(
    node: &ConversionNode,
    catalog: &Catalog,
    result_of: impl Fn(&crate::catalog::ItemDef) -> Option<ItemId>,
    mismatch: NodeIssue,
) -> Vec<NodeIssue> {
    let mut issues: Vec<NodeIssue> = [missing_item(&node.input), missing_item(&node.output)]
        .into_iter()
        .flatten()
        .collect();
    if let (Some(input), Some(output)) = (node.input.resolved(), node.output.resolved())
        && catalog.item(input).and_then(&result_of) != Some(output)
    {
        issues.push(mismatch);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::*;

    fn catalog() -> (Catalog, ItemId, ItemId, ItemId) {
        let mut b = CatalogBuilder::new();
        let fish = b.register_item(ItemDef::new("raw-fish"));
        let rot = b.register_item(ItemDef::new("spoilage"));
        let seed = b.register_item(ItemDef::new("tree-seed"));
        b.mutate_item("raw-fish", |i| i.spoil_result = Some(rot)).unwrap();
        (b.build().unwrap(), fish, rot, seed)
    }

    fn item_node(item: ItemId, quality: QualityId) -> ItemNode {
        ItemNode {
            item: item.into(),
            quality,
        }
    }

    #[test]
    fn supplier_has_unit_output() {
        let (catalog, fish, _, _) = catalog();
        let q = catalog.default_quality();
        let mut node = Node::new(NodeKind::Supplier(item_node(fish, q)), Location::default());
        node.rate_mut().actual = 2.5;
        let ctx = RateContext::new(&catalog, 4);
        let pair = ItemQuality::new(fish, q);

        assert_eq!(node.inputs(&catalog).count(), 0);
        assert_eq!(node.outputs(&catalog).collect::<Vec<_>>(), vec![pair]);
        assert_eq!(node.supply_rate(pair, &ctx), 2.5);
    }

    #[test]
    fn passthrough_has_same_item_both_sides() {
        let (catalog, fish, _, _) = catalog();
        let q = catalog.default_quality();
        let node = Node::new(NodeKind::Passthrough(item_node(fish, q)), Location::default());
        let pair = ItemQuality::new(fish, q);
        assert!(node.has_input(pair, &catalog));
        assert!(node.has_output(pair, &catalog));
    }

    #[test]
    #[should_panic(expected = "does not consume")]
    fn supplier_rejects_input_rate() {
        let (catalog, fish, _, _) = catalog();
        let q = catalog.default_quality();
        let node = Node::new(NodeKind::Supplier(item_node(fish, q)), Location::default());
        let ctx = RateContext::new(&catalog, 4);
        node.input_rate_for(ItemQuality::new(fish, q), &ctx);
    }

    #[test]
    fn spoil_node_validity() {
        let (catalog, fish, rot, seed) = catalog();
        let q = catalog.default_quality();
        let good = Node::new(
            NodeKind::Spoil(ConversionNode {
                input: fish.into(),
                output: rot.into(),
                quality: q,
            }),
            Location::default(),
        );
        assert!(good.is_valid(&catalog));

        let bad = Node::new(
            NodeKind::Spoil(ConversionNode {
                input: fish.into(),
                output: seed.into(),
                quality: q,
            }),
            Location::default(),
        );
        assert_eq!(bad.errors(&catalog), vec![NodeIssue::SpoilMismatch]);
    }

    #[test]
    fn missing_item_reported() {
        let (catalog, _, _, _) = catalog();
        let node = Node::new(
            NodeKind::Consumer(ItemNode {
                item: CatalogRef::Missing("old-item".to_string()),
                quality: catalog.default_quality(),
            }),
            Location::default(),
        );
        assert_eq!(node.inputs(&catalog).count(), 0);
        assert_eq!(node.error_text(&catalog), "Item \"old-item\" doesn't exist in preset!");
    }

    #[test]
    fn error_text_joins_lines() {
        let (catalog, _, _, _) = catalog();
        let node = Node::new(
            NodeKind::Plant(ConversionNode {
                input: CatalogRef::Missing("a".to_string()),
                output: CatalogRef::Missing("b".to_string()),
                quality: catalog.default_quality(),
            }),
            Location::default(),
        );
        let text = node.error_text(&catalog);
        assert_eq!(text.lines().count(), 2);
        assert!(!node.is_valid(&catalog));
    }

    #[test]
    fn issue_messages() {
        assert_eq!(
            NodeIssue::TooManyModules { count: 3, slots: 2 }.to_string(),
            "Machine has too many modules (3/2)!"
        );
        assert_eq!(NodeIssue::NoMachine.to_string(), "No machine exists for this recipe!");
    }
}
