use crate::catalog::Catalog;
use crate::id::*;
use crate::link::{LinkError, NodeLink};
use crate::node::{ConversionNode, ItemNode, Location, Node, NodeIssue, NodeKind};
use crate::rate::{RateContext, RateMode};
use crate::recipe_node::RecipeNode;
use crate::selector::{self, FuelSelector};
use crate::settings::GraphSettings;
use crate::tab::{ItemTab, NodeTabs, TabDirection, is_oversupplied};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by graph mutations. A failed mutation changes nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("link not found: {0:?}")]
    LinkNotFound(LinkId),
    #[error("node {0:?} is not a recipe node")]
    NotARecipeNode(NodeId),
    #[error("unknown recipe: {0:?}")]
    UnknownRecipe(RecipeId),
    #[error("unknown item: {0:?}")]
    UnknownItem(ItemId),
    #[error("unknown machine: {0:?}")]
    UnknownMachine(MachineId),
    #[error("unknown module: {0:?}")]
    UnknownModule(ModuleId),
    #[error("unknown beacon: {0:?}")]
    UnknownBeacon(BeaconId),
    #[error("unknown quality: {0:?}")]
    UnknownQuality(QualityId),
    #[error("node {0:?} has no burner machine, so it cannot take a fuel")]
    NotABurner(NodeId),
    #[error("a fuel or burn result needs a burner machine")]
    FuelWithoutBurner,
    #[error("machine of node {node:?} does not burn {fuel:?}")]
    InvalidFuel { node: NodeId, fuel: ItemId },
    #[error("item {0:?} has no spoil result")]
    NoSpoilResult(ItemId),
    #[error("item {0:?} has no plant result")]
    NoPlantResult(ItemId),
    #[error(transparent)]
    Link(#[from] LinkError),
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Incoming and outgoing links of a single node.
#[derive(Debug, Clone, Default)]
struct NodeAdjacency {
    /// Links whose destination is this node.
    inputs: Vec<LinkId>,
    /// Links whose source is this node.
    outputs: Vec<LinkId>,
}

/// Read-only summary of one node, for UIs and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: NodeId,
    pub name: String,
    pub issues: Vec<NodeIssue>,
    /// Machines needed at the current rate. Zero for non-recipe nodes.
    pub machines: f64,
    pub oversupplied: bool,
}

impl NodeReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A production chain: nodes joined by item links, with one tab per
/// node/item/direction kept in sync after every mutation.
///
/// Nodes hold no back-pointers. Links live in their own arena and each node
/// lists its incident links in an adjacency `SecondaryMap`, so removing a
/// node or a link never leaves dangling references.
#[derive(Debug, Clone)]
pub struct ProductionGraph {
    catalog: Arc<Catalog>,
    settings: GraphSettings,
    nodes: SlotMap<NodeId, Node>,
    links: SlotMap<LinkId, NodeLink>,
    adjacency: SecondaryMap<NodeId, NodeAdjacency>,
    tabs: SecondaryMap<NodeId, NodeTabs>,
    fuel_selector: FuelSelector,
}

impl ProductionGraph {
    pub fn new(catalog: Arc<Catalog>, settings: GraphSettings) -> Self {
        Self {
            catalog,
            settings,
            nodes: SlotMap::with_key(),
            links: SlotMap::with_key(),
            adjacency: SecondaryMap::new(),
            tabs: SecondaryMap::new(),
            fuel_selector: FuelSelector::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn fuel_selector(&self) -> &FuelSelector {
        &self.fuel_selector
    }

    pub fn rate_context(&self) -> RateContext<'_> {
        RateContext::new(&self.catalog, self.settings.rounding_dp)
    }

    /// Replace the settings and recompute every tab.
    pub fn set_settings(&mut self, settings: GraphSettings) {
        self.settings = settings;
        self.refresh_all();
    }

    // -----------------------------------------------------------------------
    // Node creation
    // -----------------------------------------------------------------------

    /// Add a node as given. Every resolved reference must exist in the
    /// catalog, and a recipe node carrying a fuel or burn result must have a
    /// burner machine.
    pub fn add_node(&mut self, kind: NodeKind, location: Location) -> Result<NodeId, GraphError> {
        self.check_refs(&kind)?;
        if let NodeKind::Recipe(recipe) = &kind {
            check_burner(recipe, &self.catalog)?;
        }
        let id = self.insert_node(Node::new(kind, location));
        self.refresh_tabs(id);
        Ok(id)
    }

    /// Add a recipe node with the default machine, modules and fuel picked
    /// by the selectors.
    pub fn add_recipe_node(
        &mut self,
        recipe: RecipeId,
        quality: QualityId,
        location: Location,
    ) -> Result<NodeId, GraphError> {
        if self.catalog.recipe(recipe).is_none() {
            return Err(GraphError::UnknownRecipe(recipe));
        }
        self.check_quality(quality)?;

        let mut node = RecipeNode::new(recipe, quality);
        if let Some(machine) = selector::default_machine(&self.catalog, recipe, &self.settings) {
            node = node
                .with_machine(machine)
                .with_modules(selector::default_modules(&self.catalog, machine, &self.settings));
            if let Some(fuel) = self.fuel_selector.fuel_for(&self.catalog, machine) {
                node = node.with_fuel(fuel);
            }
        }

        let id = self.insert_node(Node::new(NodeKind::Recipe(node), location));
        self.refresh_tabs(id);
        Ok(id)
    }

    pub fn add_supplier(&mut self, item: ItemId, quality: QualityId, location: Location) -> Result<NodeId, GraphError> {
        let node = self.item_node(item, quality)?;
        self.add_node(NodeKind::Supplier(node), location)
    }

    pub fn add_consumer(&mut self, item: ItemId, quality: QualityId, location: Location) -> Result<NodeId, GraphError> {
        let node = self.item_node(item, quality)?;
        self.add_node(NodeKind::Consumer(node), location)
    }

    pub fn add_passthrough(&mut self, item: ItemId, quality: QualityId, location: Location) -> Result<NodeId, GraphError> {
        let node = self.item_node(item, quality)?;
        self.add_node(NodeKind::Passthrough(node), location)
    }

    /// Add a node that lets `item` spoil into its spoil result.
    pub fn add_spoil_node(&mut self, item: ItemId, quality: QualityId, location: Location) -> Result<NodeId, GraphError> {
        self.check_quality(quality)?;
        let def = self.catalog.item(item).ok_or(GraphError::UnknownItem(item))?;
        let output = def.spoil_result.ok_or(GraphError::NoSpoilResult(item))?;
        self.add_node(
            NodeKind::Spoil(ConversionNode {
                input: item.into(),
                output: output.into(),
                quality,
            }),
            location,
        )
    }

    /// Add a node that grows `seed` into its plant result.
    pub fn add_plant_node(&mut self, seed: ItemId, quality: QualityId, location: Location) -> Result<NodeId, GraphError> {
        self.check_quality(quality)?;
        let def = self.catalog.item(seed).ok_or(GraphError::UnknownItem(seed))?;
        let output = def.plant_result.ok_or(GraphError::NoPlantResult(seed))?;
        self.add_node(
            NodeKind::Plant(ConversionNode {
                input: seed.into(),
                output: output.into(),
                quality,
            }),
            location,
        )
    }

    fn item_node(&self, item: ItemId, quality: QualityId) -> Result<ItemNode, GraphError> {
        if self.catalog.item(item).is_none() {
            return Err(GraphError::UnknownItem(item));
        }
        self.check_quality(quality)?;
        Ok(ItemNode {
            item: item.into(),
            quality,
        })
    }

    fn check_quality(&self, quality: QualityId) -> Result<(), GraphError> {
        match self.catalog.quality(quality) {
            Some(_) => Ok(()),
            None => Err(GraphError::UnknownQuality(quality)),
        }
    }

    /// Missing references are allowed; they surface as node issues.
    fn check_refs(&self, kind: &NodeKind) -> Result<(), GraphError> {
        let catalog = &self.catalog;
        let check_item = |item: &CatalogRef<ItemId>| match item.resolved() {
            Some(id) if catalog.item(id).is_none() => Err(GraphError::UnknownItem(id)),
            _ => Ok(()),
        };

        match kind {
            NodeKind::Recipe(node) => {
                self.check_quality(node.quality())?;
                if let Some(id) = node.recipe().resolved()
                    && catalog.recipe(id).is_none()
                {
                    return Err(GraphError::UnknownRecipe(id));
                }
                if let Some(id) = node.machine().and_then(CatalogRef::resolved)
                    && catalog.machine(id).is_none()
                {
                    return Err(GraphError::UnknownMachine(id));
                }
                if let Some(id) = node.beacon().and_then(CatalogRef::resolved)
                    && catalog.beacon(id).is_none()
                {
                    return Err(GraphError::UnknownBeacon(id));
                }
                let modules = node.machine_modules().iter().chain(node.beacon_modules());
                if let Some(id) = modules
                    .filter_map(CatalogRef::resolved)
                    .find(|&id| catalog.module(id).is_none())
                {
                    return Err(GraphError::UnknownModule(id));
                }
                if let Some(fuel) = node.fuel() {
                    check_item(fuel)?;
                }
                if let Some(burnt) = node.burnt_override() {
                    check_item(burnt)?;
                }
            }
            NodeKind::Supplier(node) | NodeKind::Consumer(node) | NodeKind::Passthrough(node) => {
                self.check_quality(node.quality)?;
                check_item(&node.item)?;
            }
            NodeKind::Spoil(node) | NodeKind::Plant(node) => {
                self.check_quality(node.quality)?;
                check_item(&node.input)?;
                check_item(&node.output)?;
            }
        }
        Ok(())
    }

    /// Insert without refreshing tabs. Callers refresh afterwards.
    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.adjacency.insert(id, NodeAdjacency::default());
        debug!(?id, "node added");
        id
    }

    // -----------------------------------------------------------------------
    // Removal and linking
    // -----------------------------------------------------------------------

    /// Remove a node after severing every incident link.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Node, GraphError> {
        let adj = self.adjacency.get(node).ok_or(GraphError::NodeNotFound(node))?;
        let incident: Vec<LinkId> = adj.inputs.iter().chain(adj.outputs.iter()).copied().collect();

        let mut neighbours = BTreeSet::new();
        for link in incident {
            if let Some(removed) = self.disconnect(link) {
                neighbours.insert(removed.source());
                neighbours.insert(removed.destination());
            }
        }
        neighbours.remove(&node);

        self.adjacency.remove(node);
        self.tabs.remove(node);
        let removed = self.nodes.remove(node).ok_or(GraphError::NodeNotFound(node))?;
        debug!(?node, "node removed");

        self.refresh_around(neighbours);
        Ok(removed)
    }

    /// Link `source`'s output tab for `item` to `destination`'s input tab.
    pub fn add_link(&mut self, source: NodeId, destination: NodeId, item: ItemQuality) -> Result<LinkId, GraphError> {
        let link = self.validate_link(source, destination, item)?;
        let id = self.connect(link);
        debug!(?id, ?source, ?destination, ?item, "link added");
        self.refresh_around([source, destination]);
        Ok(id)
    }

    pub fn remove_link(&mut self, link: LinkId) -> Result<NodeLink, GraphError> {
        let removed = self.disconnect(link).ok_or(GraphError::LinkNotFound(link))?;
        debug!(?link, "link removed");
        self.refresh_around([removed.source(), removed.destination()]);
        Ok(removed)
    }

    pub(crate) fn validate_link(
        &self,
        source: NodeId,
        destination: NodeId,
        item: ItemQuality,
    ) -> Result<NodeLink, GraphError> {
        let from = self.nodes.get(source).ok_or(GraphError::NodeNotFound(source))?;
        let to = self.nodes.get(destination).ok_or(GraphError::NodeNotFound(destination))?;
        let link = NodeLink::connect(source, from, destination, to, item, &self.catalog)?;

        let duplicate = self
            .output_links(source)
            .iter()
            .any(|&l| self.links[l].destination() == destination && self.links[l].item() == item);
        if duplicate {
            return Err(LinkError::AlreadyLinked {
                from: source,
                to: destination,
                item,
            }
            .into());
        }
        Ok(link)
    }

    /// Insert a validated link without refreshing tabs.
    pub(crate) fn connect(&mut self, link: NodeLink) -> LinkId {
        let (source, destination) = (link.source(), link.destination());
        let id = self.links.insert(link);
        if let Some(adj) = self.adjacency.get_mut(source) {
            adj.outputs.push(id);
        }
        if let Some(adj) = self.adjacency.get_mut(destination) {
            adj.inputs.push(id);
        }
        id
    }

    /// Remove a link from the arena and both adjacency lists.
    fn disconnect(&mut self, link: LinkId) -> Option<NodeLink> {
        let removed = self.links.remove(link)?;
        if let Some(adj) = self.adjacency.get_mut(removed.source()) {
            adj.outputs.retain(|&l| l != link);
        }
        if let Some(adj) = self.adjacency.get_mut(removed.destination()) {
            adj.inputs.retain(|&l| l != link);
        }
        Some(removed)
    }

    /// Sever the links of `node` carrying `item` on one side. Returns the
    /// nodes on the far end.
    fn sever(&mut self, node: NodeId, item: ItemId, direction: TabDirection) -> Vec<NodeId> {
        let candidates = match direction {
            TabDirection::Input => self.input_links(node).to_vec(),
            TabDirection::Output => self.output_links(node).to_vec(),
        };
        let mut far_ends = Vec::new();
        for link in candidates {
            if self.links[link].item().item != item {
                continue;
            }
            if let Some(removed) = self.disconnect(link) {
                debug!(?link, ?node, ?item, "link severed");
                far_ends.push(match direction {
                    TabDirection::Input => removed.source(),
                    TabDirection::Output => removed.destination(),
                });
            }
        }
        far_ends
    }

    // -----------------------------------------------------------------------
    // Recipe node configuration
    // -----------------------------------------------------------------------

    fn recipe_node(&self, node: NodeId) -> Result<&RecipeNode, GraphError> {
        self.nodes
            .get(node)
            .ok_or(GraphError::NodeNotFound(node))?
            .as_recipe()
            .ok_or(GraphError::NotARecipeNode(node))
    }

    fn recipe_node_mut(&mut self, node: NodeId) -> Result<&mut RecipeNode, GraphError> {
        self.nodes
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?
            .as_recipe_mut()
            .ok_or(GraphError::NotARecipeNode(node))
    }

    /// Change the machine. A burner keeps an accepted fuel or gets the
    /// selector's pick; a non-burner drops the fuel.
    pub fn set_machine(&mut self, node: NodeId, machine: Option<MachineId>) -> Result<(), GraphError> {
        let current = self.recipe_node(node)?;
        let new_def = match machine {
            Some(id) => Some(self.catalog.machine(id).ok_or(GraphError::UnknownMachine(id))?),
            None => None,
        };

        let fuel = match (machine, new_def) {
            (Some(id), Some(def)) if def.is_burner() => match current.fuel_item() {
                Some(fuel) if def.accepts_fuel(fuel) => Some(CatalogRef::Resolved(fuel)),
                _ => self.fuel_selector.fuel_for(&self.catalog, id).map(CatalogRef::Resolved),
            },
            _ => None,
        };
        // A stale burn-result override must not outlive the burner.
        let fuel_changed =
            current.fuel() != fuel.as_ref() || (fuel.is_none() && current.burnt_override().is_some());

        let mut touched = BTreeSet::from([node]);
        if fuel_changed {
            touched.extend(self.apply_fuel_change(node, fuel)?);
        }
        self.recipe_node_mut(node)?.set_machine(machine.map(CatalogRef::Resolved));
        debug!(?node, ?machine, "machine set");
        self.refresh_around(touched);
        Ok(())
    }

    pub fn set_machine_modules(&mut self, node: NodeId, modules: Vec<ModuleId>) -> Result<(), GraphError> {
        self.recipe_node(node)?;
        let modules = self.resolve_modules(modules)?;
        self.recipe_node_mut(node)?.set_machine_modules(modules);
        debug!(?node, "machine modules set");
        self.refresh_around([node]);
        Ok(())
    }

    pub fn set_beacon(&mut self, node: NodeId, beacon: Option<BeaconId>) -> Result<(), GraphError> {
        self.recipe_node(node)?;
        if let Some(id) = beacon
            && self.catalog.beacon(id).is_none()
        {
            return Err(GraphError::UnknownBeacon(id));
        }
        self.recipe_node_mut(node)?.set_beacon(beacon.map(CatalogRef::Resolved));
        debug!(?node, ?beacon, "beacon set");
        self.refresh_around([node]);
        Ok(())
    }

    /// Fractional counts are allowed.
    pub fn set_beacon_count(&mut self, node: NodeId, count: f64) -> Result<(), GraphError> {
        self.recipe_node_mut(node)?.set_beacon_count(count);
        debug!(?node, count, "beacon count set");
        self.refresh_around([node]);
        Ok(())
    }

    pub fn set_beacon_modules(&mut self, node: NodeId, modules: Vec<ModuleId>) -> Result<(), GraphError> {
        self.recipe_node(node)?;
        let modules = self.resolve_modules(modules)?;
        self.recipe_node_mut(node)?.set_beacon_modules(modules);
        debug!(?node, "beacon modules set");
        self.refresh_around([node]);
        Ok(())
    }

    fn resolve_modules(&self, modules: Vec<ModuleId>) -> Result<Vec<CatalogRef<ModuleId>>, GraphError> {
        modules
            .into_iter()
            .map(|id| match self.catalog.module(id) {
                Some(_) => Ok(CatalogRef::Resolved(id)),
                None => Err(GraphError::UnknownModule(id)),
            })
            .collect()
    }

    /// Set or clear the fuel of a burner node.
    ///
    /// Links carrying the old fuel (unless it is also an ingredient) and the
    /// old burnt item (unless it is also a product) are severed.
    pub fn set_fuel(&mut self, node: NodeId, fuel: Option<ItemId>) -> Result<(), GraphError> {
        let current = self.recipe_node(node)?;
        let machine = current
            .machine_def(&self.catalog)
            .filter(|m| m.is_burner())
            .ok_or(GraphError::NotABurner(node))?;
        if let Some(item) = fuel {
            if self.catalog.item(item).is_none() {
                return Err(GraphError::UnknownItem(item));
            }
            if !machine.accepts_fuel(item) {
                return Err(GraphError::InvalidFuel { node, fuel: item });
            }
        }

        let fuel = fuel.map(CatalogRef::Resolved);
        if current.fuel() == fuel.as_ref() {
            return Ok(());
        }
        let mut touched = self.apply_fuel_change(node, fuel)?;
        touched.insert(node);
        self.refresh_around(touched);
        Ok(())
    }

    /// Swap the fuel, sever the links it orphans and remember the choice.
    /// Returns the nodes whose links were severed.
    fn apply_fuel_change(
        &mut self,
        node: NodeId,
        fuel: Option<CatalogRef<ItemId>>,
    ) -> Result<BTreeSet<NodeId>, GraphError> {
        let catalog = Arc::clone(&self.catalog);
        let new_fuel = fuel.as_ref().and_then(CatalogRef::resolved);
        let change = self.recipe_node_mut(node)?.replace_fuel(fuel, &catalog);

        let mut far_ends = BTreeSet::new();
        if let Some(old) = change.orphaned_input {
            far_ends.extend(self.sever(node, old, TabDirection::Input));
        }
        if let Some(old) = change.orphaned_output {
            far_ends.extend(self.sever(node, old, TabDirection::Output));
        }
        if let Some(fuel) = new_fuel {
            self.fuel_selector.use_fuel(fuel);
        }
        debug!(?node, fuel = ?new_fuel, severed = far_ends.len(), "fuel changed");
        Ok(far_ends)
    }

    // -----------------------------------------------------------------------
    // Rates and layout
    // -----------------------------------------------------------------------

    /// Written by the external solver.
    pub fn set_actual_rate(&mut self, node: NodeId, rate: f64) -> Result<(), GraphError> {
        self.nodes.get_mut(node).ok_or(GraphError::NodeNotFound(node))?.rate_mut().actual = rate;
        trace!(?node, rate, "actual rate set");
        self.refresh_around([node]);
        Ok(())
    }

    pub fn set_rate_mode(&mut self, node: NodeId, mode: RateMode) -> Result<(), GraphError> {
        self.nodes.get_mut(node).ok_or(GraphError::NodeNotFound(node))?.rate_mut().mode = mode;
        Ok(())
    }

    pub fn set_location(&mut self, node: NodeId, location: Location) -> Result<(), GraphError> {
        self.nodes.get_mut(node).ok_or(GraphError::NodeNotFound(node))?.set_location(location);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tab refresh
    // -----------------------------------------------------------------------

    fn neighbours(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let inputs = self.input_links(node).iter().map(|&l| self.links[l].source());
        let outputs = self.output_links(node).iter().map(|&l| self.links[l].destination());
        inputs.chain(outputs)
    }

    /// Refresh the given nodes and everything linked to them. A node's
    /// rates feed the link shares seen by its neighbours, and a change in
    /// its link count changes the shares of its other links.
    fn refresh_around(&mut self, seeds: impl IntoIterator<Item = NodeId>) {
        let mut affected = BTreeSet::new();
        for node in seeds {
            if self.nodes.contains_key(node) {
                affected.insert(node);
                affected.extend(self.neighbours(node));
            }
        }
        for node in affected {
            self.refresh_tabs(node);
        }
    }

    pub(crate) fn refresh_all(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().collect();
        for id in ids {
            self.refresh_tabs(id);
        }
    }

    /// Rebuild the tabs of one node from its rates and its links.
    fn refresh_tabs(&mut self, node_id: NodeId) {
        let catalog = Arc::clone(&self.catalog);
        let ctx = RateContext::new(&catalog, self.settings.rounding_dp);
        let Some(node) = self.nodes.get(node_id) else {
            return;
        };

        let mut tabs = NodeTabs::default();
        for item in node.inputs(&catalog) {
            let consume = node.consume_rate(item, &ctx);
            let supplied = ctx.round(
                self.input_links(node_id)
                    .iter()
                    .filter(|&&l| self.links[l].item() == item)
                    .map(|&l| self.link_supplied_share(l, &ctx))
                    .sum(),
            );
            let mut tab = ItemTab::new(node_id, item, TabDirection::Input);
            tab.update_values(consume, supplied, is_oversupplied(TabDirection::Input, consume, supplied));
            tabs.inputs.push(tab);
        }
        for item in node.outputs(&catalog) {
            let supplied = node.supply_rate(item, &ctx);
            let consume = ctx.round(
                self.output_links(node_id)
                    .iter()
                    .filter(|&&l| self.links[l].item() == item)
                    .map(|&l| self.link_demanded_share(l, &ctx))
                    .sum(),
            );
            let mut tab = ItemTab::new(node_id, item, TabDirection::Output);
            tab.update_values(consume, supplied, is_oversupplied(TabDirection::Output, consume, supplied));
            tabs.outputs.push(tab);
        }

        trace!(
            node = ?node_id,
            inputs = tabs.inputs.len(),
            outputs = tabs.outputs.len(),
            "tabs refreshed"
        );
        self.tabs.insert(node_id, tabs);
    }

    /// Source supply split evenly over the source's links for this item.
    fn link_supplied_share(&self, link: LinkId, ctx: &RateContext<'_>) -> f64 {
        let link = &self.links[link];
        let siblings = self
            .output_links(link.source())
            .iter()
            .filter(|&&l| self.links[l].item() == link.item())
            .count();
        self.nodes[link.source()].supply_rate(link.item(), ctx) / siblings as f64
    }

    /// Destination demand split evenly over the destination's links for
    /// this item.
    fn link_demanded_share(&self, link: LinkId, ctx: &RateContext<'_>) -> f64 {
        let link = &self.links[link];
        let siblings = self
            .input_links(link.destination())
            .iter()
            .filter(|&&l| self.links[l].item() == link.item())
            .count();
        self.nodes[link.destination()].consume_rate(link.item(), ctx) / siblings as f64
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn link(&self, link: LinkId) -> Option<&NodeLink> {
        self.links.get(link)
    }

    /// Links whose destination is `node`.
    pub fn input_links(&self, node: NodeId) -> &[LinkId] {
        self.adjacency
            .get(node)
            .map(|adj| adj.inputs.as_slice())
            .unwrap_or(&[])
    }

    /// Links whose source is `node`.
    pub fn output_links(&self, node: NodeId) -> &[LinkId] {
        self.adjacency
            .get(node)
            .map(|adj| adj.outputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn tabs(&self, node: NodeId) -> Option<&NodeTabs> {
        self.tabs.get(node)
    }

    pub fn input_tab(&self, node: NodeId, item: ItemQuality) -> Option<&ItemTab> {
        self.tabs.get(node)?.input(item)
    }

    pub fn output_tab(&self, node: NodeId, item: ItemQuality) -> Option<&ItemTab> {
        self.tabs.get(node)?.output(item)
    }

    /// The share of its source's supply this link carries right now.
    pub fn supplied_share(&self, link: LinkId) -> Option<f64> {
        self.links.contains_key(link).then(|| self.link_supplied_share(link, &self.rate_context()))
    }

    /// The share of its destination's demand this link is asked for.
    pub fn demanded_share(&self, link: LinkId) -> Option<f64> {
        self.links.contains_key(link).then(|| self.link_demanded_share(link, &self.rate_context()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn contains_link(&self, link: LinkId) -> bool {
        self.links.contains_key(link)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &NodeLink)> {
        self.links.iter()
    }

    pub fn node_report(&self, node: NodeId) -> Option<NodeReport> {
        let n = self.nodes.get(node)?;
        let ctx = self.rate_context();
        let machines = n
            .as_recipe()
            .map(|r| r.base_number_of_machines(n.rate().actual, &ctx))
            .unwrap_or(0.0);
        Some(NodeReport {
            node,
            name: n.display_name(&self.catalog),
            issues: n.errors(&self.catalog),
            machines,
            oversupplied: self.tabs.get(node).is_some_and(NodeTabs::any_oversupplied),
        })
    }

    pub fn node_reports(&self) -> Vec<NodeReport> {
        self.nodes.keys().filter_map(|id| self.node_report(id)).collect()
    }

    /// Same as [`node_reports`](Self::node_reports), computed on the rayon
    /// pool over a shared borrow.
    #[cfg(feature = "parallel")]
    pub fn node_reports_par(&self) -> Vec<NodeReport> {
        use rayon::prelude::*;
        let ids: Vec<NodeId> = self.nodes.keys().collect();
        ids.par_iter().filter_map(|&id| self.node_report(id)).collect()
    }
}

/// A recipe node may only carry a fuel or burn result on a burner machine.
fn check_burner(recipe: &RecipeNode, catalog: &Catalog) -> Result<(), GraphError> {
    let burns = recipe.fuel().is_some() || recipe.burnt_override().is_some();
    let is_burner = recipe.machine_def(catalog).is_some_and(|m| m.is_burner());
    if burns && !is_burner {
        return Err(GraphError::FuelWithoutBurner);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn ore(s: &Sample) -> ItemQuality {
        ItemQuality::new(s.iron_ore, s.normal)
    }

    fn plate(s: &Sample) -> ItemQuality {
        ItemQuality::new(s.iron_plate, s.normal)
    }

    #[test]
    fn add_recipe_node_auto_populates() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let id = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();

        let recipe = graph.node(id).unwrap().as_recipe().unwrap();
        // Fastest capable machine is the electric furnace.
        assert_eq!(recipe.machine(), Some(&CatalogRef::Resolved(s.electric_furnace)));
        assert!(recipe.fuel().is_none());
        assert_eq!(graph.tabs(id).unwrap().inputs.len(), 1);
        assert_eq!(graph.tabs(id).unwrap().outputs.len(), 1);
    }

    #[test]
    fn burner_gets_default_fuel() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let id = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_machine(id, Some(s.stone_furnace)).unwrap();

        let recipe = graph.node(id).unwrap().as_recipe().unwrap();
        assert_eq!(recipe.fuel_item(), Some(s.coal));
        assert_eq!(graph.fuel_selector().preferred(), &[s.coal]);
        let tabs = graph.tabs(id).unwrap();
        assert_eq!(tabs.inputs.len(), 2);
        assert_eq!(tabs.outputs.len(), 2);
    }

    #[test]
    fn oversupply_flag_follows_link_shares() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.add_link(supply, smelter, ore(&s)).unwrap();
        graph.set_actual_rate(smelter, 5.0).unwrap();

        for (supplied, expected) in [(7.0, true), (5.0, false), (3.0, false)] {
            graph.set_actual_rate(supply, supplied).unwrap();
            let tab = graph.input_tab(smelter, ore(&s)).unwrap();
            assert_eq!(tab.consume_rate(), 5.0);
            assert_eq!(tab.supplied_rate(), supplied);
            assert_eq!(tab.is_oversupplied(), expected, "supplied {supplied}");
        }
    }

    #[test]
    fn oversized_rounding_setting_keeps_rates_finite() {
        let s = sample_catalog();
        let settings = GraphSettings {
            rounding_dp: 400,
            ..GraphSettings::default()
        };
        let mut graph = ProductionGraph::new(s.catalog.clone(), settings);
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.add_link(supply, smelter, ore(&s)).unwrap();
        graph.set_actual_rate(supply, 3.0).unwrap();
        graph.set_actual_rate(smelter, 2.0).unwrap();

        let out = graph.output_tab(supply, ore(&s)).unwrap();
        assert_eq!(out.supplied_rate(), 3.0);
        assert_eq!(out.consume_rate(), 2.0);
        assert!(graph.input_tab(smelter, ore(&s)).unwrap().is_oversupplied());
    }

    #[test]
    fn supply_splits_across_links() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let a = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        let b = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_actual_rate(supply, 8.0).unwrap();
        graph.set_actual_rate(a, 2.0).unwrap();
        graph.set_actual_rate(b, 2.0).unwrap();

        let la = graph.add_link(supply, a, ore(&s)).unwrap();
        assert_eq!(graph.input_tab(a, ore(&s)).unwrap().supplied_rate(), 8.0);

        let lb = graph.add_link(supply, b, ore(&s)).unwrap();
        // Adding the second link halves what the first one carries.
        assert_eq!(graph.supplied_share(la), Some(4.0));
        assert_eq!(graph.input_tab(a, ore(&s)).unwrap().supplied_rate(), 4.0);
        assert!(graph.input_tab(a, ore(&s)).unwrap().is_oversupplied());
        assert_eq!(graph.demanded_share(lb), Some(2.0));

        let out = graph.output_tab(supply, ore(&s)).unwrap();
        assert_eq!(out.supplied_rate(), 8.0);
        assert_eq!(out.consume_rate(), 4.0);
        assert!(!out.is_oversupplied());
    }

    #[test]
    fn duplicate_link_rejected() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.add_link(supply, smelter, ore(&s)).unwrap();
        assert!(matches!(
            graph.add_link(supply, smelter, ore(&s)),
            Err(GraphError::Link(LinkError::AlreadyLinked { .. }))
        ));
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn remove_node_severs_links() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        let sink = graph.add_consumer(s.iron_plate, s.normal, Location::default()).unwrap();
        graph.add_link(supply, smelter, ore(&s)).unwrap();
        graph.add_link(smelter, sink, plate(&s)).unwrap();
        graph.set_actual_rate(smelter, 3.0).unwrap();
        assert_eq!(graph.input_tab(sink, plate(&s)).unwrap().supplied_rate(), 3.0);

        graph.remove_node(smelter).unwrap();
        assert_eq!(graph.link_count(), 0);
        assert!(graph.output_links(supply).is_empty());
        assert!(graph.tabs(smelter).is_none());
        assert_eq!(graph.input_tab(sink, plate(&s)).unwrap().supplied_rate(), 0.0);
    }

    #[test]
    fn remove_link_refreshes_both_ends() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        let link = graph.add_link(supply, smelter, ore(&s)).unwrap();
        graph.set_actual_rate(supply, 4.0).unwrap();
        graph.set_actual_rate(smelter, 4.0).unwrap();
        assert_eq!(graph.output_tab(supply, ore(&s)).unwrap().consume_rate(), 4.0);

        let removed = graph.remove_link(link).unwrap();
        assert_eq!(removed.source(), supply);
        assert_eq!(graph.output_tab(supply, ore(&s)).unwrap().consume_rate(), 0.0);
        assert_eq!(graph.input_tab(smelter, ore(&s)).unwrap().supplied_rate(), 0.0);
        assert_eq!(graph.remove_link(link), Err(GraphError::LinkNotFound(link)));
    }

    #[test]
    fn fuel_change_severs_fuel_links() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_machine(smelter, Some(s.stone_furnace)).unwrap();
        let coal_supply = graph.add_supplier(s.coal, s.normal, Location::default()).unwrap();
        let ash_sink = graph.add_consumer(s.ash, s.normal, Location::default()).unwrap();
        let coal = ItemQuality::new(s.coal, s.normal);
        let ash = ItemQuality::new(s.ash, s.normal);
        graph.add_link(coal_supply, smelter, coal).unwrap();
        graph.add_link(smelter, ash_sink, ash).unwrap();

        graph.set_fuel(smelter, Some(s.wood)).unwrap();
        assert_eq!(graph.link_count(), 0);
        assert!(graph.output_links(coal_supply).is_empty());
        assert!(graph.input_links(ash_sink).is_empty());
        assert_eq!(graph.fuel_selector().preferred(), &[s.wood, s.coal]);
    }

    #[test]
    fn fuel_change_keeps_ingredient_links() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let coker = graph.add_recipe_node(s.coke_coal, s.normal, Location::default()).unwrap();
        assert_eq!(
            graph.node(coker).unwrap().as_recipe().unwrap().fuel_item(),
            Some(s.coal)
        );
        let coal_supply = graph.add_supplier(s.coal, s.normal, Location::default()).unwrap();
        graph.add_link(coal_supply, coker, ItemQuality::new(s.coal, s.normal)).unwrap();

        graph.set_fuel(coker, Some(s.wood)).unwrap();
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn switching_to_non_burner_clears_fuel() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_machine(smelter, Some(s.stone_furnace)).unwrap();
        let coal_supply = graph.add_supplier(s.coal, s.normal, Location::default()).unwrap();
        graph.add_link(coal_supply, smelter, ItemQuality::new(s.coal, s.normal)).unwrap();

        graph.set_machine(smelter, Some(s.electric_furnace)).unwrap();
        let recipe = graph.node(smelter).unwrap().as_recipe().unwrap();
        assert!(recipe.fuel().is_none());
        assert_eq!(graph.link_count(), 0);
        assert_eq!(graph.tabs(smelter).unwrap().inputs.len(), 1);
    }

    #[test]
    fn burner_swap_reselects_rejected_fuel() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_machine(smelter, Some(s.stone_furnace)).unwrap();
        let coal_supply = graph.add_supplier(s.coal, s.normal, Location::default()).unwrap();
        let ash_sink = graph.add_consumer(s.ash, s.normal, Location::default()).unwrap();
        let ore_supply = graph.add_supplier(s.iron_ore, s.normal, Location::default()).unwrap();
        graph.add_link(coal_supply, smelter, ItemQuality::new(s.coal, s.normal)).unwrap();
        graph.add_link(smelter, ash_sink, ItemQuality::new(s.ash, s.normal)).unwrap();
        graph.add_link(ore_supply, smelter, ore(&s)).unwrap();

        // The stove only burns wood, so coal and its ash go.
        graph.set_machine(smelter, Some(s.wood_stove)).unwrap();
        let recipe = graph.node(smelter).unwrap().as_recipe().unwrap();
        assert_eq!(recipe.fuel_item(), Some(s.wood));
        assert!(recipe.burnt_override().is_none());
        assert!(graph.node(smelter).unwrap().is_valid(graph.catalog()));

        assert_eq!(graph.link_count(), 1);
        assert!(graph.output_links(coal_supply).is_empty());
        assert!(graph.input_links(ash_sink).is_empty());
        assert_eq!(graph.input_links(smelter).len(), 1);
        assert_eq!(graph.fuel_selector().preferred(), &[s.wood, s.coal]);

        let tabs = graph.tabs(smelter).unwrap();
        assert!(tabs.inputs.iter().any(|t| t.item() == ItemQuality::new(s.wood, s.normal)));
        assert_eq!(tabs.outputs.len(), 1);
    }

    #[test]
    fn add_node_rejects_dangling_ids() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let mut add = |node: RecipeNode| graph.add_node(NodeKind::Recipe(node), Location::default());

        assert_eq!(
            add(RecipeNode::new(RecipeId(999), s.normal)),
            Err(GraphError::UnknownRecipe(RecipeId(999)))
        );
        assert_eq!(
            add(RecipeNode::new(s.smelt_iron, QualityId(99))),
            Err(GraphError::UnknownQuality(QualityId(99)))
        );
        assert_eq!(
            add(RecipeNode::new(s.smelt_iron, s.normal).with_machine(MachineId(999))),
            Err(GraphError::UnknownMachine(MachineId(999)))
        );
        assert_eq!(
            add(RecipeNode::new(s.smelt_iron, s.normal).with_beacon(BeaconId(999), 1.0, [s.speed_module])),
            Err(GraphError::UnknownBeacon(BeaconId(999)))
        );
        assert_eq!(
            add(RecipeNode::new(s.smelt_iron, s.normal).with_beacon(s.beacon, 1.0, [ModuleId(999)])),
            Err(GraphError::UnknownModule(ModuleId(999)))
        );
        assert_eq!(
            add(RecipeNode::new(s.smelt_iron, s.normal)
                .with_machine(s.stone_furnace)
                .with_fuel(ItemId(999))),
            Err(GraphError::UnknownItem(ItemId(999)))
        );
        assert_eq!(
            graph.add_node(
                NodeKind::Supplier(ItemNode {
                    item: ItemId(999).into(),
                    quality: s.normal,
                }),
                Location::default(),
            ),
            Err(GraphError::UnknownItem(ItemId(999)))
        );
        assert_eq!(graph.node_count(), 0);

        // Missing names are still accepted and show up as issues.
        let missing = RecipeNode::new(s.smelt_iron, s.normal)
            .with_machine(CatalogRef::Missing("old-furnace".to_string()));
        let id = graph.add_node(NodeKind::Recipe(missing), Location::default()).unwrap();
        assert!(!graph.node(id).unwrap().is_valid(graph.catalog()));
    }

    #[test]
    fn set_fuel_error_paths() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        assert_eq!(graph.set_fuel(smelter, Some(s.coal)), Err(GraphError::NotABurner(smelter)));

        graph.set_machine(smelter, Some(s.stone_furnace)).unwrap();
        assert_eq!(
            graph.set_fuel(smelter, Some(s.iron_ore)),
            Err(GraphError::InvalidFuel {
                node: smelter,
                fuel: s.iron_ore
            })
        );
        // Failed mutations leave the fuel alone.
        assert_eq!(graph.node(smelter).unwrap().as_recipe().unwrap().fuel_item(), Some(s.coal));

        let supply = graph.add_supplier(s.coal, s.normal, Location::default()).unwrap();
        assert_eq!(graph.set_fuel(supply, None), Err(GraphError::NotARecipeNode(supply)));
    }

    #[test]
    fn add_node_rejects_fuel_without_burner() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let node = RecipeNode::new(s.smelt_iron, s.normal)
            .with_machine(s.electric_furnace)
            .with_fuel(s.coal);
        assert_eq!(
            graph.add_node(NodeKind::Recipe(node), Location::default()),
            Err(GraphError::FuelWithoutBurner)
        );
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn unknown_ids_rejected() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        assert_eq!(
            graph.add_recipe_node(RecipeId(999), s.normal, Location::default()),
            Err(GraphError::UnknownRecipe(RecipeId(999)))
        );
        assert_eq!(
            graph.add_supplier(s.iron_ore, QualityId(99), Location::default()),
            Err(GraphError::UnknownQuality(QualityId(99)))
        );
        assert_eq!(
            graph.add_spoil_node(s.iron_ore, s.normal, Location::default()),
            Err(GraphError::NoSpoilResult(s.iron_ore))
        );
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        assert_eq!(
            graph.set_machine_modules(smelter, vec![ModuleId(42)]),
            Err(GraphError::UnknownModule(ModuleId(42)))
        );
        assert_eq!(
            graph.set_beacon(smelter, Some(BeaconId(7))),
            Err(GraphError::UnknownBeacon(BeaconId(7)))
        );
    }

    #[test]
    fn node_report_summarises() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_actual_rate(smelter, 2.0).unwrap();
        graph
            .set_machine_modules(smelter, vec![s.speed_module; 3])
            .unwrap();

        let report = graph.node_report(smelter).unwrap();
        assert_eq!(report.name, "smelt-iron");
        assert!(!report.is_valid());
        assert_eq!(report.issues, vec![NodeIssue::TooManyModules { count: 3, slots: 2 }]);
        assert!(report.machines > 0.0);
        assert_eq!(graph.node_reports().len(), 1);
    }

    #[test]
    fn beacon_changes_refresh_rates() {
        let s = sample_catalog();
        let mut graph = ProductionGraph::new(s.catalog.clone(), GraphSettings::default());
        let smelter = graph.add_recipe_node(s.smelt_iron, s.normal, Location::default()).unwrap();
        graph.set_machine(smelter, Some(s.stone_furnace)).unwrap();
        graph.set_actual_rate(smelter, 1.0).unwrap();
        let coal = ItemQuality::new(s.coal, s.normal);
        let before = graph.input_tab(smelter, coal).unwrap().consume_rate();

        graph.set_beacon(smelter, Some(s.beacon)).unwrap();
        graph.set_beacon_count(smelter, 1.0).unwrap();
        graph.set_beacon_modules(smelter, vec![s.speed_module]).unwrap();
        let after = graph.input_tab(smelter, coal).unwrap().consume_rate();
        assert_ne!(before, after);
    }

    #[test]
    fn error_display() {
        assert!(GraphError::NotARecipeNode(NodeId::default()).to_string().contains("not a recipe node"));
        let err: GraphError = LinkError::SelfLink(NodeId::default()).into();
        assert!(err.to_string().contains("linked to itself"));
    }
}
