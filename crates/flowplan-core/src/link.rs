use crate::catalog::{Catalog, TempRange};
use crate::id::*;
use crate::node::Node;

/// A directed flow of one item/quality pair from a node's output to
/// another node's input. Carries no rate; shares are read live from the
/// endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLink {
    source: NodeId,
    destination: NodeId,
    item: ItemQuality,
    /// Overlap of the endpoint temperature ranges, for temperature-dependent
    /// fluids.
    temperature: Option<TempRange>,
}

impl NodeLink {
    /// Validate and build a link between two nodes.
    pub fn connect(
        source_id: NodeId,
        source: &Node,
        destination_id: NodeId,
        destination: &Node,
        item: ItemQuality,
        catalog: &Catalog,
    ) -> Result<Self, LinkError> {
        if source_id == destination_id {
            return Err(LinkError::SelfLink(source_id));
        }
        if !source.has_output(item, catalog) {
            return Err(LinkError::NoOutputTab {
                node: source_id,
                item,
            });
        }
        if !destination.has_input(item, catalog) {
            return Err(LinkError::NoInputTab {
                node: destination_id,
                item,
            });
        }

        let temperature_dependent = catalog
            .item(item.item)
            .is_some_and(|def| def.temperature_dependent);
        let temperature = if temperature_dependent {
            let produced = source.output_temperature(item.item, catalog);
            let accepted = destination.input_temperature(item.item, catalog);
            match (produced, accepted) {
                (Some(p), Some(a)) => Some(
                    p.intersect(&a)
                        .ok_or(LinkError::TemperatureMismatch { produced: p, accepted: a })?,
                ),
                (p, a) => p.or(a),
            }
        } else {
            None
        };

        Ok(Self {
            source: source_id,
            destination: destination_id,
            item,
            temperature,
        })
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn item(&self) -> ItemQuality {
        self.item
    }

    pub fn temperature(&self) -> Option<TempRange> {
        self.temperature
    }

    /// True if the link touches `node` on either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.destination == node
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    #[error("node {0:?} cannot be linked to itself")]
    SelfLink(NodeId),
    #[error("node {node:?} has no output tab for {item:?}")]
    NoOutputTab { node: NodeId, item: ItemQuality },
    #[error("node {node:?} has no input tab for {item:?}")]
    NoInputTab { node: NodeId, item: ItemQuality },
    #[error("{from:?} already feeds {item:?} to {to:?}")]
    AlreadyLinked {
        from: NodeId,
        to: NodeId,
        item: ItemQuality,
    },
    #[error("produced temperature {produced:?} is outside the accepted range {accepted:?}")]
    TemperatureMismatch {
        produced: TempRange,
        accepted: TempRange,
    },
}
