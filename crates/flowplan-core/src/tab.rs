use crate::id::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabDirection {
    Input,
    Output,
}

/// Per-node, per-item aggregation point where links attach.
///
/// On an input tab `consume_rate` is what the node needs and
/// `supplied_rate` what its links bring in. On an output tab
/// `supplied_rate` is what the node makes and `consume_rate` what its links
/// take away.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTab {
    node: NodeId,
    item: ItemQuality,
    direction: TabDirection,
    consume_rate: f64,
    supplied_rate: f64,
    is_oversupplied: bool,
}

impl ItemTab {
    pub fn new(node: NodeId, item: ItemQuality, direction: TabDirection) -> Self {
        Self {
            node,
            item,
            direction,
            consume_rate: 0.0,
            supplied_rate: 0.0,
            is_oversupplied: false,
        }
    }

    pub fn update_values(&mut self, consume_rate: f64, supplied_rate: f64, is_oversupplied: bool) {
        self.consume_rate = consume_rate;
        self.supplied_rate = supplied_rate;
        self.is_oversupplied = is_oversupplied;
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn item(&self) -> ItemQuality {
        self.item
    }

    pub fn direction(&self) -> TabDirection {
        self.direction
    }

    pub fn consume_rate(&self) -> f64 {
        self.consume_rate
    }

    pub fn supplied_rate(&self) -> f64 {
        self.supplied_rate
    }

    pub fn is_oversupplied(&self) -> bool {
        self.is_oversupplied
    }
}

/// All tabs of one node, in the order of its inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTabs {
    pub inputs: Vec<ItemTab>,
    pub outputs: Vec<ItemTab>,
}

impl NodeTabs {
    pub fn input(&self, item: ItemQuality) -> Option<&ItemTab> {
        self.inputs.iter().find(|t| t.item == item)
    }

    pub fn output(&self, item: ItemQuality) -> Option<&ItemTab> {
        self.outputs.iter().find(|t| t.item == item)
    }

    pub fn any_oversupplied(&self) -> bool {
        self.inputs.iter().any(ItemTab::is_oversupplied)
    }
}

/// Oversupply rule: only input tabs can be oversupplied, and only when the
/// rounded supply strictly exceeds the rounded demand.
pub fn is_oversupplied(direction: TabDirection, consume_rate: f64, supplied_rate: f64) -> bool {
    direction == TabDirection::Input && supplied_rate > consume_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn oversupply_rule() {
        assert!(is_oversupplied(TabDirection::Input, 5.0, 7.0));
        assert!(!is_oversupplied(TabDirection::Input, 5.0, 5.0));
        assert!(!is_oversupplied(TabDirection::Input, 5.0, 3.0));
        assert!(!is_oversupplied(TabDirection::Output, 5.0, 7.0));
    }

    #[test]
    fn update_values_stores_unclamped() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let item = ItemQuality::new(ItemId(0), QualityId(0));
        let mut tab = ItemTab::new(nodes.insert(()), item, TabDirection::Input);
        tab.update_values(5.0, 70.0, true);
        assert_eq!(tab.consume_rate(), 5.0);
        assert_eq!(tab.supplied_rate(), 70.0);
        assert!(tab.is_oversupplied());

        let tabs = NodeTabs {
            inputs: vec![tab],
            outputs: Vec::new(),
        };
        assert!(tabs.any_oversupplied());
        assert!(tabs.input(item).is_some());
        assert!(tabs.output(item).is_none());
    }
}
