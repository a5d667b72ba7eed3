use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node (production step) in the flow graph.
    pub struct NodeId;

    /// Identifies a link (item flow) in the flow graph.
    pub struct LinkId;
}

/// Identifies an item in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Identifies a recipe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

/// Identifies a machine (assembler, furnace, ...) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineId(pub u32);

/// Identifies a module in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

/// Identifies a beacon in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BeaconId(pub u32);

/// Identifies a quality tier in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualityId(pub u32);

/// An item tagged with the quality it flows at. Tabs and links are keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemQuality {
    pub item: ItemId,
    pub quality: QualityId,
}

impl ItemQuality {
    pub fn new(item: ItemId, quality: QualityId) -> Self {
        Self { item, quality }
    }
}

/// A reference from a node to a catalog entry that may not exist in the
/// active preset. Saved graphs can name entries that were since removed;
/// those load as `Missing` and keep the saved name for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogRef<T> {
    Resolved(T),
    Missing(String),
}

impl<T: Copy> CatalogRef<T> {
    /// The resolved id, or `None` for a missing entry.
    pub fn resolved(&self) -> Option<T> {
        match self {
            CatalogRef::Resolved(id) => Some(*id),
            CatalogRef::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CatalogRef::Missing(_))
    }
}

impl<T> From<T> for CatalogRef<T> {
    fn from(id: T) -> Self {
        CatalogRef::Resolved(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_equality() {
        assert_eq!(ItemId(0), ItemId(0));
        assert_ne!(ItemId(0), ItemId(1));
    }

    #[test]
    fn item_quality_orders_by_item_then_quality() {
        let a = ItemQuality::new(ItemId(1), QualityId(2));
        let b = ItemQuality::new(ItemId(2), QualityId(0));
        assert!(a < b);
    }

    #[test]
    fn catalog_ref_resolution() {
        let resolved: CatalogRef<MachineId> = MachineId(3).into();
        assert_eq!(resolved.resolved(), Some(MachineId(3)));
        assert!(!resolved.is_missing());

        let missing: CatalogRef<MachineId> = CatalogRef::Missing("old-furnace".to_string());
        assert_eq!(missing.resolved(), None);
        assert!(missing.is_missing());
    }
}
