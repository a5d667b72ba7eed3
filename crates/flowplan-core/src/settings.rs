use serde::{Deserialize, Serialize};

/// How the default machine for a new recipe node is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStyle {
    #[default]
    Fastest,
    Slowest,
}

/// Which modules fill the machine slots of a new recipe node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStyle {
    #[default]
    None,
    Speed,
    Productivity,
    Efficiency,
}

/// Graph-wide settings. Every field has a default so partial config files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Decimal places reported rates are rounded to, at most
    /// [`MAX_ROUNDING_DP`](crate::rate::MAX_ROUNDING_DP).
    pub rounding_dp: u32,
    pub machine_style: MachineStyle,
    pub module_style: ModuleStyle,
    /// Disabled machines/modules are skipped by the selectors unless set.
    pub include_disabled: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            rounding_dp: 4,
            machine_style: MachineStyle::default(),
            module_style: ModuleStyle::default(),
            include_disabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = GraphSettings::default();
        assert_eq!(s.rounding_dp, 4);
        assert_eq!(s.machine_style, MachineStyle::Fastest);
        assert_eq!(s.module_style, ModuleStyle::None);
        assert!(!s.include_disabled);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let s: GraphSettings =
            serde_json::from_str(r#"{"rounding_dp": 2, "module_style": "productivity"}"#).unwrap();
        assert_eq!(s.rounding_dp, 2);
        assert_eq!(s.module_style, ModuleStyle::Productivity);
        assert_eq!(s.machine_style, MachineStyle::Fastest);
    }
}
