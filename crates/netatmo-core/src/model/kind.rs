// ── Module kinds and addresses ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Address of the controller node itself.
pub const CONTROLLER_ADDRESS: &str = "netatmo_ws";

/// What a module measures, decided once from its payload shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Main,
    Indoor,
    Outdoor,
    Wind,
    Rain,
    Unknown,
}

/// Stable identifier a module is published under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleAddress(String);

impl ModuleAddress {
    /// Address for a kind. Indoor modules take their ordinal; the other
    /// kinds have exactly one address. `Unknown` has none.
    pub fn for_kind(kind: ModuleKind, indoor_ordinal: usize) -> Option<Self> {
        let address = match kind {
            ModuleKind::Main => "netwsmain".to_owned(),
            ModuleKind::Indoor => format!("netwsin{indoor_ordinal}"),
            ModuleKind::Outdoor => "netwsout".to_owned(),
            ModuleKind::Wind => "netwswind".to_owned(),
            ModuleKind::Rain => "netwsrain".to_owned(),
            ModuleKind::Unknown => return None,
        };
        Some(Self(address))
    }

    pub fn controller() -> Self {
        Self(CONTROLLER_ADDRESS.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_per_kind() {
        let addr = |kind, n| ModuleAddress::for_kind(kind, n).map(|a| a.to_string());
        assert_eq!(addr(ModuleKind::Main, 0).as_deref(), Some("netwsmain"));
        assert_eq!(addr(ModuleKind::Indoor, 0).as_deref(), Some("netwsin0"));
        assert_eq!(addr(ModuleKind::Indoor, 2).as_deref(), Some("netwsin2"));
        assert_eq!(addr(ModuleKind::Outdoor, 5).as_deref(), Some("netwsout"));
        assert_eq!(addr(ModuleKind::Wind, 0).as_deref(), Some("netwswind"));
        assert_eq!(addr(ModuleKind::Rain, 0).as_deref(), Some("netwsrain"));
        assert_eq!(addr(ModuleKind::Unknown, 0), None);
        assert_eq!(ModuleAddress::controller().as_str(), "netatmo_ws");
    }
}
