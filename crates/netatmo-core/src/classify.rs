// ── Module classification ──
//
// A module's kind is inferred from which fields its payload carries,
// checked in a fixed priority order. Once a name is recognized its kind
// and address are cached for the life of the process; unrecognized
// names are not cached and get another look at the next discovery.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::IndoorOrdering;
use crate::model::{ModuleAddress, ModuleKind, ModuleReading, TelemetrySnapshot};

/// Field checked, and the kind it implies, in priority order.
const SIGNATURES: [(&str, ModuleKind); 5] = [
    ("Noise", ModuleKind::Main),
    ("CO2", ModuleKind::Indoor),
    ("Temperature", ModuleKind::Outdoor),
    ("WindStrength", ModuleKind::Wind),
    ("Rain", ModuleKind::Rain),
];

/// The kind a payload's shape implies. First matching field wins.
pub fn kind_of(reading: &ModuleReading) -> ModuleKind {
    SIGNATURES
        .iter()
        .find(|(field, _)| reading.contains(field))
        .map_or(ModuleKind::Unknown, |(_, kind)| *kind)
}

/// Result of classifying one module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Assigned {
        kind: ModuleKind,
        address: ModuleAddress,
    },
    /// No signature field present.
    Unknown,
    /// The address for this kind already belongs to another module.
    Duplicate {
        kind: ModuleKind,
        address: ModuleAddress,
        owner: String,
    },
}

/// Assigns kinds and addresses to module names.
#[derive(Debug, Default)]
pub struct Classifier {
    ordering: IndoorOrdering,
    assigned: HashMap<String, (ModuleKind, ModuleAddress)>,
    owners: HashMap<ModuleAddress, String>,
    next_indoor: usize,
}

impl Classifier {
    pub fn new(ordering: IndoorOrdering) -> Self {
        if ordering == IndoorOrdering::ByName {
            info!("indoor modules are numbered by sorted module name");
        }
        Self {
            ordering,
            ..Self::default()
        }
    }

    /// Cached kind and address for a name.
    pub fn get(&self, name: &str) -> Option<(ModuleKind, &ModuleAddress)> {
        self.assigned.get(name).map(|(kind, addr)| (*kind, addr))
    }

    /// Classify one module. Idempotent for names already assigned.
    pub fn classify(&mut self, name: &str, reading: &ModuleReading) -> Classification {
        if let Some((kind, address)) = self.assigned.get(name) {
            return Classification::Assigned {
                kind: *kind,
                address: address.clone(),
            };
        }

        let kind = kind_of(reading);
        let Some(address) = ModuleAddress::for_kind(kind, self.next_indoor) else {
            info!(module = name, "unrecognized module shape, skipping");
            return Classification::Unknown;
        };

        if let Some(owner) = self.owners.get(&address) {
            warn!(
                module = name,
                %kind,
                %address,
                owner = %owner,
                "address already taken, skipping module"
            );
            return Classification::Duplicate {
                kind,
                address,
                owner: owner.clone(),
            };
        }

        if kind == ModuleKind::Indoor {
            self.next_indoor += 1;
        }
        self.owners.insert(address.clone(), name.to_owned());
        self.assigned
            .insert(name.to_owned(), (kind, address.clone()));
        info!(module = name, %kind, %address, "classified module");

        Classification::Assigned { kind, address }
    }

    /// Classify every module in a snapshot, in the configured order.
    pub fn classify_snapshot(
        &mut self,
        snapshot: &TelemetrySnapshot,
    ) -> Vec<(String, Classification)> {
        let mut entries: Vec<(&str, &ModuleReading)> = snapshot.iter().collect();
        if self.ordering == IndoorOrdering::ByName {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        entries
            .into_iter()
            .map(|(name, reading)| (name.to_owned(), self.classify(name, reading)))
            .collect()
    }
}
