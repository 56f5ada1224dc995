//! Known schema names, their current versions, aliases and upgrades.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{Result, TimelineError};
use crate::Metadata;

/// Rewrites the fields of an object in place to the next schema version.
pub type UpgradeFn = fn(&mut Metadata);

#[derive(Debug, Clone)]
struct SchemaEntry {
    version: u32,
    /// Keyed by the version each function upgrades *to*.
    upgrades: BTreeMap<u32, UpgradeFn>,
}

/// Schema names the decoder understands.
///
/// Build one at startup and pass it by reference to the decoder; the
/// default registry knows every built-in type.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: HashMap<String, SchemaEntry>,
    aliases: HashMap<String, String>,
}

/// Built-in schemas and their current versions.
const BUILTIN_SCHEMAS: &[(&str, u32)] = &[
    ("Clip", 1),
    ("Gap", 1),
    ("Transition", 1),
    ("Track", 1),
    ("Stack", 1),
    ("Timeline", 1),
    ("Marker", 2),
    ("Effect", 1),
    ("TimeEffect", 1),
    ("LinearTimeWarp", 1),
    ("FreezeFrame", 1),
    ("ExternalReference", 1),
    ("GeneratorReference", 1),
    ("ImageSequenceReference", 1),
    ("MissingReference", 1),
    ("SerializableCollection", 1),
];

/// Older names still found in files.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Filler", "Gap"),
    ("Sequence", "Track"),
    ("SerializeableCollection", "SerializableCollection"),
];

fn marker_range_to_marked_range(data: &mut Metadata) {
    if let Some(range) = data.remove("range") {
        data.insert("marked_range".to_string(), range);
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (name, version) in BUILTIN_SCHEMAS {
            registry.register_type(*name, *version);
        }
        for (alias, existing) in BUILTIN_ALIASES {
            registry.aliases.insert(alias.to_string(), existing.to_string());
        }
        if let Some(marker) = registry.types.get_mut("Marker") {
            marker.upgrades.insert(2, marker_range_to_marked_range);
        }
        registry
    }
}

impl SchemaRegistry {
    /// A registry that knows nothing, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register `name` at `version`. Returns `false` if it was already known.
    pub fn register_type(&mut self, name: impl Into<String>, version: u32) -> bool {
        let name = name.into();
        if self.types.contains_key(&name) {
            return false;
        }
        self.types.insert(
            name,
            SchemaEntry {
                version,
                upgrades: BTreeMap::new(),
            },
        );
        true
    }

    /// Let `alias` be read as the already registered `existing`.
    pub fn register_alias(&mut self, alias: impl Into<String>, existing: &str) -> Result<()> {
        let target = self
            .canonical(existing)
            .ok_or_else(|| TimelineError::NotSupported(existing.to_string()))?
            .to_string();
        self.aliases.insert(alias.into(), target);
        Ok(())
    }

    /// Register the function that brings `name` data up to
    /// `version_to_upgrade_to`. Returns `false` if one is already set.
    pub fn register_upgrade_function(
        &mut self,
        name: &str,
        version_to_upgrade_to: u32,
        upgrade: UpgradeFn,
    ) -> Result<bool> {
        let entry = self
            .types
            .get_mut(name)
            .ok_or_else(|| TimelineError::NotSupported(name.to_string()))?;
        if entry.upgrades.contains_key(&version_to_upgrade_to) {
            return Ok(false);
        }
        entry.upgrades.insert(version_to_upgrade_to, upgrade);
        Ok(true)
    }

    fn canonical<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.types.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    /// The registered name `name` stands for, following aliases.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        let canonical = self.canonical(name)?;
        if canonical != name {
            debug!(alias = name, schema = canonical, "resolved schema alias");
        }
        Some(canonical)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    /// Current version of a registered schema.
    pub fn current_version(&self, name: &str) -> Option<u32> {
        let canonical = self.canonical(name)?;
        self.types.get(canonical).map(|e| e.version)
    }

    /// Run every upgrade between `version` and the current version of
    /// `name`, in order.
    pub fn upgrade(&self, name: &str, version: u32, data: &mut Metadata) -> Result<()> {
        let entry = self
            .canonical(name)
            .and_then(|c| self.types.get(c))
            .ok_or_else(|| TimelineError::NotSupported(name.to_string()))?;

        if version > entry.version {
            return Err(TimelineError::UnsupportedSchema {
                schema: name.to_string(),
                version,
                max: entry.version,
            });
        }
        for (to, upgrade) in entry.upgrades.range(version + 1..=entry.version) {
            debug!(schema = name, from = to - 1, to = *to, "upgrading schema");
            upgrade(data);
        }
        Ok(())
    }
}
