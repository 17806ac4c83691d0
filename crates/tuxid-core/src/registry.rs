//! Catalog of known machine-identifying signals.
//!
//! Every signal the collection script reports has a [`SignalDefinition`]
//! describing whether the user can reset it and which privilege is needed to
//! read it. The registry is pure data: it is built once per process and only
//! ever looked up by exact signal name.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuxidError};

/// Grouping of a signal by what it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    /// Firmware and hardware identifiers.
    Hardware,
    /// Identifiers written by the OS or the user.
    Software,
    /// Addresses and interface names.
    Network,
    /// Kernel, distribution and locale.
    Os,
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware"),
            Self::Software => write!(f, "software"),
            Self::Network => write!(f, "network"),
            Self::Os => write!(f, "os"),
        }
    }
}

/// Privilege required to read a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadPrivilege {
    /// Any local user.
    #[serde(rename = "local")]
    Local,
    /// Local root only.
    #[serde(rename = "local root")]
    LocalRoot,
}

impl std::fmt::Display for ReadPrivilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::LocalRoot => write!(f, "local root"),
        }
    }
}

/// Metadata about one signal type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDefinition {
    /// Exact signal name as emitted by the collection script (join key).
    pub name: String,
    /// Whether an unprivileged user can change the value.
    pub user_resettable: bool,
    /// Privilege needed to read the value.
    pub read_privilege: ReadPrivilege,
    /// What the signal describes.
    pub category: SignalCategory,
}

use ReadPrivilege::{Local, LocalRoot};
use SignalCategory::{Hardware, Network, Os, Software};

/// Built-in table: (name, category, user_resettable, read privilege).
const BUILTIN_SIGNALS: &[(&str, SignalCategory, bool, ReadPrivilege)] = &[
    ("Device Model", Hardware, false, Local),
    ("Device Vendor", Hardware, false, Local),
    ("Main Board Product UUID", Hardware, false, LocalRoot),
    ("Main Board Product Serial", Hardware, false, LocalRoot),
    ("Storage Devices UUIDs", Hardware, true, Local),
    ("Processor Model Name", Hardware, false, Local),
    ("Total Memory (RAM)", Hardware, false, Local),
    ("Total Disk Space", Hardware, true, Local),
    ("Machine ID", Software, true, Local),
    ("Device hostid", Software, true, Local),
    ("Hostname", Software, true, Local),
    ("Random Boot UUID", Software, false, Local),
    ("Private IP Address", Network, true, Local),
    ("Public IP Address", Network, true, Local),
    ("MAC Address", Network, true, Local),
    ("Main Network Interface", Network, false, Local),
    ("OS Locale Settings", Os, true, Local),
    ("Kernel Version", Os, false, Local),
    ("OS Version", Os, false, Local),
    ("Last Boot Time", Os, false, Local),
];

static BUILTIN: LazyLock<SignalRegistry> = LazyLock::new(|| {
    SignalRegistry::from_definitions(BUILTIN_SIGNALS.iter().map(
        |&(name, category, user_resettable, read_privilege)| SignalDefinition {
            name: name.to_string(),
            user_resettable,
            read_privilege,
            category,
        },
    ))
});

/// Immutable, name-keyed catalog of [`SignalDefinition`]s.
#[derive(Debug, Clone)]
pub struct SignalRegistry {
    definitions: Vec<SignalDefinition>,
    by_name: BTreeMap<String, usize>,
}

impl SignalRegistry {
    /// The built-in registry, constructed on first use.
    pub fn builtin() -> &'static SignalRegistry {
        &BUILTIN
    }

    /// Build a registry from definitions. Later entries replace earlier ones
    /// with the same name, keeping the earlier position.
    pub fn from_definitions(defs: impl IntoIterator<Item = SignalDefinition>) -> Self {
        let mut definitions: Vec<SignalDefinition> = Vec::new();
        let mut by_name = BTreeMap::new();
        for def in defs {
            match by_name.get(&def.name) {
                Some(&idx) => definitions[idx] = def,
                None => {
                    by_name.insert(def.name.clone(), definitions.len());
                    definitions.push(def);
                }
            }
        }
        Self {
            definitions,
            by_name,
        }
    }

    /// Built-in table extended by a JSON array of definitions.
    ///
    /// ```json
    /// [{"name": "GPU Serial", "user_resettable": false,
    ///   "read_privilege": "local root", "category": "hardware"}]
    /// ```
    pub fn with_overrides(json: &str) -> Result<Self> {
        let extra: Vec<SignalDefinition> = serde_json::from_str(json)
            .map_err(|e| TuxidError::Config(format!("registry override: {e}")))?;
        log::info!("registry: applying {} override definition(s)", extra.len());
        Ok(Self::from_definitions(
            Self::builtin().definitions.iter().cloned().chain(extra),
        ))
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&SignalDefinition> {
        self.by_name.get(name).map(|&idx| &self.definitions[idx])
    }

    /// All definitions in table order.
    pub fn definitions(&self) -> &[SignalDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
