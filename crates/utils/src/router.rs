use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Name of the entry used when the sender has no entry of its own.
pub const DEFAULT_ROUTE: &str = "default";

/// Outbound transport configuration resolved for one sender.
///
/// The transport value is opaque to routing, it is handed verbatim to the
/// [`TransportFactory`](crate::TransportFactory) that interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderOptions {
    #[serde(default)]
    pub transport: Value,
}

impl SenderOptions {
    pub fn new(transport: Value) -> Self {
        Self { transport }
    }
}

/// Errors that can occur while loading a routing table.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The routing file could not be read.
    #[error("Routing I/O error: {0}")]
    Io(#[from] io::Error),

    /// The routing document is not a valid table.
    #[error("Routing parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Maps sender addresses to their outbound transport configuration.
///
/// Lookups use the exact, case-sensitive sender address. When no usable
/// entry matches, the [`DEFAULT_ROUTE`] entry is used if the table has one.
///
/// Entries are kept as raw JSON and only the one chosen for a sender is
/// read. An entry that is not an object (a comment string, `null`) is not
/// usable and never prevents other senders from being routed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingTable {
    routes: Map<String, Value>,
}

impl RoutingTable {
    /// Creates a new [`RoutingTable`] from the given raw entries.
    pub fn new(routes: Map<String, Value>) -> Self {
        Self { routes }
    }

    /// Parses a routing table from its JSON document, shaped as
    /// `{"<sender>": {"transport": ...}, "default": {"transport": ...}}`.
    ///
    /// Only a document that is not a JSON object at all is rejected.
    pub fn from_json(json: &str) -> Result<Self, RoutingError> {
        let routes: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self::new(routes))
    }

    /// Reads and parses the routing table stored at the given path.
    pub fn from_file(path: &Path) -> Result<Self, RoutingError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Resolves the options for the given sender.
    ///
    /// Returns the sender's own entry, falling back to the default entry,
    /// or `None` when neither is usable.
    pub fn resolve(&self, from: Option<&str>) -> Option<SenderOptions> {
        from.and_then(|from| self.route(from))
            .or_else(|| self.default_route())
    }

    /// Returns the default entry, if the table has a usable one.
    pub fn default_route(&self) -> Option<SenderOptions> {
        self.route(DEFAULT_ROUTE)
    }

    fn route(&self, key: &str) -> Option<SenderOptions> {
        let entry = self.routes.get(key)?.as_object()?;
        let transport = entry.get("transport").cloned().unwrap_or(Value::Null);
        Some(SenderOptions::new(transport))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Loads the routing table from the given path.
///
/// A missing file or an unreadable or malformed document yields `None`, the
/// failure is logged and never returned. Messages are still processed and
/// their dispatch fails for lack of sender options.
pub fn load_routing_table(path: &Path) -> Option<RoutingTable> {
    if !path.exists() {
        warn!(path = %path.display(), "Routing table not found");
        return None;
    }
    match RoutingTable::from_file(path) {
        Ok(table) => {
            if table.default_route().is_none() {
                warn!(
                    path = %path.display(),
                    "Routing table has no usable default entry"
                );
            }
            debug!(
                path = %path.display(),
                routes = table.len(),
                "Routing table loaded"
            );
            Some(table)
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "Failed to load routing table"
            );
            None
        }
    }
}

/// Resolves the options for a sender against an optional routing table.
pub fn resolve_sender_options(
    table: Option<&RoutingTable>,
    from: Option<&str>,
) -> Option<SenderOptions> {
    table.and_then(|table| table.resolve(from))
}
