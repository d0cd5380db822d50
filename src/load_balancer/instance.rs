//! Backend instance identity.
//!
//! # Responsibilities
//! - Represent a single backend address as an opaque, cheaply cloned value
//! - Parse comma/newline separated address lists
//!
//! # Design Decisions
//! - The address is never interpreted here; the transport decides what it means
//! - Parsing trims whitespace, drops empty entries and keeps the first of any duplicates

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A single backend endpoint eligible to receive forwarded requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instance(Arc<str>);

impl Instance {
    /// Create an instance from an address. Surrounding whitespace is removed.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(Arc::from(address.as_ref().trim()))
    }

    /// The address this instance was created from.
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instance {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Instance {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl AsRef<str> for Instance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse an address list separated by commas and/or newlines.
pub fn parse_instance_list(raw: &str) -> Vec<Instance> {
    dedup_instances(
        raw.split(|c| c == ',' || c == '\n' || c == '\r')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Instance::new),
    )
}

/// Drop empty and repeated addresses, keeping insertion order.
pub fn dedup_instances(instances: impl IntoIterator<Item = Instance>) -> Vec<Instance> {
    let mut seen = HashSet::new();
    instances
        .into_iter()
        .filter(|i| !i.address().is_empty())
        .filter(|i| seen.insert(i.clone()))
        .collect()
}
