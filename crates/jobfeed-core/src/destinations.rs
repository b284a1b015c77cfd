use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;

use crate::error::AppError;
use crate::models::Destination;
use crate::traits::DestinationResolver;

/// In-memory destination table, shared between the command surface and the
/// scheduler. Entries may be added or dropped while schedules are live.
#[derive(Debug, Default)]
pub struct DestinationDirectory {
    entries: RwLock<HashMap<String, Destination>>,
}

impl DestinationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_destinations(destinations: impl IntoIterator<Item = Destination>) -> Self {
        let entries = destinations
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn insert(&self, destination: Destination) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(destination.id.clone(), destination);
    }

    pub fn remove(&self, destination_id: &str) -> Option<Destination> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(destination_id)
    }

    pub fn ids(&self) -> Vec<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<_> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl DestinationResolver for DestinationDirectory {
    fn resolve(&self, destination_id: &str) -> Option<Destination> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(destination_id).cloned()
    }
}

impl FromStr for Destination {
    type Err = AppError;

    /// Parse `id=endpoint`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, endpoint) = s
            .split_once('=')
            .ok_or_else(|| AppError::Generic(format!("expected id=endpoint, got '{s}'")))?;
        let (id, endpoint) = (id.trim(), endpoint.trim());
        if id.is_empty() || endpoint.is_empty() {
            return Err(AppError::Generic(format!(
                "destination id and endpoint must be non-empty in '{s}'"
            )));
        }
        Ok(Destination {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}
