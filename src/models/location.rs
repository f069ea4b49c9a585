//! User-defined locations and the network identities that place them.
//!
//! A location matches a sensed network iff the network name is an exact
//! member of its set. No case folding or trimming is applied to identities.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub networks: BTreeSet<String>,
}

impl Location {
    pub fn new<I, S>(name: impl Into<String>, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            networks: networks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, network: &str) -> bool {
        self.networks.contains(network)
    }
}

/// Networks as submitted by a client or found in an older config file:
/// either a bare identifier or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NetworkSpec {
    One(String),
    Many(Vec<String>),
}

impl NetworkSpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            NetworkSpec::One(network) => vec![network],
            NetworkSpec::Many(networks) => networks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub name: String,
    #[serde(alias = "wifi")]
    pub networks: NetworkSpec,
}

/// Validate a full replacement set and normalize every entry's networks to a set.
/// Order of the input is preserved; it decides which location wins when an
/// identity is registered twice.
pub fn normalize_locations(inputs: Vec<LocationInput>) -> Result<Vec<Location>, ValidationError> {
    let mut seen_names = HashSet::new();
    let mut locations = Vec::with_capacity(inputs.len());

    for input in inputs {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !seen_names.insert(name.clone()) {
            return Err(ValidationError::DuplicateName(name));
        }

        let networks = input.networks.into_vec();
        if networks.is_empty() {
            return Err(ValidationError::NoNetworks(name));
        }
        if networks.iter().any(|network| network.is_empty()) {
            return Err(ValidationError::EmptyNetwork(name));
        }

        locations.push(Location {
            name,
            networks: networks.into_iter().collect(),
        });
    }

    Ok(locations)
}

/// First location, in registration order, whose set contains `network`.
pub fn find_location<'a>(locations: &'a [Location], network: &str) -> Option<&'a Location> {
    locations.iter().find(|location| location.matches(network))
}
