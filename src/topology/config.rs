//! Serializable topology descriptions.
//!
//! A [`TopologyConfig`] is the persisted form of a [`Topology`]. Loading one
//! always yields a clean topology; round state is never persisted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, ValidationError};
use crate::node::NodeId;

use super::Topology;

/// A node entry: position and qubit capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub location: [f64; 2],
    pub qubits: u32,
}

/// A link entry. Endpoints are node indices into [`TopologyConfig::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: NodeId,
    pub b: NodeId,
    /// Explicit length; defaults to the distance between the endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

/// Persisted topology description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Channel-attenuation coefficient.
    pub alpha: f64,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl TopologyConfig {
    /// Same description with a different coefficient.
    #[must_use]
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self {
            alpha,
            ..self.clone()
        }
    }

    /// Parses a JSON description.
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the description as pretty-printed JSON.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a JSON description from `path`.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Writes the description to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> SimResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Builds the topology this description denotes.
    pub fn build(&self) -> Result<Topology, ValidationError> {
        Topology::from_config(self)
    }
}

impl Topology {
    /// Builds a clean topology from a description.
    ///
    /// Link identities follow the order of `config.links`.
    pub fn from_config(config: &TopologyConfig) -> Result<Self, ValidationError> {
        let mut builder = Self::builder(config.alpha);
        for node in &config.nodes {
            builder.add_node(node.location, node.qubits);
        }
        for link in &config.links {
            match link.length {
                Some(length) => builder.add_link_with_length(link.a, link.b, length)?,
                None => builder.add_link(link.a, link.b)?,
            };
        }
        builder.build()
    }

    /// Describes this topology. Lengths are always written explicitly.
    #[must_use]
    pub fn to_config(&self) -> TopologyConfig {
        TopologyConfig {
            alpha: self.alpha,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeSpec {
                    location: [n.location.x, n.location.y],
                    qubits: n.n_qubits(),
                })
                .collect(),
            links: self
                .links
                .iter()
                .map(|l| {
                    let (a, b) = l.endpoints();
                    LinkSpec {
                        a,
                        b,
                        length: Some(l.length()),
                    }
                })
                .collect(),
        }
    }
}
