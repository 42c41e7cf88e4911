/*!

Locations in the city. Every physical place is a [`Node`] of some [`NodeCategory`]; households,
shops and restaurants belong to a neighborhood, everything else serves the whole city.

A node's occupants are rebuilt by every movement phase and are not meaningful across phases.

*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::context::{Context, DataPlugin};
use crate::error::SimulationError;
use crate::{NodeId, PersonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeCategory {
    #[serde(rename = "h", alias = "household")]
    Household,
    #[serde(rename = "sh", alias = "shop")]
    Shop,
    #[serde(rename = "p", alias = "park")]
    Park,
    #[serde(rename = "s", alias = "school")]
    School,
    #[serde(rename = "r", alias = "restaurant")]
    Restaurant,
    #[serde(rename = "c", alias = "church")]
    Church,
    #[serde(rename = "t", alias = "theater")]
    Theater,
    #[serde(rename = "H", alias = "hospital")]
    Hospital,
    #[serde(rename = "o", alias = "office")]
    Office,
    #[serde(rename = "st", alias = "stadium")]
    Stadium,
    #[serde(rename = "pa", alias = "party_venue")]
    PartyVenue,
    /// The shared commute aggregate. Never a node of the graph, only a room.
    #[serde(rename = "transport")]
    Transport,
}

impl NodeCategory {
    /// Every category that is instantiated as nodes of the location graph.
    pub const ALL: [NodeCategory; 11] = [
        NodeCategory::Household,
        NodeCategory::Shop,
        NodeCategory::Park,
        NodeCategory::School,
        NodeCategory::Restaurant,
        NodeCategory::Church,
        NodeCategory::Theater,
        NodeCategory::Hospital,
        NodeCategory::Office,
        NodeCategory::Stadium,
        NodeCategory::PartyVenue,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            NodeCategory::Household => "h",
            NodeCategory::Shop => "sh",
            NodeCategory::Park => "p",
            NodeCategory::School => "s",
            NodeCategory::Restaurant => "r",
            NodeCategory::Church => "c",
            NodeCategory::Theater => "t",
            NodeCategory::Hospital => "H",
            NodeCategory::Office => "o",
            NodeCategory::Stadium => "st",
            NodeCategory::PartyVenue => "pa",
            NodeCategory::Transport => "transport",
        }
    }

    /// Households, shops and restaurants are placed inside a neighborhood.
    #[must_use]
    pub fn is_neighborhood_local(self) -> bool {
        matches!(
            self,
            NodeCategory::Household | NodeCategory::Shop | NodeCategory::Restaurant
        )
    }
}

impl Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct NeighborhoodId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub category: NodeCategory,
    /// Human readable name, e.g. `s-2` for the third school.
    pub label: String,
    pub neighborhood: Option<NeighborhoodId>,
    /// People present during the current phase, in arrival order.
    pub occupants: Vec<PersonId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    pub nodes: Vec<NodeId>,
    pub people: Vec<PersonId>,
}

#[derive(Default)]
struct NodeData {
    // Indexed by `NodeId.0`.
    nodes: Vec<Node>,
    neighborhoods: Vec<Neighborhood>,
    by_category: BTreeMap<NodeCategory, Vec<NodeId>>,
}

impl DataPlugin for NodeData {
    const new: &'static dyn Fn() -> Self = &NodeData::default;
}

impl NodeData {
    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, SimulationError> {
        self.nodes
            .get_mut(node_id.0)
            .ok_or(SimulationError::UnknownNode(node_id))
    }
}

pub trait ContextNodesExt {
    fn add_neighborhood(&mut self) -> NeighborhoodId;

    /// Adds an empty node. A neighborhood, when given, must already exist.
    fn add_node(
        &mut self,
        category: NodeCategory,
        neighborhood: Option<NeighborhoodId>,
    ) -> Result<NodeId, SimulationError>;

    fn get_node(&self, node_id: NodeId) -> Result<&Node, SimulationError>;

    fn get_neighborhood(
        &self,
        neighborhood_id: NeighborhoodId,
    ) -> Result<&Neighborhood, SimulationError>;

    /// Records `person_id` as a resident of the neighborhood.
    fn add_to_neighborhood(
        &mut self,
        neighborhood_id: NeighborhoodId,
        person_id: PersonId,
    ) -> Result<(), SimulationError>;

    fn node_count(&self) -> usize;
    fn neighborhood_count(&self) -> usize;

    /// Nodes of `category` in creation order.
    fn nodes_of_category(&self, category: NodeCategory) -> Vec<NodeId>;

    /// Ids of every node with at least one occupant, ascending.
    fn occupied_nodes(&self) -> Vec<NodeId>;

    /// Empties every node.
    fn clear_occupancy(&mut self);

    fn place_person(&mut self, person_id: PersonId, node_id: NodeId)
        -> Result<(), SimulationError>;
}

impl ContextNodesExt for Context {
    fn add_neighborhood(&mut self) -> NeighborhoodId {
        let data = self.get_data_container_mut::<NodeData>();
        data.neighborhoods.push(Neighborhood::default());
        NeighborhoodId(data.neighborhoods.len() - 1)
    }

    fn add_node(
        &mut self,
        category: NodeCategory,
        neighborhood: Option<NeighborhoodId>,
    ) -> Result<NodeId, SimulationError> {
        let data = self.get_data_container_mut::<NodeData>();
        let node_id = NodeId(data.nodes.len());

        if let Some(neighborhood_id) = neighborhood {
            data.neighborhoods
                .get_mut(neighborhood_id.0)
                .ok_or_else(|| {
                    SimulationError::ConstructionError(format!(
                        "no neighborhood {neighborhood_id:?} for new {category} node"
                    ))
                })?
                .nodes
                .push(node_id);
        }

        let ids = data.by_category.entry(category).or_default();
        let label = format!("{}-{}", category.code(), ids.len());
        ids.push(node_id);
        data.nodes.push(Node {
            id: node_id,
            category,
            label,
            neighborhood,
            occupants: Vec::new(),
        });
        Ok(node_id)
    }

    fn get_node(&self, node_id: NodeId) -> Result<&Node, SimulationError> {
        self.get_data_container::<NodeData>()
            .and_then(|data| data.nodes.get(node_id.0))
            .ok_or(SimulationError::UnknownNode(node_id))
    }

    fn get_neighborhood(
        &self,
        neighborhood_id: NeighborhoodId,
    ) -> Result<&Neighborhood, SimulationError> {
        self.get_data_container::<NodeData>()
            .and_then(|data| data.neighborhoods.get(neighborhood_id.0))
            .ok_or_else(|| {
                SimulationError::ConstructionError(format!(
                    "unknown neighborhood {neighborhood_id:?}"
                ))
            })
    }

    fn add_to_neighborhood(
        &mut self,
        neighborhood_id: NeighborhoodId,
        person_id: PersonId,
    ) -> Result<(), SimulationError> {
        self.get_data_container_mut::<NodeData>()
            .neighborhoods
            .get_mut(neighborhood_id.0)
            .ok_or_else(|| {
                SimulationError::ConstructionError(format!(
                    "unknown neighborhood {neighborhood_id:?}"
                ))
            })?
            .people
            .push(person_id);
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.get_data_container::<NodeData>()
            .map_or(0, |data| data.nodes.len())
    }

    fn neighborhood_count(&self) -> usize {
        self.get_data_container::<NodeData>()
            .map_or(0, |data| data.neighborhoods.len())
    }

    fn nodes_of_category(&self, category: NodeCategory) -> Vec<NodeId> {
        self.get_data_container::<NodeData>()
            .and_then(|data| data.by_category.get(&category))
            .cloned()
            .unwrap_or_default()
    }

    fn occupied_nodes(&self) -> Vec<NodeId> {
        self.get_data_container::<NodeData>()
            .map(|data| {
                data.nodes
                    .iter()
                    .filter(|node| !node.occupants.is_empty())
                    .map(|node| node.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear_occupancy(&mut self) {
        for node in &mut self.get_data_container_mut::<NodeData>().nodes {
            node.occupants.clear();
        }
    }

    fn place_person(
        &mut self,
        person_id: PersonId,
        node_id: NodeId,
    ) -> Result<(), SimulationError> {
        self.get_data_container_mut::<NodeData>()
            .node_mut(node_id)?
            .occupants
            .push(person_id);
        Ok(())
    }
}
