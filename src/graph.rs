/*!

The contact graph: a fixed population of agents plus the edge set of the current day.

Edges are never edited in place. Every day the resampler builds a fresh `DailyContacts` and swaps
it into the graph; the previous day's set can be kept as an owned snapshot for contact tracing.

*/

use crate::{
    agent::{Agent, AgentStatus},
    AgentId,
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeCategory {
    Household,
    Frequent,
    Occasional,
    Random,
}

impl fmt::Display for EdgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeCategory::Household => "household",
            EdgeCategory::Frequent => "frequent",
            EdgeCategory::Occasional => "occasional",
            EdgeCategory::Random => "random",
        };
        f.write_str(name)
    }
}

/// An undirected contact between two agents on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contact {
    pub source: AgentId,
    pub target: AgentId,
    pub category: EdgeCategory,
    pub weight: u32,
}

/// One entry of an agent's adjacency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub agent: AgentId,
    pub weight: u32,
    pub category: EdgeCategory,
}

fn pair_key(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// The simple, undirected, weighted edge set of a single day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyContacts {
    edges: Vec<Contact>,
    adjacency: Vec<Vec<Neighbor>>,
    connected: FxHashSet<(AgentId, AgentId)>,
}

impl DailyContacts {
    /// An empty edge set over `agent_count` agents.
    #[must_use]
    pub fn new(agent_count: usize) -> Self {
        DailyContacts {
            edges: Vec::new(),
            adjacency: vec![Vec::new(); agent_count],
            connected: FxHashSet::default(),
        }
    }

    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Contact] {
        &self.edges
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[must_use]
    pub fn neighbors(&self, agent: AgentId) -> &[Neighbor] {
        self.adjacency
            .get(agent.index())
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, a: AgentId, b: AgentId) -> bool {
        self.connected.contains(&pair_key(a, b))
    }

    /// Weighted degree: the sum of the weights of the edges incident to `agent`.
    #[must_use]
    pub fn strength(&self, agent: AgentId) -> u64 {
        self.neighbors(agent)
            .iter()
            .map(|neighbor| u64::from(neighbor.weight))
            .sum()
    }

    /// Inserts `contact` unless it is a self-loop or its endpoints are already connected.
    /// Returns whether the edge was inserted.
    pub(crate) fn insert(&mut self, contact: Contact) -> bool {
        debug_assert!(contact.weight > 0, "contact weights are positive");
        if contact.source == contact.target
            || !self.connected.insert(pair_key(contact.source, contact.target))
        {
            return false;
        }
        self.adjacency[contact.source.index()].push(Neighbor {
            agent: contact.target,
            weight: contact.weight,
            category: contact.category,
        });
        self.adjacency[contact.target.index()].push(Neighbor {
            agent: contact.source,
            weight: contact.weight,
            category: contact.category,
        });
        self.edges.push(contact);
        true
    }
}

/// The population and its contacts for the current day.
#[derive(Debug, Clone, Default)]
pub struct ContactGraph {
    pub(crate) agents: Vec<Agent>,
    pub(crate) contacts: DailyContacts,
}

impl ContactGraph {
    /// Assembles a graph from already-generated agents. Candidate pools must refer to agents of
    /// this population.
    #[must_use]
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        debug_assert!(agents.iter().all(|agent| {
            let pools = &agent.pools;
            pools
                .household
                .iter()
                .chain(&pools.frequent)
                .chain(&pools.occasional)
                .all(|other| other.index() < agents.len())
        }));
        let contacts = DailyContacts::new(agents.len());
        ContactGraph { agents, contacts }
    }

    #[must_use]
    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + use<> {
        (0..self.agents.len()).map(AgentId)
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id.index()]
    }

    pub fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id.index()]
    }

    #[must_use]
    pub fn contacts(&self) -> &DailyContacts {
        &self.contacts
    }

    /// Whether `a` and `b` may be connected in `contacts`: distinct, both free to meet, and not
    /// already connected.
    #[must_use]
    pub fn admits(&self, contacts: &DailyContacts, a: AgentId, b: AgentId) -> bool {
        a != b
            && self.agents[a.index()].can_meet()
            && self.agents[b.index()].can_meet()
            && !contacts.contains(a, b)
    }

    /// Adds a single contact to today's edge set under the usual admission rule. Returns whether
    /// the contact was added.
    pub fn add_contact(
        &mut self,
        a: AgentId,
        b: AgentId,
        category: EdgeCategory,
        weight: u32,
    ) -> bool {
        if !self.admits(&self.contacts, a, b) {
            return false;
        }
        self.contacts.insert(Contact {
            source: a,
            target: b,
            category,
            weight,
        })
    }

    /// Swaps in a new edge set, returning the old one.
    pub fn replace_contacts(&mut self, contacts: DailyContacts) -> DailyContacts {
        debug_assert_eq!(contacts.agent_count(), self.agents.len());
        std::mem::replace(&mut self.contacts, contacts)
    }

    #[must_use]
    pub fn count_status(&self, status: AgentStatus) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.status == status)
            .count()
    }

    /// Number of agents currently Exposed or Infectious.
    #[must_use]
    pub fn active_infections(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.status.is_active_infection())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Sociability;

    fn population(size: usize) -> ContactGraph {
        ContactGraph::from_agents(
            (0..size)
                .map(|_| Agent::new(Sociability::Medium, 0.0))
                .collect(),
        )
    }

    #[test]
    fn rejects_loops_and_parallel_edges() {
        let mut graph = population(3);
        let (a, b) = (AgentId::new(0), AgentId::new(1));

        assert!(graph.add_contact(a, b, EdgeCategory::Household, 4));
        assert!(!graph.add_contact(b, a, EdgeCategory::Random, 1));
        assert!(!graph.add_contact(a, a, EdgeCategory::Random, 1));

        assert_eq!(graph.contacts().len(), 1);
        assert_eq!(graph.contacts().neighbors(a)[0].category, EdgeCategory::Household);
        assert_eq!(graph.contacts().strength(b), 4);
    }

    #[test]
    fn excludes_deceased_and_quarantined() {
        let mut graph = population(3);
        graph.agent_mut(AgentId::new(1)).status = AgentStatus::Deceased;
        graph.agent_mut(AgentId::new(2)).quarantine_remaining = 3;

        assert!(!graph.add_contact(AgentId::new(0), AgentId::new(1), EdgeCategory::Household, 3));
        assert!(!graph.add_contact(AgentId::new(0), AgentId::new(2), EdgeCategory::Household, 3));
        assert!(graph.contacts().is_empty());
    }

    #[test]
    fn replace_contacts_swaps_edge_sets() {
        let mut graph = population(2);
        graph.add_contact(AgentId::new(0), AgentId::new(1), EdgeCategory::Frequent, 2);

        let previous = graph.replace_contacts(DailyContacts::new(2));

        assert_eq!(previous.len(), 1);
        assert!(graph.contacts().is_empty());
        assert!(graph.contacts().neighbors(AgentId::new(0)).is_empty());
    }
}
