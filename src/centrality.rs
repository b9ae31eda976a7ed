/*!

Weighted centrality measures used to rank agents for testing.

A `CentralityMeasure` scores a set of candidate agents over one day's contacts. `rank_candidates`
orders candidates by descending score; the sort is stable, so candidates with equal scores keep
their input order.

*/

use crate::{graph::DailyContacts, AgentId};
use std::{cmp::Reverse, collections::BinaryHeap};

pub trait CentralityMeasure {
    /// Scores each of `candidates`, in order.
    fn scores(&self, contacts: &DailyContacts, candidates: &[AgentId]) -> Vec<f64>;
}

/// Orders `candidates` by descending centrality. Ties keep the order of `candidates`.
pub fn rank_candidates(
    measure: &dyn CentralityMeasure,
    contacts: &DailyContacts,
    candidates: &[AgentId],
) -> Vec<AgentId> {
    let scores = measure.scores(contacts, candidates);
    debug_assert_eq!(scores.len(), candidates.len());
    let mut ranked: Vec<(f64, AgentId)> = scores.into_iter().zip(candidates.iter().copied()).collect();
    ranked.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    ranked.into_iter().map(|(_, agent)| agent).collect()
}

/// Sum of the weights of an agent's edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedDegree;

impl CentralityMeasure for WeightedDegree {
    fn scores(&self, contacts: &DailyContacts, candidates: &[AgentId]) -> Vec<f64> {
        candidates
            .iter()
            .map(|&agent| {
                #[allow(clippy::cast_precision_loss)]
                let strength = contacts.strength(agent) as f64;
                strength
            })
            .collect()
    }
}

/// Betweenness centrality on the undirected graph, with edge weights read as path lengths.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedBetweenness;

impl CentralityMeasure for WeightedBetweenness {
    fn scores(&self, contacts: &DailyContacts, candidates: &[AgentId]) -> Vec<f64> {
        let betweenness = weighted_betweenness(contacts);
        candidates
            .iter()
            .map(|agent| betweenness[agent.index()])
            .collect()
    }
}

/// Brandes' algorithm with Dijkstra searches. Every unordered pair of endpoints is counted once.
fn weighted_betweenness(contacts: &DailyContacts) -> Vec<f64> {
    let n = contacts.agent_count();
    let mut centrality = vec![0.0; n];

    let mut distance: Vec<Option<u64>> = vec![None; n];
    let mut path_count = vec![0.0f64; n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dependency = vec![0.0f64; n];
    let mut settled = vec![false; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut queue: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

    for source in 0..n {
        if contacts.neighbors(AgentId(source)).is_empty() {
            continue;
        }
        distance.fill(None);
        path_count.fill(0.0);
        dependency.fill(0.0);
        settled.fill(false);
        predecessors.iter_mut().for_each(Vec::clear);
        order.clear();

        distance[source] = Some(0);
        path_count[source] = 1.0;
        queue.push(Reverse((0, source)));

        while let Some(Reverse((dist, v))) = queue.pop() {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            order.push(v);
            for neighbor in contacts.neighbors(AgentId(v)) {
                let w = neighbor.agent.index();
                let candidate = dist + u64::from(neighbor.weight);
                match distance[w] {
                    Some(current) if candidate > current => {}
                    Some(current) if candidate == current => {
                        path_count[w] += path_count[v];
                        predecessors[w].push(v);
                    }
                    _ => {
                        distance[w] = Some(candidate);
                        path_count[w] = path_count[v];
                        predecessors[w].clear();
                        predecessors[w].push(v);
                        queue.push(Reverse((candidate, w)));
                    }
                }
            }
        }

        for &w in order.iter().rev() {
            for &v in &predecessors[w] {
                dependency[v] += path_count[v] / path_count[w] * (1.0 + dependency[w]);
            }
            if w != source {
                centrality[w] += dependency[w];
            }
        }
    }

    // Each pair was counted from both of its endpoints.
    centrality.iter_mut().for_each(|value| *value /= 2.0);
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{Agent, Sociability},
        graph::{ContactGraph, EdgeCategory},
    };

    fn graph_with_edges(size: usize, edges: &[(usize, usize, u32)]) -> ContactGraph {
        let mut graph = ContactGraph::from_agents(
            (0..size)
                .map(|_| Agent::new(Sociability::Medium, 0.0))
                .collect(),
        );
        for &(a, b, weight) in edges {
            assert!(graph.add_contact(AgentId::new(a), AgentId::new(b), EdgeCategory::Random, weight));
        }
        graph
    }

    fn all(size: usize) -> Vec<AgentId> {
        (0..size).map(AgentId::new).collect()
    }

    #[test]
    fn degree_is_weighted() {
        let graph = graph_with_edges(3, &[(0, 1, 2), (0, 2, 5)]);
        let scores = WeightedDegree.scores(graph.contacts(), &all(3));
        assert_eq!(scores, vec![7.0, 2.0, 5.0]);
    }

    #[test]
    fn betweenness_of_a_path() {
        // 0 - 1 - 2 - 3: the inner nodes lie on 2 shortest paths each.
        let graph = graph_with_edges(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1)]);
        let scores = WeightedBetweenness.scores(graph.contacts(), &all(4));
        assert_eq!(scores, vec![0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn betweenness_uses_weights_as_lengths() {
        // The direct 0-2 edge is longer than the detour through 1.
        let graph = graph_with_edges(3, &[(0, 2, 5), (0, 1, 1), (1, 2, 1)]);
        let scores = WeightedBetweenness.scores(graph.contacts(), &all(3));
        assert_eq!(scores, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn betweenness_splits_between_equal_paths() {
        // A square: 0-1-3 and 0-2-3 are equally short.
        let graph = graph_with_edges(4, &[(0, 1, 1), (1, 3, 1), (0, 2, 1), (2, 3, 1)]);
        let scores = WeightedBetweenness.scores(graph.contacts(), &all(4));
        assert_eq!(scores, vec![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let graph = graph_with_edges(4, &[(0, 1, 1), (2, 3, 3)]);
        let candidates = all(4);
        let ranked = rank_candidates(&WeightedDegree, graph.contacts(), &candidates);
        assert_eq!(ranked, vec![AgentId::new(2), AgentId::new(3), AgentId::new(0), AgentId::new(1)]);
    }

    #[test]
    fn ranking_an_empty_candidate_set() {
        let graph = graph_with_edges(2, &[]);
        assert!(rank_candidates(&WeightedBetweenness, graph.contacts(), &[]).is_empty());
    }
}
