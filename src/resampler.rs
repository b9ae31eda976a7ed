/*!

Daily regeneration of the contact graph.

Each day the whole edge set is rebuilt from the agents' fixed candidate pools: every household
contact, a sociability-dependent share of the frequent and occasional contacts, and a batch of
random-mixing contacts. The optional phases are thinned by the day's restriction factor.

*/

use crate::{
    agent::Sociability,
    graph::{Contact, ContactGraph, DailyContacts, EdgeCategory},
    trace,
    AgentId,
};
use rand::{seq::SliceRandom, Rng};
use std::ops::RangeInclusive;

pub const HOUSEHOLD_WEIGHTS: RangeInclusive<u32> = 3..=7;
pub const SOCIAL_WEIGHTS: RangeInclusive<u32> = 1..=5;
pub const RANDOM_WEIGHT: u32 = 1;

/// Random-mixing contacts per agent are drawn uniformly from this range before restriction.
const RANDOM_CONTACTS_PER_AGENT: (f64, f64) = (1.0, 7.0);

/// Number of edges created by each phase of a resampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleSummary {
    pub household: usize,
    pub frequent: usize,
    pub occasional: usize,
    pub random: usize,
}

impl ResampleSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.household + self.frequent + self.occasional + self.random
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeResampler;

impl EdgeResampler {
    /// Replaces the graph's edges with a freshly drawn set. `restriction_factor` is the fraction
    /// of optional (non-household) contacts kept; 1 means no restriction.
    pub fn resample<R: Rng + ?Sized>(
        &self,
        graph: &mut ContactGraph,
        restriction_factor: f64,
        rng: &mut R,
    ) -> ResampleSummary {
        debug_assert!((0.0..=1.0).contains(&restriction_factor));
        let mut contacts = DailyContacts::new(graph.population());

        let summary = ResampleSummary {
            household: self.household_phase(graph, &mut contacts, rng),
            frequent: self.pool_phase(
                graph,
                &mut contacts,
                EdgeCategory::Frequent,
                restriction_factor,
                rng,
            ),
            occasional: self.pool_phase(
                graph,
                &mut contacts,
                EdgeCategory::Occasional,
                restriction_factor,
                rng,
            ),
            random: self.random_phase(graph, &mut contacts, restriction_factor, rng),
        };
        trace!("resampled contacts: {:?}", summary);

        graph.replace_contacts(contacts);
        summary
    }

    fn household_phase<R: Rng + ?Sized>(
        &self,
        graph: &ContactGraph,
        contacts: &mut DailyContacts,
        rng: &mut R,
    ) -> usize {
        let mut added = 0;
        for (index, agent) in graph.agents().iter().enumerate() {
            let source = AgentId(index);
            for &target in &agent.pools.household {
                if graph.admits(contacts, source, target) {
                    let weight = rng.random_range(HOUSEHOLD_WEIGHTS);
                    added += usize::from(contacts.insert(Contact {
                        source,
                        target,
                        category: EdgeCategory::Household,
                        weight,
                    }));
                }
            }
        }
        added
    }

    fn pool_phase<R: Rng + ?Sized>(
        &self,
        graph: &ContactGraph,
        contacts: &mut DailyContacts,
        category: EdgeCategory,
        restriction_factor: f64,
        rng: &mut R,
    ) -> usize {
        let mut added = 0;
        let mut candidates: Vec<AgentId> = Vec::new();
        for (index, agent) in graph.agents().iter().enumerate() {
            let source = AgentId(index);
            let pool = match category {
                EdgeCategory::Frequent => &agent.pools.frequent,
                EdgeCategory::Occasional => &agent.pools.occasional,
                EdgeCategory::Household | EdgeCategory::Random => {
                    unreachable!("{category} contacts are not drawn from an optional pool")
                }
            };
            candidates.clone_from(pool);
            candidates.shuffle(rng);

            let count = daily_contact_count(agent.sociability, candidates.len(), rng.random());
            let count = restrict(count, restriction_factor);

            for &target in &candidates[..count] {
                if graph.admits(contacts, source, target) {
                    let weight = rng.random_range(SOCIAL_WEIGHTS);
                    added += usize::from(contacts.insert(Contact {
                        source,
                        target,
                        category,
                        weight,
                    }));
                }
            }
        }
        added
    }

    fn random_phase<R: Rng + ?Sized>(
        &self,
        graph: &ContactGraph,
        contacts: &mut DailyContacts,
        restriction_factor: f64,
        rng: &mut R,
    ) -> usize {
        let population = graph.population();
        if population == 0 {
            return 0;
        }
        let (low, high) = RANDOM_CONTACTS_PER_AGENT;
        #[allow(clippy::cast_precision_loss)]
        let population_f = population as f64;
        let proposals = population_f * low + rng.random::<f64>() * (high - low) * population_f;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let proposals = (proposals * restriction_factor) as usize;

        let mut added = 0;
        for _ in 0..proposals {
            let source = AgentId(rng.random_range(0..population));
            let target = AgentId(rng.random_range(0..population));
            if graph.admits(contacts, source, target) {
                added += usize::from(contacts.insert(Contact {
                    source,
                    target,
                    category: EdgeCategory::Random,
                    weight: RANDOM_WEIGHT,
                }));
            }
        }
        added
    }
}

/// How many of a shuffled pool of `pool_size` candidates an agent meets, before restriction.
/// Low sociability draws from the first third of the pool, medium from the second, high from
/// the last third (inclusive of the whole pool). `draw` is uniform in [0, 1).
#[must_use]
pub fn daily_contact_count(sociability: Sociability, pool_size: usize, draw: f64) -> usize {
    debug_assert!((0.0..1.0).contains(&draw));
    let third = pool_size / 3;
    let two_thirds = 2 * pool_size / 3;
    let within = |span: usize| -> usize {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let offset = (draw * span as f64) as usize;
        offset
    };
    match sociability {
        Sociability::Low => within(third),
        Sociability::Medium => third + within(two_thirds - third),
        Sociability::High => two_thirds + within(pool_size + 1 - two_thirds),
    }
}

fn restrict(count: usize, restriction_factor: f64) -> usize {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let restricted = (count as f64 * restriction_factor) as usize;
    restricted.min(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentStatus, CandidatePools};
    use rand::{rngs::StdRng, SeedableRng};

    fn ids(indices: &[usize]) -> Vec<AgentId> {
        indices.iter().copied().map(AgentId::new).collect()
    }

    /// Two households {0, 1, 2} and {3, 4}; everybody knows everybody else outside the home.
    fn two_households() -> ContactGraph {
        let households = [vec![0, 1, 2], vec![3, 4]];
        let mut agents = Vec::new();
        for household in &households {
            for &member in household {
                let others: Vec<usize> = (0..5).filter(|other| !household.contains(other)).collect();
                let pools = CandidatePools {
                    household: ids(&household
                        .iter()
                        .copied()
                        .filter(|&other| other != member)
                        .collect::<Vec<_>>()),
                    frequent: ids(&others),
                    occasional: ids(&others),
                };
                agents.push(Agent::new(Sociability::High, 0.0).with_pools(pools));
            }
        }
        ContactGraph::from_agents(agents)
    }

    #[test]
    fn household_edges_are_complete_and_heavy() {
        let mut graph = two_households();
        let mut rng = StdRng::seed_from_u64(1);

        let summary = EdgeResampler.resample(&mut graph, 0.0, &mut rng);

        // Full restriction leaves only the household cliques: 3 + 1 edges.
        assert_eq!(summary.household, 4);
        assert_eq!(summary.frequent + summary.occasional + summary.random, 0);
        for contact in graph.contacts().edges() {
            assert_eq!(contact.category, EdgeCategory::Household);
            assert!(HOUSEHOLD_WEIGHTS.contains(&contact.weight));
        }
    }

    #[test]
    fn graph_is_simple_and_avoids_excluded_agents() {
        let mut graph = two_households();
        graph.agent_mut(AgentId::new(1)).status = AgentStatus::Deceased;
        graph.agent_mut(AgentId::new(3)).quarantine_remaining = 5;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            EdgeResampler.resample(&mut graph, 1.0, &mut rng);
            let contacts = graph.contacts();
            let mut seen = rustc_hash::FxHashSet::default();
            for contact in contacts.edges() {
                assert_ne!(contact.source, contact.target);
                let key = if contact.source < contact.target {
                    (contact.source, contact.target)
                } else {
                    (contact.target, contact.source)
                };
                assert!(seen.insert(key), "parallel edge {key:?}");
                assert!(graph.agent(contact.source).can_meet());
                assert!(graph.agent(contact.target).can_meet());
            }
        }
    }

    #[test]
    fn previous_edges_are_discarded() {
        let mut graph = two_households();
        graph.add_contact(AgentId::new(0), AgentId::new(4), EdgeCategory::Random, 1);
        let mut rng = StdRng::seed_from_u64(3);

        EdgeResampler.resample(&mut graph, 0.0, &mut rng);

        assert!(!graph.contacts().contains(AgentId::new(0), AgentId::new(4)));
    }

    #[test]
    fn empty_pools_and_population_are_tolerated() {
        let mut graph = ContactGraph::from_agents(vec![Agent::new(Sociability::Low, 0.0)]);
        let mut rng = StdRng::seed_from_u64(3);
        let summary = EdgeResampler.resample(&mut graph, 1.0, &mut rng);
        assert_eq!(summary.total(), 0);

        let mut empty = ContactGraph::default();
        assert_eq!(EdgeResampler.resample(&mut empty, 1.0, &mut rng).total(), 0);
    }

    #[test]
    fn contact_count_by_sociability() {
        // Pool of 9: thirds end at 3 and 6.
        assert_eq!(daily_contact_count(Sociability::Low, 9, 0.0), 0);
        assert_eq!(daily_contact_count(Sociability::Low, 9, 0.99), 2);
        assert_eq!(daily_contact_count(Sociability::Medium, 9, 0.0), 3);
        assert_eq!(daily_contact_count(Sociability::Medium, 9, 0.99), 5);
        assert_eq!(daily_contact_count(Sociability::High, 9, 0.0), 6);
        assert_eq!(daily_contact_count(Sociability::High, 9, 0.99), 9);
        assert_eq!(daily_contact_count(Sociability::High, 0, 0.5), 0);
    }

    #[test]
    fn restriction_truncates_toward_zero() {
        assert_eq!(restrict(7, 0.5), 3);
        assert_eq!(restrict(7, 1.0), 7);
        assert_eq!(restrict(7, 0.0), 0);
    }
}
