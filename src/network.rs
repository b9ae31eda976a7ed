/*!

Synthetic population generation.

A population is a set of households. Every agent knows all of its household, plus fixed pools of
frequent and occasional acquaintances drawn from outside the household. The daily contact graph
is later sampled from these pools (see `resampler`).

*/

use crate::{
    agent::{Agent, AgentStatus, CandidatePools, Sociability},
    debug,
    graph::ContactGraph,
    AgentId,
};
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    seq::index,
    Rng,
};
use rustc_hash::FxHashSet;
use std::ops::RangeInclusive;

/// Relative frequency of households of 1 to 6 members.
const HOUSEHOLD_SIZE_WEIGHTS: [f64; 6] = [0.33, 0.27, 0.19, 0.15, 0.05, 0.01];

/// Age bands as (relative frequency, death rate once infected).
const AGE_BANDS: [(f64, f64); 6] = [
    (0.28, 0.000_1), // 0-29
    (0.26, 0.001),   // 30-49
    (0.16, 0.006),   // 50-59
    (0.12, 0.025),   // 60-69
    (0.10, 0.085),   // 70-79
    (0.08, 0.20),    // 80+
];

pub const FREQUENT_POOL_SIZE: RangeInclusive<usize> = 5..=15;
pub const OCCASIONAL_POOL_SIZE: RangeInclusive<usize> = 10..=30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkBuilder {
    families: usize,
}

impl NetworkBuilder {
    #[must_use]
    pub fn new(families: usize) -> Self {
        NetworkBuilder { families }
    }

    /// Generates the households, their members and every agent's candidate pools.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> ContactGraph {
        let household_size = WeightedIndex::new(HOUSEHOLD_SIZE_WEIGHTS).unwrap(); // Constant positive weights
        let age_band = WeightedIndex::new(AGE_BANDS.map(|(weight, _)| weight)).unwrap(); // Constant positive weights

        let mut agents = Vec::new();
        let mut households: Vec<std::ops::Range<usize>> = Vec::with_capacity(self.families);
        for _ in 0..self.families {
            let size = household_size.sample(rng) + 1;
            let start = agents.len();
            for _ in 0..size {
                let (_, death_rate) = AGE_BANDS[age_band.sample(rng)];
                agents.push(Agent::new(random_sociability(rng), death_rate));
            }
            households.push(start..agents.len());
        }

        let population = agents.len();
        for household in &households {
            for member in household.clone() {
                let household_pool: Vec<AgentId> = household
                    .clone()
                    .filter(|&other| other != member)
                    .map(AgentId)
                    .collect();

                let mut excluded: FxHashSet<usize> = household.clone().collect();
                let frequent = draw_acquaintances(population, &mut excluded, FREQUENT_POOL_SIZE, rng);
                let occasional =
                    draw_acquaintances(population, &mut excluded, OCCASIONAL_POOL_SIZE, rng);

                agents[member].pools = CandidatePools {
                    household: household_pool,
                    frequent,
                    occasional,
                };
            }
        }

        debug!(
            "generated {} agents in {} households",
            population,
            households.len()
        );
        ContactGraph::from_agents(agents)
    }
}

fn random_sociability<R: Rng + ?Sized>(rng: &mut R) -> Sociability {
    match rng.random_range(0..3) {
        0 => Sociability::Low,
        1 => Sociability::Medium,
        _ => Sociability::High,
    }
}

/// Draws a pool of distinct agents not in `excluded`, and adds them to `excluded`. The pool is
/// smaller than requested when the population runs out of eligible agents.
fn draw_acquaintances<R: Rng + ?Sized>(
    population: usize,
    excluded: &mut FxHashSet<usize>,
    size: RangeInclusive<usize>,
    rng: &mut R,
) -> Vec<AgentId> {
    let eligible = population.saturating_sub(excluded.len());
    let wanted = rng.random_range(size).min(eligible);

    let mut pool = Vec::with_capacity(wanted);
    while pool.len() < wanted {
        let candidate = rng.random_range(0..population);
        if excluded.insert(candidate) {
            pool.push(AgentId(candidate));
        }
    }
    pool
}

/// Exposes `count` distinct living susceptible agents chosen uniformly at random, or all of them
/// if there are fewer. Returns the agents infected.
pub fn seed_infections<R: Rng + ?Sized>(
    graph: &mut ContactGraph,
    count: usize,
    rng: &mut R,
) -> Vec<AgentId> {
    let candidates: Vec<AgentId> = graph
        .agent_ids()
        .filter(|&id| graph.agent(id).status == AgentStatus::Susceptible)
        .collect();
    let seeded: Vec<AgentId> = index::sample(rng, candidates.len(), count.min(candidates.len()))
        .into_iter()
        .map(|position| candidates[position])
        .collect();
    for &id in &seeded {
        graph.agent_mut(id).expose();
    }
    seeded
}
