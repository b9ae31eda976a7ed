/*!

Disease progression and transmission over one day's contacts.

Agents follow S → E → I → {R, D}. Alongside the true status every agent carries an
`exposure_probability`, a smoothed estimate of its chance of having been exposed that decays over
time and diffuses along today's edges. The signal is what contact tracing reinforces; it never
feeds back into the true status.

*/

use crate::{
    agent::{AgentStatus, Symptom},
    graph::ContactGraph,
    AgentId,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of the decay parameter α. Keeps `atan(α)` below 1 so that the decay
/// term of the exposure update stays positive.
pub const MAX_DECAY_STRENGTH: f64 = 1.557;

/// Cases at or above this draw are severe.
const SEVERE_CASE_THRESHOLD: f64 = 0.8;

/// Probability that a newly infectious agent needs critical care.
const CRITICAL_CARE_PROBABILITY: f64 = 0.02;

/// Symptoms of a mild case, each present when the case draw is below its threshold.
const MILD_SYMPTOMS: [(f64, Symptom); 4] = [
    (0.05, Symptom::LossOfTasteOrSmell),
    (0.2, Symptom::Fever),
    (0.2, Symptom::Cough),
    (0.2, Symptom::Tiredness),
];

/// Symptoms of a severe case. Draws here are at least `SEVERE_CASE_THRESHOLD`, so only the first
/// row can match.
const SEVERE_SYMPTOMS: [(f64, Symptom); 4] = [
    (0.99, Symptom::Fever),
    (0.7, Symptom::Tiredness),
    (0.6, Symptom::Cough),
    (0.3, Symptom::Dyspnea),
];

/// Parameters of the exposure-probability signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureParameters {
    /// γ ≥ 0: how strongly a heavier edge carries a neighbour's exposure.
    pub gamma: f64,
    /// α in [0, 1.557): higher values mean slower decay of an agent's own signal.
    pub alpha: f64,
    /// λ in [0, 1]: how strongly contact tracing reinforces the signal of traced contacts.
    pub lambda: f64,
}

impl ExposureParameters {
    /// The degenerate model without any diffusion, decay memory or tracing reinforcement.
    #[must_use]
    pub fn disabled() -> Self {
        ExposureParameters {
            gamma: 0.0,
            alpha: 0.0,
            lambda: 0.0,
        }
    }

    /// Probability that exposure travels along an edge of `weight`, given a fully exposed
    /// neighbour.
    #[must_use]
    pub fn edge_transfer(&self, weight: u32) -> f64 {
        1.0 - (-self.gamma * f64::from(weight)).exp()
    }

    /// The share of an agent's own previous signal retained for today, as a factor of the
    /// complement: `1 - p·atan(α·p)`.
    #[must_use]
    pub fn retained_complement(&self, previous: f64) -> f64 {
        1.0 - previous * (self.alpha * previous).atan()
    }
}

/// Counts of transitions that happened during one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpreadSummary {
    pub newly_exposed: usize,
    pub newly_infectious: usize,
    pub recovered: usize,
    pub deceased: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiseaseProgression {
    pub incubation_days: u32,
    pub infection_duration: u32,
    pub transmission_rate: f64,
    pub exposure: ExposureParameters,
}

impl DiseaseProgression {
    #[must_use]
    pub fn new(
        incubation_days: u32,
        infection_duration: u32,
        transmission_rate: f64,
        exposure: ExposureParameters,
    ) -> Self {
        debug_assert!(incubation_days < infection_duration);
        debug_assert!(transmission_rate >= 0.0);
        debug_assert!(exposure.gamma >= 0.0);
        debug_assert!((0.0..MAX_DECAY_STRENGTH).contains(&exposure.alpha));
        DiseaseProgression {
            incubation_days,
            infection_duration,
            transmission_rate,
            exposure,
        }
    }

    /// Advances every agent by one day over the graph's current contacts, then refreshes every
    /// agent's exposure probability from yesterday's values.
    pub fn advance<R: Rng + ?Sized>(&self, graph: &mut ContactGraph, rng: &mut R) -> SpreadSummary {
        let previous_exposure: Vec<f64> = graph
            .agents
            .iter()
            .map(|agent| agent.exposure_probability)
            .collect();
        let mut summary = SpreadSummary::default();
        let mut newly_exposed: Vec<AgentId> = Vec::new();

        for index in 0..graph.agents.len() {
            let id = AgentId(index);
            if !graph.agents[index].is_infected {
                continue;
            }

            self.progress_infection(graph, id, &mut summary, rng);

            if graph.agents[index].status == AgentStatus::Infectious {
                self.transmit(graph, id, &mut newly_exposed, rng);
            }

            let agent = &graph.agents[index];
            if agent.status == AgentStatus::Exposed
                && agent.days_since_infection == self.incubation_days
            {
                self.become_infectious(graph, id, rng);
                summary.newly_infectious += 1;
            }
        }

        // Today's exposures start their clock tomorrow.
        for id in newly_exposed {
            let agent = graph.agent_mut(id);
            if agent.status == AgentStatus::Susceptible {
                agent.expose();
                summary.newly_exposed += 1;
            }
        }

        self.update_exposure_probabilities(graph, &previous_exposure);
        summary
    }

    fn progress_infection<R: Rng + ?Sized>(
        &self,
        graph: &mut ContactGraph,
        id: AgentId,
        summary: &mut SpreadSummary,
        rng: &mut R,
    ) {
        let agent = graph.agent_mut(id);
        agent.days_since_infection += 1;
        if agent.days_since_infection != self.infection_duration {
            return;
        }
        if rng.random_bool(agent.death_rate) {
            agent.resolve_infection(AgentStatus::Deceased);
            summary.deceased += 1;
        } else {
            agent.resolve_infection(AgentStatus::Recovered);
            summary.recovered += 1;
        }
    }

    fn transmit<R: Rng + ?Sized>(
        &self,
        graph: &ContactGraph,
        id: AgentId,
        newly_exposed: &mut Vec<AgentId>,
        rng: &mut R,
    ) {
        for neighbor in graph.contacts.neighbors(id) {
            if graph.agent(neighbor.agent).status != AgentStatus::Susceptible {
                continue;
            }
            let probability = (self.transmission_rate * f64::from(neighbor.weight)).min(1.0);
            if rng.random_bool(probability) {
                newly_exposed.push(neighbor.agent);
            }
        }
    }

    fn become_infectious<R: Rng + ?Sized>(&self, graph: &mut ContactGraph, id: AgentId, rng: &mut R) {
        let agent = graph.agent_mut(id);
        agent.status = AgentStatus::Infectious;
        agent.symptoms = draw_symptoms(rng.random());
        if rng.random::<f64>() < CRITICAL_CARE_PROBABILITY {
            agent.needs_critical_care = true;
        }
    }

    fn update_exposure_probabilities(&self, graph: &mut ContactGraph, previous: &[f64]) {
        let (agents, contacts) = (&mut graph.agents, &graph.contacts);
        for (index, agent) in agents.iter_mut().enumerate() {
            let neighbors_complement: f64 = contacts
                .neighbors(AgentId(index))
                .iter()
                .map(|neighbor| {
                    1.0 - previous[neighbor.agent.index()] * self.exposure.edge_transfer(neighbor.weight)
                })
                .product();
            let updated =
                1.0 - self.exposure.retained_complement(previous[index]) * neighbors_complement;
            debug_assert!((0.0..=1.0).contains(&updated), "exposure probability {updated}");
            agent.exposure_probability = updated;
        }
    }
}

/// Symptoms for a case draw uniform in [0, 1).
#[must_use]
pub fn draw_symptoms(case: f64) -> Vec<Symptom> {
    let table: &[(f64, Symptom)] = if case < SEVERE_CASE_THRESHOLD {
        &MILD_SYMPTOMS
    } else {
        &SEVERE_SYMPTOMS
    };
    table
        .iter()
        .filter(|(threshold, _)| case < *threshold)
        .map(|&(_, symptom)| symptom)
        .collect()
}
