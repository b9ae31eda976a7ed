/*!

Testing, quarantine and contact tracing.

Every day the engine

1. ages quarantines and test results, building a free high-priority pool (positives whose
   quarantine just ended) and a budgeted low-priority pool (everyone alive whose last result has
   expired, except known negatives who have recovered);
2. tests the high-priority pool, then `n_test` agents chosen from the low-priority pool by a
   `TestPolicy`;
3. walks the history of past contacts of the day's positives and quarantines their household
   contacts and a share of their other contacts.

*/

use crate::{
    agent::{AgentStatus, TestResult, QUARANTINE_DAYS},
    centrality::{rank_candidates, CentralityMeasure, WeightedBetweenness, WeightedDegree},
    debug,
    graph::{ContactGraph, EdgeCategory},
    history::ContactHistory,
    spread::ExposureParameters,
    AgentId,
};
use rand::{seq::index, Rng, RngCore};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Chooses which agents of the low-priority pool receive one of the day's tests.
pub trait TestPolicy {
    fn name(&self) -> &'static str;

    /// Returns at most `count` distinct members of `pool`, in testing order.
    fn select(
        &self,
        graph: &ContactGraph,
        pool: &[AgentId],
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<AgentId>;
}

/// Uniform sample without replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTesting;

impl TestPolicy for RandomTesting {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn select(
        &self,
        _graph: &ContactGraph,
        pool: &[AgentId],
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<AgentId> {
        let amount = count.min(pool.len());
        index::sample(rng, pool.len(), amount)
            .into_iter()
            .map(|position| pool[position])
            .collect()
    }
}

/// Tests the most central agents of today's contact graph first.
#[derive(Debug, Clone, Copy)]
pub struct CentralityTesting<M> {
    name: &'static str,
    measure: M,
}

impl CentralityTesting<WeightedDegree> {
    #[must_use]
    pub fn degree() -> Self {
        CentralityTesting {
            name: "Degree Centrality",
            measure: WeightedDegree,
        }
    }
}

impl CentralityTesting<WeightedBetweenness> {
    #[must_use]
    pub fn betweenness() -> Self {
        CentralityTesting {
            name: "Betweenness Centrality",
            measure: WeightedBetweenness,
        }
    }
}

impl<M: CentralityMeasure> TestPolicy for CentralityTesting<M> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn select(
        &self,
        graph: &ContactGraph,
        pool: &[AgentId],
        count: usize,
        _rng: &mut dyn RngCore,
    ) -> Vec<AgentId> {
        let mut ranked = rank_candidates(&self.measure, graph.contacts(), pool);
        ranked.truncate(count);
        ranked
    }
}

/// The testing strategies that can be configured by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestPolicyKind {
    #[default]
    #[serde(rename = "Random")]
    Random,
    #[serde(rename = "Degree Centrality")]
    DegreeCentrality,
    #[serde(rename = "Betweenness Centrality")]
    BetweennessCentrality,
}

impl TestPolicyKind {
    #[must_use]
    pub fn build(self) -> Box<dyn TestPolicy> {
        match self {
            TestPolicyKind::Random => Box::new(RandomTesting),
            TestPolicyKind::DegreeCentrality => Box::new(CentralityTesting::degree()),
            TestPolicyKind::BetweennessCentrality => Box::new(CentralityTesting::betweenness()),
        }
    }
}

/// Contacts found by scanning the history for the day's positives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceResult {
    /// Household contacts; always quarantined.
    pub to_quarantine: BTreeSet<AgentId>,
    /// Every other contact, minus household contacts; quarantined subject to tracing efficiency.
    pub possibly_quarantine: BTreeSet<AgentId>,
}

/// Scans every snapshot of `history`, most recent first, for edges touching `positives`.
#[must_use]
pub fn trace_contacts(history: &ContactHistory, positives: &FxHashSet<AgentId>) -> TraceResult {
    let mut result = TraceResult::default();
    for snapshot in history.most_recent_first() {
        for contact in snapshot.edges() {
            let source_positive = positives.contains(&contact.source);
            let target_positive = positives.contains(&contact.target);
            if !(source_positive || target_positive) {
                continue;
            }
            let bucket = if contact.category == EdgeCategory::Household {
                &mut result.to_quarantine
            } else {
                &mut result.possibly_quarantine
            };
            if source_positive {
                bucket.insert(contact.target);
            }
            if target_positive {
                bucket.insert(contact.source);
            }
        }
    }
    let household = &result.to_quarantine;
    result.possibly_quarantine.retain(|agent| !household.contains(agent));
    result
}

/// What happened during one day of testing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestingSummary {
    pub tests_performed: usize,
    pub found_positive: Vec<AgentId>,
    pub quarantined: Vec<AgentId>,
}

pub struct TestingEngine {
    pub tests_per_day: usize,
    pub incubation_days: u32,
    pub tracing_efficiency: f64,
    pub exposure: ExposureParameters,
    policy: Box<dyn TestPolicy>,
}

impl std::fmt::Debug for TestingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestingEngine")
            .field("tests_per_day", &self.tests_per_day)
            .field("incubation_days", &self.incubation_days)
            .field("tracing_efficiency", &self.tracing_efficiency)
            .field("exposure", &self.exposure)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl TestingEngine {
    #[must_use]
    pub fn new(
        tests_per_day: usize,
        incubation_days: u32,
        tracing_efficiency: f64,
        exposure: ExposureParameters,
        policy: Box<dyn TestPolicy>,
    ) -> Self {
        debug_assert!((0.0..=1.0).contains(&tracing_efficiency));
        debug_assert!((0.0..=1.0).contains(&exposure.lambda));
        TestingEngine {
            tests_per_day,
            incubation_days,
            tracing_efficiency,
            exposure,
            policy,
        }
    }

    /// Runs one day of testing and tracing. `history` holds the previous days' contacts; today's
    /// contacts are read from `graph`.
    pub fn run<R: Rng>(
        &self,
        graph: &mut ContactGraph,
        history: &ContactHistory,
        rng: &mut R,
    ) -> TestingSummary {
        let (high_priority, low_priority) = Self::age_counters(graph);

        let mut summary = TestingSummary::default();
        let mut found_positive: FxHashSet<AgentId> = FxHashSet::default();

        for &agent in &high_priority {
            self.test(graph, agent, &mut found_positive, &mut summary);
        }

        if self.tests_per_day > 0 {
            let selected = self
                .policy
                .select(graph, &low_priority, self.tests_per_day, rng);
            debug_assert!(selected.len() <= self.tests_per_day.min(low_priority.len()));
            for agent in selected {
                self.test(graph, agent, &mut found_positive, &mut summary);
            }
        }

        if !found_positive.is_empty() && !history.is_empty() {
            summary.quarantined = self.trace_and_quarantine(graph, history, &found_positive, rng);
        }

        debug!(
            "testing: {} tests, {} positive, {} contacts quarantined",
            summary.tests_performed,
            summary.found_positive.len(),
            summary.quarantined.len()
        );
        summary
    }

    /// Counts down quarantine and test validity, returning the high- and low-priority pools in
    /// agent order.
    fn age_counters(graph: &mut ContactGraph) -> (Vec<AgentId>, Vec<AgentId>) {
        let mut high_priority = Vec::new();
        let mut low_priority = Vec::new();
        for (index, agent) in graph.agents.iter_mut().enumerate() {
            let mut retest = false;
            if agent.quarantine_remaining > 0 {
                agent.quarantine_remaining -= 1;
                retest = agent.quarantine_remaining == 0 && agent.test_result == TestResult::Positive;
            }
            if agent.test_validity_remaining > 0 {
                agent.test_validity_remaining -= 1;
            }
            let known_recovered =
                agent.test_result == TestResult::Negative && agent.status == AgentStatus::Recovered;
            if retest {
                high_priority.push(AgentId(index));
            } else if agent.is_alive() && agent.test_validity_remaining == 0 && !known_recovered {
                low_priority.push(AgentId(index));
            }
        }
        (high_priority, low_priority)
    }

    fn test(
        &self,
        graph: &mut ContactGraph,
        id: AgentId,
        found_positive: &mut FxHashSet<AgentId>,
        summary: &mut TestingSummary,
    ) {
        let agent = graph.agent_mut(id);
        summary.tests_performed += 1;
        if agent.is_infected {
            agent.record_positive_test();
            if found_positive.insert(id) {
                summary.found_positive.push(id);
            }
        } else {
            agent.record_negative_test(self.incubation_days);
        }
    }

    fn trace_and_quarantine<R: Rng>(
        &self,
        graph: &mut ContactGraph,
        history: &ContactHistory,
        found_positive: &FxHashSet<AgentId>,
        rng: &mut R,
    ) -> Vec<AgentId> {
        let traced = trace_contacts(history, found_positive);
        let possible: Vec<AgentId> = traced.possibly_quarantine.into_iter().collect();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reached = ((possible.len() as f64 * self.tracing_efficiency) as usize).min(possible.len());

        let mut to_quarantine: Vec<AgentId> = traced.to_quarantine.into_iter().collect();
        to_quarantine.extend(
            index::sample(rng, possible.len(), reached)
                .into_iter()
                .map(|position| possible[position]),
        );

        if self.exposure.lambda > 0.0 {
            self.reinforce_exposure(graph, history, &to_quarantine);
        }
        for &agent in &to_quarantine {
            graph.agent_mut(agent).quarantine_remaining = QUARANTINE_DAYS;
        }
        to_quarantine
    }

    /// Raises the exposure signal of the quarantined contacts' neighbours: today's neighbours by
    /// `λ·e^(−1/w)`, and neighbours met `r` days back who are also being quarantined by
    /// `λ·e^(−r/w)`.
    fn reinforce_exposure(
        &self,
        graph: &mut ContactGraph,
        history: &ContactHistory,
        quarantined: &[AgentId],
    ) {
        let lambda = self.exposure.lambda;
        let members: FxHashSet<AgentId> = quarantined.iter().copied().collect();
        let (agents, contacts) = (&mut graph.agents, &graph.contacts);
        let mut raise = |agent: AgentId, recency: f64, weight: u32| {
            let probability = &mut agents[agent.index()].exposure_probability;
            *probability += lambda * (-recency / f64::from(weight)).exp() * (1.0 - *probability);
        };

        for &agent in quarantined {
            for neighbor in contacts.neighbors(agent) {
                raise(neighbor.agent, 1.0, neighbor.weight);
            }
            for (rank, snapshot) in history.most_recent_first().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let recency = (rank + 1) as f64;
                for neighbor in snapshot.neighbors(agent) {
                    if members.contains(&neighbor.agent) {
                        raise(neighbor.agent, recency, neighbor.weight);
                    }
                }
            }
        }
    }
}
