/*!

Per-agent epidemiological, testing and quarantine state.

Agents are created once by the population generator and mutated every simulated day; they are
never removed, so an `AgentId` is a plain index into the population.

*/

use crate::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days of isolation ordered by a positive test or by contact tracing.
pub const QUARANTINE_DAYS: u32 = 14;

/// Days a positive test result stays valid.
pub const POSITIVE_TEST_VALIDITY_DAYS: u32 = 14;

#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum AgentStatus {
    #[serde(rename = "S")]
    Susceptible,
    #[serde(rename = "E")]
    Exposed,
    #[serde(rename = "I")]
    Infectious,
    #[serde(rename = "R")]
    Recovered,
    #[serde(rename = "D")]
    Deceased,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 5] = [
        AgentStatus::Susceptible,
        AgentStatus::Exposed,
        AgentStatus::Infectious,
        AgentStatus::Recovered,
        AgentStatus::Deceased,
    ];

    #[must_use]
    pub fn is_active_infection(self) -> bool {
        matches!(self, AgentStatus::Exposed | AgentStatus::Infectious)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            AgentStatus::Susceptible => "S",
            AgentStatus::Exposed => "E",
            AgentStatus::Infectious => "I",
            AgentStatus::Recovered => "R",
            AgentStatus::Deceased => "D",
        };
        f.write_str(code)
    }
}

/// How many of its optional (frequent and occasional) contacts an agent meets on a given day.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sociability {
    Low,
    Medium,
    High,
}

#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum Symptom {
    LossOfTasteOrSmell,
    Fever,
    Cough,
    Tiredness,
    Dyspnea,
}

/// Outcome of the most recent test.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum TestResult {
    #[default]
    Untested,
    Negative,
    Positive,
}


/// The fixed lists of potential contacts assigned at generation. Each entry is the other
/// endpoint of a potential edge whose first endpoint is the owning agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePools {
    pub household: Vec<AgentId>,
    pub frequent: Vec<AgentId>,
    pub occasional: Vec<AgentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub status: AgentStatus,
    pub is_infected: bool,
    pub days_since_infection: u32,
    pub death_rate: f64,
    pub symptoms: Vec<Symptom>,
    pub needs_critical_care: bool,
    pub quarantine_remaining: u32,
    pub test_result: TestResult,
    pub test_validity_remaining: u32,
    pub exposure_probability: f64,
    pub sociability: Sociability,
    pub pools: CandidatePools,
}

impl Agent {
    /// A susceptible, untested agent with no contacts assigned yet.
    #[must_use]
    pub fn new(sociability: Sociability, death_rate: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&death_rate));
        Agent {
            status: AgentStatus::Susceptible,
            is_infected: false,
            days_since_infection: 0,
            death_rate,
            symptoms: Vec::new(),
            needs_critical_care: false,
            quarantine_remaining: 0,
            test_result: TestResult::Untested,
            test_validity_remaining: 0,
            exposure_probability: 0.0,
            sociability,
            pools: CandidatePools::default(),
        }
    }

    #[must_use]
    pub fn with_pools(mut self, pools: CandidatePools) -> Self {
        self.pools = pools;
        self
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != AgentStatus::Deceased
    }

    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        self.quarantine_remaining > 0
    }

    /// Whether the agent may take part in any contact today.
    #[must_use]
    pub fn can_meet(&self) -> bool {
        self.is_alive() && !self.is_quarantined()
    }

    /// Starts a new infection: the agent is exposed with its clock at day 1.
    pub fn expose(&mut self) {
        self.status = AgentStatus::Exposed;
        self.is_infected = true;
        self.days_since_infection = 1;
    }

    /// Ends the current infection with `outcome` (recovery or death).
    pub(crate) fn resolve_infection(&mut self, outcome: AgentStatus) {
        debug_assert!(matches!(outcome, AgentStatus::Recovered | AgentStatus::Deceased));
        self.status = outcome;
        self.is_infected = false;
        self.symptoms.clear();
        self.needs_critical_care = false;
        self.days_since_infection = 0;
        if outcome == AgentStatus::Deceased {
            self.quarantine_remaining = 0;
            self.test_result = TestResult::Untested;
        }
    }

    pub(crate) fn record_positive_test(&mut self) {
        self.test_result = TestResult::Positive;
        self.quarantine_remaining = QUARANTINE_DAYS;
        self.test_validity_remaining = POSITIVE_TEST_VALIDITY_DAYS;
        self.exposure_probability = 1.0;
    }

    pub(crate) fn record_negative_test(&mut self, validity_days: u32) {
        self.test_result = TestResult::Negative;
        self.exposure_probability = 0.0;
        self.test_validity_remaining = validity_days;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expose_starts_the_clock() {
        let mut agent = Agent::new(Sociability::Medium, 0.01);
        agent.expose();
        assert_eq!(agent.status, AgentStatus::Exposed);
        assert!(agent.is_infected);
        assert_eq!(agent.days_since_infection, 1);
    }

    #[test]
    fn death_clears_quarantine_and_test() {
        let mut agent = Agent::new(Sociability::Low, 1.0);
        agent.expose();
        agent.symptoms.push(Symptom::Fever);
        agent.needs_critical_care = true;
        agent.record_positive_test();

        agent.resolve_infection(AgentStatus::Deceased);

        assert!(!agent.is_alive());
        assert!(!agent.is_infected);
        assert!(agent.symptoms.is_empty());
        assert!(!agent.needs_critical_care);
        assert_eq!(agent.days_since_infection, 0);
        assert_eq!(agent.quarantine_remaining, 0);
        assert_eq!(agent.test_result, TestResult::Untested);
    }

    #[test]
    fn recovery_keeps_quarantine() {
        let mut agent = Agent::new(Sociability::High, 0.0);
        agent.expose();
        agent.record_positive_test();
        agent.resolve_infection(AgentStatus::Recovered);
        assert_eq!(agent.quarantine_remaining, QUARANTINE_DAYS);
        assert_eq!(agent.test_result, TestResult::Positive);
    }

    #[test]
    fn status_codes() {
        assert_eq!(AgentStatus::Infectious.to_string(), "I");
    }
}
