/*!

Run output.

Every simulated day produces one `StatusTally`. A `full` dump additionally records every edge of
every day as a `ContactRecord`. `write_report` stores a run under a path prefix:

- `<prefix>_report.csv`: one tally row per day;
- `<prefix>_parameters.json`: the parameters, the base seed and the calibrated transmission rate;
- `<prefix>_contacts.csv`: the edge lists, for `full` dumps only.

*/

use crate::{
    agent::{AgentStatus, TestResult},
    error::CtnsError,
    graph::{ContactGraph, EdgeCategory},
    info,
    parameters::{DumpType, Parameters},
};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Population counts at the end of one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTally {
    pub day: u32,
    #[serde(rename = "S")]
    pub susceptible: usize,
    #[serde(rename = "E")]
    pub exposed: usize,
    #[serde(rename = "I")]
    pub infectious: usize,
    #[serde(rename = "R")]
    pub recovered: usize,
    #[serde(rename = "D")]
    pub deceased: usize,
    pub quarantined: usize,
    pub positive: usize,
    /// Agents holding any test result.
    pub tested: usize,
    pub total: usize,
}

impl StatusTally {
    #[must_use]
    pub fn from_graph(day: u32, graph: &ContactGraph) -> Self {
        let mut tally = StatusTally {
            day,
            total: graph.population(),
            ..StatusTally::default()
        };
        for agent in graph.agents() {
            match agent.status {
                AgentStatus::Susceptible => tally.susceptible += 1,
                AgentStatus::Exposed => tally.exposed += 1,
                AgentStatus::Infectious => tally.infectious += 1,
                AgentStatus::Recovered => tally.recovered += 1,
                AgentStatus::Deceased => tally.deceased += 1,
            }
            tally.quarantined += usize::from(agent.is_quarantined());
            tally.positive += usize::from(agent.test_result == TestResult::Positive);
            tally.tested += usize::from(agent.test_result != TestResult::Untested);
        }
        tally
    }

    #[must_use]
    pub fn count(&self, status: AgentStatus) -> usize {
        match status {
            AgentStatus::Susceptible => self.susceptible,
            AgentStatus::Exposed => self.exposed,
            AgentStatus::Infectious => self.infectious,
            AgentStatus::Recovered => self.recovered,
            AgentStatus::Deceased => self.deceased,
        }
    }

    #[must_use]
    pub fn active_infections(&self) -> usize {
        self.exposed + self.infectious
    }
}

/// One edge of one day's contact graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub day: u32,
    pub source: usize,
    pub target: usize,
    pub category: EdgeCategory,
    pub weight: u32,
}

impl ContactRecord {
    /// Records every edge of the graph's current day.
    pub fn from_graph(day: u32, graph: &ContactGraph) -> impl Iterator<Item = ContactRecord> + '_ {
        graph.contacts().edges().iter().map(move |contact| ContactRecord {
            day,
            source: contact.source.index(),
            target: contact.target.index(),
            category: contact.category,
            weight: contact.weight,
        })
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub parameters: Parameters,
    pub base_seed: u64,
    pub transmission_rate: f64,
    pub tallies: Vec<StatusTally>,
    /// Empty unless the dump type is `full`.
    pub contacts: Vec<ContactRecord>,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    #[serde(flatten)]
    parameters: &'a Parameters,
    base_seed: u64,
    transmission_rate: f64,
    days_simulated: usize,
}

/// The files written by `write_report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub report: PathBuf,
    pub parameters: PathBuf,
    pub contacts: Option<PathBuf>,
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn write_report(prefix: impl AsRef<Path>, report: &SimulationReport) -> Result<ReportFiles, CtnsError> {
    let prefix = prefix.as_ref();
    let files = ReportFiles {
        report: with_suffix(prefix, "_report.csv"),
        parameters: with_suffix(prefix, "_parameters.json"),
        contacts: (report.parameters.dump_type == DumpType::Full)
            .then(|| with_suffix(prefix, "_contacts.csv")),
    };

    let mut writer = csv::Writer::from_path(&files.report)?;
    for tally in &report.tallies {
        writer.serialize(tally)?;
    }
    writer.flush()?;

    let metadata = RunMetadata {
        parameters: &report.parameters,
        base_seed: report.base_seed,
        transmission_rate: report.transmission_rate,
        days_simulated: report.tallies.len(),
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(&files.parameters)?), &metadata)?;

    if let Some(path) = &files.contacts {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &report.contacts {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }

    info!("report written to {}", files.report.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{Agent, Sociability},
        AgentId,
    };
    use std::fs;

    fn sample_graph() -> ContactGraph {
        let mut graph = ContactGraph::from_agents(
            (0..5)
                .map(|_| Agent::new(Sociability::Medium, 0.0))
                .collect(),
        );
        graph.agent_mut(AgentId::new(0)).expose();
        graph.agent_mut(AgentId::new(0)).record_positive_test();
        graph.agent_mut(AgentId::new(1)).status = AgentStatus::Recovered;
        graph.agent_mut(AgentId::new(1)).record_negative_test(5);
        graph.agent_mut(AgentId::new(2)).status = AgentStatus::Deceased;
        graph.add_contact(AgentId::new(3), AgentId::new(4), EdgeCategory::Frequent, 2);
        graph
    }

    #[test]
    fn tally_counts_every_agent_once() {
        let tally = StatusTally::from_graph(3, &sample_graph());
        assert_eq!(tally.day, 3);
        assert_eq!(
            (tally.susceptible, tally.exposed, tally.infectious, tally.recovered, tally.deceased),
            (2, 1, 0, 1, 1)
        );
        let by_status: usize = AgentStatus::ALL.iter().map(|&status| tally.count(status)).sum();
        assert_eq!(by_status, tally.total);
        assert_eq!(tally.quarantined, 1);
        assert_eq!(tally.positive, 1);
        assert_eq!(tally.tested, 2);
        assert_eq!(tally.active_infections(), 1);
    }

    #[test]
    fn light_report_skips_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("run");
        let graph = sample_graph();
        let report = SimulationReport {
            parameters: Parameters::default(),
            base_seed: 42,
            transmission_rate: 0.1,
            tallies: vec![StatusTally::from_graph(0, &graph), StatusTally::from_graph(1, &graph)],
            contacts: Vec::new(),
        };

        let files = write_report(&prefix, &report).unwrap();

        assert_eq!(files.report, dir.path().join("run_report.csv"));
        assert!(files.contacts.is_none());
        let csv_text = fs::read_to_string(&files.report).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(
            lines.next(),
            Some("day,S,E,I,R,D,quarantined,positive,tested,total")
        );
        assert_eq!(lines.next(), Some("0,2,1,0,1,1,1,1,2,5"));
        assert_eq!(lines.count(), 1);

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&files.parameters).unwrap()).unwrap();
        assert_eq!(metadata["base_seed"], 42);
        assert_eq!(metadata["days_simulated"], 2);
        assert_eq!(metadata["policy_test"], "Random");
        assert_eq!(metadata["dump_type"], "light");
    }

    #[test]
    fn full_report_lists_edges() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("full");
        let graph = sample_graph();
        let report = SimulationReport {
            parameters: Parameters {
                dump_type: DumpType::Full,
                ..Parameters::default()
            },
            tallies: vec![StatusTally::from_graph(0, &graph)],
            contacts: ContactRecord::from_graph(0, &graph).collect(),
            ..SimulationReport::default()
        };

        let files = write_report(&prefix, &report).unwrap();

        let contacts = fs::read_to_string(files.contacts.unwrap()).unwrap();
        assert_eq!(
            contacts.lines().collect::<Vec<_>>(),
            vec!["day,source,target,category,weight", "0,3,4,frequent,2"]
        );
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("missing").join("run");
        let result = write_report(&prefix, &SimulationReport::default());
        assert!(matches!(result, Err(CtnsError::Csv(_) | CtnsError::Io(_))));
    }
}
