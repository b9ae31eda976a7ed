/*!

The daily simulation loop and its driver.

An `EpidemicModel` bundles the per-day components and runs them in a fixed order:

1. the `RestrictionScheduler` gives the day's strictness;
2. the `EdgeResampler` rebuilds the contact graph under that strictness;
3. `DiseaseProgression` advances infections over the new graph;
4. the `TestingEngine` tests, traces and quarantines;
5. the day's contacts are appended to the tracing history.

`ContextSimulationExt` stores a model, its graph and everything a run records in a `Context`,
the way the rest of the crate keeps state in data plugins. Each stage of a run draws from its own
named random stream, so changing, say, the number of tests does not perturb the generated
population.

*/

use crate::{
    calibration::calibrate_transmission_rate,
    context::{Context, DataPlugin},
    debug,
    define_rng,
    error::CtnsError,
    graph::ContactGraph,
    history::ContactHistory,
    info,
    network::{seed_infections, NetworkBuilder},
    parameters::{ContextParametersExt, DumpType, Parameters},
    random::ContextRandomExt,
    report::{ContactRecord, SimulationReport, StatusTally},
    resampler::{EdgeResampler, ResampleSummary},
    restriction::{restriction_factor, RestrictionScheduler},
    spread::{DiseaseProgression, SpreadSummary},
    testing::{TestingEngine, TestingSummary},
    trace,
};
use rand::Rng;

define_rng!(pub NetworkRng);
define_rng!(pub CalibrationRng);
define_rng!(pub SeedingRng);
define_rng!(pub DailyRng);

/// What happened on one simulated day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayOutcome {
    pub day: u32,
    pub strictness: u32,
    pub contacts: ResampleSummary,
    pub spread: SpreadSummary,
    pub testing: TestingSummary,
}

#[derive(Debug)]
pub struct EpidemicModel {
    pub scheduler: RestrictionScheduler,
    pub resampler: EdgeResampler,
    pub progression: DiseaseProgression,
    pub testing: TestingEngine,
}

impl EpidemicModel {
    #[must_use]
    pub fn new(
        scheduler: RestrictionScheduler,
        progression: DiseaseProgression,
        testing: TestingEngine,
    ) -> Self {
        EpidemicModel {
            scheduler,
            resampler: EdgeResampler,
            progression,
            testing,
        }
    }

    /// The model described by validated `parameters`, with an already calibrated rate.
    #[must_use]
    pub fn from_parameters(parameters: &Parameters, transmission_rate: f64) -> Self {
        let exposure = parameters.exposure();
        EpidemicModel::new(
            parameters.restriction_scheduler(),
            DiseaseProgression::new(
                parameters.incubation_days,
                parameters.infection_duration,
                transmission_rate,
                exposure,
            ),
            TestingEngine::new(
                parameters.n_test,
                parameters.incubation_days,
                parameters.contact_tracking_efficiency,
                exposure,
                parameters.policy_test.build(),
            ),
        )
    }

    /// Simulates `day` on `graph`, then records the day's contacts in `history`.
    pub fn step<R: Rng>(
        &self,
        day: u32,
        graph: &mut ContactGraph,
        history: &mut ContactHistory,
        rng: &mut R,
    ) -> DayOutcome {
        let strictness = self.scheduler.strictness_on(day);
        trace!("day {day}: strictness {strictness}");

        let contacts = self
            .resampler
            .resample(graph, restriction_factor(strictness), rng);
        let spread = self.progression.advance(graph, rng);
        let testing = self.testing.run(graph, history, rng);
        history.push(graph.contacts().clone());

        debug!(
            "day {day}: {} contacts, {} newly exposed, {} newly infectious, {} recovered, {} deceased",
            contacts.total(),
            spread.newly_exposed,
            spread.newly_infectious,
            spread.recovered,
            spread.deceased
        );
        DayOutcome {
            day,
            strictness,
            contacts,
            spread,
            testing,
        }
    }
}

/// Everything a run owns while it is in progress.
#[derive(Default)]
struct SimulationState {
    model: Option<EpidemicModel>,
    graph: ContactGraph,
    history: ContactHistory,
    day: u32,
    transmission_rate: f64,
    dump_type: DumpType,
    tallies: Vec<StatusTally>,
    contacts: Vec<ContactRecord>,
}

impl DataPlugin for SimulationState {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &SimulationState::default;
}

pub trait ContextSimulationExt {
    /// Validates `parameters`, seeds the random streams, generates the population, calibrates
    /// the transmission rate and seeds the initial infections.
    fn init_simulation(&mut self, parameters: Parameters) -> Result<(), CtnsError>;

    /// Installs a ready-made model and population. The dump type is read from the context's
    /// parameters.
    fn install_simulation(&mut self, model: EpidemicModel, graph: ContactGraph);

    /// Simulates the next day and returns its tally.
    fn execute_day(&mut self) -> Result<StatusTally, CtnsError>;

    /// Runs until the configured horizon, or until no agent is Exposed or Infectious, and
    /// returns the report.
    fn execute(&mut self) -> Result<SimulationReport, CtnsError>;

    fn simulation_report(&self) -> Result<SimulationReport, CtnsError>;

    fn simulation_graph(&self) -> Option<&ContactGraph>;

    fn simulation_model(&self) -> Option<&EpidemicModel>;

    /// The next day to be simulated.
    fn current_day(&self) -> u32;
}

impl ContextSimulationExt for Context {
    fn init_simulation(&mut self, parameters: Parameters) -> Result<(), CtnsError> {
        self.set_parameters(parameters)?;
        let parameters = self.parameters();

        let seed = parameters.seed.unwrap_or_else(rand::random);
        info!("initializing simulation with base seed {seed}");
        self.init_random(seed);

        let mut graph =
            self.sample::<NetworkRng, _>(|rng| NetworkBuilder::new(parameters.n_of_families).build(rng));
        let transmission_rate = self.sample::<CalibrationRng, _>(|rng| {
            calibrate_transmission_rate(
                &graph,
                parameters.r_0,
                parameters.infection_duration,
                parameters.incubation_days,
                rng,
            )
        });
        info!(
            "{} agents, transmission rate {transmission_rate:.5}",
            graph.population()
        );
        let seeded = self.sample::<SeedingRng, _>(|rng| {
            seed_infections(&mut graph, parameters.n_initial_infected_nodes, rng)
        });
        debug!("seeded {} initial infections", seeded.len());

        let model = EpidemicModel::from_parameters(&parameters, transmission_rate);
        self.install_simulation(model, graph);
        Ok(())
    }

    fn install_simulation(&mut self, model: EpidemicModel, graph: ContactGraph) {
        let transmission_rate = model.progression.transmission_rate;
        let dump_type = self.parameters().dump_type;
        self.set_data_container(SimulationState {
            model: Some(model),
            graph,
            transmission_rate,
            dump_type,
            ..SimulationState::default()
        });
    }

    fn execute_day(&mut self) -> Result<StatusTally, CtnsError> {
        self.with_data_container::<SimulationState, _>(|state, context| {
            let SimulationState {
                model,
                graph,
                history,
                day,
                dump_type,
                tallies,
                contacts,
                ..
            } = state;
            let model = model.as_ref().ok_or(CtnsError::Uninitialized)?;

            context.sample::<DailyRng, _>(|rng| model.step(*day, graph, history, rng));

            let tally = StatusTally::from_graph(*day, graph);
            tallies.push(tally);
            if *dump_type == DumpType::Full {
                contacts.extend(ContactRecord::from_graph(*day, graph));
            }
            *day += 1;
            Ok(tally)
        })
    }

    fn execute(&mut self) -> Result<SimulationReport, CtnsError> {
        let parameters = self.parameters();
        info!(
            "running {}",
            if parameters.use_steps {
                format!("for up to {} days", parameters.number_of_steps)
            } else {
                "until the infection dies out".to_string()
            }
        );

        loop {
            if parameters.use_steps && self.current_day() >= parameters.number_of_steps {
                break;
            }
            let active = self
                .simulation_graph()
                .ok_or(CtnsError::Uninitialized)?
                .active_infections();
            if active == 0 {
                info!("no active infections left on day {}", self.current_day());
                break;
            }
            self.execute_day()?;
        }

        info!("simulation ended after {} days", self.current_day());
        self.simulation_report()
    }

    fn simulation_report(&self) -> Result<SimulationReport, CtnsError> {
        let state = self
            .get_data_container::<SimulationState>()
            .filter(|state| state.model.is_some())
            .ok_or(CtnsError::Uninitialized)?;
        Ok(SimulationReport {
            parameters: self.parameters(),
            base_seed: self.base_seed(),
            transmission_rate: state.transmission_rate,
            tallies: state.tallies.clone(),
            contacts: state.contacts.clone(),
        })
    }

    fn simulation_graph(&self) -> Option<&ContactGraph> {
        self.get_data_container::<SimulationState>()
            .filter(|state| state.model.is_some())
            .map(|state| &state.graph)
    }

    fn simulation_model(&self) -> Option<&EpidemicModel> {
        self.get_data_container::<SimulationState>()
            .and_then(|state| state.model.as_ref())
    }

    fn current_day(&self) -> u32 {
        self.get_data_container::<SimulationState>()
            .map_or(0, |state| state.day)
    }
}
