/*!

`ctns` simulates the spread of a contagious disease over a synthetic population whose contacts
change every day.

A run is driven through a [`Context`], which holds every piece of run state as a typed data
plugin: the [`Parameters`], the named random streams of [`random`], and the simulation itself
([`ContextSimulationExt`]). One simulated day redraws the contact graph from each agent's fixed
candidate pools under the day's social-distancing strictness, advances every infection over the
new graph, and finally tests agents, traces the contacts of the positives through the last two
weeks of graphs and quarantines them.

```no_run
use ctns::{Context, ContextSimulationExt, Parameters};

let mut context = Context::new();
context.init_simulation(Parameters { seed: Some(42), ..Parameters::default() })?;
let report = context.execute()?;
ctns::report::write_report("run", &report)?;
# Ok::<(), ctns::CtnsError>(())
```

*/

pub mod agent;
pub mod calibration;
pub mod centrality;
pub mod context;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod history;
pub mod log;
pub mod network;
pub mod parameters;
pub mod random;
pub mod report;
pub mod resampler;
pub mod restriction;
pub mod simulation;
pub mod spread;
pub mod testing;

// Re-exported so that `define_rng!` works in downstream crates without a direct `rand` dependency.
pub use rand;

pub use ::log::{debug, error, info, trace, warn};

pub use agent::{Agent, AgentStatus, Sociability, Symptom, TestResult};
pub use context::{Context, DataPlugin};
pub use error::CtnsError;
pub use graph::{ContactGraph, EdgeCategory};
pub use parameters::{ContextParametersExt, DumpType, Parameters};
pub use random::{ContextRandomExt, RngId};
pub use simulation::{ContextSimulationExt, EpidemicModel};
pub use testing::{TestPolicy, TestPolicyKind};

// All modules import `crate::TypeId` in case we want to change the underlying type of `TypeId`.
pub(crate) use std::any::TypeId;

#[inline(always)]
pub fn type_of<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}

/// Index of an agent in its population. Agents are never removed, so ids stay valid for the whole
/// run.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    #[must_use]
    pub fn new(index: usize) -> Self {
        AgentId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
