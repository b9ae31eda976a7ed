/*!

Run configuration.

`Parameters` is deserialized from JSON; every field falls back to its default when absent. A
configuration must pass `Parameters::validate` before it is used, and is then normalized so that
a restriction with no duration or no strictness is switched off entirely.

*/

use crate::{
    context::{Context, DataPlugin},
    error::CtnsError,
    restriction::{RestrictionPolicy, RestrictionScheduler, MAX_STRICTNESS},
    spread::{ExposureParameters, MAX_DECAY_STRENGTH},
    testing::TestPolicyKind,
};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

pub const MIN_FAMILIES: usize = 10;

/// What a run records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpType {
    /// Every day's status counts and its complete edge list.
    Full,
    /// Every day's status counts only.
    #[default]
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub n_of_families: usize,
    /// Run for `number_of_steps` days rather than until the infection dies out.
    pub use_steps: bool,
    pub number_of_steps: u32,
    pub incubation_days: u32,
    pub infection_duration: u32,
    pub initial_day_restriction: u32,
    pub restriction_duration: u32,
    pub social_distance_strictness: u32,
    pub restriction_decreasing: bool,
    pub n_initial_infected_nodes: usize,
    #[serde(alias = "R_0")]
    pub r_0: f64,
    pub n_test: usize,
    pub policy_test: TestPolicyKind,
    pub contact_tracking_efficiency: f64,
    /// Base seed; a fresh one is drawn when absent.
    pub seed: Option<u64>,
    pub dump_type: DumpType,
    pub gamma: f64,
    pub alpha: f64,
    pub lambda: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            n_of_families: 500,
            use_steps: true,
            number_of_steps: 150,
            incubation_days: 5,
            infection_duration: 21,
            initial_day_restriction: 50,
            restriction_duration: 21,
            social_distance_strictness: 2,
            restriction_decreasing: true,
            n_initial_infected_nodes: 10,
            r_0: 2.9,
            n_test: 5,
            policy_test: TestPolicyKind::Random,
            contact_tracking_efficiency: 0.8,
            seed: None,
            dump_type: DumpType::Light,
            gamma: 1.0,
            alpha: 1.0,
            lambda: 0.5,
        }
    }
}

impl DataPlugin for Parameters {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &Parameters::default;
}

impl Parameters {
    /// Reads parameters from a JSON file, then validates and normalizes them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CtnsError> {
        let reader = BufReader::new(File::open(path)?);
        let parameters: Parameters = serde_json::from_reader(reader)?;
        parameters.validate()?;
        Ok(parameters.normalized())
    }

    pub fn validate(&self) -> Result<(), CtnsError> {
        if self.n_of_families < MIN_FAMILIES {
            return Err(CtnsError::invalid(
                "n_of_families",
                format!("at least {MIN_FAMILIES} families are required, got {}", self.n_of_families),
            ));
        }
        if self.incubation_days >= self.infection_duration {
            return Err(CtnsError::invalid(
                "incubation_days",
                format!(
                    "{} must be shorter than the infection duration of {}",
                    self.incubation_days, self.infection_duration
                ),
            ));
        }
        if self.social_distance_strictness > MAX_STRICTNESS {
            return Err(CtnsError::invalid(
                "social_distance_strictness",
                format!("must lie in 0..={MAX_STRICTNESS}, got {}", self.social_distance_strictness),
            ));
        }
        if self.n_initial_infected_nodes > self.n_of_families {
            return Err(CtnsError::invalid(
                "n_initial_infected_nodes",
                format!(
                    "{} exceeds the number of families ({})",
                    self.n_initial_infected_nodes, self.n_of_families
                ),
            ));
        }
        if !(self.r_0.is_finite() && self.r_0 >= 0.0) {
            return Err(CtnsError::invalid("r_0", format!("must be non-negative, got {}", self.r_0)));
        }
        check_unit_interval("contact_tracking_efficiency", self.contact_tracking_efficiency)?;
        if !(0.0..MAX_DECAY_STRENGTH).contains(&self.alpha) {
            return Err(CtnsError::invalid(
                "alpha",
                format!("must lie in [0, {MAX_DECAY_STRENGTH}), got {}", self.alpha),
            ));
        }
        if !(self.gamma.is_finite() && self.gamma >= 0.0) {
            return Err(CtnsError::invalid("gamma", format!("must be non-negative, got {}", self.gamma)));
        }
        check_unit_interval("lambda", self.lambda)
    }

    /// Switches the restriction off when either its duration or its strictness is zero.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.restriction_duration == 0 || self.social_distance_strictness == 0 {
            self.restriction_duration = 0;
            self.social_distance_strictness = 0;
            self.restriction_decreasing = false;
        }
        self
    }

    #[must_use]
    pub fn restriction_scheduler(&self) -> RestrictionScheduler {
        let policy = if self.restriction_decreasing {
            RestrictionPolicy::Decreasing
        } else {
            RestrictionPolicy::Constant
        };
        RestrictionScheduler::new(
            self.initial_day_restriction,
            self.restriction_duration,
            self.social_distance_strictness,
            policy,
        )
    }

    #[must_use]
    pub fn exposure(&self) -> ExposureParameters {
        ExposureParameters {
            gamma: self.gamma,
            alpha: self.alpha,
            lambda: self.lambda,
        }
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> Result<(), CtnsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CtnsError::invalid(name, format!("must lie in [0, 1], got {value}")))
    }
}

pub trait ContextParametersExt {
    /// Validates, normalizes and stores `parameters` in the context.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), CtnsError>;

    /// The stored parameters, or the defaults when none were set.
    fn parameters(&self) -> Parameters;
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), CtnsError> {
        parameters.validate()?;
        self.set_data_container(parameters.normalized());
        Ok(())
    }

    fn parameters(&self) -> Parameters {
        self.get_data_container::<Parameters>()
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn invalid_field(parameters: &Parameters) -> &'static str {
        match parameters.validate() {
            Err(CtnsError::InvalidParameter { name, .. }) => name,
            other => panic!("expected an invalid parameter, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let parameters = Parameters::default();
        assert!(parameters.validate().is_ok());
        assert_eq!(parameters.dump_type, DumpType::Light);
        assert_eq!(parameters.policy_test, TestPolicyKind::Random);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parameters: Parameters = serde_json::from_str(
            r#"{"n_of_families": 20, "R_0": 1.5, "policy_test": "Degree Centrality", "dump_type": "full"}"#,
        )
        .unwrap();
        assert_eq!(parameters.n_of_families, 20);
        assert_eq!(parameters.r_0, 1.5);
        assert_eq!(parameters.policy_test, TestPolicyKind::DegreeCentrality);
        assert_eq!(parameters.dump_type, DumpType::Full);
        assert_eq!(parameters.infection_duration, 21);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = serde_json::from_str::<Parameters>(r#"{"policy_test": "Closeness"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validation_names_the_offending_field() {
        let cases: Vec<(Parameters, &str)> = vec![
            (Parameters { n_of_families: 9, ..Parameters::default() }, "n_of_families"),
            (Parameters { incubation_days: 21, ..Parameters::default() }, "incubation_days"),
            (Parameters { social_distance_strictness: 5, ..Parameters::default() }, "social_distance_strictness"),
            (Parameters { n_initial_infected_nodes: 501, ..Parameters::default() }, "n_initial_infected_nodes"),
            (Parameters { r_0: -1.0, ..Parameters::default() }, "r_0"),
            (Parameters { contact_tracking_efficiency: 1.2, ..Parameters::default() }, "contact_tracking_efficiency"),
            (Parameters { alpha: MAX_DECAY_STRENGTH, ..Parameters::default() }, "alpha"),
            (Parameters { gamma: -0.1, ..Parameters::default() }, "gamma"),
            (Parameters { lambda: 1.5, ..Parameters::default() }, "lambda"),
        ];
        for (parameters, field) in cases {
            assert_eq!(invalid_field(&parameters), field);
        }
    }

    #[test]
    fn zero_duration_disables_restriction() {
        let parameters = Parameters {
            restriction_duration: 0,
            ..Parameters::default()
        }
        .normalized();
        assert_eq!(parameters.social_distance_strictness, 0);
        assert!(!parameters.restriction_decreasing);
        let schedule = parameters.restriction_scheduler();
        assert!((0..200).all(|day| schedule.strictness_on(day) == 0));
    }

    #[test]
    fn zero_strictness_clears_duration() {
        let parameters = Parameters {
            social_distance_strictness: 0,
            ..Parameters::default()
        }
        .normalized();
        assert_eq!(parameters.restriction_duration, 0);
        assert_eq!(parameters.restriction_scheduler().policy, RestrictionPolicy::Constant);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_of_families": 12, "restriction_duration": 0, "seed": 3}}"#).unwrap();

        let parameters = Parameters::load(file.path()).unwrap();

        assert_eq!(parameters.n_of_families, 12);
        assert_eq!(parameters.seed, Some(3));
        assert_eq!(parameters.social_distance_strictness, 0);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_of_families": 3}}"#).unwrap();
        assert!(matches!(
            Parameters::load(file.path()),
            Err(CtnsError::InvalidParameter { name: "n_of_families", .. })
        ));
        assert!(matches!(
            Parameters::load("/nonexistent/ctns/parameters.json"),
            Err(CtnsError::Io(_))
        ));
    }

    #[test]
    fn context_stores_normalized_parameters() {
        let mut context = Context::new();
        assert_eq!(context.parameters(), Parameters::default());

        context
            .set_parameters(Parameters {
                social_distance_strictness: 0,
                ..Parameters::default()
            })
            .unwrap();
        assert_eq!(context.parameters().restriction_duration, 0);

        let rejected = context.set_parameters(Parameters {
            lambda: 2.0,
            ..Parameters::default()
        });
        assert!(rejected.is_err());
        assert_eq!(context.parameters().restriction_duration, 0);
    }
}
