//! Derives the per-contact transmission rate from a target basic reproduction number.

use crate::{graph::ContactGraph, resampler::EdgeResampler, warn};
use rand::Rng;

/// Unrestricted days sampled to estimate the mean contact strength.
pub const CALIBRATION_DAYS: usize = 5;

/// Mean summed edge weight per living agent, averaged over `days` freshly resampled, unrestricted
/// days. The graph itself is left untouched.
pub fn mean_contact_strength<R: Rng + ?Sized>(
    graph: &ContactGraph,
    days: usize,
    rng: &mut R,
) -> f64 {
    let mut scratch = graph.clone();
    let living = scratch.agents().iter().filter(|agent| agent.is_alive()).count();
    if living == 0 || days == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for _ in 0..days {
        EdgeResampler.resample(&mut scratch, 1.0, rng);
        let contacts = scratch.contacts();
        let strength: u64 = scratch
            .agent_ids()
            .filter(|&id| scratch.agent(id).is_alive())
            .map(|id| contacts.strength(id))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = strength as f64 / living as f64;
        total += mean;
    }
    #[allow(clippy::cast_precision_loss)]
    let average = total / days as f64;
    average
}

/// The daily per-unit-weight transmission probability that makes an average infectious agent
/// infect `r_0` others over its infectious period. Clamped to [0, 1].
pub fn calibrate_transmission_rate<R: Rng + ?Sized>(
    graph: &ContactGraph,
    r_0: f64,
    infection_duration: u32,
    incubation_days: u32,
    rng: &mut R,
) -> f64 {
    debug_assert!(incubation_days < infection_duration);
    let strength = mean_contact_strength(graph, CALIBRATION_DAYS, rng);
    let infectious_days = f64::from(infection_duration.saturating_sub(incubation_days));
    if strength <= 0.0 || infectious_days <= 0.0 {
        warn!("population has no contacts; transmission rate set to 0");
        return 0.0;
    }
    let rate = r_0 / (infectious_days * strength);
    if rate > 1.0 {
        warn!("calibrated transmission rate {rate:.3} exceeds 1 and was clamped");
    }
    rate.clamp(0.0, 1.0)
}
