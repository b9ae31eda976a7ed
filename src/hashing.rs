use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// A stable (process- and platform-independent) hash of a string, used to derive the seeds of
/// named random streams.
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    data.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_str_is_deterministic() {
        assert_eq!(hash_str("SimulationRng"), hash_str("SimulationRng"));
        assert_ne!(hash_str("SimulationRng"), hash_str("NetworkRng"));
    }
}
