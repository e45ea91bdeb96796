use rand::{seq::SliceRandom, Rng};

/// The models the relay service knows how to reach.
pub const ROSTER: [&str; 6] = [
    "claude-opus-4-20250514",
    "claude-sonnet-4-20250514",
    "o4-mini",
    "gemini-2.5-pro-preview-05-06",
    "gemini-2.5-flash-preview-05-20",
    "grok-3-mini",
];

/// Whether the model is known to the relay service.
pub fn is_known(model: &str) -> bool {
    ROSTER.contains(&model)
}

/// Draws two distinct models, the first to play white.
pub fn pairing<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    let mut picks = ROSTER.choose_multiple(rng, 2);
    let white = picks.next().copied().unwrap_or(ROSTER[0]);
    let black = picks.next().copied().unwrap_or(ROSTER[1]);
    (white, black)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use test_strategy::proptest;

    #[proptest]
    fn pairing_draws_distinct_known_models(seed: u64) {
        let (white, black) = pairing(&mut StdRng::seed_from_u64(seed));
        assert_ne!(white, black);
        assert!(is_known(white));
        assert!(is_known(black));
    }

    #[test]
    fn unknown_models_are_not_in_the_roster() {
        assert!(is_known("o4-mini"));
        assert!(!is_known("gpt-2"));
    }
}
