//! "Please wait" phrases streamed before the upstream answer starts.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

pub static WAITING_PHRASES: &[&str] = &[
    "Just a moment, checking the mall directory...",
    "Let me look that up for you...",
    "Good question, finding the information...",
];

/// Chooses one phrase from a fixed set.
pub trait PhraseSelector: Send + Sync {
    fn pick(&self, phrases: &'static [&'static str]) -> &'static str;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl PhraseSelector for RandomSelector {
    fn pick(&self, phrases: &'static [&'static str]) -> &'static str {
        phrases.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
    }
}

/// Reproducible sequence of choices from a fixed seed.
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl PhraseSelector for SeededSelector {
    fn pick(&self, phrases: &'static [&'static str]) -> &'static str {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        phrases.choose(&mut *rng).copied().unwrap_or_default()
    }
}

/// Always the phrase at `index` (wrapping).
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl PhraseSelector for FixedSelector {
    fn pick(&self, phrases: &'static [&'static str]) -> &'static str {
        if phrases.is_empty() {
            return "";
        }
        phrases[self.0 % phrases.len()]
    }
}
