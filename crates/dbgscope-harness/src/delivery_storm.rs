#![forbid(unsafe_code)]

//! Delivery storm generator and replay checksums.
//!
//! A storm drives a [`SessionSimulator`] through a seeded mix of scrolls
//! and fetch completions: pending fetches are delivered out of order,
//! delivered twice, or failed. The same seed over the same source always
//! produces the same actions and the same command log, so a storm can be
//! recorded once and replayed as a regression check.
//!
//! # Usage
//!
//! ```ignore
//! use dbgscope_harness::delivery_storm::{DeliveryStorm, StormConfig};
//!
//! let storm = DeliveryStorm::new(StormConfig::default().with_seed(7).with_steps(200));
//! let report = storm.run(&mut sim);
//! assert!(sim.errors().is_empty());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use dbgscope_runtime::{DataSource, Msg, SequenceKind, SessionSimulator};

// ============================================================================
// Configuration
// ============================================================================

/// Knobs of a storm. Chances are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StormConfig {
    pub seed: u64,
    /// Number of actions before the final drain.
    pub steps: usize,
    /// Chance a step scrolls instead of completing a fetch.
    pub scroll_chance: f64,
    /// Chance a completion is delivered but left queued.
    pub duplicate_chance: f64,
    /// Chance a completion fails.
    pub fail_chance: f64,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 100,
            scroll_chance: 0.3,
            duplicate_chance: 0.15,
            fail_chance: 0.1,
        }
    }
}

impl StormConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_fail_chance(mut self, chance: f64) -> Self {
        self.fail_chance = chance;
        self
    }

    #[must_use]
    pub fn with_duplicate_chance(mut self, chance: f64) -> Self {
        self.duplicate_chance = chance;
        self
    }
}

/// Deterministic LCG so storms do not depend on an RNG crate's stream.
struct SeededRng {
    state: u64,
}

impl SeededRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform in `[0, n)`; `0` when `n == 0`.
    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        // High bits of an LCG are the better-distributed ones.
        let bits = self.next_u64() >> 33;
        usize::try_from(bits).unwrap_or(usize::MAX) % n
    }

    fn chance(&mut self, p: f64) -> bool {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        unit < p
    }
}

// ============================================================================
// Actions
// ============================================================================

/// One step a storm took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StormAction {
    ScrollLeft(SequenceKind),
    ScrollRight(SequenceKind),
    ScrollToIndex(SequenceKind, usize),
    Deliver(usize),
    Duplicate(usize),
    Fail(usize),
    /// The chosen sequence is still empty.
    Idle,
}

/// Outcome of [`DeliveryStorm::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StormReport {
    pub actions: Vec<StormAction>,
    /// Completions made by the final drain.
    pub drained: usize,
    /// Checksum of `actions`.
    pub sequence_checksum: String,
}

impl StormReport {
    #[must_use]
    pub fn count(&self, pred: impl Fn(&StormAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

// ============================================================================
// Storm
// ============================================================================

#[derive(Debug, Clone)]
pub struct DeliveryStorm {
    config: StormConfig,
}

impl DeliveryStorm {
    #[must_use]
    pub fn new(config: StormConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StormConfig {
        &self.config
    }

    /// Run the storm against `sim`, then deliver everything still pending.
    pub fn run<S: DataSource>(&self, sim: &mut SessionSimulator<S>) -> StormReport {
        let mut rng = SeededRng::new(self.config.seed);
        let mut actions = Vec::with_capacity(self.config.steps);

        for _ in 0..self.config.steps {
            let pending = sim.pending().len();
            let action = if pending == 0 || rng.chance(self.config.scroll_chance) {
                self.scroll_action(&mut rng, sim)
            } else {
                let index = rng.below(pending);
                if rng.chance(self.config.fail_chance) {
                    StormAction::Fail(index)
                } else if rng.chance(self.config.duplicate_chance) {
                    StormAction::Duplicate(index)
                } else {
                    StormAction::Deliver(index)
                }
            };
            apply(sim, action);
            sim.advance(10);
            actions.push(action);
        }

        let drained = sim.deliver_all();
        tracing::debug!(
            seed = self.config.seed,
            steps = actions.len(),
            drained,
            "delivery storm finished"
        );
        let sequence_checksum = sequence_checksum(&actions);
        StormReport {
            actions,
            drained,
            sequence_checksum,
        }
    }

    fn scroll_action<S: DataSource>(
        &self,
        rng: &mut SeededRng,
        sim: &SessionSimulator<S>,
    ) -> StormAction {
        let kind = if rng.below(4) == 0 {
            SequenceKind::GraphExecutions
        } else {
            SequenceKind::Executions
        };
        let (num_items, display_count) = match kind {
            SequenceKind::Executions => {
                let view = sim.state().executions().digests().view();
                (view.num_items(), view.display_count())
            }
            SequenceKind::GraphExecutions => {
                let view = sim.state().graph_executions().view();
                (view.num_items(), view.display_count())
            }
        };
        if num_items == 0 {
            return StormAction::Idle;
        }
        let max_begin = num_items.saturating_sub(display_count);
        match rng.below(3) {
            0 => StormAction::ScrollLeft(kind),
            1 => StormAction::ScrollRight(kind),
            _ => StormAction::ScrollToIndex(kind, rng.below(max_begin + 1)),
        }
    }
}

fn apply<S: DataSource>(sim: &mut SessionSimulator<S>, action: StormAction) {
    match action {
        StormAction::ScrollLeft(kind) => sim.send(Msg::ScrollLeft(kind)),
        StormAction::ScrollRight(kind) => sim.send(Msg::ScrollRight(kind)),
        StormAction::ScrollToIndex(kind, index) => sim.send(Msg::ScrollToIndex(kind, index)),
        StormAction::Deliver(index) => {
            sim.deliver_at(index);
        }
        StormAction::Duplicate(index) => {
            sim.duplicate_at(index);
        }
        StormAction::Fail(index) => {
            sim.fail_at(index);
        }
        StormAction::Idle => {}
    }
}

/// Checksum of an action sequence.
#[must_use]
pub fn sequence_checksum(actions: &[StormAction]) -> String {
    let mut hasher = DefaultHasher::new();
    actions.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Checksum of a simulator's JSONL command log.
pub fn log_checksum<S: DataSource>(sim: &SessionSimulator<S>) -> serde_json::Result<String> {
    let jsonl = sim.export_command_log_jsonl()?;
    let mut hasher = DefaultHasher::new();
    jsonl.hash(&mut hasher);
    Ok(format!("{:016x}", hasher.finish()))
}
