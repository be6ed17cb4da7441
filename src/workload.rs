//! Replays a reproducible insert-then-remove workload against an engine.
//!
//! The workload draws `num_elts` values uniformly from `[0, num_elts)`, so
//! roughly a third of the draws are duplicates and exercise the "already
//! present" and "already absent" paths of every engine.

use std::{
    fmt,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::info;

use crate::ordered_set::OrderedSet;

/// The two halves of a workload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Every draw is inserted.
    Insert,
    /// Every draw is removed again, in the same order.
    Remove,
}

impl fmt::Display for Phase {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Insert => f.write_str("insert"),
            Phase::Remove => f.write_str("remove"),
        }
    }
}

/// Reasons a workload run stops early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum WorkloadError {
    /// The engine reported a change that did not (or did) happen.
    #[error("{engine}: {phase} of {value} returned {returned}, expected {expected}.")]
    Mismatch {
        /// Name of the engine under test.
        engine: &'static str,
        /// Phase during which the mismatch happened.
        phase: Phase,
        /// The value passed to the engine.
        value: usize,
        /// What the engine returned.
        returned: bool,
        /// What the model expected.
        expected: bool,
    },
    /// [`OrderedSet::check`] failed.
    #[error("{engine}: structure check failed during {phase} after {steps} steps.")]
    CheckFailed {
        /// Name of the engine under test.
        engine: &'static str,
        /// Phase during which the check failed.
        phase: Phase,
        /// Number of operations applied in this phase so far.
        steps: usize,
    },
    /// The engine reports a length the model disagrees with.
    #[error("{engine}: holds {len} values after the {phase} phase, expected {expected}.")]
    LengthMismatch {
        /// Name of the engine under test.
        engine: &'static str,
        /// Phase after which the length was read.
        phase: Phase,
        /// Length reported by the engine.
        len: usize,
        /// Length according to the model.
        expected: usize,
    },
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Name of the engine under test.
    pub name: &'static str,
    /// Number of inserts that added a value.
    pub inserts: usize,
    /// Number of removes that dropped a value.
    pub removes: usize,
    /// Wall-clock time of the insert phase.
    pub insert_time: Duration,
    /// Wall-clock time of the remove phase.
    pub remove_time: Duration,
}

/// A reproducible sequence of draws.
///
/// ```
/// use ordset_engines::{BTree, OrderedSet, Workload};
///
/// let mut tree = BTree::new();
/// let report = Workload::new(1000).with_seed(5).run(&mut tree)?;
/// assert_eq!(report.name, "btree");
/// assert_eq!(report.inserts, report.removes);
/// assert!(tree.is_empty());
/// # Ok::<(), ordset_engines::WorkloadError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Number of draws, also the exclusive upper bound of the drawn values.
    pub num_elts: usize,
    /// Seed of the draw sequence.
    pub seed: u64,
    /// Run [`OrderedSet::check`] after every single operation.
    pub check_every_step: bool,
}

impl Workload {
    /// A workload of `num_elts` draws with seed zero, checking only at the end
    /// of each phase.
    #[inline]
    #[must_use]
    pub fn new(num_elts: usize) -> Self {
        Workload {
            num_elts,
            seed: 0,
            check_every_step: false,
        }
    }

    /// Replace the seed.
    #[inline]
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Workload { seed, ..self }
    }

    /// Check the structure after every operation.
    #[inline]
    #[must_use]
    pub fn with_check_every_step(self, check_every_step: bool) -> Self {
        Workload {
            check_every_step,
            ..self
        }
    }

    /// The draws, in the order they are applied.
    #[inline]
    #[must_use]
    pub fn draws(&self) -> Vec<usize> {
        if self.num_elts == 0 {
            return Vec::new();
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.num_elts)
            .map(|_| rng.random_range(0..self.num_elts))
            .collect()
    }

    /// Insert every draw, then remove every draw, comparing each outcome with
    /// a presence model.
    ///
    /// # Errors
    ///
    /// Stops at the first outcome the model disagrees with, or the first
    /// failing structure check.
    #[inline]
    pub fn run<S: OrderedSet<usize> + ?Sized>(
        &self,
        set: &mut S,
    ) -> Result<Report, WorkloadError> {
        let engine = set.name();
        let draws = self.draws();
        let mut present = vec![false; self.num_elts];

        let start = Instant::now();
        let inserts = self.phase(set, Phase::Insert, &draws, &mut present)?;
        let insert_time = start.elapsed();
        self.verify(set, Phase::Insert, draws.len(), inserts)?;

        let start = Instant::now();
        let removes = self.phase(set, Phase::Remove, &draws, &mut present)?;
        let remove_time = start.elapsed();
        self.verify(set, Phase::Remove, draws.len(), 0)?;

        let report = Report {
            name: engine,
            inserts,
            removes,
            insert_time,
            remove_time,
        };
        info!(
            engine,
            num_elts = self.num_elts,
            inserts,
            removes,
            insert_ms = insert_time.as_secs_f64() * 1e3,
            remove_ms = remove_time.as_secs_f64() * 1e3,
            "workload finished"
        );
        Ok(report)
    }

    /// Apply one phase and return the number of operations that changed the
    /// set.
    fn phase<S: OrderedSet<usize> + ?Sized>(
        &self,
        set: &mut S,
        phase: Phase,
        draws: &[usize],
        present: &mut [bool],
    ) -> Result<usize, WorkloadError> {
        let engine = set.name();
        let mut changed = 0;
        for (step, &value) in draws.iter().enumerate() {
            let (returned, expected) = match phase {
                Phase::Insert => (set.insert(value), !present[value]),
                Phase::Remove => (set.remove(&value), present[value]),
            };
            if returned != expected {
                return Err(WorkloadError::Mismatch {
                    engine,
                    phase,
                    value,
                    returned,
                    expected,
                });
            }
            if returned {
                present[value] = phase == Phase::Insert;
                changed += 1;
            }
            if self.check_every_step && !set.check() {
                return Err(WorkloadError::CheckFailed {
                    engine,
                    phase,
                    steps: step + 1,
                });
            }
        }
        Ok(changed)
    }

    fn verify<S: OrderedSet<usize> + ?Sized>(
        &self,
        set: &S,
        phase: Phase,
        steps: usize,
        expected: usize,
    ) -> Result<(), WorkloadError> {
        let engine = set.name();
        if !set.check() {
            return Err(WorkloadError::CheckFailed {
                engine,
                phase,
                steps,
            });
        }
        if set.len() != expected {
            return Err(WorkloadError::LengthMismatch {
                engine,
                phase,
                len: set.len(),
                expected,
            });
        }
        Ok(())
    }
}
