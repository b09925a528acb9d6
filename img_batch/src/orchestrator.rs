//! Batch orchestration: turns a [`ConversionJob`] into a [`BatchSummary`].
//!
//! Every unit's output name is planned before the first file is written, in
//! strict (input, format) order, so names depend only on processing order.
//! Units then run either on the calling thread or, with `jobs > 1`, on a rayon
//! pool with one input (and all of its formats) per task.

use crate::backend::ImageBackend;
use crate::error::UnitError;
use crate::formats::TargetFormat;
use crate::job::{ConversionJob, Scale};
use crate::naming::OutputNamePlan;
use crate::reporter::{BatchSummary, FileOutcome, Reporter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared stop flag. Once set, no new unit starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct PlannedUnit {
    pub index: usize,
    pub input: PathBuf,
    pub format: TargetFormat,
    pub target: Result<PathBuf, UnitError>,
}

/// Resolves every unit's output name, grouped per input in discovery order.
pub fn plan_units(job: &ConversionJob, inputs: &[PathBuf]) -> Vec<Vec<PlannedUnit>> {
    let mut plan = OutputNamePlan::new(job.output_dir(), !job.overwrite_existing());
    plan.reserve_inputs(inputs);

    let mut index = 0;
    let mut groups = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut group = Vec::with_capacity(job.formats().len());
        for &format in job.formats() {
            group.push(PlannedUnit {
                index,
                input: input.clone(),
                format,
                target: plan.resolve(input, format),
            });
            index += 1;
        }
        groups.push(group);
    }
    groups
}

pub struct Orchestrator<B> {
    backend: B,
    cancel: CancelToken,
}

impl<B: ImageBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn run(&self, job: &ConversionJob, reporter: &mut Reporter) -> BatchSummary {
        let inputs: Vec<PathBuf> = job.discovery().iter().collect();
        let groups = plan_units(job, &inputs);
        let total = inputs.len() * job.formats().len();

        tracing::info!(
            inputs = inputs.len(),
            formats = job.formats().len(),
            units = total,
            jobs = job.jobs(),
            "Starting batch conversion"
        );
        reporter.start(total);

        if job.jobs() > 1 && groups.len() > 1 {
            self.run_parallel(&groups, job.scale(), job.jobs(), reporter);
        } else {
            self.run_sequential(&groups, job.scale(), reporter);
        }

        let cancelled = reporter.processed() < total;
        if cancelled {
            tracing::warn!(
                processed = reporter.processed(),
                total,
                "Batch cancelled before all units started"
            );
        }
        reporter.finish(cancelled)
    }

    fn run_sequential(&self, groups: &[Vec<PlannedUnit>], scale: Scale, reporter: &mut Reporter) {
        for group in groups {
            let finished = self.process_input(group, scale, |outcome| {
                reporter.on_unit_complete(outcome);
            });
            if !finished {
                break;
            }
        }
    }

    fn run_parallel(
        &self,
        groups: &[Vec<PlannedUnit>],
        scale: Scale,
        jobs: usize,
        reporter: &mut Reporter,
    ) {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "Thread pool unavailable, converting sequentially");
                return self.run_sequential(groups, scale, reporter);
            }
        };

        let shared = Mutex::new(reporter);
        pool.install(|| {
            groups.par_iter().for_each(|group| {
                self.process_input(group, scale, |outcome| {
                    let mut reporter = shared.lock().unwrap_or_else(|e| e.into_inner());
                    reporter.on_unit_complete(outcome);
                });
            });
        });
    }

    /// Runs all units of one input, decoding it at most once.
    ///
    /// Returns false when cancellation stopped the group early.
    fn process_input<F>(&self, group: &[PlannedUnit], scale: Scale, mut publish: F) -> bool
    where
        F: FnMut(FileOutcome),
    {
        let mut decoded: Option<Result<B::Image, UnitError>> = None;

        for unit in group {
            if self.cancel.is_cancelled() {
                return false;
            }

            let result = match &unit.target {
                Err(e) => Err(e.clone()),
                Ok(output) => {
                    let image =
                        decoded.get_or_insert_with(|| self.decode_scaled(&unit.input, scale));
                    match image {
                        Ok(image) => self
                            .backend
                            .encode(image, unit.format, output)
                            .map(|()| output.clone()),
                        Err(e) => Err(e.clone()),
                    }
                }
            };

            publish(FileOutcome {
                index: unit.index,
                input: unit.input.clone(),
                format: unit.format,
                result,
            });
        }
        true
    }

    fn decode_scaled(&self, input: &Path, scale: Scale) -> Result<B::Image, UnitError> {
        let image = self.backend.decode(input)?;
        if scale.is_identity() {
            Ok(image)
        } else {
            self.backend.scale(&image, scale)
        }
    }
}
