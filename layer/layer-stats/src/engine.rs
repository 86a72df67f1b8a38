//! Parallel aggregation engine.
//!
//! Each non-excluded file becomes a [`WorkUnit`] run on a dedicated rayon
//! pool. The driver thread keeps at most one unit per free worker in
//! flight, checks the [`CancelToken`] before every dispatch, and enforces
//! the per-unit timeout from the moment a worker reports it started.
//! A timed-out unit keeps its worker until it returns; that worker is
//! counted as stalled until its late result arrives.
//! Results are keyed by file path, so the merged output does not depend
//! on completion order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use layer_types::LayerReader;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::discover::{DiscoveredFile, discover_build, exclusion_reason};
use crate::error::{AggregateError, AggregateResult, UnitError};
use crate::stats::AggregateStatistics;
use crate::unit::{FileOutcome, FileResult, WorkUnit};

/// Flag for aborting a run between unit dispatches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Units already running finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output of a run.
#[derive(Debug)]
pub struct AnalysisReport {
    /// Build identifier.
    pub build_id: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Per-file outcomes, sorted by path.
    pub files: Vec<FileOutcome>,
    /// Statistics over the completed files.
    pub statistics: AggregateStatistics,
    /// Render all files into one combined view.
    pub composite_view: bool,
}

impl AnalysisReport {
    /// Outcome for `path`, if it was part of the run.
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<&FileOutcome> {
        self.files
            .binary_search_by(|f| f.file.path.as_path().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Whether some files errored or were excluded.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.statistics.files.ok < self.files.len()
    }
}

/// Number of workers for `unit_count` units.
#[must_use]
pub fn worker_count(unit_count: usize, max_workers: Option<usize>) -> usize {
    let cores = num_cpus::get().max(1);
    let cap = max_workers.unwrap_or(usize::MAX).max(1);
    cores.min(unit_count).min(cap).max(1)
}

enum WorkerEvent {
    Started { slot: usize, at: Instant },
    Finished { slot: usize, result: Result<FileResult, UnitError> },
}

struct Flight {
    file: DiscoveredFile,
    started: Option<Instant>,
}

/// Runs analyses with one configuration and reader.
pub struct Engine {
    config: AnalysisConfig,
    reader: Arc<dyn LayerReader>,
    cancel: CancelToken,
}

impl Engine {
    /// Create an engine.
    #[must_use]
    pub fn new(config: AnalysisConfig, reader: Arc<dyn LayerReader>) -> Self {
        Self {
            config,
            reader,
            cancel: CancelToken::new(),
        }
    }

    /// Use `token` to cancel runs.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Discover the configured build directory and analyze it.
    ///
    /// # Errors
    ///
    /// Returns a run-level [`AggregateError`]; see [`Engine::run`].
    pub fn run_build(&self) -> AggregateResult<AnalysisReport> {
        self.config.validate()?;
        let Some(dir) = &self.config.build_dir else {
            return Err(AggregateError::Discovery {
                path: PathBuf::new(),
                message: "no build directory configured".to_string(),
            });
        };
        let files = discover_build(dir, &self.config.extensions)?;
        self.run(&files)
    }

    /// Analyze `files`.
    ///
    /// Files failing the filters are recorded as excluded; per-file
    /// failures are recorded as errors and never abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Config`] before any file is opened if the
    /// configuration is invalid, [`AggregateError::Cancelled`] if the
    /// token is cancelled, and [`AggregateError::Pool`] if no worker pool
    /// can be built.
    pub fn run(&self, files: &[DiscoveredFile]) -> AggregateResult<AnalysisReport> {
        self.config.validate()?;
        let start = Instant::now();

        let mut outcomes: BTreeMap<PathBuf, FileOutcome> = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        for file in files {
            if !seen.insert(file.path.as_path()) {
                continue;
            }
            if let Some(reason) = exclusion_reason(file, &self.config) {
                debug!(file = %file.name, %reason, "excluded");
                outcomes.insert(file.path.clone(), FileOutcome::excluded(file.clone(), reason));
            } else {
                units.push(WorkUnit::new(file.clone(), &self.config, Arc::clone(&self.reader)));
            }
        }

        info!(
            build_id = self.config.build_id,
            files = seen.len(),
            units = units.len(),
            "starting analysis"
        );

        if !units.is_empty() {
            self.dispatch(units, &mut outcomes)?;
        }

        let files: Vec<FileOutcome> = outcomes.into_values().collect();
        let statistics = AggregateStatistics::from_outcomes(&files);
        let duration = start.elapsed();

        info!(
            build_id = self.config.build_id,
            ok = statistics.files.ok,
            errors = statistics.files.error,
            excluded = statistics.files.excluded,
            shapes = statistics.total_shapes,
            holes = statistics.total_holes,
            seconds = duration.as_secs_f64(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            build_id: self.config.build_id,
            duration,
            files,
            statistics,
            composite_view: self.config.composite_view,
        })
    }

    fn dispatch(
        &self,
        units: Vec<WorkUnit>,
        outcomes: &mut BTreeMap<PathBuf, FileOutcome>,
    ) -> AggregateResult<()> {
        let workers = worker_count(units.len(), self.config.max_workers);
        let timeout = self.config.unit_timeout();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("layer-worker-{i}"))
            .build()
            .map_err(|e| AggregateError::Pool {
                message: e.to_string(),
            })?;
        debug!(workers, timeout_secs = timeout.as_secs_f64(), "worker pool ready");

        let (tx, rx) = mpsc::channel::<WorkerEvent>();
        let mut pending = units.into_iter().enumerate().peekable();
        let mut in_flight: HashMap<usize, Flight> = HashMap::new();
        let mut timed_out: HashSet<usize> = HashSet::new();

        loop {
            while in_flight.len() < workers.saturating_sub(timed_out.len()) {
                let Some((slot, unit)) = pending.next() else {
                    break;
                };
                if self.cancel.is_cancelled() {
                    warn!(dispatched = slot, "analysis cancelled");
                    return Err(AggregateError::Cancelled);
                }
                in_flight.insert(
                    slot,
                    Flight {
                        file: unit.file.clone(),
                        started: None,
                    },
                );
                let tx = tx.clone();
                pool.spawn(move || {
                    let _ = tx.send(WorkerEvent::Started {
                        slot,
                        at: Instant::now(),
                    });
                    let result = run_guarded(&unit);
                    let _ = tx.send(WorkerEvent::Finished { slot, result });
                });
            }

            if in_flight.is_empty() {
                if pending.peek().is_none() {
                    break;
                }
                // Every worker is stalled: allow one more timeout for a
                // late result to free one.
                if reclaim_worker(&rx, &mut timed_out, timeout) {
                    debug!(stalled = timed_out.len(), "stalled worker returned");
                    continue;
                }
                for (_, unit) in pending.by_ref() {
                    warn!(file = %unit.file.name, "no worker available");
                    record(outcomes, unit.file, Err(UnitError::NoWorker));
                }
                break;
            }

            let wait = next_deadline(&in_flight, timeout)
                .map_or(timeout, |d| d.saturating_duration_since(Instant::now()));
            match rx.recv_timeout(wait) {
                Ok(WorkerEvent::Started { slot, at }) => {
                    if let Some(flight) = in_flight.get_mut(&slot) {
                        flight.started = Some(at);
                    }
                }
                Ok(WorkerEvent::Finished { slot, result }) => {
                    if let Some(flight) = in_flight.remove(&slot) {
                        if let Err(e) = &result {
                            warn!(
                                file = %flight.file.name,
                                kind = e.kind(),
                                error = %e,
                                "unit failed"
                            );
                        }
                        record(outcomes, flight.file, result);
                    } else if timed_out.remove(&slot) {
                        // Late result of a timed-out unit: dropped, worker free.
                        debug!(slot, stalled = timed_out.len(), "stalled worker returned");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(AggregateError::Pool {
                        message: "worker channel closed".to_string(),
                    });
                }
            }

            let now = Instant::now();
            let expired: Vec<usize> = in_flight
                .iter()
                .filter(|(_, f)| f.started.is_some_and(|s| now.duration_since(s) >= timeout))
                .map(|(slot, _)| *slot)
                .collect();
            for slot in expired {
                if let Some(flight) = in_flight.remove(&slot) {
                    warn!(file = %flight.file.name, "unit timed out");
                    record(
                        outcomes,
                        flight.file,
                        Err(UnitError::Timeout { limit: timeout }),
                    );
                    timed_out.insert(slot);
                }
            }
        }

        Ok(())
    }
}

/// Wait up to `timeout` for any timed-out unit to return.
fn reclaim_worker(
    rx: &Receiver<WorkerEvent>,
    timed_out: &mut HashSet<usize>,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(WorkerEvent::Finished { slot, .. }) if timed_out.remove(&slot) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

fn next_deadline(in_flight: &HashMap<usize, Flight>, timeout: Duration) -> Option<Instant> {
    in_flight
        .values()
        .filter_map(|f| f.started)
        .min()
        .map(|s| s + timeout)
}

fn record(
    outcomes: &mut BTreeMap<PathBuf, FileOutcome>,
    file: DiscoveredFile,
    result: Result<FileResult, UnitError>,
) {
    outcomes.insert(file.path.clone(), FileOutcome::finished(file, result));
}

fn run_guarded(unit: &WorkUnit) -> Result<FileResult, UnitError> {
    catch_unwind(AssertUnwindSafe(|| unit.run())).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(UnitError::Panicked { message })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_types::{
        Height, Identifier, Layer, MemoryLayerFile, MemoryReader, Point2, RawPath, Shape,
    };

    fn ring(cx: f64, r: f64, ccw: bool) -> RawPath {
        let sign = if ccw { 1.0 } else { -1.0 };
        let pts = (0..=24_i32)
            .map(|i| {
                let a = sign * f64::from(i % 24) * std::f64::consts::TAU / 24.0;
                Point2::new(cx + r * a.cos(), r * a.sin())
            })
            .collect();
        RawPath::points(pts)
    }

    fn reader() -> MemoryReader {
        let holed = Shape::new(
            Some(Identifier::new(1)),
            vec![ring(0.0, 6.0, true), ring(0.0, 2.0, false)],
        )
        .unwrap();
        let solid = Shape::new(Some(Identifier::new(2)), vec![ring(30.0, 4.0, true)]).unwrap();
        MemoryReader::new()
            .with_file(
                "/b/Models/a/a.clf",
                MemoryLayerFile::new(
                    "a.clf",
                    0.05,
                    vec![Layer::new(Height::from_mm(1.0), vec![holed])],
                ),
            )
            .with_file(
                "/b/Models/b/b.clf",
                MemoryLayerFile::new(
                    "b.clf",
                    0.05,
                    vec![Layer::new(Height::from_mm(1.0), vec![solid])],
                ),
            )
            .with_broken("/b/Models/c/c.clf", "truncated header")
    }

    fn files() -> Vec<DiscoveredFile> {
        ["/b/Models/c/c.clf", "/b/Models/a/a.clf", "/b/Models/b/b.clf"]
            .into_iter()
            .map(DiscoveredFile::from_path)
            .collect()
    }

    #[test]
    fn test_worker_count_bounds() {
        assert_eq!(worker_count(1, None), 1);
        assert_eq!(worker_count(1000, Some(2)), 2_usize.min(num_cpus::get()));
        assert_eq!(worker_count(0, None), 1);
        assert!(worker_count(1000, None) <= num_cpus::get());
    }

    #[test]
    fn test_run_records_each_file() {
        let config = AnalysisConfig::new(5).with_heights([1.0]);
        let engine = Engine::new(config, Arc::new(reader()));
        let report = engine.run(&files()).unwrap();

        assert_eq!(report.files.len(), 3);
        let names: Vec<_> = report.files.iter().map(|f| f.file.name.as_str()).collect();
        assert_eq!(names, vec!["a.clf", "b.clf", "c.clf"]);
        assert_eq!(report.statistics.total_shapes, 2);
        assert_eq!(report.statistics.total_holes, 1);
        assert_eq!(report.statistics.files.error, 1);
        assert!(report.is_partial());

        let broken = report.file(Path::new("/b/Models/c/c.clf")).unwrap();
        assert!(broken.message().unwrap().contains("truncated header"));
    }

    #[test]
    fn test_invalid_config_fails_before_dispatch() {
        let engine = Engine::new(AnalysisConfig::new(5), Arc::new(reader()));
        assert!(matches!(engine.run(&files()), Err(AggregateError::Config(_))));
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let token = CancelToken::new();
        token.cancel();
        let engine = Engine::new(AnalysisConfig::new(5).with_heights([1.0]), Arc::new(reader()))
            .with_cancel_token(token);
        assert!(matches!(engine.run(&files()), Err(AggregateError::Cancelled)));
    }

    #[test]
    fn test_run_build_without_dir() {
        let engine = Engine::new(AnalysisConfig::new(5).with_heights([1.0]), Arc::new(reader()));
        assert!(matches!(
            engine.run_build(),
            Err(AggregateError::Discovery { .. })
        ));
    }
}
