//! Scan progress reporting.
//!
//! Workers report percentages from many threads in any order. The reporter
//! keeps a high-water mark per phase and only forwards increases, so the
//! callback sees a non-decreasing sequence within each phase.

use std::sync::Arc;

use parking_lot::Mutex;

/// Which part of a catalog scan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Resolving loose bin files.
    LooseFiles,
    /// Resolving bin entries inside archives.
    Archives,
    /// The scan has finished or was cancelled.
    Complete,
}

/// One progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    /// 0 to 100.
    pub percent: u32,
}

/// Callback receiving progress events.
pub type ScanProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Percentage of `done` out of `total`, rounded up. An empty batch is
/// complete.
pub fn percent_of(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u64;
    let total = total as u64;
    ((done * 100).div_ceil(total)) as u32
}

/// Forwards monotonic progress to an optional callback.
pub struct ProgressReporter {
    callback: Option<ScanProgressCallback>,
    current: Mutex<ScanProgress>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ScanProgressCallback>) -> Self {
        Self {
            callback,
            current: Mutex::new(ScanProgress {
                phase: ScanPhase::LooseFiles,
                percent: 0,
            }),
        }
    }

    /// Start a phase at 0%.
    pub fn begin_phase(&self, phase: ScanPhase) {
        let mut current = self.current.lock();
        *current = ScanProgress { phase, percent: 0 };
        self.emit(*current);
    }

    /// Report progress within the current phase; lower values are dropped.
    pub fn report(&self, percent: u32) {
        let mut current = self.current.lock();
        let percent = percent.min(100);
        if percent > current.percent {
            current.percent = percent;
            self.emit(*current);
        }
    }

    /// Emit the final `Complete` event at 100%.
    pub fn complete(&self) {
        let mut current = self.current.lock();
        *current = ScanProgress {
            phase: ScanPhase::Complete,
            percent: 100,
        };
        self.emit(*current);
    }

    pub fn current(&self) -> ScanProgress {
        *self.current.lock()
    }

    // Called with the lock held so events reach the callback in order.
    fn emit(&self, progress: ScanProgress) {
        if let Some(callback) = &self.callback {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn recording() -> (ScanProgressCallback, Arc<Mutex<Vec<ScanProgress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ScanProgressCallback = Arc::new(move |p: ScanProgress| sink.lock().push(p));
        (callback, events)
    }

    #[test]
    fn test_percent_of_rounds_up() {
        assert_eq!(percent_of(0, 3), 0);
        assert_eq!(percent_of(1, 3), 34);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
        assert_eq!(percent_of(5, 3), 100);
    }

    #[test]
    fn test_phases_reset_and_complete() {
        let (callback, events) = recording();
        let reporter = ProgressReporter::new(Some(callback));

        reporter.begin_phase(ScanPhase::LooseFiles);
        reporter.report(50);
        reporter.report(40);
        reporter.begin_phase(ScanPhase::Archives);
        reporter.report(10);
        reporter.complete();

        let percents: Vec<(ScanPhase, u32)> =
            events.lock().iter().map(|p| (p.phase, p.percent)).collect();
        assert_eq!(
            percents,
            vec![
                (ScanPhase::LooseFiles, 0),
                (ScanPhase::LooseFiles, 50),
                (ScanPhase::Archives, 0),
                (ScanPhase::Archives, 10),
                (ScanPhase::Complete, 100),
            ]
        );
        assert_eq!(reporter.current().percent, 100);
    }

    proptest! {
        #[test]
        fn prop_reports_are_monotonic(reports in prop::collection::vec(0u32..150, 0..40)) {
            let (callback, events) = recording();
            let reporter = ProgressReporter::new(Some(callback));
            reporter.begin_phase(ScanPhase::LooseFiles);
            for percent in reports {
                reporter.report(percent);
            }

            let events = events.lock();
            prop_assert!(events.windows(2).all(|w| w[0].percent < w[1].percent));
            prop_assert!(events.iter().all(|p| p.percent <= 100));
        }
    }
}
