//! Rough time estimates for uploads, file analysis and knowledge-base builds.
//! All durations are whole seconds.

use std::time::{Duration, Instant};

/// Assumed upload throughput in MB/s.
const UPLOAD_SPEED_MB_PER_SEC: f64 = 5.0;

/// Base analysis time by file type, matched by substring in table order.
const ANALYSIS_BASE_SECS: &[(&str, u64)] = &[
    ("image", 5),
    ("pdf", 10),
    ("doc", 8),
    ("ppt", 12),
    ("txt", 3),
    ("md", 3),
];
const DEFAULT_ANALYSIS_SECS: u64 = 8;

const KNOWLEDGE_BUILD_BASE_SECS: u64 = 15;
const KNOWLEDGE_BUILD_PER_FILE_SECS: u64 = 5;

pub fn estimate_upload_time(size_mb: f64) -> u64 {
    (size_mb / UPLOAD_SPEED_MB_PER_SEC).ceil().max(0.0) as u64
}

/// Base time for the type plus one second per started 10 MB.
pub fn estimate_analysis_time(file_type: &str, size_mb: f64) -> u64 {
    let base = ANALYSIS_BASE_SECS
        .iter()
        .find(|(key, _)| file_type.contains(key))
        .map(|(_, secs)| *secs)
        .unwrap_or(DEFAULT_ANALYSIS_SECS);
    base + (size_mb / 10.0).ceil().max(0.0) as u64
}

pub fn estimate_knowledge_build_time(file_count: usize) -> u64 {
    KNOWLEDGE_BUILD_BASE_SECS + file_count as u64 * KNOWLEDGE_BUILD_PER_FILE_SECS
}

/// Formats seconds as "42 s", "3 min 5 s", "3 min" or "1 h 20 min".
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds} s");
    }
    let minutes = seconds / 60;
    let rem_secs = seconds % 60;
    if minutes < 60 {
        return if rem_secs > 0 {
            format!("{minutes} min {rem_secs} s")
        } else {
            format!("{minutes} min")
        };
    }
    format!("{} h {} min", minutes / 60, minutes % 60)
}

/// Progress of a batch of items, re-estimating the remaining time from the
/// pace observed so far.
#[derive(Debug, Clone)]
pub struct ProgressCalculator {
    total: usize,
    completed: usize,
    started: Instant,
    initial_estimate: u64,
}

impl ProgressCalculator {
    pub fn new(total: usize, initial_estimate: Option<u64>) -> Self {
        Self {
            total,
            completed: 0,
            started: Instant::now(),
            initial_estimate: initial_estimate.unwrap_or(0),
        }
    }

    pub fn update(&mut self, completed: usize) {
        self.completed = completed;
    }

    pub fn increment(&mut self) {
        self.completed += 1;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Percentage complete, rounded.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round().min(100.0) as u8
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn estimated_remaining(&self) -> u64 {
        self.remaining_given(self.started.elapsed())
    }

    pub fn estimated_total(&self) -> u64 {
        self.total_given(self.started.elapsed())
    }

    pub fn is_completed(&self) -> bool {
        self.completed >= self.total
    }

    pub fn reset(&mut self, total: Option<usize>) {
        if let Some(total) = total {
            self.total = total;
        }
        self.completed = 0;
        self.started = Instant::now();
    }

    fn secs_per_item(&self, elapsed: Duration) -> f64 {
        elapsed.as_secs() as f64 / self.completed as f64
    }

    fn remaining_given(&self, elapsed: Duration) -> u64 {
        if self.completed == 0 {
            return self.initial_estimate;
        }
        let remaining = self.total.saturating_sub(self.completed) as f64;
        (self.secs_per_item(elapsed) * remaining).ceil() as u64
    }

    fn total_given(&self, elapsed: Duration) -> u64 {
        if self.completed == 0 {
            return self.initial_estimate;
        }
        (self.secs_per_item(elapsed) * self.total as f64).ceil() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    AnalyzingFiles,
    ExtractingInfo,
    BuildingStructure,
    Completing,
}

impl BuildStage {
    const ALL: [BuildStage; 4] = [
        BuildStage::AnalyzingFiles,
        BuildStage::ExtractingInfo,
        BuildStage::BuildingStructure,
        BuildStage::Completing,
    ];

    /// Upper bound of the stage as a percentage of the whole build.
    fn ceiling_percent(&self) -> u8 {
        match self {
            BuildStage::AnalyzingFiles => 25,
            BuildStage::ExtractingInfo => 50,
            BuildStage::BuildingStructure => 75,
            BuildStage::Completing => 95,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            BuildStage::AnalyzingFiles => "analyzing_files",
            BuildStage::ExtractingInfo => "extracting_info",
            BuildStage::BuildingStructure => "building_structure",
            BuildStage::Completing => "completing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BuildStage::AnalyzingFiles => "Analyzing files",
            BuildStage::ExtractingInfo => "Extracting key information",
            BuildStage::BuildingStructure => "Building knowledge structure",
            BuildStage::Completing => "Finishing up",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// Time-driven progress for a knowledge-base build whose server call gives
/// no intermediate feedback. Never reports 100% on its own.
#[derive(Debug, Clone)]
pub struct KnowledgeBuildProgress {
    started: Instant,
    estimated: Duration,
    reported_stage: Option<BuildStage>,
}

impl KnowledgeBuildProgress {
    pub fn new(estimated_secs: u64) -> Self {
        Self {
            started: Instant::now(),
            estimated: Duration::from_secs(estimated_secs),
            reported_stage: None,
        }
    }

    /// Moves the stage forward when real progress is known.
    pub fn set_stage(&mut self, stage: BuildStage) {
        self.reported_stage = Some(stage);
    }

    pub fn stage(&self) -> BuildStage {
        self.stage_given(self.started.elapsed())
    }

    pub fn percent(&self) -> u8 {
        self.percent_given(self.started.elapsed())
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_given(self.started.elapsed())
    }

    fn fraction(&self, elapsed: Duration) -> f64 {
        if self.estimated.is_zero() {
            return 1.0;
        }
        elapsed.as_secs_f64() / self.estimated.as_secs_f64()
    }

    fn stage_given(&self, elapsed: Duration) -> BuildStage {
        let fraction = self.fraction(elapsed).min(1.0);
        let by_time = BuildStage::ALL
            .into_iter()
            .find(|s| fraction <= f64::from(s.ceiling_percent()) / 100.0)
            .unwrap_or(BuildStage::Completing);
        match self.reported_stage {
            Some(reported) => by_time.max(reported),
            None => by_time,
        }
    }

    fn percent_given(&self, elapsed: Duration) -> u8 {
        (self.fraction(elapsed) * 100.0).round().min(99.0) as u8
    }

    fn remaining_given(&self, elapsed: Duration) -> u64 {
        (self.estimated.as_secs_f64() - elapsed.as_secs_f64()).ceil().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_and_analysis_estimates() {
        assert_eq!(estimate_upload_time(12.0), 3);
        assert_eq!(estimate_upload_time(0.0), 0);
        assert_eq!(estimate_analysis_time("image/png", 2.0), 6);
        assert_eq!(estimate_analysis_time("application/pdf", 25.0), 13);
        assert_eq!(estimate_analysis_time("pptx", 1.0), 13);
        assert_eq!(estimate_analysis_time("application/zip", 1.0), 9);
    }

    #[test]
    fn knowledge_build_estimate_grows_per_file() {
        assert_eq!(estimate_knowledge_build_time(0), 15);
        assert_eq!(estimate_knowledge_build_time(4), 35);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(42), "42 s");
        assert_eq!(format_duration(185), "3 min 5 s");
        assert_eq!(format_duration(180), "3 min");
        assert_eq!(format_duration(4_800), "1 h 20 min");
    }

    #[test]
    fn calculator_uses_initial_estimate_until_first_item() {
        let mut calc = ProgressCalculator::new(4, Some(40));
        assert_eq!(calc.remaining_given(Duration::from_secs(3)), 40);
        assert_eq!(calc.percent(), 0);

        calc.increment();
        assert_eq!(calc.percent(), 25);
        assert_eq!(calc.remaining_given(Duration::from_secs(10)), 30);
        assert_eq!(calc.total_given(Duration::from_secs(10)), 40);
        assert!(!calc.is_completed());

        calc.update(4);
        assert!(calc.is_completed());
        calc.reset(Some(2));
        assert_eq!(calc.completed(), 0);
        assert_eq!(calc.total(), 2);
    }

    #[test]
    fn empty_batch_reports_zero_percent() {
        assert_eq!(ProgressCalculator::new(0, None).percent(), 0);
    }

    #[test]
    fn build_progress_walks_through_stages_and_caps_at_99() {
        let progress = KnowledgeBuildProgress::new(100);
        assert_eq!(progress.stage_given(Duration::from_secs(10)), BuildStage::AnalyzingFiles);
        assert_eq!(progress.stage_given(Duration::from_secs(40)), BuildStage::ExtractingInfo);
        assert_eq!(progress.stage_given(Duration::from_secs(70)), BuildStage::BuildingStructure);
        assert_eq!(progress.stage_given(Duration::from_secs(90)), BuildStage::Completing);
        assert_eq!(progress.stage_given(Duration::from_secs(500)), BuildStage::Completing);
        assert_eq!(progress.percent_given(Duration::from_secs(50)), 50);
        assert_eq!(progress.percent_given(Duration::from_secs(500)), 99);
        assert_eq!(progress.remaining_given(Duration::from_secs(30)), 70);
        assert_eq!(progress.remaining_given(Duration::from_secs(130)), 0);
    }

    #[test]
    fn reported_stage_is_never_moved_backwards() {
        let mut progress = KnowledgeBuildProgress::new(100);
        progress.set_stage(BuildStage::BuildingStructure);
        assert_eq!(progress.stage_given(Duration::from_secs(1)), BuildStage::BuildingStructure);
        assert_eq!(BuildStage::from_key("extracting_info"), Some(BuildStage::ExtractingInfo));
        assert_eq!(BuildStage::from_key("nope"), None);
    }
}
