use anyhow::{bail, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnalysisSettings;
use crate::detection::motion::MotionPool;
use crate::detection::overlay::{self, GREEN};
use crate::detection::{
    DetectorOutcome, DetectorTracker, MotionTracker, OccupancyClassifier, VehicleDetector,
};
use crate::layout::RegionLayout;
use crate::models::{Centroid, CountingLine, OccupancyResult, StatsSnapshot};
use crate::pipeline::DebugConfig;

/// Which pipeline incoming frames are dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum AnalysisMode {
    /// Per-region occupancy
    Parking,
    /// Vehicle counting by frame differencing
    MotionCounting,
    /// Vehicle counting from detector boxes
    DetectorCounting,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisMode::Parking => "parking",
            AnalysisMode::MotionCounting => "motion counting",
            AnalysisMode::DetectorCounting => "detector counting",
        };
        f.write_str(name)
    }
}

/// Mutable state carried from one frame to the next
#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    pub layout: RegionLayout,
    pub vehicle_counter: u64,
    pub motion_pool: MotionPool,
    pub detector_pool: Vec<Centroid>,
    /// Earlier frame for motion differencing
    pub previous_frame: Option<RgbImage>,
    pub free_spaces: usize,
    pub spaces: Vec<OccupancyResult>,
}

impl TrackingState {
    pub fn new(layout: RegionLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_spaces = self.layout.len();
        StatsSnapshot {
            total_spaces,
            free_spaces: self.free_spaces,
            occupied_spaces: total_spaces.saturating_sub(self.free_spaces),
            vehicles: self.vehicle_counter,
        }
    }

    fn clear_tracking(&mut self) {
        self.motion_pool.clear();
        self.detector_pool.clear();
        self.previous_frame = None;
    }
}

/// What one call to [`Session::process_frame`] produced
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: RgbImage,
    pub frame_index: u64,
    pub mode: AnalysisMode,
    /// False for skipped frames and for the first frame of a motion stream
    pub analyzed: bool,
    pub spaces: Vec<OccupancyResult>,
    pub crossed: usize,
    pub detector_error: Option<String>,
    pub stats: StatsSnapshot,
}

/// The pipeline variants. Each one reads and updates [`TrackingState`].
#[derive(Clone)]
pub enum Analyzer {
    Parking(OccupancyClassifier),
    Motion(MotionTracker),
    Detector(DetectorTracker),
}

impl Analyzer {
    pub fn for_mode(mode: AnalysisMode, settings: &AnalysisSettings, debug: Option<&DebugConfig>) -> Self {
        match mode {
            AnalysisMode::Parking => {
                let classifier = OccupancyClassifier::new();
                Analyzer::Parking(match debug {
                    Some(config) => classifier.with_debug(config.clone()),
                    None => classifier,
                })
            }
            AnalysisMode::MotionCounting => {
                let tracker = MotionTracker::new(settings.motion_params());
                Analyzer::Motion(match debug {
                    Some(config) => tracker.with_debug(config.clone()),
                    None => tracker,
                })
            }
            AnalysisMode::DetectorCounting => {
                Analyzer::Detector(DetectorTracker::new(settings.tracker_params()))
            }
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        match self {
            Analyzer::Parking(_) => AnalysisMode::Parking,
            Analyzer::Motion(_) => AnalysisMode::MotionCounting,
            Analyzer::Detector(_) => AnalysisMode::DetectorCounting,
        }
    }

    /// Analyse one frame and write the results back into `state`.
    pub fn process(
        &self,
        frame: RgbImage,
        frame_index: u64,
        state: &mut TrackingState,
        settings: &AnalysisSettings,
        detector: &mut Option<Box<dyn VehicleDetector>>,
    ) -> Result<FrameReport> {
        let mut report = FrameReport {
            frame: RgbImage::new(0, 0),
            frame_index,
            mode: self.mode(),
            analyzed: true,
            spaces: Vec::new(),
            crossed: 0,
            detector_error: None,
            stats: StatsSnapshot::default(),
        };

        match self {
            Analyzer::Parking(classifier) => {
                let parking = classifier.classify(
                    frame,
                    state.layout.regions(),
                    settings.parking_threshold,
                    frame_index,
                )?;
                state.free_spaces = parking.free_count;
                state.spaces = parking.spaces.clone();
                report.frame = parking.frame;
                report.spaces = parking.spaces;
            }
            Analyzer::Motion(tracker) => match state.previous_frame.take() {
                Some(prev) if prev.dimensions() == frame.dimensions() => {
                    let motion = tracker.track(
                        prev,
                        &frame,
                        state.motion_pool.clone(),
                        state.vehicle_counter,
                        frame_index,
                    )?;
                    state.motion_pool = motion.pool;
                    state.vehicle_counter = motion.counter;
                    state.previous_frame = Some(frame);
                    report.frame = motion.frame;
                    report.crossed = motion.crossed;
                }
                previous => {
                    if let Some(prev) = previous {
                        warn!(
                            "frame size changed from {:?} to {:?}, restarting motion stream",
                            prev.dimensions(),
                            frame.dimensions()
                        );
                        state.motion_pool.clear();
                    }
                    let mut annotated = frame.clone();
                    let line = CountingLine::resolve(settings.line_height, settings.offset, frame.height());
                    overlay::draw_counting_line(&mut annotated, line.y, GREEN, 2);
                    state.previous_frame = Some(frame);
                    report.frame = annotated;
                    report.analyzed = false;
                }
            },
            Analyzer::Detector(tracker) => {
                let Some(detector) = detector.as_mut() else {
                    bail!("detector counting mode needs a vehicle detector");
                };
                match tracker.process(frame, &mut **detector, &state.detector_pool, state.vehicle_counter) {
                    DetectorOutcome::Tracked(tracked) => {
                        state.detector_pool = tracked.pool;
                        state.vehicle_counter = tracked.counter;
                        report.frame = tracked.frame;
                        report.crossed = tracked.crossed;
                    }
                    DetectorOutcome::DetectorFailed { frame, reason } => {
                        report.frame = frame;
                        report.detector_error = Some(reason);
                    }
                }
            }
        }

        report.stats = state.snapshot();
        Ok(report)
    }
}

/// One monitoring session over a single stream.
pub struct Session {
    id: Uuid,
    settings: AnalysisSettings,
    analyzer: Analyzer,
    state: TrackingState,
    detector: Option<Box<dyn VehicleDetector>>,
    debug: Option<DebugConfig>,
    frames_seen: u64,
}

impl Session {
    pub fn new(settings: AnalysisSettings, layout: RegionLayout, mode: AnalysisMode) -> Self {
        let analyzer = Analyzer::for_mode(mode, &settings, None);
        Self {
            id: Uuid::new_v4(),
            settings,
            analyzer,
            state: TrackingState::new(layout),
            detector: None,
            debug: None,
            frames_seen: 0,
        }
    }

    /// Write intermediate masks of every analysed frame under the debug directory
    pub fn with_debug(mut self, config: DebugConfig) -> Self {
        self.analyzer = Analyzer::for_mode(self.analyzer.mode(), &self.settings, Some(&config));
        self.debug = Some(config);
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn VehicleDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> AnalysisMode {
        self.analyzer.mode()
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Switch pipelines. In-flight centroid pools and the motion reference
    /// frame are discarded; the vehicle counter is kept.
    pub fn set_mode(&mut self, mode: AnalysisMode) {
        if mode == self.analyzer.mode() {
            return;
        }
        self.analyzer = Analyzer::for_mode(mode, &self.settings, self.debug.as_ref());
        self.state.clear_tracking();
        info!("Changed detection mode to {}", mode);
    }

    /// Replace the region layout; occupancy is unknown until the next parking frame.
    pub fn set_layout(&mut self, layout: RegionLayout) {
        self.state.layout = layout;
        self.state.free_spaces = 0;
        self.state.spaces.clear();
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.state.layout
    }

    /// Analyse (or skip) one frame. Skipped frames come back untouched.
    pub fn process_frame(&mut self, frame: RgbImage) -> Result<FrameReport> {
        let frame_index = self.frames_seen;
        self.frames_seen += 1;

        let skip = u64::from(self.settings.frame_skip.max(1));
        if frame_index % skip != 0 {
            debug!(frame = frame_index, "skipping frame");
            return Ok(FrameReport {
                frame,
                frame_index,
                mode: self.mode(),
                analyzed: false,
                spaces: Vec::new(),
                crossed: 0,
                detector_error: None,
                stats: self.state.snapshot(),
            });
        }

        self.analyzer.process(
            frame,
            frame_index,
            &mut self.state,
            &self.settings,
            &mut self.detector,
        )
    }

    /// Zero the vehicle counter and drop all tracking state (user restart)
    pub fn reset_counter(&mut self) {
        self.state.vehicle_counter = 0;
        self.state.clear_tracking();
        info!("Vehicle counter reset");
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.state.snapshot()
    }
}

/// A session behind one coarse lock, so a statistics reader on another task
/// never observes a half-applied frame.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn process_frame(&self, frame: RgbImage) -> Result<FrameReport> {
        self.lock().process_frame(frame)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
