pub mod config;
pub mod core;
pub mod detection;
pub mod frames;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod recorder;
pub mod session;

pub use config::AnalysisSettings;
pub use frames::{FrameSource, ImageSequence};
pub use layout::RegionLayout;
pub use models::{Centroid, Contour, CountingLine, Detection, OccupancyResult, Region, StatsSnapshot};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineStep};
pub use recorder::StatsRecorder;
pub use session::{AnalysisMode, FrameReport, SharedSession, Session};
