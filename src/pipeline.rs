use anyhow::{bail, Context, Result};
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::detection::preprocessing;

/// Where per-step masks are written when debugging a pipeline
#[derive(Clone, Debug)]
pub struct DebugConfig {
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// Claim `output_dir` for debug masks, creating it if needed.
    /// An existing directory must be empty.
    pub fn prepare(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let mut entries = std::fs::read_dir(&output_dir)
                .with_context(|| format!("Failed to read debug directory {:?}", output_dir))?;
            if entries.next().is_some() {
                bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create debug directory {:?}", output_dir))?;
        }

        Ok(Self { output_dir })
    }

    fn frame_dir(&self, frame_index: u64) -> PathBuf {
        self.output_dir.join(format!("{:05}", frame_index))
    }
}

/// Per-run information handed to every step
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    /// Index of the frame being processed, for debug file naming
    pub frame_index: u64,
    pub debug: Option<DebugConfig>,
}

/// A single mask transformation. Steps take ownership of the mask and
/// hand back the transformed one.
pub trait PipelineStep: Send + Sync {
    fn process(&self, mask: GrayImage, context: &PipelineContext) -> Result<GrayImage>;

    /// Human-readable name for this step (used in logs and debug file names)
    fn name(&self) -> &str;
}

/// Composable mask pipeline: BT.601 grayscale conversion followed by the steps in order.
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            debug: None,
        }
    }

    /// Write every intermediate mask under `output_dir` (see [`DebugConfig::prepare`])
    pub fn with_debug(self, output_dir: PathBuf) -> Result<Self> {
        Ok(self.with_debug_config(DebugConfig::prepare(output_dir)?))
    }

    /// Attach an already prepared debug configuration (shared between pipelines)
    pub fn with_debug_config(mut self, config: DebugConfig) -> Self {
        self.debug = Some(config);
        self
    }

    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Convert the input to grayscale and run every step
    pub fn run(&self, input: &DynamicImage, frame_index: u64) -> Result<GrayImage> {
        self.run_partial(input, frame_index, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(
        &self,
        input: &DynamicImage,
        frame_index: u64,
        num_steps: usize,
    ) -> Result<GrayImage> {
        let context = PipelineContext {
            frame_index,
            debug: self.debug.clone(),
        };

        let mut mask = preprocessing::to_gray(&input.to_rgb8());
        self.save_debug_output(&context, 0, "grayscale", &mask)?;

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(frame = frame_index, step = step.name(), "running mask step");
            mask = step.process(mask, &context)?;
            self.save_debug_output(&context, step_idx + 1, step.name(), &mask)?;
        }

        Ok(mask)
    }

    fn save_debug_output(
        &self,
        context: &PipelineContext,
        step_idx: usize,
        step_name: &str,
        mask: &GrayImage,
    ) -> Result<()> {
        let Some(debug_config) = &context.debug else {
            return Ok(());
        };

        let frame_dir = debug_config.frame_dir(context.frame_index);
        std::fs::create_dir_all(&frame_dir)?;

        let filename = format!(
            "{:02}_{}.png",
            step_idx,
            step_name.to_lowercase().replace(' ', "_")
        );
        let output_path = frame_dir.join(&filename);
        mask.save(&output_path)
            .with_context(|| format!("Failed to save debug image {:?}", output_path))?;

        debug!("saved debug mask {}", output_path.display());
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
