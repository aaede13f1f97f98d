use crate::detection::preprocessing;
use crate::pipeline::{PipelineContext, PipelineStep};
use anyhow::Result;
use image::GrayImage;

/// Apply Gaussian blur
pub struct BlurStep {
    pub sigma: f32,
}

impl PipelineStep for BlurStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::apply_blur(&mask, self.sigma))
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Inverted adaptive Gaussian threshold (texture becomes foreground)
pub struct AdaptiveThresholdStep {
    pub block_size: u32,
    pub c: i32,
}

impl PipelineStep for AdaptiveThresholdStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::adaptive_threshold_inv(&mask, self.block_size, self.c))
    }

    fn name(&self) -> &str {
        "Adaptive Threshold"
    }
}

/// Fixed binary threshold
pub struct ThresholdStep {
    pub threshold: u8,
}

impl PipelineStep for ThresholdStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::binary_threshold(&mask, self.threshold))
    }

    fn name(&self) -> &str {
        "Binary Threshold"
    }
}

/// Remove salt-and-pepper speckle
pub struct MedianStep {
    pub radius: u32,
}

impl PipelineStep for MedianStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::apply_median(&mask, self.radius))
    }

    fn name(&self) -> &str {
        "Median"
    }
}

/// Square dilation
pub struct DilateStep {
    pub radius: u8,
}

impl PipelineStep for DilateStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::apply_dilate(&mask, self.radius))
    }

    fn name(&self) -> &str {
        "Dilate"
    }
}

/// Closing with the 2×2 ellipse
pub struct EllipseCloseStep;

impl PipelineStep for EllipseCloseStep {
    fn process(&self, mask: GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::close_ellipse_2x2(&mask))
    }

    fn name(&self) -> &str {
        "Ellipse Close"
    }
}
