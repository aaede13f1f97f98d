use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Anything that yields colour frames one after another
pub trait FrameSource {
    /// Next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// A directory of still frames (`.png`, `.jpg`, `.jpeg`) played in filename order
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    position: usize,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {:?}", dir))?
        {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_frame {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(Self { paths, position: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        let img = image::open(path)
            .with_context(|| format!("Failed to decode frame {:?}", path))?;
        Ok(Some(img.to_rgb8()))
    }
}
