//! Bitmap orchestrator: render the rating badge, publish it as PNG.

use crate::{LastAssessment, OrchestratorError, OrchestratorResult};
use assessment_engine::{RasterImage, VisualsEngine};
use bridge_channel::EnvelopeSink;
use envelope_protocol_types::{BitmapSize, ImageResults};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns copied pixels into PNG bytes.
pub trait PngEncoder: Send + Sync {
    fn encode(&self, raster: &RasterImage) -> OrchestratorResult<Vec<u8>>;
}

/// 8-bit RGBA encoder built on the `png` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RgbaPngEncoder;

impl PngEncoder for RgbaPngEncoder {
    fn encode(&self, raster: &RasterImage) -> OrchestratorResult<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, raster.width(), raster.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().map_err(encode_error)?;
            writer.write_image_data(raster.rgba()).map_err(encode_error)?;
            writer.finish().map_err(encode_error)?;
        }
        Ok(bytes)
    }
}

fn encode_error(error: png::EncodingError) -> OrchestratorError {
    OrchestratorError::Encode(error.to_string())
}

pub struct BitmapOrchestrator {
    visuals: Arc<dyn VisualsEngine>,
    visuals_lock: Mutex<()>,
    encoder: Box<dyn PngEncoder>,
    sink: Arc<dyn EnvelopeSink>,
    last: Arc<LastAssessment>,
}

impl BitmapOrchestrator {
    pub fn new(
        visuals: Arc<dyn VisualsEngine>,
        sink: Arc<dyn EnvelopeSink>,
        last: Arc<LastAssessment>,
    ) -> Self {
        Self {
            visuals,
            visuals_lock: Mutex::new(()),
            encoder: Box::new(RgbaPngEncoder),
            sink,
            last,
        }
    }

    pub fn with_encoder(mut self, encoder: impl PngEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Render the normal-size badge for the last queried state and rating.
    ///
    /// Expects a prior assessment query; without one the badge is requested
    /// for `(Unknown, 0.0)`. The native bitmap is released before encoding
    /// starts, on success and failure alike.
    pub fn render_png(&self) -> OrchestratorResult<Option<Vec<u8>>> {
        let (state, rating) = self.last.get();

        let raster = {
            let _visuals = self.visuals_lock.lock();
            let Some(bitmap) = self.visuals.bitmap(BitmapSize::Normal, state, rating)? else {
                debug!(state = state.wire_name(), rating, "Engine returned no bitmap");
                return Ok(None);
            };
            bitmap.copy_pixels()?
        };

        self.encoder.encode(&raster).map(Some)
    }

    /// Render and push `getimageResults`. Returns false when there was no image.
    pub async fn render_and_publish(&self) -> OrchestratorResult<bool> {
        let Some(image_bytes) = self.render_png()? else {
            return Ok(false);
        };
        let size = image_bytes.len();

        self.sink
            .notify(ImageResults { image_bytes }.to_envelope())
            .await?;

        info!(bytes = size, "Published rating image");
        Ok(true)
    }
}
