//! Native bitmap handles and the pixel data copied out of them.

use crate::{EngineError, EngineResult};
use std::sync::Arc;
use tracing::trace;

/// Opaque id of a native bitmap owned by a [`BitmapStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapHandle(pub u64);

/// Owner of native bitmaps.
pub trait BitmapStore: Send + Sync {
    /// Copy the pixels behind `handle`.
    fn pixels(&self, handle: BitmapHandle) -> EngineResult<RasterImage>;

    /// Free the native resource. Called once per handle.
    fn release(&self, handle: BitmapHandle);
}

/// 8-bit RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> EngineResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| EngineError::Render(format!("image too large: {width}x{height}")))?;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(EngineError::Render(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Scoped ownership of a native bitmap. Released when dropped.
pub struct NativeBitmap {
    handle: BitmapHandle,
    store: Arc<dyn BitmapStore>,
}

impl NativeBitmap {
    pub fn new(handle: BitmapHandle, store: Arc<dyn BitmapStore>) -> Self {
        Self { handle, store }
    }

    pub fn handle(&self) -> BitmapHandle {
        self.handle
    }

    /// Copy the pixels out so the handle can be released before encoding.
    pub fn copy_pixels(&self) -> EngineResult<RasterImage> {
        self.store.pixels(self.handle)
    }
}

impl Drop for NativeBitmap {
    fn drop(&mut self) {
        trace!(handle = self.handle.0, "Releasing native bitmap");
        self.store.release(self.handle);
    }
}

impl std::fmt::Debug for NativeBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBitmap")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingStore {
        released: Mutex<Vec<BitmapHandle>>,
    }

    impl BitmapStore for CountingStore {
        fn pixels(&self, _handle: BitmapHandle) -> EngineResult<RasterImage> {
            RasterImage::new(1, 1, vec![0, 0, 0, 255])
        }

        fn release(&self, handle: BitmapHandle) {
            self.released.lock().push(handle);
        }
    }

    #[test]
    fn test_drop_releases_handle_once() {
        let store = Arc::new(CountingStore::default());
        {
            let bitmap = NativeBitmap::new(BitmapHandle(7), store.clone());
            let raster = bitmap.copy_pixels().unwrap();
            assert_eq!(raster.width(), 1);
        }
        assert_eq!(*store.released.lock(), vec![BitmapHandle(7)]);
    }

    #[test]
    fn test_raster_size_is_checked() {
        assert!(RasterImage::new(2, 2, vec![0; 16]).is_ok());
        assert!(RasterImage::new(2, 2, vec![0; 15]).is_err());
        assert!(RasterImage::new(0, 0, Vec::new()).is_err());
    }
}
