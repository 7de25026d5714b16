//! Boundary to the assessment engine.
//!
//! The engine answers three kinds of questions: the stored assessment
//! (`AssessmentEngine`), the rating badge (`VisualsEngine`) and a new formal
//! assessment (`FormalAssessmentEngine`). `SnapshotEngine` implements all
//! three on top of a JSON snapshot file.

mod bitmap;
mod engine;
mod error;
mod snapshot;

pub use bitmap::{BitmapHandle, BitmapStore, NativeBitmap, RasterImage};
pub use engine::{AssessmentEngine, FormalAssessmentEngine, FormalAssessmentEvents, VisualsEngine};
pub use error::{EngineError, EngineResult, E_FAIL};
pub use snapshot::{AssessmentSnapshot, SnapshotEngine, SnapshotRecord};
