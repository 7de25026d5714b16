//! File-backed assessment engine.
//!
//! The stored assessment lives in a JSON snapshot. Rating badges are drawn
//! in memory and handed out through a handle table, so callers release them
//! the same way they would release a platform bitmap.

use crate::{
    AssessmentEngine, BitmapHandle, BitmapStore, EngineError, EngineResult,
    FormalAssessmentEngine, FormalAssessmentEvents, NativeBitmap, RasterImage, VisualsEngine,
    E_FAIL,
};
use chrono::NaiveDate;
use envelope_protocol_types::{AssessmentKind, AssessmentRecord, AssessmentState, BitmapSize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_RATING: f32 = 9.9;

/// One category in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub kind: AssessmentKind,
    pub score: f32,
    pub title: String,
    pub description: String,
}

/// Contents of `assessment.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    pub state: AssessmentState,
    #[serde(default)]
    pub system_rating: f32,
    #[serde(default)]
    pub rating_state_description: String,
    #[serde(default)]
    pub assessment_date: Option<NaiveDate>,
    #[serde(default)]
    pub assessments: Vec<SnapshotRecord>,
}

impl AssessmentSnapshot {
    pub fn record(&self, kind: AssessmentKind) -> Option<&SnapshotRecord> {
        self.assessments.iter().find(|r| r.kind == kind)
    }

    /// Lowest subscore, which is what the overall rating reports.
    pub fn lowest_score(&self) -> Option<f32> {
        self.assessments
            .iter()
            .map(|r| r.score)
            .fold(None, |low: Option<f32>, s| Some(low.map_or(s, |l| l.min(s))))
    }
}

#[derive(Default)]
struct HandleTable {
    next: AtomicU64,
    live: Mutex<HashMap<BitmapHandle, RasterImage>>,
}

impl HandleTable {
    fn insert(&self, raster: RasterImage) -> BitmapHandle {
        let handle = BitmapHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.live.lock().insert(handle, raster);
        handle
    }
}

impl BitmapStore for HandleTable {
    fn pixels(&self, handle: BitmapHandle) -> EngineResult<RasterImage> {
        self.live
            .lock()
            .get(&handle)
            .cloned()
            .ok_or_else(|| EngineError::Render(format!("unknown bitmap handle {}", handle.0)))
    }

    fn release(&self, handle: BitmapHandle) {
        if self.live.lock().remove(&handle).is_none() {
            warn!(handle = handle.0, "Released unknown bitmap handle");
        }
    }
}

/// Engine backed by a snapshot file.
pub struct SnapshotEngine {
    path: PathBuf,
    handles: Arc<HandleTable>,
    update_interval: Duration,
}

impl SnapshotEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handles: Arc::new(HandleTable::default()),
            update_interval: Duration::from_millis(250),
        }
    }

    /// Pause between progress updates of a formal assessment.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. `None` when no assessment has been stored yet.
    pub fn load(&self) -> EngineResult<Option<AssessmentSnapshot>> {
        read_snapshot(&self.path)
    }

    pub fn store(&self, snapshot: &AssessmentSnapshot) -> EngineResult<()> {
        write_snapshot(&self.path, snapshot)
    }

    /// Number of bitmaps handed out and not yet released.
    pub fn live_bitmaps(&self) -> usize {
        self.handles.live.lock().len()
    }

    fn require_results(&self) -> EngineResult<AssessmentSnapshot> {
        match self.load()? {
            Some(snapshot) if snapshot.state.has_results() => Ok(snapshot),
            Some(snapshot) => Err(EngineError::Query(format!(
                "no results in state {}",
                snapshot.state.wire_name()
            ))),
            None => Err(EngineError::Query("no assessment stored".to_string())),
        }
    }
}

impl AssessmentEngine for SnapshotEngine {
    fn assessment_state(&self) -> EngineResult<AssessmentState> {
        Ok(self
            .load()?
            .map(|s| s.state)
            .unwrap_or(AssessmentState::NotAvailable))
    }

    fn assessment_info(&self, kind: AssessmentKind) -> EngineResult<AssessmentRecord> {
        let snapshot = self.require_results()?;
        snapshot
            .record(kind)
            .map(|r| AssessmentRecord::new(r.score, r.title.clone(), r.description.clone()))
            .ok_or_else(|| EngineError::Query(format!("no {:?} record", kind)))
    }

    fn system_rating(&self) -> EngineResult<f32> {
        Ok(self.require_results()?.system_rating)
    }

    fn rating_state_description(&self) -> EngineResult<String> {
        Ok(self.require_results()?.rating_state_description)
    }

    fn assessment_date(&self) -> EngineResult<NaiveDate> {
        self.require_results()?
            .assessment_date
            .ok_or_else(|| EngineError::Query("assessment date missing".to_string()))
    }
}

impl VisualsEngine for SnapshotEngine {
    /// No badge is drawn for an unknown state.
    fn bitmap(
        &self,
        size: BitmapSize,
        state: AssessmentState,
        rating: f32,
    ) -> EngineResult<Option<NativeBitmap>> {
        if state == AssessmentState::Unknown {
            return Ok(None);
        }
        let raster = render_badge(size, state, rating)?;
        let handle = self.handles.insert(raster);
        debug!(handle = handle.0, ?size, rating, "Rendered rating badge");

        let store: Arc<dyn BitmapStore> = self.handles.clone();
        Ok(Some(NativeBitmap::new(handle, store)))
    }
}

impl FormalAssessmentEngine for SnapshotEngine {
    /// Re-runs the stored categories and stamps the snapshot with today's date.
    fn initiate(&self, events: Arc<dyn FormalAssessmentEvents>) -> EngineResult<()> {
        let baseline = self
            .load()?
            .filter(|s| !s.assessments.is_empty())
            .ok_or_else(|| {
                EngineError::Initiation(format!("no baseline assessment at {}", self.path.display()))
            })?;

        let path = self.path.clone();
        let interval = self.update_interval;

        std::thread::Builder::new()
            .name("formal-assessment".to_string())
            .spawn(move || run_assessment(&path, baseline, interval, events.as_ref()))
            .map_err(|e| EngineError::Initiation(e.to_string()))?;

        info!(path = %self.path.display(), "Formal assessment started");
        Ok(())
    }
}

fn run_assessment(
    path: &Path,
    baseline: AssessmentSnapshot,
    interval: Duration,
    events: &dyn FormalAssessmentEvents,
) {
    let total = baseline.assessments.len() as u32;
    for (tick, record) in baseline.assessments.iter().enumerate() {
        events.on_update(tick as u32, total, &record.title);
        std::thread::sleep(interval);
    }
    events.on_update(total, total, "Finishing");

    let refreshed = AssessmentSnapshot {
        state: AssessmentState::Valid,
        system_rating: baseline.lowest_score().unwrap_or_default(),
        assessment_date: Some(chrono::Local::now().date_naive()),
        ..baseline
    };

    match write_snapshot(path, &refreshed) {
        Ok(()) => events.on_complete(0, "The assessment completed successfully"),
        Err(e) => events.on_complete(E_FAIL, &e.to_string()),
    }
}

fn read_snapshot(path: &Path) -> EngineResult<Option<AssessmentSnapshot>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::Unavailable(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| EngineError::Unavailable(format!("malformed {}: {}", path.display(), e)))
}

fn write_snapshot(path: &Path, snapshot: &AssessmentSnapshot) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Square badge: state colour fills from the bottom in proportion to the rating.
fn render_badge(size: BitmapSize, state: AssessmentState, rating: f32) -> EngineResult<RasterImage> {
    let side: u32 = match size {
        BitmapSize::Normal => 64,
        BitmapSize::Small => 32,
    };
    let fill = match state {
        AssessmentState::Valid => [0x1f, 0x6f, 0xd1, 0xff],
        AssessmentState::IncoherentWithHardware => [0xd1, 0x8b, 0x1f, 0xff],
        _ => [0x80, 0x80, 0x80, 0xff],
    };
    let filled = ((rating.clamp(0.0, MAX_RATING) / MAX_RATING) * side as f32).round() as u32;

    let mut rgba = Vec::with_capacity((side * side * 4) as usize);
    for y in 0..side {
        for x in 0..side {
            let border = x == 0 || y == 0 || x == side - 1 || y == side - 1;
            let pixel = if border {
                [0x20, 0x20, 0x20, 0xff]
            } else if y >= side - filled {
                fill
            } else {
                [0xf0, 0xf0, 0xf0, 0xff]
            };
            rgba.extend_from_slice(&pixel);
        }
    }
    RasterImage::new(side, side, rgba)
}
