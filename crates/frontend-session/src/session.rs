//! Front-end session: routes helper pushes into the view and sends requests.

use crate::{SessionResult, SessionView};
use bridge_channel::{Channel, ChannelHandle, InboundMessage};
use envelope_protocol_types::{FormalAssessmentResponse, FrontendMessage, HelperRequest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

/// What a decoded push changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    Assessment,
    Image,
}

/// Result of asking for a formal assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormalRequestOutcome {
    /// Exit code 0; a fresh assessment was requested.
    Refreshed,
    /// The elevated run reported this non-zero exit code.
    NotCompleted { exit_code: i32 },
    /// One formal assessment has already been made this session.
    AlreadyMade,
}

pub struct FrontendSession {
    handle: ChannelHandle,
    view: Mutex<SessionView>,
    formal_made: AtomicBool,
    formal_gate: AsyncMutex<()>,
    revision: watch::Sender<u64>,
}

impl FrontendSession {
    pub fn new(handle: ChannelHandle) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            handle,
            view: Mutex::new(SessionView::new()),
            formal_made: AtomicBool::new(false),
            formal_gate: AsyncMutex::new(()),
            revision,
        }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> SessionView {
        self.view.lock().clone()
    }

    /// Bumped after every applied push.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Apply one message from the helper. Unknown verbs are ignored.
    pub fn handle_message(&self, message: InboundMessage) -> SessionResult<Option<ViewUpdate>> {
        let InboundMessage { envelope, .. } = message;

        let Some(decoded) = FrontendMessage::from_envelope(&envelope)? else {
            debug!(verb = ?envelope.verb(), "Ignoring envelope with unknown verb");
            return Ok(None);
        };

        let update = {
            let mut view = self.view.lock();
            match decoded {
                FrontendMessage::AssessmentResults(results) => {
                    info!(
                        state = results.engine_state.wire_name(),
                        valid = results.is_valid(),
                        "Assessment results received"
                    );
                    view.apply_results(results);
                    ViewUpdate::Assessment
                }
                FrontendMessage::ImageResults(image) => {
                    info!(bytes = image.image_bytes.len(), "Rating image received");
                    view.apply_image(image);
                    ViewUpdate::Image
                }
            }
        };

        self.revision.send_modify(|revision| *revision += 1);
        Ok(Some(update))
    }

    /// Apply pushes until the channel closes. Undecodable pushes are logged and skipped.
    pub async fn run<F>(&self, channel: &mut Channel, mut on_update: F)
    where
        F: FnMut(ViewUpdate, &SessionView),
    {
        while let Some(message) = channel.recv().await {
            match self.handle_message(message) {
                Ok(Some(update)) => on_update(update, &self.view()),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Dropping undecodable message"),
            }
        }
        info!("Channel closed");
    }

    /// Ask the helper for a fresh assessment. Results arrive as pushes.
    pub async fn request_assessment(&self) -> SessionResult<()> {
        self.handle
            .request(HelperRequest::Assessment.to_envelope())
            .await?;
        Ok(())
    }

    /// Ask the helper for the rating image.
    pub async fn request_image(&self) -> SessionResult<()> {
        self.handle
            .request(HelperRequest::GetImage.to_envelope())
            .await?;
        Ok(())
    }

    /// Run the formal assessment through the helper, at most once per session.
    ///
    /// Only a successful run counts towards the limit. On exit code 0 a
    /// follow-up `assessmentRequest` is sent so the view refreshes.
    /// Concurrent calls run one after another.
    pub async fn request_formal_assessment(&self) -> SessionResult<FormalRequestOutcome> {
        let _gate = self.formal_gate.lock().await;
        if self.formal_made.load(Ordering::SeqCst) {
            info!("Formal assessment already made this session");
            return Ok(FormalRequestOutcome::AlreadyMade);
        }

        let response = self
            .handle
            .request(HelperRequest::FormalAssessment.to_envelope())
            .await?;
        let FormalAssessmentResponse { exit_code } =
            FormalAssessmentResponse::from_envelope(&response)?;

        if exit_code != 0 {
            warn!(exit_code, "Formal assessment did not complete");
            return Ok(FormalRequestOutcome::NotCompleted { exit_code });
        }

        self.formal_made.store(true, Ordering::SeqCst);
        self.request_assessment().await?;
        Ok(FormalRequestOutcome::Refreshed)
    }

    pub fn formal_assessment_made(&self) -> bool {
        self.formal_made.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.handle.close();
    }
}
