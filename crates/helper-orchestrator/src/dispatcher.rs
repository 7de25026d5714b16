//! Routes front-end requests to the orchestrators.

use crate::{
    AssessmentOrchestrator, BitmapOrchestrator, ElevationController, OrchestratorResult,
};
use bridge_channel::{Channel, InboundMessage};
use envelope_protocol_types::{FormalAssessmentResponse, HelperRequest};
use tracing::{debug, error, info, warn};

/// Handles one inbound message at a time.
pub struct HelperDispatcher {
    assessment: AssessmentOrchestrator,
    bitmap: BitmapOrchestrator,
    elevation: ElevationController,
}

impl HelperDispatcher {
    pub fn new(
        assessment: AssessmentOrchestrator,
        bitmap: BitmapOrchestrator,
        elevation: ElevationController,
    ) -> Self {
        Self {
            assessment,
            bitmap,
            elevation,
        }
    }

    /// Publish the assessment and then the rating image, once, after the
    /// channel has opened.
    pub async fn startup(&self) -> OrchestratorResult<()> {
        self.publish_assessment().await
    }

    /// Handle one message. Unknown verbs are ignored.
    ///
    /// Requests other than `formalWinSatRequest` get an empty response once
    /// their pushes are queued.
    pub async fn dispatch(&self, message: InboundMessage) -> OrchestratorResult<()> {
        let InboundMessage {
            envelope,
            responder,
        } = message;

        let Some(request) = HelperRequest::from_envelope(&envelope) else {
            debug!(verb = ?envelope.verb(), "Ignoring envelope with unknown verb");
            return Ok(());
        };
        info!(verb = request.verb(), "Handling request");

        match request {
            HelperRequest::GetImage => {
                self.bitmap.render_and_publish().await?;
            }
            HelperRequest::Assessment => {
                self.publish_assessment().await?;
            }
            HelperRequest::FormalAssessment => {
                let exit_code = self.elevation.trigger_formal_assessment().await;
                let response = FormalAssessmentResponse { exit_code }.to_envelope();
                match responder {
                    Some(responder) => responder.respond(response)?,
                    None => warn!(exit_code, "Formal assessment was pushed, not requested; result dropped"),
                }
            }
        }
        Ok(())
    }

    /// Dispatch until the channel closes or a channel fault occurs.
    pub async fn run(&self, channel: &mut Channel) -> OrchestratorResult<()> {
        while let Some(message) = channel.recv().await {
            if let Err(e) = self.dispatch(message).await {
                if e.is_fatal() {
                    error!(error = %e, "Channel fault, stopping");
                    return Err(e);
                }
                warn!(error = %e, "Request failed");
            }
        }
        info!("Channel closed");
        Ok(())
    }

    async fn publish_assessment(&self) -> OrchestratorResult<()> {
        self.assessment.query_and_publish().await?;
        self.bitmap.render_and_publish().await?;
        Ok(())
    }
}
