//! Connected channel: reader and writer tasks, request correlation and
//! inbound delivery.

use crate::{ChannelError, ChannelResult};
use async_trait::async_trait;
use bridge_config_and_utils::{Config, Paths};
use envelope_protocol_types::{ConnectionStatus, Envelope, Frame};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts applied to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Bound on the `open` handshake.
    pub open_timeout: Duration,
    /// Bound on waiting for a response. `None` waits until the channel closes.
    pub request_timeout: Option<Duration>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            request_timeout: None,
        }
    }
}

impl From<&Config> for ChannelOptions {
    fn from(config: &Config) -> Self {
        Self {
            open_timeout: config.open_timeout(),
            request_timeout: None,
        }
    }
}

/// Anything that can push an envelope to the peer.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn notify(&self, envelope: Envelope) -> ChannelResult<()>;
}

struct Pending {
    id: String,
    tx: oneshot::Sender<Envelope>,
}

struct Shared {
    outbound: mpsc::UnboundedSender<Frame>,
    pending: Mutex<Option<Pending>>,
    closed_tx: watch::Sender<bool>,
    request_timeout: Option<Duration>,
}

impl Shared {
    /// Mark the channel closed. Only the first call has any effect.
    fn close(&self, reason: &'static str) {
        let fired = self.closed_tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });
        if fired {
            info!(reason, "Channel closed");
            // Fails any waiting request with ConnectionClosed.
            self.pending.lock().take();
        }
    }
}

/// Wait until the closed flag is set.
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Clears the pending slot when a request finishes or is abandoned.
struct PendingSlot<'a> {
    shared: &'a Shared,
    id: &'a str,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let mut pending = self.shared.pending.lock();
        if pending.as_ref().is_some_and(|p| p.id == self.id) {
            pending.take();
        }
    }
}

/// Cloneable handle for sending on a channel and observing its closure.
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
    closed_rx: watch::Receiver<bool>,
}

impl ChannelHandle {
    /// Push an envelope without expecting a response.
    ///
    /// Completes once the frame is queued for the writer.
    pub async fn notify(&self, envelope: Envelope) -> ChannelResult<()> {
        debug!(verb = ?envelope.verb(), "Sending notification");
        self.send_frame(Frame::notify(envelope))
    }

    /// Send an envelope and wait for the correlated response.
    ///
    /// Only one request may be outstanding per side.
    pub async fn request(&self, envelope: Envelope) -> ChannelResult<Envelope> {
        if self.is_closed() {
            return Err(ChannelError::ConnectionClosed);
        }

        let verb = envelope.verb().map(str::to_string);
        let frame = Frame::request(envelope);
        let id = frame.id().unwrap_or_default().to_string();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock();
            if pending.is_some() {
                return Err(ChannelError::RequestInFlight);
            }
            *pending = Some(Pending { id: id.clone(), tx });
        }
        let _slot = PendingSlot {
            shared: &self.shared,
            id: &id,
        };

        // close() sets the flag before draining the slot.
        if self.is_closed() {
            return Err(ChannelError::ConnectionClosed);
        }

        self.send_frame(frame)?;
        debug!(request_id = %id, verb = ?verb, "Request sent");

        let response = match self.shared.request_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| ChannelError::RequestTimeout(limit))?,
            None => rx.await,
        };
        response.map_err(|_| ChannelError::ConnectionClosed)
    }

    /// Resolves once the channel has closed, from either side.
    pub async fn closed(&self) {
        let mut rx = self.closed_rx.clone();
        wait_closed(&mut rx).await;
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Close the channel locally. Frames already queued are still written.
    pub fn close(&self) {
        self.shared.close("closed locally");
    }

    fn send_frame(&self, frame: Frame) -> ChannelResult<()> {
        if self.is_closed() {
            return Err(ChannelError::ConnectionClosed);
        }
        self.shared
            .outbound
            .send(frame)
            .map_err(|_| ChannelError::ConnectionClosed)
    }
}

#[async_trait]
impl EnvelopeSink for ChannelHandle {
    async fn notify(&self, envelope: Envelope) -> ChannelResult<()> {
        ChannelHandle::notify(self, envelope).await
    }
}

/// Answers one inbound request.
///
/// Dropping it without calling [`Responder::respond`] sends an empty
/// response so the peer never waits on an unhandled request.
pub struct Responder {
    id: String,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
}

impl Responder {
    fn new(id: String, outbound: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            id,
            outbound: Some(outbound),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue the response. Never waits on the writer.
    pub fn respond(mut self, envelope: Envelope) -> ChannelResult<()> {
        let outbound = self
            .outbound
            .take()
            .ok_or(ChannelError::ConnectionClosed)?;
        outbound
            .send(Frame::response(&self.id, envelope))
            .map_err(|_| ChannelError::ConnectionClosed)
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            debug!(request_id = %self.id, "Request left unanswered, sending empty response");
            let _ = outbound.send(Frame::response(&self.id, Envelope::new()));
        }
    }
}

/// One envelope received from the peer.
pub struct InboundMessage {
    pub envelope: Envelope,
    /// Present when the peer sent a request rather than a notification.
    pub responder: Option<Responder>,
}

impl InboundMessage {
    pub fn is_request(&self) -> bool {
        self.responder.is_some()
    }
}

/// An open channel: a send handle plus the ordered inbound stream.
pub struct Channel {
    handle: ChannelHandle,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

impl Channel {
    /// Connect to the named service and complete the `open` handshake.
    ///
    /// Bounded by `options.open_timeout`. Not retried.
    pub async fn open(
        paths: &Paths,
        service_name: &str,
        peer_identity: &str,
        options: &ChannelOptions,
    ) -> ChannelResult<Self> {
        let socket_path = paths.socket_file(service_name);
        let limit = options.open_timeout;

        let handshake = async {
            let stream = UnixStream::connect(&socket_path).await.map_err(|e| {
                debug!(error = %e, path = %socket_path.display(), "Connect failed");
                ChannelError::OpenFailed(status_for_connect_error(&e))
            })?;
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);

            write_frame(
                &mut writer,
                &Frame::Open {
                    service_name: service_name.to_string(),
                    peer_identity: peer_identity.to_string(),
                },
            )
            .await?;

            match read_frame(&mut reader).await? {
                Some(Frame::Opened { status }) if status.is_success() => {
                    Ok(Channel::spawn(reader, writer, options))
                }
                Some(Frame::Opened { status }) => Err(ChannelError::OpenFailed(status)),
                Some(other) => Err(ChannelError::Handshake(format!(
                    "expected opened, got {}",
                    other.kind()
                ))),
                None => Err(ChannelError::OpenFailed(ConnectionStatus::AppUnavailable)),
            }
        };

        let channel = tokio::time::timeout(limit, handshake)
            .await
            .map_err(|_| ChannelError::OpenTimeout(limit))??;

        info!(service = service_name, "Channel opened");
        Ok(channel)
    }

    /// Run a channel over an already-connected stream, skipping the handshake.
    pub fn from_stream<S>(stream: S, options: &ChannelOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::spawn(BufReader::new(reader), writer, options)
    }

    pub(crate) fn spawn<R, W>(reader: R, writer: W, options: &ChannelOptions) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            outbound: outbound_tx,
            pending: Mutex::new(None),
            closed_tx,
            request_timeout: options.request_timeout,
        });

        tokio::spawn(write_loop(
            writer,
            outbound_rx,
            shared.clone(),
            closed_rx.clone(),
        ));
        tokio::spawn(read_loop(reader, inbound_tx, shared.clone(), closed_rx.clone()));

        Self {
            handle: ChannelHandle { shared, closed_rx },
            inbound: inbound_rx,
        }
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    /// Next inbound message in receive order. `None` once the channel has closed.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbound.recv().await
    }
}

fn status_for_connect_error(error: &std::io::Error) -> ConnectionStatus {
    match error.kind() {
        std::io::ErrorKind::NotFound => ConnectionStatus::AppNotInstalled,
        std::io::ErrorKind::ConnectionRefused => ConnectionStatus::AppUnavailable,
        std::io::ErrorKind::PermissionDenied => ConnectionStatus::NotAuthorized,
        _ => ConnectionStatus::Unknown,
    }
}

/// Read the next non-empty line as a frame. `None` on end of stream.
pub(crate) async fn read_frame<R>(reader: &mut R) -> ChannelResult<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(Frame::from_json(trimmed)?));
        }
    }
}

pub(crate) async fn write_frame<W>(writer: &mut W, frame: &Frame) -> ChannelResult<()>
where
    W: AsyncWrite + Unpin,
{
    let json = frame.to_json()?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    shared: Arc<Shared>,
    mut closed_rx: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = wait_closed(&mut closed_rx) => {
                // Best effort for frames queued before the close.
                while let Ok(frame) = outbound.try_recv() {
                    if write_frame(&mut writer, &frame).await.is_err() {
                        break;
                    }
                }
                break;
            }
        };

        if let Err(e) = write_frame(&mut writer, &frame).await {
            error!(error = %e, kind = frame.kind(), "Failed to write frame");
            shared.close("write failed");
            break;
        }
    }

    let _ = writer.shutdown().await;
}

async fn read_loop<R>(
    mut reader: R,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    shared: Arc<Shared>,
    mut closed_rx: watch::Receiver<bool>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    let reason = loop {
        line.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut line) => read,
            _ = wait_closed(&mut closed_rx) => break "closed locally",
        };

        match read {
            Ok(0) => break "peer disconnected",
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Read error");
                break "read failed";
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match Frame::from_json(trimmed) {
            Ok(frame) => route_frame(frame, &inbound, &shared),
            Err(e) => warn!(error = %e, "Failed to parse frame"),
        }
    };

    shared.close(reason);
}

fn route_frame(frame: Frame, inbound: &mpsc::UnboundedSender<InboundMessage>, shared: &Shared) {
    match frame {
        Frame::Request { id, message } => {
            debug!(request_id = %id, verb = ?message.verb(), "Received request");
            let message = InboundMessage {
                envelope: message,
                responder: Some(Responder::new(id, shared.outbound.clone())),
            };
            // A dropped receiver drops the responder, which answers empty.
            let _ = inbound.send(message);
        }
        Frame::Notify { message } => {
            debug!(verb = ?message.verb(), "Received notification");
            let _ = inbound.send(InboundMessage {
                envelope: message,
                responder: None,
            });
        }
        Frame::Response { id, message } => {
            let pending = {
                let mut slot = shared.pending.lock();
                match slot.as_ref() {
                    Some(p) if p.id == id => slot.take(),
                    _ => None,
                }
            };
            match pending {
                Some(pending) => {
                    let _ = pending.tx.send(message);
                }
                None => warn!(request_id = %id, "Response without a matching request"),
            }
        }
        other => warn!(kind = other.kind(), "Unexpected frame after handshake"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(options: &ChannelOptions) -> (Channel, Channel) {
        let (a, b) = UnixStream::pair().unwrap();
        (
            Channel::from_stream(a, options),
            Channel::from_stream(b, options),
        )
    }

    async fn recv_within(channel: &mut Channel) -> Option<InboundMessage> {
        tokio::time::timeout(Duration::from_secs(2), channel.recv())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_notifications_arrive_in_order() {
        let (a, mut b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        for verb in ["first", "second", "third"] {
            handle.notify(Envelope::with_verb(verb)).await.unwrap();
        }

        for expected in ["first", "second", "third"] {
            let message = recv_within(&mut b).await.unwrap();
            assert_eq!(message.envelope.verb(), Some(expected));
            assert!(!message.is_request());
        }
    }

    #[tokio::test]
    async fn test_request_gets_correlated_response() {
        let (a, mut b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        let requester =
            tokio::spawn(async move { handle.request(Envelope::with_verb("formalWinSatRequest")).await });

        let message = recv_within(&mut b).await.unwrap();
        assert_eq!(message.envelope.verb(), Some("formalWinSatRequest"));
        message
            .responder
            .unwrap()
            .respond(Envelope::new().with("exitcode", 0))
            .unwrap();

        let response = requester.await.unwrap().unwrap();
        assert_eq!(response.get_i32("exitcode"), Some(0));
        assert_eq!(response.verb(), None);
    }

    #[tokio::test]
    async fn test_dropped_responder_sends_empty_response() {
        let (a, mut b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        let requester =
            tokio::spawn(async move { handle.request(Envelope::with_verb("unknownVerb123")).await });

        let message = recv_within(&mut b).await.unwrap();
        drop(message);

        let response = requester.await.unwrap().unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_while_in_flight_is_rejected() {
        let (a, mut b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        let first = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.request(Envelope::with_verb("assessmentRequest")).await })
        };
        let message = recv_within(&mut b).await.unwrap();

        let second = handle.request(Envelope::with_verb("getimageRequest")).await;
        assert!(matches!(second, Err(ChannelError::RequestInFlight)));

        message.responder.unwrap().respond(Envelope::new()).unwrap();
        first.await.unwrap().unwrap();

        // The slot is free again once the first request completes.
        let third = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.request(Envelope::with_verb("getimageRequest")).await })
        };
        let message = recv_within(&mut b).await.unwrap();
        drop(message);
        assert!(third.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_request_timeout_frees_the_slot() {
        let options = ChannelOptions {
            request_timeout: Some(Duration::from_millis(50)),
            ..ChannelOptions::default()
        };
        let (a, mut b) = pair(&options);
        let handle = a.handle();

        let result = handle.request(Envelope::with_verb("assessmentRequest")).await;
        assert!(matches!(result, Err(ChannelError::RequestTimeout(_))));

        // Keep the first responder alive so no answer arrives.
        let _held = recv_within(&mut b).await.unwrap();

        let result = handle.request(Envelope::with_verb("assessmentRequest")).await;
        assert!(matches!(result, Err(ChannelError::RequestTimeout(_))));
    }

    #[tokio::test]
    async fn test_peer_close_fires_closed_and_ends_inbound() {
        let (mut a, b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        b.handle().close();

        tokio::time::timeout(Duration::from_secs(2), handle.closed())
            .await
            .unwrap();
        assert!(handle.is_closed());
        assert!(recv_within(&mut a).await.is_none());
        assert!(matches!(
            handle.notify(Envelope::with_verb("getimageResults")).await,
            Err(ChannelError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_pending_request_fails_when_peer_closes() {
        let (a, mut b) = pair(&ChannelOptions::default());
        let handle = a.handle();

        let requester =
            tokio::spawn(async move { handle.request(Envelope::with_verb("formalWinSatRequest")).await });

        // Hold the responder so the peer closes without answering.
        let _held = recv_within(&mut b).await.unwrap();
        b.handle().close();

        let result = tokio::time::timeout(Duration::from_secs(2), requester)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ChannelError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_closed_resolves_for_every_waiter() {
        let (a, _b) = pair(&ChannelOptions::default());
        let first = a.handle();
        let second = a.handle();

        a.handle().close();
        a.handle().close();

        tokio::time::timeout(Duration::from_secs(1), async {
            first.closed().await;
            second.closed().await;
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let (raw, other) = UnixStream::pair().unwrap();
        let mut channel = Channel::from_stream(other, &ChannelOptions::default());
        let (_, mut writer) = raw.into_split();

        writer.write_all(b"not a frame\n\n").await.unwrap();
        let frame = Frame::notify(Envelope::with_verb("getimageResults"));
        write_frame(&mut writer, &frame).await.unwrap();

        let message = recv_within(&mut channel).await.unwrap();
        assert_eq!(message.envelope.verb(), Some("getimageResults"));
    }
}
