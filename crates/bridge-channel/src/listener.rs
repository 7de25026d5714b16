//! Listening side of a named service.

use crate::channel::{read_frame, write_frame};
use crate::{Channel, ChannelError, ChannelOptions, ChannelResult};
use bridge_config_and_utils::Paths;
use envelope_protocol_types::{ConnectionStatus, Frame};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Hosts a named service on a Unix domain socket.
///
/// The socket file is removed when the listener is dropped.
pub struct ChannelListener {
    listener: UnixListener,
    socket_path: PathBuf,
    service_name: String,
    authorized_peers: Vec<String>,
    options: ChannelOptions,
}

impl ChannelListener {
    /// Bind the service socket, replacing a stale one.
    pub fn bind(paths: &Paths, service_name: &str, options: ChannelOptions) -> ChannelResult<Self> {
        let socket_path = paths.socket_file(service_name);

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        info!(path = %socket_path.display(), service = service_name, "Service listening");

        Ok(Self {
            listener,
            socket_path,
            service_name: service_name.to_string(),
            authorized_peers: Vec::new(),
            options,
        })
    }

    /// Accept only these peer identities. Empty accepts any peer.
    pub fn with_authorized_peers(mut self, peers: Vec<String>) -> Self {
        self.authorized_peers = peers;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Wait for a peer that completes the handshake.
    ///
    /// Connections that fail or are refused during the handshake are
    /// dropped and the listener keeps waiting.
    pub async fn accept(&self) -> ChannelResult<Channel> {
        loop {
            let (stream, _) = self.listener.accept().await?;
            debug!("Peer connecting");

            match self.handshake(stream).await {
                Ok(Some(channel)) => return Ok(channel),
                Ok(None) => continue,
                Err(e) => warn!(error = %e, "Handshake failed"),
            }
        }
    }

    async fn handshake(&self, stream: UnixStream) -> ChannelResult<Option<Channel>> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let limit = self.options.open_timeout;

        let frame = tokio::time::timeout(limit, read_frame(&mut reader))
            .await
            .map_err(|_| ChannelError::OpenTimeout(limit))??;

        let peer_identity = match frame {
            Some(Frame::Open {
                service_name,
                peer_identity,
            }) => {
                let status = self.status_for(&service_name, &peer_identity);
                write_frame(&mut writer, &Frame::Opened { status }).await?;
                if !status.is_success() {
                    warn!(
                        peer = %peer_identity,
                        requested = %service_name,
                        %status,
                        "Refused connection"
                    );
                    return Ok(None);
                }
                peer_identity
            }
            Some(other) => {
                return Err(ChannelError::Handshake(format!(
                    "expected open, got {}",
                    other.kind()
                )))
            }
            None => return Ok(None),
        };

        info!(peer = %peer_identity, service = %self.service_name, "Peer connected");
        Ok(Some(Channel::spawn(reader, writer, &self.options)))
    }

    fn status_for(&self, service_name: &str, peer_identity: &str) -> ConnectionStatus {
        if service_name != self.service_name {
            ConnectionStatus::AppServiceUnavailable
        } else if !self.authorized_peers.is_empty()
            && !self.authorized_peers.iter().any(|p| p == peer_identity)
        {
            ConnectionStatus::NotAuthorized
        } else {
            ConnectionStatus::Success
        }
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
