use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::channel::SignalingChannel;
use crate::codec::{self, EnginePacket, SocketPacket};
use crate::config::SignalingConfig;
use crate::error::{Error, Result};
use crate::event::{EventKind, SignalingEvent};
use crate::queue::EventSender;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Turn a server address into the Engine.IO WebSocket URL.
///
/// `http` maps to `ws` and `https` to `wss`; `/socket.io/` and the
/// `EIO=4&transport=websocket` query are added unless already present.
pub fn socket_io_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| Error::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::InvalidEndpoint(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidEndpoint(format!("cannot use scheme '{}' for {}", scheme, endpoint)))?;

    if !url.path().contains("socket.io") {
        let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }
    if !url.query_pairs().any(|(key, _)| key == "EIO") {
        url.query_pairs_mut()
            .append_pair("EIO", "4")
            .append_pair("transport", "websocket");
    }
    Ok(url)
}

/// Socket.IO signaling over a WebSocket
///
/// A receive task decodes frames, answers pings and pushes every event into
/// the call's [`EventSender`]; a write task serializes outbound frames so
/// `disconnect` can flush what `send` queued before it. Connecting again
/// while the socket is up keeps it and routes later events to the new sender.
pub struct WebSocketSignalingChannel {
    config: SignalingConfig,
    connection: Option<Connection>,
}

struct Connection {
    url: Url,
    outbound: mpsc::UnboundedSender<Message>,
    route: watch::Sender<EventSender>,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl WebSocketSignalingChannel {
    /// Create a disconnected channel
    pub fn new(config: SignalingConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Channel configuration
    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }
}

#[async_trait]
impl SignalingChannel for WebSocketSignalingChannel {
    async fn connect(&mut self, endpoint: &str, events: EventSender) -> Result<()> {
        if let Some(connection) = &self.connection {
            if connection.is_alive() {
                debug!("Already connected to {}, rerouting events", connection.url);
                connection.route.send_replace(events);
                return Ok(());
            }
            self.connection = None;
        }

        let url = socket_io_url(endpoint)?;
        let deadline = Instant::now() + self.config.connect_timeout();
        debug!("Connecting to signaling server {}", url);

        let ws = match tokio::time::timeout_at(deadline, super::tls::open(&url, &self.config)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Connection(format!("timed out connecting to {}", url))),
        };

        let (sink, stream) = ws.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let (route, route_rx) = watch::channel(events);

        let connection = Connection {
            url: url.clone(),
            outbound: outbound.clone(),
            route,
            alive: alive.clone(),
            writer: tokio::spawn(write_loop(sink, outbound_rx)),
            reader: tokio::spawn(read_loop(stream, outbound, route_rx, ready_tx, alive)),
        };

        // Dropping `connection` on any error path stops both tasks.
        match tokio::time::timeout_at(deadline, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("Connected to signaling server {}", url);
                self.connection = Some(connection);
                Ok(())
            }
            Ok(Ok(Err(reason))) => Err(Error::Connection(reason)),
            Ok(Err(_)) => Err(Error::Connection("receive loop ended during handshake".to_string())),
            Err(_) => Err(Error::Connection(format!("no namespace acknowledgement from {}", url))),
        }
    }

    async fn send(&mut self, kind: EventKind, payload: Value) -> Result<()> {
        let connection = match &self.connection {
            Some(connection) if connection.is_alive() => connection,
            _ => return Err(Error::NotConnected),
        };

        debug!("Sending {} to signaling server", kind);
        let frame = EnginePacket::event(kind.as_str(), payload).encode();
        connection
            .outbound
            .send(Message::Text(frame))
            .map_err(|_| Error::NotConnected)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        let goodbye = EnginePacket::Message(SocketPacket::Disconnect).encode();
        let _ = connection.outbound.send(Message::Text(goodbye));
        let _ = connection.outbound.send(Message::Close(None));

        if timeout(self.config.close_timeout(), &mut connection.writer).await.is_err() {
            warn!("Outbound frames to {} not flushed before close", connection.url);
        }

        info!("Disconnected from signaling server {}", connection.url);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.as_ref().map_or(false, Connection::is_alive)
    }
}

async fn write_loop(mut sink: SplitSink<WsStream, Message>, mut outbound: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            warn!("Error writing signaling frame: {}", e);
            return;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    outbound: mpsc::UnboundedSender<Message>,
    events: watch::Receiver<EventSender>,
    ready: oneshot::Sender<std::result::Result<(), String>>,
    alive: Arc<AtomicBool>,
) {
    let mut ready = Some(ready);

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!("Signaling server closed the socket: {:?}", frame);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Signaling socket error: {}", e);
                break;
            }
        };

        match codec::decode(&text) {
            Ok(EnginePacket::Open(handshake)) => {
                debug!("Engine.IO session {} opened", handshake.sid);
                let connect = EnginePacket::Message(SocketPacket::Connect(None)).encode();
                let _ = outbound.send(Message::Text(connect));
            }
            Ok(EnginePacket::Ping(data)) => {
                trace!("Ping from signaling server");
                let _ = outbound.send(Message::Text(EnginePacket::Pong(data).encode()));
            }
            Ok(EnginePacket::Message(SocketPacket::Connect(_))) => {
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
            Ok(EnginePacket::Message(SocketPacket::ConnectError(reason))) => {
                warn!("Signaling server refused connection: {}", reason);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(format!("connection refused: {}", reason)));
                }
                break;
            }
            Ok(EnginePacket::Message(SocketPacket::Event { name, args, .. })) => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                let event = SignalingEvent::new(name.as_str(), payload);
                debug!("Received {} from signaling server", event.kind());
                events.borrow().push(event);
            }
            Ok(EnginePacket::Message(SocketPacket::Disconnect)) | Ok(EnginePacket::Close) => {
                info!("Signaling server ended the session");
                break;
            }
            Ok(other) => trace!("Ignoring frame {:?}", other),
            Err(e) => warn!("Undecodable signaling frame {:?}: {}", text, e),
        }
    }

    alive.store(false, Ordering::Release);
    if let Some(ready) = ready.take() {
        let _ = ready.send(Err("connection closed during handshake".to_string()));
    }
}
