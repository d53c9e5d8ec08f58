// ============================================================================
// SOCKET PROTOCOL - Engine.IO v4 / Socket.IO v5 sobre WebSocket
// ============================================================================
// Codec de texto y sesión cliente sin dependencias del navegador: el
// adaptador WebSocket solo mueve frames entre el socket y `SocketIoSession`.
// ============================================================================

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::TrackerError;
use crate::services::socket_channel::ChannelEvent;

/// Handshake `0{...}` del servidor Engine.IO
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Paquete Engine.IO (capa de transporte)
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, TrackerError> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| TrackerError::Protocol("Empty Engine.IO frame".to_string()))?;
        let payload = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(payload)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(payload.to_string())),
            '3' => Ok(EnginePacket::Pong(payload.to_string())),
            '4' => Ok(EnginePacket::Message(payload.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(TrackerError::Protocol(format!(
                "Unknown Engine.IO packet type '{}'",
                other
            ))),
        }
    }

    /// Solo los paquetes que envía un cliente
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(p) => format!("2{}", p),
            EnginePacket::Pong(p) => format!("3{}", p),
            EnginePacket::Message(p) => format!("4{}", p),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0' => SocketPacketKind::Connect,
            '1' => SocketPacketKind::Disconnect,
            '2' => SocketPacketKind::Event,
            '3' => SocketPacketKind::Ack,
            '4' => SocketPacketKind::ConnectError,
            '5' => SocketPacketKind::BinaryEvent,
            '6' => SocketPacketKind::BinaryAck,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            SocketPacketKind::Connect => '0',
            SocketPacketKind::Disconnect => '1',
            SocketPacketKind::Event => '2',
            SocketPacketKind::Ack => '3',
            SocketPacketKind::ConnectError => '4',
            SocketPacketKind::BinaryEvent => '5',
            SocketPacketKind::BinaryAck => '6',
        }
    }
}

/// Paquete Socket.IO (dentro de un mensaje Engine.IO)
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    pub fn connect(namespace: &str, auth: Value) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: Some(auth),
        }
    }

    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Disconnect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    pub fn event(namespace: &str, name: &str, payload: Value) -> Self {
        Self {
            kind: SocketPacketKind::Event,
            namespace: namespace.to_string(),
            ack_id: None,
            data: Some(json!([name, payload])),
        }
    }

    pub fn decode(payload: &str) -> Result<Self, TrackerError> {
        let mut rest = payload;
        let kind = rest
            .chars()
            .next()
            .and_then(SocketPacketKind::from_char)
            .ok_or_else(|| TrackerError::Protocol(format!("Invalid Socket.IO packet: {:?}", payload)))?;
        rest = &rest[1..];

        if matches!(kind, SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck) {
            // No se usan adjuntos binarios: se salta el contador "<n>-"
            let dash = rest
                .find('-')
                .ok_or_else(|| TrackerError::Protocol("Missing attachment count".to_string()))?;
            rest = &rest[dash + 1..];
        }

        let mut namespace = "/".to_string();
        if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    namespace = rest[..comma].to_string();
                    rest = &rest[comma + 1..];
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| TrackerError::Protocol("Invalid ack id".to_string()))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.namespace != "/" {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Frame Engine.IO listo para `WebSocket.send`
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }

    /// `["name", payload]` de un EVENT
    pub fn event_parts(&self) -> Option<(String, Value)> {
        let items = self.data.as_ref()?.as_array()?;
        let name = items.first()?.as_str()?.to_string();
        let payload = items.get(1).cloned().unwrap_or(Value::Null);
        Some((name, payload))
    }
}

/// URL del transporte websocket de Engine.IO para una base http(s)
pub fn engine_io_url(base_url: &str) -> Result<String, TrackerError> {
    let base = base_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(TrackerError::ChannelConnect(format!(
            "Unsupported backend URL for socket: {:?}",
            base_url
        )));
    };
    Ok(format!("{}/socket.io/?EIO=4&transport=websocket", ws_base))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionPhase {
    /// Esperando el `0{...}` de Engine.IO
    Opening,
    /// CONNECT al namespace enviado, esperando respuesta
    Joining,
    Connected,
    Closed,
}

/// Reacción de la sesión a un frame entrante
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Send(String),
    Emit(ChannelEvent),
    /// La sesión terminó del lado del servidor: cerrar el WebSocket
    CloseTransport,
}

/// Sesión cliente Socket.IO para un único namespace autenticado
pub struct SocketIoSession {
    namespace: String,
    auth: Value,
    phase: SessionPhase,
    handshake: Option<OpenHandshake>,
}

impl SocketIoSession {
    pub fn new(namespace: &str, token: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            auth: json!({ "token": token }),
            phase: SessionPhase::Opening,
            handshake: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    pub fn handshake(&self) -> Option<&OpenHandshake> {
        self.handshake.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    pub fn handle_frame(&mut self, frame: &str) -> Result<Vec<SessionAction>, TrackerError> {
        if self.is_closed() {
            log::debug!("📡 [SOCKET] Frame tras el cierre de la sesión ignorado");
            return Ok(Vec::new());
        }
        match EnginePacket::decode(frame)? {
            EnginePacket::Open(handshake) => {
                log::debug!("📡 [SOCKET] Engine.IO abierto (sid {})", handshake.sid);
                self.handshake = Some(handshake);
                self.phase = SessionPhase::Joining;
                let connect = SocketPacket::connect(&self.namespace, self.auth.clone());
                Ok(vec![SessionAction::Send(connect.to_frame())])
            }
            EnginePacket::Ping(payload) => {
                Ok(vec![SessionAction::Send(EnginePacket::Pong(payload).encode())])
            }
            EnginePacket::Close => Ok(self.close("transport close")),
            EnginePacket::Message(payload) => self.handle_message(&payload),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Ok(Vec::new()),
        }
    }

    fn handle_message(&mut self, payload: &str) -> Result<Vec<SessionAction>, TrackerError> {
        let packet = SocketPacket::decode(payload)?;
        if packet.namespace != self.namespace {
            log::debug!("📡 [SOCKET] Paquete de otro namespace ignorado: {}", packet.namespace);
            return Ok(Vec::new());
        }

        match packet.kind {
            SocketPacketKind::Connect => {
                self.phase = SessionPhase::Connected;
                Ok(vec![SessionAction::Emit(ChannelEvent::Connected)])
            }
            SocketPacketKind::ConnectError => {
                self.phase = SessionPhase::Closed;
                let message = packet
                    .data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("connection refused")
                    .to_string();
                Ok(vec![
                    SessionAction::Emit(ChannelEvent::ConnectError { message }),
                    SessionAction::CloseTransport,
                ])
            }
            SocketPacketKind::Disconnect => {
                let mut actions = self.close("io server disconnect");
                actions.push(SessionAction::CloseTransport);
                Ok(actions)
            }
            SocketPacketKind::Event | SocketPacketKind::BinaryEvent => match packet.event_parts() {
                Some((name, data)) => Ok(vec![SessionAction::Emit(ChannelEvent::Message { name, data })]),
                None => Err(TrackerError::Protocol("EVENT without name".to_string())),
            },
            SocketPacketKind::Ack | SocketPacketKind::BinaryAck => Ok(Vec::new()),
        }
    }

    /// Cierre detectado por el transporte (onclose del WebSocket)
    pub fn transport_closed(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.phase == SessionPhase::Closed {
            return Vec::new();
        }
        self.close(reason)
    }

    fn close(&mut self, reason: &str) -> Vec<SessionAction> {
        let was_connected = self.phase == SessionPhase::Connected;
        self.phase = SessionPhase::Closed;
        if was_connected {
            vec![SessionAction::Emit(ChannelEvent::Disconnected {
                reason: reason.to_string(),
            })]
        } else {
            vec![SessionAction::Emit(ChannelEvent::ConnectError {
                message: reason.to_string(),
            })]
        }
    }

    pub fn event_frame(&self, name: &str, payload: Value) -> String {
        SocketPacket::event(&self.namespace, name, payload).to_frame()
    }

    /// Frame de salida del namespace; la sesión queda cerrada
    pub fn disconnect_frame(&mut self) -> String {
        self.phase = SessionPhase::Closed;
        SocketPacket::disconnect(&self.namespace).to_frame()
    }
}
