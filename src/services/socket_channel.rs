use std::rc::Rc;

use serde_json::Value;

use crate::error::TrackerError;

/// Evento observado en el canal persistente
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected { reason: String },
    ConnectError { message: String },
    Message { name: String, data: Value },
}

pub type ChannelEventHandler = Rc<dyn Fn(ChannelEvent)>;

/// Destino del canal: base del backend, namespace y token del handshake
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTarget {
    pub base_url: String,
    pub namespace: String,
    pub token: String,
}

/// Canal bidireccional ya creado (la conexión puede seguir en curso)
pub trait SocketChannel {
    fn is_connected(&self) -> bool;

    /// Emisión fire-and-forget; solo falla si el socket rechaza el envío
    fn emit(&self, event: &str, payload: Value) -> Result<(), TrackerError>;

    fn disconnect(&self);
}

/// Fábrica de canales (WebSocket + Socket.IO en el navegador)
pub trait SocketConnector {
    fn connect(
        &self,
        target: &ChannelTarget,
        on_event: ChannelEventHandler,
    ) -> Result<Rc<dyn SocketChannel>, TrackerError>;
}
