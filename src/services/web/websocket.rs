// ============================================================================
// WEBSOCKET CONNECTOR - Socket.IO sobre un WebSocket del navegador
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use super::{defer_drop, js_error};
use crate::error::TrackerError;
use crate::services::socket_channel::{ChannelEventHandler, ChannelTarget, SocketChannel, SocketConnector};
use crate::services::socket_protocol::{engine_io_url, SessionAction, SocketIoSession};

/// Se mantienen vivas mientras el socket tenga handlers
struct SocketClosures {
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

fn run_actions(socket: &WebSocket, on_event: &ChannelEventHandler, actions: Vec<SessionAction>) {
    for action in actions {
        match action {
            SessionAction::Send(frame) => {
                if let Err(e) = socket.send_with_str(&frame) {
                    log::warn!("⚠️ [SOCKET] No se pudo enviar frame: {}", js_error(&e));
                }
            }
            SessionAction::Emit(event) => on_event(event),
            SessionAction::CloseTransport => {
                if let Err(e) = socket.close() {
                    log::warn!("⚠️ [SOCKET] Error cerrando el WebSocket: {}", js_error(&e));
                }
            }
        }
    }
}

/// Base absoluta para el socket; una ruta relativa usa el origen de la página
fn absolute_base(base_url: &str) -> String {
    let base = base_url.trim();
    if base.starts_with("http://") || base.starts_with("https://") || base.starts_with("ws") {
        return base.to_string();
    }
    let origin = web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .unwrap_or_default();
    format!("{}{}", origin, base)
}

pub struct WebSocketChannel {
    socket: WebSocket,
    session: Rc<RefCell<SocketIoSession>>,
    closures: RefCell<Option<SocketClosures>>,
}

impl WebSocketChannel {
    fn attach(&self, on_event: ChannelEventHandler) {
        let on_message = Closure::wrap(Box::new({
            let socket = self.socket.clone();
            let session = self.session.clone();
            let on_event = on_event.clone();
            move |event: MessageEvent| {
                let Some(frame) = event.data().as_string() else {
                    log::debug!("📡 [SOCKET] Frame binario ignorado");
                    return;
                };
                let result = session.borrow_mut().handle_frame(&frame);
                match result {
                    Ok(actions) => run_actions(&socket, &on_event, actions),
                    Err(e) => log::warn!("⚠️ [SOCKET] Frame inválido: {}", e),
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        let on_close = Closure::wrap(Box::new({
            let socket = self.socket.clone();
            let session = self.session.clone();
            let on_event = on_event.clone();
            move |event: CloseEvent| {
                let reason = if event.reason().is_empty() {
                    format!("transport close ({})", event.code())
                } else {
                    event.reason()
                };
                let actions = session.borrow_mut().transport_closed(&reason);
                run_actions(&socket, &on_event, actions);
            }
        }) as Box<dyn FnMut(CloseEvent)>);

        let on_error = Closure::wrap(Box::new(move |_event: Event| {
            log::warn!("⚠️ [SOCKET] Error en el WebSocket");
        }) as Box<dyn FnMut(Event)>);

        self.socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        self.socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        self.socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        *self.closures.borrow_mut() = Some(SocketClosures {
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        });
    }

    fn detach(&self) {
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
        if let Some(closures) = self.closures.borrow_mut().take() {
            defer_drop(closures);
        }
    }
}

impl SocketChannel for WebSocketChannel {
    fn is_connected(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN && self.session.borrow().is_connected()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TrackerError> {
        if !self.is_connected() {
            return Err(TrackerError::Network("Socket is not connected".to_string()));
        }
        let frame = self.session.borrow().event_frame(event, payload);
        self.socket
            .send_with_str(&frame)
            .map_err(|e| TrackerError::Network(js_error(&e)))
    }

    fn disconnect(&self) {
        if self.socket.ready_state() == WebSocket::OPEN {
            let frame = self.session.borrow_mut().disconnect_frame();
            let _ = self.socket.send_with_str(&frame);
        }
        self.detach();
        if let Err(e) = self.socket.close() {
            log::warn!("⚠️ [SOCKET] Error cerrando el WebSocket: {}", js_error(&e));
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.detach();
        let _ = self.socket.close();
    }
}

/// Crea canales Socket.IO (solo transporte websocket)
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl SocketConnector for WebSocketConnector {
    fn connect(
        &self,
        target: &ChannelTarget,
        on_event: ChannelEventHandler,
    ) -> Result<Rc<dyn SocketChannel>, TrackerError> {
        let url = engine_io_url(&absolute_base(&target.base_url))?;
        log::info!("📡 [SOCKET] Conectando a {}", url);

        let socket = WebSocket::new(&url).map_err(|e| TrackerError::ChannelConnect(js_error(&e)))?;
        let channel = Rc::new(WebSocketChannel {
            socket,
            session: Rc::new(RefCell::new(SocketIoSession::new(&target.namespace, &target.token))),
            closures: RefCell::new(None),
        });
        channel.attach(on_event);

        let channel: Rc<dyn SocketChannel> = channel;
        Ok(channel)
    }
}
