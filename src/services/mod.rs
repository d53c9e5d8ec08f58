// ============================================================================
// SERVICES - comunicación con el backend y capacidades del navegador
// ============================================================================

pub mod api_client;
pub mod config_resolver;
pub mod geolocation;
pub mod position_sampler;
pub mod socket_channel;
pub mod socket_protocol;
pub mod timer;
pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use api_client::{HttpClient, HttpResponse, LocationApi};
pub use config_resolver::ConfigResolver;
pub use geolocation::{GeolocationProvider, PositionOptions};
pub use position_sampler::{PositionSampler, SamplerHandle};
pub use socket_channel::{ChannelEvent, ChannelTarget, SocketChannel, SocketConnector};
pub use timer::{IntervalScheduler, TimerGuard};
pub use transport::{ChannelHandle, DualChannelTransport};
