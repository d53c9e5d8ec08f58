use serde::{Deserialize, Serialize};

/// Estado de la máquina de tracking
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    #[default]
    Idle,
    /// Solo mientras se resuelve la configuración y se abre el canal
    Starting,
    Active,
}

/// Estado del canal persistente, derivado de los eventos de ciclo de vida
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Camino elegido para una muestra saliente
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryRoute {
    Channel,
    Rest,
}

/// Contadores de entrega (solo diagnóstico, nunca se propagan como error)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDiagnostics {
    pub channel_emits: u64,
    pub rest_successes: u64,
    pub rest_failures: u64,
    pub last_rest_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_statuses() {
        assert_eq!(TrackingStatus::default(), TrackingStatus::Idle);
        assert_eq!(ChannelStatus::default(), ChannelStatus::Disconnected);
        assert_eq!(DeliveryDiagnostics::default().rest_failures, 0);
    }
}
