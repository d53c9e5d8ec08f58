/// URL base del backend cuando no hay configuración remota
/// (sobrescribible en compilación con BACKEND_URL)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Documento de configuración de runtime (GET sin auth)
pub const DEFAULT_CONFIG_URL: &str = "/config.json";

/// Clave de localStorage donde la app guarda el JWT
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Namespace Socket.IO del canal persistente
pub const SOCKET_NAMESPACE: &str = "/ws";

/// Evento saliente con la posición propia
pub const UPDATE_LOCATION_EVENT: &str = "update_location";

/// Evento entrante con la posición de otro usuario
pub const LOCATION_UPDATE_EVENT: &str = "location_update";

/// Endpoint REST de respaldo
pub const LOCATIONS_ENDPOINT: &str = "/api/locations";

/// Última ubicación conocida de un usuario (`/api/locations/latest/<id>`)
pub const LATEST_LOCATION_ENDPOINT: &str = "/api/locations/latest";
