use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use crate::error::TrackerError;

/// Fuente del token de sesión (JWT opaco)
///
/// El núcleo nunca crea ni refresca el token: solo lo lee al conectar el
/// canal y en cada POST de respaldo.
pub trait TokenStore {
    fn token(&self) -> Option<String>;
}

/// Token en memoria (tests y sesiones sin persistencia)
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RefCell<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: RefCell::new(token.map(str::to_string)),
        }
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.borrow_mut() = token.map(str::to_string);
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        normalize_token(self.token.borrow().clone())
    }
}

/// Token guardado por la app en localStorage bajo una clave fija
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageTokenStore {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageTokenStore {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }

    /// Lee el valor crudo: la app lo guarda como string sin comillas JSON
    fn read_raw(&self) -> Result<Option<String>, TrackerError> {
        use gloo_storage::{LocalStorage, Storage};
        let storage = LocalStorage::raw();
        storage
            .get_item(&self.key)
            .map_err(|_| TrackerError::Storage("No se pudo acceder a localStorage".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl TokenStore for LocalStorageTokenStore {
    fn token(&self) -> Option<String> {
        match self.read_raw() {
            Ok(token) => normalize_token(token),
            Err(e) => {
                log::warn!("⚠️ [STORAGE] {}", e);
                None
            }
        }
    }
}

/// Normaliza un token leído: vacío equivale a ausente
pub fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
