// ============================================================================
// STORES - sesión de tracking compartida por la UI
// ============================================================================

pub mod location_store;

pub use location_store::{LocationStore, PlatformServices};
