// ============================================================================
// STATE MODULE - State Management con Rc<RefCell> + notificaciones
// ============================================================================

pub mod reactivity;
pub mod presence_state;
pub mod location_state;

pub use reactivity::*;
pub use presence_state::*;
pub use location_state::*;
