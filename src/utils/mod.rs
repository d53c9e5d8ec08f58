// Utils compartidos

pub mod constants;
pub mod storage;
pub mod time;

pub use constants::*;
pub use storage::{MemoryTokenStore, TokenStore};
pub use time::now_millis;
