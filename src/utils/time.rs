/// Hora actual en epoch ms (`Date.now()` en WASM vía chrono/wasmbind)
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
