use std::env;
use std::fs;
use std::path::Path;

/// Variables que el cliente lee con `option_env!` en tiempo de compilación
const FORWARDED_KEYS: &[&str] = &[
    "BACKEND_URL",
    "CONFIG_URL",
    "ENABLE_LOGGING",
    "BACKUP_POLL_INTERVAL_MS",
    "GEOLOCATION_TIMEOUT_MS",
    "REJECT_STALE_SAMPLES",
    "PRESENCE_TTL_MS",
];

fn main() {
    let env_file = Path::new(".env");

    if env_file.exists() {
        println!("cargo:rerun-if-changed=.env");

        if let Ok(contents) = fs::read_to_string(env_file) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                let Some((key, value)) = line.split_once('=') else {
                    continue;
                };
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                if !FORWARDED_KEYS.contains(&key) {
                    println!("cargo:warning=Variable {} ignorada (no la usa el tracker)", key);
                    continue;
                }

                // El entorno del proceso tiene prioridad sobre .env
                if env::var(key).is_err() {
                    println!("cargo:rustc-env={}={}", key, value);
                }
            }
        }
    } else {
        println!("cargo:warning=No .env file found. Using default tracker settings.");
    }

    for key in FORWARDED_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }
    println!("cargo:rerun-if-changed=build.rs");
}
