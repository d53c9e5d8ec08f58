// ============================================================================
// PRESENCE STATE - últimas posiciones de otros usuarios
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::RemotePresenceEntry;

/// Caché de presencia remota con un único usuario "vigilado"
///
/// Cada update reemplaza la entrada completa (last received wins, sin
/// comparar timestamps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceCache {
    entries: HashMap<String, RemotePresenceEntry>,
    watched_user_id: Option<String>,
}

impl PresenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, entry: RemotePresenceEntry) {
        self.entries.insert(entry.user_id.clone(), entry);
    }

    pub fn get(&self, user_id: &str) -> Option<&RemotePresenceEntry> {
        self.entries.get(user_id)
    }

    pub fn all(&self) -> &HashMap<String, RemotePresenceEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set_watched_user(&mut self, user_id: &str) {
        self.watched_user_id = Some(user_id.to_string());
    }

    pub fn clear_watched_user(&mut self) {
        self.watched_user_id = None;
    }

    pub fn watched_user_id(&self) -> Option<&str> {
        self.watched_user_id.as_deref()
    }

    /// Entrada del usuario vigilado, si hay uno y ya tiene posición
    pub fn watched_location(&self) -> Option<&RemotePresenceEntry> {
        self.watched_user_id
            .as_deref()
            .and_then(|user_id| self.entries.get(user_id))
    }

    /// Elimina entradas con timestamp anterior a `cutoff` (ms); devuelve cuántas
    pub fn prune_older_than(&mut self, cutoff: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.timestamp >= cutoff);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, lat: f64, accuracy: Option<f64>, timestamp: u64) -> RemotePresenceEntry {
        RemotePresenceEntry {
            user_id: user_id.to_string(),
            lat,
            lng: lat * 2.0,
            accuracy,
            timestamp,
        }
    }

    #[test]
    fn test_update_replaces_entry_wholesale() {
        let mut cache = PresenceCache::new();
        cache.update(entry("U1", 1.0, Some(5.0), 100));
        cache.update(entry("U1", 3.0, None, 200));

        let latest = cache.get("U1").unwrap();
        assert_eq!(latest, &entry("U1", 3.0, None, 200));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_older_update_still_wins() {
        let mut cache = PresenceCache::new();
        cache.update(entry("U1", 1.0, None, 200));
        cache.update(entry("U1", 2.0, None, 100));

        assert_eq!(cache.get("U1").unwrap().timestamp, 100);
    }

    #[test]
    fn test_watched_user_absent_until_update() {
        let mut cache = PresenceCache::new();
        cache.set_watched_user("U1");
        assert!(cache.watched_location().is_none());

        cache.update(entry("U2", 1.0, None, 1));
        assert!(cache.watched_location().is_none());

        cache.update(entry("U1", 4.0, None, 2));
        assert_eq!(cache.watched_location().unwrap().lat, 4.0);

        cache.clear_watched_user();
        assert!(cache.watched_location().is_none());
    }

    #[test]
    fn test_clear_empties_map() {
        let mut cache = PresenceCache::new();
        cache.update(entry("U1", 1.0, None, 1));
        cache.update(entry("U2", 1.0, None, 1));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get("U1").is_none());
        assert!(cache.all().is_empty());
    }

    #[test]
    fn test_prune_older_than() {
        let mut cache = PresenceCache::new();
        cache.update(entry("old", 1.0, None, 10));
        cache.update(entry("new", 1.0, None, 50));

        assert_eq!(cache.prune_older_than(20), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }
}
