pub mod location;
pub mod tracking;

pub use location::{LocationUpdatePayload, LatestLocationRecord, PositionSample, RemotePresenceEntry};
pub use tracking::{ChannelStatus, DeliveryDiagnostics, DeliveryRoute, TrackingStatus};
