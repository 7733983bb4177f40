mod zone;

pub use zone::{BoundingBox, CityId, Coordinate, StartZone, Zone, ZoneId};
