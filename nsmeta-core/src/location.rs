//! Replica location descriptors (`t_locationinfo`).

use time::OffsetDateTime;

/// Lifecycle state of a replica location. Only `Online` rows are returned by
/// `getInodeLocations` (spec §3 "Replica location").
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum LocationState {
    Online = 1,
    Offline = 2,
    NearlineRequested = 3,
    Removed = 4,
}

impl LocationState {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Online),
            2 => Some(Self::Offline),
            3 => Some(Self::NearlineRequested),
            4 => Some(Self::Removed),
            _ => None,
        }
    }
}

/// The default priority newly-added locations receive (spec §4.1
/// "Locations": "inserts with default priority 10").
pub const DEFAULT_LOCATION_PRIORITY: i32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationEntry {
    pub location_type: i32,
    pub location: String,
    pub priority: i32,
    pub ctime: OffsetDateTime,
    pub atime: OffsetDateTime,
    pub state: LocationState,
}
