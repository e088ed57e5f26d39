//! In-memory, thread-safe routing table for cell-to-cell messaging, plus the
//! URL-path helper (spec §4.2, §4.3).

pub mod route;
pub mod table;
pub mod urlpath;

pub use route::{CellAddress, InvalidCellAddress, Route, RouteKind, LOCAL_DOMAIN};
pub use table::{RouterError, RoutingTable};
pub use urlpath::{UrlPath, UrlPathError};
