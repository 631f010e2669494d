//! Commute and traffic: payload model, condition classifier, route map,
//! event history and the commute widget that ties them together.

pub mod classify;
pub mod commute;
pub mod history;
pub mod map;
pub mod model;

pub use classify::{classify, overall_condition, Classification, IncidentDisplay};
pub use commute::CommuteWidget;
pub use map::{DocumentSurface, MapError, MapHandle, MapRenderer, MapScene, MapSurface, NullSurface};
pub use model::{CommutePayload, CommuteSnapshot, RouteSegment, TrafficIncident, TrafficLevel};
