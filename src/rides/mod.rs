pub mod api;
pub mod controller;
pub mod in_flight;
pub mod list;
pub mod types;
pub mod view;

pub use api::RidesApi;
pub use controller::{AutoConfirm, Confirm, MutationOutcome, RideController};
pub use in_flight::{InFlightGuard, InFlightSet};
pub use list::{RideList, RideScope};
pub use types::{NewRide, Pagination, Ride, RidePage, RideStatus, RideUpdate};
pub use view::RideListView;
