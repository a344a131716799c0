pub mod user;
pub mod location;
pub mod rating;
pub mod visit;

pub use user::User;
pub use location::{Location, LocationWithStats, NearbyLocation};
pub use rating::{Rating, RecentComment};
pub use visit::{Visit, VisitType};
