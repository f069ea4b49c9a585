pub mod location;
pub mod session;

pub use location::{find_location, normalize_locations, Location, LocationInput, NetworkSpec};
pub use session::{productivity_score, ActiveSession, Session};
