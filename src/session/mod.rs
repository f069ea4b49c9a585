pub mod state;
pub mod store;

pub use state::{MonitorState, Transition};
pub use store::SessionStore;
