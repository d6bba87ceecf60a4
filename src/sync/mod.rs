pub mod coordinator;
pub mod events;
pub mod state;
pub mod tracker;

pub use coordinator::{Collaborators, SyncCoordinator, SyncHandle};
pub use state::{SyncSnapshot, NOT_FOUND};
