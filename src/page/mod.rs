pub mod error;
pub mod observer;
pub mod probe;

pub use error::ExtractionError;
pub use observer::{PageObserver, Probe, Tab};
pub use probe::{is_watch_url, PageMetadata, PageProbe, Playhead};
