pub mod traits;

pub use traits::{AuthProvider, CatalogProvider, VideoLocator};
