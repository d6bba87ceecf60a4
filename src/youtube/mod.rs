pub mod client;
pub mod error;
pub mod models;

pub use client::{build_search_query, YoutubeClient};
pub use error::LocateError;
pub use models::VideoRef;
