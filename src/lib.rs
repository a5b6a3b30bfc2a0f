pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod output;
pub mod paginate;
pub mod parser;
pub mod registry;
pub mod service;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

pub use error::{ErrorKind, FeedError, ProcessingError};
pub use filter::FilterCriteria;
pub use model::{EntityType, FeedEntity, FeedHeader, FeedSnapshot};
pub use paginate::PageResult;
pub use service::{FeedPage, FeedService};
