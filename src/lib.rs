pub mod classifier;
pub mod config;
pub mod error;
pub mod playlist;
pub mod session;
pub mod spotify;
pub mod web;

pub use classifier::{classify, weighted_average, Bucket, Buckets, PopularityRange};
pub use config::Config;
pub use error::{AppError, Result};
pub use playlist::{BuildRequest, FilterCriteria, PlaylistBuilder, PlaylistDraft};
pub use session::SessionStore;
pub use spotify::{SpotifyClient, TimeRange, Track, TrackSource};
