pub mod client;
pub mod models;
pub mod source;

pub use client::SpotifyClient;
pub use models::{Artist, PageRequest, RecommendedTrack, TimeRange, Track, UserProfile};
pub use source::{fetch_sample, TrackSource, SAMPLE_PAGE_SIZE};
