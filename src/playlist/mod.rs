pub mod builder;
pub mod criteria;
pub mod draft;

pub use builder::{PlaylistBuilder, PlaylistSink, BUILD_PAGE_SIZE};
pub use criteria::{BuildRequest, FilterCriteria, PlaylistForm};
pub use draft::PlaylistDraft;
