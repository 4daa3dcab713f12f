use std::future::Future;
use tracing::debug;

use crate::error::Result;
use crate::spotify::models::{PageRequest, TimeRange, Track};

/// Spotify's maximum page size for the top-items endpoints.
pub const SAMPLE_PAGE_SIZE: u32 = 50;

/// Paged access to a user's top tracks.
///
/// Implementations make exactly one upstream call per page and surface failures
/// as-is; callers decide when to stop paging.
pub trait TrackSource {
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = Result<Vec<Track>>> + Send;
}

/// Collects up to `sample_size` top tracks in fetch order, stopping early at the
/// first empty page.
pub async fn fetch_sample<S>(source: &S, time_range: TimeRange, sample_size: usize) -> Result<Vec<Track>>
where
    S: TrackSource + Sync,
{
    let limit = u32::try_from(sample_size)
        .unwrap_or(SAMPLE_PAGE_SIZE)
        .clamp(1, SAMPLE_PAGE_SIZE);
    let mut request = PageRequest::first(time_range, limit);
    let mut tracks = Vec::new();

    while tracks.len() < sample_size {
        let page = source.fetch_page(request).await?;
        debug!(
            "Fetched {} {} tracks at offset {}",
            page.len(),
            time_range,
            request.offset
        );

        if page.is_empty() {
            break;
        }

        tracks.extend(page);
        request = request.next();
    }

    tracks.truncate(sample_size);
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    struct PagedSource {
        catalog: Vec<Track>,
        requests: Mutex<Vec<PageRequest>>,
        fail_at_offset: Option<u32>,
    }

    impl PagedSource {
        fn with_tracks(count: usize) -> Self {
            Self {
                catalog: (0..count)
                    .map(|i| Track::mock(&i.to_string(), (i % 100) as u8))
                    .collect(),
                requests: Mutex::new(Vec::new()),
                fail_at_offset: None,
            }
        }
    }

    impl TrackSource for PagedSource {
        async fn fetch_page(&self, request: PageRequest) -> Result<Vec<Track>> {
            self.requests.lock().unwrap().push(request);
            if self.fail_at_offset == Some(request.offset) {
                return Err(AppError::MalformedResponse("boom".into()));
            }
            Ok(self
                .catalog
                .iter()
                .skip(request.offset as usize)
                .take(request.limit as usize)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_sample_stops_at_sample_size() {
        let source = PagedSource::with_tracks(1000);

        let tracks = fetch_sample(&source, TimeRange::ShortTerm, 400).await.unwrap();

        assert_eq!(tracks.len(), 400);
        assert_eq!(tracks[0].id, "0");
        assert_eq!(tracks[399].id, "399");

        let offsets: Vec<u32> = source.requests.lock().unwrap().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 50, 100, 150, 200, 250, 300, 350]);
    }

    #[tokio::test]
    async fn test_sample_stops_on_empty_page() {
        let source = PagedSource::with_tracks(70);

        let tracks = fetch_sample(&source, TimeRange::MediumTerm, 400).await.unwrap();

        assert_eq!(tracks.len(), 70);
        // 0 and 50 return data, 100 comes back empty
        assert_eq!(source.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_small_sample_uses_smaller_pages() {
        let source = PagedSource::with_tracks(100);

        let tracks = fetch_sample(&source, TimeRange::LongTerm, 10).await.unwrap();

        assert_eq!(tracks.len(), 10);
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].limit, 10);
        assert_eq!(requests[0].time_range, TimeRange::LongTerm);
    }

    #[tokio::test]
    async fn test_oversized_sample_is_bounded_by_catalog() {
        let source = PagedSource::with_tracks(120);

        let tracks = fetch_sample(&source, TimeRange::ShortTerm, usize::MAX).await.unwrap();

        assert_eq!(tracks.len(), 120);
        let requests = source.requests.lock().unwrap();
        assert!(requests.iter().all(|r| r.limit == SAMPLE_PAGE_SIZE));
        assert_eq!(requests.len(), 4);
    }

    #[tokio::test]
    async fn test_oversized_sample_on_empty_source() {
        let source = PagedSource::with_tracks(0);

        let tracks = fetch_sample(&source, TimeRange::ShortTerm, usize::MAX).await.unwrap();

        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let mut source = PagedSource::with_tracks(200);
        source.fail_at_offset = Some(50);

        let result = fetch_sample(&source, TimeRange::ShortTerm, 400).await;

        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
        assert_eq!(source.requests.lock().unwrap().len(), 2);
    }
}
