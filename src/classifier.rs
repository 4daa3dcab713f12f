use serde::Serialize;

use crate::spotify::Track;

/// Tracks above this popularity are "Popular".
const POPULAR_ABOVE: u8 = 60;
/// Tracks below this popularity are "Indie".
const INDIE_BELOW: u8 = 30;

const INITIAL_WEIGHT: f64 = 1.5;
const WEIGHT_DECAY: f64 = 0.0025;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bucket {
    Popular,
    Mid,
    Indie,
}

impl Bucket {
    pub fn for_popularity(popularity: u8) -> Self {
        if popularity > POPULAR_ABOVE {
            Bucket::Popular
        } else if popularity < INDIE_BELOW {
            Bucket::Indie
        } else {
            Bucket::Mid
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Popular => write!(f, "Popular"),
            Bucket::Mid => write!(f, "Mid"),
            Bucket::Indie => write!(f, "'Indie'"),
        }
    }
}

/// Partition of a track listing, each bucket in encounter order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Buckets {
    pub popular: Vec<Track>,
    pub mid: Vec<Track>,
    pub indie: Vec<Track>,
}

impl Buckets {
    pub fn len(&self) -> usize {
        self.popular.len() + self.mid.len() + self.indie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buckets in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[Track])> {
        [
            (Bucket::Popular, self.popular.as_slice()),
            (Bucket::Mid, self.mid.as_slice()),
            (Bucket::Indie, self.indie.as_slice()),
        ]
        .into_iter()
    }
}

pub fn classify<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> Buckets {
    let mut buckets = Buckets::default();

    for track in tracks {
        let bucket = match Bucket::for_popularity(track.popularity) {
            Bucket::Popular => &mut buckets.popular,
            Bucket::Mid => &mut buckets.mid,
            Bucket::Indie => &mut buckets.indie,
        };
        bucket.push(track.clone());
    }

    buckets
}

/// Front-loaded popularity average: the first track weighs 1.5, every later one
/// 0.0025 less than its predecessor. At most `sample_size` tracks are read and the
/// sum is always divided by `sample_size`, even when fewer tracks exist, so short
/// listings come out low.
pub fn weighted_average<'a>(tracks: impl IntoIterator<Item = &'a Track>, sample_size: usize) -> f64 {
    if sample_size == 0 {
        return 0.0;
    }

    let mut weight = INITIAL_WEIGHT;
    let mut sum = 0.0;

    for track in tracks.into_iter().take(sample_size) {
        sum += f64::from(track.popularity) * weight;
        weight -= WEIGHT_DECAY;
    }

    sum / sample_size as f64
}

/// Open popularity interval used to pick playlist tracks. Both bounds are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopularityRange {
    pub min: u8,
    pub max: u8,
}

impl PopularityRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, popularity: u8) -> bool {
        self.min < popularity && popularity < self.max
    }

    pub fn accepts(&self, track: &Track) -> bool {
        self.contains(track.popularity)
    }
}
