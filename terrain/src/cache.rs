//! Content-addressed line-of-sight profile cache.

use crate::{
    math::{validate_height, validate_point},
    profile::{Profile, DEFAULT_STEPS},
    ElevationService, TerrainError,
};
use dashmap::DashMap;
use geo::geometry::Point;
use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::PathBuf,
};
use tempfile::NamedTempFile;

/// Digest identifying one profile request.
///
/// The endpoints are sorted before hashing, so `a -> b` and `b -> a`
/// share a key. That only holds while clearance depends on nothing
/// but the straight line between the two ends; modelling earth
/// curvature or refraction per direction would break it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileKey(String);

impl ProfileKey {
    pub fn new(a: Point<f64>, b: Point<f64>, height_a_m: f64, height_b_m: f64) -> Self {
        #[derive(Serialize)]
        struct Canonical {
            points: [[f64; 2]; 2],
            heights: [f64; 2],
        }

        let a = [a.y(), a.x()];
        let b = [b.y(), b.x()];
        let points = if cmp_lat_lon(&a, &b).is_le() {
            [a, b]
        } else {
            [b, a]
        };
        let canonical = Canonical {
            points,
            heights: [height_a_m, height_b_m],
        };
        // Serializing plain floats cannot fail.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn cmp_lat_lon(a: &[f64; 2], b: &[f64; 2]) -> std::cmp::Ordering {
    a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1]))
}

/// Persistent storage behind a [ProfileCache].
pub trait ProfileStore: Send + Sync {
    fn load(&self, key: &ProfileKey) -> Result<Option<Profile>, TerrainError>;

    fn save(&self, key: &ProfileKey, profile: &Profile) -> Result<(), TerrainError>;
}

/// One JSON file per key.
///
/// Entries never expire; pruning the directory is up to operators.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TerrainError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &ProfileKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl ProfileStore for DiskStore {
    fn load(&self, key: &ProfileKey) -> Result<Option<Profile>, TerrainError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("ignoring unreadable cache entry {path:?}: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &ProfileKey, profile: &Profile) -> Result<(), TerrainError> {
        // One temp file per writer; concurrent saves of a key only race
        // on the rename.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(profile)?)?;
        tmp.persist(self.path(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemStore {
    profiles: DashMap<ProfileKey, Profile>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for MemStore {
    fn load(&self, key: &ProfileKey) -> Result<Option<Profile>, TerrainError> {
        Ok(self.profiles.get(key).map(|r| r.clone()))
    }

    fn save(&self, key: &ProfileKey, profile: &Profile) -> Result<(), TerrainError> {
        self.profiles.insert(key.clone(), profile.clone());
        Ok(())
    }
}

/// Computes profiles through an [ElevationService], remembering every
/// result in a [ProfileStore].
///
/// Every profile has [DEFAULT_STEPS] steps so keys never need to
/// carry a sample count.
///
/// Two concurrent misses on the same key both compute and both write;
/// the content is identical so the race is only wasted work.
pub struct ProfileCache<S, E> {
    store: S,
    elevation: E,
}

impl<S, E> ProfileCache<S, E>
where
    S: ProfileStore,
    E: ElevationService,
{
    pub fn new(store: S, elevation: E) -> Self {
        Self { store, elevation }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the profile from `a` (at `height_a_m` above ground) to
    /// `b` (at `height_b_m`), computing it only on a cache miss.
    ///
    /// A hit may have been computed in the opposite direction.
    pub fn get_or_compute(
        &self,
        a: Point<f64>,
        b: Point<f64>,
        height_a_m: f64,
        height_b_m: f64,
    ) -> Result<Profile, TerrainError> {
        let a = validate_point(a)?;
        let b = validate_point(b)?;
        validate_height(height_a_m)?;
        validate_height(height_b_m)?;
        let key = ProfileKey::new(a, b, height_a_m, height_b_m);

        if let Some(profile) = self.store.load(&key)? {
            debug!("profile cache hit {}", key.as_str());
            return Ok(profile);
        }

        debug!("profile cache miss {}", key.as_str());
        let profile = Profile::builder()
            .start(a)
            .start_alt(height_a_m)
            .end(b)
            .end_alt(height_b_m)
            .steps(DEFAULT_STEPS)
            .build(&self.elevation)?;
        self.store.save(&key, &profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::{DiskStore, MemStore, ProfileCache, ProfileKey, ProfileStore};
    use crate::{ElevationService, TerrainError};
    use geo::{point, Point};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Flat terrain that counts how often it is asked.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl ElevationService for Counting {
        fn elevations(&self, points: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(points
                .iter()
                .enumerate()
                .map(|(i, _)| Some(if i == points.len() / 2 { 180.0 } else { 100.0 }))
                .collect())
        }
    }

    struct Failing;

    impl ElevationService for Failing {
        fn elevations(&self, _: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
            Err(TerrainError::Upstream("service unavailable".into()))
        }
    }

    const A: Point = Point(geo::Coord {
        x: -49.51,
        y: -9.52,
    });
    const B: Point = Point(geo::Coord {
        x: -49.50,
        y: -9.50,
    });

    #[test]
    fn test_key_is_order_independent() {
        assert_eq!(
            ProfileKey::new(A, B, 30.0, 3.0),
            ProfileKey::new(B, A, 30.0, 3.0)
        );
        assert_ne!(
            ProfileKey::new(A, B, 30.0, 3.0),
            ProfileKey::new(A, B, 3.0, 30.0)
        );
        assert_ne!(
            ProfileKey::new(A, B, 30.0, 3.0),
            ProfileKey::new(A, point!(x: -49.50, y: -9.51), 30.0, 3.0)
        );
        assert_eq!(ProfileKey::new(A, B, 30.0, 3.0).as_str().len(), 64);
    }

    #[test]
    fn test_round_trip_calls_upstream_once() {
        let cache = ProfileCache::new(MemStore::new(), Counting::default());
        let first = cache.get_or_compute(A, B, 30.0, 3.0).unwrap();
        let second = cache.get_or_compute(A, B, 30.0, 3.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.elevation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_reversed_request_hits_same_entry() {
        let cache = ProfileCache::new(MemStore::new(), Counting::default());
        let forward = cache.get_or_compute(A, B, 30.0, 3.0).unwrap();
        let reverse = cache.get_or_compute(B, A, 30.0, 3.0).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(cache.elevation.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disk_store_survives_new_cache() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let cache =
                ProfileCache::new(DiskStore::new(dir.path()).unwrap(), Counting::default());
            cache.get_or_compute(A, B, 30.0, 3.0).unwrap()
        };
        let key = ProfileKey::new(A, B, 30.0, 3.0);
        let file = dir.path().join(format!("{}.json", key.as_str()));
        let bytes = std::fs::read(&file).unwrap();

        let cache = ProfileCache::new(DiskStore::new(dir.path()).unwrap(), Counting::default());
        let second = cache.get_or_compute(B, A, 30.0, 3.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.elevation.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&file).unwrap(), bytes);
    }

    #[test]
    fn test_concurrent_saves_of_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        let key = ProfileKey::new(A, B, 30.0, 3.0);
        let profile = ProfileCache::new(MemStore::new(), Counting::default())
            .get_or_compute(A, B, 30.0, 3.0)
            .unwrap();

        std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..100)
                            .map(|_| store.save(&key, &profile))
                            .filter(Result::is_err)
                            .count()
                    })
                })
                .collect();
            let failed: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
            assert_eq!(failed, 0);
        });

        assert_eq!(store.load(&key).unwrap(), Some(profile));
        // Only the committed entry is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        let key = ProfileKey::new(A, B, 30.0, 3.0);
        std::fs::write(dir.path().join(format!("{}.json", key.as_str())), b"{").unwrap();
        assert!(store.load(&key).unwrap().is_none());

        let cache = ProfileCache::new(store, Counting::default());
        cache.get_or_compute(A, B, 30.0, 3.0).unwrap();
        assert!(cache.store().load(&key).unwrap().is_some());
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = ProfileCache::new(MemStore::new(), Failing);
        assert!(matches!(
            cache.get_or_compute(A, B, 30.0, 3.0),
            Err(TerrainError::Upstream(_))
        ));
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_invalid_point_is_rejected() {
        let cache = ProfileCache::new(MemStore::new(), Counting::default());
        let err = cache
            .get_or_compute(point!(x: 0.0, y: 95.0), B, 30.0, 3.0)
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidCoord { .. }));
        assert_eq!(cache.elevation.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_height_is_rejected() {
        let cache = ProfileCache::new(MemStore::new(), Counting::default());
        let err = cache.get_or_compute(A, B, f64::NAN, 3.0).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidHeight(_)));
        assert!(cache.store().is_empty());
        assert_eq!(cache.elevation.calls.load(Ordering::SeqCst), 0);
    }
}
