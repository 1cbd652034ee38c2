//! The persisted annotation document
//!
//! One YAML file per movie, written next to it as `<stem>_analysis.yaml`,
//! holding the chamber ROIs, the animal ROIs and the nested job-config
//! values. Saving overwrites the whole file; loading a file that is not
//! there is the ordinary first-session state, not an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::domain::{Roi, RoiCollection, RoiKind};
use crate::keypath::FormTree;
use crate::{Error, Result};

/// Struct-of-arrays form of one ROI collection.
///
/// Five parallel sequences plus their shared length; index `i` across all of
/// them describes one ROI, in collection insertion order. `centers` is
/// derivable from the other four and recomputed at save time — it stays in
/// the file so downstream consumers don't have to redo the rotation math.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiSet {
    pub nb_rois: usize,
    pub positions: Vec<(f64, f64)>,
    pub sizes: Vec<(f64, f64)>,
    pub angles: Vec<f64>,
    pub geometries: Vec<RoiKind>,
    pub centers: Vec<(f64, f64)>,
}

impl RoiSet {
    /// Serialize a collection, walking it in insertion order.
    pub fn from_rois(rois: &RoiCollection) -> Self {
        Self {
            nb_rois: rois.nb_rois(),
            positions: rois.iter().map(|r| r.position).collect(),
            sizes: rois.iter().map(|r| r.size).collect(),
            angles: rois.iter().map(|r| r.angle).collect(),
            geometries: rois.iter().map(|r| r.kind()).collect(),
            centers: rois.iter().map(|r| r.center()).collect(),
        }
    }

    /// Re-instantiate the ROIs, index by index, into a fresh collection.
    ///
    /// All five sequences must have exactly `nb_rois` entries; a shorter or
    /// longer one is rejected rather than truncated or padded.
    pub fn to_rois(&self) -> Result<RoiCollection> {
        self.check_len("positions", self.positions.len())?;
        self.check_len("sizes", self.sizes.len())?;
        self.check_len("angles", self.angles.len())?;
        self.check_len("geometries", self.geometries.len())?;
        self.check_len("centers", self.centers.len())?;
        Ok((0..self.nb_rois)
            .map(|i| {
                Roi::new(
                    self.geometries[i],
                    self.positions[i],
                    self.sizes[i],
                    self.angles[i],
                )
            })
            .collect())
    }

    fn check_len(&self, field: &'static str, found: usize) -> Result<()> {
        if found == self.nb_rois {
            Ok(())
        } else {
            Err(Error::RoundTripMismatch {
                field,
                expected: self.nb_rois,
                found,
            })
        }
    }
}

/// The whole annotation state as written to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    #[serde(rename = "Chambers")]
    pub chambers: RoiSet,
    #[serde(rename = "Animals")]
    pub animals: RoiSet,
    /// Nested job-config values (the flat form values after unflattening).
    #[serde(rename = "Jobs")]
    pub jobs: Value,
}

impl AnnotationDocument {
    /// Capture the current annotation state.
    ///
    /// Centers are recomputed from the live ROIs; the flat form values are
    /// nested through the key-path codec before they land in `Jobs`.
    pub fn build(chambers: &RoiCollection, animals: &RoiCollection, jobs: &FormTree) -> Self {
        Self {
            chambers: RoiSet::from_rois(chambers),
            animals: RoiSet::from_rois(animals),
            jobs: jobs.to_value(),
        }
    }

    /// Rebuild the in-memory state: both ROI collections in their original
    /// insertion order, and the job values re-flattened for the form layer.
    pub fn restore(&self) -> Result<(RoiCollection, RoiCollection, FormTree)> {
        Ok((
            self.chambers.to_rois()?,
            self.animals.to_rois()?,
            FormTree::from_value(&self.jobs),
        ))
    }

    /// Path of the annotation document belonging to `movie`:
    /// `<stem>_analysis.yaml` in the movie's directory.
    pub fn path_for(movie: &Path) -> PathBuf {
        let stem = movie
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        movie.with_file_name(format!("{stem}_analysis.yaml"))
    }

    /// Load the document at `path`; `Ok(None)` when no file exists yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        log::info!("loading from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let doc = serde_yaml::from_str(&text).map_err(|source| Error::MalformedDocument {
            path: path.to_owned(),
            source,
        })?;
        Ok(Some(doc))
    }

    /// Load the document belonging to `movie`, if any.
    pub fn load_for_movie(movie: &Path) -> Result<Option<Self>> {
        Self::load(&Self::path_for(movie))
    }

    /// Write the document to `path`, replacing any previous file wholesale.
    pub fn save(&self, path: &Path) -> Result<()> {
        log::info!("saving to {}", path.display());
        let text = serde_yaml::to_string(self).map_err(|source| Error::MalformedDocument {
            path: path.to_owned(),
            source,
        })?;
        fs::write(path, text).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Write the document next to `movie`.
    pub fn save_for_movie(&self, movie: &Path) -> Result<()> {
        self.save(&Self::path_for(movie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn sample_chambers() -> RoiCollection {
        let mut rois = RoiCollection::new();
        rois.add(Roi::with_size(RoiKind::Rectangle, (10.0, 20.0), (200.0, 100.0)));
        rois.add(Roi::new(RoiKind::Ellipse, (50.0, 60.0), (80.0, 80.0), 45.0));
        rois.add(Roi::new(RoiKind::Led, (5.0, 5.0), (12.0, 12.0), 180.0));
        rois
    }

    fn sample_animals() -> RoiCollection {
        let mut rois = RoiCollection::new();
        rois.add(Roi::point((100.0, 100.0)));
        rois.add(Roi::point((130.0, 90.0)));
        rois
    }

    fn sample_jobs() -> FormTree {
        let mut jobs = FormTree::new();
        jobs.insert("main.profile", Value::from("default.yaml"));
        jobs.insert("main.frames", Value::from(1000));
        jobs.insert("verbose", Value::from(true));
        jobs
    }

    #[test]
    fn test_document_round_trip_in_memory() {
        let chambers = sample_chambers();
        let animals = sample_animals();
        let jobs = sample_jobs();

        let doc = AnnotationDocument::build(&chambers, &animals, &jobs);
        let (chambers2, animals2, jobs2) = doc.restore().unwrap();
        assert_eq!(chambers2, chambers);
        assert_eq!(animals2, animals);
        assert_eq!(jobs2.to_flat(), jobs.to_flat());
    }

    #[test]
    fn test_centers_are_recomputed_at_save() {
        let chambers = sample_chambers();
        let doc = AnnotationDocument::build(&chambers, &RoiCollection::new(), &FormTree::new());
        assert_eq!(doc.chambers.nb_rois, 3);
        for (roi, center) in chambers.iter().zip(&doc.chambers.centers) {
            let expected = roi.center();
            assert!((center.0 - expected.0).abs() < 1e-9);
            assert!((center.1 - expected.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_document_round_trip_through_file() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let movie = dir.path().join("exp1.avi");
        let path = AnnotationDocument::path_for(&movie);
        assert_eq!(path, dir.path().join("exp1_analysis.yaml"));

        let doc = AnnotationDocument::build(&sample_chambers(), &sample_animals(), &sample_jobs());
        doc.save_for_movie(&movie).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Chambers:"));
        assert!(text.contains("Animals:"));
        assert!(text.contains("Jobs:"));
        assert!(text.contains("rectangle"));
        assert!(text.contains("led"));

        let loaded = AnnotationDocument::load_for_movie(&movie).unwrap().unwrap();
        let (chambers, animals, jobs) = loaded.restore().unwrap();
        let kinds: Vec<_> = chambers.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, [RoiKind::Rectangle, RoiKind::Ellipse, RoiKind::Led]);
        assert_eq!(chambers, sample_chambers());
        assert_eq!(animals, sample_animals());
        assert_eq!(jobs.to_flat(), sample_jobs().to_flat());
    }

    #[test]
    fn test_missing_document_is_first_session_state() {
        let dir = tempfile::tempdir().unwrap();
        let movie = dir.path().join("never_annotated.avi");
        assert!(AnnotationDocument::load_for_movie(&movie).unwrap().is_none());
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp1_analysis.yaml");
        std::fs::write(&path, "Chambers: [not: valid\n").unwrap();
        assert!(matches!(
            AnnotationDocument::load(&path),
            Err(Error::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let set = RoiSet {
            nb_rois: 3,
            positions: vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)],
            sizes: vec![(10.0, 10.0), (10.0, 10.0)],
            angles: vec![0.0, 0.0, 0.0],
            geometries: vec![RoiKind::Rectangle, RoiKind::Rectangle, RoiKind::Rectangle],
            centers: vec![(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)],
        };
        match set.to_rois() {
            Err(Error::RoundTripMismatch {
                field,
                expected,
                found,
            }) => {
                assert_eq!(field, "sizes");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected RoundTripMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_centers_do_not_affect_restore() {
        // centers in the file are advisory; restore derives its own
        let mut set = RoiSet::from_rois(&sample_chambers());
        set.centers = vec![(0.0, 0.0); set.nb_rois];
        let rois = set.to_rois().unwrap();
        assert_eq!(rois, sample_chambers());
    }

    #[test]
    fn test_empty_document() {
        let doc = AnnotationDocument::build(
            &RoiCollection::new(),
            &RoiCollection::new(),
            &FormTree::new(),
        );
        let (chambers, animals, jobs) = doc.restore().unwrap();
        assert!(chambers.is_empty());
        assert!(animals.is_empty());
        assert!(jobs.is_empty());
    }
}
