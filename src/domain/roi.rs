//! Region-of-interest shapes and their rotation-aware center math
//!
//! All coordinates are in frame pixels, x right, y down. An ROI stores its
//! anchor position (the shape's local origin, not its center), its size and a
//! rotation angle in degrees; the center is always derived, never stored.

use serde::{Deserialize, Serialize};

/// Default size given to a freshly placed point ROI.
pub const DEFAULT_POINT_SIZE: (f64, f64) = (20.0, 20.0);

/// Size given to the first chamber ROI; later chambers reuse the size of the
/// most recently drawn one.
pub const DEFAULT_CHAMBER_SIZE: (f64, f64) = (200.0, 200.0);

/// Closed set of ROI geometries.
///
/// `Led` is an ellipse that the GUI decorates with a different handle set;
/// the data model treats the two identically. `Point` is fixed-size: it has
/// no resize handles, and its stored `size` and `angle` are conventionally
/// ignored by consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiKind {
    Rectangle,
    Ellipse,
    Led,
    Point,
}

impl RoiKind {
    /// The geometry tag written to the annotation document.
    pub fn as_str(self) -> &'static str {
        match self {
            RoiKind::Rectangle => "rectangle",
            RoiKind::Ellipse => "ellipse",
            RoiKind::Led => "led",
            RoiKind::Point => "point",
        }
    }

    /// Whether this geometry can be resized after placement.
    pub fn is_fixed_size(self) -> bool {
        matches!(self, RoiKind::Point)
    }
}

impl std::fmt::Display for RoiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single region of interest.
///
/// The geometry kind is fixed at creation; position, size and angle are
/// mutated freely by the interaction layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    kind: RoiKind,
    pub position: (f64, f64),
    pub size: (f64, f64),
    pub angle: f64,
}

impl Roi {
    /// Create an ROI with an explicit angle in degrees.
    pub fn new(kind: RoiKind, position: (f64, f64), size: (f64, f64), angle: f64) -> Self {
        Self {
            kind,
            position,
            size,
            angle,
        }
    }

    /// Create an unrotated ROI.
    pub fn with_size(kind: RoiKind, position: (f64, f64), size: (f64, f64)) -> Self {
        Self::new(kind, position, size, 0.0)
    }

    /// Create a point ROI at the default point size.
    pub fn point(position: (f64, f64)) -> Self {
        Self::new(RoiKind::Point, position, DEFAULT_POINT_SIZE, 0.0)
    }

    pub fn kind(&self) -> RoiKind {
        self.kind
    }

    /// Center of the shape, derived from position, size and angle.
    ///
    /// The half-size vector is floor-divided component-wise before rotation
    /// (floor toward negative infinity, matching the integer pixel steps the
    /// drag handles snap to); for odd sizes the result is offset half a unit
    /// from the true geometric center. Downstream consumers depend on this,
    /// so it must not be "fixed" to a true midpoint.
    pub fn center(&self) -> (f64, f64) {
        let theta = self.angle.to_radians();
        let (sin, cos) = theta.sin_cos();
        let half = ((self.size.0 / 2.0).floor(), (self.size.1 / 2.0).floor());
        (
            self.position.0 + cos * half.0 - sin * half.1,
            self.position.1 + sin * half.0 + cos * half.1,
        )
    }
}

/// Insertion-ordered owning collection of ROIs.
///
/// The annotator keeps one collection per tab (chambers, animals); an ROI
/// belongs to exactly one collection and order is significant — it survives
/// a save/load round trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoiCollection {
    rois: Vec<Roi>,
}

impl RoiCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ROI, keeping insertion order.
    pub fn add(&mut self, roi: Roi) {
        self.rois.push(roi);
    }

    /// Remove the ROI at `index`, shifting later ones down.
    pub fn remove(&mut self, index: usize) -> Option<Roi> {
        if index < self.rois.len() {
            Some(self.rois.remove(index))
        } else {
            None
        }
    }

    pub fn nb_rois(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }

    pub fn as_slice(&self) -> &[Roi] {
        &self.rois
    }

    /// Size to give the next chamber: the last chamber's size, or the
    /// default when the collection is empty.
    pub fn next_chamber_size(&self) -> (f64, f64) {
        self.rois.last().map_or(DEFAULT_CHAMBER_SIZE, |r| r.size)
    }
}

impl FromIterator<Roi> for RoiCollection {
    fn from_iter<I: IntoIterator<Item = Roi>>(iter: I) -> Self {
        Self {
            rois: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RoiCollection {
    type Item = &'a Roi;
    type IntoIter = std::slice::Iter<'a, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.rois.iter()
    }
}
