//! Capture zone data types
//!
//! A capture zone is a named rectangle in unscaled image coordinates plus an
//! optional fuzzy-matching policy. Zones are defined once in the region editor
//! and applied uniformly to every image in a batch.

/// Axis-aligned rectangle in unscaled (zoom = 1) image pixel coordinates.
///
/// May be non-normalized (x1 > x2 or y1 > y2) while a drag is in progress;
/// committed rects always satisfy x1 <= x2 and y1 <= y2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One of a rectangle's four corner handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners, in handle hit-test order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner (the one that stays fixed during a resize).
    pub fn opposite(&self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

impl ZoneRect {
    /// Degenerate rect anchored at a single point (start of a Drawing drag).
    pub fn at_point(x: f32, y: f32) -> Self {
        Self { x1: x, y1: y, x2: x, y2: y }
    }

    pub fn from_points(a: (f32, f32), b: (f32, f32)) -> Self {
        Self { x1: a.0, y1: a.1, x2: b.0, y2: b.1 }
    }

    /// Swap coordinates as needed so x1 <= x2 and y1 <= y2.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    /// Point-in-rect test against the normalized bounds.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let r = self.normalized();
        x >= r.x1 && x <= r.x2 && y >= r.y1 && y <= r.y2
    }

    /// Position of a corner on the normalized bounds.
    pub fn corner(&self, corner: Corner) -> (f32, f32) {
        let r = self.normalized();
        match corner {
            Corner::TopLeft => (r.x1, r.y1),
            Corner::TopRight => (r.x2, r.y1),
            Corner::BottomLeft => (r.x1, r.y2),
            Corner::BottomRight => (r.x2, r.y2),
        }
    }

    /// Rebuild the rect with `corner` at `pos` and the opposite corner fixed.
    ///
    /// The result may be non-normalized when the drag crosses the fixed
    /// corner; commit-time normalization handles that.
    pub fn with_corner_at(&self, corner: Corner, pos: (f32, f32)) -> Self {
        let fixed = self.corner(corner.opposite());
        Self::from_points(fixed, pos)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }
}

/// Fuzzy-matching behavior for text recognized from a zone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Keep the recognized text as-is.
    #[default]
    None,
    /// Replace the recognized text with the closest entry from the named
    /// reference list, falling back to the raw text below the threshold.
    ReferenceList(String),
}

/// A finalized, named capture region.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureZone {
    /// Logical field name (e.g. "Card Name"). The first-defined zone is the
    /// primary zone used for output filenames.
    pub name: String,
    /// Committed rectangle, normalized, in unscaled image coordinates.
    pub rect: ZoneRect,
    /// Optional fuzzy-matching policy.
    pub match_policy: MatchPolicy,
}
