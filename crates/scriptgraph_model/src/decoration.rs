// SPDX-License-Identifier: MIT OR Apache-2.0
//! Decorative elements: placemats and sticky notes.
//!
//! Neither carries ports. Placemats are drawn behind nodes in `z_order`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a placemat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacematId(pub Uuid);

impl PlacematId {
    /// Create a new random placemat ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlacematId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a sticky note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StickyNoteId(pub Uuid);

impl StickyNoteId {
    /// Create a new random sticky note ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StickyNoteId {
    fn default() -> Self {
        Self::new()
    }
}

/// Freeform grouping box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placemat {
    /// Unique ID
    pub id: PlacematId,
    /// Title shown in the header
    pub title: String,
    /// Top-left corner
    pub position: [f32; 2],
    /// Width and height
    pub size: [f32; 2],
    /// Stacking order; lower is drawn first
    pub z_order: i32,
    /// Whether the placemat hides its contents
    pub collapsed: bool,
    /// Soft-delete marker
    pub destroyed: bool,
}

impl Placemat {
    /// Create a placemat covering a rectangle
    pub fn new(title: impl Into<String>, position: [f32; 2], size: [f32; 2], z_order: i32) -> Self {
        Self {
            id: PlacematId::new(),
            title: title.into(),
            position,
            size,
            z_order,
            collapsed: false,
            destroyed: false,
        }
    }

    /// Whether a point lies inside the placemat
    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.position[0]
            && point[1] >= self.position[1]
            && point[0] <= self.position[0] + self.size[0]
            && point[1] <= self.position[1] + self.size[1]
    }
}

/// Free text annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickyNote {
    /// Unique ID
    pub id: StickyNoteId,
    /// Note contents
    pub text: String,
    /// Top-left corner
    pub position: [f32; 2],
    /// Width and height
    pub size: [f32; 2],
    /// Soft-delete marker
    pub destroyed: bool,
}

impl StickyNote {
    /// Create a sticky note
    pub fn new(text: impl Into<String>, position: [f32; 2]) -> Self {
        Self {
            id: StickyNoteId::new(),
            text: text.into(),
            position,
            size: [200.0, 160.0],
            destroyed: false,
        }
    }
}
