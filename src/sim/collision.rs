//! Viewport bounds and circle overlap queries
//!
//! Every collider in the game is a circle; the viewport is centered on the
//! origin with y pointing up.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Visible world area, given as half extents around the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub half_width: f32,
    pub half_height: f32,
}

impl Viewport {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    /// Portrait phone-shaped default (9:16 at an orthographic size of 8)
    pub fn portrait() -> Self {
        Self::new(4.5, 8.0)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        -self.half_width
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.half_width
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.half_height
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        -self.half_height
    }

    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }
}

/// Resolve an optional viewport, falling back to zero bounds
pub fn viewport_or_default(viewport: Option<Viewport>) -> Viewport {
    match viewport {
        Some(viewport) => viewport,
        None => {
            log::warn!("No viewport bound, using zero bounds");
            Viewport::new(0.0, 0.0)
        }
    }
}

/// Whether two circles touch or overlap
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_squared(b) <= reach * reach
}

/// Items whose circle overlaps the query circle, in input order
pub fn overlap_circle<K: Copy>(
    center: Vec2,
    radius: f32,
    candidates: impl IntoIterator<Item = (K, Vec2, f32)>,
) -> Vec<K> {
    candidates
        .into_iter()
        .filter(|&(_, position, candidate_radius)| {
            circles_overlap(center, radius, position, candidate_radius)
        })
        .map(|(key, _, _)| key)
        .collect()
}

/// Reflect horizontal travel off the viewport side walls.
///
/// Returns the corrected x position and direction (-1 or 1). Only flips when
/// the collider is past a wall and still moving toward it.
pub fn bounce_horizontal(x: f32, half_extent: f32, direction: f32, viewport: &Viewport) -> (f32, f32) {
    if x - half_extent <= viewport.left() && direction < 0.0 {
        (viewport.left() + half_extent, 1.0)
    } else if x + half_extent >= viewport.right() && direction > 0.0 {
        (viewport.right() - half_extent, -1.0)
    } else {
        (x, direction)
    }
}
