use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A point on the render surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Resolves a pointer coordinate to the tile under it.
///
/// The selection engine only ever sees tile indices; anything that knows
/// where tiles are drawn can implement this and be handed to a session.
pub trait TileLocator: Send + Sync {
    /// Tile under `point`, if any
    fn tile_at(&self, point: Point) -> Option<usize>;

    /// Centre of `tile` on the surface
    fn tile_center(&self, tile: usize) -> Option<Point>;

    /// Polyline for the connecting line: the centre of each selected tile,
    /// followed by the live pointer while a gesture is in progress.
    fn connector_points(&self, path: &[usize], live_pointer: Option<Point>) -> Vec<Point> {
        path.iter()
            .filter_map(|&tile| self.tile_center(tile))
            .chain(live_pointer)
            .collect()
    }
}

/// Letters laid out evenly on a circle, tile 0 at twelve o'clock, going clockwise.
#[derive(Debug, Clone)]
pub struct RingLayout {
    tile_radius: f32,
    centers: Vec<Point>,
}

impl RingLayout {
    /// Surface is 300x300 with the ring centred on it
    pub const DEFAULT_CENTER: Point = Point { x: 150.0, y: 150.0 };
    pub const DEFAULT_RADIUS: f32 = 120.0;
    /// Tiles are 64px discs
    pub const DEFAULT_TILE_RADIUS: f32 = 32.0;

    pub fn new(tile_count: usize, center: Point, radius: f32, tile_radius: f32) -> Self {
        let centers = (0..tile_count)
            .map(|i| {
                let angle = (i as f32 / tile_count as f32) * 2.0 * PI - PI / 2.0;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();

        Self {
            tile_radius,
            centers,
        }
    }

    pub fn with_defaults(tile_count: usize) -> Self {
        Self::new(
            tile_count,
            Self::DEFAULT_CENTER,
            Self::DEFAULT_RADIUS,
            Self::DEFAULT_TILE_RADIUS,
        )
    }
}

impl TileLocator for RingLayout {
    fn tile_at(&self, point: Point) -> Option<usize> {
        let hit_radius_sq = self.tile_radius * self.tile_radius;

        // Small rings can overlap; the nearest centre wins
        self.centers
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.distance_squared(point)))
            .filter(|&(_, d)| d <= hit_radius_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    fn tile_center(&self, tile: usize) -> Option<Point> {
        self.centers.get(tile).copied()
    }
}
