//! Map, tiles and the debris path.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A coordinate on the map.
///
/// Signed so strategy code can probe around edges without wrapping; anything
/// outside the map is simply not buildable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column).
    pub x: i32,
    /// Y coordinate (row).
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another coordinate.
    ///
    /// Tower ranges are stored squared, so combat never needs a square root.
    #[must_use]
    #[inline]
    pub const fn distance_sq(self, other: Coord) -> u64 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        dx * dx + dy * dy
    }

    /// Whether two coordinates share an edge.
    #[must_use]
    pub const fn is_adjacent(self, other: Coord) -> bool {
        self.distance_sq(other) == 1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What occupies a tile permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    /// Open ground. Towers can be built here.
    Space = 0,
    /// Part of the debris path.
    Path = 1,
    /// Permanently blocked (asteroid, wreck, ...).
    Blocked = 2,
}

/// Errors raised while building or loading a map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Width or height is zero.
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    ZeroSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The path has no tiles.
    #[error("map path is empty")]
    EmptyPath,
    /// A path or blocked tile lies outside the map.
    #[error("tile {0} is outside the map")]
    OutOfBounds(Coord),
    /// Two consecutive path tiles do not share an edge.
    #[error("path jumps from {from} to {to}")]
    PathNotContiguous {
        /// Previous path tile.
        from: Coord,
        /// Next path tile.
        to: Coord,
    },
    /// A path tile appears twice.
    #[error("path visits {0} more than once")]
    PathRepeats(Coord),
    /// A blocked tile sits on the path.
    #[error("blocked tile {0} lies on the path")]
    BlockedOnPath(Coord),
    /// The map document could not be parsed.
    #[error("malformed map document: {0}")]
    Parse(String),
    /// The map file could not be read.
    #[error("failed to read map {path}: {message}")]
    Io {
        /// File that failed.
        path: String,
        /// OS error message.
        message: String,
    },
}

/// Serialisable description of a map, as loaded from disk or stored in a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSpec {
    /// Map name, used in replay file names and reports.
    #[serde(default)]
    pub name: String,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Ordered debris path from spawn to the defended base.
    pub path: Vec<(i32, i32)>,
    /// Permanently blocked tiles.
    #[serde(default)]
    pub blocked: Vec<(i32, i32)>,
}

/// The immutable match map.
///
/// Loaded once, then shared read-only by the engine. Strategies get their own
/// clone so nothing they do can reach the engine's instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapModel {
    /// Map name.
    name: String,
    /// Width of the map in tiles.
    width: u32,
    /// Height of the map in tiles.
    height: u32,
    /// Tiles stored in row-major order.
    tiles: Vec<TileKind>,
    /// Debris path, start to base.
    path: Vec<Coord>,
}

impl MapModel {
    /// Build a validated map from its description.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero, the path is empty, leaves
    /// the map, repeats a tile or is not edge-connected, or if a blocked tile
    /// is out of bounds or on the path.
    pub fn from_spec(spec: &MapSpec) -> Result<Self, MapError> {
        if spec.width == 0 || spec.height == 0 {
            return Err(MapError::ZeroSize {
                width: spec.width,
                height: spec.height,
            });
        }
        if spec.path.is_empty() {
            return Err(MapError::EmptyPath);
        }

        let size = spec.width as usize * spec.height as usize;
        let mut map = Self {
            name: spec.name.clone(),
            width: spec.width,
            height: spec.height,
            tiles: vec![TileKind::Space; size],
            path: Vec::with_capacity(spec.path.len()),
        };

        let mut previous: Option<Coord> = None;
        for &(x, y) in &spec.path {
            let coord = Coord::new(x, y);
            let idx = map.coord_to_index(coord).ok_or(MapError::OutOfBounds(coord))?;
            if map.tiles[idx] == TileKind::Path {
                return Err(MapError::PathRepeats(coord));
            }
            if let Some(prev) = previous
                && !prev.is_adjacent(coord)
            {
                return Err(MapError::PathNotContiguous {
                    from: prev,
                    to: coord,
                });
            }
            map.tiles[idx] = TileKind::Path;
            map.path.push(coord);
            previous = Some(coord);
        }

        for &(x, y) in &spec.blocked {
            let coord = Coord::new(x, y);
            let idx = map.coord_to_index(coord).ok_or(MapError::OutOfBounds(coord))?;
            if map.tiles[idx] == TileKind::Path {
                return Err(MapError::BlockedOnPath(coord));
            }
            map.tiles[idx] = TileKind::Blocked;
        }

        Ok(map)
    }

    /// Parse a map from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the map is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, MapError> {
        let spec: MapSpec =
            serde_json::from_str(json).map_err(|e| MapError::Parse(e.to_string()))?;
        Self::from_spec(&spec)
    }

    /// Load a map from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the map is invalid.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let json = fs::read_to_string(path).map_err(|e| MapError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Describe this map in its serialisable form.
    #[must_use]
    pub fn to_spec(&self) -> MapSpec {
        let blocked = self
            .iter()
            .filter(|(_, kind)| *kind == TileKind::Blocked)
            .map(|(c, _)| (c.x, c.y))
            .collect();
        MapSpec {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            path: self.path.iter().map(|c| (c.x, c.y)).collect(),
            blocked,
        }
    }

    /// Get the map name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the width of the map.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of the map.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The ordered debris path.
    #[must_use]
    pub fn path(&self) -> &[Coord] {
        &self.path
    }

    /// Number of tiles on the path. Debris reaching this index hits the base.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn path_length(&self) -> u32 {
        self.path.len() as u32
    }

    /// Tile of the path at a progress index, if still on the path.
    #[must_use]
    pub fn path_tile(&self, progress: u32) -> Option<Coord> {
        self.path.get(progress as usize).copied()
    }

    /// Check if a coordinate is within the map bounds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    /// Convert a coordinate to an index into the tiles array.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    fn coord_to_index(&self, coord: Coord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Get the tile kind at a coordinate.
    #[must_use]
    pub fn tile(&self, coord: Coord) -> Option<TileKind> {
        self.coord_to_index(coord).map(|idx| self.tiles[idx])
    }

    /// True iff the tile is in bounds, not blocked, and not on the path.
    #[must_use]
    pub fn is_space(&self, x: i32, y: i32) -> bool {
        self.tile(Coord::new(x, y)) == Some(TileKind::Space)
    }

    /// Iterate over all coordinates and tiles in row-major order.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn iter(&self) -> impl Iterator<Item = (Coord, TileKind)> + '_ {
        let width = self.width as usize;
        self.tiles.iter().enumerate().map(move |(idx, kind)| {
            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            (Coord::new(x, y), *kind)
        })
    }

    /// Iterate over every buildable coordinate.
    pub fn spaces(&self) -> impl Iterator<Item = Coord> + '_ {
        self.iter()
            .filter(|(_, kind)| *kind == TileKind::Space)
            .map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_spec() -> MapSpec {
        MapSpec {
            name: "straight".to_string(),
            width: 5,
            height: 3,
            path: (0..5).map(|x| (x, 1)).collect(),
            blocked: vec![(0, 0)],
        }
    }

    #[test]
    fn test_coord_distance_sq() {
        assert_eq!(Coord::new(0, 0).distance_sq(Coord::new(3, 4)), 25);
        assert_eq!(Coord::new(-1, 2).distance_sq(Coord::new(1, 2)), 4);
    }

    #[test]
    fn test_coord_adjacency() {
        let origin = Coord::new(5, 5);
        assert!(origin.is_adjacent(Coord::new(5, 4)));
        assert!(origin.is_adjacent(Coord::new(6, 5)));
        assert!(!origin.is_adjacent(Coord::new(6, 6)));
        assert!(!origin.is_adjacent(origin));
    }

    #[test]
    fn test_map_from_spec() {
        let map = MapModel::from_spec(&straight_spec()).unwrap();
        assert_eq!(map.width(), 5);
        assert_eq!(map.height(), 3);
        assert_eq!(map.path_length(), 5);
        assert_eq!(map.path_tile(0), Some(Coord::new(0, 1)));
        assert_eq!(map.path_tile(5), None);
    }

    #[test]
    fn test_is_space() {
        let map = MapModel::from_spec(&straight_spec()).unwrap();
        assert!(map.is_space(1, 0));
        assert!(map.is_space(4, 2));
        // Blocked
        assert!(!map.is_space(0, 0));
        // Path
        assert!(!map.is_space(2, 1));
        // Out of bounds
        assert!(!map.is_space(-1, 0));
        assert!(!map.is_space(5, 0));
        assert!(!map.is_space(0, 3));
    }

    #[test]
    fn test_map_zero_size() {
        let mut spec = straight_spec();
        spec.width = 0;
        assert!(matches!(
            MapModel::from_spec(&spec),
            Err(MapError::ZeroSize { .. })
        ));
    }

    #[test]
    fn test_path_must_be_contiguous() {
        let mut spec = straight_spec();
        spec.path = vec![(0, 1), (2, 1)];
        assert_eq!(
            MapModel::from_spec(&spec),
            Err(MapError::PathNotContiguous {
                from: Coord::new(0, 1),
                to: Coord::new(2, 1)
            })
        );
    }

    #[test]
    fn test_path_must_not_repeat() {
        let mut spec = straight_spec();
        spec.path = vec![(0, 1), (1, 1), (0, 1)];
        assert_eq!(
            MapModel::from_spec(&spec),
            Err(MapError::PathRepeats(Coord::new(0, 1)))
        );
    }

    #[test]
    fn test_blocked_on_path_rejected() {
        let mut spec = straight_spec();
        spec.blocked = vec![(3, 1)];
        assert_eq!(
            MapModel::from_spec(&spec),
            Err(MapError::BlockedOnPath(Coord::new(3, 1)))
        );
    }

    #[test]
    fn test_spec_roundtrip_preserves_map() {
        let map = MapModel::from_spec(&straight_spec()).unwrap();
        let rebuilt = MapModel::from_spec(&map.to_spec()).unwrap();
        assert_eq!(map, rebuilt);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"name":"tiny","width":3,"height":2,"path":[[0,0],[1,0],[2,0]]}"#;
        let map = MapModel::from_json_str(json).unwrap();
        assert_eq!(map.name(), "tiny");
        assert_eq!(map.spaces().count(), 3);

        assert!(matches!(
            MapModel::from_json_str("{not json"),
            Err(MapError::Parse(_))
        ));
    }
}
