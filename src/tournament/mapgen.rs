//! Deterministic map generation for tournaments.

// Map generation uses intentional casts for coordinate/RNG operations
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use thiserror::Error;

use crate::game::{MapError, MapModel, MapSpec};

/// Fraction of non-path tiles that are blocked.
const BLOCKED_DENSITY: f64 = 0.08;

/// Chance that the path turns at a given column.
const TURN_CHANCE: f64 = 0.35;

/// Deterministic PRNG using xorshift64.
#[derive(Debug, Clone, Copy)]
struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed.
    const fn new(seed: u64) -> Self {
        // Ensure non-zero state
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    /// Generate next random u64.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate random u32 in [0, max).
    fn next_u32(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(max)) as u32
    }

    /// Generate random f64 in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }
}

/// Error type for map generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapGenError {
    /// Too small to hold a path and somewhere to build.
    #[error("map {width}x{height} is too small (need at least 4x3)")]
    TooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The generated map failed validation.
    #[error("generated map is invalid: {0}")]
    Invalid(#[from] MapError),
}

/// Generate a map from a seed.
///
/// The path enters on the left edge and leaves on the right. It moves one
/// column right at a time and sometimes turns vertically first, so it never
/// crosses itself. The outer rows stay free of path.
///
/// # Errors
///
/// Returns an error if the dimensions are too small.
pub fn generate_map(seed: u64, width: u32, height: u32) -> Result<MapModel, MapGenError> {
    if width < 4 || height < 3 {
        return Err(MapGenError::TooSmall { width, height });
    }
    let mut rng = Rng::new(seed);

    let top = 1;
    let bottom = height as i32 - 2;
    let mut y = top + rng.next_u32((bottom - top + 1) as u32) as i32;

    let mut path = Vec::new();
    for x in 0..width as i32 {
        path.push((x, y));
        if x + 1 < width as i32 && rng.next_f64() < TURN_CHANCE {
            let target = top + rng.next_u32((bottom - top + 1) as u32) as i32;
            while y != target {
                y += (target - y).signum();
                path.push((x, y));
            }
        }
    }

    let mut blocked = Vec::new();
    for by in 0..height as i32 {
        for bx in 0..width as i32 {
            let roll = rng.next_f64();
            if roll < BLOCKED_DENSITY && !path.contains(&(bx, by)) {
                blocked.push((bx, by));
            }
        }
    }

    let spec = MapSpec {
        name: format!("seed-{seed}"),
        width,
        height,
        path,
        blocked,
    };
    Ok(MapModel::from_spec(&spec)?)
}
