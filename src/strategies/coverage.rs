//! Per-tile path coverage, computed once per match.

use crate::game::{Coord, MapModel, TowerCatalog, TowerType};

/// How many path tiles a gunship or bomber on each buildable tile could hit.
#[derive(Debug, Clone)]
pub struct Coverage {
    width: u32,
    height: u32,
    gunship: Vec<u32>,
    bomber: Vec<u32>,
}

impl Coverage {
    /// Build the table for `map`.
    #[must_use]
    pub fn new(map: &MapModel, catalog: &TowerCatalog) -> Self {
        let size = (map.width() * map.height()) as usize;
        let mut coverage = Self {
            width: map.width(),
            height: map.height(),
            gunship: vec![0; size],
            bomber: vec![0; size],
        };

        for kind in [TowerType::Gunship, TowerType::Bomber] {
            let stats = catalog.stats(kind);
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let reach = stats.range.isqrt() as i32;
            for &tile in map.path() {
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let spot = Coord::new(tile.x + dx, tile.y + dy);
                        if !map.is_space(spot.x, spot.y) || !stats.in_range(spot, tile) {
                            continue;
                        }
                        if let Some(i) = coverage.index(spot)
                            && let Some(table) = coverage.table_mut(kind)
                        {
                            table[i] += 1;
                        }
                    }
                }
            }
        }
        coverage
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        let x = u32::try_from(coord.x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(coord.y).ok().filter(|&y| y < self.height)?;
        Some((y * self.width + x) as usize)
    }

    /// Coverage table of a firing tower kind.
    fn table(&self, kind: TowerType) -> Option<&[u32]> {
        match kind {
            TowerType::Gunship => Some(&self.gunship),
            TowerType::Bomber => Some(&self.bomber),
            TowerType::SolarFarm | TowerType::Reinforcer => None,
        }
    }

    fn table_mut(&mut self, kind: TowerType) -> Option<&mut [u32]> {
        match kind {
            TowerType::Gunship => Some(&mut self.gunship),
            TowerType::Bomber => Some(&mut self.bomber),
            TowerType::SolarFarm | TowerType::Reinforcer => None,
        }
    }

    /// Path tiles a tower of `kind` at `coord` would cover. Zero for
    /// towers that never fire.
    #[must_use]
    pub fn score(&self, kind: TowerType, coord: Coord) -> u32 {
        match (self.index(coord), self.table(kind)) {
            (Some(i), Some(table)) => table[i],
            _ => 0,
        }
    }

    /// Unclaimed tile with the highest coverage; ties go to the first in
    /// row-major order. `None` once nothing useful is left.
    #[must_use]
    pub fn best(&self, kind: TowerType) -> Option<Coord> {
        let table = self.table(kind)?;
        let (i, &score) = table
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, score)| *score)?;
        if score == 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let coord = Coord::new(
            (i as u32 % self.width) as i32,
            (i as u32 / self.width) as i32,
        );
        Some(coord)
    }

    /// Mark a tile as used for every tower kind.
    pub fn claim(&mut self, coord: Coord) {
        if let Some(i) = self.index(coord) {
            self.gunship[i] = 0;
            self.bomber[i] = 0;
        }
    }
}
