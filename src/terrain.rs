use std::ops::BitOr;

use crate::error::{Error, Result};

/// Bitmask over the basic terrain classes. A single-bit value is a tile's
/// terrain type; any non-empty combination is a capability an agent may hold.
/// Obstacles are not a class: an obstacle tile simply has no node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Terrain(pub u8);

pub const GROUND: Terrain = Terrain(0b01);
pub const TREES: Terrain = Terrain(0b10);

/// Number of basic classes in the default Ground/Trees world.
pub const NUM_BASIC_CLASSES: u32 = 2;

impl Terrain {
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every class in `self` is also in `other`.
    pub fn is_subset_of(self, other: Terrain) -> bool {
        self.0 & other.0 == self.0
    }
}

impl BitOr for Terrain {
    type Output = Terrain;
    fn bitor(self, rhs: Terrain) -> Terrain {
        Terrain(self.0 | rhs.0)
    }
}

/// All `2^n - 1` non-empty class subsets, in ascending mask order. With the
/// default two classes this is `[GROUND, TREES, GROUND|TREES]`.
pub fn capabilities(num_classes: u32) -> Vec<Terrain> {
    (1..(1u8 << num_classes)).map(Terrain).collect()
}

/// 2-D terrain grid: the map as handed to the engine. `None` is an obstacle.
#[derive(Clone, Debug)]
pub struct TerrainGrid {
    width: i32,
    height: i32,
    tiles: Vec<Option<Terrain>>,
}

impl TerrainGrid {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0);
        Self { width, height, tiles: vec![None; (width * height) as usize] }
    }

    /// Build a grid from character rows: `.` ground, `T` trees, `@` obstacle.
    /// Rows are top to bottom and must share one width; anything else is an
    /// `InvalidGrid` error.
    pub fn from_rows(rows: &[&str]) -> Result<Self> {
        let height = rows.len() as i32;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as i32;
        if width == 0 || height == 0 {
            return Err(Error::InvalidGrid("empty rows".into()));
        }
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            if row.len() as i32 != width {
                return Err(Error::InvalidGrid(format!(
                    "row {} has width {}, expected {}",
                    y,
                    row.len(),
                    width
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                let t = match ch {
                    '.' => Some(GROUND),
                    'T' => Some(TREES),
                    '@' => None,
                    other => {
                        return Err(Error::InvalidGrid(format!(
                            "unknown terrain char {:?} at ({},{})",
                            other, x, y
                        )))
                    }
                };
                grid.set(x as i32, y as i32, t);
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn set(&mut self, x: i32, y: i32, terrain: Option<Terrain>) {
        assert!(self.in_bounds(x, y));
        self.tiles[(y * self.width + x) as usize] = terrain;
    }

    /// Terrain at `(x, y)`; `None` for obstacles and out-of-bounds lookups.
    pub fn terrain_at(&self, x: i32, y: i32) -> Option<Terrain> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.tiles[(y * self.width + x) as usize]
    }
}
