use glam::Vec3;

/// Number of cells along each axis of the spatial grid. Every component must be a non-zero power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSplit {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridSplit {
    /// Largest supported number of cells.
    pub const MAX_CELL_COUNT: u64 = 1 << 16;

    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Every split is a power of two and the grid holds at most [`GridSplit::MAX_CELL_COUNT`] cells.
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.x.is_power_of_two()
            && self.y.is_power_of_two()
            && self.z.is_power_of_two()
            && self.x as u64 * self.y as u64 * self.z as u64 <= Self::MAX_CELL_COUNT
    }

    #[inline(always)]
    pub fn cell_count(&self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }
}

impl Default for GridSplit {
    fn default() -> Self {
        Self::new(4, 4, 4)
    }
}

/// Integer coordinate of a cell in the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl CellCoord {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Index of the cell-batch this cell belongs to, built from the parity of each coordinate.
    #[inline(always)]
    pub fn cell_batch(&self) -> usize {
        ((self.x & 1) | ((self.y & 1) << 1) | ((self.z & 1) << 2)) as usize
    }
}

/// Spatial grid wrapping around the world with a fixed number of cells per axis.
///
/// Cells are grouped into [`CellGrid::CELL_BATCH_COUNT`] cell-batches. Two cells of the same cell-batch never touch,
/// including across the wrap-around, so their constraints can be processed concurrently.
#[derive(Clone, Debug, PartialEq)]
pub struct CellGrid {
    split: GridSplit,
    scale: f32,
    cell_batches: Vec<Vec<u32>>,
}

impl CellGrid {
    pub const CELL_BATCH_COUNT: usize = 8;

    /// Creates the grid. Cells span `objects_per_cell * average_object_extent` along every axis.
    pub fn new(split: GridSplit, average_object_extent: f32, objects_per_cell: f32) -> Self {
        debug_assert!(split.is_valid(), "Grid splits must be powers of two within the cell limit.");
        let mut cell_batches = vec![Vec::new(); Self::CELL_BATCH_COUNT];
        for cell in 0..split.cell_count() as u32 {
            let coord = Self::coord_from_index_with(split, cell);
            cell_batches[coord.cell_batch()].push(cell);
        }
        Self {
            split,
            scale: 1.0 / (objects_per_cell * average_object_extent),
            cell_batches,
        }
    }

    #[inline(always)]
    pub fn split(&self) -> GridSplit {
        self.split
    }

    #[inline(always)]
    pub fn cell_count(&self) -> usize {
        self.split.cell_count()
    }

    /// Quantizes a world position into a cell coordinate, wrapping around the grid.
    #[inline(always)]
    pub fn coord_of(&self, position: Vec3) -> CellCoord {
        let scaled = (position * self.scale).floor();
        let wrap = |value: f32, split: u32| ((value as i32) & (split as i32 - 1)) as u32;
        CellCoord::new(
            wrap(scaled.x, self.split.x),
            wrap(scaled.y, self.split.y),
            wrap(scaled.z, self.split.z),
        )
    }

    #[inline(always)]
    pub fn cell_index(&self, coord: CellCoord) -> u32 {
        coord.x + coord.y * self.split.x + coord.z * self.split.x * self.split.y
    }

    #[inline(always)]
    pub fn cell_of(&self, position: Vec3) -> u32 {
        self.cell_index(self.coord_of(position))
    }

    #[inline(always)]
    pub fn coord_from_index(&self, cell: u32) -> CellCoord {
        Self::coord_from_index_with(self.split, cell)
    }

    #[inline(always)]
    fn coord_from_index_with(split: GridSplit, cell: u32) -> CellCoord {
        CellCoord::new(
            cell % split.x,
            (cell / split.x) % split.y,
            cell / (split.x * split.y),
        )
    }

    /// Cells grouped by cell-batch. Cell-batches are processed in this order.
    #[inline(always)]
    pub fn cell_batches(&self) -> &[Vec<u32>] {
        &self.cell_batches
    }

    /// Returns true if two distinct cells share a face, edge or corner, taking the wrap-around into account.
    pub fn are_adjacent(&self, a: u32, b: u32) -> bool {
        if a == b {
            return false;
        }
        let a = self.coord_from_index(a);
        let b = self.coord_from_index(b);
        let near = |u: u32, v: u32, split: u32| {
            let distance = u.abs_diff(v);
            distance.min(split - distance) <= 1
        };
        near(a.x, b.x, self.split.x) && near(a.y, b.y, self.split.y) && near(a.z, b.z, self.split.z)
    }
}
