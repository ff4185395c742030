//! The grid collaborator: culture storage and neighbour lookup by index.
//!
//! The diffusion core never reasons about lattice shape. It talks to the
//! grid only through [`CultureGrid`]: read a culture, overwrite a culture,
//! and list the neighbour indices of a cell. [`LatticeGrid`] is the plain
//! square-lattice adapter used by the engine and the tests.
//!
//! Cells are indexed row-major: index `row * width + col`.

use serde::Deserialize;

use crate::codec::Culture;

/// Errors raised by grid operations.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The index does not address a cell of the grid.
    #[error("cell index {index} out of bounds (grid has {cells} cells)")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of cells in the grid.
        cells: usize,
    },

    /// A supplied culture vector does not match `width * width`.
    #[error("expected {expected} cultures for the grid, got {actual}")]
    SizeMismatch {
        /// Required number of cells.
        expected: usize,
        /// Number of cultures supplied.
        actual: usize,
    },

    /// `width * width` does not fit in `usize`.
    #[error("grid width {width} is too large")]
    WidthOverflow {
        /// The requested width.
        width: usize,
    },
}

/// Capability set the core needs from the grid/topology engine.
pub trait CultureGrid {
    /// Side length of the square grid.
    fn width(&self) -> usize;

    /// Total number of cells (`width * width`).
    fn cell_count(&self) -> usize {
        self.width().saturating_mul(self.width())
    }

    /// Culture at `index`, or `None` if the index is out of bounds.
    fn culture(&self, index: usize) -> Option<Culture>;

    /// Overwrite the culture at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::IndexOutOfBounds`] for an invalid index.
    fn set_culture(&mut self, index: usize, culture: Culture) -> Result<(), GridError>;

    /// Indices of the cells adjacent to `index`. Empty for an invalid index.
    fn neighbours(&self, index: usize) -> Vec<usize>;
}

/// Which cells count as adjacent on the lattice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighbourhood {
    /// The eight surrounding cells.
    #[default]
    Moore,
    /// The four orthogonally adjacent cells.
    VonNeumann,
}

impl Neighbourhood {
    /// Row/column offsets for this neighbourhood.
    const fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Self::Moore => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
            Self::VonNeumann => &[(-1, 0), (0, -1), (0, 1), (1, 0)],
        }
    }
}

/// Square lattice without wraparound, storing one culture per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeGrid {
    width: usize,
    neighbourhood: Neighbourhood,
    cells: Vec<Culture>,
}

impl LatticeGrid {
    /// Create a `width x width` grid where every cell is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::WidthOverflow`] if the cell count overflows.
    pub fn new(width: usize, neighbourhood: Neighbourhood) -> Result<Self, GridError> {
        let cells = width
            .checked_mul(width)
            .ok_or(GridError::WidthOverflow { width })?;
        Ok(Self {
            width,
            neighbourhood,
            cells: vec![Culture::EMPTY; cells],
        })
    }

    /// Create a grid from explicit cultures in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] when `cultures.len()` is not
    /// `width * width`.
    pub fn from_cultures(
        width: usize,
        neighbourhood: Neighbourhood,
        cultures: Vec<Culture>,
    ) -> Result<Self, GridError> {
        let expected = width
            .checked_mul(width)
            .ok_or(GridError::WidthOverflow { width })?;
        if cultures.len() != expected {
            return Err(GridError::SizeMismatch {
                expected,
                actual: cultures.len(),
            });
        }
        Ok(Self {
            width,
            neighbourhood,
            cells: cultures,
        })
    }

    /// All cultures in row-major order.
    pub fn cultures(&self) -> &[Culture] {
        &self.cells
    }
}

impl CultureGrid for LatticeGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn culture(&self, index: usize) -> Option<Culture> {
        self.cells.get(index).copied()
    }

    fn set_culture(&mut self, index: usize, culture: Culture) -> Result<(), GridError> {
        let cells = self.cells.len();
        let slot = self
            .cells
            .get_mut(index)
            .ok_or(GridError::IndexOutOfBounds { index, cells })?;
        *slot = culture;
        Ok(())
    }

    fn neighbours(&self, index: usize) -> Vec<usize> {
        if index >= self.cells.len() || self.width == 0 {
            return Vec::new();
        }
        let row = index.checked_div(self.width).unwrap_or(0);
        let col = index.checked_rem(self.width).unwrap_or(0);

        self.neighbourhood
            .offsets()
            .iter()
            .filter_map(|&(dr, dc)| {
                let r = row.checked_add_signed(dr).filter(|r| *r < self.width)?;
                let c = col.checked_add_signed(dc).filter(|c| *c < self.width)?;
                r.checked_mul(self.width)?.checked_add(c)
            })
            .collect()
    }
}
