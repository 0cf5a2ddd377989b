//! Block partitioning.
//!
//! A grid splits the image into `columns x rows` equally sized blocks of
//! `floor(width / columns) x floor(height / rows)` pixels. Pixels past the
//! last full block on the right and bottom edges belong to no block.
//!
//! Every block is *sampled* one pixel narrower and one pixel shorter than
//! its nominal size: the sampling rectangle of block `(col, row)` is
//! `(col * bw, row * bh, bw - 1, bh - 1)`. The last column and row of each
//! block are therefore never read. This is deliberate and must stay in place
//! for results to line up with previously recorded comparisons.

use crate::error::{CompareError, Result};

/// Grid coordinate of a block. Orders row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockCoord {
    pub row: u32,
    pub col: u32,
}

impl BlockCoord {
    pub fn new(col: u32, row: u32) -> Self {
        BlockCoord { row, col }
    }
}

impl std::fmt::Display for BlockCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub coord: BlockCoord,
    /// Nominal footprint of the block.
    pub bounds: Rect,
}

impl Block {
    /// The region actually read when estimating brightness.
    pub fn sample_rect(&self) -> Rect {
        Rect {
            width: self.bounds.width - 1,
            height: self.bounds.height - 1,
            ..self.bounds
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    block_width: u32,
    block_height: u32,
}

pub fn partition(width: u32, height: u32, columns: u32, rows: u32) -> Result<Grid> {
    if columns == 0 || rows == 0 {
        return Err(CompareError::invalid(format!(
            "grid must have at least one column and one row, got {}x{}",
            columns, rows
        )));
    }

    let block_width = width / columns;
    let block_height = height / rows;
    if block_width == 0 || block_height == 0 {
        return Err(CompareError::invalid(format!(
            "a {}x{} grid is finer than the {}x{} image",
            columns, rows, width, height
        )));
    }
    if block_width == 1 || block_height == 1 {
        return Err(CompareError::invalid(format!(
            "{}x{} blocks leave an empty sampling rectangle",
            block_width, block_height
        )));
    }

    Ok(Grid {
        columns,
        rows,
        block_width,
        block_height,
    })
}

impl Grid {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn block_width(&self) -> u32 {
        self.block_width
    }

    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    pub fn len(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block(&self, coord: BlockCoord) -> Option<Block> {
        if coord.col >= self.columns || coord.row >= self.rows {
            return None;
        }
        Some(Block {
            coord,
            bounds: Rect {
                x: coord.col * self.block_width,
                y: coord.row * self.block_height,
                width: self.block_width,
                height: self.block_height,
            },
        })
    }

    /// All blocks, row by row.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).filter_map(move |col| self.block(BlockCoord::new(col, row)))
        })
    }
}
