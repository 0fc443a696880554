// SPDX-License-Identifier: MIT

//! Hex grid tiler: GPS point sequences to H3 cell sets.
//!
//! Low GPS sampling density can put consecutive points several cells
//! apart; the tiler bridges those gaps with a shortest cell-to-cell path
//! so a route never produces a broken chain of tiles.

use std::collections::HashSet;

use h3o::{CellIndex, LatLng, Resolution};

/// Converts coordinate sequences into fixed-resolution cell sets.
#[derive(Debug, Clone, Copy)]
pub struct HexTiler {
    resolution: Resolution,
}

impl HexTiler {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Cells traversed by a `(lat, lng)` point sequence.
    ///
    /// Non-finite points are dropped; an empty or fully-degenerate input
    /// yields an empty set rather than an error.
    pub fn cells_for_points(&self, points: &[(f64, f64)]) -> HashSet<CellIndex> {
        let mut cells = HashSet::new();
        let mut prev: Option<CellIndex> = None;

        for &(lat, lng) in points {
            let Ok(coord) = LatLng::new(lat, lng) else {
                continue;
            };
            let cell = coord.to_cell(self.resolution);

            match prev {
                Some(p) if p == cell => {}
                Some(p) if p.is_neighbor_with(cell).unwrap_or(false) => {
                    cells.insert(cell);
                }
                Some(p) => self.fill_gap(p, cell, &mut cells),
                None => {
                    cells.insert(cell);
                }
            }
            prev = Some(cell);
        }

        cells
    }

    /// Bridge two non-adjacent cells with every cell on a shortest grid
    /// path between them. If no path exists (disconnected IJ regions,
    /// pentagon distortion), keep the destination cell so the route
    /// continues instead of failing.
    fn fill_gap(&self, from: CellIndex, to: CellIndex, cells: &mut HashSet<CellIndex>) {
        match from.grid_path_cells(to) {
            Ok(path) => {
                for step in path {
                    match step {
                        Ok(cell) => {
                            cells.insert(cell);
                        }
                        Err(e) => {
                            tracing::debug!(%from, %to, error = %e, "Grid path broke mid-walk");
                            cells.insert(to);
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(%from, %to, error = %e, "No grid path between cells");
                cells.insert(to);
            }
        }
    }
}
