/**
 * RecTune
 * Copyright (C) 2026 The RecTune developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate fnv;

use std::cmp::Ordering;

use fnv::FnvHashSet;

use error::TuneError;

pub type DenseVector = Vec<f64>;

pub type UserSet = FnvHashSet<u32>;
pub type ItemSet = FnvHashSet<u32>;

/// Compressed sparse row matrix. Row access is direct, column access goes through
/// `transposed`. Matrices are immutable once built; every transformation returns
/// a new instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    num_rows: usize,
    num_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<f64>,
}

impl SparseMatrix {

    /// Builds a matrix from unsorted (row, column, value) triples. Duplicate
    /// coordinates are summed.
    pub fn from_triples(num_rows: usize, num_cols: usize, triples: &[(u32, u32, f64)]) -> Self {

        let mut sorted: Vec<(u32, u32, f64)> = triples.to_vec();
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut indptr = vec![0; num_rows + 1];
        let mut indices: Vec<u32> = Vec::with_capacity(sorted.len());
        let mut data: Vec<f64> = Vec::with_capacity(sorted.len());

        let mut current_row = 0_usize;
        for &(row, col, value) in sorted.iter() {

            while current_row < row as usize {
                current_row += 1;
                indptr[current_row] = indices.len();
            }

            if indices.len() > indptr[current_row] && *indices.last().unwrap() == col {
                *data.last_mut().unwrap() += value;
            } else {
                indices.push(col);
                data.push(value);
            }
        }

        while current_row < num_rows {
            current_row += 1;
            indptr[current_row] = indices.len();
        }

        SparseMatrix { num_rows, num_cols, indptr, indices, data }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn row(&self, row: usize) -> (&[u32], &[f64]) {
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        (&self.indices[start..end], &self.data[start..end])
    }

    pub fn row_nnz(&self, row: usize) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    pub fn triples(&self) -> Vec<(u32, u32, f64)> {
        let mut triples = Vec::with_capacity(self.nnz());
        for row in 0..self.num_rows {
            let (cols, values) = self.row(row);
            for (&col, &value) in cols.iter().zip(values.iter()) {
                triples.push((row as u32, col, value));
            }
        }
        triples
    }

    /// Column-major view of the same entries, computed by a counting sort over
    /// the column indices.
    pub fn transposed(&self) -> SparseMatrix {

        let mut indptr = vec![0; self.num_cols + 1];
        for &col in self.indices.iter() {
            indptr[col as usize + 1] += 1;
        }
        for col in 0..self.num_cols {
            indptr[col + 1] += indptr[col];
        }

        let mut next_slot = indptr.clone();
        let mut indices = vec![0_u32; self.nnz()];
        let mut data = vec![0.0; self.nnz()];

        for row in 0..self.num_rows {
            let (cols, values) = self.row(row);
            for (&col, &value) in cols.iter().zip(values.iter()) {
                let slot = next_slot[col as usize];
                indices[slot] = row as u32;
                data[slot] = value;
                next_slot[col as usize] += 1;
            }
        }

        SparseMatrix {
            num_rows: self.num_cols,
            num_cols: self.num_rows,
            indptr,
            indices,
            data,
        }
    }

    /// Stacks `top` over `bottom`. Both operands must agree on their column space.
    pub fn vstack(top: &SparseMatrix, bottom: &SparseMatrix) -> Result<SparseMatrix, TuneError> {

        if top.num_cols != bottom.num_cols {
            return Err(TuneError::ShapeMismatch(top.num_cols, bottom.num_cols));
        }

        let offset = *top.indptr.last().unwrap();

        let mut indptr = top.indptr.clone();
        indptr.extend(bottom.indptr[1..].iter().map(|&position| position + offset));

        let mut indices = top.indices.clone();
        indices.extend_from_slice(&bottom.indices);

        let mut data = top.data.clone();
        data.extend_from_slice(&bottom.data);

        Ok(SparseMatrix {
            num_rows: top.num_rows + bottom.num_rows,
            num_cols: top.num_cols,
            indptr,
            indices,
            data,
        })
    }

    /// Number of nonzero entries per column, e.g. document frequencies when rows
    /// are items and columns are features.
    pub fn column_counts(&self) -> Vec<u32> {
        let mut counts = vec![0_u32; self.num_cols];
        for &col in self.indices.iter() {
            counts[col as usize] += 1;
        }
        counts
    }

    /// Replaces every nonzero value v by 1 + alpha * v, the linear confidence
    /// weighting commonly applied to implicit feedback signals.
    pub fn linear_confidence(&self, alpha: f64) -> SparseMatrix {
        let mut scaled = self.clone();
        for value in scaled.data.iter_mut() {
            *value = 1.0 + alpha * *value;
        }
        scaled
    }
}

/// Entry used to maintain the top scored items inside a binary heap.
#[derive(PartialEq, Debug)]
pub struct ScoredItem {
    pub item: u32,
    pub score: f64,
}

/// Ordering for our max-heap. Note that we must use a special implementation here
/// as there is no total order on floating point numbers. The comparison is
/// reversed so that the heap top is always the lowest of the retained scores.
fn cmp_reverse(scored_item_a: &ScoredItem, scored_item_b: &ScoredItem) -> Ordering {
    match scored_item_a.score.partial_cmp(&scored_item_b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        Some(Ordering::Equal) => Ordering::Equal,
        None => Ordering::Equal,
    }
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}
