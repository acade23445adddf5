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
extern crate scoped_pool;
extern crate serde_json;

use std::collections::BinaryHeap;
use std::sync::Mutex;

use fnv::FnvHashMap;
use scoped_pool::Pool;

use error::TuneError;
use search::Point;
use types::{DenseVector, ScoredItem, SparseMatrix};

/// The capability the evaluation pipeline needs from a fitted model: a dense
/// score row per user, plus the training interactions for seen-item removal.
/// How a model arrives at its scores is its own business.
pub trait Recommender {
    fn num_items(&self) -> usize;
    fn compute_scores(&self, user: u32) -> DenseVector;
    fn urm_train(&self) -> &SparseMatrix;
}

/// Non-personalized baseline that scores every item by its global interaction
/// count. Cheap to fit, and a useful blending partner for content models.
pub struct PopularityRecommender {
    urm_train: SparseMatrix,
    item_counts: DenseVector,
}

impl PopularityRecommender {

    pub fn new(urm_train: SparseMatrix) -> Self {
        let item_counts = urm_train
            .column_counts()
            .iter()
            .map(|&count| count as f64)
            .collect();

        PopularityRecommender { urm_train, item_counts }
    }
}

impl Recommender for PopularityRecommender {

    fn num_items(&self) -> usize {
        self.urm_train.num_cols()
    }

    fn compute_scores(&self, _user: u32) -> DenseVector {
        self.item_counts.clone()
    }

    fn urm_train(&self) -> &SparseMatrix {
        &self.urm_train
    }
}

/// Per-block confidence scaling coefficients for a combined feature matrix:
/// the explicit attribute block and the interaction block may be weighted
/// differently before similarities are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockScaling {
    pub feature_alpha: f64,
    pub interaction_alpha: f64,
}

/// Hyperparameters of the item-knn model. `top_k` is inherently discrete and
/// gets rounded when the value arrives from a continuous search space.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnParams {
    pub top_k: usize,
    pub shrink: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKnnPoint {
    top_k: f64,
    shrink: f64,
}

impl KnnParams {

    /// Typed view of a maximizer point. Unknown names are rejected instead of
    /// silently ignored.
    pub fn from_point(point: &Point) -> Result<KnnParams, TuneError> {

        let as_value = serde_json::to_value(point)
            .map_err(|failure| TuneError::UnknownHyperparameter(failure.to_string()))?;

        let raw: RawKnnPoint = serde_json::from_value(as_value)
            .map_err(|failure| TuneError::UnknownHyperparameter(failure.to_string()))?;

        Ok(KnnParams {
            top_k: raw.top_k.round() as usize,
            shrink: raw.shrink,
        })
    }
}

/// Item-based nearest-neighbor model over a combined feature matrix. Fitting
/// computes a top-k pruned item-item cosine similarity matrix; scoring is the
/// sparse product of a user's training row with that matrix.
pub struct ItemKnnRecommender {
    urm_train: SparseMatrix,
    weights: SparseMatrix,
}

impl ItemKnnRecommender {

    /// Fits the similarity matrix from `combined`, a (features x items) matrix
    /// whose columns must align with the items of `urm_train`. Similarity rows
    /// are computed independently per item and fan out over a worker pool.
    pub fn fit(
        urm_train: SparseMatrix,
        combined: &SparseMatrix,
        params: &KnnParams,
        workers: usize,
    ) -> Result<ItemKnnRecommender, TuneError> {

        if params.top_k == 0 {
            return Err(TuneError::FitFailure("top_k must be positive".to_string()));
        }
        if params.shrink < 0.0 {
            return Err(TuneError::FitFailure("shrink must be non-negative".to_string()));
        }
        // a pool without workers would never run the queued similarity rows
        if workers == 0 {
            return Err(TuneError::FitFailure("need at least one worker".to_string()));
        }
        if combined.num_cols() != urm_train.num_cols() {
            return Err(TuneError::ShapeMismatch(combined.num_cols(), urm_train.num_cols()));
        }

        let num_items = combined.num_cols();
        let item_features = combined.transposed();

        let norms: Vec<f64> = (0..num_items)
            .map(|item| {
                let (_, values) = item_features.row(item);
                values.iter().map(|value| value * value).sum::<f64>().sqrt()
            })
            .collect();

        let mut neighbor_rows: Vec<Mutex<Vec<(u32, f64)>>> = Vec::with_capacity(num_items);
        for _ in 0..num_items {
            neighbor_rows.push(Mutex::new(Vec::with_capacity(params.top_k)));
        }

        let pool = Pool::new(workers);

        pool.scoped(|scope| {
            for item in 0..num_items as u32 {

                let reference_to_combined = combined;
                let reference_to_item_features = &item_features;
                let reference_to_norms = &norms;
                let neighbors_for_item = &neighbor_rows[item as usize];
                let top_k = params.top_k;
                let shrink = params.shrink;

                scope.execute(move || {
                    similarity_row(
                        item,
                        reference_to_combined,
                        reference_to_item_features,
                        reference_to_norms,
                        top_k,
                        shrink,
                        neighbors_for_item,
                    )
                });
            }
        });

        pool.shutdown();

        let mut triples: Vec<(u32, u32, f64)> = Vec::new();
        for (item, row) in neighbor_rows.iter().enumerate() {
            for &(other_item, similarity) in row.lock().unwrap().iter() {
                triples.push((item as u32, other_item, similarity));
            }
        }

        let weights = SparseMatrix::from_triples(num_items, num_items, &triples);

        Ok(ItemKnnRecommender { urm_train, weights })
    }

    pub fn weights(&self) -> &SparseMatrix {
        &self.weights
    }
}

fn similarity_row(
    item: u32,
    combined: &SparseMatrix,
    item_features: &SparseMatrix,
    norms: &[f64],
    top_k: usize,
    shrink: f64,
    neighbors: &Mutex<Vec<(u32, f64)>>,
) {

    let mut dot_products: FnvHashMap<u32, f64> =
        FnvHashMap::with_capacity_and_hasher(10, Default::default());

    let (features, values) = item_features.row(item as usize);
    for (&feature, &value) in features.iter().zip(values.iter()) {
        let (other_items, other_values) = combined.row(feature as usize);
        for (&other_item, &other_value) in other_items.iter().zip(other_values.iter()) {
            if other_item != item {
                *dot_products.entry(other_item).or_insert(0.0) += value * other_value;
            }
        }
    }

    let mut heap = BinaryHeap::with_capacity(top_k);

    for (other_item, dot_product) in dot_products {

        let denominator = norms[item as usize] * norms[other_item as usize] + shrink + 1e-6;
        let scored_item = ScoredItem { item: other_item, score: dot_product / denominator };

        if heap.len() < top_k {
            heap.push(scored_item);
        } else {
            let mut top = heap.peek_mut().unwrap();
            if scored_item < *top {
                *top = scored_item;
            }
        }
    }

    let mut row = neighbors.lock().unwrap();
    row.clear();
    for scored_item in heap {
        row.push((scored_item.item, scored_item.score));
    }
}

impl Recommender for ItemKnnRecommender {

    fn num_items(&self) -> usize {
        self.urm_train.num_cols()
    }

    fn compute_scores(&self, user: u32) -> DenseVector {

        let mut scores = vec![0.0; self.num_items()];

        let (seen_items, seen_values) = self.urm_train.row(user as usize);
        for (&item, &value) in seen_items.iter().zip(seen_values.iter()) {
            let (neighbors, similarities) = self.weights.row(item as usize);
            for (&other_item, &similarity) in neighbors.iter().zip(similarities.iter()) {
                scores[other_item as usize] += value * similarity;
            }
        }

        scores
    }

    fn urm_train(&self) -> &SparseMatrix {
        &self.urm_train
    }
}
