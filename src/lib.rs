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

extern crate csv;
extern crate fnv;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

use std::time::Instant;

pub mod error;
pub mod types;
pub mod features;
pub mod split;
pub mod rank;
pub mod metrics;
pub mod evaluate;
pub mod recommender;
pub mod hybrid;
pub mod search;
pub mod stats;
pub mod io;
pub mod utils;


use error::TuneError;
use evaluate::KFoldEvaluator;
use features::AttributeSource;
use hybrid::MergedHybrid;
use recommender::{BlockScaling, ItemKnnRecommender, KnnParams, PopularityRecommender,
                  Recommender};
use search::{Maximizer, Point, SearchResult, SearchSpace};
use types::{SparseMatrix, UserSet};

/// Everything one tuning run depends on. Runs differ by configuration value,
/// not by code: the same entry points serve a quick smoke run and an overnight
/// search.
#[derive(Debug, Clone)]
pub struct TuningConfig {
    pub num_folds: usize,
    pub train_percentage: f64,
    pub cutoff: usize,
    pub init_points: usize,
    pub n_iter: usize,
    pub workers: usize,
    pub seed: u32,
    pub verbose: bool,
    /// Optional confidence scaling of the feature and interaction blocks of
    /// the combined matrix. Without it, raw weights are used as-is.
    pub scaling: Option<BlockScaling>,
    /// Evaluate only the shortest-profile share of the users when set,
    /// e.g. 0.25 for the least active quarter.
    pub worst_fraction: Option<f64>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        TuningConfig {
            num_folds: 3,
            train_percentage: 0.8,
            cutoff: 10,
            init_points: 10,
            n_iter: 15,
            workers: 2,
            seed: 42,
            verbose: false,
            scaling: None,
            worst_fraction: None,
        }
    }
}

/// Outcome of a knn tuning run: the best observation of the search, plus the
/// model refit on the full interaction data with those hyperparameters.
pub struct TunedKnn {
    pub recommender: ItemKnnRecommender,
    pub result: SearchResult,
}

/// Stacks the transposed feature matrix over the interaction matrix, applying
/// linear confidence weighting per block when scaling coefficients are given.
pub fn combined_matrix(
    icm: &SparseMatrix,
    urm_train: &SparseMatrix,
    scaling: &Option<BlockScaling>,
) -> Result<SparseMatrix, TuneError> {

    match *scaling {
        Some(ref scaling) => features::combine(
            &icm.linear_confidence(scaling.feature_alpha).transposed(),
            &urm_train.linear_confidence(scaling.interaction_alpha),
            false,
        ),
        None => features::combine(&icm.transposed(), urm_train, false),
    }
}

struct TuningSetup {
    trains: Vec<SparseMatrix>,
    combineds: Vec<SparseMatrix>,
    evaluator: KFoldEvaluator,
}

/// Splits the data into folds and precomputes everything that stays fixed
/// across the whole search: train matrices, combined feature matrices, and the
/// evaluator over the validation matrices.
fn prepare_folds(
    urm: &SparseMatrix,
    icm: &SparseMatrix,
    config: &TuningConfig,
) -> Result<TuningSetup, TuneError> {

    let mut rng = search::rng_from_seed(config.seed);
    let folds = split::make_folds(urm, config.num_folds, config.train_percentage, &mut rng);

    let (trains, validations): (Vec<SparseMatrix>, Vec<SparseMatrix>) =
        folds.into_iter().unzip();

    let mut combineds = Vec::with_capacity(trains.len());
    for train in trains.iter() {
        combineds.push(combined_matrix(icm, train, &config.scaling)?);
    }

    let ignore_users: Option<Vec<UserSet>> = config.worst_fraction.map(|keep_fraction| {
        trains
            .iter()
            .map(|train| split::ignore_all_but_shortest_profiles(train, keep_fraction))
            .collect()
    });

    let evaluator = KFoldEvaluator::new(validations, config.cutoff, ignore_users, config.verbose);

    Ok(TuningSetup { trains, combineds, evaluator })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Searches the hyperparameter space of the item-knn model. Every proposed
/// point fits one candidate per fold against that fold's combined matrix; the
/// objective fed back to the maximizer is the mean MAP across folds. A fit or
/// evaluation failure aborts the whole run. The best point is refit on the
/// full data afterwards.
pub fn tune_item_knn(
    urm: &SparseMatrix,
    sources: &[AttributeSource],
    space: &SearchSpace,
    config: &TuningConfig,
    maximizer: &mut dyn Maximizer,
) -> Result<TunedKnn, TuneError> {

    let num_items = urm.num_cols();
    let icm = features::build_feature_matrix(sources, num_items);

    let setup = prepare_folds(urm, &icm, config)?;

    let search_start = Instant::now();
    let mut evaluations = 0_u32;

    let result = {
        let evaluations = &mut evaluations;

        let mut objective = |point: &Point| -> Result<f64, TuneError> {
            let params = KnnParams::from_point(point)?;

            let mut candidates = Vec::with_capacity(setup.trains.len());
            for (train, combined) in setup.trains.iter().zip(setup.combineds.iter()) {
                candidates.push(ItemKnnRecommender::fit(
                    train.clone(),
                    combined,
                    &params,
                    config.workers,
                )?);
            }

            let references: Vec<&dyn Recommender> = candidates
                .iter()
                .map(|candidate| candidate as &dyn Recommender)
                .collect();

            let per_fold = setup.evaluator.evaluate(&references)?;
            let objective_value = mean(&per_fold);

            *evaluations += 1;
            if config.verbose {
                println!(
                    "Evaluation {}: mean MAP@{} {:.6} for top_k {}, shrink {:.4}",
                    evaluations, config.cutoff, objective_value, params.top_k, params.shrink,
                );
            }

            Ok(objective_value)
        };

        maximizer.maximize(&mut objective, space, config.init_points, config.n_iter)?
    };

    if config.verbose {
        println!(
            "Search finished after {} evaluations, {}ms, best mean MAP@{} {:.6}",
            evaluations,
            utils::to_millis(search_start.elapsed()),
            config.cutoff,
            result.target,
        );
    }

    // Refit on the full, unsplit data for downstream use
    let best_params = KnnParams::from_point(&result.params)?;
    let combined_full = combined_matrix(&icm, urm, &config.scaling)?;
    let recommender =
        ItemKnnRecommender::fit(urm.clone(), &combined_full, &best_params, config.workers)?;

    Ok(TunedKnn { recommender, result })
}

/// Searches the single mixing weight blending an item-knn model with the
/// popularity baseline. Both base models are fit once per fold before the
/// search starts; only the cheap blend is rebuilt per proposed point.
pub fn tune_hybrid(
    urm: &SparseMatrix,
    sources: &[AttributeSource],
    knn_params: &KnnParams,
    config: &TuningConfig,
    maximizer: &mut dyn Maximizer,
) -> Result<SearchResult, TuneError> {

    let num_items = urm.num_cols();
    let icm = features::build_feature_matrix(sources, num_items);

    let setup = prepare_folds(urm, &icm, config)?;

    let prefit_start = Instant::now();

    let mut knn_recommenders = Vec::with_capacity(setup.trains.len());
    let mut popularity_recommenders = Vec::with_capacity(setup.trains.len());

    for (train, combined) in setup.trains.iter().zip(setup.combineds.iter()) {
        knn_recommenders.push(ItemKnnRecommender::fit(
            train.clone(),
            combined,
            knn_params,
            config.workers,
        )?);
        popularity_recommenders.push(PopularityRecommender::new(train.clone()));
    }

    if config.verbose {
        println!(
            "Pre-fit {} base recommender pairs, {}ms",
            setup.trains.len(),
            utils::to_millis(prefit_start.elapsed()),
        );
    }

    let space = SearchSpace::new().with("hybrid_alpha", 0.0, 1.0);

    let mut objective = |point: &Point| -> Result<f64, TuneError> {
        let alpha = *point
            .get("hybrid_alpha")
            .ok_or_else(|| TuneError::UnknownHyperparameter("hybrid_alpha missing".to_string()))?;

        let mut blends = Vec::with_capacity(knn_recommenders.len());
        for (knn, popularity) in knn_recommenders.iter().zip(popularity_recommenders.iter()) {
            let mut blend = MergedHybrid::new(knn, popularity)?;
            blend.fit(alpha);
            blends.push(blend);
        }

        let references: Vec<&dyn Recommender> =
            blends.iter().map(|blend| blend as &dyn Recommender).collect();

        let per_fold = setup.evaluator.evaluate(&references)?;
        Ok(mean(&per_fold))
    };

    maximizer.maximize(&mut objective, &space, config.init_points, config.n_iter)
}
