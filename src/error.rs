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

use std::error::Error;
use std::fmt;

/// Errors raised by the evaluation and tuning pipeline. All of these are detected
/// eagerly at call boundaries, before any expensive computation starts.
#[derive(Debug, Clone, PartialEq)]
pub enum TuneError {
    /// Two matrices were stacked with differing column extents.
    ShapeMismatch(usize, usize),
    /// The evaluator was given one recommender per fold, but the counts differ.
    FoldCountMismatch { folds: usize, recommenders: usize },
    /// The evaluator was configured with per-fold ignore sets, but their count
    /// differs from the fold count.
    IgnoreSetCountMismatch { folds: usize, sets: usize },
    /// Two recommenders were blended although they were fit over different item spaces.
    IncompatibleRecommenders(usize, usize),
    /// A recommender could not be fit with the proposed hyperparameters. This aborts
    /// the whole tuning run: the maximizer needs an observation for every proposed
    /// point, and skipping one would bias its view of the objective.
    FitFailure(String),
    /// A hyperparameter point contained a name the target model does not declare.
    UnknownHyperparameter(String),
}

impl fmt::Display for TuneError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TuneError::ShapeMismatch(left, right) =>
                write!(f, "cannot stack matrices with {} and {} columns", left, right),
            TuneError::FoldCountMismatch { folds, recommenders } =>
                write!(f, "got {} recommenders for {} folds", recommenders, folds),
            TuneError::IgnoreSetCountMismatch { folds, sets } =>
                write!(f, "got {} ignore sets for {} folds", sets, folds),
            TuneError::IncompatibleRecommenders(left, right) =>
                write!(f, "cannot blend recommenders over {} and {} items", left, right),
            TuneError::FitFailure(ref reason) =>
                write!(f, "recommender fit failed: {}", reason),
            TuneError::UnknownHyperparameter(ref reason) =>
                write!(f, "invalid hyperparameter point: {}", reason),
        }
    }
}

impl Error for TuneError {}
