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

use std::time::Instant;

use error::TuneError;
use metrics;
use recommender::Recommender;
use types::{SparseMatrix, UserSet};
use utils;

/// Evaluates one candidate recommender per held-out fold and reports the
/// objective metric (MAP at the configured cutoff) per fold. Folds are
/// evaluated independently, in input order.
pub struct KFoldEvaluator {
    validations: Vec<SparseMatrix>,
    cutoff: usize,
    ignore_users: Option<Vec<UserSet>>,
    verbose: bool,
}

impl KFoldEvaluator {

    pub fn new(
        validations: Vec<SparseMatrix>,
        cutoff: usize,
        ignore_users: Option<Vec<UserSet>>,
        verbose: bool,
    ) -> Self {
        KFoldEvaluator { validations, cutoff, ignore_users, verbose }
    }

    pub fn num_folds(&self) -> usize {
        self.validations.len()
    }

    /// One scalar per fold. The recommender list must contain exactly one
    /// candidate per fold; this is checked before any evaluation work starts.
    pub fn evaluate(&self, recommenders: &[&dyn Recommender]) -> Result<Vec<f64>, TuneError> {

        if recommenders.len() != self.validations.len() {
            return Err(TuneError::FoldCountMismatch {
                folds: self.validations.len(),
                recommenders: recommenders.len(),
            });
        }

        if let Some(ref sets) = self.ignore_users {
            if sets.len() != self.validations.len() {
                return Err(TuneError::IgnoreSetCountMismatch {
                    folds: self.validations.len(),
                    sets: sets.len(),
                });
            }
        }

        let mut per_fold = Vec::with_capacity(self.validations.len());

        for (fold, validation) in self.validations.iter().enumerate() {

            let fold_start = Instant::now();

            let ignored = match self.ignore_users {
                Some(ref sets) => Some(&sets[fold]),
                None => None,
            };

            let aggregate = metrics::evaluate_all(
                recommenders[fold],
                validation,
                self.cutoff,
                ignored,
            );

            if self.verbose {
                println!(
                    "Fold {}: MAP@{} {:.6} over {} users, {}ms",
                    fold,
                    self.cutoff,
                    aggregate.map,
                    aggregate.num_eval,
                    utils::to_millis(fold_start.elapsed()),
                );
            }

            per_fold.push(aggregate.map);
        }

        Ok(per_fold)
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use recommender::PopularityRecommender;
    use types::{DenseVector, SparseMatrix};

    struct ConstantScores {
        urm_train: SparseMatrix,
    }

    impl Recommender for ConstantScores {
        fn num_items(&self) -> usize {
            self.urm_train.num_cols()
        }

        fn compute_scores(&self, _user: u32) -> DenseVector {
            vec![1.0; self.num_items()]
        }

        fn urm_train(&self) -> &SparseMatrix {
            &self.urm_train
        }
    }

    fn validation() -> SparseMatrix {
        SparseMatrix::from_triples(2, 4, &[(0, 1, 1.0), (1, 3, 1.0)])
    }

    #[test]
    fn one_scalar_per_fold_in_input_order() {
        let evaluator = KFoldEvaluator::new(
            vec![validation(), validation(), validation()],
            2,
            None,
            false,
        );

        let train = SparseMatrix::from_triples(2, 4, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let candidates = [
            PopularityRecommender::new(train.clone()),
            PopularityRecommender::new(train.clone()),
            PopularityRecommender::new(train),
        ];
        let references: Vec<&dyn Recommender> =
            candidates.iter().map(|candidate| candidate as &dyn Recommender).collect();

        let per_fold = evaluator.evaluate(&references).unwrap();

        assert_eq!(per_fold.len(), 3);
    }

    #[test]
    fn identical_folds_report_identical_metrics() {
        let evaluator = KFoldEvaluator::new(vec![validation(), validation()], 2, None, false);

        let train = SparseMatrix::from_triples(2, 4, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let first = ConstantScores { urm_train: train.clone() };
        let second = ConstantScores { urm_train: train };

        let per_fold = evaluator
            .evaluate(&[&first as &dyn Recommender, &second as &dyn Recommender])
            .unwrap();

        assert_eq!(per_fold[0], per_fold[1]);
    }

    #[test]
    fn wrong_candidate_count_is_rejected_eagerly() {
        let evaluator = KFoldEvaluator::new(vec![validation(), validation()], 2, None, false);

        let train = SparseMatrix::from_triples(2, 4, &[(0, 0, 1.0)]);
        let only = PopularityRecommender::new(train);

        assert_eq!(
            evaluator.evaluate(&[&only as &dyn Recommender]),
            Err(TuneError::FoldCountMismatch { folds: 2, recommenders: 1 })
        );
    }

    #[test]
    fn wrong_ignore_set_count_is_rejected_eagerly() {
        let ignore: UserSet = [0_u32].iter().cloned().collect();
        let evaluator =
            KFoldEvaluator::new(vec![validation(), validation()], 2, Some(vec![ignore]), false);

        let train = SparseMatrix::from_triples(2, 4, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let first = ConstantScores { urm_train: train.clone() };
        let second = ConstantScores { urm_train: train };

        assert_eq!(
            evaluator.evaluate(&[&first as &dyn Recommender, &second as &dyn Recommender]),
            Err(TuneError::IgnoreSetCountMismatch { folds: 2, sets: 1 })
        );
    }

    #[test]
    fn ignored_users_are_excluded_per_fold() {
        let ignore: UserSet = [0_u32].iter().cloned().collect();
        let evaluator = KFoldEvaluator::new(vec![validation()], 3, Some(vec![ignore]), false);

        let train = SparseMatrix::from_triples(2, 4, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let candidate = ConstantScores { urm_train: train };

        // only user 1 remains; its relevant item 3 ranks within the cutoff
        let per_fold = evaluator.evaluate(&[&candidate as &dyn Recommender]).unwrap();

        assert_eq!(per_fold.len(), 1);
        assert!(per_fold[0] > 0.0);
    }
}
