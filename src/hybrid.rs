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

use error::TuneError;
use recommender::Recommender;
use types::{DenseVector, SparseMatrix};

/// Linear blend of two fitted recommenders: alpha * first + (1 - alpha) * second.
/// Holds both by reference; neither lifetime is managed here. The mixing weight
/// is not range-checked, bounding it to [0, 1] is the search loop's business.
pub struct MergedHybrid<'a> {
    first: &'a dyn Recommender,
    second: &'a dyn Recommender,
    alpha: f64,
}

impl<'a> MergedHybrid<'a> {

    pub fn new(
        first: &'a dyn Recommender,
        second: &'a dyn Recommender,
    ) -> Result<MergedHybrid<'a>, TuneError> {

        if first.num_items() != second.num_items() {
            return Err(TuneError::IncompatibleRecommenders(
                first.num_items(),
                second.num_items(),
            ));
        }

        Ok(MergedHybrid { first, second, alpha: 0.5 })
    }

    pub fn fit(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
}

impl<'a> Recommender for MergedHybrid<'a> {

    fn num_items(&self) -> usize {
        self.first.num_items()
    }

    fn compute_scores(&self, user: u32) -> DenseVector {

        let first_scores = self.first.compute_scores(user);
        let second_scores = self.second.compute_scores(user);

        first_scores
            .iter()
            .zip(second_scores.iter())
            .map(|(first, second)| self.alpha * first + (1.0 - self.alpha) * second)
            .collect()
    }

    fn urm_train(&self) -> &SparseMatrix {
        self.first.urm_train()
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use recommender::PopularityRecommender;
    use types::SparseMatrix;

    fn recommenders() -> (PopularityRecommender, PopularityRecommender) {
        let first = PopularityRecommender::new(SparseMatrix::from_triples(
            2,
            3,
            &[(0, 0, 1.0), (1, 0, 1.0), (1, 1, 1.0)],
        ));
        let second = PopularityRecommender::new(SparseMatrix::from_triples(
            2,
            3,
            &[(0, 2, 1.0), (1, 2, 1.0)],
        ));
        (first, second)
    }

    #[test]
    fn full_alpha_reproduces_first_recommender() {
        let (first, second) = recommenders();
        let mut hybrid = MergedHybrid::new(&first, &second).unwrap();

        hybrid.fit(1.0);

        assert_eq!(hybrid.compute_scores(0), first.compute_scores(0));
    }

    #[test]
    fn zero_alpha_reproduces_second_recommender() {
        let (first, second) = recommenders();
        let mut hybrid = MergedHybrid::new(&first, &second).unwrap();

        hybrid.fit(0.0);

        assert_eq!(hybrid.compute_scores(0), second.compute_scores(0));
    }

    #[test]
    fn blend_interpolates_between_both() {
        let (first, second) = recommenders();
        let mut hybrid = MergedHybrid::new(&first, &second).unwrap();

        hybrid.fit(0.25);

        // first scores [2, 1, 0], second scores [0, 0, 2]
        assert_eq!(hybrid.compute_scores(0), vec![0.5, 0.25, 1.5]);
    }

    #[test]
    fn mismatched_item_spaces_are_rejected() {
        let first = PopularityRecommender::new(SparseMatrix::from_triples(1, 3, &[(0, 0, 1.0)]));
        let second = PopularityRecommender::new(SparseMatrix::from_triples(1, 4, &[(0, 0, 1.0)]));

        match MergedHybrid::new(&first, &second) {
            Err(TuneError::IncompatibleRecommenders(3, 4)) => (),
            _ => panic!("expected incompatible recommenders"),
        }
    }
}
