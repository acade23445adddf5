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

use std::cmp::Ordering;
use std::f64;

use recommender::Recommender;

/// Item ids ordered by descending score, ties broken by ascending item id,
/// truncated to `k` entries.
pub fn rank(scores: &[f64], k: usize) -> Vec<u32> {

    let mut order: Vec<u32> = (0..scores.len() as u32).collect();

    order.sort_by(|&item_a, &item_b| {
        scores[item_b as usize]
            .partial_cmp(&scores[item_a as usize])
            .unwrap_or(Ordering::Equal)
            .then(item_a.cmp(&item_b))
    });

    if k < order.len() {
        order.truncate(k);
    }

    order
}

/// Ranked top-k item list for a user. With `remove_seen`, every item of the
/// user's training row is masked to negative infinity before ranking, so seen
/// items can never reach the output no matter their raw score.
pub fn recommend(
    recommender: &dyn Recommender,
    user: u32,
    k: Option<usize>,
    remove_seen: bool,
) -> Vec<u32> {

    let mut scores = recommender.compute_scores(user);

    if remove_seen {
        let (seen_items, _) = recommender.urm_train().row(user as usize);
        for &item in seen_items.iter() {
            scores[item as usize] = f64::NEG_INFINITY;
        }
    }

    let num_items = scores.len();
    let mut ranked = rank(&scores, k.unwrap_or(num_items));

    if remove_seen {
        ranked.retain(|&item| scores[item as usize] != f64::NEG_INFINITY);
    }

    ranked
}


#[cfg(test)]
mod tests {

    extern crate rand;

    use self::rand::{Rng, SeedableRng, XorShiftRng};

    use super::*;
    use recommender::{PopularityRecommender, Recommender};
    use types::{DenseVector, SparseMatrix};

    struct FixedScores {
        urm_train: SparseMatrix,
        scores: DenseVector,
    }

    impl Recommender for FixedScores {
        fn num_items(&self) -> usize {
            self.scores.len()
        }

        fn compute_scores(&self, _user: u32) -> DenseVector {
            self.scores.clone()
        }

        fn urm_train(&self) -> &SparseMatrix {
            &self.urm_train
        }
    }

    #[test]
    fn rank_orders_by_descending_score() {
        let ranked = rank(&[0.1, 3.0, 2.0, 0.5], 3);
        assert_eq!(ranked, vec![1, 2, 3]);
    }

    #[test]
    fn rank_breaks_ties_by_ascending_item_id() {
        let ranked = rank(&[1.0, 2.0, 1.0, 2.0], 4);
        assert_eq!(ranked, vec![1, 3, 0, 2]);
    }

    #[test]
    fn rank_returns_all_items_for_oversized_k() {
        let ranked = rank(&[1.0, 2.0], 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn unseen_item_wins_despite_lower_raw_score() {
        // user 0 has seen items 0 and 1, user 1 has seen item 2
        let urm_train = SparseMatrix::from_triples(
            2,
            3,
            &[(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)],
        );
        let popularity = PopularityRecommender::new(urm_train);

        let recommended = recommend(&popularity, 0, Some(1), true);

        assert_eq!(recommended, vec![2]);
    }

    #[test]
    fn seen_items_never_recommended() {
        let mut rng = XorShiftRng::from_seed([21, 42, 63, 84]);

        for _ in 0..50 {

            let num_items = 30_usize;
            let mut triples = Vec::new();
            for item in 0..num_items as u32 {
                if rng.next_f64() < 0.4 {
                    triples.push((0_u32, item, 1.0));
                }
            }

            let urm_train = SparseMatrix::from_triples(1, num_items, &triples);
            let scores: DenseVector = (0..num_items).map(|_| rng.gen_range(-1.0, 1.0)).collect();

            let recommender = FixedScores { urm_train, scores };
            let recommended = recommend(&recommender, 0, Some(10), true);

            let (seen_items, _) = recommender.urm_train().row(0);
            for item in recommended.iter() {
                assert!(!seen_items.contains(item));
            }
        }
    }
}
