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

use std::cmp;

use rank;
use recommender::Recommender;
use types::{ItemSet, SparseMatrix, UserSet};

/// Share of recommended items that are relevant. Callers must not invoke this
/// with an empty recommendation list.
pub fn precision(recommended: &[u32], relevant: &ItemSet) -> f64 {
    let hits = recommended.iter().filter(|item| relevant.contains(item)).count();
    hits as f64 / recommended.len() as f64
}

/// Share of relevant items that were recommended. Callers must skip users
/// without relevant items.
pub fn recall(recommended: &[u32], relevant: &ItemSet) -> f64 {
    let hits = recommended.iter().filter(|item| relevant.contains(item)).count();
    hits as f64 / relevant.len() as f64
}

/// Average precision of a ranked list, normalized by min(|relevant|, |list|).
pub fn average_precision(recommended: &[u32], relevant: &ItemSet) -> f64 {

    if recommended.is_empty() {
        return 0.0;
    }

    let mut hits = 0_u32;
    let mut precision_sum = 0.0;

    for (position, item) in recommended.iter().enumerate() {
        if relevant.contains(item) {
            hits += 1;
            precision_sum += hits as f64 / (position + 1) as f64;
        }
    }

    precision_sum / cmp::min(relevant.len(), recommended.len()) as f64
}

/// Metric means over all evaluated users of one validation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub precision: f64,
    pub recall: f64,
    pub map: f64,
    pub num_eval: usize,
}

/// Evaluates one recommender against one held-out validation matrix. Users
/// without held-out interactions are silently excluded and never counted in the
/// denominator; users in the ignore set are skipped as well.
pub fn evaluate_all(
    recommender: &dyn Recommender,
    validation: &SparseMatrix,
    cutoff: usize,
    ignore_users: Option<&UserSet>,
) -> Aggregate {

    let mut cumulative_precision = 0.0;
    let mut cumulative_recall = 0.0;
    let mut cumulative_map = 0.0;
    let mut num_eval = 0_usize;

    for user in 0..validation.num_rows() {

        if let Some(ignored) = ignore_users {
            if ignored.contains(&(user as u32)) {
                continue;
            }
        }

        let (relevant_items, _) = validation.row(user);
        if relevant_items.is_empty() {
            continue;
        }

        let relevant: ItemSet = relevant_items.iter().cloned().collect();
        let recommended = rank::recommend(recommender, user as u32, Some(cutoff), true);

        cumulative_precision += precision(&recommended, &relevant);
        cumulative_recall += recall(&recommended, &relevant);
        cumulative_map += average_precision(&recommended, &relevant);
        num_eval += 1;
    }

    if num_eval > 0 {
        cumulative_precision /= num_eval as f64;
        cumulative_recall /= num_eval as f64;
        cumulative_map /= num_eval as f64;
    }

    Aggregate {
        precision: cumulative_precision,
        recall: cumulative_recall,
        map: cumulative_map,
        num_eval,
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use recommender::PopularityRecommender;
    use types::SparseMatrix;

    fn within_epsilon(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-12
    }

    fn relevant(items: &[u32]) -> ItemSet {
        items.iter().cloned().collect()
    }

    #[test]
    fn precision_counts_hits_over_list_length() {
        let value = precision(&[1, 2, 3, 4], &relevant(&[2, 4, 9]));
        assert!(within_epsilon(value, 0.5));
    }

    #[test]
    fn recall_counts_hits_over_relevant_count() {
        let value = recall(&[1, 2, 3, 4], &relevant(&[2, 4, 9]));
        assert!(within_epsilon(value, 2.0 / 3.0));
    }

    #[test]
    fn precision_and_recall_stay_in_unit_interval() {
        let lists: &[&[u32]] = &[&[1], &[1, 2, 3], &[5, 6, 7, 8, 9]];
        let truths: &[&[u32]] = &[&[1], &[7], &[1, 2, 3, 4, 5, 6, 7, 8, 9]];

        for list in lists {
            for truth in truths {
                let p = precision(list, &relevant(truth));
                let r = recall(list, &relevant(truth));
                assert!(p >= 0.0 && p <= 1.0);
                assert!(r >= 0.0 && r <= 1.0);
            }
        }
    }

    #[test]
    fn precision_equals_recall_for_equally_sized_sets() {
        let value_p = precision(&[1, 2, 3], &relevant(&[3, 4, 5]));
        let value_r = recall(&[1, 2, 3], &relevant(&[3, 4, 5]));
        assert!(within_epsilon(value_p, value_r));
    }

    #[test]
    fn perfect_ranking_has_full_average_precision() {
        let value = average_precision(&[4, 7, 9], &relevant(&[4, 7, 9]));
        assert!(within_epsilon(value, 1.0));
    }

    #[test]
    fn irrelevant_ranking_has_zero_average_precision() {
        let value = average_precision(&[1, 2, 3], &relevant(&[8, 9]));
        assert!(within_epsilon(value, 0.0));
    }

    #[test]
    fn average_precision_weights_early_hits() {
        // hit at position 1 and 3 out of two relevant items
        let value = average_precision(&[4, 2, 7], &relevant(&[4, 7]));
        assert!(within_epsilon(value, (1.0 + 2.0 / 3.0) / 2.0));
    }

    #[test]
    fn evaluation_skips_users_without_ground_truth() {
        let urm_train = SparseMatrix::from_triples(
            3,
            4,
            &[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)],
        );
        // user 1 has no held-out interactions
        let validation = SparseMatrix::from_triples(3, 4, &[(0, 3, 1.0), (2, 3, 1.0)]);

        let popularity = PopularityRecommender::new(urm_train);
        let aggregate = evaluate_all(&popularity, &validation, 2, None);

        assert_eq!(aggregate.num_eval, 2);
    }

    #[test]
    fn evaluation_skips_ignored_users() {
        let urm_train = SparseMatrix::from_triples(2, 3, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let validation = SparseMatrix::from_triples(2, 3, &[(0, 2, 1.0), (1, 2, 1.0)]);

        let ignored: UserSet = [1_u32].iter().cloned().collect();

        let popularity = PopularityRecommender::new(urm_train);
        let aggregate = evaluate_all(&popularity, &validation, 2, Some(&ignored));

        assert_eq!(aggregate.num_eval, 1);
    }
}
