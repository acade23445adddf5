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

extern crate rand;

use rand::Rng;

use types::{SparseMatrix, UserSet};

/// Randomly holds out a share of every user's interactions. The returned train
/// and validation matrices have disjoint nonzero supports per user and together
/// preserve each user's interaction count.
pub fn split_holdout<R: Rng>(
    urm: &SparseMatrix,
    train_percentage: f64,
    rng: &mut R,
) -> (SparseMatrix, SparseMatrix) {

    let mut train_triples: Vec<(u32, u32, f64)> = Vec::with_capacity(urm.nnz());
    let mut validation_triples: Vec<(u32, u32, f64)> = Vec::new();

    for user in 0..urm.num_rows() {

        let (items, values) = urm.row(user);
        let mut entries: Vec<(u32, f64)> = items
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();

        rng.shuffle(&mut entries);

        let num_train = (entries.len() as f64 * train_percentage).round() as usize;

        for (position, (item, value)) in entries.into_iter().enumerate() {
            if position < num_train {
                train_triples.push((user as u32, item, value));
            } else {
                validation_triples.push((user as u32, item, value));
            }
        }
    }

    (
        SparseMatrix::from_triples(urm.num_rows(), urm.num_cols(), &train_triples),
        SparseMatrix::from_triples(urm.num_rows(), urm.num_cols(), &validation_triples),
    )
}

/// Repeated random holdout: every fold is an independent split of the full
/// matrix, not a strict partition. The folds are computed once and never
/// mutated afterwards.
pub fn make_folds<R: Rng>(
    urm: &SparseMatrix,
    num_folds: usize,
    train_percentage: f64,
    rng: &mut R,
) -> Vec<(SparseMatrix, SparseMatrix)> {

    (0..num_folds)
        .map(|_| split_holdout(urm, train_percentage, rng))
        .collect()
}

/// Users NOT in the shortest-profile quantile of the given train matrix, for
/// use as an ignore set when evaluating low-activity users only.
pub fn ignore_all_but_shortest_profiles(train: &SparseMatrix, keep_fraction: f64) -> UserSet {

    let num_users = train.num_rows();

    let mut users_by_profile_length: Vec<u32> = (0..num_users as u32).collect();
    users_by_profile_length.sort_by_key(|&user| train.row_nnz(user as usize));

    let block_size = (num_users as f64 * keep_fraction) as usize;

    users_by_profile_length[block_size.min(num_users)..]
        .iter()
        .cloned()
        .collect()
}


#[cfg(test)]
mod tests {

    extern crate rand;

    use self::rand::{SeedableRng, XorShiftRng};

    use super::*;
    use types::SparseMatrix;

    fn sample_urm() -> SparseMatrix {
        let mut triples = Vec::new();
        for user in 0..20_u32 {
            for item in 0..(user % 7 + 1) {
                triples.push((user, item * 3 % 11, 1.0));
            }
        }
        SparseMatrix::from_triples(20, 11, &triples)
    }

    #[test]
    fn holdout_preserves_per_user_counts() {
        let urm = sample_urm();
        let mut rng = XorShiftRng::from_seed([7, 11, 13, 17]);

        let (train, validation) = split_holdout(&urm, 0.8, &mut rng);

        for user in 0..urm.num_rows() {
            assert_eq!(
                train.row_nnz(user) + validation.row_nnz(user),
                urm.row_nnz(user)
            );
        }
    }

    #[test]
    fn holdout_supports_are_disjoint() {
        let urm = sample_urm();
        let mut rng = XorShiftRng::from_seed([3, 5, 7, 11]);

        let (train, validation) = split_holdout(&urm, 0.8, &mut rng);

        for user in 0..urm.num_rows() {
            let (train_items, _) = train.row(user);
            let (validation_items, _) = validation.row(user);
            for item in validation_items.iter() {
                assert!(!train_items.contains(item));
            }
        }
    }

    #[test]
    fn make_folds_returns_independent_splits() {
        let urm = sample_urm();
        let mut rng = XorShiftRng::from_seed([1, 2, 3, 4]);

        let folds = make_folds(&urm, 3, 0.8, &mut rng);

        assert_eq!(folds.len(), 3);
        for (train, validation) in folds.iter() {
            assert_eq!(train.nnz() + validation.nnz(), urm.nnz());
        }
    }

    #[test]
    fn shortest_profile_quantile_keeps_low_activity_users() {
        // users 0..3 with profile lengths 1, 2, 3, 4
        let triples: Vec<(u32, u32, f64)> = (0..4_u32)
            .flat_map(|user| (0..(user + 1)).map(move |item| (user, item, 1.0)))
            .collect();
        let train = SparseMatrix::from_triples(4, 4, &triples);

        let ignored = ignore_all_but_shortest_profiles(&train, 0.25);

        assert!(!ignored.contains(&0));
        assert!(ignored.contains(&1));
        assert!(ignored.contains(&2));
        assert!(ignored.contains(&3));
    }
}
