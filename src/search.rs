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

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, XorShiftRng};

use error::TuneError;

/// A candidate hyperparameter assignment, name to value. Kept ordered so that
/// serialized records list their fields deterministically.
pub type Point = BTreeMap<String, f64>;

/// Best observation of a finished search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub target: f64,
    pub params: Point,
}

/// Box constraints of the search, one closed interval per hyperparameter.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    bounds: Vec<(String, f64, f64)>,
}

impl SearchSpace {

    pub fn new() -> Self {
        SearchSpace { bounds: Vec::new() }
    }

    pub fn with(mut self, name: &str, low: f64, high: f64) -> Self {
        self.bounds.push((name.to_string(), low, high));
        self
    }

    pub fn bounds(&self) -> &[(String, f64, f64)] {
        &self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// A black-box maximizer over a bounded parameter space. The strategy proposes
/// points, observes the objective value for each, and reports the best pair
/// seen. An objective failure aborts the search immediately: the strategy
/// needs an observation for every proposed point.
pub trait Maximizer {
    fn maximize(
        &mut self,
        objective: &mut dyn FnMut(&Point) -> Result<f64, TuneError>,
        space: &SearchSpace,
        init_points: usize,
        n_iter: usize,
    ) -> Result<SearchResult, TuneError>;
}

pub fn rng_from_seed(seed: u32) -> XorShiftRng {
    // the generator state must not be all zero
    XorShiftRng::from_seed([
        seed | 1,
        seed.wrapping_mul(0x9e37_79b9) | 1,
        seed.wrapping_add(0x6c07_8965) | 1,
        0x5f35_6495,
    ])
}

/// Surrogate-free maximizer: a fixed budget of uniform exploration points,
/// followed by guided iterations that sample inside a shrinking box around the
/// best point observed so far.
pub struct RandomSearch {
    rng: XorShiftRng,
}

impl RandomSearch {

    pub fn from_seed(seed: u32) -> Self {
        RandomSearch { rng: rng_from_seed(seed) }
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.gen_range(low, high)
        } else {
            low
        }
    }

    fn uniform_point(&mut self, space: &SearchSpace) -> Point {
        space
            .bounds()
            .iter()
            .map(|&(ref name, low, high)| (name.clone(), self.uniform(low, high)))
            .collect()
    }

    fn perturbed_point(&mut self, space: &SearchSpace, center: &Point, scale: f64) -> Point {
        space
            .bounds()
            .iter()
            .map(|&(ref name, low, high)| {
                let current = center[name];
                let radius = (high - low) * scale;
                let candidate_low = if current - radius > low { current - radius } else { low };
                let candidate_high = if current + radius < high { current + radius } else { high };
                (name.clone(), self.uniform(candidate_low, candidate_high))
            })
            .collect()
    }
}

impl Maximizer for RandomSearch {

    fn maximize(
        &mut self,
        objective: &mut dyn FnMut(&Point) -> Result<f64, TuneError>,
        space: &SearchSpace,
        init_points: usize,
        n_iter: usize,
    ) -> Result<SearchResult, TuneError> {

        if init_points + n_iter == 0 {
            return Err(TuneError::FitFailure("search budget is empty".to_string()));
        }

        let mut best: Option<SearchResult> = None;

        for _ in 0..init_points {
            let point = self.uniform_point(space);
            let target = objective(&point)?;

            let improved = match best {
                Some(ref current) => target > current.target,
                None => true,
            };
            if improved {
                best = Some(SearchResult { target, params: point });
            }
        }

        for iteration in 0..n_iter {

            let point = match best {
                Some(ref current) => {
                    // shrink the sampling box as the budget runs out
                    let progress = iteration as f64 / n_iter as f64;
                    let scale = 0.3 * (1.0 - progress) + 0.02;
                    self.perturbed_point(space, &current.params, scale)
                }
                None => self.uniform_point(space),
            };

            let target = objective(&point)?;

            let improved = match best {
                Some(ref current) => target > current.target,
                None => true,
            };
            if improved {
                best = Some(SearchResult { target, params: point });
            }
        }

        // a nonempty budget guarantees at least one observation
        Ok(best.unwrap())
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn finds_the_peak_of_a_smooth_objective() {
        let mut search = RandomSearch::from_seed(13);
        let space = SearchSpace::new().with("x", 0.0, 1.0).with("y", -1.0, 1.0);

        let mut objective = |point: &Point| -> Result<f64, TuneError> {
            let x = point["x"];
            let y = point["y"];
            Ok(-(x - 0.3) * (x - 0.3) - (y - 0.5) * (y - 0.5))
        };

        let result = search.maximize(&mut objective, &space, 20, 30).unwrap();

        assert!(result.target > -0.05);
        assert!(result.params["x"] >= 0.0 && result.params["x"] <= 1.0);
        assert!(result.params["y"] >= -1.0 && result.params["y"] <= 1.0);
    }

    #[test]
    fn reported_value_matches_reported_point() {
        let mut search = RandomSearch::from_seed(99);
        let space = SearchSpace::new().with("x", 0.0, 2.0);

        let mut objective =
            |point: &Point| -> Result<f64, TuneError> { Ok(1.0 - (point["x"] - 1.4).abs()) };

        let result = search.maximize(&mut objective, &space, 10, 10).unwrap();

        assert_eq!(result.target, 1.0 - (result.params["x"] - 1.4).abs());
    }

    #[test]
    fn seeded_searches_are_reproducible() {
        let space = SearchSpace::new().with("x", 0.0, 1.0);

        let mut objective = |point: &Point| -> Result<f64, TuneError> { Ok(point["x"]) };

        let first = RandomSearch::from_seed(7)
            .maximize(&mut objective, &space, 5, 5)
            .unwrap();
        let second = RandomSearch::from_seed(7)
            .maximize(&mut objective, &space, 5, 5)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn objective_failures_abort_the_search() {
        let mut search = RandomSearch::from_seed(5);
        let space = SearchSpace::new().with("x", 0.0, 1.0);

        let mut calls = 0;
        {
            let mut objective = |_point: &Point| -> Result<f64, TuneError> {
                calls += 1;
                Err(TuneError::FitFailure("singular system".to_string()))
            };

            let result = search.maximize(&mut objective, &space, 5, 5);
            assert!(result.is_err());
        }

        assert_eq!(calls, 1);
    }

    #[test]
    fn degenerate_bounds_collapse_to_a_constant() {
        let mut search = RandomSearch::from_seed(3);
        let space = SearchSpace::new().with("x", 0.7, 0.7);

        let mut objective = |point: &Point| -> Result<f64, TuneError> { Ok(point["x"]) };

        let result = search.maximize(&mut objective, &space, 2, 2).unwrap();
        assert_eq!(result.params["x"], 0.7);
    }
}
