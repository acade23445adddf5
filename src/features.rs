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

use fnv::FnvHashMap;

use error::TuneError;
use types::SparseMatrix;

/// One categorical attribute table, e.g. the genre or channel assignments of a
/// catalog. Feature ids are dense within the source; the builder later shifts
/// every source into its own disjoint column range.
#[derive(Debug, Clone)]
pub struct AttributeSource {
    pub name: String,
    pub num_features: usize,
    pub importance: f64,
    entries: Vec<(u32, u32)>,
}

impl AttributeSource {

    pub fn new(name: &str, importance: f64, num_features: usize, entries: Vec<(u32, u32)>) -> Self {
        AttributeSource {
            name: name.to_string(),
            num_features,
            importance,
            entries,
        }
    }

    /// Builds a source from (item index, feature name) records, assigning dense
    /// feature ids in first-seen order.
    pub fn from_records(name: &str, importance: f64, records: &[(u32, String)]) -> Self {

        let mut feature_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());
        let mut entries = Vec::with_capacity(records.len());

        for &(item, ref feature_name) in records.iter() {
            let next_id = feature_dict.len() as u32;
            let feature = *feature_dict.entry(feature_name.clone()).or_insert(next_id);
            entries.push((item, feature));
        }

        let num_features = feature_dict.len();

        AttributeSource::new(name, importance, num_features, entries)
    }

    /// Builds a source from a raw per-item count signal, e.g. the number of
    /// episodes of a show, by bucketing the counts into categorical features.
    pub fn from_counts(name: &str, importance: f64, counts: &[u32], num_buckets: usize) -> Self {

        let buckets = bucketize_counts(counts, num_buckets);

        let entries = buckets
            .iter()
            .enumerate()
            .map(|(item, &bucket)| (item as u32, bucket))
            .collect();

        // one extra column for the reserved unknown bucket
        AttributeSource::new(name, importance, num_buckets + 1, entries)
    }

    pub fn entries(&self) -> &[(u32, u32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Buckets a non-negative count signal into `num_buckets` equal-width bins over
/// the [min, max] range of the nonzero counts. Items with a zero count land in a
/// reserved extra bucket with id `num_buckets`, distinct from all real buckets.
pub fn bucketize_counts(counts: &[u32], num_buckets: usize) -> Vec<u32> {

    let mut min_count = u32::max_value();
    let mut max_count = 0_u32;
    for &count in counts.iter() {
        if count > 0 {
            if count < min_count {
                min_count = count;
            }
            if count > max_count {
                max_count = count;
            }
        }
    }

    if max_count == 0 {
        return vec![num_buckets as u32; counts.len()];
    }

    let width = (max_count - min_count) as f64 / num_buckets as f64;

    counts
        .iter()
        .map(|&count| {
            if count == 0 {
                num_buckets as u32
            } else if width == 0.0 {
                0
            } else {
                let bucket = ((count - min_count) as f64 / width) as u32;
                if bucket > num_buckets as u32 - 1 {
                    num_buckets as u32 - 1
                } else {
                    bucket
                }
            }
        })
        .collect()
}

/// TF-IDF weights for a single source: idf(f) = log2(num_items / df(f)) for
/// features that occur at all, tf(i) = 1 / #features of item i in this source.
/// Returns the raw weighted triples together with the largest weight produced,
/// which the builder uses to normalize the source.
pub fn tfidf(source: &AttributeSource, num_items: usize) -> (Vec<(u32, u32, f64)>, f64) {

    let mut document_frequencies = vec![0_u32; source.num_features];
    let mut item_nnz = vec![0_u32; num_items];

    for &(item, feature) in source.entries() {
        document_frequencies[feature as usize] += 1;
        item_nnz[item as usize] += 1;
    }

    let idfs: Vec<f64> = document_frequencies
        .iter()
        .map(|&df| {
            if df > 0 {
                (num_items as f64 / df as f64).log2()
            } else {
                0.0
            }
        })
        .collect();

    let mut weighted = Vec::with_capacity(source.entries().len());
    let mut v_max = 0.0;

    for &(item, feature) in source.entries() {
        let tf = 1.0 / item_nnz[item as usize] as f64;
        let value = tf * idfs[feature as usize];
        if value > v_max {
            v_max = value;
        }
        weighted.push((item, feature, value));
    }

    (weighted, v_max)
}

/// Combines all attribute sources into one weighted feature matrix of shape
/// (num_items, sum of source widths). Each source is TF-IDF weighted, rescaled
/// so that its largest weight equals its importance coefficient, and shifted
/// into its own column range in the given order.
pub fn build_feature_matrix(sources: &[AttributeSource], num_items: usize) -> SparseMatrix {

    let total_width = sources.iter().map(|source| source.num_features).sum();

    let mut triples: Vec<(u32, u32, f64)> = Vec::new();
    let mut offset = 0_u32;

    for source in sources.iter() {
        let (weighted, v_max) = tfidf(source, num_items);

        if !weighted.is_empty() && v_max > 0.0 {
            let scale = source.importance / v_max;
            for (item, feature, value) in weighted {
                triples.push((item, feature + offset, value * scale));
            }
        } else {
            for (item, feature, value) in weighted {
                triples.push((item, feature + offset, value));
            }
        }

        offset += source.num_features as u32;
    }

    SparseMatrix::from_triples(num_items, total_width, &triples)
}

/// Stacks the feature matrix over the interaction matrix so that user-item
/// co-occurrence acts as an additional implicit feature of an item. Both
/// operands must have items as their column space; pass
/// `transpose_interactions` when the interaction matrix is item-major.
pub fn combine(
    features: &SparseMatrix,
    interactions: &SparseMatrix,
    transpose_interactions: bool,
) -> Result<SparseMatrix, TuneError> {

    if transpose_interactions {
        SparseMatrix::vstack(features, &interactions.transposed())
    } else {
        SparseMatrix::vstack(features, interactions)
    }
}
