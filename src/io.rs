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
extern crate serde_json;

use std::error::Error;
use std::fs::File;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use features::AttributeSource;
use rank;
use recommender::Recommender;
use search::SearchResult;
use stats::{DataDictionary, Renaming};
use types::SparseMatrix;

fn read_table(file: &str) -> Result<Vec<(String, String, f64)>, Box<dyn Error>> {

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(file)?;

    let mut records = Vec::new();

    for result in reader.records() {
        let record = result?;

        let left = record
            .get(0)
            .ok_or("record is missing its first column")?
            .to_string();
        let right = record
            .get(1)
            .ok_or("record is missing its second column")?
            .to_string();

        let value = match record.get(2) {
            Some(field) if !field.is_empty() => field.parse()?,
            _ => 1.0,
        };

        records.push((left, right, value));
    }

    Ok(records)
}

/// Reads a CSV interaction table with a header line and a
/// user,item[,value] record per line. A missing value column defaults to 1.
pub fn read_interactions(file: &str) -> Result<Vec<(String, String, f64)>, Box<dyn Error>> {
    read_table(file)
}

/// Reads a CSV attribute table with a header line and an
/// item,feature[,value] record per line.
pub fn read_attributes(file: &str) -> Result<Vec<(String, String, f64)>, Box<dyn Error>> {
    read_table(file)
}

/// Interaction matrix (users x items) over the ids of the data dictionary.
pub fn interaction_matrix(
    records: &[(String, String, f64)],
    data_dict: &DataDictionary,
) -> SparseMatrix {

    let mut triples = Vec::with_capacity(records.len());

    for &(ref user, ref item, value) in records.iter() {
        if let (Some(&user_index), Some(&item_index)) =
            (data_dict.user_index(user), data_dict.item_index(item)) {
            triples.push((user_index, item_index, value));
        }
    }

    SparseMatrix::from_triples(data_dict.num_users(), data_dict.num_items(), &triples)
}

/// Attribute source over the item ids of the data dictionary. Records for items
/// that never appear in the interaction data are dropped, such items cannot be
/// ranked anyway.
pub fn attribute_source(
    name: &str,
    importance: f64,
    records: &[(String, String, f64)],
    data_dict: &DataDictionary,
) -> AttributeSource {

    let resolved: Vec<(u32, String)> = records
        .iter()
        .filter_map(|&(ref item, ref feature, _)| {
            data_dict
                .item_index(item)
                .map(|&item_index| (item_index, feature.clone()))
        })
        .collect();

    AttributeSource::from_records(name, importance, &resolved)
}

/// Source derived from a per-item record count, e.g. one episode row per item,
/// bucketed into categorical features.
pub fn count_source(
    name: &str,
    importance: f64,
    records: &[(String, String, f64)],
    data_dict: &DataDictionary,
    num_buckets: usize,
) -> AttributeSource {

    let mut counts = vec![0_u32; data_dict.num_items()];

    for &(ref item, _, _) in records.iter() {
        if let Some(&item_index) = data_dict.item_index(item) {
            counts[item_index as usize] += 1;
        }
    }

    AttributeSource::from_counts(name, importance, &counts, num_buckets)
}

/// Writes the best observed hyperparameters and objective value as a JSON
/// record. If a path is supplied we write to a file, otherwise to stdout. The
/// record reads back field for field via `read_best_record`.
pub fn write_best_record(
    result: &SearchResult,
    record_path: Option<String>,
) -> Result<(), Box<dyn Error>> {

    let mut out: Box<dyn Write> = match record_path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout()),
    };

    let record_as_json = serde_json::to_string(result)?;
    write!(out, "{}\n", record_as_json)?;

    Ok(())
}

pub fn read_best_record(file: &str) -> Result<SearchResult, Box<dyn Error>> {
    let reader = File::open(&Path::new(file))?;
    let result = serde_json::from_reader(reader)?;
    Ok(result)
}

/// Writes a ranking line per target user, using the original identifiers from
/// the input tables: the user name followed by its top-k unseen items.
pub fn write_submission(
    recommender: &dyn Recommender,
    target_users: &[String],
    data_dict: &DataDictionary,
    renaming: &Renaming,
    k: usize,
    submission_path: &str,
) -> Result<(), Box<dyn Error>> {

    let mut out = File::create(&Path::new(submission_path))?;

    write!(out, "user_id,item_list\n")?;

    for user_name in target_users.iter() {

        let user_index = match data_dict.user_index(user_name) {
            Some(&index) => index,
            None => continue,
        };

        let recommended = rank::recommend(recommender, user_index, Some(k), true);

        let item_names: Vec<&str> = recommended
            .iter()
            .map(|&item_index| renaming.item_name(item_index))
            .collect();

        write!(out, "{},{}\n", user_name, item_names.join(" "))?;
    }

    Ok(())
}

/// Reads a single-column CSV of target user identifiers.
pub fn read_target_users(file: &str) -> Result<Vec<String>, Box<dyn Error>> {

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(file)?;

    let mut users = Vec::new();
    for result in reader.records() {
        let record = result?;
        let user = record
            .get(0)
            .ok_or("record is missing its user column")?
            .to_string();
        users.push(user);
    }

    Ok(users)
}


#[cfg(test)]
mod tests {

    use std::collections::BTreeMap;

    use super::*;
    use search::SearchResult;
    use stats::DataDictionary;

    fn interactions() -> Vec<(String, String, f64)> {
        vec![
            ("u1".to_string(), "i1".to_string(), 1.0),
            ("u1".to_string(), "i2".to_string(), 2.0),
            ("u2".to_string(), "i2".to_string(), 1.0),
        ]
    }

    #[test]
    fn interaction_matrix_follows_the_dictionary() {
        let records = interactions();
        let data_dict = DataDictionary::from_interactions(&records);

        let urm = interaction_matrix(&records, &data_dict);

        assert_eq!(urm.num_rows(), 2);
        assert_eq!(urm.num_cols(), 2);
        assert_eq!(urm.row(0), (&[0, 1][..], &[1.0, 2.0][..]));
        assert_eq!(urm.row(1), (&[1][..], &[1.0][..]));
    }

    #[test]
    fn attribute_source_drops_unknown_items() {
        let data_dict = DataDictionary::from_interactions(&interactions());

        let records = vec![
            ("i1".to_string(), "drama".to_string(), 1.0),
            ("i9".to_string(), "comedy".to_string(), 1.0),
        ];
        let source = attribute_source("genre", 1.0, &records, &data_dict);

        assert_eq!(source.entries(), &[(0, 0)]);
    }

    #[test]
    fn count_source_counts_rows_per_item() {
        let data_dict = DataDictionary::from_interactions(&interactions());

        let records = vec![
            ("i1".to_string(), "e1".to_string(), 1.0),
            ("i1".to_string(), "e2".to_string(), 1.0),
            ("i2".to_string(), "e1".to_string(), 1.0),
        ];
        let source = count_source("episodes", 0.3, &records, &data_dict, 4);

        // counts [2, 1] bucketed over [1, 2]
        assert_eq!(source.num_features, 5);
        assert_eq!(source.entries(), &[(0, 3), (1, 0)]);
    }

    #[test]
    fn best_record_round_trips_exactly() {
        let mut params = BTreeMap::new();
        params.insert("top_k".to_string(), 344.7000000000001);
        params.insert("l1_ratio".to_string(), 0.9186);

        let result = SearchResult { target: 0.060724, params };

        let as_json = serde_json::to_string(&result).unwrap();
        let restored: SearchResult = serde_json::from_str(&as_json).unwrap();

        assert_eq!(restored, result);
    }
}
