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

/// Maps the arbitrary string identifiers of the input tables to consecutive
/// integer ids and keeps basic statistics of the data. The item count of every
/// matrix in the pipeline derives from here, never from a constant.
#[derive(Debug, Clone)]
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_interactions: u64,
}

impl DataDictionary {

    pub fn from_interactions(records: &[(String, String, f64)]) -> Self {

        let mut user_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());
        let mut item_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_interactions: u64 = 0;

        for &(ref user, ref item, _) in records.iter() {

            if !user_dict.contains_key(user) {
                let next_id = user_dict.len() as u32;
                user_dict.insert(user.clone(), next_id);
            }

            if !item_dict.contains_key(item) {
                let next_id = item_dict.len() as u32;
                item_dict.insert(item.clone(), next_id);
            }

            num_interactions += 1;
        }

        DataDictionary { user_dict, item_dict, num_interactions }
    }

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_interactions(&self) -> u64 {
        self.num_interactions
    }

    pub fn user_index(&self, name: &str) -> Option<&u32> {
        self.user_dict.get(name)
    }

    pub fn item_index(&self, name: &str) -> Option<&u32> {
        self.item_dict.get(name)
    }
}

/// Reverse index from integer ids back to the original identifiers, used when
/// writing rankings for the outside world.
pub struct Renaming {
    user_names: FnvHashMap<u32, String>,
    item_names: FnvHashMap<u32, String>,
}

impl Renaming {

    pub fn user_name(&self, user_index: u32) -> &str {
        &self.user_names[&user_index]
    }

    pub fn item_name(&self, item_index: u32) -> &str {
        &self.item_names[&item_index]
    }
}

impl From<DataDictionary> for Renaming {

    fn from(data_dict: DataDictionary) -> Self {

        let mut user_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_users(), Default::default());
        let mut item_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_items(), Default::default());

        for (user, user_id) in data_dict.user_dict.into_iter() {
            user_names.insert(user_id, user);
        }

        for (item, item_id) in data_dict.item_dict.into_iter() {
            item_names.insert(item_id, item);
        }

        Renaming { user_names, item_names }
    }
}
