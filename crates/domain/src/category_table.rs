// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::hazard::{HAZARD_CATEGORY_COUNT, HazardCategory};
use std::collections::BTreeMap;

/// Bidirectional mapping between hazard categories and stored category ids.
///
/// Built once at startup and checked for completeness: every category has
/// exactly one id and every id names exactly one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardCategoryTable {
    ids: [i64; HAZARD_CATEGORY_COUNT],
    categories: BTreeMap<i64, HazardCategory>,
}

impl HazardCategoryTable {
    /// Builds the table from `(id, category)` pairs.
    ///
    /// # Arguments
    ///
    /// * `entries` - The stored id for each category
    ///
    /// # Errors
    ///
    /// Returns `InvalidCategoryTable` if a category is missing or repeated,
    /// or an id is used more than once.
    pub fn new(
        entries: impl IntoIterator<Item = (i64, HazardCategory)>,
    ) -> Result<Self, DomainError> {
        let mut ids: [Option<i64>; HAZARD_CATEGORY_COUNT] = [None; HAZARD_CATEGORY_COUNT];
        let mut categories: BTreeMap<i64, HazardCategory> = BTreeMap::new();

        for (id, category) in entries {
            if let Some(existing) = categories.insert(id, category) {
                return Err(DomainError::InvalidCategoryTable(format!(
                    "id {id} is assigned to both {existing} and {category}"
                )));
            }
            let slot: &mut Option<i64> = &mut ids[category.index()];
            if let Some(previous) = slot.replace(id) {
                return Err(DomainError::InvalidCategoryTable(format!(
                    "{category} is assigned to both id {previous} and id {id}"
                )));
            }
        }

        let mut resolved: [i64; HAZARD_CATEGORY_COUNT] = [0; HAZARD_CATEGORY_COUNT];
        for category in HazardCategory::ALL {
            resolved[category.index()] = ids[category.index()].ok_or_else(|| {
                DomainError::InvalidCategoryTable(format!("{category} has no id"))
            })?;
        }

        Ok(Self {
            ids: resolved,
            categories,
        })
    }

    /// The table matching the seeded `hazard_categories` rows.
    ///
    /// Ids run from 1 in declaration order.
    #[must_use]
    pub fn standard() -> Self {
        let mut ids: [i64; HAZARD_CATEGORY_COUNT] = [0; HAZARD_CATEGORY_COUNT];
        let mut categories: BTreeMap<i64, HazardCategory> = BTreeMap::new();
        for (id, category) in (1_i64..).zip(HazardCategory::ALL) {
            ids[category.index()] = id;
            categories.insert(id, category);
        }
        Self { ids, categories }
    }

    /// The stored id of a category.
    #[must_use]
    pub const fn id_of(&self, category: HazardCategory) -> i64 {
        self.ids[category.index()]
    }

    /// The category stored under an id, if any.
    #[must_use]
    pub fn category_of(&self, id: i64) -> Option<HazardCategory> {
        self.categories.get(&id).copied()
    }

    /// Iterates `(id, category)` pairs in id order.
    pub fn entries(&self) -> impl Iterator<Item = (i64, HazardCategory)> + '_ {
        self.categories.iter().map(|(id, c)| (*id, *c))
    }
}
