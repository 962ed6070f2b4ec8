// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit_domain::{HazardCategory, HazardCategoryTable};
use tracing::info;

use crate::diesel_schema::hazard_categories;
use crate::error::PersistenceError;

/// Builds the hazard category table from the seeded rows.
///
/// Every category must be stored exactly once under a distinct id.
///
/// # Errors
///
/// Returns `CategoryTableMismatch` if a stored name is unknown or the rows
/// do not cover every category exactly once.
pub fn load_category_table(
    conn: &mut SqliteConnection,
) -> Result<HazardCategoryTable, PersistenceError> {
    let rows: Vec<(i64, String)> = hazard_categories::table
        .select((hazard_categories::category_id, hazard_categories::name))
        .order(hazard_categories::category_id.asc())
        .load::<(i64, String)>(conn)?;

    let entries: Vec<(i64, HazardCategory)> = rows
        .into_iter()
        .map(|(id, name)| {
            name.parse::<HazardCategory>()
                .map(|category| (id, category))
                .map_err(|e| PersistenceError::CategoryTableMismatch(e.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let table: HazardCategoryTable = HazardCategoryTable::new(entries)
        .map_err(|e| PersistenceError::CategoryTableMismatch(e.to_string()))?;
    info!("Verified hazard category table");
    Ok(table)
}
