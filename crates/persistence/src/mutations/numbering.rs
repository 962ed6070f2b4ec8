// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Permit number allocation.

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit_domain::PermitNumber;
use num_traits::ToPrimitive;
use tracing::debug;

use crate::diesel_schema::permit_number_sequences;
use crate::error::PersistenceError;

/// Allocates the next permit number for the given month.
///
/// The sequence is per year and never goes backwards, including after a
/// draft permit that held a number is deleted.
///
/// # Arguments
///
/// * `conn` - The active database connection
/// * `year` - The calendar year
/// * `month` - The calendar month, 1 to 12
///
/// # Errors
///
/// Returns an error if the sequence cannot be advanced.
pub fn allocate_permit_number(
    conn: &mut SqliteConnection,
    year: i32,
    month: u8,
) -> Result<PermitNumber, PersistenceError> {
    let next: i64 = diesel::insert_into(permit_number_sequences::table)
        .values((
            permit_number_sequences::year.eq(year),
            permit_number_sequences::last_value.eq(1_i64),
        ))
        .on_conflict(permit_number_sequences::year)
        .do_update()
        .set(permit_number_sequences::last_value.eq(permit_number_sequences::last_value + 1))
        .returning(permit_number_sequences::last_value)
        .get_result(conn)?;

    let sequence: u32 = next.to_u32().ok_or_else(|| {
        PersistenceError::Other(format!("Permit number sequence exhausted for {year}"))
    })?;
    let number: PermitNumber = PermitNumber::from_sequence(year, month, sequence);
    debug!(permit_number = %number, "Allocated permit number");
    Ok(number)
}
