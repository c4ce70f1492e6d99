//! Student table mapping: Postgres `student` rows to the destination `student`
//! table, column for column.

use super::{FieldMapper, FieldRule};
use crate::models::FieldType;

/// Destination column order of the student insert statement
pub const STUDENT_COLUMNS: [&str; 6] = [
    "id",
    "first_name",
    "last_name",
    "email",
    "dept_id",
    "is_active",
];

/// Field mapping for the student copy step
pub fn student_mapping() -> FieldMapper {
    FieldMapper::new()
        .field("id", FieldRule::copy("id", FieldType::Int))
        .field("first_name", FieldRule::copy("first_name", FieldType::Text).nullable())
        .field("last_name", FieldRule::copy("last_name", FieldType::Text).nullable())
        .field("email", FieldRule::copy("email", FieldType::Text).nullable())
        .field("dept_id", FieldRule::copy("dept_id", FieldType::Int))
        .field("is_active", FieldRule::coerce("is_active", FieldType::Bool))
}
