#![allow(dead_code)]

use databridge::models::{Record, SourceRecord};
use proptest::prelude::*;

/// Strategy for optional text columns
pub fn text_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(0.9, "[a-zA-Z0-9 .@_-]{0,40}")
}

/// Strategy for the source representation of the active flag
pub fn active_flag_strategy() -> impl Strategy<Value = databridge::FieldValue> {
    use databridge::FieldValue;
    prop_oneof![
        any::<bool>().prop_map(FieldValue::Bool),
        (0i64..=1).prop_map(FieldValue::Int),
        prop_oneof![Just("true"), Just("false"), Just("1"), Just("0")]
            .prop_map(|s| FieldValue::Text(s.to_string())),
    ]
}

/// Strategy for well-formed student source rows
pub fn student_record_strategy() -> impl Strategy<Value = SourceRecord> {
    (
        any::<i64>(),
        text_strategy(),
        text_strategy(),
        text_strategy(),
        1i64..100,
        active_flag_strategy(),
    )
        .prop_map(|(id, first, last, email, dept, active)| {
            SourceRecord(
                Record::new()
                    .with("id", id)
                    .with("first_name", first)
                    .with("last_name", last)
                    .with("email", email)
                    .with("dept_id", dept)
                    .with("is_active", active),
            )
        })
}

/// (record count, chunk size)
pub fn chunking_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..1_000, 1usize..300)
}
