// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::PRIMARY_KEY_COLUMN;
use crate::form::compile::date::normalize_date;
use crate::form::Value;
use crate::schema::{ColumnDescriptor, DataType};

/// Sentinel following every id of a multi-value link parameter.
const MULTI_LINK_SENTINEL: &str = "0";

/// Serializes a field value into the parameter value the backend expects for its column type.
pub fn serialize_value(column: &ColumnDescriptor, value: &Value) -> Value {
    match column.data_type {
        DataType::DateTime => value
            .as_text()
            .and_then(|text| normalize_date(&text, column.display_format.as_deref()))
            .map(Value::Text)
            .unwrap_or(Value::Null),
        DataType::Choice if column.is_multiple => Value::Text(value.items().join(",")),
        DataType::Link if column.is_multiple => Value::Text(multi_link_ids(&value.items())),
        DataType::Link => match value.as_text() {
            Some(id) if !id.trim().is_empty() => Value::Text(id.trim().to_string()),
            _ => Value::Null,
        },
        DataType::YesNo => Value::Bool(value.as_bool()),
        DataType::Binary => value.clone(),
        DataType::Text
        | DataType::Number
        | DataType::Choice
        | DataType::Calculated => match value {
            Value::Null => Value::Text(String::new()),
            Value::List(items) => Value::Text(items.join(",")),
            _ => value.clone(),
        },
    }
}

/// Joins link ids with the sentinel after each id, dropping blanks and duplicates:
/// `["3", "7"]` becomes `"3,0,7,0"`.
pub fn multi_link_ids(ids: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();

    for id in ids.iter().map(|id| id.trim()) {
        if id.is_empty() || id == MULTI_LINK_SENTINEL || seen.contains(&id) {
            continue;
        }
        seen.push(id);
    }

    seen.iter()
        .map(|id| format!("{id},{MULTI_LINK_SENTINEL}"))
        .collect::<Vec<String>>()
        .join(",")
}

/// Value expression of an assignment.
///
/// Single links are resolved by the backend in both statement kinds. Inserts cast text and
/// multi-value link parameters explicitly, updates bind them as they are.
pub fn value_expression(column: &ColumnDescriptor, parameter: &str, for_insert: bool) -> String {
    if column.is_single_link() {
        return resolve_link(parameter);
    }

    let needs_cast = column.data_type == DataType::Text || column.is_multi_link();
    if for_insert && needs_cast {
        format!("CAST({parameter} AS nvarchar(100))")
    } else {
        parameter.to_string()
    }
}

/// Backend call converting a link id into the identity value of the target row.
pub fn resolve_link(parameter: &str) -> String {
    format!("RESOLVELINK({parameter}, '{PRIMARY_KEY_COLUMN}')")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::form::Value;
    use crate::schema::{ColumnDescriptor, DataType, TableColumn, TableRef};

    use super::{multi_link_ids, serialize_value, value_expression};

    fn column(data_type: DataType, is_multiple: bool) -> ColumnDescriptor {
        let mut column = TableColumn::new(1, "Column", data_type);
        column.is_multiple = is_multiple;
        column.display_format = Some("YYYY-MM-DD".into());
        ColumnDescriptor::from_table_column(&TableRef::new("Sales", "Orders"), &column)
    }

    #[rstest]
    #[case(DataType::Text, false, Value::Null, Value::from(""))]
    #[case(DataType::Number, false, Value::from(12.5), Value::from(12.5))]
    #[case(DataType::YesNo, false, Value::Null, Value::from(false))]
    #[case(DataType::YesNo, false, Value::from("yes"), Value::from(true))]
    #[case(DataType::Choice, true, Value::from(vec!["Red", "Blue"]), Value::from("Red,Blue"))]
    #[case(DataType::Choice, false, Value::from("Red"), Value::from("Red"))]
    #[case(DataType::Link, false, Value::from(5_i64), Value::from("5"))]
    #[case(DataType::Link, false, Value::Null, Value::Null)]
    #[case(DataType::Link, true, Value::from(vec!["3", "7"]), Value::from("3,0,7,0"))]
    #[case(DataType::DateTime, false, Value::from("2024-01-05"), Value::from("2024-01-05T12:00:00.000Z"))]
    #[case(DataType::DateTime, false, Value::from("someday"), Value::Null)]
    fn serializes_by_column_type(
        #[case] data_type: DataType,
        #[case] is_multiple: bool,
        #[case] value: Value,
        #[case] expected: Value,
    ) {
        assert_eq!(serialize_value(&column(data_type, is_multiple), &value), expected);
    }

    #[test]
    fn drops_duplicate_and_blank_link_ids() {
        let ids: Vec<String> = vec!["3".into(), "".into(), "7".into(), "3".into(), "0".into()];
        assert_eq!(multi_link_ids(&ids), "3,0,7,0");
        assert_eq!(multi_link_ids(&[]), "");
    }

    #[test]
    fn casts_only_inside_inserts() {
        let text = column(DataType::Text, false);
        assert_eq!(value_expression(&text, "@p0", true), "CAST(@p0 AS nvarchar(100))");
        assert_eq!(value_expression(&text, "@p0", false), "@p0");

        let tags = column(DataType::Link, true);
        assert_eq!(value_expression(&tags, "@p1", true), "CAST(@p1 AS nvarchar(100))");
        assert_eq!(value_expression(&tags, "@p1", false), "@p1");

        let customer = column(DataType::Link, false);
        assert_eq!(
            value_expression(&customer, "@p2", false),
            "RESOLVELINK(@p2, 'Cinchy ID')"
        );
    }
}
