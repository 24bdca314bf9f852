// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::sync::Mutex;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::form::{Field, Form, Value};

/// Outcome of validating a form before it gets compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// All visible fields passed.
    pub is_valid: bool,

    /// Message describing the failures, `None` if the form is valid.
    pub message: Option<String>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    fn invalid(message: String) -> Self {
        Self {
            is_valid: false,
            message: Some(message),
        }
    }
}

/// Compiled validation expressions, keyed by their source.
static EXPRESSIONS: Lazy<Mutex<HashMap<String, Result<Regex, regex::Error>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

enum Failure {
    Required(String),
    Format(String),
}

impl Failure {
    fn message(&self) -> String {
        match self {
            Failure::Required(label) => required_message(&[label.as_str()]),
            Failure::Format(column) => format_message(column),
        }
    }
}

impl Form {
    /// Validates all visible fields of a parent form.
    ///
    /// Every mandatory field without a value is listed in one aggregated message, every value
    /// not matching its column's validation expression adds a line naming the column. Values
    /// of fields with a validation expression get trimmed in place, nothing else is modified.
    pub fn check_form_validation(&mut self) -> ValidationResult {
        let failures = self.collect_failures();

        let required: Vec<&str> = failures
            .iter()
            .filter_map(|failure| match failure {
                Failure::Required(label) => Some(label.as_str()),
                Failure::Format(_) => None,
            })
            .collect();

        let mut lines = Vec::new();
        if !required.is_empty() {
            lines.push(required_message(&required));
        }

        for failure in &failures {
            if let Failure::Format(column) = failure {
                lines.push(format_message(column));
            }
        }

        if lines.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(lines.join("\n"))
        }
    }

    /// Validates all visible fields of a child form, reporting only the first failure.
    pub fn check_child_form_validation(&mut self) -> ValidationResult {
        match self.collect_failures().first() {
            Some(failure) => ValidationResult::invalid(failure.message()),
            None => ValidationResult::valid(),
        }
    }

    fn collect_failures(&mut self) -> Vec<Failure> {
        let mut failures = Vec::new();

        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                if !field.is_visible() {
                    continue;
                }

                if field.column.is_mandatory && field.value.is_empty() {
                    failures.push(Failure::Required(field.label.clone()));
                    continue;
                }

                if !matches_expression(field) {
                    failures.push(Failure::Format(field.column.name.clone()));
                }
            }
        }

        failures
    }
}

/// Trims the value of a field carrying a validation expression and checks it. Empty values and
/// fields without an expression always pass.
fn matches_expression(field: &mut Field) -> bool {
    let expression = match field.column.validation_expression.as_deref() {
        Some(expression) if !expression.trim().is_empty() => expression,
        _ => return true,
    };

    if let Value::Text(text) = &field.value {
        let trimmed = text.trim();
        if trimmed.len() != text.len() {
            field.value = Value::Text(trimmed.to_string());
        }
    }

    let text = match field.value.as_text() {
        Some(text) if !text.is_empty() => text,
        _ => return true,
    };

    match compiled_expression(expression) {
        Ok(regex) => regex.is_match(&text),
        Err(err) => {
            warn!(
                "Ignoring invalid validation expression of column '{}': {}",
                field.column.name, err
            );
            true
        }
    }
}

fn compiled_expression(expression: &str) -> Result<Regex, regex::Error> {
    let mut expressions = match EXPRESSIONS.lock() {
        Ok(expressions) => expressions,
        Err(poisoned) => poisoned.into_inner(),
    };

    expressions
        .entry(expression.to_string())
        .or_insert_with(|| Regex::new(expression))
        .clone()
}

fn required_message(labels: &[&str]) -> String {
    match labels {
        [] => String::new(),
        [label] => format!("Field: {label} is required"),
        [init @ .., last] => format!("Fields: {} and {} are required", init.join(", "), last),
    }
}

fn format_message(column: &str) -> String {
    format!("{column} is not in the correct format")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::form::{Field, Form, Section, Value};
    use crate::schema::{ColumnDescriptor, DataType, TableColumn, TableRef};

    fn field(id: i64, label: &str, mandatory: bool, expression: Option<&str>) -> Field {
        let table = TableRef::new("Sales", "Customers");
        let mut column = TableColumn::new(id, label, DataType::Text);
        column.is_mandatory = mandatory;
        column.validation_expression = expression.map(str::to_string);
        Field::new(
            id,
            label,
            ColumnDescriptor::from_table_column(&table, &column),
            1,
        )
    }

    fn form(fields: Vec<Field>) -> Form {
        let mut form = Form::new(1, "Customers", TableRef::new("Sales", "Customers"), 10);
        let mut section = Section::new(1, "General");
        section.fields = fields;
        form.sections.push(section);
        form.rebuild_indices();
        form
    }

    #[rstest]
    #[case(vec!["A"], "Field: A is required")]
    #[case(vec!["A", "B"], "Fields: A and B are required")]
    #[case(vec!["A", "B", "C"], "Fields: A, B and C are required")]
    fn aggregates_required_fields(#[case] labels: Vec<&str>, #[case] expected: &str) {
        let fields = labels
            .iter()
            .enumerate()
            .map(|(index, label)| field(index as i64, label, true, None))
            .collect();

        let result = form(fields).check_form_validation();

        assert!(!result.is_valid);
        assert_eq!(result.message.as_deref(), Some(expected));
    }

    #[test]
    fn hidden_fields_are_not_validated() {
        let mut hidden = field(1, "Secret", true, None);
        hidden.column.can_view = false;

        let result = form(vec![hidden]).check_form_validation();

        assert!(result.is_valid);
        assert_eq!(result.message, None);
    }

    #[test]
    fn trims_values_checked_against_an_expression() {
        let mut zip = field(1, "Zip", false, Some("^[0-9]{5}$"));
        zip.value = Value::from("  12345 ");
        let mut form = form(vec![zip]);

        let result = form.check_form_validation();

        assert!(result.is_valid);
        assert_eq!(form.field(0, 0).unwrap().value, Value::from("12345"));
        assert!(!form.has_changed());
    }

    #[test]
    fn reports_format_failures_after_required_fields() {
        let name = field(1, "Name", true, None);
        let mut zip = field(2, "Zip", false, Some("^[0-9]{5}$"));
        zip.value = Value::from("12a45");

        let result = form(vec![name, zip]).check_form_validation();

        assert_eq!(
            result.message.as_deref(),
            Some("Field: Name is required\nZip is not in the correct format")
        );
    }

    #[test]
    fn child_validation_reports_first_failure_only() {
        let mut zip = field(1, "Zip", false, Some("^[0-9]{5}$"));
        zip.value = Value::from("nope");
        let name = field(2, "Name", true, None);

        let result = form(vec![zip, name]).check_child_form_validation();

        assert!(!result.is_valid);
        assert_eq!(
            result.message.as_deref(),
            Some("Zip is not in the correct format")
        );
    }

    #[test]
    fn compiles_each_expression_once() {
        let expression = "^[A-Z]{2}-[0-9]+$";

        let mut first = field(1, "Code", false, Some(expression));
        first.value = Value::from("AB-12");
        let mut second = field(2, "Other Code", false, Some(expression));
        second.value = Value::from("ab-12");

        let result = form(vec![first, second]).check_form_validation();
        assert_eq!(
            result.message.as_deref(),
            Some("Other Code is not in the correct format")
        );

        assert!(super::EXPRESSIONS.lock().unwrap().contains_key(expression));
        assert!(super::compiled_expression(expression).unwrap().is_match("XY-7"));
        assert!(super::compiled_expression("[unclosed").is_err());
    }
}
