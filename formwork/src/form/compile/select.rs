// SPDX-License-Identifier: AGPL-3.0-or-later

use log::trace;

use crate::db::{bracket, Parameters, Statement, NOT_DELETED_SQL, PRIMARY_KEY_COLUMN};
use crate::form::compile::{column_expression, primary_key_filter, CompiledStatement};
use crate::form::{column_name_of, label_alias, Form, Value};
use crate::schema::{ColumnDescriptor, DataType};

/// Parameter carrying the parent's linkage value in child selects.
pub const PARENT_ID_PARAMETER: &str = "@parentId";

/// Picks a pending draft value over the committed one.
fn draft_aware(column: &str, target: &str) -> String {
    let committed = format!("{}.{}", bracket(column), bracket(target));
    let draft = format!("{}.[Draft({})]", bracket(column), bracket(target));

    format!("CASE WHEN {draft} IS NULL THEN {committed} ELSE {draft} END")
}

fn projection(column: &ColumnDescriptor) -> Vec<String> {
    match column.data_type {
        DataType::Link => {
            let mut projection = vec![format!(
                "{} AS {}",
                draft_aware(&column.name, PRIMARY_KEY_COLUMN),
                bracket(&column.name)
            )];

            if let Some(target) = &column.link_target_column_name {
                projection.push(format!(
                    "{} AS {}",
                    draft_aware(&column.name, target),
                    bracket(&label_alias(&column.name))
                ));
            }

            projection
        }
        // Contents are fetched on demand, only the file name is read with the record
        DataType::Binary => column
            .file_name_column
            .iter()
            .map(|file_name| bracket(file_name))
            .collect(),
        _ => vec![bracket(&column.name)],
    }
}

impl Form {
    /// Compiles the statement reading this form's record, or the rows of a child form.
    ///
    /// Root forms select the record with the given id. Child forms select all rows linked to
    /// the parent record, applying the configured filter and sort expressions, and ignore
    /// `row_id`. Only columns the current user may view are projected, link columns are read
    /// twice: their id under the column name and their label as `<column> label`.
    ///
    /// Returns `None` if there is nothing to select: a root form without row id, a child form
    /// without configured linkage or without a known parent value.
    pub fn compile_select(
        &self,
        row_id: Option<i64>,
        parent: Option<&Form>,
    ) -> Option<CompiledStatement> {
        let mut columns = vec![bracket(PRIMARY_KEY_COLUMN)];

        for (_, field) in self.fields() {
            if !field.is_visible() || field.column.name.is_empty() || field.column.is_primary_key()
            {
                continue;
            }

            for expression in projection(&field.column) {
                if !columns.contains(&expression) {
                    columns.push(expression);
                }
            }
        }

        let mut parameters = Parameters::new();

        let filter = if self.is_child {
            let link = self.child_form_link_id.as_deref()?;
            let parent_value = self.parent_link_value(parent?)?;
            parameters.insert(PARENT_ID_PARAMETER.to_string(), parent_value);

            let mut filter = format!(
                "WHERE {} = {} AND {}",
                column_expression(link),
                PARENT_ID_PARAMETER,
                NOT_DELETED_SQL
            );

            if let Some(condition) = non_blank(self.child_form_filter.as_deref()) {
                filter.push_str(&format!(" AND ({condition})"));
            }

            if let Some(sort) = non_blank(self.child_form_sort.as_deref()) {
                filter.push_str(&format!(" ORDER BY {sort}"));
            }

            filter
        } else {
            primary_key_filter(row_id?)
        };

        let text = format!(
            "SELECT {} FROM {} {}",
            columns.join(", "),
            self.table,
            filter
        );

        trace!("Compiled select for form {}: {}", self.id, text);

        Some(CompiledStatement {
            text: Some(text),
            parameters,
            attached_files: Vec::new(),
        })
    }

    /// Value of the parent column this child form is linked to, `None` while the parent does
    /// not hold it yet.
    pub(crate) fn parent_link_value(&self, parent: &Form) -> Option<Value> {
        let parent_column = column_name_of(self.child_form_parent_id.as_deref()?);

        if parent_column == PRIMARY_KEY_COLUMN {
            return parent.row_id().map(Value::from);
        }

        parent
            .field_by_column_name(&parent_column)
            .map(|field| field.value.clone())
            .filter(|value| !value.is_empty())
    }
}

/// Compiles the statement reading the `{id, label}` option dataset of a link column, `None` for
/// other columns and links without a target.
pub fn compile_link_options(column: &ColumnDescriptor) -> Option<Statement> {
    if column.data_type != DataType::Link {
        return None;
    }

    let table = column.link_target_table.as_ref()?;
    let target = column.link_target_column_name.as_deref()?;

    Some(Statement::new(
        &format!(
            "SELECT {} AS [id], {} AS [label] FROM {} WHERE {} ORDER BY [label]",
            bracket(PRIMARY_KEY_COLUMN),
            bracket(target),
            table,
            NOT_DELETED_SQL
        ),
        Parameters::new(),
    ))
}

fn non_blank(expression: Option<&str>) -> Option<&str> {
    expression
        .map(str::trim)
        .filter(|expression| !expression.is_empty())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::db::Row;
    use crate::form::{Form, Value};
    use crate::schema::DataType;
    use crate::test_utils::{customer_form, order_form};

    use super::compile_link_options;

    #[rstest]
    fn selects_root_record_by_primary_key(customer_form: Form) {
        let compiled = customer_form.compile_select(Some(42), None).unwrap();

        let text = compiled.text.unwrap();
        assert!(text.starts_with("SELECT [Cinchy ID], [Name], "));
        assert!(text.contains(
            "CASE WHEN [Region].[Draft([Cinchy ID])] IS NULL THEN [Region].[Cinchy ID] \
             ELSE [Region].[Draft([Cinchy ID])] END AS [Region]"
        ));
        assert!(text.contains(
            "CASE WHEN [Region].[Draft([Name])] IS NULL THEN [Region].[Name] \
             ELSE [Region].[Draft([Name])] END AS [Region label]"
        ));
        assert!(text.ends_with(
            "FROM [Sales].[Customers] WHERE [Cinchy ID] = 42 AND [Deleted] IS NULL"
        ));
        assert!(compiled.parameters.is_empty());
    }

    #[rstest]
    fn nothing_to_select_without_row_id(customer_form: Form) {
        assert_eq!(customer_form.compile_select(None, None), None);
    }

    #[rstest]
    fn hides_columns_the_user_may_not_view(mut customer_form: Form) {
        customer_form.sections[0].fields[1].column.can_view = false;

        let text = customer_form.compile_select(Some(1), None).unwrap().text.unwrap();

        assert!(!text.contains("[Notes]"));
    }

    #[rstest]
    fn selects_child_rows_linked_to_parent(order_form: Form) {
        let mut parent = order_form;
        parent.update_root_property(crate::form::FormProperty::RowId(Some(42)));
        let child = parent.child_form(1, 0).unwrap();

        let compiled = child.compile_select(None, Some(&parent)).unwrap();

        let text = compiled.text.unwrap();
        assert!(text.contains("FROM [Sales].[Order Lines] WHERE [Order].[Cinchy ID] = @parentId AND [Deleted] IS NULL AND ([Quantity] > 0) ORDER BY [Line]"));
        assert_eq!(compiled.parameters["@parentId"], Value::from(42_i64));
    }

    #[rstest]
    fn child_of_unsaved_parent_selects_nothing(order_form: Form) {
        let child = order_form.child_form(1, 0).unwrap();

        assert_eq!(child.compile_select(None, Some(&order_form)), None);
    }

    #[rstest]
    fn selects_link_options(customer_form: Form) {
        let region = &customer_form.field(0, 2).unwrap().column;

        assert_eq!(
            compile_link_options(region).unwrap().text,
            "SELECT [Cinchy ID] AS [id], [Name] AS [label] FROM [Sales].[Regions] \
             WHERE [Deleted] IS NULL ORDER BY [label]"
        );
        assert!(compile_link_options(&customer_form.field(0, 0).unwrap().column).is_none());
    }

    /// Names under which the backend returns the columns of a compiled select.
    fn projected_names(text: &str) -> Vec<String> {
        let columns = text
            .strip_prefix("SELECT ")
            .and_then(|rest| rest.split(" FROM ").next())
            .unwrap_or_default();

        columns
            .split(", ")
            .map(|expression| {
                let name = expression.rsplit(" AS ").next().unwrap_or(expression);
                name.trim_start_matches('[').trim_end_matches(']').to_string()
            })
            .collect()
    }

    proptest! {
        #[test]
        fn loads_back_what_the_select_projects(
            customer in "[a-zA-Z0-9 ]{1,12}",
            notes in "[a-zA-Z0-9 ]{0,12}",
            since in "20[0-9]{2}-0[1-9]-1[0-9]",
            active in any::<bool>(),
            region in 1..500_i64,
            file_name in "[a-z]{1,8}\\.pdf",
        ) {
            let mut form = crate::test_utils::customer_form();
            let text = form.compile_select(Some(7), None).unwrap().text.unwrap();
            let names = projected_names(&text);

            let backend: Row = vec![
                ("Cinchy ID", Value::from(7_i64)),
                ("Name", Value::Text(customer)),
                ("Notes", Value::Text(notes)),
                ("Region", Value::from(region)),
                ("Region label", Value::from("North")),
                ("Since", Value::Text(since)),
                ("Tags", Value::from("3,7")),
                ("Tags label", Value::from("Gold,Key")),
                ("Active", Value::Bool(active)),
                ("Contract", Value::Bytes(vec![1, 2, 3])),
                ("Contract Name", Value::Text(file_name.clone())),
            ]
            .into_iter()
            .map(|(column, value)| (column.to_string(), value))
            .collect();

            // The backend answers with exactly the projected columns
            let row: Row = names
                .iter()
                .filter_map(|name| backend.get(name).map(|value| (name.clone(), value.clone())))
                .collect();
            prop_assert_eq!(row.len(), names.len());
            prop_assert!(!names.contains(&"Contract".to_string()));

            form.load_record_data(&row);

            prop_assert_eq!(form.row_id(), Some(7));
            prop_assert!(!form.has_changed());

            for (_, field) in form.fields() {
                match field.column.data_type {
                    DataType::Link | DataType::Binary => continue,
                    _ => {
                        prop_assert_eq!(&field.value, &backend[&field.column.name]);
                    }
                }
            }

            let region_field = form.field(0, 2).unwrap();
            prop_assert_eq!(&region_field.value, &Value::from(region));
            prop_assert_eq!(region_field.label_value.as_deref(), Some("North"));
            prop_assert_eq!(
                &form.field(0, 4).unwrap().value,
                &Value::List(vec!["3".into(), "7".into()])
            );

            // File contents are not read with the record, only the file name
            let contract = form.field(0, 6).unwrap();
            prop_assert_eq!(&contract.value, &Value::Null);
            prop_assert_eq!(contract.file_name.as_deref(), Some(file_name.as_str()));
        }
    }
}
