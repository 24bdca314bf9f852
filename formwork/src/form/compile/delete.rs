// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::form::compile::{primary_key_filter, CompiledStatement};
use crate::form::Form;

impl Form {
    /// Compiles the statement deleting one live row of this form's table.
    pub fn compile_delete(&self, row_id: i64) -> CompiledStatement {
        CompiledStatement {
            text: Some(format!(
                "DELETE FROM {} {}",
                self.table,
                primary_key_filter(row_id)
            )),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::form::Form;
    use crate::test_utils::order_form;

    #[rstest]
    fn deletes_live_row_by_primary_key(order_form: Form) {
        let child = order_form.child_form(1, 0).unwrap();

        assert_eq!(
            child.compile_delete(9).text.as_deref(),
            Some("DELETE FROM [Sales].[Order Lines] WHERE [Cinchy ID] = 9 AND [Deleted] IS NULL")
        );
    }
}
