// SPDX-License-Identifier: AGPL-3.0-or-later

use rstest::fixture;

use crate::form::{Field, Form, ParentRef, Section};
use crate::schema::{ChildFormLink, ColumnDescriptor, DataType, TableColumn, TableRef};

fn field(table: &TableRef, form_id: i64, column: &TableColumn) -> Field {
    Field::new(
        column.id,
        &column.name,
        ColumnDescriptor::from_table_column(table, column),
        form_id,
    )
}

/// Customers form with one field per column type:
///
/// | index | column   | type                 |
/// |-------|----------|----------------------|
/// | 0     | Name     | Text, mandatory      |
/// | 1     | Notes    | Text                 |
/// | 2     | Region   | Link                 |
/// | 3     | Since    | Date and Time        |
/// | 4     | Tags     | Link, multiple       |
/// | 5     | Active   | Yes/No               |
/// | 6     | Contract | Binary               |
#[fixture]
pub fn customer_form() -> Form {
    let table = TableRef::new("Sales", "Customers");

    let mut name = TableColumn::new(101, "Name", DataType::Text);
    name.is_mandatory = true;

    let notes = TableColumn::new(102, "Notes", DataType::Text);

    let mut region = TableColumn::new(103, "Region", DataType::Link);
    region.link_target_table_id = Some(40);
    region.link_target_column_name = Some("Name".into());
    region.link_target_table = Some(TableRef::new("Sales", "Regions"));

    let mut since = TableColumn::new(104, "Since", DataType::DateTime);
    since.display_format = Some("YYYY-MM-DD".into());

    let mut tags = TableColumn::new(105, "Tags", DataType::Link);
    tags.is_multiple = true;
    tags.link_target_table_id = Some(50);
    tags.link_target_column_name = Some("Label".into());
    tags.link_target_table = Some(TableRef::new("Sales", "Tags"));

    let active = TableColumn::new(106, "Active", DataType::YesNo);

    let mut contract = TableColumn::new(107, "Contract", DataType::Binary);
    contract.file_name_column = Some("Contract Name".into());

    let columns = vec![name, notes, region, since, tags, active, contract];

    let mut section = Section::new(100, "General");
    section.fields = columns
        .iter()
        .map(|column| field(&table, 1, column))
        .collect();

    let mut form = Form::new(1, "Customers", table.clone(), 10);
    form.table_columns = columns
        .iter()
        .map(|column| ColumnDescriptor::from_table_column(&table, column))
        .collect();
    form.sections.push(section);
    form.rebuild_indices();
    form
}

/// Orders form with a flattened child form listing the order lines.
///
/// Section 0 holds `Title` (mandatory text) and `Customer` (link), section 1 holds the `Lines`
/// child form with `Line`, `Product` (mandatory), `Quantity` and `Order Title`, which mirrors the
/// parent's `Title`. The child is linked through its `Order` column, which has no field.
#[fixture]
pub fn order_form() -> Form {
    let table = TableRef::new("Sales", "Orders");
    let lines_table = TableRef::new("Sales", "Order Lines");

    let mut title = TableColumn::new(201, "Title", DataType::Text);
    title.is_mandatory = true;

    let mut customer = TableColumn::new(202, "Customer", DataType::Link);
    customer.link_target_table_id = Some(10);
    customer.link_target_column_name = Some("Name".into());
    customer.link_target_table = Some(TableRef::new("Sales", "Customers"));

    let line = TableColumn::new(301, "Line", DataType::Number);
    let mut product = TableColumn::new(302, "Product", DataType::Text);
    product.is_mandatory = true;
    let quantity = TableColumn::new(303, "Quantity", DataType::Number);
    let order_title = TableColumn::new(304, "Order Title", DataType::Text);
    let mut order = TableColumn::new(305, "Order", DataType::Link);
    order.link_target_table_id = Some(20);
    order.link_target_column_name = Some("Title".into());
    order.link_target_table = Some(table.clone());

    let link = ChildFormLink {
        form_id: 3,
        parent_id: "Cinchy ID".into(),
        link_id: Some("[Order].[Cinchy ID]".into()),
        filter: Some("[Quantity] > 0".into()),
        sort: Some("[Line]".into()),
        flatten: true,
    };

    let mut child = Form::new_child(
        3,
        "Order Lines",
        lines_table.clone(),
        30,
        &link,
        ParentRef {
            form_id: 2,
            table: table.clone(),
        },
    );

    let mut mirrored = field(&lines_table, 3, &order_title);
    mirrored.column.linked_field_column = Some("Title".into());

    let mut child_section = Section::new(300, "Line");
    child_section.fields = vec![
        field(&lines_table, 3, &line),
        field(&lines_table, 3, &product),
        field(&lines_table, 3, &quantity),
        mirrored,
    ];
    child.sections.push(child_section);
    child.table_columns = [&line, &product, &quantity, &order_title, &order]
        .iter()
        .map(|column| ColumnDescriptor::from_table_column(&lines_table, column))
        .collect();

    let mut order_section = Section::new(200, "Order");
    order_section.fields = vec![field(&table, 2, &title), field(&table, 2, &customer)];

    let mut lines = Field::new(203, "Lines", ColumnDescriptor::shape(&table, "Lines"), 2);
    lines.child_form = Some(Box::new(child));

    let mut lines_section = Section::new(201, "Lines");
    lines_section.fields = vec![lines];

    let mut form = Form::new(2, "Orders", table.clone(), 20);
    form.table_columns = [&title, &customer]
        .iter()
        .map(|column| ColumnDescriptor::from_table_column(&table, column))
        .collect();
    form.sections = vec![order_section, lines_section];
    form.rebuild_indices();
    form
}
