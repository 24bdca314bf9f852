// SPDX-License-Identifier: AGPL-3.0-or-later

use rstest::fixture;

use crate::schema::{
    ChildFormLink, ColumnEntitlement, DataType, FieldMetadata, FormMetadata, MetadataBundle,
    SectionMetadata, StaticMetadataProvider, TableColumn, TableDefinition, TableEntitlements,
    TableRef,
};

fn field(
    id: i64,
    form_id: i64,
    section_id: i64,
    position: i32,
    column: &TableColumn,
) -> FieldMetadata {
    FieldMetadata {
        id,
        form_id,
        section_id,
        position,
        label: column.name.clone(),
        column_id: Some(column.id),
        ..Default::default()
    }
}

/// Descriptors of the orders form, its order lines child form and the tables behind them.
///
/// Fields and sections are listed out of display order. The current user may not edit the
/// `Customer` column.
pub fn order_bundle() -> MetadataBundle {
    let orders = TableRef::new("Sales", "Orders");
    let lines = TableRef::new("Sales", "Order Lines");

    let mut title = TableColumn::new(201, "Title", DataType::Text);
    title.is_mandatory = true;

    let mut customer = TableColumn::new(202, "Customer", DataType::Link);
    customer.link_target_column_id = Some(101);
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
    order.link_target_table = Some(orders.clone());

    let mut mirrored = field(3004, 3, 300, 3, &order_title);
    mirrored.linked_field_column = Some("Title".into());

    let lines_field = FieldMetadata {
        id: 2003,
        form_id: 2,
        section_id: 201,
        position: 0,
        label: "Lines".into(),
        column_name: Some("Lines".into()),
        child_form: Some(ChildFormLink {
            form_id: 3,
            parent_id: "Cinchy ID".into(),
            link_id: Some("[Order].[Cinchy ID]".into()),
            filter: None,
            sort: Some("[Line]".into()),
            flatten: true,
        }),
        ..Default::default()
    };

    MetadataBundle {
        forms: vec![
            FormMetadata {
                id: 2,
                name: "Orders".into(),
                table: orders,
                table_id: 20,
            },
            FormMetadata {
                id: 3,
                name: "Order Lines".into(),
                table: lines,
                table_id: 30,
            },
        ],
        sections: vec![
            SectionMetadata {
                id: 201,
                form_id: 2,
                label: "Lines".into(),
                position: 1,
            },
            SectionMetadata {
                id: 200,
                form_id: 2,
                label: "Order".into(),
                position: 0,
            },
            SectionMetadata {
                id: 300,
                form_id: 3,
                label: "Line".into(),
                position: 0,
            },
        ],
        fields: vec![
            field(2002, 2, 200, 1, &customer),
            field(2001, 2, 200, 0, &title),
            lines_field,
            field(3001, 3, 300, 0, &line),
            field(3003, 3, 300, 2, &quantity),
            field(3002, 3, 300, 1, &product),
            mirrored,
        ],
        tables: vec![
            TableDefinition {
                table_id: 20,
                columns: vec![title, customer],
                entitlements: Some(TableEntitlements {
                    table_id: 20,
                    columns: vec![ColumnEntitlement {
                        column_id: 202,
                        can_view: true,
                        can_edit: false,
                    }],
                }),
            },
            TableDefinition {
                table_id: 30,
                columns: vec![line, product, quantity, order_title, order],
                entitlements: None,
            },
        ],
        rows: Vec::new(),
    }
}

#[fixture]
pub fn order_metadata() -> StaticMetadataProvider {
    StaticMetadataProvider::from_bundle(order_bundle())
}
