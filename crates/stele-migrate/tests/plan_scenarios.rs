//! End-to-end planning scenarios.

use stele_core::prelude::*;
use stele_migrate::prelude::*;

fn nvarchar(n: u16) -> SqlType {
    SqlType::NVarChar(TextLength::Chars(n))
}

fn keyed(name: &str) -> TableSchema {
    TableSchema::new(name)
        .column(ColumnSchema::new("Id", SqlType::Int).identity())
        .primary_key(PrimaryKeySchema::auto(name, vec!["Id".to_string()]))
}

#[test]
fn adding_one_column_yields_exactly_one_statement() {
    let live = DatabaseSchema::new().table(
        keyed("Customer").column(ColumnSchema::new("Name", nvarchar(50)).not_null()),
    );
    let desired = vec![keyed("Customer")
        .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
        .column(ColumnSchema::new("Email", nvarchar(100)))];

    let plan = Planner::mssql()
        .plan(&live, desired, &StaticOracle::new())
        .unwrap();

    assert_eq!(plan.operations.len(), 1);
    assert!(matches!(
        &plan.operations[0],
        MigrationOperation::AddColumn { column, .. }
            if column.name == "Email" && column.nullable
    ));
    assert!(plan
        .script
        .contains("ALTER TABLE [dbo].[Customer] ADD [Email] nvarchar(100) NULL"));
    assert!(plan.warnings.is_empty());
}

#[test]
fn missing_table_takes_the_create_path() {
    let desired = vec![keyed("Customer").column(ColumnSchema::new("Name", nvarchar(50)).not_null())];

    let plan = Planner::mssql()
        .plan(&DatabaseSchema::new(), desired, &StaticOracle::new())
        .unwrap();

    assert!(matches!(
        plan.operations[0],
        MigrationOperation::CreateTable { .. }
    ));
    assert!(plan.script.contains("CREATE TABLE [dbo].[Customer]"));
    assert!(!plan.script.contains("ALTER TABLE [dbo].[Customer] ADD "));
}

#[test]
fn planning_twice_is_idempotent() {
    let desired = || {
        vec![
            keyed("Customer")
                .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
                .navigation(NavigationHint::collection("Orders", "Order")),
            keyed("Order").column(
                ColumnSchema::new("PlacedAt", SqlType::DateTime2)
                    .not_null()
                    .default(DefaultValue::Expression("SYSUTCDATETIME()".to_string())),
            ),
        ]
    };
    let planner = Planner::mssql();
    let oracle = StaticOracle::new();

    let first = planner
        .plan(&DatabaseSchema::new(), desired(), &oracle)
        .unwrap();
    assert!(!first.is_empty());

    // Conceptually apply the plan, then plan again against the result.
    let mut live = DatabaseSchema::new();
    apply_operations(&mut live, &first.operations).unwrap();

    let second = planner.plan(&live, desired(), &oracle).unwrap();
    assert!(second.is_empty(), "unexpected ops: {:?}", second.operations);
}

#[test]
fn dependency_order_holds_across_a_chain() {
    let desired = vec![
        keyed("OrderLine")
            .column(ColumnSchema::new("OrderId", SqlType::Int).not_null())
            .navigation(NavigationHint::reference("Order", "Order")),
        keyed("Order")
            .column(ColumnSchema::new("CustomerId", SqlType::Int).not_null())
            .navigation(NavigationHint::reference("Customer", "Customer")),
        keyed("Customer"),
    ];

    let plan = Planner::mssql()
        .plan(&DatabaseSchema::new(), desired, &StaticOracle::new())
        .unwrap();

    assert_eq!(
        plan.order,
        vec!["dbo.Customer", "dbo.Order", "dbo.OrderLine"]
    );
    let customer = plan.script.find("CREATE TABLE [dbo].[Customer]").unwrap();
    let order = plan.script.find("CREATE TABLE [dbo].[Order]").unwrap();
    let line = plan.script.find("CREATE TABLE [dbo].[OrderLine]").unwrap();
    assert!(customer < order && order < line);
}

#[test]
fn many_to_many_pair_creates_three_tables() {
    let desired = vec![
        keyed("Post")
            .column(ColumnSchema::new("Title", nvarchar(200)).not_null())
            .navigation(NavigationHint::collection("Tags", "Tag")),
        keyed("Tag")
            .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
            .navigation(NavigationHint::collection("Posts", "Post")),
    ];

    let plan = Planner::mssql()
        .plan(&DatabaseSchema::new(), desired, &StaticOracle::new())
        .unwrap();

    assert!(plan.script.contains("CREATE TABLE [dbo].[Post]"));
    assert!(plan.script.contains("CREATE TABLE [dbo].[Tag]"));
    assert!(plan.script.contains("CREATE TABLE [dbo].[PostTag]"));
    // The join table lands after both ends it references.
    let post = plan.script.find("CREATE TABLE [dbo].[Post] ").unwrap_or_else(|| {
        plan.script.find("CREATE TABLE [dbo].[Post]").unwrap()
    });
    let tag = plan.script.find("CREATE TABLE [dbo].[Tag]").unwrap();
    let join = plan.script.find("CREATE TABLE [dbo].[PostTag]").unwrap();
    assert!(join > post && join > tag);
}

#[test]
fn oversized_index_is_omitted_with_a_script_comment() {
    let desired = vec![keyed("Document")
        .column(ColumnSchema::new("PathA", SqlType::VarChar(TextLength::Chars(500))).not_null())
        .column(ColumnSchema::new("PathB", SqlType::VarChar(TextLength::Chars(500))).not_null())
        .index(IndexSchema::new(
            "IX_Document_Path",
            vec!["PathA".to_string(), "PathB".to_string()],
        ))];

    let plan = Planner::mssql()
        .plan(&DatabaseSchema::new(), desired, &StaticOracle::new())
        .unwrap();

    assert!(!plan.script.contains("CREATE INDEX [IX_Document_Path]"));
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.script.contains("-- WARNING:"));
    assert!(plan.script.contains("IX_Document_Path"));
}

#[test]
fn identity_toggle_on_populated_table_only_warns() {
    let mut live_customer = keyed("Customer");
    live_customer.get_column_mut("Id").unwrap().identity = false;
    let live = DatabaseSchema::new().table(live_customer);

    let oracle = StaticOracle::new().non_empty_table("dbo", "Customer");
    let plan = Planner::mssql()
        .plan(&live, vec![keyed("Customer")], &oracle)
        .unwrap();

    assert!(plan.operations.is_empty());
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.warnings[0].key.starts_with("identity:"));
}

#[test]
fn every_generated_statement_is_guarded() {
    let desired = vec![
        keyed("Customer")
            .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
            .navigation(NavigationHint::collection("Orders", "Order"))
            .index(IndexSchema::new("IX_Customer_Name", vec!["Name".to_string()]).unique()),
        keyed("Order"),
    ];

    let plan = Planner::mssql()
        .plan(&DatabaseSchema::new(), desired, &StaticOracle::new())
        .unwrap();

    for statement in plan
        .script
        .split("\nGO\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        // Every batch either starts with a comment line or an existence
        // guard; nothing executes unconditionally.
        let body = statement
            .lines()
            .find(|l| !l.starts_with("--"))
            .unwrap_or("");
        assert!(
            body.starts_with("IF "),
            "unguarded statement: {statement}"
        );
    }
}

#[test]
fn snapshot_survives_json_round_trip_and_rediff() {
    let desired = vec![
        keyed("Customer")
            .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
            .navigation(NavigationHint::collection("Orders", "Order")),
        keyed("Order"),
    ];
    let planner = Planner::mssql();
    let oracle = StaticOracle::new();

    let plan = planner
        .plan(&DatabaseSchema::new(), desired.clone(), &oracle)
        .unwrap();
    let mut live = DatabaseSchema::new();
    apply_operations(&mut live, &plan.operations).unwrap();

    // Persist the live snapshot and read it back, as the out-of-process
    // reader would.
    let restored = DatabaseSchema::from_json(&live.to_json().unwrap()).unwrap();
    let rerun = planner.plan(&restored, desired, &oracle).unwrap();
    assert!(rerun.is_empty());
}
