use core::num::NonZeroUsize;

use crate::{
    BatchMode, Capabilities, Column, DdlBatchEmitter, Dialect, Error, ExistingSchema,
    ExistingTable, ForeignKey, Index, RUN_BATCH, START_BATCH_DDL, SchemaExporter,
    SchemaObjectGraph, SequenceConfig, StatementRenderer, TableNode,
};

const CREATE_GRAND_PARENT: &str = "create table GrandParent \
    (GrandParentId INT64 not null,Name STRING(MAX)) PRIMARY KEY (GrandParentId)";
const CREATE_PARENT: &str = "create table Parent \
    (GrandParentId INT64 not null,ParentId INT64 not null) \
    PRIMARY KEY (GrandParentId,ParentId), INTERLEAVE IN PARENT GrandParent ON DELETE CASCADE";
const CREATE_CHILD: &str = "create table Child \
    (GrandParentId INT64 not null,ParentId INT64 not null,ChildId INT64 not null) \
    PRIMARY KEY (GrandParentId,ParentId,ChildId), INTERLEAVE IN PARENT Parent";

fn tables() -> Vec<TableNode> {
    vec![
        TableNode::new("GrandParent")
            .column(Column::new("GrandParentId", "INT64").not_null())
            .column(Column::new("Name", "STRING(MAX)"))
            .primary_key(["GrandParentId"]),
        TableNode::new("Parent")
            .column(Column::new("GrandParentId", "INT64").not_null())
            .column(Column::new("ParentId", "INT64").not_null())
            .primary_key(["GrandParentId", "ParentId"])
            .interleave_in("GrandParent", true),
        TableNode::new("Child")
            .column(Column::new("ChildId", "INT64").not_null())
            .primary_key(["ChildId"])
            .interleave_in("Parent", false),
    ]
}

fn graph() -> SchemaObjectGraph {
    SchemaObjectGraph::new(tables()).unwrap()
}

fn indexed_graph() -> SchemaObjectGraph {
    let mut tables = tables();
    tables[0] = tables[0]
        .clone()
        .index(Index::new("GrandParentByName", ["Name"]))
        .index(Index::new("GrandParentByNameUnique", ["Name", "GrandParentId"]).unique());
    SchemaObjectGraph::new(tables).unwrap()
}

fn framed(statements: &[&str]) -> Vec<String> {
    core::iter::once(START_BATCH_DDL)
        .chain(statements.iter().copied())
        .chain(core::iter::once(RUN_BATCH))
        .map(str::to_owned)
        .collect()
}

fn position(script: &[String], statement: &str) -> usize {
    script
        .iter()
        .position(|s| s == statement)
        .unwrap_or_else(|| panic!("`{statement}` missing from {script:#?}"))
}

#[test]
fn create_script_is_parent_first() {
    let script = SchemaExporter::new(Dialect::google_sql())
        .generate_create_script(&graph())
        .unwrap();

    assert_eq!(
        script,
        framed(&[CREATE_GRAND_PARENT, CREATE_PARENT, CREATE_CHILD])
    );
}

#[test]
fn drop_script_is_child_first() {
    let script = SchemaExporter::new(Dialect::google_sql())
        .generate_drop_script(&graph())
        .unwrap();

    assert_eq!(
        script,
        framed(&["drop table Child", "drop table Parent", "drop table GrandParent"])
    );
}

#[test]
fn indexes_follow_tables_on_create_and_precede_them_on_drop() {
    let exporter = SchemaExporter::new(Dialect::google_sql());
    let graph = indexed_graph();

    let create = exporter.generate_create_script(&graph).unwrap();
    let by_name = position(&create, "create index GrandParentByName on GrandParent (Name)");
    let by_name_unique = position(
        &create,
        "create unique index GrandParentByNameUnique on GrandParent (Name, GrandParentId)",
    );
    let table = position(&create, CREATE_GRAND_PARENT);
    assert!(table < by_name && table < by_name_unique);
    assert!(position(&create, CREATE_CHILD) < by_name);

    let drop = exporter.generate_drop_script(&graph).unwrap();
    let by_name = position(&drop, "drop index GrandParentByName");
    let by_name_unique = position(&drop, "drop index GrandParentByNameUnique");
    for table in ["drop table Child", "drop table Parent", "drop table GrandParent"] {
        let table = position(&drop, table);
        assert!(by_name < table && by_name_unique < table);
    }
}

#[test]
fn foreign_keys_come_last_and_go_first() {
    let mut tables = tables();
    tables[1] = tables[1].clone().foreign_key(ForeignKey::new(
        "FK_ParentGrandParent",
        ["GrandParentId"],
        "GrandParent",
        ["GrandParentId"],
    ));
    let graph = SchemaObjectGraph::new(tables).unwrap();
    let exporter = SchemaExporter::new(Dialect::google_sql());

    let create = exporter.generate_create_script(&graph).unwrap();
    assert_eq!(
        create[create.len() - 2],
        "alter table Parent add constraint FK_ParentGrandParent \
         foreign key (GrandParentId) references GrandParent (GrandParentId)"
    );

    let drop = exporter.generate_drop_script(&graph).unwrap();
    assert_eq!(
        drop[1],
        "alter table Parent drop constraint FK_ParentGrandParent"
    );
}

#[test]
fn foreign_keys_without_capability_are_unsupported() {
    let mut tables = tables();
    tables[1] = tables[1].clone().foreign_key(ForeignKey::new(
        "FK_ParentGrandParent",
        ["GrandParentId"],
        "GrandParent",
        ["GrandParentId"],
    ));
    let graph = SchemaObjectGraph::new(tables).unwrap();
    let dialect = Dialect::google_sql().with_capabilities(Capabilities {
        foreign_keys: false,
        ..Capabilities::DEFAULT
    });

    let err = SchemaExporter::new(dialect)
        .generate_create_script(&graph)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedDdlOperation { .. }));
}

#[test]
fn cyclic_schema_never_reaches_the_exporter() {
    let mut tables = tables();
    tables[0] = tables[0].clone().interleave_in("Child", false);

    let err = SchemaObjectGraph::new(tables).unwrap_err();
    assert!(matches!(err, Error::SchemaIntegrity { .. }));
}

#[test]
fn batches_are_chunked_in_order() {
    let script = SchemaExporter::new(Dialect::google_sql())
        .with_max_statements_per_batch(NonZeroUsize::new(2).unwrap())
        .generate_create_script(&graph())
        .unwrap();

    assert_eq!(
        script,
        [
            START_BATCH_DDL,
            CREATE_GRAND_PARENT,
            CREATE_PARENT,
            RUN_BATCH,
            START_BATCH_DDL,
            CREATE_CHILD,
            RUN_BATCH,
        ]
    );
}

#[test]
fn empty_scripts() {
    let emitter = DdlBatchEmitter::new().after_batch(["insert into Seed (Id) values (1)"]);

    assert_eq!(
        emitter.emit(BatchMode::Create, Vec::new()),
        [START_BATCH_DDL, RUN_BATCH, "insert into Seed (Id) values (1)"]
    );
    assert_eq!(
        emitter.emit(BatchMode::Drop, Vec::new()),
        [START_BATCH_DDL, RUN_BATCH, "insert into Seed (Id) values (1)"]
    );
    assert!(emitter.emit(BatchMode::Update, Vec::new()).is_empty());
}

#[test]
fn unframed_dialect_emits_bare_statements() {
    let dialect = Dialect::google_sql().with_capabilities(Capabilities {
        batch_ddl: false,
        ..Capabilities::DEFAULT
    });

    let script = SchemaExporter::new(dialect)
        .with_after_batch(["insert into GrandParent (GrandParentId) values (1)"])
        .generate_create_script(&graph())
        .unwrap();
    assert_eq!(
        script,
        [
            CREATE_GRAND_PARENT,
            CREATE_PARENT,
            CREATE_CHILD,
            "insert into GrandParent (GrandParentId) values (1)",
        ]
    );
}

#[test]
fn after_batch_statements_follow_the_last_batch() {
    let script = SchemaExporter::new(Dialect::google_sql())
        .with_max_statements_per_batch(NonZeroUsize::new(1).unwrap())
        .with_after_batch([
            "insert into GrandParent (GrandParentId) values (1)",
            "insert into GrandParent (GrandParentId) values (2)",
        ])
        .generate_create_script(&graph())
        .unwrap();

    assert_eq!(script.len(), 3 * 3 + 2);
    assert_eq!(script[8], RUN_BATCH);
    assert_eq!(
        &script[9..],
        [
            "insert into GrandParent (GrandParentId) values (1)",
            "insert into GrandParent (GrandParentId) values (2)",
        ]
    );
}

#[test]
fn update_with_nothing_missing_is_empty() {
    let existing = ExistingSchema::new()
        .with_table(
            "GrandParent",
            ExistingTable::new()
                .column("GrandParentId")
                .column("Name")
                .primary_key(["GrandParentId"]),
        )
        .with_table(
            "Parent",
            ExistingTable::new().column("GrandParentId").column("ParentId"),
        )
        .with_table(
            "Child",
            ExistingTable::new()
                .column("GrandParentId")
                .column("ParentId")
                .column("ChildId"),
        );

    let script = SchemaExporter::new(Dialect::google_sql())
        .with_after_batch(["insert into GrandParent (GrandParentId) values (1)"])
        .generate_update_script(&graph(), &existing)
        .unwrap();
    assert!(script.is_empty());
}

#[test]
fn update_creates_only_what_is_missing() {
    let existing = ExistingSchema::new().with_table(
        "GrandParent",
        ExistingTable::new()
            .column("GrandParentId")
            .primary_key(["GrandParentId"]),
    );

    let script = SchemaExporter::new(Dialect::google_sql())
        .generate_update_script(&indexed_graph(), &existing)
        .unwrap();
    assert_eq!(
        script,
        framed(&[
            "alter table GrandParent ADD COLUMN Name STRING(MAX)",
            CREATE_PARENT,
            CREATE_CHILD,
            "create index GrandParentByName on GrandParent (Name)",
            "create unique index GrandParentByNameUnique on GrandParent (Name, GrandParentId)",
        ])
    );
}

#[test]
fn update_refuses_primary_key_changes() {
    let existing = ExistingSchema::new().with_table(
        "GrandParent",
        ExistingTable::new()
            .column("GrandParentId")
            .column("Name")
            .primary_key(["Name"]),
    );

    let err = SchemaExporter::new(Dialect::google_sql())
        .generate_update_script(&graph(), &existing)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedDdlOperation { .. }));
}

#[test]
fn drop_for_skips_absent_objects() {
    let existing = ExistingSchema::new().with_table(
        "GrandParent",
        ExistingTable::new()
            .column("GrandParentId")
            .index("GrandParentByName"),
    );

    let script = SchemaExporter::new(Dialect::google_sql())
        .generate_drop_script_for(&indexed_graph(), &existing)
        .unwrap();
    assert_eq!(
        script,
        framed(&["drop index GrandParentByName", "drop table GrandParent"])
    );
}

#[test]
fn recreate_drops_existing_then_creates_everything() {
    let existing = ExistingSchema::new().with_table("GrandParent", ExistingTable::new());

    let script = SchemaExporter::new(Dialect::google_sql())
        .with_after_batch(["insert into GrandParent (GrandParentId) values (1)"])
        .generate_recreate_script(&graph(), &existing)
        .unwrap();

    let mut expected = framed(&["drop table GrandParent"]);
    expected.extend(framed(&[CREATE_GRAND_PARENT, CREATE_PARENT, CREATE_CHILD]));
    expected.push("insert into GrandParent (GrandParentId) values (1)".to_owned());
    assert_eq!(script, expected);
}

#[test]
fn sequences_are_created_first_and_dropped_last() {
    let descriptor = SequenceConfig::new("ticket_sale_seq")
        .start_with_counter(50_000)
        .exclude_range("[1,1000]")
        .build()
        .unwrap();
    let graph = graph().with_sequences([descriptor]).unwrap();
    let exporter = SchemaExporter::new(Dialect::google_sql());

    let create = exporter.generate_create_script(&graph).unwrap();
    assert_eq!(
        create[1],
        r#"create sequence ticket_sale_seq options(sequence_kind="bit_reversed_positive", start_with_counter=50000, skip_range_min=1, skip_range_max=1000)"#
    );

    let drop = exporter.generate_drop_script(&graph).unwrap();
    assert_eq!(drop[drop.len() - 2], "drop sequence ticket_sale_seq");
}

#[test]
fn update_creates_missing_sequences_only() {
    let graph = graph()
        .with_sequences([
            SequenceConfig::new("billing.invoice_seq").build().unwrap(),
            SequenceConfig::new("ticket_seq").build().unwrap(),
        ])
        .unwrap();
    let existing = ExistingSchema::new()
        .with_sequence("billing.invoice_seq")
        .with_table("GrandParent", ExistingTable::new().column("GrandParentId").column("Name"))
        .with_table("Parent", ExistingTable::new().column("GrandParentId").column("ParentId"))
        .with_table(
            "Child",
            ExistingTable::new()
                .column("GrandParentId")
                .column("ParentId")
                .column("ChildId"),
        );

    let script = SchemaExporter::new(Dialect::google_sql())
        .generate_update_script(&graph, &existing)
        .unwrap();
    assert_eq!(
        script,
        framed(&[r#"create sequence ticket_seq options(sequence_kind="bit_reversed_positive")"#])
    );
}

#[test]
fn sequence_statements() {
    let descriptor = SequenceConfig::new("ticket_sale_seq")
        .start_with_counter(50_000)
        .exclude_range("[1,1000]")
        .build()
        .unwrap();

    let google = StatementRenderer::new(Dialect::google_sql());
    let plain = SequenceConfig::new("billing.invoice_seq").build().unwrap();
    assert_eq!(
        google.create_sequence(&plain),
        r#"create sequence billing.invoice_seq options(sequence_kind="bit_reversed_positive")"#
    );
    assert_eq!(
        google.drop_sequence(&plain),
        "drop sequence billing.invoice_seq"
    );

    let pg = StatementRenderer::new(Dialect::postgresql());
    assert_eq!(
        pg.create_sequence(&descriptor),
        "create sequence ticket_sale_seq bit_reversed_positive skip range 1 1000 \
         start counter with 50000"
    );
}

#[test]
fn postgresql_rendering() {
    let graph = SchemaObjectGraph::new(vec![
        TableNode::new("singers")
            .column(Column::new("singer_id", "bigint").not_null())
            .column(Column::new("user", "varchar"))
            .primary_key(["singer_id"]),
        TableNode::new("albums")
            .column(Column::new("album_id", "bigint").not_null())
            .primary_key(["album_id"])
            .interleave_in("singers", false)
            .index(Index::new("albums_by_singer", ["singer_id"])),
    ])
    .unwrap();

    let script = SchemaExporter::new(Dialect::postgresql())
        .generate_create_script(&graph)
        .unwrap();
    assert_eq!(
        script,
        framed(&[
            "create table singers (singer_id bigint not null,\"user\" varchar,PRIMARY KEY (singer_id))",
            "create table albums (singer_id bigint not null,album_id bigint not null,\
             PRIMARY KEY (singer_id,album_id)) INTERLEAVE IN PARENT singers",
            "create index albums_by_singer on albums (singer_id)",
        ])
    );
}

#[test]
fn reserved_identifiers_are_quoted() {
    let graph = SchemaObjectGraph::new(vec![
        TableNode::new("Order")
            .column(Column::new("Id", "INT64").not_null())
            .primary_key(["Id"]),
    ])
    .unwrap();
    let renderer = StatementRenderer::new(Dialect::google_sql());

    let table = graph.table("Order").unwrap();
    assert_eq!(
        renderer.create_table(&graph, table),
        "create table `Order` (Id INT64 not null) PRIMARY KEY (Id)"
    );
    assert_eq!(
        renderer.add_column(table, &Column::new("Select", "BOOL")),
        "alter table `Order` ADD COLUMN `Select` BOOL"
    );
}

#[test]
fn drop_scripts_never_carry_after_batch_statements() {
    let script = SchemaExporter::new(Dialect::google_sql())
        .with_after_batch(["insert into GrandParent (GrandParentId) values (1)"])
        .generate_drop_script(&graph())
        .unwrap();

    assert_eq!(script.last().map(String::as_str), Some(RUN_BATCH));
}
