//! Unit tests for SQLite materialisation of register diagrams.


use super::{
    DdlError, MaterialiseOptions, SchemaError, SeedError, SqliteSchema, SqliteType,
    check_referential_integrity, materialise_schema, schema_title, seed_reference_data,
};
use nar_core::{Diagram, national_address_register, parse_diagram};
use rstest::{fixture, rstest};
use rusqlite::Connection;

#[fixture]
fn connection() -> Connection {
    Connection::open_in_memory().expect("open in-memory database")
}

#[fixture]
fn register() -> Diagram {
    national_address_register().expect("bundled diagram parses")
}

#[fixture]
fn register_schema(register: Diagram) -> SqliteSchema {
    SqliteSchema::from_diagram(&register).expect("bundled diagram plans")
}

fn table_names(connection: &Connection) -> Vec<String> {
    let mut statement = connection
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name != 'nar_schema_metadata'
             ORDER BY name",
        )
        .expect("prepare table listing");
    statement
        .query_map([], |row| row.get(0))
        .expect("list tables")
        .collect::<Result<_, _>>()
        .expect("collect table names")
}

#[rstest]
#[case("int", SqliteType::Integer)]
#[case("BIGINT", SqliteType::Integer)]
#[case("boolean", SqliteType::Integer)]
#[case("decimal(9,6)", SqliteType::Real)]
#[case("double", SqliteType::Real)]
#[case("bytes", SqliteType::Blob)]
#[case("string", SqliteType::Text)]
#[case("varchar(36)", SqliteType::Text)]
#[case("date", SqliteType::Text)]
fn maps_diagram_types_to_affinities(#[case] data_type: &str, #[case] expected: SqliteType) {
    assert_eq!(SqliteType::from_data_type(data_type), expected);
}

#[rstest]
fn orders_register_tables_parents_first(register_schema: SqliteSchema) {
    let names: Vec<&str> = register_schema
        .tables()
        .iter()
        .map(|table| table.name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "Province",
            "BuildingUsage",
            "CensusSubdivision",
            "PostalCode",
            "Location",
            "Address"
        ]
    );
    assert_eq!(register_schema.title(), Some("National Address Register"));
}

#[rstest]
fn plans_register_keys_and_references(register_schema: SqliteSchema) {
    let location = register_schema.table("Location").expect("Location planned");
    let csd = location.column("CSD_ID").expect("CSD_ID planned");
    assert_eq!(csd.sqlite_type, SqliteType::Integer);
    assert!(!csd.nullable);
    let reference = csd.references.as_ref().expect("CSD_ID references");
    assert_eq!(reference.table, "CensusSubdivision");
    assert_eq!(reference.column, "CSD_ID");

    let easting = location.column("BG_X").expect("BG_X planned");
    assert!(easting.nullable);
    assert!(easting.references.is_none());

    let subdivision = register_schema
        .table("CensusSubdivision")
        .expect("CensusSubdivision planned");
    assert!(
        subdivision
            .create_statement()
            .contains("\"CSD_ID\" INTEGER PRIMARY KEY NOT NULL")
    );
}

#[rstest]
fn renders_create_statement_for_postal_codes(register_schema: SqliteSchema) {
    let postal = register_schema.table("PostalCode").expect("PostalCode planned");
    assert_eq!(
        postal.create_statement(),
        "CREATE TABLE IF NOT EXISTS \"PostalCode\" (\n    \"PostalCode\" TEXT PRIMARY KEY NOT NULL,\n    \"ProvinceCode\" TEXT NOT NULL REFERENCES \"Province\" (\"ProvinceCode\")\n)"
    );
}

#[rstest]
fn optional_parent_leaves_foreign_key_nullable() {
    let diagram = parse_diagram(
        "erDiagram\n  PostalCode {\n    string PostalCode PK\n  }\n  Address {\n    string ADDR_GUID PK\n    string PostalCode FK\n  }\n  PostalCode |o--o{ Address : \"used by\"\n",
    )
    .expect("diagram parses");
    let schema = SqliteSchema::from_diagram(&diagram).expect("diagram plans");
    let address = schema.table("Address").expect("Address planned");
    let postal = address.column("PostalCode").expect("PostalCode planned");
    assert!(postal.nullable);
    assert!(postal.references.is_some());
}

#[rstest]
fn optional_comment_relaxes_mandatory_parent() {
    let diagram = parse_diagram(
        "erDiagram\n  BuildingUsage {\n    string BU_USE PK\n  }\n  Location {\n    string LOC_GUID PK\n    string BU_USE FK \"optional\"\n  }\n  BuildingUsage ||--o{ Location : \"usage\"\n",
    )
    .expect("diagram parses");
    let schema = SqliteSchema::from_diagram(&diagram).expect("diagram plans");
    let usage = schema
        .table("Location")
        .and_then(|table| table.column("BU_USE"))
        .expect("BU_USE planned");
    assert!(usage.nullable);
    assert!(usage.references.is_some());
}

#[rstest]
#[case("Location", "BU_USE", true)]
#[case("Address", "PostalCode", true)]
#[case("Location", "CSD_ID", false)]
#[case("Location", "ProvinceCode", false)]
#[case("Address", "LOC_GUID", false)]
#[case("PostalCode", "ProvinceCode", false)]
#[case("CensusSubdivision", "ProvinceCode", false)]
fn register_foreign_key_nullability(
    register_schema: SqliteSchema,
    #[case] table: &str,
    #[case] column: &str,
    #[case] nullable: bool,
) {
    let plan = register_schema
        .table(table)
        .and_then(|plan| plan.column(column))
        .expect("column planned");
    assert_eq!(plan.nullable, nullable, "{table}.{column}");
}

#[rstest]
#[case("sqlite_lookup")]
#[case("SQLITE_Stat")]
#[case("nar_schema_metadata")]
#[case("NAR_Schema_Metadata")]
fn refuses_reserved_table_names(#[case] name: &str) {
    let diagram = parse_diagram(&format!("erDiagram\n  {name} {{\n    string id PK\n  }}\n"))
        .expect("diagram parses");
    match SqliteSchema::from_diagram(&diagram) {
        Err(DdlError::ReservedName { table }) => assert_eq!(table, name),
        other => panic!("expected reserved name, got {other:?}"),
    }
}

#[rstest]
fn composite_keys_become_table_constraints() {
    let diagram = parse_diagram(
        "erDiagram\n  Alias {\n    string Name PK\n    string Language PK\n    string Note UK\n  }\n",
    )
    .expect("diagram parses");
    let schema = SqliteSchema::from_diagram(&diagram).expect("diagram plans");
    let statement = schema
        .table("Alias")
        .expect("Alias planned")
        .create_statement();
    assert!(statement.contains("\"Name\" TEXT NOT NULL,"));
    assert!(statement.contains("\"Note\" TEXT UNIQUE"));
    assert!(statement.ends_with("PRIMARY KEY (\"Name\", \"Language\")\n)"));
}

#[rstest]
fn drop_statements_run_children_first(register_schema: SqliteSchema) {
    let drops = register_schema.drop_statements();
    assert_eq!(
        drops.first().map(String::as_str),
        Some("DROP TABLE IF EXISTS \"Address\"")
    );
    assert_eq!(
        drops.last().map(String::as_str),
        Some("DROP TABLE IF EXISTS \"Province\"")
    );
}

#[rstest]
fn render_sql_lists_every_table(register_schema: SqliteSchema) {
    let sql = register_schema.render_sql();
    assert!(sql.starts_with("-- National Address Register\n\n"));
    assert_eq!(sql.matches("CREATE TABLE").count(), 6);
    assert!(sql.ends_with(");\n"));
}

#[rstest]
fn refuses_diagrams_with_lint_errors() {
    let diagram = parse_diagram(
        "erDiagram\n  Address {\n    string ADDR_GUID PK\n    string LOC_GUID FK\n  }\n",
    )
    .expect("diagram parses");
    match SqliteSchema::from_diagram(&diagram) {
        Err(DdlError::Lint { count, findings }) => {
            assert_eq!(count, 1);
            assert_eq!(findings.len(), 1);
        }
        other => panic!("expected lint failure, got {other:?}"),
    }
}

#[rstest]
fn refuses_reference_cycles() {
    let diagram = parse_diagram(
        "erDiagram\n  A {\n    string a_id PK\n    string b_id FK\n  }\n  B {\n    string b_id PK\n    string a_id FK\n  }\n  A ||--o{ B : \"owns\"\n  B ||--o{ A : \"owns\"\n",
    )
    .expect("diagram parses");
    match SqliteSchema::from_diagram(&diagram) {
        Err(DdlError::ReferenceCycle { entities }) => assert_eq!(entities, ["A", "B"]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[rstest]
fn materialises_register_tables(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), SchemaError> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    assert_eq!(
        table_names(&connection),
        [
            "Address",
            "BuildingUsage",
            "CensusSubdivision",
            "Location",
            "PostalCode",
            "Province"
        ]
    );
    assert_eq!(
        schema_title(&connection)?.as_deref(),
        Some("National Address Register")
    );
    Ok(())
}

#[rstest]
fn materialising_twice_keeps_rows(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    let provinces: i64 =
        connection.query_row("SELECT COUNT(*) FROM Province", [], |row| row.get(0))?;
    assert_eq!(provinces, 13);
    Ok(())
}

#[rstest]
fn replace_drops_existing_rows(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    materialise_schema(
        &mut connection,
        &register_schema,
        MaterialiseOptions { replace: true },
    )?;
    let provinces: i64 =
        connection.query_row("SELECT COUNT(*) FROM Province", [], |row| row.get(0))?;
    assert_eq!(provinces, 0);
    Ok(())
}

#[rstest]
fn replacing_with_untitled_diagram_clears_title(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    let untitled = SqliteSchema::from_diagram(&parse_diagram(
        "erDiagram\n  Province {\n    string ProvinceCode PK\n  }\n",
    )?)?;
    materialise_schema(&mut connection, &untitled, MaterialiseOptions { replace: true })?;
    assert_eq!(schema_title(&connection)?, None);
    Ok(())
}

#[rstest]
fn register_accepts_rows_without_usage_or_postal_code(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    connection.execute(
        "INSERT INTO CensusSubdivision (CSD_ID, CSD_ENG_NAME, ProvinceCode) VALUES (2466023, 'Montréal', '24')",
        [],
    )?;
    connection.execute(
        "INSERT INTO Location (LOC_GUID, CSD_ID, ProvinceCode, BU_USE) VALUES ('loc-2', 2466023, '24', NULL)",
        [],
    )?;
    connection.execute(
        "INSERT INTO Address (ADDR_GUID, LOC_GUID, CIVIC_NO, PostalCode) VALUES ('addr-2', 'loc-2', '1000', NULL)",
        [],
    )?;
    assert!(check_referential_integrity(&connection)?.is_empty());
    Ok(())
}

#[rstest]
fn enforces_foreign_keys_after_materialising(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), SchemaError> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    let result = connection.execute(
        "INSERT INTO PostalCode (PostalCode, ProvinceCode) VALUES ('K1A0B1', '35')",
        [],
    );
    assert!(result.is_err(), "missing province must be rejected");
    Ok(())
}

#[rstest]
fn schema_title_is_absent_on_foreign_databases(connection: Connection) -> Result<(), SchemaError> {
    assert_eq!(schema_title(&connection)?, None);
    Ok(())
}

#[rstest]
fn seeding_requires_materialised_tables(mut connection: Connection) {
    match seed_reference_data(&mut connection) {
        Err(SeedError::MissingTable { table }) => assert_eq!(table, "Province"),
        other => panic!("expected missing table, got {other:?}"),
    }
}

#[rstest]
fn seeded_rows_keep_french_names(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    let name: String = connection.query_row(
        "SELECT Description_Francais FROM Province WHERE ProvinceCode = '11'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(name, "Île-du-Prince-Édouard");
    Ok(())
}

#[rstest]
fn integrity_check_passes_on_consistent_rows(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    connection.execute(
        "INSERT INTO CensusSubdivision (CSD_ID, CSD_ENG_NAME, ProvinceCode) VALUES (3506008, 'Ottawa', '35')",
        [],
    )?;
    connection.execute(
        "INSERT INTO Location (LOC_GUID, CSD_ID, ProvinceCode, BU_USE) VALUES ('loc-1', 3506008, '35', '1')",
        [],
    )?;
    assert!(check_referential_integrity(&connection)?.is_empty());
    Ok(())
}

#[rstest]
fn integrity_check_reports_dangling_rows(
    mut connection: Connection,
    register_schema: SqliteSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    materialise_schema(&mut connection, &register_schema, MaterialiseOptions::default())?;
    seed_reference_data(&mut connection)?;
    connection.pragma_update(None, "foreign_keys", false)?;
    connection.execute(
        "INSERT INTO Location (LOC_GUID, CSD_ID, ProvinceCode, BU_USE) VALUES ('loc-1', 1, '35', '9')",
        [],
    )?;

    let mut violations = check_referential_integrity(&connection)?;
    violations.sort_by(|a, b| a.parent.cmp(&b.parent));
    let parents: Vec<&str> = violations.iter().map(|v| v.parent.as_str()).collect();
    assert_eq!(parents, ["BuildingUsage", "CensusSubdivision"]);
    assert!(violations.iter().all(|v| v.table == "Location"));
    assert_eq!(violations[0].column.as_deref(), Some("BU_USE"));
    Ok(())
}
