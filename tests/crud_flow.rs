use rust_database::{Database, DatabaseConfig, DbError, Fields, Result, Value};
use tempfile::NamedTempFile;

// Helper function to create an in-memory database for testing
fn create_test_db() -> Result<Database> {
    let mut db = Database::in_memory("test")?;
    initialize_schema(&mut db)?;
    Ok(db)
}

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(Database, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let config = DatabaseConfig::sqlite(temp_file.path().to_str().unwrap());
    let mut db = Database::connect("temp", &config)?;
    initialize_schema(&mut db)?;
    Ok((db, temp_file))
}

fn initialize_schema(db: &mut Database) -> Result<()> {
    db.execute(
        "CREATE TABLE test_table (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            status INTEGER
        )",
        &[],
    )?;
    Ok(())
}

fn count_rows(db: &mut Database) -> Result<i64> {
    let res = db.execute("SELECT count(*) AS total FROM test_table", &[])?;
    let row = db.fetch_assoc(res)?.expect("count row");
    Ok(row.get_i64("total").unwrap())
}

#[test]
fn test_complete_crud() -> Result<()> {
    let mut db = create_test_db()?;

    // Insert
    let id = db.insert(
        "test_table",
        &Fields::new().with_value("name", "TestUser").with_value("status", 1),
    )?;
    assert!(id > 0);
    assert_eq!(db.last_insert_id(), id);

    // Read
    let res = db.execute("SELECT * FROM test_table WHERE id = ?", &[Value::from(id)])?;
    let row = db.fetch_assoc(res)?.unwrap();
    assert_eq!(row.get_str("name"), Some("TestUser"));
    assert_eq!(row.get_i64("status"), Some(1));
    assert!(db.fetch_assoc(res)?.is_none());

    // Update by field map
    let changed = db.update(
        "test_table",
        &Fields::new().with_value("id", id),
        &Fields::new().with_value("name", "UpdatedUser"),
    )?;
    assert_eq!(changed, 1);

    let second = db.insert(
        "test_table",
        &Fields::new().with_value("name", "Test2User").with_value("status", 1),
    )?;
    assert_eq!(second, id + 1);

    let res = db.execute("SELECT name FROM test_table WHERE id = ?", &[Value::from(id)])?;
    assert_eq!(
        db.fetch_assoc(res)?.unwrap().get_str("name"),
        Some("UpdatedUser")
    );

    let res = db.execute("SELECT * FROM test_table", &[])?;
    assert_eq!(db.num_rows(res)?, 2);

    // Update by literal WHERE clause
    let third = db.insert(
        "test_table",
        &Fields::new().with_value("name", "TestUser").with_value("status", 1),
    )?;
    assert_eq!(third, 3);
    let changed = db.update_where(
        "test_table",
        &Fields::new().with_value("name", "UpdatedUser2"),
        "id = ?",
        &[Value::from(third)],
    )?;
    assert_eq!(changed, 1);

    // Delete
    let removed = db.delete("test_table", "id = ?", &[Value::from(third)])?;
    assert_eq!(removed, 1);
    assert_eq!(count_rows(&mut db)?, 2);

    // Table lookups
    assert!(db.table_exists("test_table")?);
    assert!(!db.table_exists("fake_table")?);
    assert!(db.table_exists_like("test")?);
    assert!(!db.table_exists("test")?);

    // Commit makes the insert visible
    db.begin()?;
    db.insert(
        "test_table",
        &Fields::new().with_value("name", "CommitTestUser").with_value("status", 1),
    )?;
    db.commit()?;
    assert_eq!(count_rows(&mut db)?, 3);

    // Rollback discards it
    db.begin()?;
    db.insert(
        "test_table",
        &Fields::new().with_value("name", "RollbackTestUser").with_value("status", 1),
    )?;
    db.rollback()?;
    assert_eq!(count_rows(&mut db)?, 3);

    // Paging
    assert_eq!(db.item_at_page("test_table", "id", 1, 10, "", &[], "")?, 0);
    assert_eq!(
        db.item_at_page("test_table", "id", 1, 2, "", &[], "ORDER BY id DESC")?,
        1
    );

    db.close();
    Ok(())
}

#[test]
fn test_update_where_counts_exact_matches() -> Result<()> {
    let mut db = create_test_db()?;
    for name in ["a", "b", "c"] {
        db.insert(
            "test_table",
            &Fields::new().with_value("name", name).with_value("status", 0),
        )?;
    }

    let changed = db.update_where(
        "test_table",
        &Fields::new().with_value("status", 9),
        "name IN (?, ?)",
        &[Value::from("a"), Value::from("c")],
    )?;
    assert_eq!(changed, 2);

    let changed = db.update_where(
        "test_table",
        &Fields::new().with_value("status", 9),
        "name = ?",
        &[Value::from("zzz")],
    )?;
    assert_eq!(changed, 0);
    Ok(())
}

#[test]
fn test_update_without_filter_touches_every_row() -> Result<()> {
    let mut db = create_test_db()?;
    for name in ["a", "b"] {
        db.insert("test_table", &Fields::new().with_value("name", name))?;
    }
    let changed = db.update(
        "test_table",
        &Fields::new(),
        &Fields::new().with_value("status", Value::Null),
    )?;
    assert_eq!(changed, 2);
    Ok(())
}

#[test]
fn test_item_at_page_with_search() -> Result<()> {
    let mut db = create_test_db()?;
    for i in 0..7 {
        db.insert(
            "test_table",
            &Fields::new()
                .with_value("name", format!("user{}", i))
                .with_value("status", i % 2),
        )?;
    }
    // status = 1 rows: ids 2, 4, 6
    let page = db.item_at_page(
        "test_table",
        "id",
        6,
        2,
        "status = ?",
        &[Value::from(1)],
        "ORDER BY id",
    )?;
    assert_eq!(page, 1);

    let page = db.item_at_page("test_table", "id", 3, 2, "status = ?", &[Value::from(1)], "")?;
    assert_eq!(page, 0);
    Ok(())
}

#[test]
fn test_driver_error_keeps_sql() {
    let mut db = create_test_db().unwrap();
    let err = db
        .execute("SELECT * FROM non_exists_table", &[])
        .unwrap_err();
    match err {
        DbError::Driver { sql, .. } => assert_eq!(sql, "SELECT * FROM non_exists_table"),
        other => panic!("unexpected error: {other}"),
    }

    let err = db
        .insert("non_exists_table", &Fields::new().with_value("name", "x"))
        .unwrap_err();
    assert!(err.sql().unwrap().starts_with("INSERT INTO \"non_exists_table\""));
}

#[test]
fn test_file_backed_transactions_persist() -> Result<()> {
    let (mut db, temp_file) = create_temp_db()?;

    db.begin()?;
    db.begin()?;
    db.insert("test_table", &Fields::new().with_value("name", "kept"))?;
    db.commit()?;
    db.commit()?;

    db.begin()?;
    db.insert("test_table", &Fields::new().with_value("name", "dropped"))?;
    db.rollback()?;
    db.close();

    let config = DatabaseConfig::sqlite(temp_file.path().to_str().unwrap());
    let mut reopened = Database::connect("reopened", &config)?;
    let res = reopened.execute("SELECT name FROM test_table ORDER BY id", &[])?;
    let names: Vec<_> = reopened
        .fetch_all(res)?
        .into_iter()
        .map(|row| row.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["kept"]);
    Ok(())
}

#[test]
fn test_failed_commit_can_still_be_rolled_back() -> Result<()> {
    let mut db = Database::in_memory("deferred")?;
    db.execute("PRAGMA foreign_keys = ON", &[])?;
    db.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)", &[])?;
    db.execute(
        "CREATE TABLE child (
            id INTEGER PRIMARY KEY,
            pid INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
        )",
        &[],
    )?;

    db.begin()?;
    db.insert("child", &Fields::new().with_value("pid", 99))?;
    let err = db.commit().unwrap_err();
    assert_eq!(err.sql(), Some("COMMIT"));
    assert_eq!(db.depth(), 1);

    db.rollback()?;
    assert_eq!(db.depth(), 0);
    let res = db.execute("SELECT count(*) AS total FROM child", &[])?;
    assert_eq!(db.fetch_assoc(res)?.unwrap().get_i64("total"), Some(0));

    db.begin()?;
    db.insert("parent", &Fields::new().with_value("id", 99))?;
    db.insert("child", &Fields::new().with_value("pid", 99))?;
    db.commit()?;
    db.close();
    Ok(())
}

#[test]
fn test_clone_table_from_create_statement() -> Result<()> {
    let mut db = create_test_db()?;
    let create = db
        .create_table_sql("test_table")?
        .expect("create statement");
    let cloned = create.replacen("test_table", "test_table_2025", 1);
    db.execute(&cloned, &[])?;

    let id = db.insert(
        "test_table_2025",
        &Fields::new().with_value("name", "TestUser").with_value("status", 1),
    )?;
    assert!(id > 0);
    let names: Vec<_> = db
        .table_fields("test_table_2025")?
        .into_iter()
        .map(|field| field.name)
        .collect();
    assert_eq!(names, vec!["id", "name", "status"]);

    db.execute("DROP TABLE \"test_table_2025\"", &[])?;
    assert!(!db.table_exists("test_table_2025")?);
    Ok(())
}

#[test]
fn test_item_at_page_join() -> Result<()> {
    let mut db = create_test_db()?;
    db.execute(
        "CREATE TABLE test_detail (id INTEGER PRIMARY KEY, note TEXT)",
        &[],
    )?;
    for i in 1..=5 {
        db.insert("test_table", &Fields::new().with_value("name", format!("user{}", i)))?;
    }
    for id in [2, 4, 5] {
        db.insert(
            "test_detail",
            &Fields::new().with_value("id", id).with_value("note", "flagged"),
        )?;
    }

    // Flagged rows in id order: 2, 4, 5
    let page = db.item_at_page_join(
        "test_table",
        "test_detail",
        "id",
        5,
        2,
        "\"test_detail\".\"note\" = ?",
        &[Value::from("flagged")],
        "ORDER BY \"test_table\".\"id\"",
    )?;
    assert_eq!(page, 1);

    // Left join keeps unmatched rows
    let page = db.item_at_page_join("test_table", "test_detail", "id", 3, 2, "", &[], "ORDER BY 1")?;
    assert_eq!(page, 1);

    let page = db.item_at_page_join("test_table", "test_detail", "id", 42, 2, "", &[], "")?;
    assert_eq!(page, 0);
    Ok(())
}
