use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_migrations_create_schema() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    // All tables exist and are queryable after migration
    assert!(db.load_work_items().await.unwrap().is_empty());
    assert!(db.load_quota_state().await.unwrap().is_none());
    assert!(db.load_seen_keys().await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();

    // Opening the same database twice must not re-apply migrations
    {
        let db = Database::new(temp_file.path()).await.unwrap();
        db.insert_work_item_if_absent(1, "index:1").await.unwrap();
        db.close().await;
    }
    {
        let db = Database::new(temp_file.path()).await.unwrap();
        let items = db.load_work_items().await.unwrap();
        assert_eq!(items.len(), 1);
        db.close().await;
    }
}
