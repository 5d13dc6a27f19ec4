use crate::models::{datetime_to_millis, millis_to_datetime, NewTaskDocument, TaskDocument, TaskUpdate};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "SELECT id, text, is_complete, priority, notes, sort_order, user_id, \
     created_at, start_date, end_date, repeat_type FROM todos";

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<TaskDocument> {
    Ok(TaskDocument {
        id: row.get(0)?,
        text: row.get(1)?,
        is_complete: row.get(2)?,
        priority: row.get(3)?,
        notes: row.get(4)?,
        order: row.get(5)?,
        user_id: row.get(6)?,
        created_at: Some(millis_to_datetime(row.get(7)?)),
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        repeat_type: row.get(10)?,
    })
}

pub struct TaskDocumentRepository;

impl TaskDocumentRepository {
    /// Insert a new document; the store assigns its id and creation time
    pub fn create(conn: &Connection, doc: &NewTaskDocument, created_at: DateTime<Utc>) -> Result<TaskDocument> {
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO todos (id, text, is_complete, priority, notes, sort_order, user_id,
             created_at, start_date, end_date, repeat_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id,
                doc.text,
                doc.is_complete,
                doc.priority,
                doc.notes,
                doc.order,
                doc.user_id,
                datetime_to_millis(&created_at),
                doc.start_date,
                doc.end_date,
                doc.repeat_type,
            ],
        )?;

        Self::get_by_id(conn, &id)
    }

    /// Get a document by ID
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<TaskDocument> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        conn.query_row(&sql, params![id], row_to_document)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    /// All documents owned by a user, newest first
    pub fn list_by_owner(conn: &Connection, user_id: &str) -> Result<Vec<TaskDocument>> {
        let sql = format!("{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let docs = stmt
            .query_map(params![user_id], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    /// Apply a field-level update; only the fields set in `update` are written
    pub fn update(conn: &Connection, id: &str, update: &TaskUpdate) -> Result<()> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(is_complete) = update.is_complete {
            assignments.push("is_complete = ?");
            values.push(Box::new(is_complete));
        }
        if let Some(text) = &update.text {
            assignments.push("text = ?");
            values.push(Box::new(text.clone()));
        }
        if let Some(priority) = update.priority {
            assignments.push("priority = ?");
            values.push(Box::new(priority.as_str()));
        }
        if let Some(notes) = &update.notes {
            assignments.push("notes = ?");
            values.push(Box::new(notes.clone()));
        }
        if let Some(order) = update.order {
            assignments.push("sort_order = ?");
            values.push(Box::new(order));
        }

        if assignments.is_empty() {
            Self::get_by_id(conn, id)?;
            return Ok(());
        }

        let sql = format!("UPDATE todos SET {} WHERE id = ?", assignments.join(", "));
        values.push(Box::new(id.to_string()));
        let rows_affected = conn.execute(&sql, params_from_iter(values.iter()))?;

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("Task not found: {}", id)));
        }

        Ok(())
    }

    /// Delete a document
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        let rows_affected = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("Task not found: {}", id)));
        }

        Ok(())
    }

    /// Owner of a document, if it exists
    pub fn owner_of(conn: &Connection, id: &str) -> Result<Option<String>> {
        let owner = conn
            .query_row("SELECT user_id FROM todos WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskPriority;
    use crate::storage::Database;
    use chrono::Duration;
    use tempfile::tempdir;

    fn setup_test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::new(&db_path);
        let conn = db.open().unwrap();
        (dir, conn)
    }

    fn new_doc(user: &str, text: &str) -> NewTaskDocument {
        NewTaskDocument {
            text: text.to_string(),
            is_complete: false,
            priority: "medium".to_string(),
            notes: None,
            order: Some(0),
            user_id: user.to_string(),
            start_date: Some("2024-06-01T00:00:00.000Z".to_string()),
            end_date: None,
            repeat_type: Some("none".to_string()),
        }
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, conn) = setup_test_db();
        let created = TaskDocumentRepository::create(&conn, &new_doc("u1", "Buy milk"), Utc::now()).unwrap();

        assert!(!created.id.is_empty());
        assert!(created.created_at.is_some());

        let retrieved = TaskDocumentRepository::get_by_id(&conn, &created.id).unwrap();
        assert_eq!(retrieved.text, "Buy milk");
        assert_eq!(retrieved.end_date, None);
    }

    #[test]
    fn test_list_by_owner_is_newest_first_and_scoped() {
        let (_dir, conn) = setup_test_db();
        let now = Utc::now();
        TaskDocumentRepository::create(&conn, &new_doc("u1", "first"), now - Duration::seconds(10)).unwrap();
        TaskDocumentRepository::create(&conn, &new_doc("u1", "second"), now).unwrap();
        TaskDocumentRepository::create(&conn, &new_doc("u2", "other"), now).unwrap();

        let docs = TaskDocumentRepository::list_by_owner(&conn, "u1").unwrap();
        let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn test_field_level_update() {
        let (_dir, conn) = setup_test_db();
        let created = TaskDocumentRepository::create(&conn, &new_doc("u1", "Old"), Utc::now()).unwrap();

        TaskDocumentRepository::update(&conn, &created.id, &TaskUpdate::order(5)).unwrap();
        TaskDocumentRepository::update(
            &conn,
            &created.id,
            &TaskUpdate::content("New".to_string(), TaskPriority::High, "memo".to_string()),
        )
        .unwrap();

        let doc = TaskDocumentRepository::get_by_id(&conn, &created.id).unwrap();
        assert_eq!(doc.order, Some(5));
        assert_eq!(doc.text, "New");
        assert_eq!(doc.priority, "high");
        assert_eq!(doc.notes.as_deref(), Some("memo"));
        assert!(!doc.is_complete);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let (_dir, conn) = setup_test_db();
        assert!(matches!(
            TaskDocumentRepository::update(&conn, "nope", &TaskUpdate::completion(true)),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            TaskDocumentRepository::update(&conn, "nope", &TaskUpdate::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(TaskDocumentRepository::delete(&conn, "nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_and_owner_of() {
        let (_dir, conn) = setup_test_db();
        let created = TaskDocumentRepository::create(&conn, &new_doc("u1", "x"), Utc::now()).unwrap();

        assert_eq!(TaskDocumentRepository::owner_of(&conn, &created.id).unwrap().as_deref(), Some("u1"));
        TaskDocumentRepository::delete(&conn, &created.id).unwrap();
        assert_eq!(TaskDocumentRepository::owner_of(&conn, &created.id).unwrap(), None);
    }
}
