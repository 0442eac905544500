use notes_core::db::open_db_in_memory;
use notes_core::{NoteId, NotesRepository, RepoError, SqliteNotesRepository};

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    let created = repo.create("first", "hello notes").unwrap();
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(created.expires_at, None);
    assert_eq!(created.score, None);

    let loaded = repo.by_id(&created.id.to_string()).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_assigns_distinct_increasing_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    let first = repo.create("one", "a").unwrap();
    let second = repo.create("two", "b").unwrap();
    assert!(second.id > first.id);
}

#[test]
fn ids_are_not_reused_after_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    let doomed = repo.create("doomed", "x").unwrap();
    repo.delete(&doomed.id.to_string()).unwrap();

    let next = repo.create("next", "y").unwrap();
    assert!(next.id > doomed.id);
}

#[test]
fn create_with_duplicate_title_fails_with_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    repo.create("same", "one").unwrap();
    let err = repo.create("same", "two").unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err}");
    assert!(!err.is_not_found());
    assert_eq!(repo.stats().unwrap().count, 1);
}

#[test]
fn by_id_with_malformed_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    repo.create("present", "x").unwrap();

    for id in ["", "not-an-id", "0000000000000001x", "0000000000000000"] {
        let err = repo.by_id(id).unwrap_err();
        assert!(matches!(err, RepoError::NotFound), "id `{id}`: {err}");
    }
}

#[test]
fn by_id_with_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    let missing = NoteId::from_raw(999).unwrap().to_string();
    let err = repo.by_id(&missing).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn by_id_accepts_uppercase_hex() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("upper", "case").unwrap();

    let loaded = repo.by_id(&created.id.to_string().to_uppercase()).unwrap();
    assert_eq!(loaded.id, created.id);
}

#[test]
fn update_title_only_keeps_content() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("draft", "body stays").unwrap();

    let updated = repo
        .update(&created.id.to_string(), Some("final"), None)
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "final");
    assert_eq!(updated.content, "body stays");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    assert_eq!(repo.by_id(&created.id.to_string()).unwrap(), updated);
}

#[test]
fn update_content_only_keeps_title() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("title stays", "old body").unwrap();

    let updated = repo
        .update(&created.id.to_string(), None, Some("new body"))
        .unwrap();
    assert_eq!(updated.title, "title stays");
    assert_eq!(updated.content, "new body");
}

#[test]
fn update_with_no_fields_still_refreshes_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("touch", "me").unwrap();
    let id = created.id.to_string();

    let first = repo.update(&id, None, None).unwrap();
    let second = repo.update(&id, None, None).unwrap();
    assert!(first.updated_at > created.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.title, "touch");
    assert_eq!(second.content, "me");
}

#[test]
fn update_to_existing_title_fails_with_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    repo.create("taken", "a").unwrap();
    let other = repo.create("free", "b").unwrap();

    let err = repo
        .update(&other.id.to_string(), Some("taken"), None)
        .unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err}");
    assert_eq!(repo.by_id(&other.id.to_string()).unwrap().title, "free");
}

#[test]
fn update_missing_or_malformed_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    let missing = NoteId::from_raw(42).unwrap().to_string();
    assert!(repo.update(&missing, Some("x"), None).unwrap_err().is_not_found());
    assert!(repo.update("bogus", Some("x"), None).unwrap_err().is_not_found());
}

#[test]
fn delete_then_get_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("short lived", "x").unwrap();
    let id = created.id.to_string();

    repo.delete(&id).unwrap();
    assert!(repo.by_id(&id).unwrap_err().is_not_found());
    assert!(repo.delete(&id).unwrap_err().is_not_found());
}

#[test]
fn delete_malformed_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();

    assert!(repo.delete("xyz").unwrap_err().is_not_found());
}

#[test]
fn deleted_title_can_be_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNotesRepository::try_new(&conn).unwrap();
    let created = repo.create("recycled", "v1").unwrap();
    repo.delete(&created.id.to_string()).unwrap();

    let again = repo.create("recycled", "v2").unwrap();
    assert_ne!(again.id, created.id);
}
