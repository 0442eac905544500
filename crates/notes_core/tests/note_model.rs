use notes_core::{Note, NoteId, NoteStats};
use serde_json::json;

#[test]
fn note_serializes_with_camel_case_fields_and_hex_id() {
    let note = Note {
        id: NoteId::from_raw(26).unwrap(),
        title: "t".to_string(),
        content: "c".to_string(),
        created_at: 10,
        updated_at: 20,
        expires_at: None,
        score: None,
    };

    let value = serde_json::to_value(&note).unwrap();
    assert_eq!(
        value,
        json!({
            "id": "000000000000001a",
            "title": "t",
            "content": "c",
            "createdAt": 10,
            "updatedAt": 20
        })
    );
}

#[test]
fn optional_fields_are_emitted_when_present() {
    let note = Note {
        id: NoteId::from_raw(1).unwrap(),
        title: "t".to_string(),
        content: "c".to_string(),
        created_at: 1,
        updated_at: 1,
        expires_at: Some(99),
        score: Some(1.5),
    };

    let value = serde_json::to_value(&note).unwrap();
    assert_eq!(value["expiresAt"], json!(99));
    assert_eq!(value["score"], json!(1.5));

    let decoded: Note = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, note);
}

#[test]
fn malformed_id_is_rejected_on_deserialize() {
    let result = serde_json::from_value::<Note>(json!({
        "id": "12",
        "title": "t",
        "content": "c",
        "createdAt": 1,
        "updatedAt": 1
    }));
    assert!(result.is_err());
}

#[test]
fn stats_serialize_with_camel_case_fields() {
    let stats = NoteStats {
        count: 2,
        avg_content_len: 4.0,
    };
    assert_eq!(
        serde_json::to_value(stats).unwrap(),
        json!({ "count": 2, "avgContentLen": 4.0 })
    );
}

#[test]
fn note_id_from_str_reports_the_bad_input() {
    let err = "nope".parse::<NoteId>().unwrap_err();
    assert!(err.to_string().contains("nope"));
}
