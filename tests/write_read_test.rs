mod helpers;

use helpers::{at_distance, count, entry, insert_entry, spike, test_db};
use revdict::dictionary::read::{all_entries, entry_by_id, entry_features, random_entry};
use revdict::dictionary::store::add_entry;
use revdict::dictionary::types::{Feature, Model, NewEntry, Vector};
use revdict::error::Error;

const QWEN: Model = Model::Qwen3Embedding8B4BitDwq;

#[test]
fn written_entry_reads_back_intact() {
    let mut conn = test_db();
    let new_entry = NewEntry {
        entry: revdict::dictionary::types::Entry {
            example: "she yeeted it across the room".into(),
            author: Some("anon".into()),
            ..entry("yeet", "to throw with force\nan exclamation of excitement")
        },
        features: vec![
            Feature::new("to throw with force", true).with_embedding(QWEN, spike(8, 1)),
            Feature::new("an exclamation of excitement", true).with_embedding(QWEN, spike(8, 2)),
        ],
    };

    let result = add_entry(&mut conn, &new_entry).unwrap();
    let stored = entry_by_id(&conn, result.entry_id).unwrap().unwrap();
    assert_eq!(stored.entry, new_entry.entry);

    let features = entry_features(&conn, result.entry_id).unwrap();
    assert_eq!(features, new_entry.features);
}

#[test]
fn vector_encoding_is_lossless() {
    let mut conn = test_db();
    let original = vec![0.1f32, -2.5, 3.141_592_7, 1e-7, f32::MAX];
    let result = add_entry(
        &mut conn,
        &NewEntry {
            entry: entry("pi", "a number"),
            features: vec![Feature::new("a number", false).with_embedding(QWEN, original.clone())],
        },
    )
    .unwrap();

    let features = entry_features(&conn, result.entry_id).unwrap();
    assert_eq!(features[0].embeddings[&QWEN].clone().into_inner(), original);
}

#[test]
fn failed_embedding_rolls_back_whole_entry() {
    let mut conn = test_db();
    insert_entry(&mut conn, "existing", QWEN, &[("kept", at_distance(0.1))]);

    let result = add_entry(
        &mut conn,
        &NewEntry {
            entry: entry("doomed", "first\nsecond"),
            features: vec![
                Feature::new("first", true).with_embedding(QWEN, vec![1.0f32, 0.0]),
                // Rejected by the vector column check, after the first feature was written.
                Feature::new("second", true).with_embedding(QWEN, Vector::default()),
            ],
        },
    );

    assert!(matches!(result, Err(Error::Store { .. })));
    assert_eq!(count(&conn, "entries"), 1, "no entry row from the failed call");
    assert_eq!(count(&conn, "features"), 1, "no feature row from the failed call");
    assert_eq!(count(&conn, "embeddings"), 1, "no embedding row from the failed call");
}

#[test]
fn empty_phrase_rolls_back() {
    let mut conn = test_db();
    let result = add_entry(
        &mut conn,
        &NewEntry {
            entry: entry("w", "d"),
            features: vec![Feature::new("ok", false), Feature::new("   ", false)],
        },
    );

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(count(&conn, "entries"), 0);
    assert_eq!(count(&conn, "features"), 0);
}

#[test]
fn random_entry_on_empty_store_is_none() {
    let conn = test_db();
    assert!(random_entry(&conn).unwrap().is_none());
}

#[test]
fn random_entry_eventually_covers_every_entry() {
    let mut conn = test_db();
    for text in ["a", "b", "c"] {
        insert_entry(&mut conn, text, QWEN, &[("p", at_distance(0.5))]);
    }

    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        seen.insert(random_entry(&conn).unwrap().unwrap().entry.text);
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn all_entries_yields_every_row_in_insertion_order() {
    let mut conn = test_db();
    let texts: Vec<String> = (0..150).map(|i| format!("word-{i:03}")).collect();
    for text in &texts {
        add_entry(
            &mut conn,
            &NewEntry {
                entry: entry(text, "d"),
                features: vec![],
            },
        )
        .unwrap();
    }

    let read: Vec<String> = all_entries(&conn)
        .map(|e| e.unwrap().entry.text)
        .collect();
    assert_eq!(read, texts);
}

#[test]
fn all_entries_can_stop_early() {
    let mut conn = test_db();
    for i in 0..10 {
        insert_entry(&mut conn, &format!("w{i}"), QWEN, &[("p", at_distance(0.1))]);
    }

    let first_three: Vec<_> = all_entries(&conn).take(3).map(|e| e.unwrap().id).collect();
    assert_eq!(first_three.len(), 3);
    assert!(first_three.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn unknown_stored_model_is_a_typed_error() {
    let mut conn = test_db();
    let result = insert_entry(&mut conn, "w", QWEN, &[("p", at_distance(0.1))]);
    conn.execute("UPDATE embeddings SET model_id = 99", []).unwrap();

    let err = entry_features(&conn, result.entry_id).unwrap_err();
    assert!(matches!(err, Error::UnknownModel(ref id) if id == "99"));
}
