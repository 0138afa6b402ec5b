//! Result mapping tests: positional construction, name-tagged association,
//! scalar coercion and batch mapping over derived records.
//!
//! Run with: cargo test --test result_mapper_tests

mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{Person, User};
use recordgate::{ErrorKind, Json, RawResult, Record, RecordError, ResultMapper, Value};

#[derive(Debug, Default, PartialEq, Record)]
struct Article {
    #[record(id)]
    id: Option<i32>,
    title: String,
    score: f32,
    tags: Json<Vec<String>>,
    published: Option<NaiveDate>,
}

#[test]
fn test_tuple_maps_through_matching_constructor() {
    let person: Person = ResultMapper::map_tuple(vec![
        Value::Integer(1),
        Value::Text("Alice".into()),
        Value::Boolean(true),
    ])
    .unwrap();

    assert_eq!(
        person,
        Person {
            id: 1,
            name: "Alice".into(),
            active: true
        }
    );
}

#[test]
fn test_tuple_picks_first_constructor_with_arity() {
    let user: User = ResultMapper::map_tuple(vec![
        Value::Integer(7),
        Value::Text("bob".into()),
        Value::Boolean(false),
    ])
    .unwrap();

    assert_eq!(user.id, Some(7));
    assert_eq!(user.user_name, "bob");
    assert!(user.password.is_none());
    assert!(user.created_at.is_none());
}

#[test]
fn test_tuple_without_matching_arity() {
    let err = ResultMapper::map_tuple::<Person>(vec![Value::Integer(1)]).unwrap_err();
    assert!(matches!(
        err,
        RecordError::NoMatchingConstructor { ref type_name, arity: 1 } if type_name == "Person"
    ));
    assert_eq!(err.kind(), ErrorKind::Mapping);
}

#[test]
fn test_tuple_coerces_numbers_and_reports_bad_casts() {
    let person: Person = ResultMapper::map_tuple(vec![
        Value::Float(2.9),
        Value::Integer(42),
        Value::Boolean(true),
    ])
    .unwrap();
    assert_eq!(person.id, 2);
    assert_eq!(person.name, "42");

    let err = ResultMapper::map_tuple::<Person>(vec![
        Value::Integer(1),
        Value::Text("Alice".into()),
        Value::Text("abc".into()),
    ])
    .unwrap_err();
    assert_eq!(err.to_string(), "Cannot cast abc (TEXT) to bool");
}

#[test]
fn test_association_matches_separated_upper_names() {
    let user: User = ResultMapper::map_association(vec![
        ("USER_NAME".into(), Value::Text("bob".into())),
        ("IS_ACTIVE".into(), Value::Boolean(true)),
        ("ID".into(), Value::Integer(3)),
        ("nickname".into(), Value::Text("ignored".into())),
    ])
    .unwrap();

    assert_eq!(user.id, Some(3));
    assert_eq!(user.user_name, "bob");
    assert!(user.is_active);
}

#[test]
fn test_association_converts_temporal_values() {
    let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap();

    let user: User = ResultMapper::map_association(vec![
        ("createdAt".into(), Value::Timestamp(instant)),
        ("updated_at".into(), Value::Timestamp(instant)),
    ])
    .unwrap();
    assert_eq!(user.created_at, Some(instant));
    assert_eq!(user.updated_at, Some(instant.naive_utc()));

    let article: Article = ResultMapper::map_association(vec![(
        "published".into(),
        Value::Timestamp(instant),
    )])
    .unwrap();
    assert_eq!(article.published, NaiveDate::from_ymd_opt(2024, 2, 29));
}

#[test]
fn test_json_and_narrow_numeric_members() {
    let article: Article = ResultMapper::map_association(vec![
        ("id".into(), Value::Text("12".into())),
        ("title".into(), Value::Text("Hello".into())),
        ("score".into(), Value::Integer(4)),
        ("tags".into(), Value::Text(r#"["rust","orm"]"#.into())),
    ])
    .unwrap();

    assert_eq!(article.id, Some(12));
    assert_eq!(article.score, 4.0);
    assert_eq!(*article.tags, vec!["rust".to_string(), "orm".to_string()]);
    assert_eq!(article.get("tags").unwrap(), Value::Text(r#"["rust","orm"]"#.into()));

    let err = ResultMapper::map_association::<Article>(vec![(
        "id".into(),
        Value::Integer(i64::from(i32::MAX) + 1),
    )])
    .unwrap_err();
    assert!(matches!(err, RecordError::NumberCast { .. }));
}

#[test]
fn test_scalar_mapping() {
    assert_eq!(ResultMapper::map_scalar::<i64>(Value::Text("12".into())).unwrap(), 12);
    assert_eq!(ResultMapper::map_scalar::<i32>(Value::Float(3.7)).unwrap(), 3);
    assert_eq!(
        ResultMapper::map_scalar::<String>(Value::Integer(5)).unwrap(),
        "5"
    );
    assert_eq!(ResultMapper::map_scalar::<Option<bool>>(Value::Null).unwrap(), None);
    assert!(ResultMapper::map_scalar::<bool>(Value::Integer(1)).is_err());
}

#[test]
fn test_sequence_preserves_order_and_shape() {
    let batch = vec![
        RawResult::Tuple(vec![
            Value::Integer(1),
            Value::Text("a".into()),
            Value::Boolean(true),
        ]),
        RawResult::Columns(vec![
            ("id".into(), Value::Integer(2)),
            ("name".into(), Value::Text("b".into())),
        ]),
    ];

    let people: Vec<Person> = ResultMapper::map_sequence(batch).unwrap();
    assert_eq!(people.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(people[1].name, "b");
    assert!(!people[1].active);

    let single: Vec<Person> = ResultMapper::map_sequence(RawResult::Columns(vec![(
        "name".into(),
        Value::Text("solo".into()),
    )]))
    .unwrap();
    assert_eq!(single.len(), 1);
}

#[test]
fn test_sequence_fails_fast_each_keeps_going() {
    let batch = vec![
        RawResult::Tuple(vec![Value::Integer(1)]),
        RawResult::Columns(vec![("id".into(), Value::Integer(2))]),
    ];

    assert!(ResultMapper::map_sequence::<Person>(batch.clone()).is_err());

    let each = ResultMapper::map_each::<Person>(batch);
    assert_eq!(each.len(), 2);
    assert!(each[0].is_err());
    assert_eq!(each[1].as_ref().unwrap().id, 2);
}

#[test]
fn test_scalars_batch() {
    let values: Vec<i64> = ResultMapper::map_scalars(vec![
        RawResult::Scalar(Value::Integer(1)),
        RawResult::Tuple(vec![Value::Text("2".into())]),
        RawResult::Columns(vec![("n".into(), Value::Float(3.0))]),
    ])
    .unwrap();
    assert_eq!(values, vec![1, 2, 3]);

    let err = ResultMapper::map_scalars::<i64>(RawResult::Tuple(vec![
        Value::Integer(1),
        Value::Integer(2),
    ]))
    .unwrap_err();
    assert!(matches!(err, RecordError::NoMatchingConstructor { arity: 2, .. }));
}
