use opgraph::{FsState, OptionEntry, Value};

#[test]
fn projectors_return_the_underlying_value() {
    assert_eq!(Value::Str("x".to_string()).expect_str().unwrap(), "x");
    assert_eq!(Value::Int(42).expect_int().unwrap(), 42);
    assert!(Value::Bool(true).expect_bool().unwrap());
    assert!(Value::Filesystem(FsState::scratch()).expect_fs().is_ok());
    assert!(Value::Options(vec![]).expect_options().unwrap().is_empty());
}

#[test]
fn mismatches_carry_both_kinds() {
    let err = Value::Str("x".to_string()).expect_int().unwrap_err();
    assert_eq!(err.expected, "int");
    assert_eq!(err.found, "string");
    assert_eq!(err.to_string(), "expected int, found string");
}

#[test]
fn kind_names() {
    assert_eq!(Value::Filesystem(FsState::scratch()).kind(), "fs");
    assert_eq!(Value::Options(vec![]).kind(), "option");
}

#[test]
fn option_entry_arg_accessors() {
    let entry = OptionEntry {
        ns: "run".to_string(),
        name: "env".to_string(),
        args: vec![Value::Str("K".to_string()), Value::Int(1)],
        tag: None,
    };
    assert_eq!(entry.str_arg(0), Some("K"));
    assert_eq!(entry.str_arg(1), None);
    assert_eq!(entry.int_arg(1), Some(1));
    assert!(entry.fs_arg(0).is_none());
}
