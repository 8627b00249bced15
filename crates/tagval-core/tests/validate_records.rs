//! End-to-end validation through the public API and the derive.

use std::sync::mpsc;

use tagval_core::{CompileError, Kind, Record, ValidateError, Validator};

fn report(err: ValidateError) -> Vec<(String, String)> {
    match err {
        ValidateError::Violations(v) => v
            .into_iter()
            .map(|v| (v.field().to_string(), v.rule().to_string()))
            .collect(),
        other => panic!("expected violations, got {other:?}"),
    }
}

fn pair(field: &str, rule: &str) -> (String, String) {
    (field.to_string(), rule.to_string())
}

#[derive(Record)]
struct Untagged {
    pub name: String,
    count: u64,
    ratio: f32,
    items: Vec<i32>,
    next: Option<Box<Untagged>>,
}

#[derive(Record)]
struct Inner {
    #[validate("len=4")]
    str: String,
}

#[derive(Record)]
struct Outer {
    #[validate("gt=10")]
    pub num: i32,
    pub inner: Inner,
}

#[derive(Record)]
struct Pointers {
    #[validate("required")]
    pub count: Option<i32>,
    #[validate("required")]
    pub label: Option<Box<String>>,
}

#[derive(Record)]
struct Slot {
    pub level: Option<i32>,
}

#[derive(Record)]
struct Rack {
    #[validate("required")]
    pub slot: Slot,
    #[validate("required")]
    pub bays: [Option<i32>; 2],
}

#[derive(Record)]
struct Values {
    #[validate("required")]
    pub count: i32,
    #[validate("required")]
    pub label: String,
    #[validate("required")]
    pub tags: Vec<String>,
    #[validate("required")]
    pub flag: bool,
}

#[derive(Record)]
struct Hidden {
    #[validate("ls=5")]
    secret: u8,
    #[validate("len=2")]
    code: &'static str,
}

#[derive(Record)]
struct WithChannel {
    pub events: mpsc::Sender<String>,
    pub inbox: mpsc::Receiver<String>,
    pub callback: fn(i32) -> i32,
    #[validate(opaque)]
    pub handler: Box<dyn Fn(&str) + Send>,
}

#[derive(Record)]
struct Typo {
    #[validate("gt=1,bogus")]
    pub n: i32,
}

#[derive(Record)]
struct Multi {
    #[validate("gt=1,ls=5,eq=3")]
    pub n: i64,
    #[validate("len=3,min=0,max=9")]
    pub digits: [u8; 3],
}

#[derive(Record)]
struct Point(#[validate("gt=0")] i32, #[validate("ls=0")] i32);

#[derive(Record)]
struct Wrapper<T> {
    #[validate("required")]
    pub value: T,
}

#[derive(Record)]
struct Raw {
    #[validate("len=1")]
    pub r#type: String,
}

#[derive(Record)]
struct Marker;

#[test]
fn test_untagged_records_always_pass() {
    let v = Validator::new();
    let value = Untagged {
        name: String::new(),
        count: 0,
        ratio: f32::NAN,
        items: vec![],
        next: Some(Box::new(Untagged {
            name: "x".into(),
            count: 1,
            ratio: 0.0,
            items: vec![1],
            next: None,
        })),
    };
    assert!(v.validate_struct(&value).is_ok());
    assert!(v.validate_struct(&Marker).is_ok());
}

#[test]
fn test_gt_boundaries_report_exactly_one_violation() {
    let v = Validator::new();
    let inner = || Inner { str: "abcd".into() };
    assert!(v.validate_struct(&Outer { num: 11, inner: inner() }).is_ok());
    for num in [10, 9] {
        let err = v.validate_struct(&Outer { num, inner: inner() }).unwrap_err();
        assert_eq!(report(err), vec![pair("Outer.num", "gt=10")]);
    }
}

#[test]
fn test_nested_record_reports_both_levels_in_order() {
    let v = Validator::new();
    let err = v
        .validate_struct(&Outer {
            num: 9,
            inner: Inner { str: "ab".into() },
        })
        .unwrap_err();
    assert_eq!(
        report(err),
        vec![pair("Outer.num", "gt=10"), pair("Outer.inner.str", "len=4")]
    );
}

#[test]
fn test_report_renders_one_line_per_violation() {
    let v = Validator::new();
    let err = v
        .validate_struct(&Outer {
            num: 9,
            inner: Inner { str: "ab".into() },
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "field 'Outer.num' violates rule 'gt=10'\nfield 'Outer.inner.str' violates rule 'len=4'"
    );
}

#[test]
fn test_required_pointer_passes_when_present_even_if_zero() {
    let v = Validator::new();
    let present = Pointers {
        count: Some(0),
        label: Some(Box::new(String::new())),
    };
    assert!(v.validate_struct(&present).is_ok());

    let absent = Pointers {
        count: None,
        label: None,
    };
    assert_eq!(
        report(v.validate_struct(&absent).unwrap_err()),
        vec![pair("Pointers.count", "required"), pair("Pointers.label", "required")]
    );
}

#[test]
fn test_required_value_fails_on_zero() {
    let v = Validator::new();
    let zero = Values {
        count: 0,
        label: String::new(),
        tags: Vec::new(),
        flag: false,
    };
    assert_eq!(report(v.validate_struct(&zero).unwrap_err()).len(), 4);

    let set = Values {
        count: -1,
        label: "x".into(),
        tags: vec![String::new()],
        flag: true,
    };
    assert!(v.validate_struct(&set).is_ok());
}

#[test]
fn test_required_value_holding_present_pointers_is_set() {
    let v = Validator::new();
    let stocked = Rack {
        slot: Slot { level: Some(0) },
        bays: [Some(0), None],
    };
    assert!(v.validate_struct(&stocked).is_ok());

    let empty = Rack {
        slot: Slot { level: None },
        bays: [None, None],
    };
    assert_eq!(
        report(v.validate_struct(&empty).unwrap_err()),
        vec![pair("Rack.slot", "required"), pair("Rack.bays", "required")]
    );
}

#[test]
fn test_private_fields_are_validated() {
    let v = Validator::new();
    let err = v.validate_struct(&Hidden { secret: 9, code: "abc" }).unwrap_err();
    assert_eq!(
        report(err),
        vec![pair("Hidden.secret", "ls=5"), pair("Hidden.code", "len=2")]
    );
    assert!(v.validate_struct(&Hidden { secret: 1, code: "ok" }).is_ok());
}

#[test]
fn test_channels_and_functions_are_skipped_when_untagged() {
    let v = Validator::new();
    let (events, inbox) = mpsc::channel();
    let value = WithChannel {
        events,
        inbox,
        callback: |x| x + 1,
        handler: Box::new(|_| {}),
    };
    assert!(v.validate_struct(&value).is_ok());
}

#[test]
fn test_unknown_rule_fails_registration_and_validation() {
    let v = Validator::new();
    let value = Typo { n: 5 };
    for result in [v.register_struct(&value), v.validate_struct(&value)] {
        match result {
            Err(ValidateError::Compile(err @ CompileError::UnsupportedRule { .. })) => {
                assert_eq!(err.fragment(), Some("bogus"));
                assert!(err.to_string().contains("bogus"));
            }
            other => panic!("expected unsupported rule, got {other:?}"),
        }
    }
}

#[test]
fn test_every_constraint_on_a_field_is_evaluated() {
    let v = Validator::new();
    let err = v
        .validate_struct(&Multi {
            n: 7,
            digits: [1, 2, 30],
        })
        .unwrap_err();
    assert_eq!(
        report(err),
        vec![
            pair("Multi.n", "ls=5"),
            pair("Multi.n", "eq=3"),
            pair("Multi.digits", "max=9"),
        ]
    );
}

#[test]
fn test_idempotent_reregistration() {
    let v = Validator::new();
    let value = Outer {
        num: 1,
        inner: Inner { str: "x".into() },
    };
    v.register_struct(&value).unwrap();
    let first = report(v.validate_struct(&value).unwrap_err());
    v.register_struct(&value).unwrap();
    let second = report(v.validate_struct(&value).unwrap_err());
    assert_eq!(first, second);
}

#[test]
fn test_colliding_local_type_names_get_distinct_keys() {
    let v = Validator::new();

    let left_inner = {
        #[derive(Record)]
        struct Inner {
            #[validate("len=2")]
            s: String,
        }
        #[derive(Record)]
        struct Left {
            inner: Inner,
        }
        let err = v
            .validate_struct(&Left {
                inner: Inner { s: "abc".into() },
            })
            .unwrap_err();
        assert_eq!(report(err), vec![pair("Left.inner.s", "len=2")]);
        v.cache()
            .get(std::any::type_name::<Left>())
            .and_then(|set| set.nested_key(0).map(str::to_string))
            .unwrap()
    };

    let right_inner = {
        #[derive(Record)]
        struct Inner {
            #[validate("gt=5")]
            n: i32,
        }
        #[derive(Record)]
        struct Right {
            inner: Inner,
        }
        let err = v.validate_struct(&Right { inner: Inner { n: 1 } }).unwrap_err();
        assert_eq!(report(err), vec![pair("Right.inner.n", "gt=5")]);
        v.cache()
            .get(std::any::type_name::<Right>())
            .and_then(|set| set.nested_key(0).map(str::to_string))
            .unwrap()
    };

    assert_ne!(left_inner, right_inner);
    let left = v.cache().get(&left_inner).unwrap();
    let right = v.cache().get(&right_inner).unwrap();
    assert_eq!(left.fields()[0].name(), "s");
    assert_eq!(left.fields()[0].kind(), Kind::String);
    assert_eq!(right.fields()[0].name(), "n");
    assert_eq!(right.fields()[0].kind(), Kind::Int);
}

#[test]
fn test_tuple_struct_fields_are_named_by_position() {
    let v = Validator::new();
    let err = v.validate_struct(&Point(0, 0)).unwrap_err();
    assert_eq!(report(err), vec![pair("Point.0", "gt=0"), pair("Point.1", "ls=0")]);
}

#[test]
fn test_generic_record() {
    let v = Validator::new();
    assert!(v.validate_struct(&Wrapper { value: 3u8 }).is_ok());
    let err = v.validate_struct(&Wrapper { value: String::new() }).unwrap_err();
    assert_eq!(report(err), vec![pair("Wrapper.value", "required")]);
    assert_eq!(v.cache().len(), 2);
}

#[test]
fn test_raw_identifiers_are_unrawed() {
    let v = Validator::new();
    let err = v.validate_struct(&Raw { r#type: "ab".into() }).unwrap_err();
    assert_eq!(report(err), vec![pair("Raw.type", "len=1")]);
}

#[test]
fn test_validating_a_reference_or_pointer_root() {
    let v = Validator::new();
    let boxed: Box<Outer> = Box::new(Outer {
        num: 50,
        inner: Inner { str: "four".into() },
    });
    assert!(v.validate_struct(&boxed).is_ok());
    let shared = std::sync::Arc::new(Outer {
        num: 1,
        inner: Inner { str: "four".into() },
    });
    assert_eq!(
        report(v.validate_struct(&shared).unwrap_err()),
        vec![pair("Outer.num", "gt=10")]
    );
}
