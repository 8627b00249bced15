//! Concurrent first use and re-registration against one shared validator.

use std::sync::Barrier;
use std::thread;

use tagval_core::{Record, RuleMap, ValidateError, Validator};

#[derive(Record)]
struct Address {
    #[validate("len=5")]
    pub zip: String,
}

#[derive(Record)]
struct Customer {
    #[validate("gt=0")]
    pub id: u64,
    pub address: Address,
}

#[derive(Record)]
struct Limit {
    #[validate("ls=10")]
    pub value: i32,
}

const THREADS: usize = 8;

/// Set `RUST_LOG=tagval_core=trace` to watch compilation and cache hits.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn rules_of(err: ValidateError) -> Vec<String> {
    err.into_violations()
        .map(|v| v.into_iter().map(|v| v.rule().to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn test_first_use_compiles_each_type_once() {
    init_tracing();
    let v = Validator::new();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for i in 0..THREADS {
            let v = &v;
            let barrier = &barrier;
            s.spawn(move || {
                let customer = Customer {
                    id: i as u64,
                    address: Address { zip: "123".into() },
                };
                barrier.wait();
                let err = v.validate_struct(&customer).unwrap_err();
                let rules = rules_of(err);
                if i == 0 {
                    assert_eq!(rules, vec!["gt=0", "len=5"]);
                } else {
                    assert_eq!(rules, vec!["len=5"]);
                }
            });
        }
    });

    assert_eq!(v.cache().compilations(), 2);
    assert_eq!(v.cache().len(), 2);
}

#[test]
fn test_readers_see_whole_rule_sets_during_reregistration() {
    init_tracing();
    let v = Validator::new();
    let value = Limit { value: 20 };
    let tags_report = vec!["ls=10".to_string()];
    let map_report = vec!["ls=3".to_string(), "eq=1".to_string()];
    let rules = RuleMap::new().tag("value", "ls=3,eq=1");

    thread::scope(|s| {
        s.spawn(|| {
            for round in 0..50 {
                if round % 2 == 0 {
                    v.register_map_rule(&value, &rules).unwrap();
                } else {
                    v.register_struct(&value).unwrap();
                }
            }
        });
        for _ in 0..THREADS - 1 {
            s.spawn(|| {
                for _ in 0..200 {
                    let seen = rules_of(v.validate_struct(&value).unwrap_err());
                    assert!(
                        seen == tags_report || seen == map_report,
                        "partial rule set observed: {seen:?}"
                    );
                }
            });
        }
    });

    assert_eq!(v.cache().len(), 1);
}
