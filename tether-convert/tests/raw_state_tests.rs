use pretty_assertions::assert_eq;
use serde_json::json;
use tether_convert::{ConvertError, decode_raw_state, encode_raw_state};
use tether_schema::{
    AttributeDeclaration, BlockDeclaration, BridgeConfig, Capabilities, ProviderDeclaration,
    ResourceDeclaration, ResourceSchema, SchemaBuilder,
};
use tether_types::{ForeignValue, RawState, UNKNOWN_SENTINEL};

const TOKEN: &str = "example_bucket";

fn make_schema() -> ResourceSchema {
    let rule = BlockDeclaration::new([
        ("days", AttributeDeclaration::int().required()),
        ("enabled", AttributeDeclaration::bool().optional()),
    ]);
    let resource = ResourceDeclaration::new([
        ("name", AttributeDeclaration::string().required()),
        ("size", AttributeDeclaration::int().optional()),
        ("ratio", AttributeDeclaration::float().optional()),
        ("grants", AttributeDeclaration::set_of(AttributeDeclaration::string()).optional()),
        ("lifecycle_rule", AttributeDeclaration::block_list(rule).optional()),
        ("tags", AttributeDeclaration::map_of(AttributeDeclaration::string()).optional()),
        ("arn", AttributeDeclaration::string().computed()),
    ])
    .with_version(1);
    let mut decl = ProviderDeclaration::default();
    decl.resources.insert(TOKEN.to_string(), resource);
    let provider = SchemaBuilder::new(&decl, &Capabilities::new(), &BridgeConfig::default())
        .build()
        .unwrap();
    provider.resource(TOKEN).unwrap().clone()
}

// ── Decoding ─────────────────────────────────────────────────────

#[test]
fn decoding_types_values_by_schema() {
    let schema = make_schema();
    let raw = RawState::new(
        1,
        json!({
            "name": "logs",
            "size": 3,
            "ratio": 2,
            "grants": ["read", "write"],
            "lifecycle_rule": [{"days": 30, "enabled": true}],
            "tags": {"team": "infra"},
            "arn": UNKNOWN_SENTINEL,
        }),
    );
    let decoded = decode_raw_state(&schema, &raw).unwrap();
    assert_eq!(
        decoded,
        ForeignValue::map([
            ("name", ForeignValue::string("logs")),
            ("size", ForeignValue::Int(3)),
            ("ratio", ForeignValue::Float(2.0)),
            (
                "grants",
                ForeignValue::Set(vec![ForeignValue::string("read"), ForeignValue::string("write")]),
            ),
            (
                "lifecycle_rule",
                ForeignValue::List(vec![ForeignValue::map([
                    ("days", ForeignValue::Int(30)),
                    ("enabled", ForeignValue::Bool(true)),
                ])]),
            ),
            ("tags", ForeignValue::map([("team", ForeignValue::string("infra"))])),
            ("arn", ForeignValue::Unknown),
        ])
    );
}

#[test]
fn stale_version_is_rejected() {
    let schema = make_schema();
    let raw = RawState::new(0, json!({"name": "logs"}));
    let err = decode_raw_state(&schema, &raw).unwrap_err();
    assert!(matches!(err, ConvertError::StaleState { found: 0, expected: 1 }));
}

#[test]
fn undeclared_attributes_are_dropped() {
    let schema = make_schema();
    let raw = RawState::new(1, json!({"name": "logs", "acl": "private"}));
    let decoded = decode_raw_state(&schema, &raw).unwrap();
    assert_eq!(decoded, ForeignValue::map([("name", ForeignValue::string("logs"))]));
}

#[test]
fn scalar_strings_are_kept_for_later_coercion() {
    let schema = make_schema();
    let raw = RawState::new(1, json!({"size": "12", "name": 7}));
    let decoded = decode_raw_state(&schema, &raw).unwrap();
    assert_eq!(decoded.get("size"), Some(&ForeignValue::string("12")));
    assert_eq!(decoded.get("name"), Some(&ForeignValue::string("7")));
}

#[test]
fn non_object_state_is_invalid() {
    let schema = make_schema();
    let err = decode_raw_state(&schema, &RawState::new(1, json!(["logs"]))).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidState(_)));
}

#[test]
fn shape_mismatch_reports_path() {
    let schema = make_schema();
    let raw = RawState::new(1, json!({"lifecycle_rule": [{"days": [30]}]}));
    let err = decode_raw_state(&schema, &raw).unwrap_err();
    assert_eq!(
        err.to_string(),
        "type mismatch at lifecycle_rule[0].days: expected int, found array"
    );
}

// ── Encoding ─────────────────────────────────────────────────────

#[test]
fn encoding_tags_current_version() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("logs")),
        ("arn", ForeignValue::Unknown),
    ]);
    let raw = encode_raw_state(&schema, &state);
    assert_eq!(raw.version, 1);
    assert_eq!(raw.state, json!({"name": "logs", "arn": UNKNOWN_SENTINEL}));
}

#[test]
fn encoded_state_decodes_to_the_same_value() {
    let schema = make_schema();
    let state = ForeignValue::map([
        ("name", ForeignValue::string("logs")),
        ("grants", ForeignValue::Set(vec![ForeignValue::string("write")])),
        ("ratio", ForeignValue::Float(0.25)),
    ]);
    let raw = encode_raw_state(&schema, &state);
    let bytes = raw.to_vec().unwrap();
    let reread = RawState::from_slice(&bytes).unwrap();
    assert_eq!(decode_raw_state(&schema, &reread).unwrap(), state);
}
