use pretty_assertions::assert_eq;
use tether_schema::{
    AttributeDeclaration, BlockDeclaration, BridgeConfig, Capabilities, ProviderDeclaration,
    ResourceDeclaration, ResourceSchema, SchemaBuilder,
};
use tether_setid::{hash_string, serialize_block, serialize_for_hash, serialize_value};
use tether_types::{ForeignValue, PropertyPath};

const TOKEN: &str = "example_acl";

fn make_schema() -> ResourceSchema {
    make_schema_with(&Capabilities::new())
}

fn make_schema_with(caps: &Capabilities) -> ResourceSchema {
    let rule = BlockDeclaration::new([
        ("port", AttributeDeclaration::int().required()),
        ("protocol", AttributeDeclaration::string().optional()),
        ("arn", AttributeDeclaration::string().computed()),
        ("cidrs", AttributeDeclaration::set_of(AttributeDeclaration::string()).optional()),
    ]);
    let action = BlockDeclaration::new([(
        "allow",
        AttributeDeclaration::block_list(BlockDeclaration::default()).optional(),
    )]);
    let resource = ResourceDeclaration::new([
        ("tags", AttributeDeclaration::set_of(AttributeDeclaration::string()).optional()),
        ("rule", AttributeDeclaration::block_set(rule).optional()),
        ("action", AttributeDeclaration::block_list(action).optional()),
        ("weights", AttributeDeclaration::list_of(AttributeDeclaration::float()).optional()),
        ("labels", AttributeDeclaration::map_of(AttributeDeclaration::string()).optional()),
        ("enabled", AttributeDeclaration::bool().optional()),
    ]);
    let mut decl = ProviderDeclaration::default();
    decl.resources.insert(TOKEN.into(), resource);
    let provider = SchemaBuilder::new(&decl, caps, &BridgeConfig::default())
        .build()
        .unwrap();
    provider.resource(TOKEN).unwrap().clone()
}

fn panicking_hash(_: &ForeignValue) -> i64 {
    panic!("hash function exploded")
}

fn node(schema: &ResourceSchema, path: &str) -> tether_schema::SchemaId {
    schema.lookup_foreign(&PropertyPath::parse(path).unwrap()).unwrap()
}

// ── Scalars and collections ──────────────────────────────────────

#[test]
fn scalar_elements() {
    let schema = make_schema();
    let tag = node(&schema, "tags[*]");
    assert_eq!(serialize_for_hash(&schema.arena, tag, &"web".into()), "web;");
    assert_eq!(serialize_for_hash(&schema.arena, tag, &ForeignValue::Null), ";");
}

#[test]
fn bools_and_floats() {
    let schema = make_schema();
    let mut buf = String::new();
    serialize_value(&schema.arena, node(&schema, "enabled"), &true.into(), &mut buf);
    serialize_value(&schema.arena, node(&schema, "weights"), &ForeignValue::List(vec![1.5.into(), 2e6.into()]), &mut buf);
    assert_eq!(buf, "1;(1.5;2e+06;);");
}

#[test]
fn maps_sort_keys_and_skip_nulls() {
    let schema = make_schema();
    let labels = ForeignValue::map([
        ("b", ForeignValue::string("2")),
        ("a", ForeignValue::string("1")),
        ("z", ForeignValue::Null),
    ]);
    let mut buf = String::new();
    serialize_value(&schema.arena, node(&schema, "labels"), &labels, &mut buf);
    assert_eq!(buf, "[a:1;b:2;];");
}

// ── Blocks ───────────────────────────────────────────────────────

#[test]
fn block_skips_computed_only_fields() {
    let schema = make_schema();
    let rule = ForeignValue::map([
        ("port", ForeignValue::Int(80)),
        ("protocol", ForeignValue::string("tcp")),
        ("arn", ForeignValue::string("arn:x")),
        ("cidrs", ForeignValue::Set(vec!["10.0.0.0/8".into()])),
    ]);
    assert_eq!(
        serialize_for_hash(&schema.arena, node(&schema, "rule[*]"), &rule),
        "cidrs:{10.0.0.0/8;};port:80;protocol:tcp;"
    );
}

#[test]
fn missing_block_field_serializes_as_null() {
    let schema = make_schema();
    let rule = ForeignValue::map([("port", ForeignValue::Int(22))]);
    assert_eq!(
        serialize_for_hash(&schema.arena, node(&schema, "rule[*]"), &rule),
        "cidrs:;port:22;protocol:;"
    );
}

#[test]
fn nested_block_members_are_wrapped() {
    let schema = make_schema();
    let action = ForeignValue::List(vec![ForeignValue::map([(
        "allow",
        ForeignValue::List(vec![ForeignValue::map::<&str>([])]),
    )])]);
    let root = ForeignValue::map([("action", action)]);
    let mut buf = String::new();
    serialize_block(&schema.arena, schema.root, &root, &mut buf);
    assert!(buf.starts_with("action:(<allow:(<>;);>;);"), "{buf}");
}

#[test]
fn nested_set_members_are_order_independent() {
    let schema = make_schema();
    let rule_node = node(&schema, "rule[*]");
    let a = ForeignValue::map([
        ("port", ForeignValue::Int(80)),
        ("cidrs", ForeignValue::Set(vec!["a".into(), "b".into(), "c".into()])),
    ]);
    let b = ForeignValue::map([
        ("port", ForeignValue::Int(80)),
        ("cidrs", ForeignValue::Set(vec!["c".into(), "a".into(), "b".into()])),
    ]);
    assert_eq!(
        serialize_for_hash(&schema.arena, rule_node, &a),
        serialize_for_hash(&schema.arena, rule_node, &b)
    );
}

#[test]
fn panicking_nested_set_hash_uses_default_order() {
    let mut caps = Capabilities::new();
    caps.resource(TOKEN).set_hash("rule[*].cidrs", panicking_hash);
    let schema = make_schema_with(&caps);
    let plain = make_schema();
    let rule = ForeignValue::map([
        ("port", ForeignValue::Int(443)),
        ("cidrs", ForeignValue::Set(vec!["b".into(), "a".into()])),
    ]);
    assert_eq!(
        serialize_for_hash(&schema.arena, node(&schema, "rule[*]"), &rule),
        serialize_for_hash(&plain.arena, node(&plain, "rule[*]"), &rule)
    );
}

// ── Hashing ──────────────────────────────────────────────────────

#[test]
fn hash_string_is_crc32_ieee() {
    assert_eq!(hash_string(""), 0);
    assert_eq!(hash_string("hello"), 0x3610_a686);
    assert!(hash_string("anything at all") >= 0);
}
