use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tether_schema::{
    AttributeDeclaration, BridgeConfig, Capabilities, ProviderDeclaration, ResourceDeclaration,
    ResourceSchema, SchemaBuilder, SchemaId,
};
use tether_setid::{ElementIdentity, SetIdentityResolver, SetMatching, hash_string};
use tether_types::ForeignValue;

const TOKEN: &str = "example_group";

fn make_schema(caps: &Capabilities) -> ResourceSchema {
    let resource = ResourceDeclaration::new([
        ("members", AttributeDeclaration::set_of(AttributeDeclaration::string()).optional()),
    ]);
    let mut decl = ProviderDeclaration::default();
    decl.resources.insert(TOKEN.into(), resource);
    let provider = SchemaBuilder::new(&decl, caps, &BridgeConfig::default())
        .build()
        .unwrap();
    provider.resource(TOKEN).unwrap().clone()
}

fn members_node(schema: &ResourceSchema) -> SchemaId {
    schema.field("members").unwrap().node
}

fn strings(values: &[&str]) -> Vec<ForeignValue> {
    values.iter().map(|v| ForeignValue::string(*v)).collect()
}

fn length_hash(value: &ForeignValue) -> i64 {
    value.as_str().map_or(0, |s| s.len() as i64)
}

fn constant_hash(_: &ForeignValue) -> i64 {
    42
}

fn panicking_hash(_: &ForeignValue) -> i64 {
    panic!("hash function exploded")
}

// ── Identity ─────────────────────────────────────────────────────

#[test]
fn default_identity_hashes_serialization() {
    let schema = make_schema(&Capabilities::new());
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    assert_eq!(resolver.identity(&"alice".into()), hash_string("alice;"));
}

#[test]
fn explicit_hash_is_used_verbatim() {
    let mut caps = Capabilities::new();
    caps.resource(TOKEN).set_hash("members", length_hash);
    let schema = make_schema(&caps);
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    assert_eq!(resolver.identity(&"alice".into()), 5);
}

#[test]
fn panicking_hash_falls_back_to_default() {
    let mut caps = Capabilities::new();
    caps.resource(TOKEN).set_hash("members", panicking_hash);
    let schema = make_schema(&caps);
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    assert_eq!(resolver.identity(&"bob".into()), hash_string("bob;"));
}

// ── Collisions ───────────────────────────────────────────────────

#[test]
fn collisions_tie_break_by_position() {
    let mut caps = Capabilities::new();
    caps.resource(TOKEN).set_hash("members", constant_hash);
    let schema = make_schema(&caps);
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    let ids = resolver.identities(&strings(&["x", "y", "z"]));
    assert_eq!(
        ids,
        vec![
            ElementIdentity { hash: 42, ordinal: 0 },
            ElementIdentity { hash: 42, ordinal: 1 },
            ElementIdentity { hash: 42, ordinal: 2 },
        ]
    );
    assert_eq!(resolver.canonical_order(&strings(&["x", "y", "z"])), vec![0, 1, 2]);
}

#[test]
fn collision_hides_change_in_bucket() {
    let mut caps = Capabilities::new();
    caps.resource(TOKEN).set_hash("members", constant_hash);
    let schema = make_schema(&caps);
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    let matching = resolver.match_sets(&strings(&["x"]), &strings(&["y"]));
    assert_eq!(matching.matched, vec![(0, 0)]);
    assert!(matching.removed.is_empty() && matching.added.is_empty());
}

// ── Matching ─────────────────────────────────────────────────────

#[test]
fn match_sets_pairs_by_identity() {
    let schema = make_schema(&Capabilities::new());
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    let matching = resolver.match_sets(&strings(&["a", "b"]), &strings(&["b", "c"]));
    assert_eq!(
        matching,
        SetMatching {
            matched: vec![(1, 0)],
            removed: vec![0],
            added: vec![1],
        }
    );
}

#[test]
fn duplicates_match_one_to_one() {
    let schema = make_schema(&Capabilities::new());
    let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
    let matching = resolver.match_sets(&strings(&["a", "a"]), &strings(&["a"]));
    assert_eq!(matching.matched.len(), 1);
    assert_eq!(matching.removed.len(), 1);
    assert!(matching.added.is_empty());
}

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn shuffled_members() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::btree_set("[a-z]{1,6}", 0..10)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
}

proptest! {
    #[test]
    fn canonical_order_ignores_input_order((original, shuffled) in shuffled_members()) {
        let schema = make_schema(&Capabilities::new());
        let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
        let a: Vec<ForeignValue> = original.iter().map(|s| ForeignValue::string(s.as_str())).collect();
        let b: Vec<ForeignValue> = shuffled.iter().map(|s| ForeignValue::string(s.as_str())).collect();
        let ordered_a: Vec<&ForeignValue> = resolver.canonical_order(&a).into_iter().map(|i| &a[i]).collect();
        let ordered_b: Vec<&ForeignValue> = resolver.canonical_order(&b).into_iter().map(|i| &b[i]).collect();
        prop_assert_eq!(ordered_a, ordered_b);
    }

    #[test]
    fn permuted_set_matches_itself((original, shuffled) in shuffled_members()) {
        let schema = make_schema(&Capabilities::new());
        let resolver = SetIdentityResolver::new(&schema, members_node(&schema));
        let a: Vec<ForeignValue> = original.iter().map(|s| ForeignValue::string(s.as_str())).collect();
        let b: Vec<ForeignValue> = shuffled.iter().map(|s| ForeignValue::string(s.as_str())).collect();
        let matching = resolver.match_sets(&a, &b);
        prop_assert!(matching.removed.is_empty());
        prop_assert!(matching.added.is_empty());
        for (p, n) in matching.matched {
            prop_assert_eq!(&a[p], &b[n]);
        }
    }
}
