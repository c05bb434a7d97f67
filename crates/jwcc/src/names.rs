use ahash::AHashMap;

use crate::value::{Literal, Value, ValueKind};

/// A nested map of canonical JSON object-member names.
///
/// Each entry maps a canonical spelling to the `Names` applied to that
/// member's value; an empty child map means "no constraints below". The
/// reserved key `*`, alone at its level, applies its child map to every
/// member's value.
///
/// This is the interface handed to serializer front-ends: derive a `Names`
/// tree from the shape of a native record type (or any JSON description via
/// [`Names::from_json`]) and apply it with [`Value::normalize_names`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Names {
    children: AHashMap<String, Names>,
}

impl Names {
    #[must_use]
    pub fn new() -> Names {
        Names::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Inserts a canonical name with the map for its sub-objects.
    pub fn insert(&mut self, name: impl Into<String>, children: Names) -> &mut Names {
        self.children.insert(name.into(), children);
        self
    }

    /// Builds a `Names` tree from a JSON description: an object maps each
    /// canonical name to either `null` (leaf) or a nested description.
    /// Arrays apply their first element's description to every element
    /// position, mirroring how sequences share one element shape.
    #[must_use]
    pub fn from_json(description: &serde_json::Value) -> Names {
        let mut names = Names::new();
        match description {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    names.insert(key.clone(), Names::from_json(child));
                }
            }
            serde_json::Value::Array(items) => {
                if let Some(first) = items.first() {
                    return Names::from_json(first);
                }
            }
            _ => {}
        }
        names
    }

    fn get(&self, name: &str) -> Option<&Names> {
        self.children.get(name)
    }

    /// The wildcard child map, when this level is exactly `{"*": ...}`.
    fn wildcard(&self) -> Option<&Names> {
        if self.children.len() == 1 {
            self.children.get("*")
        } else {
            None
        }
    }

    /// The lexically greatest canonical name matching case-insensitively.
    fn fold_match(&self, name: &str) -> Option<&str> {
        let mut found: Option<&str> = None;
        for candidate in self.children.keys() {
            if found.is_some_and(|best| candidate.as_str() < best) {
                continue;
            }
            if eq_fold(name, candidate) {
                found = Some(candidate);
            }
        }
        found
    }
}

/// Unicode case-insensitive comparison via lowercase folding.
fn eq_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl Value {
    /// Recursively rewrites object member names that case-insensitively
    /// match a canonical name in `names` to the canonical spelling, using
    /// each entry's child map for the member's value. The `*` wildcard
    /// applies one child map to every member.
    pub fn normalize_names(&mut self, names: &Names) {
        self.normalize(names);
        self.update_offsets();
    }

    fn normalize(&mut self, names: &Names) {
        if names.is_empty() {
            return;
        }
        match &mut self.value {
            ValueKind::Object(obj) => {
                if let Some(sub) = names.wildcard() {
                    for member in &mut obj.members {
                        member.value.normalize(sub);
                    }
                    return;
                }
                for member in &mut obj.members {
                    let name = match &member.name.value {
                        ValueKind::Literal(lit) => lit.decode().into_owned(),
                        _ => continue,
                    };
                    let mut sub = names.get(&name);
                    if sub.is_none() {
                        if let Some(canonical) = names.fold_match(&name) {
                            member.name.value =
                                ValueKind::Literal(Literal::string(canonical));
                            sub = names.get(canonical);
                        }
                    }
                    if let Some(sub) = sub {
                        member.value.normalize(sub);
                    }
                }
            }
            ValueKind::Array(arr) => {
                for element in &mut arr.elements {
                    element.normalize(names);
                }
            }
            ValueKind::Literal(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn from_json_shape() {
        let names = Names::from_json(&json!({
            "Alpha": null,
            "bravo_wavo": [{"Foo": null}],
            "Charlie": {"*": {"fizzy_wizzy": null, "Buzz": null}},
        }));
        assert!(names.get("Alpha").expect("leaf").is_empty());
        assert!(names.get("bravo_wavo").expect("nested").get("Foo").is_some());
        assert!(names
            .get("Charlie")
            .expect("nested")
            .wildcard()
            .expect("wildcard")
            .get("Buzz")
            .is_some());
    }

    #[test]
    fn normalizes_nested_and_wildcard() {
        let names = Names::from_json(&json!({
            "Alpha": null,
            "bravo_wavo": {"Foo": null},
            "Charlie": {"*": {"fizzy_wizzy": null, "Buzz": null}},
        }));
        let mut v = parse(
            br#"{
	"AlPhA": 0,
	"BRAVO_WAVO": [
		{"FOO": 0},
		{"fOo": 1},
		{"Foo": 2},
	],
	"charlie": {
		"kEy": {"FIZZY_WIZZY": 0},
		"KeY": {"bUzZ": 1},
	},
}"#,
        )
        .expect("parse");
        v.normalize_names(&names);
        assert_eq!(
            v.to_string(),
            r#"{
	"Alpha": 0,
	"bravo_wavo": [
		{"Foo": 0},
		{"Foo": 1},
		{"Foo": 2},
	],
	"Charlie": {
		"kEy": {"fizzy_wizzy": 0},
		"KeY": {"Buzz": 1},
	},
}"#
        );
    }

    #[test_case(
        json!({"GoName1": null, "GoName2": null, "json_name": null}),
        r#"{"goname1":0,"goname2":0,"JSON_NAME":0,"JSONNAME":0}"#,
        r#"{"GoName1":0,"GoName2":0,"json_name":0,"JSONNAME":0}"#;
        "flat struct names"
    )]
    #[test_case(
        json!({"M": {"*": {"*": {"field": null}}}}),
        r#"{"m":[{"hello":[{"goodbye":[{"FIELD":0}]}]}]}"#,
        r#"{"M":[{"hello":[{"goodbye":[{"field":0}]}]}]}"#;
        "wildcards through arrays"
    )]
    #[test_case(json!(null), r#"{"hello":"goodbye"}"#, r#"{"hello":"goodbye"}"#; "empty names")]
    fn normalize_tables(description: serde_json::Value, input: &str, want: &str) {
        let names = Names::from_json(&description);
        let mut v = parse(input.as_bytes()).expect("parse");
        v.normalize_names(&names);
        assert_eq!(v.to_string(), want);
    }

    #[test]
    fn ambiguity_resolves_to_lexically_greatest() {
        let mut names = Names::new();
        names.insert("Key", Names::new());
        names.insert("kEY", Names::new());
        let mut v = parse(br#"{"key":1}"#).expect("parse");
        v.normalize_names(&names);
        assert_eq!(v.to_string(), r#"{"kEY":1}"#);
    }

    #[test]
    fn offsets_refreshed_after_rewrite() {
        let mut names = Names::new();
        names.insert("LongerName", Names::new());
        let mut v = parse(br#"{"longername":0, "x":1}"#).expect("parse");
        v.normalize_names(&names);
        let offsets: Vec<usize> = v.iter().map(|n| n.start_offset).collect();
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
