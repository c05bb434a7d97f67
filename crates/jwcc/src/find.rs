use std::borrow::Cow;

use crate::value::{Value, ValueKind};

/// Decodes one RFC 6901 reference token: `~1` is `/` and `~0` is `~`.
pub(crate) fn unescape_segment(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Parses an array index: a decimal integer with no sign and no redundant
/// leading zeros.
#[must_use]
pub fn parse_index(s: &str) -> Option<usize> {
    if s.starts_with('+') || (s.starts_with('0') && s.len() != 1) {
        return None;
    }
    s.parse().ok()
}

impl Value {
    /// Resolves an RFC 6901 JSON Pointer against this value.
    ///
    /// The empty pointer selects `self`. On objects, the first member whose
    /// decoded name matches the reference token wins. `None` when the pointer
    /// has no leading slash, an index is malformed, or a token has no match.
    #[must_use]
    pub fn find(&self, pointer: &str) -> Option<&Value> {
        if pointer.is_empty() {
            return Some(self);
        }
        if !pointer.starts_with('/') {
            return None;
        }
        pointer
            .split('/')
            .skip(1)
            .map(unescape_segment)
            .try_fold(self, |target, token| match &target.value {
                ValueKind::Object(obj) => obj
                    .members
                    .iter()
                    .find(|m| member_name(m) == token)
                    .map(|m| &m.value),
                ValueKind::Array(arr) => {
                    parse_index(&token).and_then(|idx| arr.elements.get(idx))
                }
                ValueKind::Literal(_) => None,
            })
    }

    /// Mutable counterpart of [`Value::find`].
    #[must_use]
    pub fn find_mut(&mut self, pointer: &str) -> Option<&mut Value> {
        if pointer.is_empty() {
            return Some(self);
        }
        if !pointer.starts_with('/') {
            return None;
        }
        pointer
            .split('/')
            .skip(1)
            .map(unescape_segment)
            .try_fold(self, |target, token| match &mut target.value {
                ValueKind::Object(obj) => obj
                    .members
                    .iter_mut()
                    .find(|m| member_name(m) == token)
                    .map(|m| &mut m.value),
                ValueKind::Array(arr) => {
                    parse_index(&token).and_then(|idx| arr.elements.get_mut(idx))
                }
                ValueKind::Literal(_) => None,
            })
    }
}

fn member_name(member: &crate::value::Member) -> Cow<'_, str> {
    match &member.name.value {
        ValueKind::Literal(lit) => lit.decode(),
        // Member names are always literals; tolerate anything else.
        _ => Cow::Borrowed(""),
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use test_case::test_case;

    // RFC 6901, section 5.
    const DOCUMENT: &str = r#"
	{
		"foo": ["bar", "baz"],
		"": 0,
		"a/b": 1,
		"c%d": 2,
		"e^f": 3,
		"g|h": 4,
		"i\\j": 5,
		"k\"l": 6,
		" ": 7,
		"m~n": 8
	}"#;

    #[test_case("/foo", Some(r#"["bar","baz"]"#); "member foo")]
    #[test_case("/foo/0", Some(r#""bar""#); "array index")]
    #[test_case("/", Some("0"); "empty member name")]
    #[test_case("/a~1b", Some("1"); "escaped slash")]
    #[test_case("/c%d", Some("2"); "percent")]
    #[test_case("/e^f", Some("3"); "caret")]
    #[test_case("/g|h", Some("4"); "pipe")]
    #[test_case("/i\\j", Some("5"); "backslash")]
    #[test_case("/k\"l", Some("6"); "quote")]
    #[test_case("/ ", Some("7"); "space member name")]
    #[test_case("/m~0n", Some("8"); "escaped tilde")]
    #[test_case("foo", None; "missing leading slash")]
    #[test_case("/foo ", None; "trailing space in token")]
    #[test_case("/foo/00", None; "leading zero index")]
    #[test_case("/////", None; "empty tokens under literal")]
    fn rfc6901(pointer: &str, want: Option<&str>) {
        let mut v = parse(DOCUMENT.as_bytes()).expect("parse");
        v.minimize();
        let got = v.find(pointer).map(|v2| v2.to_string());
        assert_eq!(got.as_deref(), want, "{pointer}");
    }

    #[test]
    fn empty_pointer_is_root() {
        let v = parse(b"{}").expect("parse");
        assert!(std::ptr::eq(v.find("").expect("root"), &v));
    }

    #[test]
    fn first_duplicate_wins() {
        let v = parse(br#"{"k": 1, "k": 2}"#).expect("parse");
        assert_eq!(v.find("/k").expect("k").to_string(), " 1");
    }
}
