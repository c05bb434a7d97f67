use std::borrow::Cow;
use std::mem;

use ahash::{AHashMap, AHashSet};

use crate::error::{PatchError, PatchErrorKind};
use crate::find::{parse_index, unescape_segment};
use crate::parser::parse;
use crate::trivia::Extra;
use crate::value::{Literal, Member, Object, Value, ValueKind};

impl Value {
    /// Applies an RFC 6902 patch document, itself in JWCC, to the tree in
    /// place. Operations run in order; a failing operation aborts the
    /// sequence and leaves every earlier operation applied.
    pub fn patch(&mut self, patch: &[u8]) -> Result<(), PatchError> {
        let doc = parse(patch).map_err(|e| PatchError::whole(PatchErrorKind::Parse(e)))?;
        let ops = match doc.value {
            ValueKind::Array(arr) => arr.elements,
            _ => return Err(PatchError::whole(PatchErrorKind::MustBeArray)),
        };
        for (index, op) in ops.into_iter().enumerate() {
            let op = extract_op(op).map_err(|kind| PatchError::op(index, kind))?;
            apply_op(self, op).map_err(|kind| PatchError::op(index, kind))?;
        }
        self.update_offsets();
        Ok(())
    }
}

struct Op {
    name: String,
    path: String,
    from: Option<String>,
    value: Option<Value>,
    /// Comment block adjacent to the operation's `value` member, inherited
    /// by added values.
    lead: Extra,
    /// Same-line comment following the `value` member, inherited likewise.
    post: Extra,
}

const OPS: [&str; 6] = ["add", "remove", "replace", "move", "copy", "test"];

fn extract_op(mut op: Value) -> Result<Op, PatchErrorKind> {
    let ValueKind::Object(obj) = &mut op.value else {
        return Err(PatchErrorKind::OpMustBeObject);
    };

    let mut seen = AHashSet::with_capacity(obj.members.len());
    let mut name = None;
    let mut path = None;
    let mut from = None;
    let mut value_idx = None;
    for (i, m) in obj.members.iter().enumerate() {
        let member_name = decoded_name(m).into_owned();
        if !seen.insert(member_name.clone()) {
            return Err(PatchErrorKind::DuplicateMember(member_name));
        }
        match member_name.as_str() {
            "op" | "path" | "from" => {
                let text = match &m.value.value {
                    ValueKind::Literal(lit) if lit.is_string() => lit.decode().into_owned(),
                    _ => return Err(PatchErrorKind::MemberNotString(member_name)),
                };
                match member_name.as_str() {
                    "op" => name = Some(text),
                    "path" => path = Some(text),
                    _ => from = Some(text),
                }
            }
            "value" => value_idx = Some(i),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| PatchErrorKind::MissingMember("op".to_owned()))?;
    if !OPS.contains(&name.as_str()) {
        return Err(PatchErrorKind::UnknownOp(name));
    }
    let path = path.ok_or_else(|| PatchErrorKind::MissingMember("path".to_owned()))?;
    if matches!(name.as_str(), "move" | "copy") && from.is_none() {
        return Err(PatchErrorKind::MissingMember("from".to_owned()));
    }
    if matches!(name.as_str(), "add" | "replace" | "test") && value_idx.is_none() {
        return Err(PatchErrorKind::MissingMember("value".to_owned()));
    }

    let (lead, post, value) = match value_idx {
        Some(vi) => {
            let lead = capture_lead(&obj.members[vi].name.before_extra);
            let next_slot = match obj.members.get(vi + 1) {
                Some(next) => &next.name.before_extra,
                None => &obj.after_extra,
            };
            let post = capture_post(next_slot);
            let mut value = mem::take(&mut obj.members[vi].value);
            value.before_extra.clear();
            value.after_extra.clear();
            (lead, post, Some(value))
        }
        None => (Extra::new(), Extra::new(), None),
    };

    Ok(Op {
        name,
        path,
        from,
        value,
        lead,
        post,
    })
}

fn decoded_name(member: &Member) -> Cow<'_, str> {
    match &member.name.value {
        ValueKind::Literal(lit) => lit.decode(),
        _ => Cow::Borrowed(""),
    }
}

fn apply_op(root: &mut Value, op: Op) -> Result<(), PatchErrorKind> {
    match op.name.as_str() {
        "add" => {
            let value = op.value.expect("validated");
            add(root, &op.path, value, op.lead, op.post)
        }
        "remove" => remove(root, &op.path).map(drop),
        "replace" => {
            let value = op.value.expect("validated");
            let target = root
                .find_mut(&op.path)
                .ok_or(PatchErrorKind::ValueNotFound)?;
            target.value = value.value;
            Ok(())
        }
        "move" => {
            let from = op.from.expect("validated");
            if from.is_empty()
                || op.path == from
                || op.path.starts_with(&format!("{from}/"))
            {
                return Err(PatchErrorKind::CannotMoveInto(from, op.path));
            }
            let (lead, post) = capture_slot(root, &from)?;
            let removed = remove(root, &from)?;
            add(root, &op.path, removed, lead, post)
        }
        "copy" => {
            let from = op.from.expect("validated");
            let (lead, post) = capture_slot(root, &from)?;
            let source = root.find(&from).ok_or(PatchErrorKind::ValueNotFound)?.clone();
            add(root, &op.path, source, lead, post)
        }
        "test" => {
            let value = op.value.expect("validated");
            let target = root.find(&op.path).ok_or(PatchErrorKind::ValueNotFound)?;
            if semantic_eq(&target.value, &value.value) {
                Ok(())
            } else {
                Err(PatchErrorKind::TestMismatch(op.path))
            }
        }
        _ => unreachable!("validated operation name"),
    }
}

fn split_parent(pointer: &str) -> Option<(&str, Cow<'_, str>)> {
    let i = pointer.rfind('/')?;
    Some((&pointer[..i], unescape_segment(&pointer[i + 1..])))
}

/// Creates or replaces the value at `path`. `lead`/`post` carry comment
/// trivia inherited from the patch document (or, for move/copy, from the
/// source location); they only apply when a new member or element is born.
fn add(
    root: &mut Value,
    path: &str,
    mut value: Value,
    lead: Extra,
    post: Extra,
) -> Result<(), PatchErrorKind> {
    value.before_extra.clear();
    value.after_extra.clear();
    if path.is_empty() {
        root.value = value.value;
        return Ok(());
    }
    let (parent_ptr, token) = split_parent(path).ok_or(PatchErrorKind::ValueNotFound)?;
    let parent = root
        .find_mut(parent_ptr)
        .ok_or(PatchErrorKind::ValueNotFound)?;
    match &mut parent.value {
        ValueKind::Object(obj) => {
            if let Some(m) = obj
                .members
                .iter_mut()
                .find(|m| decoded_name(m) == token)
            {
                m.value.value = value.value;
                return Ok(());
            }
            let before = append_lead(obj, lead, &post);
            let name = Value {
                before_extra: before,
                value: ValueKind::Literal(Literal::string(&token)),
                after_extra: Extra::new(),
                start_offset: 0,
            };
            obj.members.push(Member { name, value });
            Ok(())
        }
        ValueKind::Array(arr) => {
            let len = arr.elements.len();
            let idx = if token == "-" {
                len
            } else {
                parse_index(&token).ok_or(PatchErrorKind::ValueNotFound)?
            };
            if idx > len {
                return Err(PatchErrorKind::ValueNotFound);
            }
            if idx == len {
                // Append, migrating any same-line comment pending before the
                // closing bracket onto the new element's line.
                let mut before = Extra::new();
                let mut taken = false;
                if let Some(cut) = arr.after_extra.same_line_comment_end() {
                    before = arr.after_extra.slice(0, cut);
                    taken = true;
                }
                before.push_bytes(lead.as_bytes());
                value.before_extra = before;
                arr.elements.push(value);
                if taken || !post.is_empty() {
                    arr.after_extra = post;
                }
            } else {
                value.before_extra = lead;
                arr.elements.insert(idx, value);
                if !post.is_empty() {
                    let mut next = post;
                    next.push_bytes(arr.elements[idx + 1].before_extra.as_bytes());
                    arr.elements[idx + 1].before_extra = next;
                }
            }
            Ok(())
        }
        ValueKind::Literal(_) => Err(PatchErrorKind::ValueNotFound),
    }
}

/// The leading trivia for a member appended to `obj`, relocating a pending
/// same-line comment out of the closing-brace trivia.
fn append_lead(obj: &mut Object, lead: Extra, post: &Extra) -> Extra {
    let mut before = Extra::new();
    let mut taken = false;
    if let Some(cut) = obj.after_extra.same_line_comment_end() {
        before = obj.after_extra.slice(0, cut);
        taken = true;
    }
    before.push_bytes(lead.as_bytes());
    if taken || !post.is_empty() {
        obj.after_extra = post.clone();
    }
    before
}

/// Removes the value at `path`, returning it. Comment trivia adjacent to the
/// removed member goes with it; blocks separated by a blank line stay.
fn remove(root: &mut Value, path: &str) -> Result<Value, PatchErrorKind> {
    if path.is_empty() {
        return Err(PatchErrorKind::CannotRemoveRoot);
    }
    let (parent_ptr, token) = split_parent(path).ok_or(PatchErrorKind::ValueNotFound)?;
    let parent = root
        .find_mut(parent_ptr)
        .ok_or(PatchErrorKind::ValueNotFound)?;
    match &mut parent.value {
        ValueKind::Object(obj) => {
            let i = obj
                .members
                .iter()
                .position(|m| decoded_name(m) == token)
                .ok_or(PatchErrorKind::ValueNotFound)?;
            let removed = obj.members.remove(i);
            let mut joined = removal_left(&removed.name.before_extra);
            let right = if i < obj.members.len() {
                &mut obj.members[i].name.before_extra
            } else {
                &mut obj.after_extra
            };
            joined.push_bytes(removal_right(right).as_bytes());
            *right = joined;
            if obj.members.is_empty() {
                obj.has_trailing_comma = false;
            }
            Ok(removed.value)
        }
        ValueKind::Array(arr) => {
            let idx = parse_index(&token)
                .filter(|&idx| idx < arr.elements.len())
                .ok_or(PatchErrorKind::ValueNotFound)?;
            let removed = arr.elements.remove(idx);
            let mut joined = removal_left(&removed.before_extra);
            let right = if idx < arr.elements.len() {
                &mut arr.elements[idx].before_extra
            } else {
                &mut arr.after_extra
            };
            joined.push_bytes(removal_right(right).as_bytes());
            *right = joined;
            if arr.elements.is_empty() {
                arr.has_trailing_comma = false;
            }
            Ok(removed)
        }
        ValueKind::Literal(_) => Err(PatchErrorKind::ValueNotFound),
    }
}

/// What survives of the removed slot's own leading trivia: everything up to
/// and including the last blank line, nothing when no blank line shields it.
fn removal_left(extra: &Extra) -> Extra {
    if !extra.has_comment() {
        return Extra::new();
    }
    match extra.last_blank_range() {
        Some((_, end)) => extra.slice(0, end),
        None => Extra::new(),
    }
}

/// What survives of the trivia following the removed slot: comments through
/// the first blank line go, a same-line trailing comment goes, untouched
/// whitespace stays.
fn removal_right(extra: &Extra) -> Extra {
    if let Some((start, end)) = extra.first_blank_range() {
        if extra.has_comment_before(start) {
            return extra.slice(end, extra.as_bytes().len());
        }
    }
    match extra.same_line_comment_end() {
        Some(end) => extra.slice(end, extra.as_bytes().len()),
        None => extra.clone(),
    }
}

/// The (leading block, same-line trailing comment) pair around an existing
/// slot, captured for move/copy.
fn capture_slot(root: &Value, pointer: &str) -> Result<(Extra, Extra), PatchErrorKind> {
    if pointer.is_empty() {
        return Ok((Extra::new(), Extra::new()));
    }
    let (parent_ptr, token) = split_parent(pointer).ok_or(PatchErrorKind::ValueNotFound)?;
    let parent = root.find(parent_ptr).ok_or(PatchErrorKind::ValueNotFound)?;
    match &parent.value {
        ValueKind::Object(obj) => {
            let i = obj
                .members
                .iter()
                .position(|m| decoded_name(m) == token)
                .ok_or(PatchErrorKind::ValueNotFound)?;
            let next_slot = match obj.members.get(i + 1) {
                Some(next) => &next.name.before_extra,
                None => &obj.after_extra,
            };
            Ok((
                capture_lead(&obj.members[i].name.before_extra),
                capture_post(next_slot),
            ))
        }
        ValueKind::Array(arr) => {
            let idx = parse_index(&token)
                .filter(|&idx| idx < arr.elements.len())
                .ok_or(PatchErrorKind::ValueNotFound)?;
            let next_slot = match arr.elements.get(idx + 1) {
                Some(next) => &next.before_extra,
                None => &arr.after_extra,
            };
            Ok((
                capture_lead(&arr.elements[idx].before_extra),
                capture_post(next_slot),
            ))
        }
        ValueKind::Literal(_) => Err(PatchErrorKind::ValueNotFound),
    }
}

/// The comment block adjacent to a slot: the tail after the last blank line,
/// kept with that blank's final newline, or the whole trivia when no blank
/// line intervenes. Empty when the tail carries no comment.
fn capture_lead(extra: &Extra) -> Extra {
    if !extra.has_comment() {
        return Extra::new();
    }
    let start = match extra.last_blank_range() {
        Some((s, e)) => {
            let blank = &extra.as_bytes()[s..e];
            let last_nl = blank.iter().rposition(|&b| b == b'\n').expect("blank has newlines");
            s + last_nl
        }
        None => 0,
    };
    if extra.has_comment_at_or_after(start) {
        extra.slice(start, extra.as_bytes().len())
    } else {
        Extra::new()
    }
}

/// The comment sharing the line right after a slot's comma, with a newline
/// appended so it can stand before a closing delimiter.
fn capture_post(extra: &Extra) -> Extra {
    match extra.same_line_comment_end() {
        Some(end) => {
            let mut post = extra.slice(0, end);
            post.push_bytes(b"\n");
            post
        }
        None => Extra::new(),
    }
}

/// Structural equality for `test`: objects compare as name→value maps (last
/// duplicate wins), strings by decoded contents, and null/booleans/numbers
/// by their verbatim source text.
fn semantic_eq(a: &ValueKind, b: &ValueKind) -> bool {
    match (a, b) {
        (ValueKind::Literal(x), ValueKind::Literal(y)) => {
            if x.is_string() && y.is_string() {
                x.decode() == y.decode()
            } else {
                x.as_bytes() == y.as_bytes()
            }
        }
        (ValueKind::Object(x), ValueKind::Object(y)) => {
            let mx = member_map(x);
            let my = member_map(y);
            mx.len() == my.len()
                && mx.iter().all(|(name, v)| {
                    my.get(name)
                        .is_some_and(|v2| semantic_eq(&v.value, &v2.value))
                })
        }
        (ValueKind::Array(x), ValueKind::Array(y)) => {
            x.elements.len() == y.elements.len()
                && x.elements
                    .iter()
                    .zip(&y.elements)
                    .all(|(ex, ey)| semantic_eq(&ex.value, &ey.value))
        }
        _ => false,
    }
}

fn member_map(obj: &Object) -> AHashMap<String, &Value> {
    obj.members
        .iter()
        .map(|m| (decoded_name(m).into_owned(), &m.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_lead_stops_at_blank() {
        let extra = Extra::from("\n// a\n\n// b\n\t");
        assert_eq!(capture_lead(&extra).as_bytes(), b"\n// b\n\t");
        let extra = Extra::from("\n// only\n\t");
        assert_eq!(capture_lead(&extra).as_bytes(), b"\n// only\n\t");
        assert!(capture_lead(&Extra::from("  \n")).is_empty());
    }

    #[test]
    fn removal_splits() {
        let extra = Extra::from("\n// a\n\n// b\n");
        assert_eq!(removal_left(&extra).as_bytes(), b"\n// a\n\n");
        assert!(removal_left(&Extra::from("\n// a\n")).is_empty());
        assert!(removal_left(&Extra::from("\n\n")).is_empty());

        let extra = Extra::from(" // tail\n// adjacent\n\n// kept\n");
        assert_eq!(removal_right(&extra).as_bytes(), b"// kept\n");
        let extra = Extra::from(" // tail\n// kept\n");
        assert_eq!(removal_right(&extra).as_bytes(), b"\n// kept\n");
        let extra = Extra::from("\n\t");
        assert_eq!(removal_right(&extra).as_bytes(), b"\n\t");
    }
}
