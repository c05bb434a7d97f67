use crate::trivia::{AtomKind, Extra};
use crate::value::{append_quoted, Array, Object, Value, ValueKind};

impl Value {
    /// Reformats the tree in place into the canonical pretty form: tab
    /// indentation, aligned object values, re-indented block comments, blank
    /// runs collapsed to a single blank line, and a final newline.
    ///
    /// Formatting is idempotent and preserves [`Value::is_standard`]:
    /// standard input never gains comments or trailing commas.
    pub fn format(&mut self) {
        let standard = self.is_standard();
        canonicalize_strings(self);

        let slot = scan_slot(&self.before_extra);
        let mut before = Vec::new();
        render_comments(&mut before, &slot, 0, Placement::Plain, true, false);
        if !slot.comments.is_empty() {
            if slot.nl_end {
                before.push(b'\n');
                if slot.blank_end {
                    before.push(b'\n');
                }
            } else {
                before.push(b' ');
            }
        }
        self.before_extra = Extra::from(before);

        render_kind(&mut self.value, 0, standard);

        let slot = scan_slot(&self.after_extra);
        let mut after = Vec::new();
        render_comments(&mut after, &slot, 0, Placement::Attach, true, false);
        after.push(b'\n');
        self.after_extra = Extra::from(after);

        self.update_offsets();
    }
}

/// Re-encodes every string literal (values and member names) canonically.
fn canonicalize_strings(v: &mut Value) {
    match &mut v.value {
        ValueKind::Literal(lit) => {
            if lit.is_string() {
                let decoded = lit.decode().into_owned();
                let mut out = Vec::with_capacity(decoded.len() + 2);
                append_quoted(&mut out, &decoded);
                lit.set_bytes(out);
            }
        }
        ValueKind::Object(obj) => {
            for member in &mut obj.members {
                canonicalize_strings(&mut member.name);
                canonicalize_strings(&mut member.value);
            }
        }
        ValueKind::Array(arr) => {
            for element in &mut arr.elements {
                canonicalize_strings(element);
            }
        }
    }
}

/// One comment with cleaned text and the whitespace context around it.
struct Comment {
    /// Cleaned source: CR replaced by a space, every line right-trimmed.
    text: Vec<u8>,
    line: bool,
    multiline: bool,
    nl_before: bool,
    blank_before: bool,
}

/// A scanned trivia slot: its comments plus trailing-whitespace shape.
struct Slot {
    comments: Vec<Comment>,
    nl_end: bool,
    blank_end: bool,
    ws_newline: bool,
}

fn scan_slot(extra: &Extra) -> Slot {
    let mut comments = Vec::new();
    let mut pending_newlines = 0usize;
    let mut ws_newline = false;
    for atom in extra.atoms() {
        match atom.kind {
            AtomKind::Whitespace => {
                let n = atom.bytes.iter().filter(|&&b| b == b'\n').count();
                if n > 0 {
                    ws_newline = true;
                }
                pending_newlines += n;
            }
            AtomKind::LineComment | AtomKind::BlockComment => {
                let text = clean_comment(atom.bytes);
                comments.push(Comment {
                    multiline: text.contains(&b'\n'),
                    line: atom.kind == AtomKind::LineComment,
                    text,
                    nl_before: pending_newlines >= 1,
                    blank_before: pending_newlines >= 2,
                });
                pending_newlines = 0;
            }
        }
    }
    Slot {
        comments,
        nl_end: pending_newlines >= 1,
        blank_end: pending_newlines >= 2,
        ws_newline,
    }
}

/// CR becomes a space, then every line loses its trailing whitespace.
fn clean_comment(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    for (i, raw) in src.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let mut line: Vec<u8> = raw
            .iter()
            .map(|&b| if b == b'\r' { b' ' } else { b })
            .collect();
        while matches!(line.last(), Some(b' ' | b'\t')) {
            line.pop();
        }
        out.extend_from_slice(&line);
    }
    out
}

/// Whether a slot forbids single-line rendering.
fn forces_break(slot: &Slot) -> bool {
    slot.ws_newline || slot.comments.iter().any(|c| c.line || c.multiline)
}

/// Whether a value must render across multiple lines. The interior
/// whitespace of an empty composite is about to be cleared, so only comments
/// count there.
fn needs_break(v: &Value) -> bool {
    match &v.value {
        ValueKind::Literal(_) => false,
        ValueKind::Object(obj) => {
            if obj.members.is_empty() {
                scan_slot(&obj.after_extra)
                    .comments
                    .iter()
                    .any(|c| c.line || c.multiline)
            } else {
                object_breaks(obj)
            }
        }
        ValueKind::Array(arr) => {
            if arr.elements.is_empty() {
                scan_slot(&arr.after_extra)
                    .comments
                    .iter()
                    .any(|c| c.line || c.multiline)
            } else {
                array_breaks(arr)
            }
        }
    }
}

fn render_kind(kind: &mut ValueKind, depth: usize, standard: bool) {
    match kind {
        ValueKind::Literal(_) => {}
        ValueKind::Object(obj) => {
            if obj.members.is_empty() {
                render_empty(&mut obj.after_extra, depth);
                obj.has_trailing_comma = false;
            } else if object_breaks(obj) {
                render_object_multiline(obj, depth, standard);
            } else {
                render_object_inline(obj, depth, standard);
            }
        }
        ValueKind::Array(arr) => {
            if arr.elements.is_empty() {
                render_empty(&mut arr.after_extra, depth);
                arr.has_trailing_comma = false;
            } else if array_breaks(arr) {
                render_array_multiline(arr, depth, standard);
            } else {
                render_array_inline(arr, depth, standard);
            }
        }
    }
}

fn object_breaks(obj: &Object) -> bool {
    obj.members.iter().any(|m| {
        forces_break(&scan_slot(&m.name.before_extra))
            || forces_break(&scan_slot(&m.name.after_extra))
            || forces_break(&scan_slot(&m.value.before_extra))
            || forces_break(&scan_slot(&m.value.after_extra))
            || needs_break(&m.value)
    }) || forces_break(&scan_slot(&obj.after_extra))
}

fn array_breaks(arr: &Array) -> bool {
    arr.elements.iter().any(|e| {
        forces_break(&scan_slot(&e.before_extra))
            || forces_break(&scan_slot(&e.after_extra))
            || needs_break(e)
    }) || forces_break(&scan_slot(&arr.after_extra))
}

fn indent(out: &mut Vec<u8>, depth: usize) {
    out.resize(out.len() + depth, b'\t');
}

#[derive(Copy, Clone, PartialEq)]
enum Placement {
    /// First comment starts the output directly (document start).
    Plain,
    /// First comment may share the previous line when no newline precedes it.
    Attach,
}

/// Renders the comments of a slot. `depth` indents broken lines. Returns
/// whether any comment was placed on a line of its own (used for grouping).
fn render_comments(
    out: &mut Vec<u8>,
    slot: &Slot,
    depth: usize,
    first: Placement,
    allow_blank: bool,
    suppress_leading_blank: bool,
) -> bool {
    let mut own_line = false;
    for (i, c) in slot.comments.iter().enumerate() {
        let attach = !c.nl_before
            && (i > 0 || first == Placement::Attach)
            && !(i == 0 && first == Placement::Plain);
        if i == 0 && first == Placement::Plain {
            // Nothing before the first comment at document start.
        } else if attach {
            out.push(b' ');
        } else {
            out.push(b'\n');
            if allow_blank && c.blank_before && !(i == 0 && suppress_leading_blank) {
                out.push(b'\n');
            }
            indent(out, depth);
            own_line = true;
        }
        push_comment(out, c, depth);
    }
    own_line
}

/// Appends one comment, re-indenting the interior lines of multi-line block
/// comments at the new column.
fn push_comment(out: &mut Vec<u8>, c: &Comment, depth: usize) {
    if !c.multiline {
        out.extend_from_slice(&c.text);
        return;
    }
    let lines: Vec<&[u8]> = c.text.split(|&b| b == b'\n').collect();
    out.extend_from_slice(lines[0]);
    let rest = &lines[1..];
    let any_blank = rest.iter().any(|l| l.is_empty());
    let star = !any_blank
        && rest.iter().all(|l| body(l).first() == Some(&b'*'))
        && rest.windows(2).all(|w| leading(w[0]) == leading(w[1]));
    if star {
        // Align every `*` one column past the opening `/*`.
        for l in rest {
            out.push(b'\n');
            indent(out, depth);
            out.push(b' ');
            out.extend_from_slice(body(l));
        }
        return;
    }
    let base = leading(rest.last().expect("multiline comment has lines"));
    let keep_relative = rest
        .iter()
        .all(|l| l.is_empty() || leading(l).starts_with(base));
    for l in rest {
        out.push(b'\n');
        if l.is_empty() {
            continue;
        }
        indent(out, depth);
        if keep_relative {
            out.extend_from_slice(&l[base.len()..]);
        } else {
            out.extend_from_slice(body(l));
        }
    }
}

fn leading(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn body(line: &[u8]) -> &[u8] {
    &line[leading(line).len()..]
}

/// An empty composite: `{}`, `{ /**/ }`, or comments broken over lines with
/// the closing delimiter back at the outer indent.
fn render_empty(after: &mut Extra, depth: usize) {
    let slot = scan_slot(after);
    if slot.comments.is_empty() {
        after.clear();
        return;
    }
    let mut out = Vec::new();
    if slot.comments.iter().any(|c| c.line || c.multiline) {
        render_comments(&mut out, &slot, depth + 1, Placement::Attach, false, true);
        out.push(b'\n');
        indent(&mut out, depth);
    } else {
        out.push(b' ');
        join_inline(&mut out, &slot);
        out.push(b' ');
    }
    *after = Extra::from(out);
}

/// Joins single-line comments with spaces, without surrounding spaces.
fn join_inline(out: &mut Vec<u8>, slot: &Slot) {
    for (i, c) in slot.comments.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        out.extend_from_slice(&c.text);
    }
}

/// ` /**/ /**/ ` when the slot has comments, `empty` otherwise.
fn inline_extra(slot: &Slot, empty: &'static [u8]) -> Extra {
    if slot.comments.is_empty() {
        return Extra::from(empty);
    }
    let mut out = Vec::new();
    out.push(b' ');
    join_inline(&mut out, slot);
    out.push(b' ');
    Extra::from(out)
}

fn render_object_inline(obj: &mut Object, depth: usize, standard: bool) {
    for (i, m) in obj.members.iter_mut().enumerate() {
        let first = i == 0;
        m.name.before_extra = inline_extra(
            &scan_slot(&m.name.before_extra),
            if first { b"" } else { b" " },
        );
        m.name.after_extra = inline_extra(&scan_slot(&m.name.after_extra), b"");
        m.value.before_extra = inline_extra(&scan_slot(&m.value.before_extra), b" ");
        render_kind(&mut m.value.value, depth, standard);
        m.value.after_extra = inline_extra(&scan_slot(&m.value.after_extra), b"");
    }
    let slot = scan_slot(&obj.after_extra);
    obj.has_trailing_comma = obj.has_trailing_comma && !slot.comments.is_empty();
    obj.after_extra = inline_extra(&slot, b"");
}

fn render_array_inline(arr: &mut Array, depth: usize, standard: bool) {
    for (i, e) in arr.elements.iter_mut().enumerate() {
        let first = i == 0;
        e.before_extra = inline_extra(
            &scan_slot(&e.before_extra),
            if first { b"" } else { b" " },
        );
        render_kind(&mut e.value, depth, standard);
        e.after_extra = inline_extra(&scan_slot(&e.after_extra), b"");
    }
    let slot = scan_slot(&arr.after_extra);
    arr.has_trailing_comma = arr.has_trailing_comma && !slot.comments.is_empty();
    arr.after_extra = inline_extra(&slot, b"");
}

/// A member's leading trivia rendered for multi-line layout, plus whether it
/// breaks the alignment group and where the name landed.
struct LeadPlan {
    bytes: Vec<u8>,
    breaks_group: bool,
}

/// Renders a member-slot (leading trivia before a member, element, or closing
/// delimiter): comments on their own indented lines, blank runs collapsed,
/// an unseparated first comment kept on the previous line.
fn render_lead(slot: &Slot, depth: usize, first_in_composite: bool) -> LeadPlan {
    let mut out = Vec::new();
    let own_line = render_comments(
        &mut out,
        slot,
        depth,
        Placement::Attach,
        true,
        first_in_composite,
    );
    let mut blank_rendered = own_line
        && slot
            .comments
            .iter()
            .enumerate()
            .any(|(i, c)| c.blank_before && !(i == 0 && first_in_composite));
    // Token placement after the comments.
    if slot.comments.is_empty() {
        out.push(b'\n');
        if slot.blank_end && !first_in_composite {
            out.push(b'\n');
            blank_rendered = true;
        }
        indent(&mut out, depth);
    } else if slot.nl_end {
        out.push(b'\n');
        if slot.blank_end {
            out.push(b'\n');
            blank_rendered = true;
        }
        indent(&mut out, depth);
    } else {
        out.push(b' ');
    }
    LeadPlan {
        bytes: out,
        breaks_group: own_line || blank_rendered,
    }
}

/// Renders a colon/comma slot (`name.after`, `value.before`, `value.after`):
/// kept inline with single spaces when nothing needs a newline, otherwise
/// broken onto lines at `depth` with blank lines dropped. `end_inline` is
/// the separator used when the slot carries no comments at all.
fn render_joint(slot: &Slot, depth: usize, end_inline: &'static [u8]) -> Extra {
    if slot.comments.is_empty() {
        return Extra::from(end_inline);
    }
    if !forces_break(slot) {
        let mut out = Vec::new();
        out.push(b' ');
        join_inline(&mut out, slot);
        out.push(b' ');
        return Extra::from(out);
    }
    let mut out = Vec::new();
    render_comments(&mut out, slot, depth, Placement::Attach, false, false);
    if slot.nl_end || slot.comments.last().is_some_and(|c| c.line) {
        out.push(b'\n');
        indent(&mut out, depth);
    } else {
        out.push(b' ');
    }
    Extra::from(out)
}

fn render_object_multiline(obj: &mut Object, depth: usize, standard: bool) {
    let inner = depth + 1;

    // First pass: leading trivia, alignment groups and widths.
    struct Plan {
        lead: Vec<u8>,
        group: usize,
        alignable: bool,
        width: usize,
    }
    let mut plans: Vec<Plan> = Vec::with_capacity(obj.members.len());
    let mut group = 0usize;
    for (i, m) in obj.members.iter().enumerate() {
        let slot = scan_slot(&m.name.before_extra);
        let lead = render_lead(&slot, inner, i == 0);
        if i > 0 && lead.breaks_group {
            group += 1;
        }
        let name_len = match &m.name.value {
            ValueKind::Literal(lit) => lit.as_bytes().len(),
            _ => 0,
        };
        let line_start = lead
            .bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|p| p + 1);
        let alignable = line_start.is_some()
            && scan_slot(&m.name.after_extra).comments.is_empty()
            && scan_slot(&m.value.before_extra).comments.is_empty()
            && !needs_break(&m.value);
        let width = match line_start {
            Some(p) => lead.bytes.len() - p + name_len + 1,
            None => 0,
        };
        plans.push(Plan {
            lead: lead.bytes,
            group,
            alignable,
            width,
        });
    }
    let mut group_width = vec![0usize; group + 1];
    for plan in &plans {
        if plan.alignable {
            group_width[plan.group] = group_width[plan.group].max(plan.width);
        }
    }

    // Second pass: assign the new trivia.
    let last = obj.members.len() - 1;
    for (i, m) in obj.members.iter_mut().enumerate() {
        let plan = &plans[i];
        m.name.before_extra = Extra::from(plan.lead.clone());
        m.name.after_extra = render_joint(&scan_slot(&m.name.after_extra), inner + 1, b"");

        let value_slot = scan_slot(&m.value.before_extra);
        if plan.alignable && value_slot.comments.is_empty() {
            let pad = group_width[plan.group] + 1 - plan.width;
            m.value.before_extra = Extra::from(vec![b' '; pad]);
        } else {
            m.value.before_extra = render_joint(&value_slot, inner + 1, b" ");
        }

        let child_depth = if m.value.before_extra.as_bytes().contains(&b'\n') {
            inner + 1
        } else {
            inner
        };
        render_kind(&mut m.value.value, child_depth, standard);

        let comma_follows = i != last || !standard;
        if comma_follows {
            m.value.after_extra = render_joint(&scan_slot(&m.value.after_extra), inner + 1, b"");
        } else {
            m.value.after_extra.clear();
        }
    }
    obj.has_trailing_comma = !standard;

    let slot = scan_slot(&obj.after_extra);
    let mut out = Vec::new();
    render_comments(&mut out, &slot, inner, Placement::Attach, true, false);
    out.push(b'\n');
    indent(&mut out, depth);
    obj.after_extra = Extra::from(out);
}

fn render_array_multiline(arr: &mut Array, depth: usize, standard: bool) {
    let inner = depth + 1;
    let last = arr.elements.len() - 1;
    for (i, e) in arr.elements.iter_mut().enumerate() {
        let slot = scan_slot(&e.before_extra);
        e.before_extra = Extra::from(render_lead(&slot, inner, i == 0).bytes);
        render_kind(&mut e.value, inner, standard);
        let comma_follows = i != last || !standard;
        if comma_follows {
            e.after_extra = render_joint(&scan_slot(&e.after_extra), inner + 1, b"");
        } else {
            e.after_extra.clear();
        }
    }
    arr.has_trailing_comma = !standard;

    let slot = scan_slot(&arr.after_extra);
    let mut out = Vec::new();
    render_comments(&mut out, &slot, inner, Placement::Attach, true, false);
    out.push(b'\n');
    indent(&mut out, depth);
    arr.after_extra = Extra::from(out);
}
