use crate::trivia::Extra;
use crate::value::{Value, ValueKind};

impl Value {
    /// Deletes every comment and trailing comma in place, leaving valid
    /// RFC 8259 JSON. All other whitespace bytes are preserved, so the
    /// output keeps the document's general shape (unlike the streaming
    /// standardizer, which space-pads to preserve offsets exactly).
    pub fn standardize(&mut self) {
        self.standardize_value();
        self.update_offsets();
    }

    fn standardize_value(&mut self) {
        strip_comments(&mut self.before_extra);
        strip_comments(&mut self.after_extra);
        match &mut self.value {
            ValueKind::Literal(_) => {}
            ValueKind::Object(obj) => {
                obj.has_trailing_comma = false;
                strip_comments(&mut obj.after_extra);
                for member in &mut obj.members {
                    member.name.standardize_value();
                    member.value.standardize_value();
                }
            }
            ValueKind::Array(arr) => {
                arr.has_trailing_comma = false;
                strip_comments(&mut arr.after_extra);
                for element in &mut arr.elements {
                    element.standardize_value();
                }
            }
        }
    }

    /// Removes all trivia and trailing commas in place, producing the
    /// shortest JSON with the same semantic value.
    pub fn minimize(&mut self) {
        self.minimize_value();
        self.update_offsets();
    }

    fn minimize_value(&mut self) {
        self.before_extra.clear();
        self.after_extra.clear();
        match &mut self.value {
            ValueKind::Literal(_) => {}
            ValueKind::Object(obj) => {
                obj.has_trailing_comma = false;
                obj.after_extra.clear();
                for member in &mut obj.members {
                    member.name.minimize_value();
                    member.value.minimize_value();
                }
            }
            ValueKind::Array(arr) => {
                arr.has_trailing_comma = false;
                arr.after_extra.clear();
                for element in &mut arr.elements {
                    element.minimize_value();
                }
            }
        }
    }
}

/// Removes comment atoms from trivia. In a grammatical tree a structural
/// token always separates adjacent literals, so dropping a comment never
/// merges two tokens and no replacement space is required.
fn strip_comments(extra: &mut Extra) {
    if extra.has_comment() {
        *extra = extra.without_comments();
    }
}
