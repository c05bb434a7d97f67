//! # jwcc
//!
//! A lossless toolkit for the JWCC dialect of JSON: standard JSON extended
//! with C-style comments and trailing commas.
//!
//! [`parse`] produces a syntactic tree in which every byte of the input,
//! including whitespace and comments, belongs to exactly one node, so
//! [`Value::pack`] reproduces the source byte-for-byte. The tree supports
//! in-place transforms ([`Value::standardize`], [`Value::minimize`],
//! [`Value::format`], [`Value::patch`], [`Value::normalize_names`]) and
//! RFC 6901 pointer lookup via [`Value::find`]. [`Standardizer`] converts a
//! JWCC byte stream to same-length standard JSON without building a tree.
//!
//! ```rust
//! let mut v = jwcc::parse(b"{\"port\": 80, // service\n}").expect("valid JWCC");
//! assert_eq!(v.pack(), b"{\"port\": 80, // service\n}");
//! v.standardize();
//! assert_eq!(v.pack(), b"{\"port\": 80 \n}");
//! ```

mod error;
mod find;
mod format;
mod interop;
mod names;
mod parser;
mod patch;
mod scanner;
mod standardizer;
mod transform;
mod trivia;
mod value;

pub use error::{ParseError, ParseErrorKind, PatchError, PatchErrorKind};
pub use find::parse_index;
pub use names::Names;
pub use parser::parse;
pub use standardizer::Standardizer;
pub use trivia::Extra;
pub use value::{Array, Iter, Literal, Member, Object, Value, ValueKind};

/// Parses, standardizes, and re-packs: the result is valid RFC 8259 JSON
/// with all comments and trailing commas deleted.
pub fn standardize(input: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut v = parse(input)?;
    v.standardize();
    Ok(v.pack())
}

/// Parses, minimizes, and re-packs: the shortest JSON with the same value.
pub fn minimize(input: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut v = parse(input)?;
    v.minimize();
    Ok(v.pack())
}

/// Parses, formats, and re-packs into the canonical pretty form.
pub fn format(input: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut v = parse(input)?;
    v.format();
    Ok(v.pack())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_wrappers() {
        assert_eq!(standardize(b"[1, /*x*/ 2,]").expect("ok"), b"[1,  2]");
        assert_eq!(minimize(b"[1, /*x*/ 2,]").expect("ok"), b"[1,2]");
        assert_eq!(format(b"[1, /*x*/ 2,]").expect("ok"), b"[1, /*x*/ 2]\n");
    }

    #[test]
    fn invalid_input_is_rejected_unchanged() {
        for f in [standardize, minimize, format] {
            assert!(f(b"[null,false,true,invalid]").is_err());
        }
    }
}
