use core::fmt;

/// A syntax error produced while scanning or parsing JWCC input.
///
/// The position is byte-based: `offset` counts from the start of the input,
/// `line` and `column` are 1-based and derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that does not fit the grammar at this position.
    UnexpectedToken {
        got: String,
        expected: &'static str,
    },
    /// A `/* ... */` comment with no closing `*/`.
    UnterminatedComment,
    /// A string literal with no closing quote.
    UnterminatedString,
    /// An escape sequence other than `\" \\ \/ \b \f \n \r \t \uXXXX`,
    /// or an ill-formed surrogate pair.
    InvalidEscape,
    /// Malformed UTF-8 inside a string or comment.
    InvalidUtf8,
    /// A number outside the RFC 8259 grammar.
    InvalidNumber,
    /// Non-whitespace content after the top-level value.
    TrailingData,
}

impl ParseError {
    pub(crate) fn new(input: &[u8], offset: usize, kind: ParseErrorKind) -> ParseError {
        let offset = offset.min(input.len());
        let mut line = 1;
        let mut last_nl = None;
        for (i, &b) in input[..offset].iter().enumerate() {
            if b == b'\n' {
                line += 1;
                last_nl = Some(i);
            }
        }
        let column = match last_nl {
            Some(i) => offset - i,
            None => offset + 1,
        };
        ParseError {
            offset,
            line,
            column,
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.kind)
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedToken { got, expected } => {
                write!(f, "parsing {expected}: unexpected {got}")
            }
            ParseErrorKind::UnterminatedComment => f.write_str("unterminated block comment"),
            ParseErrorKind::UnterminatedString => f.write_str("unterminated string literal"),
            ParseErrorKind::InvalidEscape => f.write_str("invalid escape sequence in string"),
            ParseErrorKind::InvalidUtf8 => f.write_str("invalid UTF-8"),
            ParseErrorKind::InvalidNumber => f.write_str("invalid number literal"),
            ParseErrorKind::TrailingData => f.write_str("unexpected data after top-level value"),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error produced while applying an RFC 6902 patch document.
///
/// `operation` is the zero-based index of the failing operation within the
/// patch array; it is absent for failures of the patch document as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchError {
    pub operation: Option<usize>,
    pub kind: PatchErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchErrorKind {
    /// The patch document itself failed to parse.
    Parse(ParseError),
    /// The patch document is not a JSON array.
    MustBeArray,
    /// An operation is not a JSON object.
    OpMustBeObject,
    /// A required member such as `op` or `path` is absent.
    MissingMember(String),
    /// A member that must be a JSON string is something else.
    MemberNotString(String),
    /// The same member name appears twice within one operation object.
    DuplicateMember(String),
    /// The operation name is not one of add/remove/replace/move/copy/test.
    UnknownOp(String),
    /// A JSON Pointer did not resolve to an existing value.
    ValueNotFound,
    /// `remove` targeted the root value.
    CannotRemoveRoot,
    /// `move` with `from` equal to or a prefix of `path`.
    CannotMoveInto(String, String),
    /// `test` found a value not semantically equal to the expected one.
    TestMismatch(String),
}

impl PatchError {
    pub(crate) fn op(operation: usize, kind: PatchErrorKind) -> PatchError {
        PatchError {
            operation: Some(operation),
            kind,
        }
    }

    pub(crate) fn whole(kind: PatchErrorKind) -> PatchError {
        PatchError {
            operation: None,
            kind,
        }
    }
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation {
            Some(i) => write!(f, "patch operation {i}: {}", self.kind),
            None => self.kind.fmt(f),
        }
    }
}

impl fmt::Display for PatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchErrorKind::Parse(err) => err.fmt(f),
            PatchErrorKind::MustBeArray => f.write_str("patch must be a JSON array"),
            PatchErrorKind::OpMustBeObject => f.write_str("must be a JSON object"),
            PatchErrorKind::MissingMember(name) => {
                write!(f, "missing required member {name:?}")
            }
            PatchErrorKind::MemberNotString(name) => {
                write!(f, "member {name:?} must be a JSON string")
            }
            PatchErrorKind::DuplicateMember(name) => write!(f, "duplicate name {name:?}"),
            PatchErrorKind::UnknownOp(name) => write!(f, "unknown operation {name:?}"),
            PatchErrorKind::ValueNotFound => f.write_str("value not found"),
            PatchErrorKind::CannotRemoveRoot => f.write_str("cannot remove root value"),
            PatchErrorKind::CannotMoveInto(from, path) => {
                write!(f, "cannot move {from:?} into {path:?}")
            }
            PatchErrorKind::TestMismatch(path) => write!(f, "values differ at {path:?}"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PatchErrorKind::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_position() {
        let input = b"{\n  \"a\": !\n}";
        let err = ParseError::new(
            input,
            9,
            ParseErrorKind::UnexpectedToken {
                got: "'!'".to_owned(),
                expected: "value",
            },
        );
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 8);
        assert_eq!(err.to_string(), "line 2, column 8: parsing value: unexpected '!'");
    }

    #[test]
    fn parse_error_first_line() {
        let err = ParseError::new(b"{}", 2, ParseErrorKind::TrailingData);
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn patch_error_display() {
        let err = PatchError::op(0, PatchErrorKind::TestMismatch("/baz".to_owned()));
        assert_eq!(err.to_string(), "patch operation 0: values differ at \"/baz\"");
        let err = PatchError::whole(PatchErrorKind::MustBeArray);
        assert_eq!(err.to_string(), "patch must be a JSON array");
    }
}
