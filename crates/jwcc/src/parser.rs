use crate::error::{ParseError, ParseErrorKind};
use crate::scanner::{Scanner, Token};
use crate::trivia::Extra;
use crate::value::{Array, Literal, Member, Object, Value, ValueKind};

/// Parses a single JWCC value from `input`.
///
/// The returned tree is lossless: [`Value::pack`] reproduces `input` exactly.
/// Content other than trivia after the top-level value is an error.
pub fn parse(input: &[u8]) -> Result<Value, ParseError> {
    let mut parser = Parser {
        scanner: Scanner::new(input),
        input,
        peeked: None,
    };
    let mut value = parser.parse_value()?;
    value.after_extra = parser.parse_extra()?;
    let (offset, token) = parser.next()?;
    if token != Token::Eof {
        return Err(ParseError::new(input, offset, ParseErrorKind::TrailingData));
    }
    Ok(value)
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    input: &'a [u8],
    peeked: Option<(usize, Token<'a>)>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<(usize, Token<'a>), ParseError> {
        match self.peeked.take() {
            Some(entry) => Ok(entry),
            None => self.scanner.next(),
        }
    }

    fn peek(&mut self) -> Result<(usize, Token<'a>), ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scanner.next()?);
        }
        Ok(self.peeked.expect("just filled"))
    }

    fn unexpected(&self, offset: usize, token: Token<'a>, expected: &'static str) -> ParseError {
        ParseError::new(
            self.input,
            offset,
            ParseErrorKind::UnexpectedToken {
                got: token.describe(),
                expected,
            },
        )
    }

    /// Consumes a maximal run of whitespace and comment tokens.
    fn parse_extra(&mut self) -> Result<Extra, ParseError> {
        let mut extra = Extra::new();
        loop {
            let (_, token) = self.peek()?;
            let bytes = match token {
                Token::Whitespace(b) | Token::LineComment(b) | Token::BlockComment(b) => b,
                _ => return Ok(extra),
            };
            extra.push_bytes(bytes);
            self.peeked = None;
        }
    }

    /// Parses `extra value`; the caller owns any trailing trivia.
    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let before_extra = self.parse_extra()?;
        self.parse_value_with_extra(before_extra)
    }

    /// Parses object members after the opening brace.
    fn parse_object(&mut self) -> Result<Object, ParseError> {
        let mut members: Vec<Member> = Vec::new();
        loop {
            // After `{` or a comma.
            let extra = self.parse_extra()?;
            let (offset, token) = self.peek()?;
            if token == Token::RBrace {
                self.peeked = None;
                return Ok(Object {
                    has_trailing_comma: !members.is_empty(),
                    members,
                    after_extra: extra,
                });
            }
            let name_src = match token {
                Token::Literal(src) if src.first() == Some(&b'"') => src,
                other => return Err(self.unexpected(offset, other, "object member name")),
            };
            self.peeked = None;
            let name = Value {
                before_extra: extra,
                value: ValueKind::Literal(Literal::from_bytes(name_src)),
                after_extra: self.parse_extra()?,
                start_offset: offset,
            };
            let (offset, token) = self.next()?;
            if token != Token::Colon {
                return Err(self.unexpected(offset, token, "object member"));
            }
            let mut value = self.parse_value()?;
            let extra = self.parse_extra()?;
            let (offset, token) = self.next()?;
            match token {
                Token::Comma => {
                    value.after_extra = extra;
                    members.push(Member { name, value });
                }
                Token::RBrace => {
                    members.push(Member { name, value });
                    return Ok(Object {
                        members,
                        after_extra: extra,
                        has_trailing_comma: false,
                    });
                }
                other => return Err(self.unexpected(offset, other, "object member list")),
            }
        }
    }

    /// Parses array elements after the opening bracket.
    fn parse_array(&mut self) -> Result<Array, ParseError> {
        let mut elements: Vec<Value> = Vec::new();
        loop {
            let extra = self.parse_extra()?;
            let (_, token) = self.peek()?;
            if token == Token::RBracket {
                self.peeked = None;
                return Ok(Array {
                    has_trailing_comma: !elements.is_empty(),
                    elements,
                    after_extra: extra,
                });
            }
            let mut element = self.parse_value_with_extra(extra)?;
            let extra = self.parse_extra()?;
            let (offset, token) = self.next()?;
            match token {
                Token::Comma => {
                    element.after_extra = extra;
                    elements.push(element);
                }
                Token::RBracket => {
                    elements.push(element);
                    return Ok(Array {
                        elements,
                        after_extra: extra,
                        has_trailing_comma: false,
                    });
                }
                other => return Err(self.unexpected(offset, other, "array element list")),
            }
        }
    }

    /// Like [`Parser::parse_value`] with the leading trivia already consumed.
    fn parse_value_with_extra(&mut self, before_extra: Extra) -> Result<Value, ParseError> {
        let (offset, token) = self.next()?;
        let value = match token {
            Token::Literal(src) => ValueKind::Literal(Literal::from_bytes(src)),
            Token::LBrace => ValueKind::Object(self.parse_object()?),
            Token::LBracket => ValueKind::Array(self.parse_array()?),
            other => return Err(self.unexpected(offset, other, "value")),
        };
        Ok(Value {
            before_extra,
            value,
            after_extra: Extra::new(),
            start_offset: offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("null"; "bare null")]
    #[test_case("7"; "bare number")]
    #[test_case("  \"str\"  "; "padded string")]
    #[test_case("// c\n7 /* t */"; "literal with comments")]
    #[test_case("{}"; "empty object")]
    #[test_case("{ /**/ }"; "empty object with comment")]
    #[test_case("{\"a\": 1}"; "simple object")]
    #[test_case("{\"a\": 1,}"; "object trailing comma")]
    #[test_case("{\"a\" /*x*/ : /*y*/ 1 /*z*/, \"b\": [true, null,], }"; "comments in every slot")]
    #[test_case("[ ]"; "empty array")]
    #[test_case("[1, 2, 3]"; "simple array")]
    #[test_case("[1, 2, 3,]"; "array trailing comma")]
    #[test_case("[0//\n,]"; "line comment before comma")]
    #[test_case("/**/ [ /**/ { /**/ \"k\" /**/ : /**/ \"v\" /**/ , /*x*/ } /**/ , /**/ 0 /**/ , /*x*/ ] /**/"; "fully annotated document")]
    #[test_case("{\"x\": {\"y\": [[], {}], }, }"; "nested composites")]
    fn round_trip(input: &str) {
        let v = parse(input.as_bytes()).expect("parse");
        assert_eq!(v.pack(), input.as_bytes(), "{input}");
    }

    #[test_case("{\"a\": 1,}", true; "object trailing comma")]
    #[test_case("{\"a\": 1}", false; "object plain")]
    #[test_case("[1,]", true; "array trailing comma")]
    #[test_case("[1]", false; "array plain")]
    #[test_case("{}", false; "empty object")]
    fn trailing_comma_flag(input: &str, want: bool) {
        let v = parse(input.as_bytes()).expect("parse");
        let got = match &v.value {
            ValueKind::Object(o) => o.has_trailing_comma,
            ValueKind::Array(a) => a.has_trailing_comma,
            ValueKind::Literal(_) => unreachable!(),
        };
        assert_eq!(got, want);
    }

    #[test_case("", 1, 1; "empty input")]
    #[test_case("{", 1, 2; "unclosed object")]
    #[test_case("[1 2]", 1, 4; "missing comma")]
    #[test_case("{\"a\" 1}", 1, 6; "missing colon")]
    #[test_case("7 7", 1, 3; "trailing value")]
    #[test_case("{,}", 1, 2; "leading comma")]
    #[test_case("[1,,]", 1, 4; "double comma")]
    #[test_case("{7: 1}", 1, 2; "non string name")]
    fn errors(input: &str, line: usize, column: usize) {
        let err = parse(input.as_bytes()).expect_err(input);
        assert_eq!((err.line, err.column), (line, column), "{input}: {err}");
    }

    #[test]
    fn trailing_data_kind() {
        let err = parse(b"{} x").expect_err("trailing");
        assert!(matches!(err.kind, ParseErrorKind::TrailingData));
    }

    #[test]
    fn member_extras_attach_exactly() {
        let v = parse(b"{ \"a\" /*n*/ : /*v*/ 1 /*c*/ , /*m*/ \"b\": 2 /*e*/ }").expect("parse");
        let ValueKind::Object(obj) = &v.value else {
            unreachable!()
        };
        assert_eq!(obj.members[0].name.before_extra.as_bytes(), b" ");
        assert_eq!(obj.members[0].name.after_extra.as_bytes(), b" /*n*/ ");
        assert_eq!(obj.members[0].value.before_extra.as_bytes(), b" /*v*/ ");
        assert_eq!(obj.members[0].value.after_extra.as_bytes(), b" /*c*/ ");
        assert_eq!(obj.members[1].name.before_extra.as_bytes(), b" /*m*/ ");
        assert_eq!(obj.members[1].value.after_extra.as_bytes(), b"");
        assert_eq!(obj.after_extra.as_bytes(), b" /*e*/ ");
        assert!(!obj.has_trailing_comma);
    }
}
