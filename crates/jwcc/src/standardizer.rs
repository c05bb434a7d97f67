use std::io::{self, Read};

/// Comment elision states. The scanner-equivalent classes are tracked
/// byte-by-byte so the transform never needs a full parse.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CommentState {
    Whitespace,
    LineComment,
    BlockComment,
    StringLiteral,
    NonStringLiteral,
}

/// Trailing-comma elision states. A trailing comma can only occur after a
/// completed value and before a closing delimiter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CommaState {
    BeforeValueEnd,
    AfterValueEnd,
    AfterPossibleTrailingComma,
}

/// An [`io::Read`] adapter that converts a JWCC byte stream into standard
/// JSON of exactly the same length: comment bytes become spaces (newlines
/// inside comments survive, so line numbers and byte offsets are
/// preserved), trailing commas become spaces, and everything else passes
/// through untouched.
///
/// The adapter does not validate the JSON grammar itself; invalid input is
/// passed along for a downstream parser to reject. Bytes between a possible
/// trailing comma and the next significant token are buffered, which is
/// unbounded for pathological inputs. An unterminated comment, or a comma
/// still pending at end of input, surfaces as
/// [`io::ErrorKind::UnexpectedEof`] after all convertible bytes have been
/// delivered.
#[derive(Debug)]
pub struct Standardizer<R> {
    rd: R,
    eof: bool,
    /// buffer[..json_offset] has been copied out; buffer[json_offset..
    /// comma_offset] is converted and ready; buffer[comma_offset..
    /// jwcc_offset] is converted except for a possibly-trailing comma at its
    /// head; buffer[jwcc_offset..] is an unconverted fragment (at most one
    /// truncated UTF-8 sequence or a lone `/` or `*`).
    buffer: Vec<u8>,
    json_offset: usize,
    comma_offset: usize,
    jwcc_offset: usize,
    comment: CommentState,
    comma: CommaState,
}

impl<R: Read> Standardizer<R> {
    pub fn new(rd: R) -> Standardizer<R> {
        Standardizer {
            rd,
            eof: false,
            buffer: Vec::new(),
            json_offset: 0,
            comma_offset: 0,
            jwcc_offset: 0,
            comment: CommentState::Whitespace,
            comma: CommaState::BeforeValueEnd,
        }
    }

    /// Discards all state and continues with `rd`, reusing the buffer.
    pub fn reset(&mut self, rd: R) {
        self.rd = rd;
        self.eof = false;
        self.buffer.clear();
        self.json_offset = 0;
        self.comma_offset = 0;
        self.jwcc_offset = 0;
        self.comment = CommentState::Whitespace;
        self.comma = CommaState::BeforeValueEnd;
    }

    pub fn get_ref(&self) -> &R {
        &self.rd
    }

    pub fn into_inner(self) -> R {
        self.rd
    }

    /// Whether more standard JSON could still be produced: converted-but-
    /// unreleased bytes exist, or the input stopped inside a comment.
    fn expecting_more(&self) -> bool {
        self.comma_offset < self.buffer.len()
            || matches!(
                self.comment,
                CommentState::LineComment | CommentState::BlockComment
            )
    }

    /// Reclaims fully-drained buffer space.
    fn compact(&mut self) {
        if self.json_offset == 0 {
            return;
        }
        if self.json_offset == self.buffer.len() {
            self.buffer.clear();
            self.json_offset = 0;
            self.comma_offset = 0;
            self.jwcc_offset = 0;
        } else {
            self.buffer.drain(..self.json_offset);
            self.comma_offset -= self.json_offset;
            self.jwcc_offset -= self.json_offset;
            self.json_offset = 0;
        }
    }

    /// Converts `buffer[jwcc_offset..]` in place. Idempotent; stops early on
    /// fragments whose meaning needs more input.
    fn standardize(&mut self) {
        let b = &mut self.buffer;
        let mut i = self.jwcc_offset;
        'scan: loop {
            match self.comment {
                CommentState::Whitespace => {
                    while i < b.len() {
                        match b[i] {
                            b' ' | b'\n' | b'\r' | b'\t' => i += 1,
                            b'/' => {
                                if i + 1 >= b.len() {
                                    break 'scan; // truncated: `/` or comment opener
                                }
                                match b[i + 1] {
                                    b'/' => {
                                        b[i] = b' ';
                                        b[i + 1] = b' ';
                                        self.comment = CommentState::LineComment;
                                        i += 2;
                                        continue 'scan;
                                    }
                                    b'*' => {
                                        b[i] = b' ';
                                        b[i + 1] = b' ';
                                        self.comment = CommentState::BlockComment;
                                        i += 2;
                                        continue 'scan;
                                    }
                                    _ => {
                                        // Invalid token; pass through for the
                                        // downstream parser to reject.
                                        self.comment = CommentState::NonStringLiteral;
                                        self.comma = CommaState::BeforeValueEnd;
                                        i += 1;
                                        continue 'scan;
                                    }
                                }
                            }
                            b'{' | b'[' | b':' => {
                                self.comma = CommaState::BeforeValueEnd;
                                i += 1;
                            }
                            b',' => {
                                if self.comma == CommaState::AfterValueEnd {
                                    self.comma = CommaState::AfterPossibleTrailingComma;
                                    self.comma_offset = i;
                                } else {
                                    self.comma = CommaState::BeforeValueEnd;
                                }
                                i += 1;
                            }
                            b'}' | b']' => {
                                if self.comma == CommaState::AfterPossibleTrailingComma {
                                    b[self.comma_offset] = b' ';
                                }
                                self.comma = CommaState::AfterValueEnd;
                                i += 1;
                            }
                            b'"' => {
                                self.comment = CommentState::StringLiteral;
                                self.comma = CommaState::BeforeValueEnd;
                                i += 1;
                                continue 'scan;
                            }
                            _ => {
                                self.comment = CommentState::NonStringLiteral;
                                self.comma = CommaState::BeforeValueEnd;
                                i += 1;
                                continue 'scan;
                            }
                        }
                    }
                    break 'scan;
                }
                CommentState::LineComment | CommentState::BlockComment => {
                    while i < b.len() {
                        if b[i] == b'\n' && self.comment == CommentState::LineComment {
                            i += 1;
                            self.comment = CommentState::Whitespace;
                            continue 'scan;
                        }
                        if b[i] == b'*' && self.comment == CommentState::BlockComment {
                            if i + 1 >= b.len() {
                                break 'scan; // `*` may begin the terminator
                            }
                            if b[i + 1] == b'/' {
                                b[i] = b' ';
                                b[i + 1] = b' ';
                                i += 2;
                                self.comment = CommentState::Whitespace;
                                continue 'scan;
                            }
                            b[i] = b' ';
                            i += 1;
                            continue;
                        }
                        if b[i] < 0x80 {
                            if !matches!(b[i], b' ' | b'\n' | b'\r' | b'\t') {
                                b[i] = b' ';
                            }
                            i += 1;
                        } else {
                            let width = utf8_width(b[i]);
                            if width == 0 {
                                // Invalid bytes pass through so a JSON parser
                                // can diagnose them.
                                i += 1;
                                continue;
                            }
                            if i + width > b.len() {
                                break 'scan; // truncated sequence
                            }
                            if std::str::from_utf8(&b[i..i + width]).is_ok() {
                                b[i..i + width].fill(b' ');
                                i += width;
                            } else {
                                i += 1;
                            }
                        }
                    }
                    if i >= b.len() {
                        break 'scan;
                    }
                }
                CommentState::StringLiteral => {
                    while i < b.len() {
                        match b[i] {
                            b'"' => {
                                self.comment = CommentState::Whitespace;
                                self.comma = CommaState::AfterValueEnd;
                                i += 1;
                                continue 'scan;
                            }
                            b'\\' => {
                                if i + 1 >= b.len() {
                                    break 'scan; // escaped byte truncated
                                }
                                i += 2;
                            }
                            _ => i += 1,
                        }
                    }
                    break 'scan;
                }
                CommentState::NonStringLiteral => {
                    // Everything that is not whitespace or structural counts
                    // as part of the literal, valid JSON or not.
                    while i < b.len() {
                        match b[i] {
                            b' ' | b'\n' | b'\r' | b'\t' | b'/' | b'{' | b'[' | b':' | b','
                            | b'}' | b']' | b'"' => {
                                self.comment = CommentState::Whitespace;
                                self.comma = CommaState::AfterValueEnd;
                                continue 'scan;
                            }
                            _ => i += 1,
                        }
                    }
                    break 'scan;
                }
            }
        }
        if self.comma != CommaState::AfterPossibleTrailingComma {
            self.comma_offset = i;
        }
        self.jwcc_offset = i;
    }
}

impl<R: Read> Read for Standardizer<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.json_offset < self.comma_offset {
                let available = &self.buffer[self.json_offset..self.comma_offset];
                let n = available.len().min(out.len());
                out[..n].copy_from_slice(&available[..n]);
                self.json_offset += n;
                self.compact();
                return Ok(n);
            }
            if self.eof {
                return if self.expecting_more() {
                    Err(io::ErrorKind::UnexpectedEof.into())
                } else {
                    Ok(0)
                };
            }
            let start = self.buffer.len();
            self.buffer.resize(start + out.len(), 0);
            let n = match self.rd.read(&mut self.buffer[start..]) {
                Ok(n) => n,
                Err(err) => {
                    self.buffer.truncate(start);
                    return Err(err);
                }
            };
            self.buffer.truncate(start + n);
            if n == 0 {
                self.eof = true;
            } else {
                self.standardize();
            }
        }
    }
}

#[inline]
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const JWCC_TESTDATA: &str = "/**/ [ /**/ { /**/ \"k\" /**/ : /**/ \"v\" /**/ , /*x*/ } /**/ , /**/ 0 /**/ , /*x*/ ] /**/";

    /// Reads everything, returning converted bytes alongside the terminal
    /// error, the way the streaming contract is specified.
    fn read_all<R: Read>(mut r: R) -> (Vec<u8>, Option<io::Error>) {
        let mut out = Vec::new();
        let mut chunk = [0u8; 7];
        loop {
            match r.read(&mut chunk) {
                Ok(0) => return (out, None),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(err) => return (out, Some(err)),
            }
        }
    }

    #[test_case("", "", false; "empty input")]
    #[test_case("/", "", true; "lone slash")]
    #[test_case("/ ", "/ ", false; "slash then space")]
    #[test_case("//", "  ", true; "unterminated line comment")]
    #[test_case("//\n", "  \n", false; "line comment")]
    #[test_case("//*\n", "   \n", false; "line comment with star")]
    #[test_case(" \n\r\t", " \n\r\t", false; "whitespace only")]
    #[test_case("/*", "  ", true; "unterminated block open")]
    #[test_case("/**", "  ", true; "unterminated block star")]
    #[test_case("/**/", "    ", false; "empty block comment")]
    #[test_case("/***/", "     ", false; "block comment one star")]
    #[test_case("/****/", "      ", false; "block comment two stars")]
    #[test_case("/**?", "    ", true; "block comment star then other")]
    #[test_case("/*\n*/", "  \n  ", false; "block comment keeps newline")]
    #[test_case("\"", "\"", false; "lone quote")]
    #[test_case("\"\"", "\"\"", false; "empty string")]
    #[test_case("\"\\\"\"", "\"\\\"\"", false; "escaped quote")]
    #[test_case("\"\\\"\"//\n", "\"\\\"\"  \n", false; "string then line comment")]
    #[test_case("\"\\\"/**/\"", "\"\\\"/**/\"", false; "comment inside string")]
    #[test_case(",", ",", false; "lone comma")]
    #[test_case(",]", ",]", false; "comma before close without value")]
    #[test_case("[,", "[,", false; "open then comma")]
    #[test_case("[,]", "[,]", false; "comma with no value kept")]
    #[test_case("[a,", "[a", true; "pending comma at eof")]
    #[test_case("[a,]", "[a ]", false; "trailing comma elided")]
    #[test_case("[{},", "[{}", true; "pending comma after object")]
    #[test_case("[{},]", "[{} ]", false; "trailing comma after object")]
    #[test_case("[[\"\",],{},]", "[[\"\" ],{} ]", false; "nested trailing commas")]
    #[test_case(
        "{\"hello\":\"goodbye\", /*\nfizz\n*/ // buzz\n }",
        "{\"hello\":\"goodbye\"    \n    \n          \n }",
        false;
        "comma pending across comments"
    )]
    fn table(input: &str, want: &str, want_eof_err: bool) {
        let (got, err) = read_all(Standardizer::new(input.as_bytes()));
        assert_eq!(got, want.as_bytes(), "{input:?}");
        assert_eq!(
            err.map(|e| e.kind()),
            want_eof_err.then_some(io::ErrorKind::UnexpectedEof),
            "{input:?}"
        );
    }

    #[test]
    fn invalid_utf8_passes_through() {
        let (got, err) = read_all(Standardizer::new(&b"//x\xff\xffx\n"[..]));
        assert_eq!(got, b"   \xff\xff \n");
        assert!(err.is_none());
    }

    #[test]
    fn truncated_utf8_in_comment() {
        let full = "//💩\n".as_bytes();
        for (cut, want, want_err) in [
            (3, &b"  "[..], true),
            (4, b"  ", true),
            (5, b"  ", true),
            (6, b"      ", true),
            (7, b"      \n", false),
        ] {
            let (got, err) = read_all(Standardizer::new(&full[..cut]));
            assert_eq!(got, want, "cut={cut}");
            assert_eq!(err.is_some(), want_err, "cut={cut}");
        }
    }

    #[test]
    fn whole_document() {
        let want = JWCC_TESTDATA
            .replace("/**/", "    ")
            .replace(", /*x*/", "       ");
        let (got, err) = read_all(Standardizer::new(JWCC_TESTDATA.as_bytes()));
        assert!(err.is_none());
        assert_eq!(String::from_utf8_lossy(&got), want);
    }

    /// The streaming transform agrees with the in-tree standardizer modulo
    /// whitespace: stripping all whitespace from both outputs yields the
    /// same byte sequence.
    #[test]
    fn agrees_with_tree_standardize_modulo_whitespace() {
        for input in [
            JWCC_TESTDATA,
            "// c\n{\"a\": 1, /*x*/\n\"b\": [true, null,],}",
            "[0//\n,]",
        ] {
            let (streamed, err) = read_all(Standardizer::new(input.as_bytes()));
            assert!(err.is_none(), "{input:?}");
            let mut tree = crate::parse(input.as_bytes()).expect("parse");
            tree.standardize();
            let dense = |bytes: &[u8]| {
                bytes
                    .iter()
                    .copied()
                    .filter(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
                    .collect::<Vec<u8>>()
            };
            assert_eq!(dense(&streamed), dense(&tree.pack()), "{input:?}");
        }
    }

    #[test]
    fn one_byte_reads() {
        let mut out = Vec::new();
        let mut r = Standardizer::new(JWCC_TESTDATA.as_bytes());
        let mut byte = [0u8; 1];
        loop {
            match r.read(&mut byte) {
                Ok(0) => break,
                Ok(1) => out.push(byte[0]),
                other => panic!("unexpected read result: {other:?}"),
            }
        }
        let want = JWCC_TESTDATA
            .replace("/**/", "    ")
            .replace(", /*x*/", "       ");
        assert_eq!(String::from_utf8_lossy(&out), want);
    }

    #[test]
    fn reset_reuses_the_buffer() {
        let mut r = Standardizer::new(&b"[1,]"[..]);
        let (got, err) = read_all(&mut r);
        assert_eq!(got, b"[1 ]");
        assert!(err.is_none());
        r.reset(&b"7 //x"[..]);
        let (got, err) = read_all(&mut r);
        assert_eq!(got, b"7    ");
        assert!(err.is_some());
    }
}
