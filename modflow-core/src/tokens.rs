//! Free-format and fixed-format record parsing.
//!
//! MODFLOW input records are either free format (whitespace or comma
//! separated, with `#` comments) or fixed width (Fortran `I10`, `F10.0`
//! edit descriptors). [`LineReader`] wraps a buffered reader and keeps
//! track of line numbers so parse errors point at the offending record.

use crate::errors::{CoreError, Result};
use std::io::BufRead;

/// Split a free-format record into tokens.
///
/// Separators are whitespace and commas. An unquoted `#` or `!` starts a
/// comment. Single- or double-quoted tokens keep embedded spaces and lose
/// their quotes.
pub fn split_free(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                tokens.push(std::mem::take(&mut current));
            }
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    quote = Some(ch);
                }
                '#' | '!' => break,
                c if c.is_whitespace() || c == ',' => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Slice a fixed-width record. Fields past the end of a short line are empty.
pub fn fixed_fields<'a>(line: &'a str, widths: &[usize]) -> Vec<&'a str> {
    let mut fields = Vec::with_capacity(widths.len());
    let mut start = 0;
    for &width in widths {
        let end = (start + width).min(line.len());
        let field = if start < line.len() {
            line.get(start..end).unwrap_or("")
        } else {
            ""
        };
        fields.push(field.trim());
        start += width;
    }
    fields
}

/// A value that can be read from a single record token.
pub trait FromField: Sized {
    fn from_field(token: &str) -> Option<Self>;
}

macro_rules! impl_from_field_int {
    ($($t:ty),*) => {
        $(impl FromField for $t {
            fn from_field(token: &str) -> Option<Self> {
                token.trim().trim_start_matches('+').parse().ok()
            }
        })*
    };
}

impl_from_field_int!(i32, i64, u32, usize);

macro_rules! impl_from_field_real {
    ($($t:ty),*) => {
        $(impl FromField for $t {
            fn from_field(token: &str) -> Option<Self> {
                let normalized = token.trim().replace(['d', 'D'], "E");
                normalized.parse().ok()
            }
        })*
    };
}

impl_from_field_real!(f32, f64);

impl FromField for String {
    fn from_field(token: &str) -> Option<Self> {
        Some(token.to_string())
    }
}

/// Parse one token, naming the field in the error.
pub fn parse_field<T: FromField>(token: &str, field: &str) -> Result<T> {
    T::from_field(token).ok_or_else(|| CoreError::invalid_field(field, token))
}

/// Parse the token at `index`, or fall back to `default` when the record
/// is too short.
pub fn parse_optional<T: FromField>(tokens: &[String], index: usize, field: &str, default: T) -> Result<T> {
    match tokens.get(index) {
        Some(token) => parse_field(token, field),
        None => Ok(default),
    }
}

/// Expand `r*value` repeat counts into `r` copies of `value`.
pub fn expand_repeats(token: &str) -> Result<Vec<String>> {
    match token.split_once('*') {
        Some((count, value)) => {
            let count: usize = parse_field(count, "repeat count")?;
            Ok(vec![value.to_string(); count])
        }
        None => Ok(vec![token.to_string()]),
    }
}

/// Line-oriented reader over a MODFLOW input file.
pub struct LineReader<R> {
    inner: R,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_number: 0,
        }
    }

    /// 1-based number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let read = self.inner.read_line(&mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let trimmed_len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed_len);
        Ok(Some(buf))
    }

    /// Next line that is neither blank nor a `#` comment.
    pub fn next_data_line(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_line()? {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Ok(Some(line));
        }
        Ok(None)
    }

    /// Like [`LineReader::next_data_line`] but end of input is an error.
    pub fn expect_data_line(&mut self, what: &str) -> Result<String> {
        self.next_data_line()?
            .ok_or_else(|| CoreError::UnexpectedEof(what.to_string()))
    }

    /// Tokens of the next data line.
    pub fn expect_record(&mut self, what: &str) -> Result<Vec<String>> {
        let line = self.expect_data_line(what)?;
        Ok(split_free(&line))
    }

    /// Read `n` tokens spanning as many lines as needed. Tokens left over
    /// on the final line are discarded. Repeat counts are expanded.
    pub fn read_tokens(&mut self, n: usize, what: &str) -> Result<Vec<String>> {
        let mut tokens = Vec::with_capacity(n);
        while tokens.len() < n {
            let line = self.expect_data_line(what)?;
            for token in split_free(&line) {
                for expanded in expand_repeats(&token)? {
                    if tokens.len() < n {
                        tokens.push(expanded);
                    }
                }
            }
        }
        Ok(tokens)
    }

    /// Read `n` values of one type (the `read1d` operation).
    pub fn read_values<T: FromField>(&mut self, n: usize, what: &str) -> Result<Vec<T>> {
        let line_number = self.line_number + 1;
        self.read_tokens(n, what)?
            .iter()
            .map(|token| {
                T::from_field(token).ok_or_else(|| {
                    CoreError::parse(line_number, format!("{}: invalid value {:?}", what, token))
                })
            })
            .collect()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Require at least `n` tokens in a record.
pub fn require_fields(tokens: &[String], n: usize, what: &str, line: usize) -> Result<()> {
    if tokens.len() < n {
        return Err(CoreError::parse(
            line,
            format!("{} needs {} fields, got {}", what, n, tokens.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn split_free_whitespace_and_commas() {
        assert_eq!(split_free("1  2,3\t4"), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn split_free_strips_comments() {
        assert_eq!(
            split_free("A19E1_1 -2 140 # A19E1 8/13/1975"),
            vec!["A19E1_1", "-2", "140"]
        );
        assert!(split_free("# only a comment").is_empty());
    }

    #[test]
    fn split_free_keeps_quoted_names() {
        assert_eq!(
            split_free("OPEN/CLOSE 'my file.ref' 1.0"),
            vec!["OPEN/CLOSE", "my file.ref", "1.0"]
        );
    }

    #[test]
    fn fixed_fields_short_line() {
        let fields = fixed_fields("         0       1.5", &[10, 10, 20, 10]);
        assert_eq!(fields, vec!["0", "1.5", "", ""]);
    }

    #[test]
    fn parse_fortran_double_exponent() {
        let value: f64 = parse_field("1.5D-3", "hclose").unwrap();
        assert!((value - 1.5e-3).abs() < 1e-15);
    }

    #[test]
    fn parse_field_error_names_field() {
        let err = parse_field::<i32>("x", "NROW").unwrap_err();
        assert!(err.to_string().contains("NROW"));
    }

    #[test]
    fn expand_repeat_counts() {
        assert_eq!(expand_repeats("3*0.5").unwrap(), vec!["0.5", "0.5", "0.5"]);
        assert_eq!(expand_repeats("7").unwrap(), vec!["7"]);
    }

    #[test]
    fn data_lines_skip_comments_and_blanks() {
        let mut reader = LineReader::new(Cursor::new("# heading\n\n  1 2 3\n"));
        let line = reader.next_data_line().unwrap().unwrap();
        assert_eq!(line, "  1 2 3");
        assert_eq!(reader.line_number(), 3);
        assert!(reader.next_data_line().unwrap().is_none());
    }

    #[test]
    fn read_values_spans_lines() {
        let mut reader = LineReader::new(Cursor::new("1 2\n3 2*4 9\n"));
        let values: Vec<i32> = reader.read_values(5, "lnwt").unwrap();
        assert_eq!(values, vec![1, 2, 3, 4, 4]);
    }

    #[test]
    fn read_values_eof_is_error() {
        let mut reader = LineReader::new(Cursor::new("1 2\n"));
        let err = reader.read_values::<i32>(3, "ids16").unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedEof(_)));
    }

    #[test]
    fn optional_field_defaults() {
        let tokens = split_free("2 4 7");
        let hobdry: f64 = parse_optional(&tokens, 4, "HOBDRY", -9999.0).unwrap();
        assert_eq!(hobdry, -9999.0);
    }
}
