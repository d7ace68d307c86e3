//! MODFLOW 6 keyword files.
//!
//! Every MODFLOW 6 input file is a sequence of blocks:
//!
//! ```text
//! BEGIN OPTIONS
//!   LENGTH_UNITS meters
//! END OPTIONS
//!
//! BEGIN PERIOD 1
//!   ...
//! END PERIOD
//! ```
//!
//! Block names and keywords are case-insensitive. `#`, `!` and `//` start
//! comments. Records are kept as token lists; typed packages interpret
//! them.

use crate::error::{Error, Result};
use modflow_core::{parse_field, split_free};
use modflow_core::tokens::FromField;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::path::Path;

/// Tokens of one line, with comments removed.
pub fn record_tokens(line: &str) -> Vec<String> {
    split_free(strip_slash_comment(line))
}

/// Cut the line where an unquoted token starts with `//`.
fn strip_slash_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut token_start = true;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if token_start && line[i..].starts_with("//") => return &line[..i],
            None => {}
        }
        token_start = quote.is_none() && (ch.is_whitespace() || ch == ',');
    }
    line
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Upper-case block name.
    pub name: String,
    /// Tokens after the name on the BEGIN line, e.g. a period number.
    pub suffix: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl Block {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            suffix: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Display) -> Self {
        self.suffix.push(suffix.to_string());
        self
    }

    pub fn push_record<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.records.push(tokens.into_iter().map(Into::into).collect());
    }

    pub fn push_keyword(&mut self, keyword: &str) {
        self.push_record([keyword]);
    }

    pub fn push_value(&mut self, keyword: &str, value: impl Display) {
        self.push_record([keyword.to_string(), value.to_string()]);
    }

    /// First record whose leading token is `keyword`.
    pub fn find(&self, keyword: &str) -> Option<&[String]> {
        self.records
            .iter()
            .find(|r| r.first().is_some_and(|t| t.eq_ignore_ascii_case(keyword)))
            .map(Vec::as_slice)
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.find(keyword).is_some()
    }

    /// Token following `keyword` on its record.
    pub fn value(&self, keyword: &str) -> Option<&str> {
        self.find(keyword)
            .and_then(|r| r.get(1))
            .map(String::as_str)
    }

    pub fn parse_value<T: FromField>(&self, keyword: &str) -> Result<Option<T>> {
        match self.value(keyword) {
            Some(token) => Ok(Some(parse_field(token, keyword)?)),
            None => Ok(None),
        }
    }

    pub fn require<T: FromField>(&self, keyword: &str) -> Result<T> {
        self.parse_value(keyword)?
            .ok_or_else(|| Error::missing_keyword(&self.name, keyword))
    }

    /// Numeric suffix of the BEGIN line, e.g. the period of `BEGIN PERIOD 3`.
    pub fn number(&self) -> Option<usize> {
        self.suffix.first().and_then(|s| s.parse().ok())
    }

    fn write_into(&self, out: &mut String) {
        out.push_str("BEGIN ");
        out.push_str(&self.name.to_ascii_lowercase());
        for token in &self.suffix {
            out.push(' ');
            out.push_str(token);
        }
        out.push('\n');
        for record in &self.records {
            out.push_str(" ");
            for token in record {
                out.push(' ');
                out.push_str(&quote(token));
            }
            out.push('\n');
        }
        out.push_str("END ");
        out.push_str(&self.name.to_ascii_lowercase());
        out.push_str("\n\n");
    }
}

/// Quote a token that would otherwise split or read as a comment.
fn quote(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token.starts_with("//")
        || token.contains(|c: char| c.is_whitespace() || matches!(c, '#' | '!' | ',' | '\''));
    if !needs_quotes {
        token.to_string()
    } else if token.contains('\'') {
        format!("\"{}\"", token)
    } else {
        format!("'{}'", token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockFile {
    /// Comment lines outside any block, without the comment marker.
    pub header: Vec<String>,
    blocks: Vec<Block>,
}

impl BlockFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut file = BlockFile::new();
        let mut open: Option<(Block, usize)> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let tokens = record_tokens(line);
            if tokens.is_empty() {
                if open.is_none() {
                    if let Some(comment) = line.trim().strip_prefix('#') {
                        file.header.push(comment.trim().to_string());
                    }
                }
                continue;
            }

            match tokens[0].to_ascii_uppercase().as_str() {
                "BEGIN" => {
                    if let Some((block, start)) = &open {
                        return Err(Error::syntax(
                            line_no,
                            format!("BEGIN inside block {} opened on line {}", block.name, start),
                        ));
                    }
                    let name = tokens
                        .get(1)
                        .ok_or_else(|| Error::syntax(line_no, "BEGIN without a block name"))?;
                    let mut block = Block::new(name);
                    block.suffix = tokens.iter().skip(2).cloned().collect();
                    open = Some((block, line_no));
                }
                "END" => {
                    let (block, _) = open
                        .take()
                        .ok_or_else(|| Error::syntax(line_no, "END without BEGIN"))?;
                    if let Some(name) = tokens.get(1) {
                        if !name.eq_ignore_ascii_case(&block.name) {
                            return Err(Error::syntax(
                                line_no,
                                format!("END {} closes block {}", name, block.name),
                            ));
                        }
                    }
                    file.blocks.push(block);
                }
                _ => match open.as_mut() {
                    Some((block, _)) => block.records.push(tokens),
                    None => {
                        return Err(Error::syntax(
                            line_no,
                            format!("record outside a block: {}", line.trim()),
                        ));
                    }
                },
            }
        }

        if let Some((block, start)) = open {
            return Err(Error::syntax(
                start,
                format!("block {} has no END", block.name),
            ));
        }
        Ok(file)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| Self::parse(&text))
            .map_err(|source| Error::Load {
                path: path.to_path_buf(),
                source: Box::new(source),
            })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn require_block(&self, name: &str) -> Result<&Block> {
        self.block(name)
            .ok_or_else(|| Error::MissingBlock(name.to_ascii_uppercase()))
    }

    /// Every block called `name`, in file order.
    pub fn blocks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks
            .iter()
            .filter(move |b| b.name.eq_ignore_ascii_case(name))
    }

    /// Record of `name` in the OPTIONS block.
    pub fn option(&self, name: &str) -> Option<&[String]> {
        self.block("OPTIONS").and_then(|b| b.find(name))
    }

    /// Files named after `OPEN/CLOSE` or `FILEIN` anywhere in the file.
    pub fn external_files(&self) -> Vec<String> {
        let mut fnames: Vec<String> = Vec::new();
        for record in self.blocks.iter().flat_map(|b| &b.records) {
            for pair in record.windows(2) {
                let keyword = &pair[0];
                if keyword.eq_ignore_ascii_case("OPEN/CLOSE") || keyword.eq_ignore_ascii_case("FILEIN") {
                    if !fnames.contains(&pair[1]) {
                        fnames.push(pair[1].clone());
                    }
                }
            }
        }
        fnames
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for comment in &self.header {
            out.push_str("# ");
            out.push_str(comment);
            out.push('\n');
        }
        if !self.header.is_empty() {
            out.push('\n');
        }
        for block in &self.blocks {
            block.write_into(&mut out);
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TDIS: &str = "\
# TDIS file
BEGIN options
  TIME_UNITS days  // trailing comment
END options

BEGIN dimensions
  NPER 2
END dimensions

BEGIN perioddata
  1.0 1 1.0
  10.0 5 1.2 ! another comment
END perioddata
";

    #[test]
    fn parses_blocks_and_records() {
        let file = BlockFile::parse(TDIS).unwrap();
        assert_eq!(file.header, vec!["TDIS file".to_string()]);
        assert_eq!(file.blocks().len(), 3);
        assert_eq!(file.option("time_units").unwrap(), ["TIME_UNITS", "days"]);
        let nper: usize = file.block("DIMENSIONS").unwrap().require("NPER").unwrap();
        assert_eq!(nper, 2);
        assert_eq!(file.block("PERIODDATA").unwrap().records[1], ["10.0", "5", "1.2"]);
    }

    #[test]
    fn repeated_blocks_keep_suffix() {
        let text = "BEGIN PERIOD 1\n 1 1 1 -5.0\nEND PERIOD\nBEGIN PERIOD 3\nEND PERIOD\n";
        let file = BlockFile::parse(text).unwrap();
        let numbers: Vec<Option<usize>> = file.blocks_named("period").map(Block::number).collect();
        assert_eq!(numbers, vec![Some(1), Some(3)]);
    }

    #[test]
    fn nested_begin_is_error() {
        let err = BlockFile::parse("BEGIN OPTIONS\nBEGIN GRIDDATA\nEND GRIDDATA\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }));
    }

    #[test]
    fn end_without_begin_is_error() {
        let err = BlockFile::parse("END OPTIONS\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }));
    }

    #[test]
    fn mismatched_end_is_error() {
        let err = BlockFile::parse("BEGIN OPTIONS\nEND DIMENSIONS\n").unwrap_err();
        assert!(err.to_string().contains("END DIMENSIONS closes block OPTIONS"));
    }

    #[test]
    fn missing_end_is_error() {
        let err = BlockFile::parse("\nBEGIN OPTIONS\n  NOGRB\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }));
    }

    #[test]
    fn written_text_parses_back() {
        let file = BlockFile::parse(TDIS).unwrap();
        let again = BlockFile::parse(&file.to_text()).unwrap();
        assert_eq!(again, file);
    }

    #[test]
    fn tokens_with_spaces_are_quoted() {
        let mut block = Block::new("packages");
        block.push_record(["DIS6", "my model.dis", "dis"]);
        let mut file = BlockFile::new();
        file.push(block);
        let text = file.to_text();
        assert!(text.contains("'my model.dis'"));
        assert_eq!(BlockFile::parse(&text).unwrap(), file);
    }

    #[test]
    fn comment_markers_inside_tokens_are_quoted() {
        let mut block = Block::new("options");
        block.push_record(["BOUNDNAMES", "a#b", "c!d", "//e", "f,g", "it's"]);
        let mut file = BlockFile::new();
        file.push(block);
        let text = file.to_text();
        assert!(text.contains("'a#b'"));
        assert!(text.contains("\"it's\""));
        assert_eq!(BlockFile::parse(&text).unwrap(), file);
    }

    #[test]
    fn slash_comment_only_outside_quotes() {
        assert_eq!(record_tokens("k 'x//y' // note"), ["k", "x//y"]);
        assert_eq!(record_tokens("path/to//file 1"), ["path/to//file", "1"]);
        assert_eq!(record_tokens("// whole line"), Vec::<String>::new());
    }

    #[test]
    fn lists_open_close_and_filein_files() {
        let text = "\
BEGIN options
  TS6 FILEIN wells.ts
  OBS6 FILEIN wells.obs
END options
BEGIN griddata
  k
    OPEN/CLOSE k.txt FACTOR 1.0
  k33
    open/close k.txt
END griddata
";
        let file = BlockFile::parse(text).unwrap();
        assert_eq!(file.external_files(), ["wells.ts", "wells.obs", "k.txt"]);
    }

    #[test]
    fn missing_keyword_is_error() {
        let file = BlockFile::parse("BEGIN DIMENSIONS\nEND DIMENSIONS\n").unwrap();
        let err = file.block("DIMENSIONS").unwrap().require::<usize>("NPER").unwrap_err();
        assert!(matches!(err, Error::MissingKeyword { .. }));
    }
}
