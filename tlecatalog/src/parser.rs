//! Line-level parsers for the two orbital element catalog layouts

use crate::{GROUP_RECORD_LINES, LINE1_TAG, LINE2_TAG};
use nom::{
    bytes::complete::take_till,
    character::complete::char,
    combinator::{map, opt, verify},
    error::ErrorKind,
    multi::{fold_many0, many0_count, many1},
    sequence::pair,
    Err::Error,
};

/// Leading character of a name line in the three-line element format
const NAME_TAG: char = '0';

pub type Result<I, O, E = ParseError<I>> = std::result::Result<(I, O), nom::Err<E>>;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError<I> {
    #[error("End of catalog input")]
    Eof,
    #[error("Parse error")]
    Nom(I, ErrorKind),
}

/// A trimmed catalog line, classified by its first character.
/// Lines tagged `0 ` are name lines, any other digit-led line is an element line.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CatalogLine<'a> {
    Blank,
    Name(&'a str),
    Element(&'a str),
}

impl<'a> CatalogLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        match line.chars().next() {
            None => CatalogLine::Blank,
            Some(NAME_TAG) if is_tagged(line, NAME_TAG) => CatalogLine::Name(line),
            Some(c) if c.is_ascii_digit() => CatalogLine::Element(line),
            Some(_) => CatalogLine::Name(line),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CatalogLine::Blank)
    }

    pub fn is_element(&self) -> bool {
        matches!(self, CatalogLine::Element(_))
    }
}

/// A record as assembled from catalog lines, before element line validation
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RawRecord<'a> {
    /// 1-based line number of the line that started the record
    pub line_no: usize,
    /// Empty when element lines appeared before any name line
    pub name: &'a str,
    pub line1: Option<&'a str>,
    pub line2: Option<&'a str>,
    /// Element lines seen beyond the second
    pub surplus: usize,
}

impl<'a> RawRecord<'a> {
    fn new(line_no: usize, name: &'a str) -> Self {
        Self {
            line_no,
            name,
            line1: None,
            line2: None,
            surplus: 0,
        }
    }

    fn push_element(&mut self, line: &'a str) {
        if self.line1.is_none() {
            self.line1 = Some(line);
        } else if self.line2.is_none() {
            self.line2 = Some(line);
        } else {
            self.surplus += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && self.line1.is_some() && self.line2.is_some() && self.surplus == 0
    }
}

/// Grouped triples: the role of a line is its position within a
/// blank-line separated group.
pub fn parse_grouped(text: &str) -> Result<&str, Vec<RawRecord<'_>>> {
    let (s, asm) = fold_many0(raw_line, Assembler::default, Assembler::push_grouped)(text)?;
    Ok((s, asm.finish()))
}

/// Tagged stream: a line not led by a decimal digit starts a new record,
/// digit-led lines fill the element slots of the current record.
pub fn parse_tagged(text: &str) -> Result<&str, Vec<RawRecord<'_>>> {
    let (s, asm) = fold_many0(catalog_line, Assembler::default, Assembler::push_tagged)(text)?;
    Ok((s, asm.finish()))
}

/// How many blank-line separated groups [`parse_sniffed`] read each way
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct GroupCounts {
    pub positional: usize,
    pub tagged: usize,
}

/// Layout decided per blank-line separated group: a group made of whole
/// name/line 1/line 2 triples is read positionally, any other group is read as
/// a tagged stream which may continue a tagged record across blank lines.
pub fn parse_sniffed(text: &str) -> Result<&str, (Vec<RawRecord<'_>>, GroupCounts)> {
    let (s, asm) = fold_many0(line_group, Assembler::default, Assembler::push_group)(text)?;
    let groups = asm.groups;
    Ok((s, (asm.finish(), groups)))
}

/// True when every triple of the group has a name line in the name slot
/// and element lines tagged `1` and `2` in the element slots
pub fn is_positional_group(lines: &[&str]) -> bool {
    lines.len() % GROUP_RECORD_LINES == 0
        && lines.chunks(GROUP_RECORD_LINES).all(|triple| match triple {
            [name, l1, l2] => {
                !is_tagged(name, LINE1_TAG)
                    && !is_tagged(name, LINE2_TAG)
                    && is_tagged(l1, LINE1_TAG)
                    && is_tagged(l2, LINE2_TAG)
            }
            _ => false,
        })
}

fn is_tagged(line: &str, tag: char) -> bool {
    line.strip_prefix(tag).map_or(false, |rest| rest.starts_with(' '))
}

#[derive(Debug, Default)]
struct Assembler<'a> {
    line_no: usize,
    group_index: usize,
    current: Option<RawRecord<'a>>,
    records: Vec<RawRecord<'a>>,
    groups: GroupCounts,
}

impl<'a> Assembler<'a> {
    fn push_grouped(mut self, line: &'a str) -> Self {
        self.line_no += 1;
        if line.is_empty() {
            self.finalize();
            self.group_index = 0;
        } else {
            if self.group_index % GROUP_RECORD_LINES == 0 {
                self.start(line);
            } else {
                self.push_element(line);
            }
            self.group_index += 1;
        }
        self
    }

    fn push_tagged(mut self, line: CatalogLine<'a>) -> Self {
        self.line_no += 1;
        match line {
            CatalogLine::Blank => (),
            CatalogLine::Name(name) => self.start(name),
            CatalogLine::Element(element) => self.push_element(element),
        }
        self
    }

    fn push_group(mut self, (blanks, lines): (usize, Vec<&'a str>)) -> Self {
        self.line_no += blanks;
        if is_positional_group(&lines) {
            self.finalize();
            self.group_index = 0;
            for line in lines {
                self = self.push_grouped(line);
            }
            self.finalize();
            self.groups.positional += 1;
        } else {
            for line in lines {
                self = self.push_tagged(CatalogLine::classify(line));
            }
            self.groups.tagged += 1;
        }
        self
    }

    fn start(&mut self, name: &'a str) {
        self.finalize();
        self.current = Some(RawRecord::new(self.line_no, name));
    }

    fn push_element(&mut self, line: &'a str) {
        let line_no = self.line_no;
        self.current
            .get_or_insert_with(|| RawRecord::new(line_no, ""))
            .push_element(line);
    }

    fn finalize(&mut self) {
        if let Some(r) = self.current.take() {
            self.records.push(r);
        }
    }

    fn finish(mut self) -> Vec<RawRecord<'a>> {
        self.finalize();
        self.records
    }
}

fn catalog_line(s: &str) -> Result<&str, CatalogLine> {
    map(raw_line, CatalogLine::classify)(s)
}

/// Leading blank line count and the non-blank lines of one group
fn line_group(s: &str) -> Result<&str, (usize, Vec<&str>)> {
    pair(
        many0_count(verify(raw_line, |l: &str| l.is_empty())),
        many1(verify(raw_line, |l: &str| !l.is_empty())),
    )(s)
}

/// One line, whitespace trimmed (including a trailing `\r`)
pub(crate) fn raw_line(s: &str) -> Result<&str, &str> {
    if s.is_empty() {
        return Err(Error(ParseError::Eof));
    }
    let (s, line) = take_till(|c| c == '\n')(s)?;
    let (s, _) = opt(char('\n'))(s)?;
    Ok((s, line.trim()))
}

impl<I> nom::error::ParseError<I> for ParseError<I> {
    fn from_error_kind(s: I, kind: ErrorKind) -> Self {
        ParseError::Nom(s, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}
