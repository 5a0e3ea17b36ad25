//! Orbital element catalog: layout selection, record admission and discard reporting

use crate::{
    element::{validate_element_lines, ElementLineError},
    parser::{parse_grouped, parse_sniffed, parse_tagged, GroupCounts, RawRecord},
};
use std::{fmt, str::FromStr};
use tletypes::prelude::OrbitalRecord;
use tracing::{info, warn};

/// The layout a catalog was read with
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Layout {
    /// Name line and two element lines per record, records grouped by blank lines
    Grouped,
    /// Records delimited by name lines, element lines recognized by a leading digit
    Tagged,
    /// Grouped triples, with the irregular groups read as a tagged stream
    Mixed,
}

impl Layout {
    fn from_groups(groups: GroupCounts) -> Self {
        match groups {
            GroupCounts { tagged: 0, .. } => Layout::Grouped,
            GroupCounts { positional: 0, .. } => Layout::Tagged,
            _ => Layout::Mixed,
        }
    }
}

/// Requested catalog layout
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum LayoutHint {
    /// Sniff the layout of each blank-line separated group
    #[default]
    Auto,
    Grouped,
    Tagged,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct ParseOptions {
    pub layout: LayoutHint,
    /// Verify element line checksums
    pub strict: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum DiscardReason {
    #[error("Missing element line {0}")]
    MissingElementLine(u8),
    #[error("Element lines without a name line")]
    MissingName,
    #[error("{0} surplus element line(s)")]
    SurplusElementLines(usize),
    #[error(transparent)]
    Malformed(#[from] ElementLineError),
}

/// A catalog entry that did not make it into the record set
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Discarded {
    /// 1-based line number where the entry started
    pub line_no: usize,
    pub name: String,
    pub reason: DiscardReason,
}

impl fmt::Display for Discarded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: '{}': {}", self.line_no, self.name, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub layout: Layout,
    /// Admitted records, in catalog order
    pub records: Vec<OrbitalRecord>,
    pub discarded: Vec<Discarded>,
}

/// Parse with the default options: sniffed layout, no checksum verification
pub fn parse_catalog(text: &str) -> Catalog {
    Catalog::parse(text, ParseOptions::default())
}

impl Catalog {
    /// Never fails on content; incomplete or malformed entries are dropped
    /// and listed in [`Catalog::discarded`].
    pub fn parse(text: &str, opts: ParseOptions) -> Self {
        let parsed = match opts.layout {
            LayoutHint::Auto => parse_sniffed(text)
                .map(|(_, (raw, groups))| (Layout::from_groups(groups), raw)),
            LayoutHint::Grouped => parse_grouped(text).map(|(_, raw)| (Layout::Grouped, raw)),
            LayoutHint::Tagged => parse_tagged(text).map(|(_, raw)| (Layout::Tagged, raw)),
        };
        let (layout, raw_records) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Catalog parser stopped early");
                (Layout::Grouped, Vec::new())
            }
        };

        let mut records = Vec::with_capacity(raw_records.len());
        let mut discarded = Vec::new();
        for raw in raw_records.into_iter() {
            let line_no = raw.line_no;
            let name = raw.name;
            match admit(raw, opts.strict) {
                Ok(r) => records.push(r),
                Err(reason) => {
                    warn!(
                        line = line_no,
                        name = name,
                        reason = %reason,
                        "Discarding catalog entry"
                    );
                    discarded.push(Discarded {
                        line_no,
                        name: name.to_owned(),
                        reason,
                    });
                }
            }
        }

        info!(
            layout = ?layout,
            records = records.len(),
            discarded = discarded.len(),
            "Parsed orbital element catalog"
        );

        Catalog {
            layout,
            records,
            discarded,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&OrbitalRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

fn admit(raw: RawRecord, strict: bool) -> Result<OrbitalRecord, DiscardReason> {
    if raw.name.is_empty() {
        return Err(DiscardReason::MissingName);
    }
    if raw.surplus != 0 {
        return Err(DiscardReason::SurplusElementLines(raw.surplus));
    }
    let line1 = raw.line1.ok_or(DiscardReason::MissingElementLine(1))?;
    let line2 = raw.line2.ok_or(DiscardReason::MissingElementLine(2))?;
    validate_element_lines(line1, line2, strict)?;
    Ok(OrbitalRecord::new(raw.name, line1, line2))
}

impl FromStr for LayoutHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LayoutHint::Auto),
            "grouped" => Ok(LayoutHint::Grouped),
            "tagged" => Ok(LayoutHint::Tagged),
            _ => Err(format!(
                "Unknown catalog layout '{s}', expected one of 'auto', 'grouped' or 'tagged'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const GROUPED: &str = indoc! {r#"
        ISS (ZARYA)
        1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
        2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537

        GEO1
        1 37481U 11019A   23190.45078927 -.00000009  00000-0  00000+0 0  9991
        2 37481   2.3847  40.6385 0001640  70.7486  43.7146  1.00272292 44578
        GEO2
        1 39120U 13011A   23190.50177227 -.00000262  00000-0  00000+0 0  9997
        2 39120   2.3950  38.7964 0001772  68.0002 323.0070  1.00271163 37822
        "#};

    const TAGGED: &str = indoc! {r#"
        ISS (ZARYA)
          1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
          2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
        GEO1
        1 37481U 11019A   23190.45078927 -.00000009  00000-0  00000+0 0  9991

        2 37481   2.3847  40.6385 0001640  70.7486  43.7146  1.00272292 44578
        GEO2
        1 39120U 13011A   23190.50177227 -.00000262  00000-0  00000+0 0  9997
        2 39120   2.3950  38.7964 0001772  68.0002 323.0070  1.00271163 37822
        "#};

    #[test]
    fn layouts_are_equivalent() {
        let grouped = parse_catalog(GROUPED);
        let tagged = parse_catalog(TAGGED);
        assert_eq!(grouped.layout, Layout::Grouped);
        assert_eq!(tagged.layout, Layout::Tagged);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped.records, tagged.records);
        assert!(grouped.discarded.is_empty());
        assert!(tagged.discarded.is_empty());

        let names: Vec<&str> = grouped.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["ISS (ZARYA)", "GEO1", "GEO2"]);
    }

    #[test]
    fn forced_layouts_agree_on_well_formed_input() {
        for hint in [LayoutHint::Grouped, LayoutHint::Tagged] {
            let c = Catalog::parse(
                GROUPED,
                ParseOptions {
                    layout: hint,
                    strict: true,
                },
            );
            assert_eq!(c.len(), 3, "{hint:?}");
            assert!(c.discarded.is_empty());
        }
    }

    #[test]
    fn single_record() {
        let text = indoc! {r#"
            ISS (ZARYA)
            1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
            2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537

            "#};
        let c = parse_catalog(text);
        assert_eq!(c.len(), 1);
        assert_eq!(c.records[0].name, "ISS (ZARYA)");
        assert_eq!(c.records[0].catalog_number(), Some(25544));
        assert!(c.find("ISS (ZARYA)").is_some());
    }

    #[test]
    fn incomplete_trailing_group_is_dropped() {
        let text = format!(
            "{GROUPED}\nDANGLING\n1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753\n"
        );
        let c = parse_catalog(&text);
        assert_eq!(c.layout, Layout::Mixed);
        assert_eq!(c.len(), 3);
        assert!(c.find("DANGLING").is_none());
        assert_eq!(c.discarded.len(), 1);
        assert_eq!(c.discarded[0].name, "DANGLING");
        assert_eq!(c.discarded[0].reason, DiscardReason::MissingElementLine(2));
    }

    #[test]
    fn incomplete_trailing_group_without_newline() {
        let text = "ISS (ZARYA)\n1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
        let c = parse_catalog(text);
        assert!(c.is_empty());
        assert_eq!(c.discarded.len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let text = GROUPED.replace('\n', "\r\n");
        let c = parse_catalog(&text);
        assert_eq!(c.layout, Layout::Grouped);
        assert_eq!(c.records, parse_catalog(GROUPED).records);
    }

    #[test]
    fn zero_tagged_names_in_both_layouts() {
        let grouped = parse_catalog(&GROUPED.replace("GEO1", "0 GEO1"));
        assert_eq!(grouped.layout, Layout::Grouped);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped.records[1].name, "0 GEO1");

        let tagged = parse_catalog(&TAGGED.replace("GEO1", "0 GEO1"));
        assert_eq!(tagged.layout, Layout::Tagged);
        assert_eq!(tagged.records, grouped.records);
    }

    #[test]
    fn dangling_group_keeps_zero_named_records() {
        let clean = indoc! {r#"
            0 ISS (ZARYA)
            1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
            2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
            0 GEO1
            1 37481U 11019A   23190.45078927 -.00000009  00000-0  00000+0 0  9991
            2 37481   2.3847  40.6385 0001640  70.7486  43.7146  1.00272292 44578
            "#};
        let dangling = format!(
            "{clean}\n0 DANGLING\n1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753\n"
        );

        let c = parse_catalog(clean);
        let d = parse_catalog(&dangling);
        assert_eq!(c.layout, Layout::Grouped);
        assert_eq!(d.layout, Layout::Mixed);
        assert_eq!(c.len(), 2);
        assert_eq!(d.records, c.records);
        assert_eq!(d.discarded.len(), 1);
        assert_eq!(d.discarded[0].name, "0 DANGLING");
        assert_eq!(d.discarded[0].line_no, 8);
        assert_eq!(d.discarded[0].reason, DiscardReason::MissingElementLine(2));
    }

    #[test]
    fn irregular_group_does_not_affect_the_others() {
        let text = format!("{GROUPED}\nSTRAY\n\n{GROUPED}");
        let c = parse_catalog(&text);
        assert_eq!(c.layout, Layout::Mixed);
        assert_eq!(c.len(), 6);
        assert_eq!(c.discarded.len(), 1);
        assert_eq!(c.discarded[0].name, "STRAY");
        assert_eq!(c.discarded[0].reason, DiscardReason::MissingElementLine(1));
    }

    #[test]
    fn malformed_records_are_reported() {
        let text = GROUPED.replace("2 37481 ", "2 37482 ");
        let c = parse_catalog(&text);
        assert_eq!(c.len(), 2);
        assert_eq!(c.discarded.len(), 1);
        assert_eq!(c.discarded[0].name, "GEO1");
        assert_eq!(c.discarded[0].line_no, 5);
        assert_eq!(
            c.discarded[0].reason,
            DiscardReason::Malformed(ElementLineError::CatalogNumberMismatch)
        );
    }

    #[test]
    fn strict_mode_rejects_bad_checksums() {
        let text = GROUPED.replace("0  9991", "0  9990");
        assert_eq!(parse_catalog(&text).len(), 3);

        let strict = Catalog::parse(
            &text,
            ParseOptions {
                strict: true,
                ..Default::default()
            },
        );
        assert_eq!(strict.len(), 2);
        assert!(matches!(
            strict.discarded[0].reason,
            DiscardReason::Malformed(ElementLineError::Checksum { line: 1, .. })
        ));
    }

    #[test]
    fn empty_catalog() {
        let c = parse_catalog("");
        assert!(c.is_empty());
        assert!(c.discarded.is_empty());
        assert!(parse_catalog("\n \n\t\n").is_empty());
    }

    #[test]
    fn layout_hint_from_str() {
        assert_eq!("auto".parse::<LayoutHint>(), Ok(LayoutHint::Auto));
        assert_eq!("Grouped".parse::<LayoutHint>(), Ok(LayoutHint::Grouped));
        assert_eq!(" tagged ".parse::<LayoutHint>(), Ok(LayoutHint::Tagged));
        assert!("csv".parse::<LayoutHint>().is_err());
    }
}
