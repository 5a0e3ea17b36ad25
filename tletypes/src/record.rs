use derive_more::Display;

/// Width of a fixed-format element line, checksum column included
pub const ELEMENT_LINE_LEN: usize = 69;

pub type CatalogNumber = u32;

/// A named pair of orbital element lines
/// https://en.wikipedia.org/wiki/Two-line_element_set
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display(fmt = "{}", "name")]
pub struct OrbitalRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl OrbitalRecord {
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Satellite catalog number, columns 3-7 of line 1.
    ///
    /// Alpha-5 designators are not numeric and yield `None`.
    pub fn catalog_number(&self) -> Option<CatalogNumber> {
        self.line1.get(2..7)?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_number() {
        let r = OrbitalRecord::new(
            "ISS (ZARYA)",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        );
        assert_eq!(r.catalog_number(), Some(25544));
        assert_eq!(r.to_string(), "ISS (ZARYA)");

        let r = OrbitalRecord::new("X", "1 A0001U", "2 A0001");
        assert_eq!(r.catalog_number(), None);

        let r = OrbitalRecord::new("X", "1", "2");
        assert_eq!(r.catalog_number(), None);
    }
}
