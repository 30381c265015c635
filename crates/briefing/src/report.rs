use std::fmt;

use serde::Serialize;

pub const FRESHNESS_WARNINGS: &str = "DATA FRESHNESS WARNINGS";
pub const DATA_QUALITY: &str = "DATA QUALITY";
pub const PRICES: &str = "PRICES";
pub const CRUSH_SPREAD: &str = "CRUSH SPREAD";
pub const ECONOMIC_CONTEXT: &str = "ECONOMIC CONTEXT";
pub const YIELD_CURVE: &str = "YIELD CURVE";
pub const EXPORT_SALES: &str = "EXPORT SALES";
pub const FORWARD_CURVE: &str = "FORWARD CURVE";
pub const CURRENCIES: &str = "CURRENCIES";
pub const POSITIONING: &str = "COT POSITIONING";
pub const WEATHER_ALERTS: &str = "WEATHER ALERTS";
pub const CORRELATIONS: &str = "CORRELATIONS";
pub const SEASONAL: &str = "SEASONAL ANALYSIS";
pub const MARKET_DRIVERS: &str = "MARKET DRIVERS";
pub const SIGNALS: &str = "SIGNALS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub lines: Vec<String>,
}

impl Section {
    #[must_use]
    pub fn new(title: &'static str, lines: Vec<String>) -> Self {
        Self { title, lines }
    }
}

/// A composed briefing: a header and sections in their fixed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BriefingReport {
    header: String,
    sections: Vec<Section>,
}

impl BriefingReport {
    pub(crate) fn new(header: String, sections: Vec<Section>) -> Self {
        Self { header, sections }
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    #[must_use]
    pub fn titles(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.title).collect()
    }
}

impl fmt::Display for BriefingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}:", section.title)?;
            for line in &section.lines {
                writeln!(f, "  {line}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_with_indented_lines() {
        let report = BriefingReport::new(
            "=== Briefing ===".into(),
            vec![
                Section::new(PRICES, vec!["Corn: 450.25".into()]),
                Section::new(SIGNALS, vec!["No active signals".into()]),
            ],
        );
        assert_eq!(
            report.to_string(),
            "=== Briefing ===\n\nPRICES:\n  Corn: 450.25\n\nSIGNALS:\n  No active signals\n"
        );
        assert_eq!(report.titles(), vec![PRICES, SIGNALS]);
        assert!(report.section(CURRENCIES).is_none());
    }
}
