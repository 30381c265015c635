//! Weekly export sales: totals, top destinations and China's share of the
//! latest reported week.

use chrono::NaiveDate;
use mirror_market_core::ExportSale;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Destinations listed in a summary.
pub const TOP_BUYERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Buyer {
    pub country: String,
    pub net_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSalesSummary {
    pub week_ending: NaiveDate,
    pub net_sales: Decimal,
    pub weekly_exports: Decimal,
    /// Largest net buyers first, zero rows left out.
    pub top_buyers: Vec<Buyer>,
    pub china_net: Decimal,
    /// China's net sales as a percentage of the week's total. `None` unless
    /// the total is positive.
    pub china_share_pct: Option<f64>,
}

impl ExportSalesSummary {
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("Net sales: {} MT", tons(self.net_sales))];
        if !self.weekly_exports.is_zero() {
            parts.push(format!("Exports: {} MT", tons(self.weekly_exports)));
        }
        if !self.top_buyers.is_empty() {
            let buyers = self
                .top_buyers
                .iter()
                .map(|b| format!("{} ({} MT)", b.country, tons(b.net_sales)))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("Top buyers: {buyers}"));
        }
        parts.join(" | ")
    }
}

fn is_china(country: &str) -> bool {
    country.to_lowercase().contains("china")
}

fn net(row: &ExportSale) -> Decimal {
    row.net_sales.unwrap_or_default()
}

/// Summarizes the most recent week present in `rows`. Missing values count
/// as zero. Returns `None` for an empty slice.
#[must_use]
pub fn summarize_export_sales(rows: &[ExportSale]) -> Option<ExportSalesSummary> {
    let week_ending = rows.iter().map(|r| r.week_ending).max()?;
    let latest: Vec<&ExportSale> = rows.iter().filter(|r| r.week_ending == week_ending).collect();

    let net_sales: Decimal = latest.iter().copied().map(net).sum();
    let weekly_exports: Decimal = latest.iter().map(|r| r.weekly_exports.unwrap_or_default()).sum();
    let china_net: Decimal = latest
        .iter()
        .copied()
        .filter(|r| is_china(&r.country))
        .map(net)
        .sum();

    let mut buyers: Vec<Buyer> = latest
        .iter()
        .copied()
        .filter(|r| !net(r).is_zero())
        .map(|r| Buyer {
            country: r.country.clone(),
            net_sales: net(r),
        })
        .collect();
    buyers.sort_by(|a, b| b.net_sales.cmp(&a.net_sales));
    buyers.truncate(TOP_BUYERS);

    let china_share_pct = (net_sales > Decimal::ZERO)
        .then(|| (china_net / net_sales * Decimal::ONE_HUNDRED).to_f64())
        .flatten();

    Some(ExportSalesSummary {
        week_ending,
        net_sales,
        weekly_exports,
        top_buyers: buyers,
        china_net,
        china_share_pct,
    })
}

/// Whole metric tons with thousands separators, e.g. `-1,234,567`.
#[must_use]
pub fn tons(value: Decimal) -> String {
    let rounded = value.round().abs().to_string();
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value.round().is_sign_negative() && !value.round().is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn week(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn sale(day: u32, country: &str, net: Decimal, exports: Option<Decimal>) -> ExportSale {
        ExportSale {
            week_ending: week(day),
            country: country.to_string(),
            net_sales: Some(net),
            weekly_exports: exports,
        }
    }

    #[test]
    fn summarizes_only_the_latest_week() {
        let rows = vec![
            sale(3, "China", dec!(900000), None),
            sale(10, "China", dec!(420000), Some(dec!(300000))),
            sale(10, "CHINA, PEOPLES REPUBLIC", dec!(30000), None),
            sale(10, "Mexico", dec!(250000), Some(dec!(120000))),
            sale(10, "Egypt", dec!(0), Some(dec!(55000))),
            sale(10, "Japan", dec!(200000), None),
            sale(10, "Unknown", dec!(100000), None),
        ];

        let summary = summarize_export_sales(&rows).unwrap();
        assert_eq!(summary.week_ending, week(10));
        assert_eq!(summary.net_sales, dec!(1000000));
        assert_eq!(summary.weekly_exports, dec!(475000));
        assert_eq!(summary.china_net, dec!(450000));
        assert!((summary.china_share_pct.unwrap() - 45.0).abs() < 1e-9);

        let top: Vec<&str> = summary.top_buyers.iter().map(|b| b.country.as_str()).collect();
        assert_eq!(top, vec!["China", "Mexico", "Japan"]);
    }

    #[test]
    fn no_share_when_week_is_net_negative() {
        let rows = vec![
            sale(10, "China", dec!(-20000), None),
            sale(10, "Mexico", dec!(5000), None),
        ];
        let summary = summarize_export_sales(&rows).unwrap();
        assert_eq!(summary.china_share_pct, None);
        assert_eq!(summary.top_buyers[0].country, "Mexico");
        assert!(summarize_export_sales(&[]).is_none());
    }

    #[test]
    fn describe_lists_sales_exports_and_buyers() {
        let rows = vec![
            sale(10, "China", dec!(512000), Some(dec!(318000))),
            sale(10, "Mexico", dec!(98000), None),
        ];
        let summary = summarize_export_sales(&rows).unwrap();
        assert_eq!(
            summary.describe(),
            "Net sales: 610,000 MT | Exports: 318,000 MT | Top buyers: China (512,000 MT), \
             Mexico (98,000 MT)"
        );
    }

    #[test]
    fn tons_groups_thousands() {
        assert_eq!(tons(dec!(0)), "0");
        assert_eq!(tons(dec!(999.6)), "1,000");
        assert_eq!(tons(dec!(1234567)), "1,234,567");
        assert_eq!(tons(dec!(-45000)), "-45,000");
        assert_eq!(tons(dec!(-0.2)), "0");
    }
}
