//! CSV layouts for layer files.
//!
//! Every layout has a header row and an `entity` column. Missing values are
//! empty fields (or `NaN`) and are read as absent.
//!
//! | shape | columns |
//! |---|---|
//! | prices | `date,entity,open,high,low,close,volume` |
//! | scalars | `date,entity,value` |
//! | positioning | `date,entity,commercial_net,noncommercial_net` |
//! | weather | `date,entity,precipitation_mm,temp_max_c,temp_min_c` |
//! | curves | `contract_month,entity,label,close` |
//! | export sales | `week_ending,entity,country,net_sales,weekly_exports` |

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use csv::{StringRecord, Writer};
use mirror_market_core::{
    CurvePoint, ExportSale, LayerData, LayerKind, PositioningRecord, PriceBar, PriceSeries, ScalarPoint,
    Series, WeatherObservation,
};
use rust_decimal::Decimal;

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a layer file in the layout that matches `kind`.
    ///
    /// Currency layers use the scalar layout. Rows are grouped by entity in
    /// file order; ordering is left to the normalizer.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, a required column is
    /// missing, or a field fails to parse.
    pub fn read_layer(path: &Path, kind: LayerKind) -> Result<LayerData> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let columns = Columns::new(&headers);
        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Malformed row {}", line + 2))?;
            rows.push(record);
        }

        let data = match kind {
            LayerKind::Prices => LayerData::Prices(group(&rows, &columns, price_bar)?),
            LayerKind::Currencies | LayerKind::Economic => {
                LayerData::Scalars(group(&rows, &columns, scalar_point)?)
            }
            LayerKind::Positioning => {
                LayerData::Positioning(group(&rows, &columns, positioning_record)?)
            }
            LayerKind::Weather => LayerData::Weather(group(&rows, &columns, weather_observation)?),
            LayerKind::ForwardCurve => {
                let mut curves: BTreeMap<String, Vec<CurvePoint>> = BTreeMap::new();
                for row in &rows {
                    let entity = columns.required_str(row, "entity")?;
                    curves
                        .entry(entity.to_string())
                        .or_default()
                        .push(curve_point(row, &columns)?);
                }
                LayerData::Curves(curves)
            }
            LayerKind::ExportSales => {
                let mut sales: BTreeMap<String, Vec<ExportSale>> = BTreeMap::new();
                for row in &rows {
                    let entity = columns.required_str(row, "entity")?;
                    sales
                        .entry(entity.to_string())
                        .or_default()
                        .push(export_sale(row, &columns)?);
                }
                LayerData::ExportSales(sales)
            }
        };

        tracing::debug!(
            path = %path.display(),
            rows = rows.len(),
            entities = data.entity_count(),
            "layer file read"
        );
        Ok(data)
    }

    /// Writes price series in the prices layout, entities in key order.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_prices(path: &Path, prices: &BTreeMap<String, PriceSeries>) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(["date", "entity", "open", "high", "low", "close", "volume"])?;

        let cell = |v: Option<Decimal>| v.map(|d| d.to_string()).unwrap_or_default();
        for (entity, series) in prices {
            for bar in series.records() {
                writer.write_record(&[
                    bar.date.format("%Y-%m-%d").to_string(),
                    entity.clone(),
                    cell(bar.open),
                    cell(bar.high),
                    cell(bar.low),
                    cell(bar.close),
                    cell(bar.volume),
                ])?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

struct Columns<'a> {
    headers: &'a StringRecord,
}

impl<'a> Columns<'a> {
    fn new(headers: &'a StringRecord) -> Self {
        Self { headers }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    fn raw<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index(name)
            .and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
    }

    fn required_str<'r>(&self, row: &'r StringRecord, name: &str) -> Result<&'r str> {
        if self.index(name).is_none() {
            bail!("Missing column '{name}'");
        }
        self.raw(row, name)
            .ok_or_else(|| anyhow!("Empty '{name}' field"))
    }

    fn date(&self, row: &StringRecord, name: &str) -> Result<NaiveDate> {
        let value = self.required_str(row, name)?;
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{value}' in '{name}'"))
    }

    fn decimal(&self, row: &StringRecord, name: &str) -> Result<Option<Decimal>> {
        self.raw(row, name)
            .map(|v| Decimal::from_str(v).with_context(|| format!("Invalid number '{v}' in '{name}'")))
            .transpose()
    }

    fn integer(&self, row: &StringRecord, name: &str) -> Result<Option<i64>> {
        self.raw(row, name)
            .map(|v| {
                // COT exports sometimes carry a trailing ".0"
                Decimal::from_str(v)
                    .ok()
                    .and_then(|d| i64::try_from(d.trunc()).ok())
                    .ok_or_else(|| anyhow!("Invalid integer '{v}' in '{name}'"))
            })
            .transpose()
    }
}

fn group<R>(
    rows: &[StringRecord],
    columns: &Columns<'_>,
    parse: fn(&StringRecord, &Columns<'_>) -> Result<R>,
) -> Result<BTreeMap<String, Series<R>>> {
    let mut grouped: BTreeMap<String, Vec<R>> = BTreeMap::new();
    for row in rows {
        let entity = columns.required_str(row, "entity")?;
        grouped
            .entry(entity.to_string())
            .or_default()
            .push(parse(row, columns)?);
    }
    Ok(grouped
        .into_iter()
        .map(|(entity, records)| (entity, Series::new(records)))
        .collect())
}

fn price_bar(row: &StringRecord, c: &Columns<'_>) -> Result<PriceBar> {
    if c.index("close").is_none() {
        bail!("Missing column 'close'");
    }
    Ok(PriceBar {
        date: c.date(row, "date")?,
        open: c.decimal(row, "open")?,
        high: c.decimal(row, "high")?,
        low: c.decimal(row, "low")?,
        close: c.decimal(row, "close")?,
        volume: c.decimal(row, "volume")?,
    })
}

fn scalar_point(row: &StringRecord, c: &Columns<'_>) -> Result<ScalarPoint> {
    if c.index("value").is_none() {
        bail!("Missing column 'value'");
    }
    Ok(ScalarPoint {
        date: c.date(row, "date")?,
        value: c.decimal(row, "value")?,
    })
}

fn positioning_record(row: &StringRecord, c: &Columns<'_>) -> Result<PositioningRecord> {
    if c.index("noncommercial_net").is_none() {
        bail!("Missing column 'noncommercial_net'");
    }
    Ok(PositioningRecord {
        date: c.date(row, "date")?,
        commercial_net: c.integer(row, "commercial_net")?,
        noncommercial_net: c.integer(row, "noncommercial_net")?,
    })
}

fn weather_observation(row: &StringRecord, c: &Columns<'_>) -> Result<WeatherObservation> {
    Ok(WeatherObservation {
        date: c.date(row, "date")?,
        precipitation_mm: c.decimal(row, "precipitation_mm")?,
        temp_max_c: c.decimal(row, "temp_max_c")?,
        temp_min_c: c.decimal(row, "temp_min_c")?,
    })
}

fn curve_point(row: &StringRecord, c: &Columns<'_>) -> Result<CurvePoint> {
    let contract_month = c.date(row, "contract_month")?;
    let close = c
        .decimal(row, "close")?
        .ok_or_else(|| anyhow!("Empty 'close' field for contract {contract_month}"))?;
    let label = c
        .raw(row, "label")
        .map_or_else(|| contract_month.format("%b %Y").to_string(), str::to_string);
    Ok(CurvePoint {
        contract_month,
        label,
        close,
    })
}

fn export_sale(row: &StringRecord, c: &Columns<'_>) -> Result<ExportSale> {
    if c.index("net_sales").is_none() {
        bail!("Missing column 'net_sales'");
    }
    Ok(ExportSale {
        week_ending: c.date(row, "week_ending")?,
        country: c.required_str(row, "country")?.to_string(),
        net_sales: c.decimal(row, "net_sales")?,
        weekly_exports: c.decimal(row, "weekly_exports")?,
    })
}
