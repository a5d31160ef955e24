use crate::report::{BatchReport, SymbolReport};
use crate::timeframes::IndicatorSet;
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

pub(crate) fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

/// Stochastic value with a `~` marking the RSI proxy.
pub(crate) fn format_stoch(set: &IndicatorSet) -> String {
    match set.stoch_rsi {
        Some(v) if set.is_proxy() => format!("~{:.2}", v),
        other => format_value(other),
    }
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    if ts.timestamp() == 0 {
        return "Never".to_string();
    }
    ts.format("%d-%m-%Y %H:%M:%S").to_string()
}

fn header() -> Vec<Cell> {
    ["Asset", "Price", "RSI (D)", "StochRSI (D)", "RSI (W)", "StochRSI (W)", "Signal"]
        .into_iter()
        .enumerate()
        .map(|(i, title)| {
            let cell = Cell::new(title).add_attribute(Attribute::Bold);
            if i == 0 { cell } else { cell.set_alignment(CellAlignment::Right) }
        })
        .collect()
}

fn row(report: &SymbolReport, accent: Color) -> Vec<Cell> {
    let right = |text: String| Cell::new(text).set_alignment(CellAlignment::Right);
    let price = match report.quoted_price() {
        Some(price) => format!("${:.2}", price),
        None => "N/A".to_string(),
    };

    vec![
        Cell::new(&report.symbol).fg(accent),
        right(price),
        right(format_value(report.daily.rsi)),
        right(format_stoch(&report.daily)),
        right(format_value(report.weekly.rsi)).fg(accent),
        right(format_stoch(&report.weekly)).fg(accent),
        right(report.classification.label().to_string()).fg(Color::DarkGrey),
    ]
}

pub fn build_table(reports: &[SymbolReport], accent: Color) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header());

    for report in reports {
        table.add_row(row(report, accent));
    }
    table
}

pub fn render(batch: &BatchReport) -> String {
    let mut out = format!("(Data taken at {} UTC)\n", format_timestamp(batch.generated_at));

    let sections = [
        ("Recommended Buys (weekly RSI < 20, StochRSI < 10)", &batch.recommended, Color::Green),
        ("Good Buys (weekly StochRSI < 20, RSI < 35)", &batch.good, Color::Cyan),
        ("All Tickers", &batch.all, Color::White),
    ];

    for (title, reports, accent) in sections {
        out.push_str(&format!("\n{}\n", title));
        if reports.is_empty() {
            out.push_str("None found.\n");
        } else {
            out.push_str(&format!("{}\n", build_table(reports, accent)));
        }
    }
    out
}

pub fn run(batch: &BatchReport, clear: bool) -> Result<()> {
    if clear {
        clearscreen::clear()?;
    }

    if batch.all.is_empty() {
        println!("No data found.");
        return Ok(());
    }

    println!("{}", render(batch));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::timeframes::StochRsiSource;

    fn proxied() -> SymbolReport {
        SymbolReport {
            symbol: "AAA".to_string(),
            price: 12.5,
            daily: IndicatorSet::undefined(),
            weekly: IndicatorSet {
                rsi: Some(15.0),
                stoch_rsi: Some(0.0),
                stoch_rsi_source: Some(StochRsiSource::RsiProxy),
            },
            classification: Classification::RecommendedBuy,
        }
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_value(None), "N/A");
        assert_eq!(format_value(Some(12.345)), "12.35");
        assert_eq!(format_stoch(&proxied().weekly), "~0.00");
        assert_eq!(format_timestamp(DateTime::<Utc>::default()), "Never");
    }

    #[test]
    fn test_render_lists_sections() {
        let batch = BatchReport::build(["AAA", "CCC"], vec![proxied()], Utc::now());
        let text = render(&batch);

        assert!(text.contains("Recommended Buys"));
        assert!(text.contains("AAA"));
        assert!(text.contains("CCC"));
        assert!(text.contains("None found."));
    }
}
