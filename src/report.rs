//! Console report combining the TradFi sentiment reading and the crypto price.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::analysis::SentimentLabel;

const SEPARATOR_WIDTH: usize = 63;
const CAPTION_WIDTH: usize = 30;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
pub const CRYPTO_ASSET: &str = "Bitcoin (XBT/USD)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportInputs {
    pub reference_asset_name: String,
    pub average_compound: f64,
    pub crypto_price: f64,
}

/// Formats a price with thousands separators and exactly two decimals.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return format!("{:.2}", price);
    }

    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // -0.001 rounds to 0.00 and should not print a sign.
    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

pub fn render_report(inputs: &ReportInputs, generated_at: DateTime<Utc>) -> String {
    let label = SentimentLabel::from_score(inputs.average_compound);
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let rule = "-".repeat(SEPARATOR_WIDTH);
    let w = CAPTION_WIDTH;

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out, "    PROJECT SENTINEL - CRYPTO & TRADFI SENTIMENT BRIDGE");
    let _ = writeln!(out, "            Date and Time: {}", generated_at.format(TIMESTAMP_FORMAT));
    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out);

    let _ = writeln!(out, "[1] TRADITIONAL MARKET ANALYSIS (S&P 500)");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{:<w$}: {} (via IBKR)", "-> Reference Asset", inputs.reference_asset_name);
    let _ = writeln!(out, "{:<w$}: {} (via NewsAPI & AI)", "-> News Sentiment", label);
    let _ = writeln!(out, "{:<w$}: {:.3}", "-> Sentiment Score", inputs.average_compound);
    let _ = writeln!(out);

    let _ = writeln!(out, "[2] CRYPTO MARKET DATA");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{:<w$}: {} (via Kraken)", "-> Asset", CRYPTO_ASSET);
    let _ = writeln!(out, "{:<w$}: ${}", "-> Current Price", format_price(inputs.crypto_price));
    let _ = writeln!(out);

    let _ = writeln!(out, "[3] CONCLUSION");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Traditional market sentiment is {}.", label);
    let _ = writeln!(
        out,
        "Watch whether this sentiment carries over to risk assets such as Bitcoin."
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out, "                     END OF REPORT");
    let _ = writeln!(out, "{}", separator);
    out
}

pub fn write_report<W: Write>(
    writer: &mut W,
    inputs: &ReportInputs,
    generated_at: DateTime<Utc>,
) -> io::Result<()> {
    writer.write_all(render_report(inputs, generated_at).as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn inputs(name: &str, score: f64, price: f64) -> ReportInputs {
        ReportInputs {
            reference_asset_name: name.to_string(),
            average_compound: score,
            crypto_price: price,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "0.00");
        assert_eq!(format_price(5.0), "5.00");
        assert_eq!(format_price(999.999), "1,000.00");
        assert_eq!(format_price(1234.5), "1,234.50");
        assert_eq!(format_price(67250.5), "67,250.50");
        assert_eq!(format_price(123456.789), "123,456.79");
        assert_eq!(format_price(1234567.0), "1,234,567.00");
        assert_eq!(format_price(-1234.5), "-1,234.50");
        assert_eq!(format_price(-0.001), "0.00");
    }

    #[test]
    fn test_report_sections() {
        let report = render_report(&inputs("SPDR S&P 500 ETF TRUST", 0.41234, 67250.5), at(1_760_000_000));

        assert!(report.contains("Date and Time: 2025-10-09 08:53:20 UTC"));
        assert!(report.contains("-> Reference Asset            : SPDR S&P 500 ETF TRUST (via IBKR)\n"));
        assert!(report.contains("-> News Sentiment             : POSITIVE (via NewsAPI & AI)\n"));
        assert!(report.contains("-> Sentiment Score            : 0.412\n"));
        assert!(report.contains("-> Asset                      : Bitcoin (XBT/USD) (via Kraken)\n"));
        assert!(report.contains("-> Current Price              : $67,250.50\n"));
        assert!(report.contains("Traditional market sentiment is POSITIVE.\n"));
        assert!(report.starts_with(&"=".repeat(63)));
        assert!(report.ends_with(&format!("{}\n", "=".repeat(63))));
    }

    #[test]
    fn test_fallback_values_render() {
        let report = render_report(&inputs("Unknown", 0.0, 0.0), at(0));
        assert!(report.contains(": Unknown (via IBKR)"));
        assert!(report.contains(": NEUTRAL (via NewsAPI & AI)"));
        assert!(report.contains(": 0.000\n"));
        assert!(report.contains(": $0.00\n"));
    }

    #[test]
    fn test_score_has_three_decimals() {
        let report = render_report(&inputs("SPY", -0.1, 1.0), at(0));
        assert!(report.contains(": -0.100\n"));
        assert!(report.contains("NEUTRAL-NEGATIVE"));
    }

    #[test]
    fn test_render_is_idempotent_apart_from_timestamp() {
        let data = inputs("SPY", 0.2, 100.0);
        assert_eq!(render_report(&data, at(10)), render_report(&data, at(10)));

        let strip = |s: String| -> Vec<String> {
            s.lines().filter(|l| !l.contains("Date and Time")).map(String::from).collect()
        };
        assert_eq!(strip(render_report(&data, at(10))), strip(render_report(&data, at(99_999))));
    }

    #[test]
    fn test_write_report_matches_render() {
        let data = inputs("SPY", 0.06, 42.0);
        let mut buf = Vec::new();
        write_report(&mut buf, &data, at(5)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), render_report(&data, at(5)));
    }
}
