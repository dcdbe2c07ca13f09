// SVG chart of price, both EMAs and trade markers

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::models::{Bar, TradeAction, TradeRecord};
use crate::Result;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 500.0;
const PADDING: f64 = 60.0;

/// Everything needed to draw the monitor chart
pub struct ChartData<'a> {
    pub symbol: &'a str,
    pub bars: &'a [Bar],
    pub short_ema: &'a [f64],
    pub long_ema: &'a [f64],
    pub short_window: usize,
    pub long_window: usize,
    pub trades: &'a [TradeRecord],
}

/// Render the last `max_bars` bars as an SVG document
///
/// Trades older than the first plotted bar are left out.
pub fn render_svg(data: &ChartData<'_>, max_bars: usize) -> String {
    let start = data.bars.len().saturating_sub(max_bars);
    let bars = &data.bars[start..];
    let short = &data.short_ema[start.min(data.short_ema.len())..];
    let long = &data.long_ema[start.min(data.long_ema.len())..];

    let title = format!("{} EMA Crossover Strategy - Live Monitor", data.symbol);

    if bars.is_empty() {
        return format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><text x="{x}" y="{y}">{title}: no data available</text></svg>"#,
            w = WIDTH,
            h = HEIGHT,
            x = PADDING,
            y = HEIGHT / 2.0,
            title = title,
        );
    }

    let first_ts = bars[0].timestamp;
    let trades: Vec<&TradeRecord> = data
        .trades
        .iter()
        .filter(|t| t.timestamp >= first_ts)
        .collect();

    let values = bars
        .iter()
        .map(|b| b.close)
        .chain(short.iter().copied())
        .chain(long.iter().copied())
        .chain(trades.iter().map(|t| t.price));
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let span_secs = (bars[bars.len() - 1].timestamp - first_ts).num_seconds().max(1) as f64;

    let x_at = |secs: f64| PADDING + (secs / span_secs) * plot_width;
    let y_at = |price: f64| HEIGHT - PADDING - (price - min) * scale_y;

    let bar_x = |bar: &Bar| x_at((bar.timestamp - first_ts).num_seconds() as f64);

    let price_points = polyline(bars.iter().map(|b| (bar_x(b), y_at(b.close))));
    let short_points = polyline(bars.iter().zip(short).map(|(b, &v)| (bar_x(b), y_at(v))));
    let long_points = polyline(bars.iter().zip(long).map(|(b, &v)| (bar_x(b), y_at(v))));

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{x}" y="30" font-size="18" text-anchor="middle">{title}</text>"#,
        x = WIDTH / 2.0,
        title = title
    );

    // Axes
    let _ = writeln!(
        svg,
        r##"<line x1="{p}" y1="{p}" x2="{p}" y2="{b}" stroke="#888"/><line x1="{p}" y1="{b}" x2="{r}" y2="{b}" stroke="#888"/>"##,
        p = PADDING,
        b = HEIGHT - PADDING,
        r = WIDTH - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<text x="5" y="{y:.1}" font-size="11">{max:.2}</text><text x="5" y="{b:.1}" font-size="11">{min:.2}</text>"#,
        y = PADDING,
        b = HEIGHT - PADDING,
        max = max,
        min = min
    );
    let _ = writeln!(
        svg,
        r#"<text x="{p}" y="{y:.1}" font-size="11">{first}</text><text x="{r}" y="{y:.1}" font-size="11" text-anchor="end">{last}</text>"#,
        p = PADDING,
        r = WIDTH - PADDING,
        y = HEIGHT - PADDING + 20.0,
        first = first_ts.format("%Y-%m-%d"),
        last = bars[bars.len() - 1].timestamp.format("%Y-%m-%d")
    );

    for (points, color, label) in [
        (&price_points, "blue", "Price".to_string()),
        (&short_points, "red", format!("EMA {}", data.short_window)),
        (&long_points, "green", format!("EMA {}", data.long_window)),
    ] {
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}"><title>{label}</title></polyline>"#,
        );
    }

    for trade in &trades {
        let x = x_at((trade.timestamp - first_ts).num_seconds() as f64);
        let y = y_at(trade.price);
        let (points, color) = match trade.action {
            TradeAction::Buy => (
                format!(
                    "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                    x,
                    y - 8.0,
                    x - 7.0,
                    y + 6.0,
                    x + 7.0,
                    y + 6.0
                ),
                "green",
            ),
            TradeAction::Sell => (
                format!(
                    "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                    x,
                    y + 8.0,
                    x - 7.0,
                    y - 6.0,
                    x + 7.0,
                    y - 6.0
                ),
                "red",
            ),
        };
        let _ = writeln!(
            svg,
            r#"<polygon class="{action}" points="{points}" fill="{color}"><title>{action} @ {price:.2}</title></polygon>"#,
            action = trade.action,
            price = trade.price,
        );
    }

    // Legend
    let legend = [
        ("blue", "Price".to_string()),
        ("red", format!("EMA {}", data.short_window)),
        ("green", format!("EMA {}", data.long_window)),
    ];
    for (i, (color, label)) in legend.iter().enumerate() {
        let y = PADDING + 15.0 + i as f64 * 16.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{x}" y="{ry:.1}" width="12" height="4" fill="{color}"/><text x="{tx}" y="{y:.1}" font-size="12">{label}</text>"#,
            x = PADDING + 10.0,
            ry = y - 4.0,
            tx = PADDING + 28.0,
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn polyline(points: impl Iterator<Item = (f64, f64)>) -> String {
    points
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render and write the chart to `path`
pub fn write_chart(path: &Path, data: &ChartData<'_>, max_bars: usize) -> Result<()> {
    fs::write(path, render_svg(data, max_bars))?;
    tracing::info!("Current market chart saved as '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64).sin() * 5.0;
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 0.0,
                }
            })
            .collect()
    }

    fn trade(day: i64, action: TradeAction) -> TradeRecord {
        TradeRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            action,
            price: 101.0,
            shares: 1.0,
            balance: 0.0,
        }
    }

    #[test]
    fn test_empty_chart() {
        let data = ChartData {
            symbol: "BA",
            bars: &[],
            short_ema: &[],
            long_ema: &[],
            short_window: 5,
            long_window: 20,
            trades: &[],
        };
        let svg = render_svg(&data, 60);
        assert!(svg.contains("no data available"));
    }

    #[test]
    fn test_chart_contains_series_and_recent_markers() {
        let bars = bars(90);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let short = crate::indicators::calculate_ema_series(&closes, 5);
        let long = crate::indicators::calculate_ema_series(&closes, 20);
        // Day 5 is outside the last 60 bars, days 70 and 80 are inside
        let trades = vec![
            trade(5, TradeAction::Buy),
            trade(70, TradeAction::Buy),
            trade(80, TradeAction::Sell),
        ];

        let data = ChartData {
            symbol: "BA",
            bars: &bars,
            short_ema: &short,
            long_ema: &long,
            short_window: 5,
            long_window: 20,
            trades: &trades,
        };
        let svg = render_svg(&data, 60);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("BA EMA Crossover Strategy - Live Monitor"));
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert_eq!(svg.matches(r#"class="BUY""#).count(), 1);
        assert_eq!(svg.matches(r#"class="SELL""#).count(), 1);
        assert!(svg.contains("EMA 20"));
        assert!(svg.contains("2024-01-31"));
    }

    #[test]
    fn test_write_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let bars = bars(3);
        let data = ChartData {
            symbol: "BA",
            bars: &bars,
            short_ema: &[100.0, 100.0, 100.0],
            long_ema: &[100.0, 100.0, 100.0],
            short_window: 2,
            long_window: 3,
            trades: &[],
        };

        write_chart(&path, &data, 60).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("</svg>"));
    }
}
