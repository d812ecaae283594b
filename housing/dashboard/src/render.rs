//! Server-rendered HTML for the dashboard page.

use std::{error::Error, fmt::Write as _};

use housing_pricing::{
    format_currency, format_thousands,
    record::{AMENITIES, SLIDERS},
    DatasetSummary, EvaluationReport, FurnishingStatus, HouseFeatures, Histogram, YesNo,
};
use plotters::prelude::*;

const CHART_WIDTH: u32 = 640;
const CHART_HEIGHT: u32 = 260;
const BAR_COLOR: RGBColor = RGBColor(76, 114, 176);

/// Outcome of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    /// Predicted price.
    Price(f64),
    /// Input rejected, with the reason.
    Rejected(String),
}

/// Everything the page shows.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    /// Dataset statistics.
    pub summary: &'a DatasetSummary,
    /// Target histogram.
    pub histogram: &'a Histogram,
    /// Model metrics on the dataset.
    pub report: &'a EvaluationReport,
    /// Values prefilled in the form.
    pub house: &'a HouseFeatures,
    /// Result of the last submission, if any.
    pub estimate: Option<&'a Estimate>,
    /// Symbol prefixed to prices.
    pub currency: &'a str,
}

/// Renders the full page.
#[must_use]
pub fn page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n",
        "<title>House Price Prediction</title>\n",
        "<style>body{font-family:sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem}",
        "table{border-collapse:collapse}td,th{padding:2px 8px;text-align:right}",
        ".metrics{display:flex;gap:3rem}.metric b{font-size:1.6rem;display:block}",
        ".estimate{background:#e8f5e9;padding:1rem}.rejected{background:#fdecea;padding:1rem}",
        "</style>\n</head>\n<body>\n",
        "<h1>House Price Prediction App</h1>\n",
        "<p><small>Predict house prices using Machine Learning</small></p>\n<hr>\n",
    ));

    let _ = write!(
        html,
        "<div class=\"metrics\">\
         <div class=\"metric\">R² Score<b id=\"r2\">{:.3}</b></div>\
         <div class=\"metric\">RMSE<b id=\"rmse\">{}</b></div>\
         <div class=\"metric\">CV RMSE<b>{}</b></div></div>\n",
        view.report.r2(),
        format_thousands(view.report.rmse()),
        format_thousands(view.report.cv_rmse),
    );
    if view.report.in_sample {
        html.push_str("<p><small>Metrics are computed on the training data.</small></p>\n");
    }

    html.push_str("<hr>\n<h2>Price Distribution (Dataset)</h2>\n");
    match histogram_svg(view.histogram) {
        Ok(svg) => html.push_str(&svg),
        Err(err) => {
            tracing::warn!(error = %err, "histogram rendering failed");
            html.push_str("<p>Price histogram unavailable.</p>\n");
        }
    }
    html.push_str(&summary_table(view.summary));

    html.push_str("<hr>\n<h2>Enter House Details</h2>\n");
    html.push_str(&form(view.house));

    match view.estimate {
        Some(Estimate::Price(price)) => {
            let _ = write!(
                html,
                "<div class=\"estimate\"><h3>Estimated House Price</h3>\
                 <p>Predicted Price ({currency})</p><b id=\"price\">{}</b></div>\n",
                escape(&format_currency(view.currency, *price)),
                currency = escape(view.currency),
            );
        }
        Some(Estimate::Rejected(reason)) => {
            let _ = write!(
                html,
                "<div class=\"rejected\" id=\"rejected\">{}</div>\n",
                escape(reason)
            );
        }
        None => {}
    }

    html.push_str("<hr>\n<p><small>Ridge regression with cross-validated penalty</small></p>\n");
    html.push_str("</body>\n</html>\n");
    html
}

fn form(house: &HouseFeatures) -> String {
    let mut html = String::from("<form method=\"post\" action=\"/predict\">\n");
    for slider in SLIDERS {
        let value = house.slider(slider.field).unwrap_or(slider.default);
        let _ = writeln!(
            html,
            "<label>{label} <input type=\"number\" name=\"{field}\" min=\"{min}\" max=\"{max}\" \
             step=\"{step}\" value=\"{value}\"></label><br>",
            label = slider.label,
            field = slider.field,
            min = slider.min,
            max = slider.max,
            step = slider.step,
        );
    }
    html.push_str("<h3>Amenities</h3>\n");
    for (field, label) in AMENITIES {
        let current = house.amenity(field).unwrap_or(YesNo::Yes);
        let options = YesNo::CHOICES.map(|choice| (choice.as_str(), choice == current));
        html.push_str(&select(field, label, &options));
    }
    let options =
        FurnishingStatus::CHOICES.map(|choice| (choice.as_str(), choice == house.furnishingstatus));
    html.push_str(&select("furnishingstatus", "Furnishing Status", &options));
    html.push_str("<button type=\"submit\">Predict House Price</button>\n</form>\n");
    html
}

fn select(field: &str, label: &str, options: &[(&str, bool)]) -> String {
    let mut html = format!("<label>{label} <select name=\"{field}\">");
    for (value, selected) in options {
        let marker = if *selected { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{value}\"{marker}>{value}</option>");
    }
    html.push_str("</select></label><br>\n");
    html
}

fn summary_table(summary: &DatasetSummary) -> String {
    let mut html = String::from(
        "<table>\n<tr><th></th><th>count</th><th>mean</th><th>std</th><th>min</th>\
         <th>25%</th><th>50%</th><th>75%</th><th>max</th></tr>\n",
    );
    for (name, stats) in &summary.numeric {
        let _ = write!(html, "<tr><th>{}</th><td>{}</td>", escape(name), stats.count);
        for value in [
            stats.mean, stats.std, stats.min, stats.q25, stats.q50, stats.q75, stats.max,
        ] {
            let _ = write!(html, "<td>{value:.2}</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n<ul>\n");
    for (name, counts) in &summary.categorical {
        let parts: Vec<String> = counts
            .iter()
            .map(|(value, count)| format!("{}: {count}", escape(value)))
            .collect();
        let _ = writeln!(html, "<li>{}: {}</li>", escape(name), parts.join(", "));
    }
    html.push_str("</ul>\n");
    html
}

/// Vertical bar chart of `histogram` as inline SVG.
pub fn histogram_svg(histogram: &Histogram) -> Result<String, Box<dyn Error>> {
    let bins = histogram.bins().max(1);
    let peak = histogram.peak().max(1);
    let label_edge = |segment: &SegmentValue<usize>| match segment {
        SegmentValue::Exact(idx) | SegmentValue::CenterOf(idx) => histogram
            .edges
            .get(*idx)
            .map_or_else(String::new, |edge| format_thousands(*edge)),
        SegmentValue::Last => String::new(),
    };

    let mut svg = String::new();
    {
        let root =
            SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d((0..bins).into_segmented(), 0..peak + peak / 10 + 1)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(6)
            .x_label_formatter(&label_edge)
            .x_desc("Price")
            .y_desc("Houses")
            .draw()?;
        chart.draw_series(
            plotters::series::Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(1)
                .data(histogram.counts.iter().copied().enumerate()),
        )?;
        root.present()?;
    }
    Ok(svg)
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use housing_pricing::{Metrics, NumericSummary};
    use std::collections::BTreeMap;

    fn fixtures() -> (DatasetSummary, Histogram, EvaluationReport) {
        let summary = DatasetSummary {
            rows: 3,
            numeric: vec![(
                "price".into(),
                NumericSummary::describe(&[1.0e6, 2.0e6, 3.0e6]).unwrap(),
            )],
            categorical: vec![(
                "mainroad".into(),
                BTreeMap::from([("no".to_string(), 1), ("yes".to_string(), 2)]),
            )],
        };
        let histogram = Histogram::new(&[1.0e6, 2.0e6, 3.0e6], 3);
        let report = EvaluationReport {
            rows: 3,
            metrics: Metrics {
                rmse: 1_234_567.4,
                mse: 0.0,
                mae: 0.0,
                r2: 0.68_249,
            },
            cv_rmse: 1_300_000.0,
            in_sample: true,
        };
        (summary, histogram, report)
    }

    #[test]
    fn page_shows_metrics_and_defaults() {
        let (summary, histogram, report) = fixtures();
        let house = HouseFeatures::default();
        let html = page(&PageView {
            summary: &summary,
            histogram: &histogram,
            report: &report,
            house: &house,
            estimate: None,
            currency: "₹",
        });
        assert!(html.contains("<title>House Price Prediction</title>"));
        assert!(html.contains("<b id=\"r2\">0.682</b>"));
        assert!(html.contains("<b id=\"rmse\">1,234,567</b>"));
        assert!(html.contains("name=\"area\" min=\"500\" max=\"10000\" step=\"100\" value=\"3000\""));
        assert!(html.contains("<option value=\"semi-furnished\">"));
        assert!(html.contains("<option value=\"furnished\" selected>"));
        assert!(!html.contains("id=\"price\""));
        assert!(html.contains("mainroad: no: 1, yes: 2"));
    }

    #[test]
    fn page_shows_clamped_estimate() {
        let (summary, histogram, report) = fixtures();
        let house = HouseFeatures::minimum();
        let estimate = Estimate::Price(-5_000.0);
        let html = page(&PageView {
            summary: &summary,
            histogram: &histogram,
            report: &report,
            house: &house,
            estimate: Some(&estimate),
            currency: "₹",
        });
        assert!(html.contains("<b id=\"price\">₹0</b>"));
        assert!(html.contains("<option value=\"no\" selected>"));
    }

    #[test]
    fn rejection_is_escaped() {
        let (summary, histogram, report) = fixtures();
        let house = HouseFeatures::default();
        let estimate = Estimate::Rejected("area <script>".into());
        let html = page(&PageView {
            summary: &summary,
            histogram: &histogram,
            report: &report,
            house: &house,
            estimate: Some(&estimate),
            currency: "₹",
        });
        assert!(html.contains("area &lt;script&gt;"));
    }

    #[test]
    fn svg_has_one_bar_per_bin() {
        let histogram = Histogram::new(&[1.0, 2.0, 2.5, 9.0], 30);
        let svg = histogram_svg(&histogram).unwrap();
        assert!(svg.matches("<rect").count() >= 5);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Price"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
