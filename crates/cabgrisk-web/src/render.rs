//! Server-side HTML for the form and result pages.

use std::collections::HashMap;
use std::fmt::Write as _;

use cabgrisk_common::{Locale, Result};
use cabgrisk_ranker::{ModelReport, PredictionReport, Waterfall};
use cabgrisk_schema::coercion::coerce;
use cabgrisk_schema::labels::binary_captions;
use cabgrisk_schema::{FeatureKind, FeatureSchema, FeatureSpec, LabelIndex};

pub const NAV_HTML: &str = include_str!("../templates/nav.html");

/// Fixed UI text per locale.
struct Strings {
    title: &'static str,
    intro: &'static str,
    enter_data: &'static str,
    predict: &'static str,
    risk: &'static str,
    importance: &'static str,
    rank: &'static str,
    feature: &'static str,
    shap_value: &'static str,
    importance_pct: &'static str,
    waterfalls: &'static str,
    defaulted: &'static str,
    error: &'static str,
    again: &'static str,
}

const EN: Strings = Strings {
    title: "CABG Mortality Prediction System",
    intro: "Please enter patient parameters. The system will predict mortality risk using two models and display SHAP analysis.",
    enter_data: "Enter Patient Data",
    predict: "Predict",
    risk: "Predicted Mortality Risk",
    importance: "SHAP Feature Importance",
    rank: "Rank",
    feature: "Feature",
    shap_value: "SHAP Value",
    importance_pct: "Importance %",
    waterfalls: "SHAP Waterfall Plots",
    defaulted: "Not entered, evaluated as 0:",
    error: "Prediction failed",
    again: "New prediction",
};

const ZH_TW: Strings = Strings {
    title: "冠狀動脈繞道手術死亡率預測系統",
    intro: "請輸入病人參數。系統將以兩個模型預測死亡風險並顯示 SHAP 分析。",
    enter_data: "輸入病人資料",
    predict: "預測",
    risk: "預測死亡風險",
    importance: "SHAP 特徵重要性",
    rank: "排名",
    feature: "特徵",
    shap_value: "SHAP 值",
    importance_pct: "重要性 %",
    waterfalls: "SHAP 瀑布圖",
    defaulted: "未填寫，以 0 計算：",
    error: "預測失敗",
    again: "重新預測",
};

fn strings(locale: Locale) -> &'static Strings {
    match locale {
        Locale::En => &EN,
        Locale::ZhTw => &ZH_TW,
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(locale: Locale, body: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="{}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{}</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
{}
<main class="main-content">
{}
</main>
</body>
</html>"#,
        locale.html_lang(),
        strings(locale).title,
        NAV_HTML,
        body
    )
}

// ── Form ──────────────────────────────────────────────────────────────────────

/// The input form. `values` pre-fills widgets (after a failed submission);
/// `error` shows one message above the form.
pub fn form_page(
    schema: &FeatureSchema,
    labels: &LabelIndex,
    locale: Locale,
    values: &HashMap<String, String>,
    error: Option<&str>,
) -> Result<String> {
    let s = strings(locale);

    let mut columns = [String::new(), String::new(), String::new()];
    for (idx, spec) in schema.features().iter().enumerate() {
        let label = escape(&labels.display_label(spec.id, locale)?);
        let widget = widget(spec, locale, values.get(spec.id.as_str()).map(String::as_str));
        let _ = write!(
            columns[idx % 3],
            r#"
            <div class="field">
                <label class="field-label">{label}</label>
                {widget}
            </div>"#
        );
    }

    let error_html = match error {
        Some(msg) => format!(
            r#"<div class="alert alert-danger"><strong>{}</strong>: {}</div>"#,
            s.error,
            escape(msg)
        ),
        None => String::new(),
    };

    let body = format!(r#"
    <div class="page-header">
        <h1 class="page-title">{}</h1>
        <p class="text-muted">{}</p>
    </div>
    {}
    <form method="post" action="/predict" class="card">
        <h2 class="card-title">{}</h2>
        <input type="hidden" name="lang" value="{}">
        <div class="form-grid">
            <div class="form-column">{}</div>
            <div class="form-column">{}</div>
            <div class="form-column">{}</div>
        </div>
        <button type="submit" class="btn btn-primary">{}</button>
    </form>"#,
        s.title, s.intro, error_html, s.enter_data, locale.code(),
        columns[0], columns[1], columns[2], s.predict
    );

    Ok(page(locale, &body))
}

fn widget(spec: &FeatureSpec, locale: Locale, current: Option<&str>) -> String {
    let id = spec.id.as_str();
    match spec.kind {
        FeatureKind::Binary => {
            let (no, yes) = binary_captions(locale);
            let positive = coerce(spec, current).map(|c| c.value == 1.0).unwrap_or(false);
            format!(
                r#"<div class="radio-row">
                    <label><input type="radio" name="{id}" value="No"{}> {no}</label>
                    <label><input type="radio" name="{id}" value="Yes"{}> {yes}</label>
                </div>"#,
                if positive { "" } else { " checked" },
                if positive { " checked" } else { "" },
            )
        }
        FeatureKind::Categorical(choices) => {
            let options: String = choices
                .iter()
                .map(|choice| {
                    format!(
                        r#"<option value="{}"{}>{}</option>"#,
                        escape(choice.value),
                        if current == Some(choice.value) { " selected" } else { "" },
                        escape(choice.label(locale))
                    )
                })
                .collect();
            format!(r#"<select name="{id}" class="form-select">{options}</select>"#)
        }
        FeatureKind::Numeric => {
            // an untouched field submits blank and is recorded as defaulted
            let value = current.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("");
            format!(
                r#"<input type="number" name="{id}" min="0" step="any" placeholder="0" value="{}" class="form-control">"#,
                escape(value)
            )
        }
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

pub fn result_page(
    report: &PredictionReport,
    schema: &FeatureSchema,
    labels: &LabelIndex,
    decimals: usize,
) -> Result<String> {
    let locale = report.locale;
    let s = strings(locale);

    let risks: String = report
        .models
        .iter()
        .map(|m| {
            format!(
                r#"<div class="alert alert-success">{} {}: <strong>{:.*}</strong></div>"#,
                escape(&m.display_name),
                s.risk,
                decimals,
                m.probability
            )
        })
        .collect();

    let defaulted: Vec<String> = report
        .defaulted_features
        .iter()
        .filter(|id| matches!(schema.get(id.as_str()), Some(spec) if spec.kind == FeatureKind::Numeric))
        .map(|&id| labels.display_label(id, locale).map(|l| escape(&l)))
        .collect::<Result<_>>()?;
    let defaulted_html = if defaulted.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="alert alert-warning">{} {}</div>"#,
            s.defaulted,
            defaulted.join(", ")
        )
    };

    let tables: String = report.models.iter().map(|m| importance_table(m, s)).collect();
    let plots: String = report
        .models
        .iter()
        .map(|m| {
            format!(
                r#"<div class="card"><h3 class="card-title">{}</h3>{}</div>"#,
                escape(&m.display_name),
                waterfall_svg(&m.waterfall)
            )
        })
        .collect();

    let body = format!(r#"
    <div class="page-header">
        <h1 class="page-title">{}</h1>
        <a href="/?lang={}" class="btn btn-outline">{}</a>
    </div>
    {}
    {}
    {}
    <h2>{}</h2>
    {}
    <p class="text-muted small">request {} · {}</p>"#,
        s.title, locale.code(), s.again,
        risks, defaulted_html, tables,
        s.waterfalls, plots,
        report.request_id, report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(page(locale, &body))
}

fn importance_table(model: &ModelReport, s: &Strings) -> String {
    let rows: String = model
        .rows
        .iter()
        .map(|r| {
            format!(
                r#"
                <tr>
                    <td class="text-muted">{}</td>
                    <td>{}</td>
                    <td class="{}"><code>{:+.4}</code></td>
                    <td>
                        <div class="bar"><div class="bar-fill" style="width:{:.1}%"></div></div>
                        {:.1}%
                    </td>
                </tr>"#,
                r.rank,
                escape(&r.label),
                if r.signed_value >= 0.0 { "pos" } else { "neg" },
                r.signed_value,
                r.importance_pct,
                r.importance_pct
            )
        })
        .collect();

    format!(r#"
    <div class="card">
        <h2 class="card-title">{} {}</h2>
        <table class="table">
            <thead>
                <tr><th width="60">{}</th><th>{}</th><th>{}</th><th>{}</th></tr>
            </thead>
            <tbody>{}</tbody>
        </table>
    </div>"#,
        escape(&model.display_name), s.importance,
        s.rank, s.feature, s.shap_value, s.importance_pct,
        rows
    )
}

// ── Waterfall SVG ─────────────────────────────────────────────────────────────

const SVG_WIDTH: f64 = 760.0;
const LABEL_WIDTH: f64 = 280.0;
const PLOT_RIGHT: f64 = 720.0;
const ROW: f64 = 26.0;
const TOP: f64 = 36.0;

const POSITIVE: &str = "#ff0051";
const NEGATIVE: &str = "#008bfb";

fn compact(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e12 {
        format!("{}", v as i64)
    } else {
        format!("{v:.3}")
    }
}

pub fn waterfall_svg(wf: &Waterfall) -> String {
    let (lo, hi) = wf.extent();
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    let (lo, hi) = (lo - pad, hi + pad);
    let plot_w = PLOT_RIGHT - LABEL_WIDTH;
    let x = |v: f64| LABEL_WIDTH + (v - lo) / (hi - lo) * plot_w;

    let n = wf.steps.len() as f64;
    let height = TOP + n * ROW + 40.0;
    let bottom = TOP + n * ROW;

    let mut svg = format!(
        r#"<svg class="waterfall" viewBox="0 0 {SVG_WIDTH} {height}" width="100%" xmlns="http://www.w3.org/2000/svg" font-size="12">"#
    );

    let _ = write!(
        svg,
        r##"<line x1="{fx:.1}" y1="{}" x2="{fx:.1}" y2="{TOP}" stroke="#999" stroke-dasharray="3,3"/><text x="{fx:.1}" y="{}" text-anchor="middle">f(x) = {:.3}</text>"##,
        TOP - 18.0,
        TOP - 22.0,
        wf.output_value,
        fx = x(wf.output_value),
    );

    for (i, step) in wf.steps.iter().enumerate() {
        let y = TOP + i as f64 * ROW;
        let (x0, x1) = (x(step.start), x(step.end));
        let left = x0.min(x1);
        let width = (x1 - x0).abs().max(1.0);
        let color = if step.contribution >= 0.0 { POSITIVE } else { NEGATIVE };
        let caption = match step.input_value {
            Some(v) => format!("{} = {}", compact(v), step.label),
            None => step.label.clone(),
        };
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end">{}</text><rect x="{left:.1}" y="{}" width="{width:.1}" height="{}" fill="{color}"/><text x="{:.1}" y="{}" fill="{color}">{:+.3}</text>"#,
            LABEL_WIDTH - 8.0,
            y + ROW * 0.65,
            escape(&caption),
            y + 4.0,
            ROW - 8.0,
            left + width + 4.0,
            y + ROW * 0.65,
            step.contribution
        );
    }

    let _ = write!(
        svg,
        r##"<line x1="{LABEL_WIDTH}" y1="{bottom}" x2="{PLOT_RIGHT}" y2="{bottom}" stroke="#666"/><line x1="{ex:.1}" y1="{TOP}" x2="{ex:.1}" y2="{}" stroke="#999" stroke-dasharray="3,3"/><text x="{ex:.1}" y="{}" text-anchor="middle">E[f(X)] = {:.3}</text></svg>"##,
        bottom + 6.0,
        bottom + 22.0,
        wf.base_value,
        ex = x(wf.base_value),
    );

    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabgrisk_ranker::WaterfallStep;

    fn setup() -> (FeatureSchema, LabelIndex) {
        let schema = FeatureSchema::cabg().unwrap();
        let labels = LabelIndex::builtin(&schema).unwrap();
        (schema, labels)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_form_has_every_feature() {
        let (schema, labels) = setup();
        let html = form_page(&schema, &labels, Locale::En, &HashMap::new(), None).unwrap();
        for spec in schema.features() {
            assert!(html.contains(&format!(r#"name="{}""#, spec.id)), "{}", spec.id);
        }
        assert!(html.contains(r#"<html lang="en">"#));
        assert!(!html.contains("alert-danger"));
    }

    #[test]
    fn test_form_zh_captions() {
        let (schema, labels) = setup();
        let html = form_page(&schema, &labels, Locale::ZhTw, &HashMap::new(), None).unwrap();
        assert!(html.contains("年齡"));
        assert!(html.contains("> 有</label>"));
        assert!(html.contains(">男</option>"));
        assert!(html.contains(r#"<html lang="zh-TW">"#));
    }

    #[test]
    fn test_fresh_form_leaves_numeric_fields_blank() {
        let (schema, labels) = setup();
        let html = form_page(&schema, &labels, Locale::En, &HashMap::new(), None).unwrap();
        assert!(html.contains(r#"name="Age" min="0" step="any" placeholder="0" value="""#));
        assert!(!html.contains(r#"value="0" class="form-control""#));
    }

    #[test]
    fn test_form_keeps_values_and_escapes_error() {
        let (schema, labels) = setup();
        let values: HashMap<String, String> = [
            ("Age".to_string(), "71".to_string()),
            ("COPD".to_string(), "Yes".to_string()),
            ("IABP_insertion".to_string(), "2".to_string()),
        ]
        .into();
        let html = form_page(&schema, &labels, Locale::En, &values, Some("<bad>")).unwrap();
        assert!(html.contains(r#"name="Age" min="0" step="any" placeholder="0" value="71""#));
        assert!(html.contains(r#"name="COPD" value="Yes" checked"#));
        assert!(html.contains(r#"<option value="2" selected>"#));
        assert!(html.contains("&lt;bad&gt;"));
    }

    #[test]
    fn test_svg_has_bar_per_step() {
        let wf = Waterfall {
            base_value: -2.0,
            output_value: -1.5,
            steps: vec![
                WaterfallStep {
                    feature: None,
                    label: "Age".to_string(),
                    input_value: Some(72.0),
                    contribution: 1.0,
                    start: -2.5,
                    end: -1.5,
                },
                WaterfallStep {
                    feature: None,
                    label: "2 other features".to_string(),
                    input_value: None,
                    contribution: -0.5,
                    start: -2.0,
                    end: -2.5,
                },
            ],
        };
        let svg = waterfall_svg(&wf);
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("72 = Age"));
        assert!(svg.contains("f(x) = -1.500"));
        assert!(svg.contains("E[f(X)] = -2.000"));
        assert!(svg.ends_with("</svg>"));
    }
}
