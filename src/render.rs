//! HTML for the upload page and result cards.

use std::fmt::Write;

use crate::classes::ClassLabel;
use crate::models::{InferenceMode, ModelStatus, PredictionResult};

const DISCLAIMER: &str = "This tool is an educational demo. It does not replace \
     examination by a qualified laboratory professional.";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn mode_text(mode: InferenceMode) -> &'static str {
    match mode {
        InferenceMode::Model => "REAL MODEL ACTIVE",
        InferenceMode::Simulation => "SIMULATION MODE",
    }
}

/// Result card for one prediction.
pub fn render_result(result: &PredictionResult) -> String {
    let (status, color) = if result.is_simulated {
        ("SIMULATION MODE", "orange")
    } else {
        ("REAL MODEL", "green")
    };
    let label = result.class_name.parse::<ClassLabel>().ok();

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="result-card">
  <h3>RESULT - {status}</h3>
  <div class="prediction">{class}</div>
  <div class="confidence" style="color: {color}">{confidence:.2}% confidence</div>
"#,
        class = escape_html(&result.class_name),
        confidence = result.confidence_percent,
    );

    if !result.scores.is_empty() {
        html.push_str("  <ul class=\"scores\">\n");
        for score in &result.scores {
            let _ = writeln!(
                html,
                "    <li>{}: {:.2}%</li>",
                escape_html(&score.class_name),
                score.percent
            );
        }
        html.push_str("  </ul>\n");
    }

    if let Some(label) = label {
        let info = label.info();
        let verdict = if label.is_parasite() {
            "Parasite detected"
        } else {
            "Sample looks clean"
        };
        let _ = writeln!(html, "  <div class=\"verdict\">{verdict}</div>");
        let _ = write!(
            html,
            r#"  <div class="medical-info">
    <h4>{title}</h4>
    <p><strong>Description:</strong> {description}</p>
    <p><strong>Transmission:</strong> {transmission}</p>
    <p><strong>Recommendation:</strong> {recommendation}</p>
  </div>
"#,
            title = info.title,
            description = info.description,
            transmission = info.transmission,
            recommendation = info.recommendation,
        );
    }

    let _ = write!(
        html,
        r#"  <div class="timestamp">{timestamp}</div>
  <p class="disclaimer">{DISCLAIMER}</p>
</div>
"#,
        timestamp = escape_html(&result.timestamp),
    );
    html
}

pub fn render_error(message: &str) -> String {
    format!(
        "<div class=\"result-card error\">\n  <h3>Analysis failed</h3>\n  <p>{}</p>\n</div>\n",
        escape_html(message)
    )
}

/// The single page: upload area plus a model status line.
pub fn upload_page(status: &ModelStatus, max_upload_bytes: usize) -> String {
    let max_mb = max_upload_bytes as f64 / (1024.0 * 1024.0);
    let status_line = match &status.error {
        Some(_) if status.mode == InferenceMode::Simulation => {
            format!("{} (model unavailable)", mode_text(status.mode))
        }
        _ => mode_text(status.mode).to_string(),
    };
    let classes = escape_html(&status.classes.join(", "));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Parasite Detector</title>
<style>
  body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
  #upload-area {{ border: 2px dashed #888; padding: 2rem; text-align: center; cursor: pointer; }}
  #upload-area.dragover {{ background: #eef; }}
  .result-card {{ border: 1px solid #ccc; padding: 1rem; margin-top: 1rem; }}
  .error {{ border-color: #c00; }}
</style>
</head>
<body>
<h1>Parasite Detector</h1>
<p id="model-status">{status_line}</p>
<p>Classes: {classes}</p>
<div id="upload-area">Click or drop a JPEG/PNG image here (max {max_mb:.0} MB)</div>
<input type="file" id="image-upload" accept="image/jpeg,image/png" hidden>
<div id="results"></div>
<script>
  const input = document.getElementById('image-upload');
  const area = document.getElementById('upload-area');
  const results = document.getElementById('results');
  let busy = false;
  async function analyze(file) {{
    if (busy || !file) return;
    busy = true;
    area.textContent = 'Analyzing...';
    const form = new FormData();
    form.append('image', file);
    try {{
      const response = await fetch('/analyze', {{ method: 'POST', body: form }});
      results.innerHTML = await response.text();
    }} catch (e) {{
      results.textContent = 'Request failed: ' + e.message;
    }} finally {{
      busy = false;
      area.textContent = 'Click or drop another image';
    }}
  }}
  area.addEventListener('click', () => input.click());
  input.addEventListener('change', e => analyze(e.target.files[0]));
  area.addEventListener('dragover', e => {{ e.preventDefault(); area.classList.add('dragover'); }});
  area.addEventListener('dragleave', () => area.classList.remove('dragover'));
  area.addEventListener('drop', e => {{
    e.preventDefault();
    area.classList.remove('dragover');
    analyze(e.dataTransfer.files[0]);
  }});
</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassScore;
    use uuid::Uuid;

    fn result(simulated: bool) -> PredictionResult {
        PredictionResult {
            request_id: Uuid::nil(),
            predicted_class_index: 1,
            class_name: "Giardia".into(),
            confidence_percent: 81.5,
            is_simulated: simulated,
            timestamp: "2026-01-01 10:00:00".into(),
            scores: if simulated {
                vec![]
            } else {
                vec![ClassScore {
                    class_name: "Giardia".into(),
                    percent: 81.5,
                }]
            },
        }
    }

    #[test]
    fn simulated_card_is_marked_orange() {
        let html = render_result(&result(true));
        assert!(html.contains("SIMULATION MODE"));
        assert!(html.contains("color: orange"));
        assert!(html.contains("81.50% confidence"));
        assert!(html.contains("Giardia lamblia"));
        assert!(html.contains("Parasite detected"));
        assert!(!html.contains("class=\"scores\""));
    }

    #[test]
    fn model_card_lists_scores() {
        let html = render_result(&result(false));
        assert!(html.contains("REAL MODEL"));
        assert!(html.contains("color: green"));
        assert!(html.contains("<li>Giardia: 81.50%</li>"));
    }

    #[test]
    fn error_text_is_escaped() {
        let html = render_error("<script>alert(1)</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn page_shows_status_and_limit() {
        let status = ModelStatus {
            mode: InferenceMode::Simulation,
            model_path: "model/model.onnx".into(),
            error: Some("missing".into()),
            classes: vec!["Ascaris".into(), "Negative".into()],
        };
        let page = upload_page(&status, 10 * 1024 * 1024);
        assert!(page.contains("SIMULATION MODE (model unavailable)"));
        assert!(page.contains("max 10 MB"));
        assert!(page.contains("Ascaris, Negative"));
    }
}
