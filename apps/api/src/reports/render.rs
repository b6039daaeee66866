//! HTML rendering of the candidate analysis report email.

use std::fmt::Write;

use crate::models::analysis::AnalysisResult;

pub struct ReportEntry {
    pub candidate_slug: String,
    pub result: AnalysisResult,
}

pub struct AnalysisReport {
    pub job_title: String,
    pub company_name: String,
    pub entries: Vec<ReportEntry>,
}

impl AnalysisReport {
    pub fn subject(&self) -> String {
        format!(
            "Candidate Analysis Report: {} at {}",
            self.job_title, self.company_name
        )
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<html><body style=\"font-family: Arial, sans-serif; color: #1F2937;\">\
             <h1>Candidate Analysis Report</h1>\
             <p><strong>Position:</strong> {}<br><strong>Company:</strong> {}</p>\
             <p>{} candidate(s) analysed.</p>",
            escape_html(&self.job_title),
            escape_html(&self.company_name),
            self.entries.len()
        );

        for entry in &self.entries {
            let _ = write!(
                html,
                "<div style=\"border-left: 4px solid {color}; padding: 8px 12px; margin: 12px 0;\">\
                 <h3 style=\"margin: 0;\">{slug}</h3>\
                 <p style=\"margin: 4px 0;\"><strong>Status:</strong> {status} \
                 <span style=\"color: {color};\">({score}/100)</span></p>\
                 <p style=\"margin: 4px 0;\">{summary}</p></div>",
                color = score_color(entry.result.score),
                slug = escape_html(&entry.candidate_slug),
                status = escape_html(&entry.result.status),
                score = entry.result.score,
                summary = escape_html(&entry.result.summary),
            );
        }

        html.push_str("</body></html>");
        html
    }
}

/// Green for strong matches, amber for borderline, red otherwise.
pub fn score_color(score: i32) -> &'static str {
    match score {
        s if s >= 80 => "#34D399",
        s if s >= 60 => "#FBBF24",
        _ => "#F87171",
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
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
