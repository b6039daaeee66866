use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const JOB_DESCRIPTION_PLACEHOLDER: &str = "Not provided";

/// Typed view of an analysis request. Stored verbatim as a job's `request_data`;
/// unknown keys are preserved in `extra` so the snapshot round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningRequest {
    pub candidate_slug: String,
    pub job_slug: String,
    /// Plain resume text.
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_job_info: Option<SelectedJobInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<Value>,
    #[serde(
        default,
        rename = "salary_expectation",
        skip_serializing_if = "Option::is_none"
    )]
    pub salary_expectation: Option<Value>,
    #[serde(
        default,
        rename = "current_salary",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_salary: Option<Value>,
    /// Selects whose RecruitCRM key is used; the default organisation otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectedJobInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScreeningRequest {
    pub fn from_request_data(data: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(data)
    }

    /// Explicit description first, then the selected ATS job's text, then a placeholder.
    pub fn job_description_text(&self) -> &str {
        self.job_description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                self.selected_job_info
                    .as_ref()
                    .and_then(|info| info.job_description_text.as_deref())
                    .filter(|d| !d.trim().is_empty())
            })
            .unwrap_or(JOB_DESCRIPTION_PLACEHOLDER)
    }

    /// Skills, specialization and salary fields rendered as one line, blanks skipped.
    pub fn candidate_attributes(&self) -> String {
        [
            &self.skills,
            &self.specialization,
            &self.salary_expectation,
            &self.current_salary,
        ]
        .into_iter()
        .flatten()
        .filter_map(render_attribute)
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Slugs must be present for the ATS push to have a target.
    pub fn validate(&self) -> Result<(), String> {
        if self.candidate_slug.trim().is_empty() {
            return Err("candidateSlug cannot be empty".to_string());
        }
        if self.job_slug.trim().is_empty() {
            return Err("jobSlug cannot be empty".to_string());
        }
        if self.text.trim().is_empty() && self.resume_url.is_none() {
            return Err("either text or resumeUrl must be provided".to_string());
        }
        Ok(())
    }
}

fn render_attribute(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(render_attribute)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    };
    (!rendered.is_empty()).then_some(rendered)
}
