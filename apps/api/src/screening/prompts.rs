// LLM prompt text for candidate screening.

/// System prompt for the hiring verdict. The JSON-only fragment is appended at call time.
pub const SCREENING_SYSTEM: &str = "You are an expert hiring manager evaluating candidates for a position. \
Analyze the candidate's information and resume against the job description, then understand the candidate's skills and experience. \
Don't just match keywords in the job description - perform a human-level evaluation that considers context and suitability. \
Candidates with more than 4 grammatical errors should be declined. \
Consider the candidate if they have relevant educational qualifications or background and skills. \
Make sure the candidate has relevant experience for the job.

Your response MUST be a JSON object with exactly these fields:
{
  \"result\": \"approved\" or \"declined\",
  \"reason\": \"A clear and specific explanation of why the candidate was approved or declined\"
}

Provide detailed reasoning that names the specific qualifications, skills, or issues that led to your conclusion.";

/// User message carrying the job and candidate. Inputs are already truncated.
pub fn screening_prompt(job_description: &str, candidate_json: &str, attributes: &str) -> String {
    let mut prompt = format!(
        "Job Description:\n{job_description}\n\nCandidate Data:\n{candidate_json}"
    );
    if !attributes.is_empty() {
        prompt.push_str("\n\nCandidate Attributes:\n");
        prompt.push_str(attributes);
    }
    prompt
}
