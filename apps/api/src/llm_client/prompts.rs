// Prompt templates, one per `PromptKind`. Structured input is appended as
// pretty-printed JSON after the instructions.

use serde_json::Value;

use super::PromptKind;

/// System prompt for every call that must come back as a JSON object.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise study-abroad admissions analyst. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// System prompt for the qualitative experience scorers.
pub const SCORE_ONLY_SYSTEM: &str = "You are a strict admissions reviewer. \
    Reply with a single integer between 0 and 100 and nothing else.";

const COMPETITIVENESS: &str = "\
Assess the overall competitiveness of the applicant below for the target countries, \
majors and degree type in their profile. Be objective and concise.

Return JSON with exactly these keys:
{
  \"strengths\": \"core strengths across academics, experience and language ability\",
  \"weaknesses\": \"main gaps the applicant should address, e.g. low GPA or no relevant internship\",
  \"summary\": \"one paragraph on overall competitiveness and rough admission chances\"
}";

const SCHOOL_RECOMMENDATIONS: &str = "\
Recommend 8 to 12 programs for the applicant, drawn ONLY from the admission outcomes \
of the similar cases provided. Every reason must compare the applicant's GPA and \
background against at least one supporting case and cite its case_id.

Return JSON:
{
  \"recommendations\": [
    {
      \"university\": \"...\",
      \"program\": \"...\",
      \"reason\": \"...\",
      \"supporting_cases\": [{\"case_id\": \"...\", \"similarity_score\": 0.85, \"key_similarities\": \"...\"}]
    }
  ],
  \"summary\": \"overall takeaway from the similar cases\"
}";

const CASE_ANALYSIS: &str = "\
Compare the applicant with the admitted case below. Explain where they are alike, \
where they differ, and what made the case successful.

Return JSON:
{
  \"admitted_university\": \"...\",
  \"admitted_program\": \"...\",
  \"gpa\": \"case GPA as text\",
  \"language_score\": \"case language score as text\",
  \"language_test_type\": \"TOEFL, IELTS or null\",
  \"key_experiences\": \"short summary of the case's research and internships, or null\",
  \"undergraduate_info\": \"case undergraduate institution and major\",
  \"comparison\": {\"gpa\": \"...\", \"university\": \"...\", \"experience\": \"...\"},
  \"success_factors\": \"...\",
  \"takeaways\": \"what the applicant can learn from this case\"
}";

const IMPROVEMENT_PLAN: &str = "\
Build a concrete 6 to 12 month background improvement plan for the applicant that \
addresses the identified weaknesses and fits the target majors.

Return JSON:
{
  \"action_plan\": [
    {\"timeframe\": \"next 1-3 months\", \"action\": \"...\", \"goal\": \"...\"},
    {\"timeframe\": \"months 4-6\", \"action\": \"...\", \"goal\": \"...\"},
    {\"timeframe\": \"months 7-12\", \"action\": \"...\", \"goal\": \"...\"}
  ],
  \"summary\": \"overall application strategy\"
}";

const RESEARCH_SCORE: &str = "\
Score the quality of the research experience below from 0 to 100.
Weigh depth and complexity (30%), results and publications (25%), visibility of the \
project (20%), personal contribution (15%) and methods mastered (10%).
Thin descriptions score 30-50. Concrete results, papers or awards score 70-90. \
Top venues or major awards may score 90-100.";

const INTERNSHIP_SCORE: &str = "\
Score the quality of the internship experience below from 0 to 100.
Weigh company reputation (30%), relevance of the role (25%), responsibilities and \
impact (25%) and duration (20%).
Thin descriptions score 30-50. Substantial roles at well-known companies score 70-90.";

fn instructions(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Competitiveness => COMPETITIVENESS,
        PromptKind::SchoolRecommendations => SCHOOL_RECOMMENDATIONS,
        PromptKind::CaseAnalysis => CASE_ANALYSIS,
        PromptKind::ImprovementPlan => IMPROVEMENT_PLAN,
        PromptKind::ResearchScore => RESEARCH_SCORE,
        PromptKind::InternshipScore => INTERNSHIP_SCORE,
    }
}

pub fn system_prompt(kind: PromptKind) -> &'static str {
    if kind.expects_json() {
        JSON_ONLY_SYSTEM
    } else {
        SCORE_ONLY_SYSTEM
    }
}

/// Renders the user prompt for `kind` with `input` attached.
pub fn render(kind: PromptKind, input: &Value) -> String {
    let payload = match input {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    format!("{}\n\nInput:\n{}", instructions(kind), payload)
}
