use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TextToSqlRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing 'question' in request"))]
    #[schema(example = "Which product line has the most products?")]
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextToSqlAnswer {
    pub question: String,
    pub sql_query: String,
    pub result_markdown: String,
    pub summary: String,
    pub debug: TextToSqlDebug,
}

/// Raw prompts and completions of both LLM rounds
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TextToSqlDebug {
    pub llm_prompt: String,
    pub sql_response: String,
    pub judge_prompt: String,
    pub judge_response: Option<String>,
}

impl TextToSqlAnswer {
    /// Markdown rendering used by the CLI and light front ends
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if !self.summary.is_empty() {
            out.push_str(&self.summary);
            out.push_str("\n\n");
        }
        out.push_str("```sql\n");
        out.push_str(&self.sql_query);
        out.push_str("\n```\n\n");
        out.push_str(&self.result_markdown);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_has_summary_sql_and_table() {
        let answer = TextToSqlAnswer {
            question: "q".into(),
            sql_query: "SELECT 1 AS n".into(),
            result_markdown: "| n |\n|---|\n| 1 |".into(),
            summary: "One row.".into(),
            debug: TextToSqlDebug::default(),
        };
        assert_eq!(
            answer.to_markdown(),
            "One row.\n\n```sql\nSELECT 1 AS n\n```\n\n| n |\n|---|\n| 1 |"
        );
    }

    #[test]
    fn blank_question_fails_validation() {
        let req: TextToSqlRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());
    }
}
