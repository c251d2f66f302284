//! Pull SQL out of free-form LLM output.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_SQL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:sql)?\s*([\s\S]+?)```").unwrap());

const SQL_KEYWORDS: [&str; 8] =
    ["select", "insert", "update", "delete", "with", "create", "drop", "alter"];

/// Extract SQL from text that may wrap it in markdown fences, surround it with
/// prose, or be nothing but SQL.
///
/// Order of preference: first fenced block, then the lines that start with a
/// SQL keyword, then the whole text.
pub fn extract_sql(text: &str) -> String {
    if let Some(sql) = first_fenced_block(text) {
        return sql;
    }

    let sql_lines: Vec<&str> = text
        .lines()
        .filter(|line| {
            let lower = line.trim().to_lowercase();
            SQL_KEYWORDS.iter().any(|kw| lower.starts_with(kw))
        })
        .collect();
    if !sql_lines.is_empty() {
        return sql_lines.join("\n").trim().to_string();
    }

    text.trim().to_string()
}

/// Split a SQL-generation answer into `(sql, draft_summary)`.
///
/// With a fenced block the summary is whatever follows the last fence;
/// otherwise the first line is taken as SQL and the rest as summary.
pub fn parse_sql_response(output: &str) -> (String, String) {
    if let Some(sql) = first_fenced_block(output) {
        return (sql, text_after_last_fence(output));
    }

    let mut lines = output.lines();
    let sql = lines.next().unwrap_or_default().trim().to_string();
    let summary = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (sql, summary)
}

/// Split a judge answer into `(improved_sql, summary)`. Without a fenced block
/// the whole answer is the summary.
pub fn parse_judge_response(output: &str) -> (Option<String>, String) {
    match first_fenced_block(output) {
        Some(sql) => (Some(sql), text_after_last_fence(output)),
        None => (None, output.trim().to_string()),
    }
}

fn first_fenced_block(text: &str) -> Option<String> {
    FENCED_SQL_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn text_after_last_fence(text: &str) -> String {
    text.rsplit("```").next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_fenced_block() {
        let text = "Here you go:\n```sql\nSELECT * FROM product;\n```\nThat lists products.";
        assert_eq!(extract_sql(text), "SELECT * FROM product;");
    }

    #[test]
    fn extract_fence_is_case_insensitive_and_language_optional() {
        assert_eq!(extract_sql("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(extract_sql("```\nSELECT 2\n```"), "SELECT 2");
    }

    #[test]
    fn extract_falls_back_to_keyword_lines() {
        let text = "I would run\n  select name from customer\nwhere nothing else\nWITH x AS (select 1) select * from x";
        assert_eq!(
            extract_sql(text),
            "select name from customer\nWITH x AS (select 1) select * from x"
        );
    }

    #[test]
    fn extract_returns_whole_text_otherwise() {
        assert_eq!(extract_sql("  no sql here  "), "no sql here");
    }

    #[test]
    fn sql_response_with_fence_keeps_trailing_summary() {
        let output = "```sql\nSELECT COUNT(*) FROM customer\n```\nThere are 42 customers.";
        let (sql, summary) = parse_sql_response(output);
        assert_eq!(sql, "SELECT COUNT(*) FROM customer");
        assert_eq!(summary, "There are 42 customers.");
    }

    #[test]
    fn sql_response_without_fence_uses_first_line() {
        let (sql, summary) = parse_sql_response("SELECT 1\nOne row.\nDone.");
        assert_eq!(sql, "SELECT 1");
        assert_eq!(summary, "One row.\nDone.");

        let (sql, summary) = parse_sql_response("");
        assert!(sql.is_empty());
        assert!(summary.is_empty());
    }

    #[test]
    fn judge_response_without_sql_is_all_summary() {
        let (sql, summary) = parse_judge_response("  Revenue grew 10% in Q2.  ");
        assert!(sql.is_none());
        assert_eq!(summary, "Revenue grew 10% in Q2.");

        let (sql, summary) = parse_judge_response("```sql\nSELECT 2\n```\nBetter.");
        assert_eq!(sql.as_deref(), Some("SELECT 2"));
        assert_eq!(summary, "Better.");
    }
}
