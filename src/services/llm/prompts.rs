//! Prompt builders

use super::models::PromptMessage;

const SUMMARY_INSTRUCTIONS: &str = "Write a concise, business-friendly summary of the main finding in the result table above. \
Only state the insight from the data. Do not explain the SQL, do not mention the query, \
and do not add any assumptions or caveats.";

/// Schema and sample rows of one table, as shown to the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableContext {
    pub table: String,
    pub columns: Vec<String>,
    /// One rendered line per sample row
    pub sample_rows: Vec<String>,
}

/// System messages opening every chat. Relevant table descriptions are
/// appended when retrieval found any.
pub fn chat_prompt(schema_context: &[String]) -> Vec<PromptMessage> {
    let mut content = String::from("You are a helpful assistant.");
    if !schema_context.is_empty() {
        content.push_str(
            "\n\nYou can query the analytics database with the text_to_sql tool, which takes \
             a SQLite query. The most relevant tables are:\n",
        );
        for description in schema_context {
            content.push_str("- ");
            content.push_str(description);
            content.push('\n');
        }
        content.truncate(content.trim_end().len());
    }
    vec![PromptMessage::system(content)]
}

pub fn build_sql_prompt(context: &[TableContext], question: &str) -> String {
    let mut lines = Vec::new();
    for t in context {
        lines.push(format!("Table {}: columns {}", t.table, t.columns.join(", ")));
        if !t.sample_rows.is_empty() {
            lines.push(format!("Sample {} rows:", t.table));
            lines.extend(t.sample_rows.iter().cloned());
        }
    }

    format!(
        "You are an expert data analyst. Generate a SQLite SQL query to answer the following question, \
         using the provided database schema and sample data. After the SQL, provide a plain-English \
         summary of the answer.\n\n{}\n\nUser Question: {}\n\nSQL:",
        lines.join("\n"),
        question
    )
}

pub fn build_judge_prompt(result_markdown: &str) -> String {
    format!(
        "Result table:\n{}\n\n{} Do not mention `The SQL query provided does answer the question correctly...`",
        result_markdown, SUMMARY_INSTRUCTIONS
    )
}

pub fn summarize_prompt(question: &str, sql: &str, result_markdown: &str) -> String {
    format!(
        "User question: {}\nSQL query run: {}\nResult table:\n{}\n\n{}",
        question, sql, result_markdown, SUMMARY_INSTRUCTIONS
    )
}
