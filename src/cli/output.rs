//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use std::fmt::Write;

use serde::Serialize;

use crate::client::ClientError;
use crate::models::{
    Agent, AgentListing, ChatMessageFile, ChatSession, ChatSessionHeader, KnowledgeBaseItem,
    User, UserHeader,
};
use crate::table::{TableDataSource, TableRow};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Serialize)]
struct PageJson<'a, T: Serialize> {
    rows: &'a [&'a T],
    total: usize,
    page: usize,
    page_count: usize,
    /// State of the listing as a query string, reusable with `--query`
    query: String,
}

/// Render the current page of `source`, one `row` call per row in text mode.
fn format_table<T, F>(
    source: &TableDataSource<T>,
    format: OutputFormat,
    noun: &str,
    row: F,
) -> String
where
    T: TableRow + Serialize,
    F: Fn(&mut String, &T),
{
    let page = source.page();
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for item in page.rows.iter().copied() {
                row(&mut output, item);
            }
            let _ = write!(
                output,
                "-- page {}/{} ({} {noun})",
                page.page_index + 1,
                page.page_count,
                page.total
            );
            let query = source.state.to_query();
            if !query.is_empty() {
                let _ = write!(output, "  ?{query}");
            }
            output.push('\n');
            output
        }
        OutputFormat::Json => format_json(&PageJson {
            rows: &page.rows,
            total: page.total,
            page: page.page_index + 1,
            page_count: page.page_count,
            query: source.state.to_query(),
        }),
    }
}

pub fn format_models(models: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => models.iter().map(|m| format!("{m}\n")).collect(),
        OutputFormat::Json => format_json(&models),
    }
}

pub fn format_agents(agents: &[AgentListing], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for agent in agents {
                if agent.description().is_empty() {
                    let _ = writeln!(output, "{}", agent.name());
                } else {
                    let _ = writeln!(output, "{:<20} {}", agent.name(), agent.description());
                }
            }
            output
        }
        OutputFormat::Json => format_json(&agents),
    }
}

pub fn format_chat_list(
    source: &TableDataSource<ChatSessionHeader>,
    format: OutputFormat,
) -> String {
    format_table(source, format, "chats", |output, chat| {
        let _ = writeln!(
            output,
            "{}  {}  {}",
            chat.created.format("%Y-%m-%d %H:%M"),
            chat.chat_session_id,
            chat.summary.as_deref().unwrap_or("")
        );
    })
}

pub fn format_chat(session: &ChatSession, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(
                output,
                "Chat {} ({})",
                session.id(),
                session.header.created.format("%Y-%m-%d %H:%M")
            );
            if let Some(summary) = session.header.summary.as_deref().filter(|s| !s.is_empty()) {
                let _ = writeln!(output, "{summary}");
            }
            for (index, message) in session.history.iter().enumerate() {
                let _ = writeln!(output, "\n[{index}] {}", message.author);
                for file in &message.files {
                    let _ = writeln!(output, "  attached: {} ({})", file.name, file.mime_type);
                }
                let _ = writeln!(output, "{}", message.text());
            }
            output
        }
        OutputFormat::Json => format_json(session),
    }
}

fn kb_row(output: &mut String, item: &KnowledgeBaseItem) {
    let _ = write!(
        output,
        "{:<10} {}",
        item.item_id.as_deref().unwrap_or("-"),
        item.title
    );
    if !item.keywords.is_empty() {
        let _ = write!(output, "  [{}]", item.keywords.join(", "));
    }
    output.push('\n');
}

pub fn format_kb_list(source: &TableDataSource<KnowledgeBaseItem>, format: OutputFormat) -> String {
    format_table(source, format, "items", kb_row)
}

pub fn format_kb_results(items: &[KnowledgeBaseItem], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for item in items {
                kb_row(&mut output, item);
            }
            output
        }
        OutputFormat::Json => format_json(&items),
    }
}

pub fn format_kb_item(item: &KnowledgeBaseItem, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "{}", item.title);
            let _ = writeln!(output, "  id:       {}", item.item_id.as_deref().unwrap_or("-"));
            if !item.keywords.is_empty() {
                let _ = writeln!(output, "  keywords: {}", item.keywords.join(", "));
            }
            for (key, value) in &item.metadata {
                let _ = writeln!(output, "  {key}: {value}");
            }
            if !item.content.is_empty() {
                let _ = writeln!(output, "\n{}", item.content);
            }
            output
        }
        OutputFormat::Json => format_json(item),
    }
}

pub fn format_agent(agent: &Agent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "{}", agent.name);
            if !agent.description.is_empty() {
                let _ = writeln!(output, "  description: {}", agent.description);
            }
            let _ = writeln!(output, "  model:       {}", agent.model_name);
            if !agent.system_prompt.is_empty() {
                let _ = writeln!(output, "\n{}", agent.system_prompt);
            }
            output
        }
        OutputFormat::Json => format_json(agent),
    }
}

pub fn format_user_list(source: &TableDataSource<UserHeader>, format: OutputFormat) -> String {
    format_table(source, format, "users", |output, user| {
        let _ = write!(output, "{:<32} {}", user.email, user.display_name());
        if !user.roles.is_empty() {
            let _ = write!(output, "  [{}]", user.roles.join(", "));
        }
        output.push('\n');
    })
}

pub fn format_user(user: &User, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "{}", user.email);
            let _ = writeln!(output, "  id:          {}", user.user_id);
            if let Some(given) = &user.given_name {
                let _ = writeln!(output, "  given name:  {given}");
            }
            if let Some(family) = &user.family_name {
                let _ = writeln!(output, "  family name: {family}");
            }
            let _ = writeln!(output, "  roles:       {}", user.roles.join(", "));
            let terms = if user.terms_accepted {
                "accepted"
            } else {
                "not accepted"
            };
            let _ = writeln!(output, "  terms:       {terms}");
            output
        }
        OutputFormat::Json => format_json(user),
    }
}

pub fn format_files(files: &[ChatMessageFile], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => files
            .iter()
            .map(|file| format!("{:<32} {}\n", file.name, file.mime_type))
            .collect(),
        OutputFormat::Json => format_json(&files),
    }
}

/// Formats an error, with a recovery hint for client errors in text mode.
///
/// Broken answer streams carry their own message and a stable error code.
pub fn format_error(error: &color_eyre::Report, format: OutputFormat) -> String {
    let client_error = error.downcast_ref::<ClientError>();
    let stream_error = match client_error {
        Some(ClientError::Stream(e)) => Some(e),
        _ => None,
    };
    match format {
        OutputFormat::Text => {
            let mut output = format!("{error}");
            if let Some(e) = stream_error {
                let _ = write!(output, "\n  {}", e.user_message());
            }
            if let Some(e) = client_error {
                let _ = write!(output, "\n  hint: {}", e.category().recovery_hint());
            }
            output
        }
        OutputFormat::Json => {
            let category = client_error.map(|e| e.category().as_str());
            format_json(&serde_json::json!({
                "error": error.to_string(),
                "category": category,
                "code": stream_error.map(|e| e.error_code()),
            }))
        }
    }
}

pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}")) + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::table::{SortSpec, TableState};

    fn items() -> Vec<KnowledgeBaseItem> {
        let mut item = KnowledgeBaseItem::new("Refunds", "Within 30 days");
        item.item_id = Some("7".to_string());
        item.keywords = vec!["money".to_string(), "returns".to_string()];
        vec![item, KnowledgeBaseItem::new("Shipping", "")]
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_kb_list_text() {
        let source = TableDataSource::new(items());
        let text = format_kb_list(&source, OutputFormat::Text);
        assert!(text.contains("Refunds  [money, returns]"));
        assert!(text.contains("-          Shipping"));
        assert!(text.ends_with("-- page 1/1 (2 items)\n"));
    }

    #[test]
    fn test_kb_list_json() {
        let source = TableDataSource::new(items());
        let json = format_kb_list(&source, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["page"], 1);
        assert_eq!(value["rows"][0]["item_id"], "7");
        assert_eq!(value["query"], "");
    }

    #[test]
    fn test_kb_list_footer_carries_query() {
        let mut state = TableState::default();
        state.set_filter("refunds");
        state.sort = Some(SortSpec::desc("title"));
        let source = TableDataSource::new(items()).with_state(state);

        let text = format_kb_list(&source, OutputFormat::Text);
        assert!(text.ends_with("-- page 1/1 (1 items)  ?q=refunds&order=-title\n"));

        let json = format_kb_list(&source, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["query"], "q=refunds&order=-title");
    }

    #[test]
    fn test_user_list_text() {
        let users: Vec<UserHeader> = serde_json::from_str(
            r#"[{"email":"jan@x.io","given_name":"Jan","family_name":"Kos","roles":["admin"]},
                {"email":"ola@x.io"}]"#,
        )
        .unwrap();
        let text = format_user_list(&TableDataSource::new(users), OutputFormat::Text);
        assert!(text.contains("Jan Kos  [admin]"));
        assert!(text.contains("ola@x.io"));
        assert!(text.ends_with("(2 users)\n"));
    }

    #[test]
    fn test_stream_error_message_and_code() {
        let report = color_eyre::Report::new(ClientError::Stream(StreamError::Timeout {
            message: "idle".to_string(),
        }));
        let text = format_error(&report, OutputFormat::Text);
        assert!(text.contains(&StreamError::Timeout { message: String::new() }.user_message()));

        let json = format_error(&report, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["code"], "E_STREAM_TIMEOUT");
        assert_eq!(value["category"], "network");
    }

    #[test]
    fn test_models_text() {
        let models = vec!["gpt".to_string(), "gemini".to_string()];
        assert_eq!(format_models(&models, OutputFormat::Text), "gpt\ngemini\n");
    }

    #[test]
    fn test_error_hint() {
        let report = color_eyre::Report::new(ClientError::ServerError {
            status: 401,
            message: "expired".to_string(),
        });
        let text = format_error(&report, OutputFormat::Text);
        assert!(text.contains("401"));
        assert!(text.contains("hint:"));

        let json = format_error(&report, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["category"], "auth");
        assert!(value["code"].is_null());
    }
}
