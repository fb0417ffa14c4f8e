//! CLI command implementations.

use std::future::Future;
use std::io::{Read, Write};
use std::path::PathBuf;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::cli::args::{
    AgentCommands, AgentFields, ChatCommands, Cli, Commands, FileCommands, KbCommands, KbFields,
    ListArgs, PasswordCommands, UserCommands,
};
use crate::cli::output::{
    format_agent, format_agents, format_chat, format_chat_list, format_files, format_json,
    format_kb_item, format_kb_list, format_kb_results, format_models, format_user,
    format_user_list, OutputFormat,
};
use crate::client::{spawn_keepalive, ChatClient, ClientError};
use crate::config::{parse_prefix, ClientConfig};
use crate::conversation::{Conversation, TurnUpdate};
use crate::models::{Agent, KnowledgeBaseItem};
use crate::table::{SortSpec, TableDataSource, TableRow, TableState};

/// Merge command-line flags over the environment configuration.
pub fn resolve_config(cli: &Cli, base: ClientConfig) -> Result<ClientConfig> {
    let mut config = base;
    if let Some(url) = &cli.url {
        config = config.with_base_url(url.as_str());
    }
    if let Some(token) = &cli.token {
        config = config.with_access_token(token.as_str());
    }
    if let Some(prefix) = &cli.strip_prefix {
        config.decoder = config.decoder.with_prefix(parse_prefix(prefix)?);
    }
    Ok(config)
}

/// Executes the CLI command, writing results to `out`.
///
/// `cancel` resolves when the user asks to abort a streamed answer; only
/// `send` listens to it.
pub async fn execute<W, C>(cli: &Cli, config: ClientConfig, cancel: C, out: &mut W) -> Result<()>
where
    W: Write,
    C: Future<Output = ()>,
{
    let format = OutputFormat::parse(&cli.format);
    let client = ChatClient::from_config(&config);

    let output = match &cli.command {
        Commands::Models => format_models(&client.models().await?, format),
        Commands::Agents(command) => cmd_agents(&client, command, format).await?,
        Commands::Chats(command) => cmd_chats(&client, command, format).await?,
        Commands::Send {
            chat,
            agent,
            edit,
            files,
            message,
        } => {
            let request = SendRequest {
                chat: chat.as_deref(),
                agent: agent.as_deref().or(config.agent.as_deref()),
                edit: *edit,
                files,
                message: message.join(" "),
            };
            return cmd_send(&client, &config, request, format, cancel, out).await;
        }
        Commands::Kb(command) => cmd_kb(&client, command, format).await?,
        Commands::Login { username, password } => {
            format_json(&client.login(username, password).await?)
        }
        Commands::Refresh { refresh_token } => {
            format_json(&client.refresh_token(refresh_token).await?)
        }
        Commands::Logout { refresh_token } => {
            client.logout(refresh_token).await?;
            acknowledge(format, "Logged out", serde_json::json!({ "logged_out": true }))
        }
        Commands::Password(command) => cmd_password(&client, command, format).await?,
        Commands::Files(command) => cmd_files(&client, command, format).await?,
        Commands::Users(command) => cmd_users(&client, command, format).await?,
    };

    out.write_all(output.as_bytes())?;
    Ok(())
}

/// Text line in text mode, a JSON object otherwise.
fn acknowledge(format: OutputFormat, text: &str, json: serde_json::Value) -> String {
    match format {
        OutputFormat::Text => format!("{text}\n"),
        OutputFormat::Json => format_json(&json),
    }
}

fn table<T: TableRow>(rows: Vec<T>, args: &ListArgs) -> TableDataSource<T> {
    let mut state = args
        .query
        .as_deref()
        .map(TableState::from_query)
        .unwrap_or_default();
    if let Some(filter) = &args.filter {
        state.set_filter(filter);
    }
    if let Some(sort) = &args.sort {
        state.sort = SortSpec::parse(sort);
    }
    if let Some(page) = args.page {
        state.page_index = page.saturating_sub(1);
    }
    if let Some(per_page) = args.per_page.filter(|&n| n > 0) {
        state.page_size = per_page;
    }
    TableDataSource::new(rows).with_state(state)
}

async fn cmd_chats(
    client: &ChatClient,
    command: &ChatCommands,
    format: OutputFormat,
) -> Result<String> {
    match command {
        ChatCommands::List(args) => {
            let source = table(client.list_chats().await?, args);
            Ok(format_chat_list(&source, format))
        }
        ChatCommands::Show { id } => Ok(format_chat(&client.get_chat(id).await?, format)),
        ChatCommands::Delete { id } => {
            client.delete_chat(id).await?;
            Ok(match format {
                OutputFormat::Text => format!("Deleted chat {id}\n"),
                OutputFormat::Json => format_json(&serde_json::json!({ "deleted": id })),
            })
        }
    }
}

async fn cmd_kb(client: &ChatClient, command: &KbCommands, format: OutputFormat) -> Result<String> {
    match command {
        KbCommands::List(args) => {
            let source = table(client.kb_list().await?, args);
            Ok(format_kb_list(&source, format))
        }
        KbCommands::Show { id } => Ok(format_kb_item(&client.kb_get(id).await?, format)),
        KbCommands::Add { title, fields } => {
            let mut item = KnowledgeBaseItem::new(title.as_str(), "");
            apply_fields(&mut item, fields)?;
            Ok(format_kb_item(&client.kb_create(&item).await?, format))
        }
        KbCommands::Update { id, title, fields } => {
            let mut item = client.kb_get(id).await?;
            if let Some(title) = title {
                item.title = title.clone();
            }
            apply_fields(&mut item, fields)?;
            Ok(format_kb_item(&client.kb_update(id, &item).await?, format))
        }
        KbCommands::Delete { id } => {
            let deleted = client.kb_delete(id).await?;
            if !deleted {
                return Err(eyre!("Server refused to delete item {id}"));
            }
            Ok(match format {
                OutputFormat::Text => format!("Deleted item {id}\n"),
                OutputFormat::Json => format_json(&serde_json::json!({ "deleted": id })),
            })
        }
        KbCommands::Search { text } => {
            let query = text.join(" ");
            if query.trim().is_empty() {
                return Err(eyre!("Search text is empty"));
            }
            Ok(format_kb_results(&client.kb_find_nearest(&query).await?, format))
        }
    }
}

/// Resolve a text argument where "-" means stdin.
fn text_arg(value: &str) -> Result<String> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .wrap_err("Failed to read stdin")?;
    Ok(text)
}

fn apply_fields(item: &mut KnowledgeBaseItem, fields: &KbFields) -> Result<()> {
    if let Some(content) = &fields.content {
        item.content = text_arg(content)?;
    }
    if !fields.keywords.is_empty() {
        item.keywords = fields.keywords.clone();
    }
    item.metadata.extend(fields.metadata.iter().cloned());
    Ok(())
}

async fn cmd_agents(
    client: &ChatClient,
    command: &AgentCommands,
    format: OutputFormat,
) -> Result<String> {
    match command {
        AgentCommands::List => Ok(format_agents(&client.agents().await?, format)),
        AgentCommands::Show { name } => Ok(format_agent(&client.agent_get(name).await?, format)),
        AgentCommands::Add { name, fields } => {
            let model_name = fields
                .model
                .clone()
                .ok_or_else(|| eyre!("An agent needs a model; pass --model"))?;
            let mut agent = Agent {
                name: name.clone(),
                description: String::new(),
                model_name,
                system_prompt: String::new(),
            };
            apply_agent_fields(&mut agent, fields)?;
            Ok(format_agent(&client.agent_create(&agent).await?, format))
        }
        AgentCommands::Update {
            name,
            rename,
            fields,
        } => {
            let mut agent = client.agent_get(name).await?;
            if let Some(rename) = rename {
                agent.name = rename.clone();
            }
            apply_agent_fields(&mut agent, fields)?;
            Ok(format_agent(&client.agent_update(name, &agent).await?, format))
        }
        AgentCommands::Delete { name } => {
            client.agent_delete(name).await?;
            Ok(acknowledge(
                format,
                &format!("Deleted agent {name}"),
                serde_json::json!({ "deleted": name }),
            ))
        }
    }
}

fn apply_agent_fields(agent: &mut Agent, fields: &AgentFields) -> Result<()> {
    if let Some(description) = &fields.description {
        agent.description = description.clone();
    }
    if let Some(model) = &fields.model {
        agent.model_name = model.clone();
    }
    if let Some(prompt) = &fields.system_prompt {
        agent.system_prompt = text_arg(prompt)?;
    }
    Ok(())
}

async fn cmd_users(
    client: &ChatClient,
    command: &UserCommands,
    format: OutputFormat,
) -> Result<String> {
    match command {
        UserCommands::List(args) => {
            let source = table(client.users_list().await?, args);
            Ok(format_user_list(&source, format))
        }
        UserCommands::Show { email } => Ok(format_user(&client.user_get(email).await?, format)),
        UserCommands::Update {
            email,
            given_name,
            family_name,
            roles,
        } => {
            let mut user = client.user_get(email).await?;
            if given_name.is_some() {
                user.given_name = given_name.clone();
            }
            if family_name.is_some() {
                user.family_name = family_name.clone();
            }
            if !roles.is_empty() {
                user.roles = roles.clone();
            }
            Ok(format_user(&client.user_update(email, &user).await?, format))
        }
        UserCommands::Delete { email } => {
            if !client.user_delete(email).await? {
                return Err(eyre!("Server refused to delete user {email}"));
            }
            Ok(acknowledge(
                format,
                &format!("Deleted user {email}"),
                serde_json::json!({ "deleted": email }),
            ))
        }
    }
}

async fn cmd_files(
    client: &ChatClient,
    command: &FileCommands,
    format: OutputFormat,
) -> Result<String> {
    match command {
        FileCommands::List => Ok(format_files(&client.files_list().await?, format)),
        FileCommands::Upload { paths } => {
            let mut uploaded = Vec::with_capacity(paths.len());
            for path in paths {
                uploaded.push(client.files_upload_path(path).await?);
            }
            Ok(format_files(&uploaded, format))
        }
        FileCommands::Delete { name } => {
            client.files_delete(name).await?;
            Ok(acknowledge(
                format,
                &format!("Deleted file {name}"),
                serde_json::json!({ "deleted": name }),
            ))
        }
    }
}

async fn cmd_password(
    client: &ChatClient,
    command: &PasswordCommands,
    format: OutputFormat,
) -> Result<String> {
    match command {
        PasswordCommands::Change { old, new } => {
            client.change_password(old, new).await?;
            Ok(acknowledge(
                format,
                "Password changed",
                serde_json::json!({ "changed": true }),
            ))
        }
        PasswordCommands::ResetRequest { email } => {
            client.reset_password_request(email).await?;
            Ok(acknowledge(
                format,
                &format!("Reset code sent to {email}"),
                serde_json::json!({ "requested": email }),
            ))
        }
        PasswordCommands::Reset { email, code, new } => {
            client.reset_password(email, code, new).await?;
            Ok(acknowledge(
                format,
                "Password reset",
                serde_json::json!({ "reset": email }),
            ))
        }
    }
}

/// Arguments of a `send` command after defaults are applied.
#[derive(Debug)]
pub struct SendRequest<'a> {
    pub chat: Option<&'a str>,
    pub agent: Option<&'a str>,
    pub edit: Option<usize>,
    /// Local files uploaded and attached to the message
    pub files: &'a [PathBuf],
    pub message: String,
}

/// Post a message and write the answer to `out` as it streams in.
///
/// Text mode prints answer text and error blocks; JSON mode prints each
/// event as one JSON line. When `cancel` resolves first, the stream is
/// dropped, the question is removed from the saved history and echoed to
/// stderr so it can be sent again.
pub async fn cmd_send<W, C>(
    client: &ChatClient,
    config: &ClientConfig,
    request: SendRequest<'_>,
    format: OutputFormat,
    cancel: C,
    out: &mut W,
) -> Result<()>
where
    W: Write,
    C: Future<Output = ()>,
{
    let agent = match request.agent {
        Some(agent) => agent.to_string(),
        None => client
            .models()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("The server lists no models; pass --agent"))?,
    };

    let session = match request.chat {
        Some(id) => client.get_chat(id).await?,
        None => client.new_chat().await?,
    };
    let mut conversation = Conversation::new(session);
    eprintln!("chat {}", conversation.id());

    let mut message = request.message;
    let mut files = Vec::new();
    if let Some(index) = request.edit {
        let (old_text, old_files) = conversation
            .edit_from(index)
            .ok_or_else(|| eyre!("Chat has no message {index}"))?;
        if message.trim().is_empty() {
            message = old_text;
        }
        files = old_files;
    }

    if message.trim().is_empty() {
        return Err(eyre!("Message is empty"));
    }

    let _keepalive = spawn_keepalive(client.clone(), config.ping_interval);

    for path in request.files {
        let file = client.files_upload_path(path).await?;
        debug!(name = %file.name, mime_type = %file.mime_type, "Attached file");
        files.push(file);
    }

    if conversation.is_dirty() {
        client.put_chat(conversation.session()).await?;
        conversation.mark_saved();
    }

    let outgoing = conversation
        .begin_turn(&message, files)
        .ok_or_else(|| eyre!("Message is empty"))?;

    debug!(chat = conversation.id(), %agent, "Streaming answer");
    let mut events = client
        .send_message(conversation.id(), &agent, &outgoing)
        .await?;

    tokio::pin!(cancel);
    let cancelled = loop {
        tokio::select! {
            next = events.next() => match next {
                Some(Ok(event)) => {
                    let update = conversation.apply(&event);
                    match format {
                        OutputFormat::Json => {
                            writeln!(out, "{}", serde_json::to_string(&event)?)?;
                        }
                        OutputFormat::Text => match update {
                            TurnUpdate::Appended(text) => write!(out, "{text}")?,
                            TurnUpdate::Failed(block) => writeln!(out, "\n{block}")?,
                            TurnUpdate::Ignored => {}
                        },
                    }
                    out.flush()?;
                    // An error event ends the turn; the rest of the body is not read.
                    if !conversation.is_in_flight() {
                        break false;
                    }
                }
                Some(Err(e)) => {
                    conversation.complete();
                    return Err(ClientError::from(e).into());
                }
                None => break false,
            },
            _ = &mut cancel => break true,
        }
    };
    drop(events);

    if !cancelled {
        conversation.complete();
        if format == OutputFormat::Text {
            writeln!(out)?;
        }
        return Ok(());
    }

    let question = conversation.cancel();
    info!(chat = conversation.id(), "Answer cancelled");
    client.put_chat(conversation.session()).await?;
    conversation.mark_saved();
    if let Some(question) = question {
        eprintln!("\ncancelled; question was:\n{question}");
    }
    Ok(())
}
