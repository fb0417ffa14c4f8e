//! Command-line argument parsing for the kbchat CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// kbchat: terminal client for a knowledge-base chat backend.
#[derive(Parser, Debug)]
#[command(name = "kbchat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend URL (overrides KBCHAT_URL).
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Bearer token (overrides KBCHAT_TOKEN).
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Prefix stripped from streamed lines, or "none" (overrides KBCHAT_STRIP_PREFIX).
    #[arg(long, global = true)]
    pub strip_prefix: Option<String>,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the models answers can be generated with.
    Models,

    /// Manage agents.
    #[command(subcommand)]
    Agents(AgentCommands),

    /// Manage chats.
    #[command(subcommand)]
    Chats(ChatCommands),

    /// Send a message and stream the answer. Ctrl-C cancels.
    Send {
        /// Chat to continue; a new chat is created when omitted.
        #[arg(short, long)]
        chat: Option<String>,

        /// Agent or model to answer with (overrides KBCHAT_AGENT).
        #[arg(short, long)]
        agent: Option<String>,

        /// Rewrite the history from this message index on; the old text is
        /// reused when no message is given.
        #[arg(long, requires = "chat")]
        edit: Option<usize>,

        /// Upload a file and attach it to the message (repeatable).
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Message text.
        message: Vec<String>,
    },

    /// Manage the knowledge base.
    #[command(subcommand)]
    Kb(KbCommands),

    /// Log in and print the issued tokens as JSON.
    Login {
        username: String,

        /// Password.
        #[arg(long, env = "KBCHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Exchange a refresh token for new tokens, printed as JSON.
    Refresh {
        /// Refresh token.
        #[arg(env = "KBCHAT_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },

    /// Revoke a refresh token.
    Logout {
        /// Refresh token.
        #[arg(env = "KBCHAT_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },

    /// Change or reset a password.
    #[command(subcommand)]
    Password(PasswordCommands),

    /// Manage files attached to the next message.
    #[command(subcommand)]
    Files(FileCommands),

    /// Administer users (admin role only).
    #[command(subcommand)]
    Users(UserCommands),
}

/// Agent subcommands.
#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List agents.
    #[command(alias = "ls")]
    List,

    /// Show an agent.
    Show {
        /// Agent name.
        name: String,
    },

    /// Add an agent.
    Add {
        /// Agent name.
        name: String,

        #[command(flatten)]
        fields: AgentFields,
    },

    /// Update an agent; fields not given keep their value.
    Update {
        /// Agent name.
        name: String,

        /// New name.
        #[arg(long)]
        rename: Option<String>,

        #[command(flatten)]
        fields: AgentFields,
    },

    /// Delete an agent.
    #[command(alias = "rm")]
    Delete {
        /// Agent name.
        name: String,
    },
}

/// Editable agent fields.
#[derive(Args, Debug, Default)]
pub struct AgentFields {
    #[arg(long)]
    pub description: Option<String>,

    /// Model the agent answers with.
    #[arg(long)]
    pub model: Option<String>,

    /// System prompt; "-" reads stdin.
    #[arg(long)]
    pub system_prompt: Option<String>,
}

/// User administration subcommands.
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List users.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a user.
    Show {
        email: String,
    },

    /// Update a user; fields not given keep their value.
    Update {
        email: String,

        #[arg(long)]
        given_name: Option<String>,

        #[arg(long)]
        family_name: Option<String>,

        /// Replace the roles (repeatable).
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Delete a user.
    #[command(alias = "rm")]
    Delete {
        email: String,
    },
}

/// File subcommands.
#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// List uploaded files.
    #[command(alias = "ls")]
    List,

    /// Upload files.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete an uploaded file.
    #[command(alias = "rm")]
    Delete {
        /// File name.
        name: String,
    },
}

/// Password subcommands.
#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Change the password of the logged in user.
    Change {
        /// Current password.
        #[arg(long, env = "KBCHAT_PASSWORD", hide_env_values = true)]
        old: String,

        /// New password.
        #[arg(long, env = "KBCHAT_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },

    /// Mail a reset code to an address.
    ResetRequest {
        email: String,
    },

    /// Set a new password with a mailed reset code.
    Reset {
        email: String,

        /// Reset code from the mail.
        #[arg(long)]
        code: String,

        /// New password.
        #[arg(long, env = "KBCHAT_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
}

/// Chat subcommands.
#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// List chats.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a chat with its history.
    Show {
        /// Chat id.
        id: String,
    },

    /// Delete a chat.
    #[command(alias = "rm")]
    Delete {
        /// Chat id.
        id: String,
    },
}

/// Knowledge base subcommands.
#[derive(Subcommand, Debug)]
pub enum KbCommands {
    /// List items.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show an item.
    Show {
        /// Item id.
        id: String,
    },

    /// Add an item.
    Add {
        /// Title.
        title: String,

        #[command(flatten)]
        fields: KbFields,
    },

    /// Update an item; fields not given keep their value.
    Update {
        /// Item id.
        id: String,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: KbFields,
    },

    /// Delete an item.
    #[command(alias = "rm")]
    Delete {
        /// Item id.
        id: String,
    },

    /// Find the items closest to a query.
    Search {
        /// Query text.
        text: Vec<String>,
    },
}

/// Editable knowledge base fields.
#[derive(Args, Debug, Default)]
pub struct KbFields {
    /// Content text; "-" reads stdin.
    #[arg(long)]
    pub content: Option<String>,

    /// Keyword (repeatable).
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Metadata entry as key=value (repeatable).
    #[arg(short, long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
}

/// Filter, sort and paging options of list commands.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive text filter.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Sort column; prefix with '-' for descending.
    #[arg(short, long, allow_hyphen_values = true)]
    pub sort: Option<String>,

    /// Page number, starting at 1.
    #[arg(short, long)]
    pub page: Option<usize>,

    /// Rows per page.
    #[arg(long)]
    pub per_page: Option<usize>,

    /// Listing state as printed after a page, e.g. "q=refund&order=-title&page=2".
    /// Other flags override its values.
    #[arg(long)]
    pub query: Option<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}
