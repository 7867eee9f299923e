use std::path::PathBuf;

use clap::{Parser, Subcommand};

use prd_studio::keys::AiProvider;
use prd_studio::models::{ConversationStatus, DeviceType, ExportFormat, SearchKind};

#[derive(Parser)]
#[command(name = "prd_studio")]
#[command(version, about = "Terminal client for the PRD authoring service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Service base URL
    #[arg(long, global = true, env = "PRD_API_BASE_URL")]
    pub api_url: Option<String>,

    /// Provider key file (defaults to <config dir>/prd-studio/api_keys.json)
    #[arg(long, global = true, env = "PRD_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project management
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Reference material uploads
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Knowledge base
    Kb {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },

    /// Conversation management
    Conversations {
        #[command(subcommand)]
        command: ConversationCommands,
    },

    /// Chat in a conversation
    Chat(ChatArgs),

    /// Export a conversation as a PRD document
    Export(ExportArgs),

    /// Section-by-section PRD drafts
    Prd {
        #[command(subcommand)]
        command: PrdCommands,
    },

    /// AI provider selection
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },

    /// Generate an HTML wireframe for a conversation
    Wireframe(WireframeArgs),

    /// Local provider API keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Time estimates for uploads and knowledge builds
    Estimate {
        #[command(subcommand)]
        command: EstimateCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects
    List,
    /// Create a project
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show a project
    Show { id: String },
    /// Rename or re-describe a project
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a project
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum FileCommands {
    /// Upload one or more files to a project
    Upload {
        project_id: String,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Run analysis right after each upload
        #[arg(long)]
        analyze: bool,
    },
    /// List a project's files
    List { project_id: String },
    /// Analyze an uploaded file
    Analyze { file_id: String },
    /// Delete an uploaded file
    Delete { file_id: String },
}

#[derive(Subcommand)]
pub enum KnowledgeCommands {
    /// Build the knowledge base from uploaded files
    Build {
        project_id: String,
        /// Files to include (all analyzed files when omitted)
        #[arg(long = "file")]
        file_ids: Vec<String>,
    },
    /// Show the knowledge base
    Show {
        project_id: String,
        /// Print the raw structured data as JSON
        #[arg(long)]
        raw: bool,
    },
    /// Replace the structured data from a JSON file
    Update {
        project_id: String,
        json_file: PathBuf,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Confirm the knowledge base
    Confirm {
        project_id: String,
        #[arg(long, default_value = "user")]
        by: String,
    },
    /// Search the knowledge base
    Search {
        project_id: String,
        query: String,
        #[arg(long)]
        module: Option<String>,
        #[arg(long = "type", value_enum)]
        kind: Option<SearchKind>,
    },
}

#[derive(Subcommand)]
pub enum ConversationCommands {
    /// List a project's conversations
    List { project_id: String },
    /// Start a conversation
    New {
        project_id: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Print a conversation with its messages
    Show { id: String },
    /// Change a conversation's status
    Status {
        id: String,
        #[arg(value_enum)]
        status: ConversationStatus,
        /// Ask the service to summarize the requirements
        #[arg(long)]
        summarize: bool,
    },
    /// Rename a conversation
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
}

#[derive(clap::Args)]
pub struct ChatArgs {
    pub conversation_id: String,

    /// Send one message and exit instead of starting an interactive session
    #[arg(short, long)]
    pub message: Option<String>,

    /// Image to attach (repeatable)
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,

    /// Wait for the whole reply instead of streaming it (with --message)
    #[arg(long, requires = "message", conflicts_with = "images")]
    pub no_stream: bool,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    pub conversation_id: String,

    #[arg(long, value_enum, default_value = "markdown")]
    pub format: ExportFormat,

    /// Write the document here instead of printing a markdown preview
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Leave the knowledge base out of the document
    #[arg(long)]
    pub without_knowledge_base: bool,
}

#[derive(Subcommand)]
pub enum PrdCommands {
    /// Generate an outline from the conversation
    Outline { conversation_id: String },
    /// Print the current draft
    Show { conversation_id: String },
    /// Replace a section's content
    Edit {
        conversation_id: String,
        section: String,
        content: String,
    },
    /// Regenerate one section
    Regenerate { conversation_id: String, section: String },
}

#[derive(Subcommand)]
pub enum AiCommands {
    /// List providers known to the service
    Providers,
    /// Show the provider the service currently uses
    Current,
    /// Switch the service's provider
    Select {
        #[arg(value_enum)]
        provider: AiProvider,
    },
    /// Check an API key against a provider
    Test {
        #[arg(value_enum)]
        provider: AiProvider,
        /// Key to test (the stored key when omitted)
        key: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct WireframeArgs {
    pub conversation_id: String,

    #[arg(long, value_enum, default_value = "mobile")]
    pub device: DeviceType,

    /// Uploaded file to use as a visual reference (repeatable)
    #[arg(long = "reference")]
    pub reference_file_ids: Vec<String>,

    /// Write the HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Show stored keys (masked)
    Show,
    /// Store a key for a provider
    Set {
        #[arg(value_enum)]
        provider: AiProvider,
        key: String,
    },
    /// Remove a provider's key
    Remove {
        #[arg(value_enum)]
        provider: AiProvider,
    },
    /// Choose which provider's key is sent with requests
    Default {
        #[arg(value_enum)]
        provider: AiProvider,
    },
    /// Delete every stored key
    Clear,
}

#[derive(Subcommand)]
pub enum EstimateCommands {
    /// Estimate upload and analysis time for local files
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Estimate knowledge base build time
    Build { file_count: usize },
}
