mod cli;
mod client;
mod color;
mod config;
mod credentials;
mod insights;
mod providers;
mod records;
mod schema;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{
    export::export_cmd, generate::generate_cmd, key::key_cmd, list::list_cmd,
    provider::provider_cmd, repl::repl_cmd, schema::schema_cmd, ColorMode,
};
use providers::ProviderIdentifier;
use tracing_subscriber::EnvFilter;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "nlsql")]
#[command(
    about = "Turn natural-language prompts into SQL with hosted chat models",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, global = true, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a prompt into SQL
    Generate(GenerateArgs),
    /// Translate prompts interactively
    Repl(ReplArgs),
    /// Manage provider API keys
    #[command(subcommand)]
    Key(KeyCommand),
    /// Select the provider used for generation
    #[command(subcommand)]
    Provider(ProviderCommand),
    /// List providers, saved queries or saved schemas
    List(ListArgs),
    /// Manage saved schemas
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Export saved queries or schemas as JSON
    Export(ExportArgs),
}

/// Where the schema for a prompt comes from
#[derive(clap::Args, Default)]
pub(crate) struct SchemaSource {
    /// Read the schema from a .sql, .txt, .json or .csv file
    #[arg(short, long, conflicts_with = "schema_name")]
    schema: Option<PathBuf>,
    /// Use a previously saved schema
    #[arg(short = 'n', long)]
    schema_name: Option<String>,
}

#[derive(Parser, Default)]
pub(crate) struct GenerateArgs {
    /// Use this provider instead of the selected one
    #[arg(short, long)]
    provider: Option<ProviderIdentifier>,
    #[command(flatten)]
    source: SchemaSource,
    /// Do not save the generated query
    #[arg(long)]
    no_save: bool,
    /// Do not print optimization hints after the query
    #[arg(long)]
    no_insights: bool,
    /// The natural-language prompt; read from standard input when omitted
    prompt: Option<String>,
}

#[derive(Parser, Default)]
pub(crate) struct ReplArgs {
    #[command(flatten)]
    source: SchemaSource,
    /// Do not save generated queries
    #[arg(long)]
    no_save: bool,
    /// Do not print optimization hints after each query
    #[arg(long)]
    no_insights: bool,
}

#[derive(Subcommand)]
pub(crate) enum KeyCommand {
    /// Save the API key for a provider
    Set {
        provider: ProviderIdentifier,
        /// The key; read from standard input when omitted
        secret: Option<String>,
    },
    /// Forget the API key for a provider
    Remove { provider: ProviderIdentifier },
}

#[derive(Subcommand)]
pub(crate) enum ProviderCommand {
    /// Make a provider the active one
    Use { provider: ProviderIdentifier },
    /// Show the active provider
    Show,
}

#[derive(Parser, Default)]
pub(crate) struct SearchArgs {
    /// Only list records containing this text
    #[arg(short, long)]
    search: Option<String>,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Supported providers
    Providers,
    /// Saved queries
    Queries(SearchArgs),
    /// Saved schemas
    Schemas(SearchArgs),
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Subcommand)]
pub(crate) enum SchemaCommand {
    /// Save a schema file under a name
    Save {
        /// The schema file
        file: PathBuf,
        /// Name of the schema; defaults to the file name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print a saved schema
    Show { name: String },
}

#[derive(Clone, Copy, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ExportObject {
    Queries,
    Schemas,
}

#[derive(Parser)]
pub(crate) struct ExportArgs {
    /// What to export
    object: ExportObject,
    /// Write to this file instead of <object>_export_<date>.json
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    search: SearchArgs,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NLSQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    color::configure_color(ColorMode::resolve_auto(cli.color));

    init_tracing();

    let config = match config::read_config(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => die!("{}", utils::errors::describe(&err)),
    };

    match &cli.command {
        Commands::Generate(args) => generate_cmd(&config, args).await,
        Commands::Repl(args) => repl_cmd(&config, args).await,
        Commands::Key(cmd) => key_cmd(&config, cmd),
        Commands::Provider(cmd) => provider_cmd(&config, cmd),
        Commands::List(args) => list_cmd(&config, args).await,
        Commands::Schema(cmd) => schema_cmd(&config, cmd).await,
        Commands::Export(args) => export_cmd(&config, args).await,
    }
}
