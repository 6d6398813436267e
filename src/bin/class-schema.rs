//! Class Schema CLI
//!
//! Command-line interface for rendering class schemas and round-tripping
//! JSON Schema documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use class_schema::{
    load_document, load_registry, render_with_definitions, tool_call, JsonSchemaParser,
    JsonSchemaRenderer, Schema, SchemaError, SchemaFactory,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "CLASS_SCHEMA_LOG";

#[derive(Parser)]
#[command(name = "class-schema")]
#[command(about = "Render class metadata as JSON Schema and parse it back")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the JSON Schema for a type expression
    Render {
        /// Class registry manifest (JSON)
        registry: PathBuf,

        /// Class name or type expression (e.g. App\\User, int[], ?string)
        #[arg(value_name = "TYPE")]
        type_expr: String,

        /// Emit nested objects as $ref pointers with shared $defs
        #[arg(long)]
        refs: bool,

        /// Wrap the output in a function-calling envelope with this name
        #[arg(long)]
        tool: Option<String>,

        /// Description of the function-calling envelope
        #[arg(long, requires = "tool", default_value = "")]
        tool_description: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse a JSON Schema document and render it again
    Roundtrip {
        /// JSON Schema document
        schema: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            registry,
            type_expr,
            refs,
            tool,
            tool_description,
            pretty,
            output,
        } => run_render(RenderArgs {
            registry,
            type_expr,
            refs,
            tool,
            tool_description,
            pretty,
            output,
        }),
        Commands::Roundtrip { schema, pretty } => run_roundtrip(&schema, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging() {
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct RenderArgs {
    registry: PathBuf,
    type_expr: String,
    refs: bool,
    tool: Option<String>,
    tool_description: String,
    pretty: bool,
    output: Option<PathBuf>,
}

fn run_render(args: RenderArgs) -> Result<(), u8> {
    let registry = load_registry(&args.registry).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut factory = SchemaFactory::new(&registry).use_object_references(args.refs);
    let schema = factory
        .schema(args.type_expr.as_str())
        .map_err(report_schema_error)?;
    debug!(type_expr = %args.type_expr, refs = args.refs, "built schema");

    let document = if args.refs {
        render_with_definitions(&mut factory, &schema).map_err(report_schema_error)?
    } else {
        factory.to_json_schema(&schema)
    };

    let document = match &args.tool {
        Some(name) => tool_call(name, &args.tool_description, document),
        None => document,
    };

    write_output(&document, args.pretty, args.output)
}

fn run_roundtrip(path: &Path, pretty: bool) -> Result<(), u8> {
    let document = load_document(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let parsed = JsonSchemaParser::new()
        .parse(&document)
        .map_err(|e| report_schema_error(e.into()))?;
    let rendered = JsonSchemaRenderer::new().render(&Schema::from(parsed));

    write_output(&rendered, pretty, None)
}

fn report_schema_error(error: SchemaError) -> u8 {
    eprintln!("Error: {}", error);
    error.exit_code() as u8
}

fn write_output(document: &Value, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
