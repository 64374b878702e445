mod convert;
mod export;
mod graph;
mod io_util;
mod order;
mod reverse;
mod schema;
mod validate;

pub use order::OrderJsonOutput;
pub use validate::{ValidateJsonOutput, ValidationIssue};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "merise")]
#[command(version)]
#[command(
    about = "Merise schema modeling: MCD to MLD conversion, reverse engineering and FK-ordered DDL",
    long_about = None
)]
pub struct Cli {
    /// Log conversion and ordering decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a conceptual schema (MCD) into a logical schema (MLD)
    Convert {
        /// Conceptual document (.yaml, .yml or .json)
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: sql, json, yaml, mermaid
        #[arg(short, long, default_value = "sql")]
        format: String,

        /// SQL dialect for --format sql: mysql, postgres, sqlite
        #[arg(short, long)]
        dialect: Option<String>,

        /// Type of derived foreign key columns (default: INT)
        #[arg(long)]
        fk_type: Option<String>,

        /// Give foreign key columns the type of the identifier they reference
        #[arg(long)]
        inherit_types: bool,

        /// YAML project config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Reverse-engineer a logical schema into a conceptual schema
    Reverse {
        /// Input .sql (supports .gz, .bz2, .xz, .zst) or logical document
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: yaml, json, mermaid
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Print tables in foreign key dependency order
    Order {
        /// Input .sql (supports .gz, .bz2, .xz, .zst) or schema document
        file: PathBuf,

        /// Referencing tables first (drop order)
        #[arg(long)]
        reverse: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// YAML project config, used when the input is conceptual
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate DDL with tables in dependency order
    Export {
        /// Input .sql (supports .gz, .bz2, .xz, .zst) or schema document
        file: PathBuf,

        /// Output SQL file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// SQL dialect: mysql, postgres, sqlite
        #[arg(short, long)]
        dialect: Option<String>,

        /// Write foreign keys as trailing ALTER TABLE statements
        #[arg(long)]
        alter_constraints: bool,

        /// Skip header comments
        #[arg(long)]
        no_header: bool,

        /// Drop and recreate the database first
        #[arg(long)]
        create_database: bool,

        /// Quote every identifier
        #[arg(long)]
        quote: bool,

        /// YAML project config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check a schema: dangling references, cycles, identifiers, associations
    Validate {
        /// Input .sql (supports .gz, .bz2, .xz, .zst) or schema document
        file: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate an entity-relationship diagram
    Graph {
        /// Input .sql (supports .gz, .bz2, .xz, .zst) or schema document
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: mermaid, dot, json (default: from extension, else mermaid)
        #[arg(short, long)]
        format: Option<String>,

        /// Only include tables matching these glob patterns (comma-separated)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude tables matching these glob patterns (comma-separated)
        #[arg(short, long)]
        exclude: Option<String>,

        /// Only show tables that are part of a foreign key cycle
        #[arg(long)]
        cycles_only: bool,

        /// DOT layout direction: lr, tb
        #[arg(long)]
        layout: Option<String>,

        /// Render the DOT output with Graphviz to the output file's format (png, svg, pdf)
        #[arg(long)]
        render: bool,

        /// Draw the logical schema of a conceptual input
        #[arg(long)]
        logical: bool,
    },

    /// Print JSON schemas for documents and --json outputs
    Schema {
        /// Schema name (default: list available names)
        name: Option<String>,

        /// Print every schema as one JSON object
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            file,
            output,
            format,
            dialect,
            fk_type,
            inherit_types,
            config,
        } => convert::run(file, output, format, dialect, fk_type, inherit_types, config),
        Commands::Reverse {
            file,
            output,
            format,
        } => reverse::run(file, output, format),
        Commands::Order {
            file,
            reverse,
            json,
            config,
        } => order::run(file, reverse, json, config),
        Commands::Export {
            file,
            output,
            dialect,
            alter_constraints,
            no_header,
            create_database,
            quote,
            config,
        } => export::run(
            file,
            output,
            dialect,
            alter_constraints,
            no_header,
            create_database,
            quote,
            config,
        ),
        Commands::Validate { file, json } => validate::run(file, json),
        Commands::Graph {
            file,
            output,
            format,
            tables,
            exclude,
            cycles_only,
            layout,
            render,
            logical,
        } => graph::run(
            file,
            output,
            format,
            tables,
            exclude,
            cycles_only,
            layout,
            render,
            logical,
        ),
        Commands::Schema { name, all } => schema::run(name, all),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "merise", &mut io::stdout());
            Ok(())
        }
    }
}
