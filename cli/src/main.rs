//! texpipe CLI - document canonicalization and sandboxed LaTeX compilation

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use texpipe::compile::{compile_with_options, CompileOptions, CompileOutcome, Isolation};
use texpipe::schema::check;
use texpipe::{
    Dispatcher, Document, FormulaExtractor, JsonFormat, ParseOptions, ProjectRoot, Schema,
    SourceFormat,
};

#[derive(Parser)]
#[command(name = "texpipe")]
#[command(version)]
#[command(
    about = "Canonicalize documents, extract formula references and compile LaTeX in a sandbox",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a source document into validated JSON
    Parse {
        /// Source file (.docx, .doc, .odt, .md, .markdown, .txt, .text)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Schema definition (built-in schema if not specified)
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,

        /// Program that converts word-processor files to document JSON
        #[arg(long, value_name = "PROGRAM", env = "TEXPIPE_WORD_EXTRACTOR")]
        word_extractor: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Validate a document JSON file against a schema
    Validate {
        /// Document JSON file
        #[arg(value_name = "JSON")]
        input: PathBuf,

        /// Schema definition (built-in schema if not specified)
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
    },

    /// Extract formula references from a document JSON file
    Formulas {
        /// Document JSON file
        #[arg(value_name = "JSON")]
        input: PathBuf,

        /// Project root (discovered from the executable if not specified)
        #[arg(long, value_name = "DIR", env = "TEXPIPE_PROJECT_ROOT")]
        project_root: Option<PathBuf>,
    },

    /// Compile a LaTeX file inside a sandbox
    Compile {
        /// LaTeX source file
        #[arg(value_name = "TEX")]
        input: PathBuf,

        /// Template directory copied into the sandbox
        #[arg(long, value_name = "DIR")]
        template: PathBuf,

        /// Copy the resulting PDF here
        #[arg(short, long, value_name = "PDF")]
        output: Option<PathBuf>,

        /// Engine timeout in seconds
        #[arg(long, default_value = "120")]
        timeout: u64,

        /// Run the engine on the host instead of in a container
        #[arg(long)]
        host: bool,

        /// Container image
        #[arg(long, value_name = "IMAGE", env = "TEXPIPE_DOCKER_IMAGE")]
        image: Option<String>,

        /// Typesetting engine
        #[arg(long, default_value = "pdflatex")]
        engine: String,

        /// Keep the working directory
        #[arg(long)]
        keep: bool,

        /// Print the compilation record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show document information
    Info {
        /// Source file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the built-in schema
    Schema,

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Parse {
            input,
            output,
            schema,
            word_extractor,
            compact,
        }) => cmd_parse(
            &input,
            output.as_deref(),
            schema.as_deref(),
            word_extractor,
            compact,
        ),
        Some(Commands::Validate { input, schema }) => cmd_validate(&input, schema.as_deref()),
        Some(Commands::Formulas {
            input,
            project_root,
        }) => cmd_formulas(&input, project_root),
        Some(Commands::Compile {
            input,
            template,
            output,
            timeout,
            host,
            image,
            engine,
            keep,
            json,
        }) => {
            let isolation = match (host, image) {
                (true, _) => Isolation::Host,
                (false, Some(image)) => Isolation::docker(image),
                (false, None) => Isolation::default(),
            };
            let options = CompileOptions::new()
                .with_program(engine)
                .with_timeout(Duration::from_secs(timeout))
                .with_isolation(isolation);
            cmd_compile(&input, &template, output.as_deref(), &options, keep, json)
        }
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Schema) => cmd_schema(),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: texpipe <COMMAND>".yellow());
            println!("       texpipe --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_schema(path: Option<&Path>) -> texpipe::Result<Schema> {
    match path {
        Some(path) => Schema::load(path),
        None => Ok(Schema::default()),
    }
}

fn cmd_parse(
    input: &Path,
    output: Option<&Path>,
    schema: Option<&Path>,
    word_extractor: Option<PathBuf>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ParseOptions::new().with_schema(load_schema(schema)?);
    if let Some(program) = word_extractor {
        options = options.with_word_command(program);
    }

    let doc = Dispatcher::from_options(&options).parse(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = doc.to_json(format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_validate(input: &Path, schema: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(schema)?;
    let doc = Document::load(input)?;
    let violations = check(&doc, &schema);

    if violations.is_empty() {
        println!(
            "{} {} ({} blocks, schema v{})",
            "Valid".green().bold(),
            input.display(),
            doc.len(),
            schema.version
        );
        return Ok(());
    }

    println!("{} {}", "Invalid".red().bold(), input.display());
    for violation in &violations {
        println!("  {} {}", "-".dimmed(), violation);
    }
    Err(format!("{} violation(s)", violations.len()).into())
}

fn cmd_formulas(
    input: &Path,
    project_root: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = match project_root {
        Some(path) => ProjectRoot::new(path),
        None => ProjectRoot::discover(),
    };
    log::debug!("Writing formula list under {}", root.path().display());

    let list = FormulaExtractor::new(root).run(input)?;

    println!(
        "{} {} formula reference(s)",
        "Extracted".green().bold(),
        list.len()
    );
    for reference in &list.references {
        println!(
            "  {} [{}] {} ({})",
            "├─".dimmed(),
            reference.content_index,
            reference.image_path,
            reference.format
        );
    }
    println!("{} {}", "Saved to".green(), list.path.display());

    Ok(())
}

fn cmd_compile(
    input: &Path,
    template: &Path,
    output: Option<&Path>,
    options: &CompileOptions,
    keep: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(input)?;
    log::debug!("Compiling {} with {:?}", input.display(), options.isolation);
    let template = if template.is_absolute() {
        template.to_path_buf()
    } else {
        std::env::current_dir()?.join(template)
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Compiling {}...", input.display()));

    let compilation = compile_with_options(&source, &template, options)?;
    pb.finish_and_clear();

    let result = compilation.result();
    if let CompileOutcome::Success { pdf_path } = &compilation.outcome {
        if let Some(dest) = output {
            fs::copy(pdf_path, dest)?;
            println!("{} {}", "Saved to".green(), dest.display());
        } else if !keep {
            println!(
                "{} use -o to copy the PDF or --keep to retain the sandbox",
                "Note:".yellow()
            );
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}: {} ms", "Elapsed".bold(), result.elapsed_ms);
    }
    let error = compilation.error();
    if keep {
        let dir = compilation.sandbox.persist();
        println!("{}: {}", "Sandbox".bold(), dir.display());
    } else {
        compilation.sandbox.release()?;
    }

    match error {
        Some(e) => Err(e.into()),
        None => {
            println!("{}", "Compiled successfully".green().bold());
            Ok(())
        }
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = SourceFormat::from_path(input)?;
    let doc = texpipe::parse_file(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    for (key, value) in doc.metadata.iter() {
        match value.as_str() {
            Some(text) => println!("{}: {}", key.bold(), text),
            None => println!("{}: {}", key.bold(), value),
        }
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut counts = std::collections::BTreeMap::new();
    for block in &doc.content {
        *counts.entry(block.tag().to_string()).or_insert(0usize) += 1;
    }
    println!("{}: {}", "Blocks".bold(), doc.len());
    for (tag, count) in &counts {
        println!("  {} {}: {}", "├─".dimmed(), tag, count);
    }

    let text = doc.plain_text();
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());
    println!(
        "{}: {}",
        "Formulas".bold(),
        texpipe::extract_formulas(&doc).len()
    );

    Ok(())
}

fn cmd_schema() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", Schema::default().to_json()?);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "texpipe".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document canonicalization and sandboxed LaTeX compilation");
    println!();
    println!(
        "Formats: {}",
        SourceFormat::ALL
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("License: MIT");
}
