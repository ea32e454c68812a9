use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use millplan::{
    init_logging, Document, MachiningPlanPipeline, PlanHost, PlannerConfig, PrismaticPart,
    Report, SetupSheet, ToolCatalog, ToolCategory, BUILD_DATE, VERSION,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Automatic machining-strategy planner for 2.5D sheet parts
#[derive(Parser, Debug)]
#[command(name = "millplan", version)]
struct Cli {
    /// Planner configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Log debug messages
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the operations for a part
    Plan {
        /// Part description (JSON)
        part: PathBuf,

        /// Tool catalog, overrides the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Material, overrides the configured one
        #[arg(long)]
        material: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Overwrite an existing program without asking
        #[arg(long)]
        yes: bool,
    },
    /// Inspect a tool catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogAction {
    /// List the tools of one or all materials
    List {
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[arg(long)]
        material: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print every setting
    Show,
    /// Print the configuration file location
    Path,
    /// Change one setting and save the file
    Set { key: String, value: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Setup sheet
    Text,
    /// Full program as JSON
    Json,
}

/// Host that reports on stderr and asks on stdin unless told to overwrite
struct ConsoleHost {
    assume_yes: bool,
}

impl PlanHost for ConsoleHost {
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", question);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }

    fn report(&mut self, report: Report) {
        match report {
            Report::Failure(message) => eprintln!("Planning failed:\n{}", message),
            Report::Warnings(message) => eprintln!("Warnings:\n{}", message),
        }
    }

    fn progress(&mut self, percent: u32, message: &str) {
        debug!("{:>3}% {}", percent, message);
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(PlannerConfig::default_path()?),
    }
}

fn load_catalog(explicit: Option<&Path>, config: &PlannerConfig) -> Result<ToolCatalog> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| config.catalog_path.clone())
        .context("No tool catalog given: pass --catalog or set catalog_path")?;
    let catalog = ToolCatalog::load_from_file(&path)
        .with_context(|| format!("Failed to load tool catalog {}", path.display()))?;
    Ok(catalog)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            Ok(())
        }
    }
}

fn plan(
    config: &mut PlannerConfig,
    part: &Path,
    catalog: Option<&Path>,
    material: Option<String>,
    format: OutputFormat,
    output: Option<&Path>,
    yes: bool,
) -> Result<()> {
    if let Some(material) = material {
        config.material = material;
    }
    let catalog = load_catalog(catalog, config)?;
    let part = PrismaticPart::load_from_file(part)?;
    let mut document = Document::with_solid(part);
    let mut host = ConsoleHost { assume_yes: yes };
    let mut sheet = SetupSheet::default();

    let outcome = MachiningPlanPipeline::new(config, &catalog).run(
        &mut document,
        &mut host,
        Some(&mut sheet),
    )?;
    if let Some(failure) = outcome.failure {
        bail!("{}", failure);
    }
    info!(
        "{} operations, {} tools, {} warnings",
        outcome.operations_added,
        outcome.tools_added,
        outcome.warnings.len()
    );

    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&document.program)? + "\n",
        OutputFormat::Text => match &document.program.output {
            Some(sheet) => sheet.clone(),
            None => SetupSheet::default().render(&document.program)?,
        },
    };
    write_output(output, &text)
}

fn list_catalog(config: &PlannerConfig, catalog: Option<&Path>, material: Option<&str>) -> Result<()> {
    let catalog = load_catalog(catalog, config)?;
    let names: Vec<&str> = match material {
        Some(material) => vec![material],
        None => catalog.material_names(),
    };
    for name in names {
        println!("{}", name);
        for category in [ToolCategory::SlotCutter, ToolCategory::Drill] {
            let cutters = catalog.load_for_material(category, name);
            if cutters.is_empty() {
                continue;
            }
            println!("  {}", category.plural());
            for tool in cutters.tools() {
                println!(
                    "    {:<20} length {:>5.1}  feed {:>6.0}  rest {}",
                    tool.name(),
                    tool.cutting_length,
                    tool.hfeed,
                    if tool.rest_machining { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    init_logging(level, cli.log_json)?;
    debug!("millplan {} built {}", VERSION, BUILD_DATE);

    let path = config_path(&cli)?;
    match &cli.command {
        Command::Plan {
            part,
            catalog,
            material,
            format,
            output,
            yes,
        } => {
            let mut config = PlannerConfig::load_or_default(&path)?;
            plan(
                &mut config,
                part,
                catalog.as_deref(),
                material.clone(),
                *format,
                output.as_deref(),
                *yes,
            )
        }
        Command::Catalog {
            action: CatalogAction::List { catalog, material },
        } => {
            let config = PlannerConfig::load_or_default(&path)?;
            list_catalog(&config, catalog.as_deref(), material.as_deref())
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let config = PlannerConfig::load_or_default(&path)?;
                print!("{}", settings_listing(&config)?);
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", path.display());
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                let mut config = PlannerConfig::load_or_default(&path)?;
                config.set(key, value)?;
                config.save_to_file(&path)?;
                info!("Set {} = {} in {}", key, value, path.display());
                Ok(())
            }
        },
    }
}

/// One `key = value` line per setting
fn settings_listing(config: &PlannerConfig) -> Result<String> {
    let mut out = String::new();
    for key in millplan_settings::CONFIG_KEYS {
        out.push_str(&format!("{} = {}\n", key, config.get(key)?));
    }
    Ok(out)
}
