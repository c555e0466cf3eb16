use std::{
    io::{BufWriter, Write as _},
    path::PathBuf,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rigforge", version)]
struct Cli {
    /// Settings JSON (naming tokens, containers, search paths).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List part and template definitions found on the search paths.
    Catalog(CatalogArgs),
    /// Inspect or replay template files.
    #[command(subcommand)]
    Template(TemplateCommand),
}

#[derive(Parser, Debug)]
struct CatalogArgs {
    /// Extra directories to scan, after the configured search paths.
    #[arg(long = "path")]
    paths: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Summarise the parts a template holds.
    Inspect(InspectArgs),
    /// Replay a template into an in-memory scene and write the recaptured result.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output template JSON. Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Space the recaptured transforms are written in.
    #[arg(long, value_enum, default_value_t = SpaceChoice::Local)]
    space: SpaceChoice,

    /// Keep the scene's shape points instead of the captured ones.
    #[arg(long)]
    no_shapes: bool,

    /// Keep the scene's shape colors instead of the captured ones.
    #[arg(long)]
    no_colors: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SpaceChoice {
    Local,
    World,
}

impl From<SpaceChoice> for rigforge::Space {
    fn from(s: SpaceChoice) -> Self {
        match s {
            SpaceChoice::Local => rigforge::Space::Local,
            SpaceChoice::World => rigforge::Space::World,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => rigforge::RigSettings::from_path(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => rigforge::RigSettings::default(),
    };
    match cli.cmd {
        Command::Catalog(args) => cmd_catalog(&settings, args),
        Command::Template(TemplateCommand::Inspect(args)) => cmd_inspect(args),
        Command::Template(TemplateCommand::Replay(args)) => cmd_replay(settings, args),
    }
}

fn cmd_catalog(settings: &rigforge::RigSettings, args: CatalogArgs) -> anyhow::Result<()> {
    let mut paths = settings.search_paths.clone();
    paths.extend(args.paths);
    let mut registry = rigforge::PartRegistry::with_builtins();
    registry.reload(&paths, settings.project.as_ref());

    let catalog = registry.catalog();
    for category in catalog.categories() {
        println!("{category}:");
        for entry in catalog.in_category(&category) {
            match &entry.path {
                Some(p) => println!("  {:<24} {:<8} {}", entry.part_type, entry.kind, p.display()),
                None => println!("  {:<24} {}", entry.part_type, entry.kind),
            }
        }
    }
    eprintln!("{} definitions", catalog.len());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let template = rigforge::Template::from_path(&args.in_path)
        .with_context(|| format!("read template '{}'", args.in_path.display()))?;
    for (i, entry) in template.template.iter().enumerate() {
        let data = &entry.part_data;
        println!(
            "{i:>3}  {:<16} {}_{:<16} transforms={} shapes={}",
            entry.part_type,
            entry.side(),
            entry.name(),
            data.transforms.len(),
            data.shapes.len()
        );
    }
    eprintln!("{} entries", template.len());
    Ok(())
}

fn cmd_replay(settings: rigforge::RigSettings, args: ReplayArgs) -> anyhow::Result<()> {
    let template = rigforge::Template::from_path(&args.in_path)
        .with_context(|| format!("read template '{}'", args.in_path.display()))?;
    let registry = rigforge::PartRegistry::from_settings(&settings);
    let mut ws = rigforge::Workspace::new(rigforge::MemoryScene::new(), settings)?;

    let opts = rigforge::ReplayOptions {
        set_shapes: !args.no_shapes,
        set_colors: !args.no_colors,
        ..rigforge::ReplayOptions::default()
    };
    let report = rigforge::replay(&mut ws, &registry, &template, &opts)?;
    for (part, err) in &report.failed {
        eprintln!("failed {part}: {err}");
    }
    if !report.missing_nodes.is_empty() {
        eprintln!("{} captured nodes were not rebuilt", report.missing_nodes.len());
    }

    let recaptured = rigforge::capture(&ws, &registry, args.space.into());
    match &args.out {
        Some(path) => {
            recaptured.save(path)?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            recaptured.to_writer_pretty(&mut w)?;
            writeln!(w).context("write stdout")?;
        }
    }
    if report.failed.is_empty() {
        Ok(())
    } else {
        let total = template.len();
        anyhow::bail!("{} of {total} entries failed to replay", report.failed.len())
    }
}

