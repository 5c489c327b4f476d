use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use bus_indexer::bus::{
    ContractDetector, CorrelationIndex, EventOrder, IndexBuilder, LineMarker, PointQuery,
};
use bus_indexer::config::BusConfig;
use bus_indexer::error::{BusError, Result};
use bus_indexer::index::FileId;
use bus_indexer::indexer::{IndicatifSink, ProgressReporter, Project, TracingSink};

#[derive(Parser)]
#[command(name = "bus-indexer")]
#[command(about = "Correlates event bus posts and observers across Java and Kotlin sources")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # List every (bus, event) pair of the current project
    bus-indexer index

    # Same, as JSON, events grouped by reversed name
    bus-indexer index ./app --format json --order reverse-name

    # Observers of the post call on line 42
    bus-indexer counterparts src/main/java/demo/Login.java --line 42

    # Navigation markers of one file
    bus-indexer markers src/main/kotlin/demo/Screen.kt
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub bus: ConfigArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the (bus, event) correlation index of a project
    Index {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Event order within each bus
        #[arg(long, value_enum, default_value_t = OrderArg::Name)]
        order: OrderArg,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Find the counterparts of the bus call at a position
    Counterparts {
        /// Source file containing the call
        file: PathBuf,

        /// 1-based line of the call
        #[arg(long)]
        line: u32,

        /// 0-based column, to pick one of several calls on a line
        #[arg(long)]
        column: Option<u32>,

        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// List navigation markers of a file
    Markers {
        /// Source file
        file: PathBuf,

        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

/// Bus configuration source and per-key overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Bus configuration file (defaults to bus-indexer.toml in the project root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fully qualified name of the bus interface
    #[arg(long, global = true)]
    pub interface: Option<String>,

    /// Name of the post method
    #[arg(long, global = true)]
    pub post_method: Option<String>,

    /// Name of the observe method
    #[arg(long, global = true)]
    pub observe_method: Option<String>,

    /// Fully qualified name of the observe extension function
    #[arg(long, global = true)]
    pub ext_observe: Option<String>,
}

impl ConfigArgs {
    pub fn load(&self, root: &Path) -> Result<BusConfig> {
        let mut config = BusConfig::load(root, self.config.as_deref())?;
        if let Some(interface) = &self.interface {
            config.bus_interface = interface.clone();
        }
        if let Some(post) = &self.post_method {
            config.post_method = post.clone();
        }
        if let Some(observe) = &self.observe_method {
            config.observe_method = observe.clone();
        }
        if let Some(ext) = &self.ext_observe {
            config.ext_observe_function = ext.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    Name,
    ReverseName,
    Scan,
}

impl From<OrderArg> for EventOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Name => EventOrder::Name,
            OrderArg::ReverseName => EventOrder::ReverseName,
            OrderArg::Scan => EventOrder::Scan,
        }
    }
}

fn load_project(root: &Path, args: &ConfigArgs) -> Result<(Arc<Project>, BusConfig)> {
    let config = args.load(root)?;
    let project = Project::load(root)?;
    tracing::debug!(
        "Loaded {} files, {} declarations",
        project.len(),
        project.table().len()
    );
    Ok((Arc::new(project), config))
}

fn resolve_file(project: &Project, file: &Path) -> Result<FileId> {
    project
        .find_file(file)
        .ok_or_else(|| BusError::FileNotFound(file.display().to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| BusError::Parse(e.to_string()))
}

pub async fn build_index(
    path: &Path,
    args: &ConfigArgs,
    order: EventOrder,
    format: OutputFormat,
    show_progress: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let (project, config) = load_project(path, args)?;
    let detector = Arc::new(ContractDetector::new(project.table(), &config));
    if !detector.is_available() {
        eprintln!(
            "Bus interface {} not found (or declared more than once); nothing to index",
            config.bus_interface
        );
    }

    let progress = if show_progress {
        ProgressReporter::new("Indexing bus events", Arc::new(IndicatifSink::new()))
    } else {
        ProgressReporter::new("Indexing bus events", Arc::new(TracingSink::default()))
    };

    let index = IndexBuilder::new(project, detector)
        .build(cancel, progress)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&index)?),
        OutputFormat::Text => print_index(&index, order),
    }
    Ok(())
}

fn print_index(index: &CorrelationIndex, order: EventOrder) {
    if index.is_empty() {
        println!("No bus events found");
        return;
    }
    for group in index.sorted(order) {
        println!("{} ({} events)", group.bus, group.events.len());
        for event in group.events {
            println!("  {}", event);
        }
    }
    println!(
        "\n{} buses, {} (bus, event) pairs",
        index.len(),
        index.pair_count()
    );
}

pub fn find_counterparts(
    root: &Path,
    args: &ConfigArgs,
    file: &Path,
    line: u32,
    column: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let (project, config) = load_project(root, args)?;
    let file_id = resolve_file(&project, file)?;
    let query = PointQuery::new(project, &config);

    let Some(site) = query.locate(file_id, line, column) else {
        eprintln!("No bus call at {}:{}", file.display(), line);
        return Ok(());
    };
    let targets = query.find_counterparts(&site);

    match format {
        OutputFormat::Json => println!(
            "{}",
            to_json(&serde_json::json!({ "site": site, "counterparts": targets }))?
        ),
        OutputFormat::Text => {
            match site.pair() {
                Some((bus, event)) => println!("{} {} on {} at {}", site.role, event, bus, site.location),
                None => println!(
                    "{} at {} (bus or event unresolved)",
                    site.role, site.location
                ),
            }
            if targets.is_empty() {
                println!("  no {}s", site.role.opposite().party());
            }
            for target in &targets {
                println!("  -> {}  {}", target, target.text);
            }
        }
    }
    Ok(())
}

pub fn list_markers(
    root: &Path,
    args: &ConfigArgs,
    file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let (project, config) = load_project(root, args)?;
    let file_id = resolve_file(&project, file)?;
    let markers = PointQuery::new(project, &config).markers(file_id);

    match format {
        OutputFormat::Json => println!("{}", to_json(&markers)?),
        OutputFormat::Text => print_markers(&markers),
    }
    Ok(())
}

fn print_markers(markers: &[LineMarker]) {
    if markers.is_empty() {
        println!("No bus calls in file");
        return;
    }
    for marker in markers {
        println!(
            "{}:{} [{}] {}",
            marker.location.line,
            marker.location.column + 1,
            marker.role,
            marker.tooltip
        );
        for target in &marker.targets {
            println!("    {}", target);
        }
    }
}
