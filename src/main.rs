use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use topokit::{
    init_logging, install_panic_hook, wait_until, EventBus, HostSurface, ModelViewer, NewProject,
    OptimizationRequest, Services, SettingsManager, SoftwareRendererFactory, BUILD_DATE, VERSION,
};
use topokit_ui::{project_line, render_chart};

#[derive(Parser, Debug)]
#[command(name = "topokit")]
#[command(about = "Manage topology-optimization projects, models and metrics", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json); the platform config directory is used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List or create projects
    #[command(subcommand)]
    Projects(ProjectCommands),
    /// Run the external optimizer on a model
    Optimize(OptimizeArgs),
    /// Load a model into an offscreen viewport
    View(ViewArgs),
    /// Fetch the optimization metrics of a project
    Metrics {
        /// Project identifier
        project_id: String,
    },
    /// Render an application page, e.g. `/` or `/project/3/results`
    Show(ShowArgs),
    /// Inspect the active configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ProjectCommands {
    /// List projects, newest first
    List {
        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a project
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    /// Model to optimize
    input: String,
    /// Destination of the optimized model; the configured default when omitted
    output: Option<String>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Model file (.gltf, .glb or .obj)
    model: String,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Frames to render before reporting
    #[arg(long, default_value = "1")]
    frames: u64,
    /// Write the last frame as PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Route path
    #[arg(default_value = "/")]
    route: String,
    /// Model shown on the optimize page
    #[arg(long)]
    model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the configuration file location
    Path,
    /// Print the active configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    install_panic_hook();
    debug!("TopoKit {} built {}", VERSION, BUILD_DATE);

    let settings = match &cli.config {
        Some(path) => SettingsManager::load_file(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        None => SettingsManager::load_or_default(),
    };

    match cli.command {
        Commands::Projects(cmd) => projects(&settings, cmd).await,
        Commands::Optimize(args) => optimize(&settings, args).await,
        Commands::View(args) => view(&settings, args).await,
        Commands::Metrics { project_id } => metrics(&settings, &project_id).await,
        Commands::Show(args) => show(&settings, args).await,
        Commands::Config(cmd) => config(&settings, cmd),
        Commands::Version => {
            println!("topokit {} ({})", VERSION, BUILD_DATE);
            Ok(())
        }
    }
}

async fn projects(settings: &SettingsManager, cmd: ProjectCommands) -> Result<()> {
    let services = Services::from_settings(settings)?;
    match cmd {
        ProjectCommands::List { json } => {
            let projects = services.bridge.list_projects().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects found.");
            } else {
                for project in &projects {
                    println!("{:>4}  {}", project.id, project_line(project));
                }
            }
        }
        ProjectCommands::Add { name, description } => {
            let mut new = NewProject::new(name);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            let project = services.store.insert(&new)?;
            info!("Created project {} ({})", project.id, project.name);
            println!("{}", project.id);
        }
    }
    Ok(())
}

async fn optimize(settings: &SettingsManager, args: OptimizeArgs) -> Result<()> {
    let services = Services::from_settings(settings)?;
    let output = args
        .output
        .unwrap_or_else(|| settings.config().optimizer.default_output.clone());
    let request = OptimizationRequest::new(args.input, output);

    let result = services
        .bridge
        .run_optimization(&request)
        .await
        .context("optimization failed")?;
    print!("{}", result.stdout);
    info!("Optimized model written to {}", request.output_path);
    Ok(())
}

async fn view(settings: &SettingsManager, args: ViewArgs) -> Result<()> {
    let config = settings.config();
    let width = args.width.unwrap_or(config.viewer.width);
    let height = args.height.unwrap_or(config.viewer.height);
    let mut viewer = ModelViewer::new(
        Arc::new(HostSurface::new(width, height)),
        Arc::new(SoftwareRendererFactory::new(config.viewer.background)),
        config.viewer.clone(),
        Arc::new(EventBus::new()),
    );
    viewer
        .show(Some(args.model.as_str()))
        .await
        .with_context(|| format!("could not display {}", args.model))?;

    let Some(session) = viewer.session().cloned() else {
        bail!("viewer has no session");
    };
    let frames = args.frames.max(1);
    let budget =
        Duration::from_millis(config.viewer.frame_interval_ms.max(1) * frames * 4 + 1000);
    if !wait_until(budget, || session.frames_rendered() >= frames).await {
        bail!("render loop produced {} of {} frames", session.frames_rendered(), frames);
    }

    let camera = session.camera();
    println!("Model:     {}", args.model);
    println!("Triangles: {}", session.triangle_count());
    if let Some(bounds) = session.asset_bounds() {
        let size = bounds.size();
        println!("Size:      {:.3} x {:.3} x {:.3}", size.x, size.y, size.z);
    }
    println!(
        "Camera:    ({:.3}, {:.3}, {:.3})",
        camera.position.x, camera.position.y, camera.position.z
    );
    println!("Frames:    {}", session.frames_rendered());

    if let Some(path) = &args.snapshot {
        let image = session.snapshot().context("renderer produced no frame")?;
        image
            .save(path)
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("Snapshot written to {}", path.display());
    }

    viewer.unmount();
    Ok(())
}

async fn metrics(settings: &SettingsManager, project_id: &str) -> Result<()> {
    let client = topokit::MetricsClient::from_settings(&settings.config().metrics)?;
    let record = client
        .fetch(project_id)
        .await
        .with_context(|| format!("could not fetch metrics for project {}", project_id))?;
    println!("{}", render_chart(&record));
    Ok(())
}

async fn show(settings: &SettingsManager, args: ShowArgs) -> Result<()> {
    let services = Services::from_settings(settings)?;
    let mut app = services.app_with_viewer(settings.config(), args.model);
    app.navigate(&args.route).await;
    println!("{}", app.render());
    Ok(())
}

fn config(settings: &SettingsManager, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Path => {
            let path = match settings.source() {
                Some(path) => path.to_path_buf(),
                None => SettingsManager::config_file_path()?,
            };
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            println!("{}", toml::to_string_pretty(settings.config())?);
        }
    }
    Ok(())
}
