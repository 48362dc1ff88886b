use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use postercard::config::default_font_paths;
use postercard::render::output::poster_file_name;
use postercard::service::{ServiceState, serve};
use postercard::{
    Direction, PaletteTable, PosterJob, PosterRenderer, RasterizerConfig, RasterizerKind,
    RenderConfig, Rgb, ServiceConfig, create_rasterizer, parse_hex_color,
};

#[derive(Parser, Debug)]
#[command(name = "postercard", version)]
#[command(about = "Gradient poster cards with a glowing markdown panel")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Palette JSON file (array of {id, name, colors}).
    #[arg(long, global = true, default_value = "color_zh.json", env = "POSTERCARD_PALETTE")]
    palette: PathBuf,

    /// Directory for rendered posters.
    #[arg(
        long,
        global = true,
        default_value = "gradient_images",
        env = "POSTERCARD_OUTPUT_DIR"
    )]
    output_dir: PathBuf,

    /// Font file to try before the built-in search list (repeatable).
    #[arg(long = "font", global = true)]
    fonts: Vec<PathBuf>,

    /// Markdown rasterizer.
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = RasterizerKind::Glyph,
        env = "POSTERCARD_RASTERIZER"
    )]
    rasterizer: RasterizerKind,

    /// Headless browser executable for `--rasterizer browser`.
    #[arg(long, global = true, default_value = "chromium", env = "POSTERCARD_BROWSER")]
    browser: PathBuf,

    /// Browser run timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 30_000)]
    browser_timeout_ms: u64,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one poster to a PNG file.
    Render(RenderArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Palette id.
    id: i64,

    /// Markdown text, or `@path` to read it from a file.
    #[arg(long)]
    markdown: Option<String>,

    /// Panel color as `#RRGGBB`; invalid values fall back to white.
    #[arg(long, default_value = "#FFFFFF")]
    background_color: String,

    /// vertical, horizontal, diagonal or bottom-right.
    #[arg(long, default_value = "bottom-right")]
    direction: Direction,

    /// Output PNG path (default: <output-dir>/gradient_<id>_<name>.png).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0:5001", env = "POSTERCARD_LISTEN")]
    listen: SocketAddr,

    /// Tokio worker threads (defaults to the number of cores).
    #[arg(long, env = "POSTERCARD_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Return posters without also writing them under the output directory.
    #[arg(long)]
    no_persist: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    match cli.cmd {
        Command::Render(args) => cmd_render(&cli.global, args),
        Command::Serve(args) => cmd_serve(&cli.global, args),
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_renderer(global: &GlobalArgs) -> PosterRenderer {
    let mut font_paths = global.fonts.clone();
    font_paths.extend(default_font_paths());
    let raster_cfg = RasterizerConfig {
        kind: global.rasterizer,
        font_paths,
        browser: global.browser.clone(),
        browser_timeout: Duration::from_millis(global.browser_timeout_ms),
    };
    PosterRenderer::new(
        Arc::new(RenderConfig::default()),
        create_rasterizer(&raster_cfg),
    )
}

fn cmd_render(global: &GlobalArgs, args: RenderArgs) -> anyhow::Result<()> {
    let markdown = match args.markdown.as_deref() {
        Some(spec) => match spec.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("read markdown '{path}'"))?,
            None => spec.to_owned(),
        },
        None => String::new(),
    };

    let background = match parse_hex_color(&args.background_color) {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(
                value = %args.background_color,
                error = %err,
                "invalid background color, using #FFFFFF"
            );
            Rgb::WHITE
        }
    };

    let table = PaletteTable::load(&global.palette)?;
    let entry = table.find(args.id)?;
    let job = PosterJob {
        stops: entry.stops()?,
        direction: args.direction,
        background,
        markdown,
    };

    let renderer = build_renderer(global);
    let poster = renderer.render(&job).context("render poster")?;

    let out = args
        .output
        .unwrap_or_else(|| global.output_dir.join(poster_file_name(entry.id, &entry.name)));
    poster.save(&out)?;

    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_serve(global: &GlobalArgs, args: ServeArgs) -> anyhow::Result<()> {
    let state = Arc::new(ServiceState {
        renderer: build_renderer(global),
        config: ServiceConfig {
            palette_path: global.palette.clone(),
            output_dir: global.output_dir.clone(),
            persist_outputs: !args.no_persist,
        },
    });

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(serve(state, args.listen))
}
