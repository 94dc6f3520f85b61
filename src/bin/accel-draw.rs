use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use accel_draw::{
    Area, BackendRegistry, BlitSupport, BoardConfig, BufferPool, Color32, ColorFormat, Dispatcher,
    DrawBackend as _, DrawTask, FillDsc, Gradient, GradientDir, ImageDsc, ImageTransform, Layer,
    MemoryPlacement, NoopCache, OPA_COVER, Surface,
};
use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "accel-draw", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a JSON scene through the dispatcher and write a PNG.
    Render(RenderArgs),
    /// Print the backends a board config registers.
    Caps(CapsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Board config JSON. Defaults to software plus all three accelerators.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run every hardware backend on its own worker thread.
    #[arg(long)]
    threaded: bool,
}

#[derive(Parser, Debug)]
struct CapsArgs {
    /// Board config JSON. Defaults to software plus all three accelerators.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(serde::Deserialize, Debug)]
struct SceneDef {
    width: u32,
    height: u32,
    #[serde(default = "default_format")]
    format: ColorFormat,
    #[serde(default)]
    placement: MemoryPlacement,
    #[serde(default)]
    background: Option<[u8; 3]>,
    #[serde(default)]
    ops: Vec<OpDef>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
enum OpDef {
    Fill {
        area: [i32; 4],
        color: [u8; 3],
        #[serde(default = "default_opa")]
        opa: u8,
        #[serde(default)]
        radius: u32,
        #[serde(default)]
        gradient: Option<GradientDef>,
        #[serde(default)]
        clip: Option<[i32; 4]>,
    },
    Image {
        at: [i32; 2],
        path: PathBuf,
        #[serde(default = "default_image_format")]
        format: ColorFormat,
        #[serde(default)]
        placement: MemoryPlacement,
        #[serde(default = "default_opa")]
        opa: u8,
        #[serde(default)]
        recolor: Option<[u8; 4]>,
        #[serde(default)]
        transform: ImageTransform,
        #[serde(default)]
        clip: Option<[i32; 4]>,
    },
}

#[derive(serde::Deserialize, Debug)]
struct GradientDef {
    start: [u8; 3],
    end: [u8; 3],
    #[serde(default)]
    vertical: bool,
}

fn default_format() -> ColorFormat {
    ColorFormat::Xrgb8888
}

fn default_image_format() -> ColorFormat {
    ColorFormat::Argb8888
}

fn default_opa() -> u8 {
    OPA_COVER
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Caps(args) => cmd_caps(args),
    }
}

fn read_board(path: Option<&Path>) -> anyhow::Result<BoardConfig> {
    match path {
        Some(p) => Ok(BoardConfig::from_path(p)?),
        None => Ok(BoardConfig::default()),
    }
}

fn read_scene(path: &Path) -> anyhow::Result<SceneDef> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let scene: SceneDef =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse scene JSON")?;
    anyhow::ensure!(
        scene.width > 0 && scene.height > 0,
        "scene must have a non-zero size"
    );
    Ok(scene)
}

fn area(a: [i32; 4]) -> Area {
    Area::new(a[0], a[1], a[2], a[3])
}

fn rgb(c: [u8; 3]) -> Color32 {
    Color32::rgb(c[0], c[1], c[2])
}

/// Decoded image sources, shared between ops that reference the same file.
struct ImageCache {
    root: PathBuf,
    loaded: HashMap<(PathBuf, ColorFormat, MemoryPlacement), Arc<Surface>>,
}

impl ImageCache {
    fn load(
        &mut self,
        path: &Path,
        format: ColorFormat,
        placement: MemoryPlacement,
    ) -> anyhow::Result<Arc<Surface>> {
        let full = self.root.join(path);
        let key = (full.clone(), format, placement);
        if let Some(s) = self.loaded.get(&key) {
            return Ok(Arc::clone(s));
        }
        let img = image::open(&full)
            .with_context(|| format!("decode image '{}'", full.display()))?
            .to_rgba8();
        let surface = Arc::new(Surface::from_rgba8(
            img.width(),
            img.height(),
            format,
            placement,
            img.as_raw(),
        )?);
        self.loaded.insert(key, Arc::clone(&surface));
        Ok(surface)
    }
}

fn build_layer(scene: &SceneDef, images: &mut ImageCache) -> anyhow::Result<Layer> {
    let bounds = Area::new(0, 0, scene.width as i32 - 1, scene.height as i32 - 1);
    let mut layer = Layer::new(bounds, scene.format, scene.placement)?;
    if let Some(bg) = scene.background {
        layer.push(DrawTask::fill(bounds, FillDsc::solid(rgb(bg))));
    }

    for op in &scene.ops {
        let task = match op {
            OpDef::Fill {
                area: a,
                color,
                opa,
                radius,
                gradient,
                clip,
            } => {
                let dsc = FillDsc {
                    color: rgb(*color),
                    opa: *opa,
                    radius: *radius,
                    gradient: gradient.as_ref().map(|g| Gradient {
                        start: rgb(g.start),
                        end: rgb(g.end),
                        dir: if g.vertical {
                            GradientDir::Vertical
                        } else {
                            GradientDir::Horizontal
                        },
                    }),
                };
                let t = DrawTask::fill(area(*a), dsc);
                match clip {
                    Some(c) => t.with_clip(area(*c)),
                    None => t,
                }
            }
            OpDef::Image {
                at,
                path,
                format,
                placement,
                opa,
                recolor,
                transform,
                clip,
            } => {
                let src = images.load(path, *format, *placement)?;
                let placed = Area::from_origin_size(at[0], at[1], src.width(), src.height())?;
                let mut dsc = ImageDsc::new(src);
                dsc.opa = *opa;
                dsc.transform = *transform;
                if let Some([r, g, b, strength]) = *recolor {
                    dsc.recolor = Color32::rgb(r, g, b);
                    dsc.recolor_opa = strength;
                }
                let t = DrawTask::image(placed, dsc);
                match clip {
                    Some(c) => t.with_clip(area(*c)),
                    None => t,
                }
            }
        };
        layer.push(task);
    }
    Ok(layer)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut board = read_board(args.config.as_deref())?;
    board.dispatch.threaded |= args.threaded;

    let scene = read_scene(&args.scene)?;
    let mut images = ImageCache {
        root: args
            .scene
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        loaded: HashMap::new(),
    };
    let mut layer = build_layer(&scene, &mut images)?;

    let registry = BackendRegistry::from_config(&board, Arc::new(NoopCache))?;
    let pool = Arc::new(BufferPool::default());
    let mut dispatcher =
        Dispatcher::init_with_allocator(registry, board.dispatch.clone(), pool.clone())?;
    let stats = dispatcher.render_layer(&mut layer)?;
    let buffer = layer.ensure_buffer(pool.as_ref())?;

    for backend in dispatcher.stats() {
        println!(
            "{:<10} claimed {}",
            backend.name,
            stats.claimed_by(backend.id)
        );
    }
    dispatcher.deinit();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &buffer.to_rgba8(),
        buffer.width(),
        buffer.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} tasks, {} rounds)",
        args.out.display(),
        stats.tasks,
        stats.rounds
    );
    Ok(())
}

fn cmd_caps(args: CapsArgs) -> anyhow::Result<()> {
    let board = read_board(args.config.as_deref())?;
    let registry = BackendRegistry::from_config(&board, Arc::new(NoopCache))?;
    for (id, backend) in registry.iter() {
        match backend.caps() {
            None => println!("{id} {:<8} software (accepts every task)", backend.name()),
            Some(caps) => {
                let blit = match caps.blit {
                    BlitSupport::None => "none",
                    BlitSupport::OpaqueCopy => "opaque-copy",
                    BlitSupport::Blend => "blend",
                };
                println!(
                    "{id} {:<8} cost={} fill={} blit={} min_layer_px={} align={} formats={:?}",
                    backend.name(),
                    caps.cost,
                    caps.fill,
                    blit,
                    caps.min_layer_pixels,
                    caps.align,
                    caps.formats
                );
            }
        }
    }
    Ok(())
}
