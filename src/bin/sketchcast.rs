use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sketchcast::{
    AnimationSpec, AspectRatio, CaptionDelivery, ComposeOpts, Composer, CompositionRequest,
    DryRunEncoder, Encoder, FfmpegEncoder, FfmpegEncoderOpts, Fps, FrameIndex, GlyphRasterizer,
    LanguageTag, RevealStyle, StrokeStyle, SubtitleTrack,
};

#[derive(Parser, Debug)]
#[command(name = "sketchcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a manifest into one MP4 and SRT per language (requires `ffmpeg` and `ffprobe`).
    Compose(ComposeArgs),
    /// Render one whiteboard animation frame as a PNG.
    Frame(FrameArgs),
    /// Print the SRT caption track of one language.
    Captions(CaptionsArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Request manifest JSON; media paths are relative to it.
    #[arg(long)]
    manifest: PathBuf,

    /// Directory receiving `<lang>.mp4`, `<lang>.srt` and `summary.json`.
    #[arg(long)]
    out_dir: PathBuf,

    /// Compose options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads for per-scene work.
    #[arg(long)]
    threads: Option<usize>,

    /// Reveal style of animated scenes.
    #[arg(long, value_enum)]
    style: Option<StyleChoice>,

    /// Also mux captions into the videos as a subtitle stream.
    #[arg(long)]
    embed_captions: bool,

    /// Parent directory for request scratch files.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Write JSON descriptors instead of encoding media (no ffmpeg needed).
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Illustration (PNG, JPEG, ...).
    #[arg(long)]
    image: PathBuf,

    /// Scene duration in seconds.
    #[arg(long)]
    duration: f64,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Header text; omitted means no header.
    #[arg(long)]
    header: Option<String>,

    /// One of 16:9, 9:16, 1:1.
    #[arg(long, default_value = "16:9")]
    aspect: String,

    #[arg(long, value_enum, default_value_t = StyleChoice::Monochrome)]
    style: StyleChoice,

    /// Header length in seconds.
    #[arg(long, default_value_t = 3.0)]
    header_seconds: f64,

    /// Extra directory of header fonts.
    #[arg(long)]
    font_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CaptionsArgs {
    /// Request manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Language code, e.g. `en` or `es-MX`.
    #[arg(long)]
    language: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleChoice {
    Monochrome,
    ColorMask,
}

impl From<StyleChoice> for RevealStyle {
    fn from(c: StyleChoice) -> Self {
        match c {
            StyleChoice::Monochrome => RevealStyle::Monochrome,
            StyleChoice::ColorMask => RevealStyle::ColorMask,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Captions(args) => cmd_captions(args),
    }
}

fn read_opts(path: Option<&Path>) -> anyhow::Result<ComposeOpts> {
    let Some(path) = path else {
        return Ok(ComposeOpts::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("read config '{}'", path.display()))?;
    Ok(ComposeOpts::from_json(&bytes)?)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let mut opts = read_opts(args.config.as_deref())?;
    if args.threads.is_some() {
        opts.threads = args.threads;
    }
    if let Some(style) = args.style {
        opts.style = style.into();
    }
    if args.embed_captions {
        opts.captions = CaptionDelivery::Embedded;
    }
    if args.scratch_dir.is_some() {
        opts.scratch_root = args.scratch_dir.clone();
    }

    let req = CompositionRequest::from_manifest_path(&args.manifest)?;

    let encoder: Box<dyn Encoder> = if args.dry_run {
        Box::new(DryRunEncoder::new())
    } else {
        let tools = FfmpegEncoderOpts::from_env().with_timeout(opts.encoder_timeout());
        anyhow::ensure!(
            tools.tools_available(),
            "ffmpeg/ffprobe not found (set FFMPEG_PATH / FFPROBE_PATH or install them on PATH)"
        );
        Box::new(FfmpegEncoder::new(tools))
    };

    let composer = Composer::new(encoder.as_ref(), opts)?;
    let output = composer.compose(&req)?;
    for path in output.write_to_dir(&args.out_dir)? {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let aspect: AspectRatio = args.aspect.parse()?;
    let canvas = aspect.canvas();
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("read image '{}'", args.image.display()))?;
    let image = sketchcast::assets::decode_image_to_canvas(&bytes, canvas)?;

    let spec = AnimationSpec {
        canvas,
        fps: Fps::OUTPUT,
        duration_secs: args.duration,
        style: args.style.into(),
        stroke: StrokeStyle::default(),
    };
    let rasterizer = GlyphRasterizer::with_system_fonts(args.font_dir.as_deref());
    let renderer = sketchcast::prepare_animation(
        spec,
        &image,
        args.header.as_deref().unwrap_or_default(),
        args.header_seconds,
        &rasterizer,
    )?;
    eprintln!(
        "{} strokes, {} frames ({} header)",
        renderer.stroke_count(),
        renderer.frame_count(),
        renderer.header_frames()
    );

    let frame = renderer.render_frame(FrameIndex(args.frame))?;
    let png = sketchcast::assets::encode_png(frame.width, frame.height, &frame.data)?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_captions(args: CaptionsArgs) -> anyhow::Result<()> {
    let req = CompositionRequest::from_manifest_path(&args.manifest)?;
    let language = LanguageTag::parse(&args.language)?;
    let track = SubtitleTrack::for_request(&req, &language)?;
    print!("{}", track.to_srt());
    Ok(())
}
