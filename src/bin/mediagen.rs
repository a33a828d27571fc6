//! CLI for mediagen - AI media generation.

use clap::{Parser, ValueEnum};
use mediagen::{
    GenerateOptions, MediaKind, OutputFormat, PersistedMedia, ProviderSelector, Router,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediagen")]
#[command(about = "Generate images and videos via AI APIs (Google, OpenAI, xAI, fal.ai, gateway)")]
#[command(version)]
struct Cli {
    /// The text prompt describing the media to generate
    #[arg(required_unless_present = "list_providers")]
    prompt: Option<String>,

    /// Provider to use
    #[arg(short, long, value_enum, default_value = "auto")]
    provider: ProviderArg,

    /// Vendor model id override
    #[arg(short, long)]
    model: Option<String>,

    /// Number of items to generate (1-10)
    #[arg(short = 'n', long = "count")]
    count: Option<u32>,

    /// Aspect ratio, e.g. 16:9
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Media kind
    #[arg(short, long, value_enum, default_value = "image")]
    kind: KindArg,

    /// Output format (defaults to png for images, mp4 for videos)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Explicit output file path (single-item batches only)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output directory for generated files
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Filename base override (defaults to a slug of the prompt)
    #[arg(long)]
    name: Option<String>,

    /// Reference/edit input image (path or URL); repeatable
    #[arg(short, long = "input")]
    input: Vec<String>,

    /// Start frame for image-to-video generation (path or URL)
    #[arg(long)]
    start_frame: Option<String>,

    /// End frame for video interpolation (path or URL)
    #[arg(long)]
    end_frame: Option<String>,

    /// Video duration in seconds
    #[arg(long)]
    duration: Option<u32>,

    /// Output results as JSON grouped by kind
    #[arg(long)]
    json: bool,

    /// List the registered providers and their capabilities, then exit
    #[arg(long)]
    list_providers: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Auto,
    Google,
    Openai,
    Xai,
    Fal,
    Gateway,
}

impl From<ProviderArg> for ProviderSelector {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Auto => Self::Auto,
            ProviderArg::Google => Self::Google,
            ProviderArg::Openai => Self::OpenAi,
            ProviderArg::Xai => Self::Xai,
            ProviderArg::Fal => Self::Fal,
            ProviderArg::Gateway => Self::Gateway,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Image => Self::Image,
            KindArg::Video => Self::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Jpg,
    Webp,
    Gif,
    Mp4,
    Webm,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => Self::Png,
            FormatArg::Jpg => Self::Jpg,
            FormatArg::Webp => Self::WebP,
            FormatArg::Gif => Self::Gif,
            FormatArg::Mp4 => Self::Mp4,
            FormatArg::Webm => Self::WebM,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        eprintln!("run `mediagen --help` for usage");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.list_providers {
        return list_providers(cli.json);
    }
    let prompt = match cli.prompt {
        Some(p) => p,
        None => anyhow::bail!("a prompt is required"),
    };

    let mut options = GenerateOptions::new()
        .with_provider(cli.provider.into())
        .with_kind(cli.kind.into());

    if let Some(model) = cli.model {
        options = options.with_model(model);
    }
    if let Some(count) = cli.count {
        options = options.with_count(count);
    }
    if let Some(ratio) = cli.aspect_ratio {
        options = options.with_aspect_ratio(ratio);
    }
    if let Some(format) = cli.format {
        options = options.with_format(format.into());
    }
    if let Some(out) = cli.out {
        options = options.with_output_path(out);
    }
    if let Some(dir) = cli.dir {
        options = options.with_output_dir(dir);
    }
    if let Some(name) = cli.name {
        options = options.with_name(name);
    }
    for input in cli.input {
        options = options.with_input_image(input);
    }
    if let Some(frame) = cli.start_frame {
        options = options.with_start_frame(frame);
    }
    if let Some(frame) = cli.end_frame {
        options = options.with_end_frame(frame);
    }
    if let Some(secs) = cli.duration {
        options = options.with_duration(secs);
    }

    let router = Router::new();
    let results = router.generate(&prompt, &options).await?;

    if cli.json {
        print_json(&results)?;
    } else {
        for item in &results {
            println!("{}", item.file_path.display());
        }
    }
    Ok(())
}

fn list_providers(json: bool) -> anyhow::Result<()> {
    let router = Router::new();
    if json {
        let entries: Vec<serde_json::Value> = router
            .providers()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id(),
                    "kinds": p.kinds(),
                    "capabilities": p.capabilities(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for p in router.providers() {
            let kinds: Vec<&str> = p.kinds().iter().map(|k| k.as_str()).collect();
            println!("{:<8} {}", p.id().as_str(), kinds.join(", "));
        }
    }
    Ok(())
}

fn print_json(results: &[PersistedMedia]) -> anyhow::Result<()> {
    let (images, videos): (Vec<_>, Vec<_>) = results
        .iter()
        .partition(|r| r.kind == MediaKind::Image);
    let out = serde_json::json!({
        "images": images,
        "videos": videos,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_required_unless_listing() {
        assert!(Cli::try_parse_from(["mediagen"]).is_err());
        assert!(Cli::try_parse_from(["mediagen", "--list-providers"]).is_ok());
        let cli = Cli::try_parse_from(["mediagen", "a cat"]).unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("a cat"));
        assert!(!cli.list_providers);
    }

    #[test]
    fn test_flag_conversions() {
        let cli = Cli::try_parse_from(["mediagen", "-p", "xai", "-k", "video", "x"]).unwrap();
        assert_eq!(ProviderSelector::from(cli.provider), ProviderSelector::Xai);
        assert_eq!(MediaKind::from(cli.kind), MediaKind::Video);
    }
}
