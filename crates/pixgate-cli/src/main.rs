use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pixgate_contracts::extract::ResultOutcome;
use pixgate_contracts::features::{search_features, Feature, FeatureConfig};
use pixgate_contracts::routes::{normalize_base, PROCESS_ROUTE};
use pixgate_engine::{download_image, ApiClient, BrowserOpener, DownloadOutcome, Route, Workbench};
use pixgate_gateway::GatewayConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PIXGATE_LOG";

#[derive(Debug, Parser)]
#[command(name = "pixgate", version, about = "Image-processing gateway and client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available features.
    Features(FeaturesArgs),
    /// Validate and submit one image job, then print the result URLs.
    Submit(SubmitArgs),
    /// Save a result image, falling back to opening it in the browser.
    Download(DownloadArgs),
    /// Run the gateway HTTP service.
    Serve(ServeArgs),
}

#[derive(Debug, Parser)]
struct FeaturesArgs {
    #[arg(long)]
    search: Option<String>,
}

#[derive(Debug, Parser)]
struct SubmitArgs {
    #[arg(long)]
    feature: String,
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    background: Option<PathBuf>,
    /// Form value as `field=value`; may be repeated.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    values: Vec<String>,
    /// Gateway base URL; without it the upstream is called directly.
    #[arg(long)]
    gateway: Option<String>,
    #[arg(long)]
    download: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct DownloadArgs {
    #[arg(long)]
    url: String,
    #[arg(long)]
    feature: String,
    #[arg(long, default_value_t = 0)]
    index: usize,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pixgate error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Features(args) => {
            run_features(args);
            Ok(0)
        }
        Command::Submit(args) => run_submit(args),
        Command::Download(args) => run_download(args),
        Command::Serve(args) => {
            run_serve(args)?;
            Ok(0)
        }
    }
}

fn init_tracing() {
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_feature(raw: &str) -> Result<Feature> {
    match Feature::from_id(raw) {
        Some(feature) => Ok(feature),
        None => bail!("unknown feature `{raw}` (see `pixgate features`)"),
    }
}

fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let (field, value) = raw
        .split_once('=')
        .with_context(|| format!("expected FIELD=VALUE, got `{raw}`"))?;
    let field = field.trim();
    if field.is_empty() {
        bail!("empty field name in `{raw}`");
    }
    Ok((field, value))
}

fn gateway_endpoint(raw: &str) -> String {
    let base = normalize_base(raw);
    if base.ends_with(PROCESS_ROUTE) {
        base
    } else {
        format!("{base}{PROCESS_ROUTE}")
    }
}

fn run_features(args: FeaturesArgs) {
    let query = args.search.unwrap_or_default();
    let matches = search_features(&query);
    if matches.is_empty() {
        println!("no features match `{}`", query.trim());
        return;
    }
    for config in matches {
        for line in feature_lines(config) {
            println!("{line}");
        }
    }
}

fn feature_lines(config: &FeatureConfig) -> [String; 3] {
    [
        format!(
            "{:<22} {:<28} {}",
            config.id, config.name, config.estimated_time
        ),
        format!("    {} ({})", config.label, config.tagline),
        format!("    {}", config.description),
    ]
}

fn run_submit(args: SubmitArgs) -> Result<i32> {
    let feature = parse_feature(&args.feature)?;
    let route = match args.gateway.as_deref() {
        Some(raw) => Route::Gateway(gateway_endpoint(raw)),
        None => Route::Direct,
    };

    let mut bench = Workbench::new(ApiClient::new(), route);
    bench.select_feature(feature);
    if let Some(path) = &args.image {
        bench
            .upload_image(path)
            .with_context(|| format!("failed loading image {}", path.display()))?;
    }
    if let Some(path) = &args.background {
        bench
            .upload_background(path)
            .with_context(|| format!("failed loading background {}", path.display()))?;
    }
    for raw in &args.values {
        let (field, value) = parse_assignment(raw)?;
        if !bench.input().config().accepts(field) {
            bail!("feature `{}` has no field `{field}`", feature.id());
        }
        bench.set_value(field, value);
    }

    let outcome = bench.submit(|percent| {
        eprint!("\rprogress: {percent:>3}%");
        let _ = io::stderr().flush();
    });
    eprintln!();

    println!("{}", outcome.status_line());
    if let ResultOutcome::Failed { .. } = outcome {
        return Ok(1);
    }
    for url in outcome.urls() {
        println!("{url}");
    }

    if let Some(out_dir) = &args.download {
        for result in bench.download_results(out_dir, &BrowserOpener) {
            report_download(&result);
        }
    }
    Ok(0)
}

fn run_download(args: DownloadArgs) -> Result<i32> {
    let feature = parse_feature(&args.feature)?;
    let client = ApiClient::new();
    let result = download_image(
        &client,
        &args.url,
        feature,
        args.index,
        &args.out,
        &BrowserOpener,
    );
    report_download(&result);
    Ok(match result {
        DownloadOutcome::Failed(_) => 1,
        _ => 0,
    })
}

fn report_download(result: &DownloadOutcome) {
    match result {
        DownloadOutcome::Saved(path) => println!("saved {}", path.display()),
        DownloadOutcome::Opened(url) => println!("opened {url} in the browser"),
        DownloadOutcome::Failed(reason) => eprintln!("download failed: {reason}"),
    }
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = GatewayConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    info!(bind = %config.bind, "starting gateway");
    let runtime = tokio::runtime::Runtime::new().context("failed starting tokio runtime")?;
    runtime
        .block_on(pixgate_gateway::serve(config))
        .context("gateway stopped")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_first_equals() -> Result<()> {
        assert_eq!(parse_assignment("prompt=a=b")?, ("prompt", "a=b"));
        assert_eq!(parse_assignment(" scale =4")?, ("scale", "4"));
        assert!(parse_assignment("scale").is_err());
        assert!(parse_assignment("=4").is_err());
        Ok(())
    }

    #[test]
    fn gateway_endpoint_appends_process_route_once() {
        assert_eq!(
            gateway_endpoint("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/api/process"
        );
        assert_eq!(
            gateway_endpoint("http://127.0.0.1:8080/api/process"),
            "http://127.0.0.1:8080/api/process"
        );
    }

    #[test]
    fn features_resolve_from_either_id() -> Result<()> {
        assert_eq!(parse_feature("ic-light")?, Feature::Relight);
        assert_eq!(parse_feature("portraits/ic-light")?, Feature::Relight);
        assert!(parse_feature("teleport").is_err());
        Ok(())
    }

    #[test]
    fn feature_listing_shows_label_and_description() {
        let lines = feature_lines(Feature::Upscale.config());
        assert!(lines[0].starts_with("upscale "));
        assert!(lines[0].ends_with("15-90s"));
        assert_eq!(lines[1], "    Image Upscaling (GFPGAN) (Face restoration & enhance)");
        assert_eq!(lines[2], "    Restore faces and upscale 1x/2x/4x");
    }

    #[test]
    fn cli_parses_repeated_set_flags() -> Result<()> {
        let cli = Cli::try_parse_from([
            "pixgate",
            "submit",
            "--feature",
            "comic",
            "--set",
            "prompt=a quiet harbour",
            "--set",
            "panels=6",
        ])?;
        let Command::Submit(args) = cli.command else {
            bail!("expected submit");
        };
        assert_eq!(args.values, ["prompt=a quiet harbour", "panels=6"]);
        assert!(args.gateway.is_none());
        Ok(())
    }
}
