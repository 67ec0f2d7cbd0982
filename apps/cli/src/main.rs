mod preview;
mod simulated;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use folio_printing::{
    compute_page_layout_in_points_for_css, page_size_and_content_area, DocumentKind, HostMessage,
    JobOutcome, LayoutSource, PageLayoutHints, PageLayoutPoints, PageLayoutQuery, PrintConfig,
    PrintController, PrintParameters, Rect, RecordingHost, SessionPhase,
    SharedDocument, Size,
};
use serde::Serialize;

use crate::simulated::{RequestSetup, Scenario, SimulatedDocument};

#[derive(Parser)]
#[command(
    name = "folio-cli",
    about = "Inspect print layouts and run simulated print jobs",
    author,
    version
)]
struct Cli {
    /// 顯示除錯記錄。 / Show debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 解析單一頁面的版面。 / Resolve the layout of one page.
    Layout(LayoutArgs),
    /// 以模擬文件執行列印作業。 / Run a print job against a simulated document.
    Print(PrintArgs),
    /// 匯出或檢查列印設定。 / Export or check a print configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct LayoutArgs {
    /// 裝置列印參數 JSON。 / Device print parameters as JSON.
    #[arg(long, value_name = "FILE")]
    settings: PathBuf,

    /// 文件宣告的頁面規則 JSON。 / Page declarations of the document as JSON.
    #[arg(long, value_name = "FILE")]
    hints: Option<PathBuf>,

    /// 頁面索引（從 0 起算）。 / Page index (zero-based).
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// 忽略文件宣告的邊界。 / Ignore the margins the document declares.
    #[arg(long)]
    ignore_css_margins: bool,
}

#[derive(Args)]
struct PrintArgs {
    /// 列印情境 JSON。 / Print scenario JSON.
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// 列印設定檔；缺少時使用預設值。 / Print configuration; defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 將每頁輸出為 PNG 預覽的資料夾。 / Directory receiving a PNG preview per page.
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,

    /// 預覽解析度。 / Preview resolution.
    #[arg(long, default_value_t = 72)]
    preview_dpi: u32,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 匯出目前列印設定。 / Export the effective print configuration.
    Export(ConfigExportArgs),
    /// 檢查列印設定檔。 / Validate a print configuration file.
    Check(ConfigCheckArgs),
}

#[derive(Args)]
struct ConfigExportArgs {
    /// 來源設定檔；缺少時匯出預設值。 / Source configuration; defaults are exported when omitted.
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,
    /// 輸出檔案路徑。 / Destination file path.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Args)]
struct ConfigCheckArgs {
    /// 設定檔路徑。 / Configuration file path.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Layout(args) => execute_layout(args),
        Commands::Print(args) => execute_print(args),
        Commands::Config(subcommand) => execute_config_command(subcommand),
    }
}

/// Hints for a single page, answered for whichever page is asked about.
struct DeclaredPage(Option<PageLayoutHints>);

impl PageLayoutQuery for DeclaredPage {
    fn page_layout_hints(&self, _page_index: u32) -> Option<PageLayoutHints> {
        self.0
    }
}

#[derive(Serialize)]
struct LayoutReport {
    page: u32,
    layout: PageLayoutPoints,
    scale_factor: f64,
    page_size: Size,
    content_area: Rect,
}

fn execute_layout(args: LayoutArgs) -> Result<()> {
    let settings: PrintParameters = read_json(&args.settings)?;
    let hints = args
        .hints
        .as_deref()
        .map(read_json::<PageLayoutHints>)
        .transpose()?;
    if !settings.is_valid() {
        bail!("'{}' does not describe a usable printer", args.settings.display());
    }

    let declared = DeclaredPage(hints);
    let (layout, scale_factor) = compute_page_layout_in_points_for_css(
        &LayoutSource::new(&declared, DocumentKind::HtmlDocument),
        args.page,
        &settings,
        args.ignore_css_margins,
    );
    let (page_size, content_area) = page_size_and_content_area(&layout);
    print_json(&LayoutReport {
        page: args.page,
        layout,
        scale_factor,
        page_size,
        content_area,
    })
}

#[derive(Serialize)]
struct PageReport {
    page_number: u32,
    page_size: Size,
    content_area: Rect,
    canvas_area: Rect,
    scale_factor: f64,
    progress: f32,
    text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<PathBuf>,
}

#[derive(Serialize)]
struct PrintReport<'a> {
    phases: &'a [SessionPhase],
    outcome: Option<&'a JobOutcome>,
    messages: &'a [HostMessage],
    pages: Vec<PageReport>,
}

fn execute_print(args: PrintArgs) -> Result<()> {
    let scenario: Scenario = read_json(&args.scenario)?;
    let config = match &args.config {
        Some(path) => PrintConfig::load(path)
            .with_context(|| format!("load print configuration '{}'", path.display()))?,
        None => PrintConfig::default(),
    };

    let mut host = RecordingHost::new(scenario.default_settings);
    host.user_settings = scenario.user_settings;
    host.reject_page = scenario.reject_page;
    let mut controller = PrintController::new(host, config).context("invalid print configuration")?;

    let document: SharedDocument = Rc::new(RefCell::new(SimulatedDocument::new(scenario.document)));
    let accepted = match scenario.request {
        RequestSetup::Pages {
            silent,
            print_background,
        } => controller.print_pages(&document, silent, print_background),
        RequestSetup::Scripted => controller.scripted_print(&document),
        RequestSetup::Node { node } => controller.print_node(&document, node),
    };
    accepted.context("print request refused")?;

    // Simulated views load synchronously, so the load notification can be
    // delivered right away.
    while controller.phase() == SessionPhase::SelectionCopying {
        controller.did_stop_loading();
        if controller.run_pending_tasks() == 0 {
            break;
        }
    }

    let mut pages = Vec::new();
    for page in &controller.host().pages {
        let preview = match &args.preview_dir {
            Some(dir) => Some(preview::write_page_preview(page, args.preview_dpi, dir)?),
            None => None,
        };
        pages.push(PageReport {
            page_number: page.page_number,
            page_size: page.page_size,
            content_area: page.content_area,
            canvas_area: page.canvas_area,
            scale_factor: page.scale_factor,
            progress: page.progress,
            text: page
                .display_list
                .glyph_runs()
                .map(|run| run.text.clone())
                .collect(),
            preview,
        });
    }

    print_json(&PrintReport {
        phases: controller.phase_history(),
        outcome: controller.last_outcome(),
        messages: &controller.host().messages,
        pages,
    })?;

    match controller.last_outcome() {
        Some(JobOutcome::Failed(error)) => bail!("print job failed: {error}"),
        Some(JobOutcome::Cancelled) => {
            log::info!("print job cancelled");
            Ok(())
        }
        Some(JobOutcome::Finished { .. }) => Ok(()),
        None => bail!("print job did not finish"),
    }
}

fn execute_config_command(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Export(args) => {
            let config = match &args.from {
                Some(path) => PrintConfig::load(path)
                    .with_context(|| format!("load print configuration '{}'", path.display()))?,
                None => PrintConfig::default(),
            };
            config
                .save(&args.output)
                .with_context(|| format!("export configuration to '{}'", args.output.display()))?;
            println!("Exported print configuration to {}", args.output.display());
            Ok(())
        }
        ConfigCommand::Check(args) => {
            if !args.input.exists() {
                bail!("configuration file '{}' does not exist", args.input.display());
            }
            let config = PrintConfig::load(&args.input)
                .with_context(|| format!("load print configuration '{}'", args.input.display()))?;
            config.templates()?;
            println!(
                "Configuration OK: inflation {}, page count {:?}",
                config.layout_height_inflation, config.page_count_strategy
            );
            Ok(())
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{text}");
    Ok(())
}
