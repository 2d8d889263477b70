use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use scanview_client::HttpDocumentClient;
use scanview_core::model::links_from_json;
use scanview_core::search::{compute_match_rects, MatchRect, QueryMode, RichLine, SearchPattern};
use scanview_core::{
    build_link_regions, build_text_nodes, Bookmark, ContinuousView, DocumentInfo, LinkRegion,
    NaturalFitProbe, PageNumber, PageView, RowView, ScrollContext, SearchRequest, SearchSource,
    SelectionRouter, SurfaceState, TextLayout, TextNode, ViewerConfig, SEARCH_PAGE_SIZES,
};
use serde::Serialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use viewer_core::{Rect, ScaleTransform, Size};

#[derive(Debug, Parser)]
#[command(name = "scanview-cli")]
#[command(about = "Scanned document viewer tools")]
pub struct Cli {
    /// Increase log verbosity on stderr (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Viewer configuration file (TOML).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Project a text layout onto a rendered page and print the overlay nodes.
    Project(ProjectArgs),
    /// Project link annotations onto a rendered page and print the regions.
    Links(LinksArgs),
    /// Print the highlight rectangles of a query over a rendered page.
    Highlight(HighlightArgs),
    /// Print the rows a continuous view mounts at a scroll position.
    Window(WindowArgs),
    /// Load one page from a document server and print its settled state.
    FetchPage(FetchPageArgs),
    /// Run a full-text search against a document server.
    Search(SearchArgs),
    /// Print document metadata and the bookmark outline.
    Info {
        #[arg(long)]
        server: String,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long)]
    rendered_width: f32,
    /// Defaults to the source aspect ratio.
    #[arg(long)]
    rendered_height: Option<f32>,
}

impl RenderArgs {
    fn size_for(&self, source: Size) -> Result<Size> {
        rendered_size(source, self.rendered_width, self.rendered_height)
    }
}

#[derive(Debug, Args)]
struct ProjectArgs {
    #[arg(long, value_name = "FILE")]
    layout: PathBuf,
    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Debug, Args)]
struct LinksArgs {
    #[arg(long, value_name = "FILE")]
    links: PathBuf,
    #[arg(long)]
    source_width: f32,
    #[arg(long)]
    source_height: f32,
    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Debug, Args)]
struct HighlightArgs {
    #[arg(long, value_name = "FILE")]
    layout: PathBuf,
    #[command(flatten)]
    render: RenderArgs,
    #[arg(long)]
    query: String,
}

#[derive(Debug, Args)]
struct WindowArgs {
    #[arg(long)]
    pages: u32,
    #[arg(long)]
    container_width: f32,
    #[arg(long, default_value_t = 0.0)]
    scroll_offset: f32,
    #[arg(long)]
    viewport_height: f32,
    /// Settled surface height of a page, as PAGE=HEIGHT (repeatable).
    #[arg(long = "measured", value_name = "PAGE=HEIGHT", value_parser = parse_measured)]
    measured: Vec<(PageNumber, f32)>,
}

#[derive(Debug, Args)]
struct FetchPageArgs {
    #[arg(long)]
    server: String,
    #[arg(long)]
    page: PageNumber,
    #[arg(long, default_value_t = 900.0)]
    container_width: f32,
    /// Also highlight this query once the page has settled.
    #[arg(long)]
    query: Option<String>,
}

#[derive(Debug, Args)]
struct SearchArgs {
    #[arg(long)]
    server: String,
    #[arg(long)]
    query: String,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 50)]
    page_size: u32,
}

#[derive(Debug, Serialize)]
struct ProjectOutput {
    page: PageNumber,
    source: Size,
    rendered: Size,
    transform: ScaleTransform,
    nodes: Vec<TextNode>,
}

#[derive(Debug, Serialize)]
struct LinksOutput {
    rendered: Size,
    regions: Vec<LinkRegion>,
}

#[derive(Debug, Serialize)]
struct HighlightOutput {
    query: String,
    mode: Option<QueryMode>,
    matches: Vec<MatchRect>,
}

#[derive(Debug, Serialize)]
struct WindowOutput {
    first_page: Option<PageNumber>,
    last_page: Option<PageNumber>,
    current_page: Option<PageNumber>,
    total_height: f32,
    rows: Vec<RowView>,
}

#[derive(Debug, Serialize)]
struct FetchPageOutput {
    page: PageNumber,
    state: SurfaceState,
    attempts: u32,
    natural: Option<Size>,
    rendered: Option<Size>,
    transform: ScaleTransform,
    text_nodes: usize,
    links: Vec<LinkRegion>,
    highlights: Vec<Rect>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    query: String,
    page: u32,
    page_size: u32,
    total_results: u64,
    total_pages: u32,
    has_previous: bool,
    has_next: bool,
    results: Vec<SearchResultOutput>,
}

#[derive(Debug, Serialize)]
struct SearchResultOutput {
    page: PageNumber,
    lines: Vec<RichLine>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    info: DocumentInfo,
    outline: Vec<OutlineEntry>,
}

#[derive(Debug, Serialize)]
struct OutlineEntry {
    depth: usize,
    title: String,
    page: PageNumber,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    if matches!(cli.command, Commands::Version) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = ViewerConfig::load(cli.config.as_deref())
        .context("failed to load viewer configuration")?;

    match cli.command {
        Commands::Project(args) => run_project(&args, &config),
        Commands::Links(args) => run_links(&args),
        Commands::Highlight(args) => run_highlight(&args, &config),
        Commands::Window(args) => run_window(&args, &config),
        Commands::FetchPage(args) => run_fetch_page(&args, &config),
        Commands::Search(args) => run_search(&args, &config),
        Commands::Info { server } => run_info(&server, &config),
        Commands::Version => Ok(()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // A logger may already be installed when `run` is called more than once.
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Never,
    );
}

fn run_project(args: &ProjectArgs, config: &ViewerConfig) -> Result<()> {
    let layout = read_layout(&args.layout)?;
    let source = layout.source_size();
    let rendered = args.render.size_for(source)?;
    let transform = ScaleTransform::compute(source, rendered);

    let output = ProjectOutput {
        page: layout.page_number,
        source,
        rendered,
        transform,
        nodes: build_text_nodes(&layout, &transform, rendered, config.min_font_px),
    };
    print_json(&output)
}

fn run_links(args: &LinksArgs) -> Result<()> {
    let path = &args.links;
    let json = read_file(path)?;
    let links = links_from_json(&json)
        .with_context(|| format!("invalid link annotations in {}", path.display()))?;
    let source = Size::new(args.source_width, args.source_height);
    let rendered = args.render.size_for(source)?;
    let transform = ScaleTransform::compute(source, rendered);

    let output = LinksOutput {
        rendered,
        regions: build_link_regions(&links, source, &transform, rendered),
    };
    print_json(&output)
}

fn run_highlight(args: &HighlightArgs, config: &ViewerConfig) -> Result<()> {
    let layout = read_layout(&args.layout)?;
    let source = layout.source_size();
    let rendered = args.render.size_for(source)?;
    let transform = ScaleTransform::compute(source, rendered);
    let nodes = build_text_nodes(&layout, &transform, rendered, config.min_font_px);

    let pattern = SearchPattern::compile(&args.query);
    let matches = match &pattern {
        Some(pattern) => compute_match_rects(pattern, &nodes),
        None => Vec::new(),
    };
    let output = HighlightOutput {
        query: args.query.clone(),
        mode: pattern.as_ref().map(SearchPattern::mode),
        matches,
    };
    print_json(&output)
}

fn run_window(args: &WindowArgs, config: &ViewerConfig) -> Result<()> {
    let pages = args.pages;
    let mut view = ContinuousView::new(pages, args.container_width, config);
    for (page, height) in &args.measured {
        if *page == 0 || *page > pages {
            bail!("measured page {page} is outside 1..={pages}");
        }
        view.report_surface_height(*page, *height);
    }

    let (offset, viewport) = (args.scroll_offset, args.viewport_height);
    let rows = view.visible_rows(offset, viewport);
    let output = WindowOutput {
        first_page: rows.first().map(|row| row.page_number),
        last_page: rows.last().map(|row| row.page_number),
        current_page: view.current_page(offset, viewport),
        total_height: view.total_height(),
        rows,
    };
    print_json(&output)
}

/// Drives a page view on the wall clock until no timer is left, which is
/// once the page has settled or failed for good.
fn run_fetch_page(args: &FetchPageArgs, config: &ViewerConfig) -> Result<()> {
    let page = args.page;
    let client = HttpDocumentClient::new(args.server.as_str(), config);
    let mut router = SelectionRouter::new();
    let mut view = PageView::mount(config, &mut router);
    let scroll = ScrollContext::default();
    let started = Instant::now();

    let effects = view.show_page(page, started.elapsed());
    view.execute(effects, &client, started.elapsed());
    if let Some(query) = &args.query {
        view.set_query(query, started.elapsed());
    }

    while let Some(deadline) = view.next_deadline() {
        let elapsed = started.elapsed();
        if deadline > elapsed {
            std::thread::sleep(deadline - elapsed);
        }

        let natural = view
            .surface()
            .raster()
            .map(|raster| raster.natural())
            .unwrap_or_default();
        let fit = NaturalFitProbe {
            natural,
            container_width: args.container_width,
        };
        let effects = view.poll(started.elapsed(), &fit, &scroll);
        view.execute(effects, &client, started.elapsed());

        let state = view.surface().state();
        log::debug!("page {page}: {state:?} after {:?}", started.elapsed());
    }

    let surface = view.surface();
    let output = FetchPageOutput {
        page,
        state: surface.state(),
        attempts: surface.attempts(),
        natural: surface.raster().map(|raster| raster.natural()),
        rendered: surface.rendered_size(),
        transform: view.transform(),
        text_nodes: view.text_layer().nodes().len(),
        links: view.link_layer().regions().to_vec(),
        highlights: view.highlights().match_rects(),
        error: surface.last_error().map(ToString::to_string),
    };
    print_json(&output)?;

    if output.state == SurfaceState::Failed {
        bail!("page {page} failed after {} attempt(s)", output.attempts);
    }
    Ok(())
}

fn run_search(args: &SearchArgs, config: &ViewerConfig) -> Result<()> {
    let page_size = args.page_size;
    if !SEARCH_PAGE_SIZES.contains(&page_size) {
        bail!("page size must be one of {SEARCH_PAGE_SIZES:?}, got {page_size}");
    }

    let query = args.query.as_str();
    let client = HttpDocumentClient::new(args.server.as_str(), config);
    let request = SearchRequest::new(query)
        .with_page(args.page)
        .with_page_size(page_size);
    let response = client
        .search(&request)
        .with_context(|| format!("search for {query:?} failed"))?;

    let results = response
        .results
        .iter()
        .map(|hit| SearchResultOutput {
            page: hit.page,
            lines: marked_lines(&hit.lines, query),
        })
        .collect();
    let output = SearchOutput {
        query: request.query.clone(),
        page: request.page,
        page_size: request.page_size,
        total_results: response.total_results,
        total_pages: response.total_pages,
        has_previous: response.has_previous(request.page),
        has_next: response.has_next(request.page),
        results,
    };
    print_json(&output)
}

fn marked_lines(lines: &[String], query: &str) -> Vec<RichLine> {
    lines
        .iter()
        .map(|line| RichLine::plain(line.as_str()).highlight(query))
        .collect()
}

fn run_info(server: &str, config: &ViewerConfig) -> Result<()> {
    let client = HttpDocumentClient::new(server, config);
    let info = client.info().context("failed to fetch document info")?;
    let bookmarks = match client.bookmarks() {
        Ok(bookmarks) => bookmarks,
        Err(error) => {
            log::warn!("no outline available: {error}");
            Vec::new()
        }
    };

    let outline = Bookmark::flatten(&bookmarks)
        .into_iter()
        .map(|(depth, bookmark)| OutlineEntry {
            depth,
            title: bookmark.title.clone(),
            page: bookmark.page,
        })
        .collect();
    print_json(&InfoOutput { info, outline })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn read_layout(path: &Path) -> Result<TextLayout> {
    let json = read_file(path)?;
    TextLayout::from_json(1, &json)
        .with_context(|| format!("invalid text layout in {}", path.display()))
}

/// Missing heights keep the source aspect ratio.
fn rendered_size(source: Size, width: f32, height: Option<f32>) -> Result<Size> {
    if !(width.is_finite() && width > 0.0) {
        bail!("rendered width must be positive, got {width}");
    }

    let height = match height {
        Some(height) => height,
        None if source.is_known() => width * source.height / source.width,
        None => bail!("rendered height is required when the source size is unknown"),
    };
    if !(height.is_finite() && height > 0.0) {
        bail!("rendered height must be positive, got {height}");
    }

    Ok(Size::new(width, height))
}

fn parse_measured(value: &str) -> Result<(PageNumber, f32), String> {
    let (page, height) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PAGE=HEIGHT, got {value:?}"))?;
    let page = page
        .trim()
        .parse::<PageNumber>()
        .map_err(|error| format!("invalid page {page:?}: {error}"))?;
    let height = height
        .trim()
        .parse::<f32>()
        .map_err(|error| format!("invalid height {height:?}: {error}"))?;
    Ok((page, height))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_height_follows_source_aspect() {
        let size = rendered_size(Size::new(1224.0, 1584.0), 612.0, None).unwrap();
        assert_eq!(size, Size::new(612.0, 792.0));
        assert!(rendered_size(Size::default(), 612.0, None).is_err());
        assert!(rendered_size(Size::new(10.0, 10.0), 0.0, None).is_err());
    }

    #[test]
    fn measured_pairs_parse() {
        assert_eq!(parse_measured("3=1012.5"), Ok((3, 1012.5)));
        assert!(parse_measured("3").is_err());
        assert!(parse_measured("x=1").is_err());
    }
}
