use std::cmp;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use atty::Stream;
use clap::{Parser, Subcommand};
use mathwiki_rs::store::{AUTOCOMPLETE_LIMIT, ContentStore};
use mathwiki_rs::visual::{GraphModel, Viewport, default_parameters};
use mathwiki_rs::{CorpusSource, LinkedSegment, Page};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};

#[derive(Parser, Debug)]
#[command(name = "mathwiki-rs", about = "Explore the MathWiki corpus", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Load the corpus from a directory instead of the bundled data.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every page, optionally filtered by tag.
    List {
        /// Keep only pages carrying at least one of these tags.
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Rank pages against a search query.
    Search {
        /// Free-text query matched against titles, aliases, and tags.
        query: String,
        /// Keep only pages carrying at least one of these tags.
        #[arg(short, long)]
        tag: Vec<String>,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show autocomplete suggestions for a partial query.
    Suggest {
        /// Partial query text.
        query: String,
    },
    /// Show a page: rendered summary, links, visual, and derivation.
    Show {
        /// Page ID or exact title.
        page: String,
    },
    /// List the distinct tags in the corpus.
    Tags,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let cli = Cli::parse();
    let source = match &cli.data_dir {
        Some(dir) => CorpusSource::Dir(dir.clone()),
        None => CorpusSource::Bundled,
    };
    let mut store = ContentStore::new(source);
    if let Some(message) = store.load_error() {
        return Err(format!("corpus failed to load: {message}").into());
    }

    match cli.command {
        Command::List { tag } => handle_list(&mut store, tag, cli.json),
        Command::Search { query, tag, limit } => {
            handle_search(&mut store, query, tag, limit, cli.json)
        }
        Command::Suggest { query } => handle_suggest(&mut store, query, cli.json),
        Command::Show { page } => handle_show(&store, page, cli.json),
        Command::Tags => handle_tags(&store, cli.json),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_list(
    store: &mut ContentStore,
    tags: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let now = Instant::now();
    for tag in &tags {
        store.toggle_tag(tag, now);
    }
    store.refresh_search_now();

    let pages = store.home_pages();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
    } else {
        print_page_table(&pages);
    }
    Ok(())
}

fn handle_search(
    store: &mut ContentStore,
    query: String,
    tags: Vec<String>,
    limit: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let now = Instant::now();
    store.set_query(&query, now);
    for tag in &tags {
        store.toggle_tag(tag, now);
    }
    store.refresh_search_now();

    let results: Vec<&Page> = store.search_results().into_iter().take(limit).collect();
    if as_json {
        let payload = json!({
            "query": query,
            "tags": tags,
            "limit": limit,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if results.is_empty() {
        println!("No pages matched \"{query}\".");
    } else {
        println!("Matches for \"{query}\":");
        print_page_table(&results);
    }
    Ok(())
}

fn handle_suggest(
    store: &mut ContentStore,
    query: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    store.set_query(&query, Instant::now());
    let suggestions = store.autocomplete();

    if as_json {
        let payload = json!({
            "query": query,
            "limit": AUTOCOMPLETE_LIMIT,
            "results": suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if suggestions.is_empty() {
        println!("No suggestions for \"{query}\".");
    } else {
        println!("Suggestions for \"{query}\":");
        print_page_table(&suggestions);
    }
    Ok(())
}

fn handle_show(store: &ContentStore, query: String, as_json: bool) -> Result<(), Box<dyn Error>> {
    let page = find_page(store, &query)
        .ok_or_else(|| format!("No page found for {query:?} (by id or title)"))?;

    if as_json {
        let payload = page_to_json(store, page);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_page(store, page);
    }
    Ok(())
}

fn handle_tags(store: &ContentStore, as_json: bool) -> Result<(), Box<dyn Error>> {
    let tags = store.available_tags();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else if tags.is_empty() {
        println!("The corpus defines no tags.");
    } else {
        for tag in tags {
            println!("{tag}");
        }
    }
    Ok(())
}

fn find_page<'a>(store: &'a ContentStore, query: &str) -> Option<&'a Page> {
    if let Some(page) = store.page(query) {
        return Some(page);
    }
    let wanted = mathwiki_rs::normalize::normalize(query);
    store
        .pages()
        .iter()
        .find(|page| mathwiki_rs::normalize::normalize(&page.title) == wanted)
}

fn print_page_table(pages: &[&Page]) {
    if pages.is_empty() {
        println!("No pages.");
        return;
    }
    let width = pages
        .iter()
        .map(|page| page.title.len())
        .max()
        .unwrap_or(5)
        .max("TITLE".len());
    println!("{:<width$}  {:<10}  {}", "TITLE", "TYPE", "ID", width = width);
    println!("{:-<width$}  {:-<10}  {}", "", "", "--------", width = width);
    for page in pages {
        println!(
            "{:<width$}  {:<10}  {}",
            page.title,
            page.page_type.display_name(),
            page.id,
            width = width
        );
    }
}

fn page_to_json(store: &ContentStore, page: &Page) -> serde_json::Value {
    let summary = store.linked_summary(&page.id).unwrap_or_default();
    let visual = store.visual_for(page);
    let derivation = store.derivation_for(page).map(|derivation| {
        let steps: Vec<_> = derivation
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let key = format!("deriv:{}:{index}", derivation.id);
                json!({
                    "equation": mathwiki_rs::markup::render(&step.equation),
                    "explanation": store.linked_text(&step.explanation_markdown, &key, &page.id),
                    "animationHint": step.animation_hint,
                })
            })
            .collect();
        json!({
            "id": derivation.id,
            "interactiveModelID": derivation.interactive_model_id,
            "steps": steps,
        })
    });

    json!({
        "page": page,
        "summary": summary,
        "related": store.related_pages(page).iter().map(|p| &p.id).collect::<Vec<_>>(),
        "visual": visual,
        "derivation": derivation,
        "deepLink": ContentStore::page_deep_link(&page.id),
    })
}

fn print_page(store: &ContentStore, page: &Page) {
    println!("{} ({})", page.title, page.page_type.display_name());
    println!("ID: {}", page.id);
    if !page.aliases.is_empty() {
        println!("Aliases: {}", page.aliases.join(", "));
    }
    if !page.tags.is_empty() {
        println!("Tags: {}", page.tags.join(", "));
    }

    if let Some(summary) = store.linked_summary(&page.id) {
        render_markdown_block("Summary", &segments_to_markdown(&summary));
    }

    let related = store.related_pages(page);
    if !related.is_empty() {
        let titles: Vec<_> = related
            .iter()
            .map(|p| format!("{} ({})", p.title, ContentStore::page_deep_link(&p.id)))
            .collect();
        println!("\nRelated: {}", titles.join(", "));
    }

    if let Some(visual) = store.visual_for(page) {
        println!(
            "\nVisual: {} ({:?}, model {})",
            visual.id, visual.kind, visual.model_id
        );
        let viewport = Viewport::for_spec(visual);
        println!(
            "  viewport x in [{}, {}], y in [{}, {}]",
            viewport.x_min, viewport.x_max, viewport.y_min, viewport.y_max
        );
        for parameter in &visual.parameters {
            println!(
                "  {} ({}): {} <= {} <= {}, step {}",
                parameter.label,
                parameter.id,
                parameter.min,
                parameter.default_value,
                parameter.max,
                parameter.step
            );
        }
        let params = default_parameters(visual);
        let model = GraphModel::for_id(&visual.model_id);
        let mid = (viewport.x_min + viewport.x_max) / 2.0;
        if let Some(y) = model.y(mid, &params) {
            println!("  sample: y({mid}) = {y:.4}");
        }
    }

    if let Some(derivation) = store.derivation_for(page) {
        println!("\nDerivation ({} steps):", derivation.steps.len());
        for (index, step) in derivation.steps.iter().enumerate() {
            println!(
                "\n  {}. {}",
                index + 1,
                mathwiki_rs::markup::render(&step.equation)
            );
            let key = format!("deriv:{}:{index}", derivation.id);
            let explanation = store.linked_text(&step.explanation_markdown, &key, &page.id);
            println!("     {}", segments_to_text(&explanation));
        }
    }
}

/// Rebuilds markdown from segments, addressing link targets through the
/// `mathwiki://` scheme.
fn segments_to_markdown(segments: &[LinkedSegment]) -> String {
    segments
        .iter()
        .map(|segment| match &segment.target_page_id {
            Some(target) => format!(
                "[{}]({})",
                markdown_escape(&segment.text),
                ContentStore::page_deep_link(target)
            ),
            None => segment.text.clone(),
        })
        .collect()
}

fn segments_to_text(segments: &[LinkedSegment]) -> String {
    segments
        .iter()
        .map(|segment| match &segment.target_page_id {
            Some(target) => format!("{} [-> {target}]", segment.text),
            None => segment.text.clone(),
        })
        .collect()
}

fn markdown_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '[' | ']' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
