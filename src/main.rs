use std::io::{BufRead, IsTerminal, Write};

use blogsearch::cli::{Cli, Commands, SourceArgs};
use blogsearch::commands::{self, DocumentSource, SearchSession};
use blogsearch::config::Config;
use blogsearch::index;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("BLOGSEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn open_session(config: &Config, source: SourceArgs) -> (DocumentSource, SearchSession) {
    let source = DocumentSource::resolve(config, source.content, source.snapshot);
    let session = SearchSession::open(&source);
    (source, session)
}

fn print_results(session: &mut SearchSession, query: &str) {
    if let Some(reason) = session.unavailable_reason() {
        println!("{}", commands::unavailable_message(reason));
        return;
    }
    let results = session.search(query);
    println!("{}", commands::render_results(query, &results));
}

fn shell(mut session: SearchSession) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    if interactive && session.is_available() {
        session.prepare();
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    if interactive {
        write!(stdout, "search> ")?;
        stdout.flush()?;
    }

    for line in stdin.lock().lines() {
        let query = line?;
        if !query.trim().is_empty() {
            print_results(&mut session, query.trim());
            println!();
        }
        if interactive {
            write!(stdout, "search> ")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = Config::load()?;
    let include_drafts = config.content.include_drafts;

    match cli.command {
        Some(Commands::Index {
            content,
            output,
            stdout,
        }) => {
            let content = content.unwrap_or_else(|| config.content_dir());
            if stdout {
                let documents = commands::build_documents(&content, include_drafts)?;
                println!("{}", index::to_json(&documents)?);
            } else {
                let output = output.unwrap_or_else(|| config.snapshot_path());
                let count = commands::write_index(&content, include_drafts, &output)?;
                println!("Indexed {count} post(s) into {}", output.display());
            }
        }
        Some(Commands::Search { query, source }) => {
            let (_, mut session) = open_session(&config, source);
            print_results(&mut session, &query);
        }
        Some(Commands::Shell { source }) => {
            let (_, session) = open_session(&config, source);
            shell(session)?;
        }
        Some(Commands::List {
            tag,
            page,
            page_size,
            content,
        }) => {
            let content = content.unwrap_or_else(|| config.content_dir());
            let (posts, footer) = match page {
                Some(page) => {
                    let page = commands::list_page(
                        &content,
                        include_drafts,
                        tag.as_deref(),
                        usize::try_from(page)?,
                        usize::try_from(page_size)?,
                    )?;
                    let footer = format!(
                        "Page {} of {} ({} post(s))",
                        page.page, page.total_pages, page.total
                    );
                    (page.items, Some(footer))
                }
                None => (commands::list(&content, include_drafts, tag.as_deref())?, None),
            };

            if posts.is_empty() {
                println!("No posts found.");
            }
            for post in posts {
                let tags = if post.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", post.tags.join(", "))
                };
                println!(
                    "{}  {} ({}){}  {}",
                    post.date, post.title, post.slug, tags, post.reading_time
                );
            }
            if let Some(footer) = footer {
                println!("{footer}");
            }
        }
        Some(Commands::Tags { content }) => {
            let content = content.unwrap_or_else(|| config.content_dir());
            for tag in commands::tags(&content, include_drafts)? {
                println!("{tag}");
            }
        }
        #[cfg(feature = "mcp")]
        Some(Commands::Serve { source }) => {
            let (source, session) = open_session(&config, source);
            let (content, include_drafts) = source.posts_location(&config);
            tokio::runtime::Runtime::new()?
                .block_on(blogsearch::mcp::serve(session, source, content, include_drafts))?;
        }
        None => {
            Cli::parse_from(["blogsearch", "--help"]);
        }
    }

    Ok(())
}
