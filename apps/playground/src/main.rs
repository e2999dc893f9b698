//! Line-driven editor for trying the caption pipeline against the real services.
//!
//! Commands:
//!   list <query>      search the template catalog
//!   use <query>       start editing the first matching template
//!   set <n> <text>    set caption slot n (0-based)
//!   gen               generate captions for the current template
//!   show              print the current session
//!   quit

use anyhow::Context;
use memeflow_core::api::EditorEvent;
use memeflow_core::domain::{Template, filter_templates};
use memeflow_core::integrations::ImgflipCatalog;
use memeflow_core::resources::GlobalHttpClient;
use memeflow_core::traits::TemplateCatalog;
use memeflow_core::{EditorBuilder, EditorConfig, EditorHandle};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = EditorConfig::from_env()?;
    let http = GlobalHttpClient::default();
    let catalog = ImgflipCatalog::new(http.client.clone(), &config.imgflip.base_url);
    let templates = catalog
        .list_templates()
        .await
        .context("Could not load templates")?;
    println!("{} templates loaded", templates.len());

    let (editor, task) = EditorBuilder::new()
        .with_config(config)
        .with_http_client(http)
        .build()?;

    let mut events = editor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if let Err(e) = run_command(&editor, &templates, line).await {
            println!("error: {:#}", e);
        }
    }

    drop(editor);
    let _ = task.await;
    Ok(())
}

async fn run_command(
    editor: &EditorHandle,
    templates: &[Template],
    line: &str,
) -> anyhow::Result<()> {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "list" => {
            for t in filter_templates(templates, rest).into_iter().take(20) {
                println!("{:>12}  {} ({} boxes)", t.id, t.name, t.box_count);
            }
        }
        "use" => {
            let template = filter_templates(templates, rest)
                .into_iter()
                .next()
                .cloned()
                .with_context(|| format!("no template matches '{}'", rest))?;
            editor.select_template(template).await?;
        }
        "set" => {
            let (index, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let index: usize = index.parse().context("slot must be a number")?;
            editor.set_caption(index, text).await?;
        }
        "gen" => editor.generate_captions().await?,
        "show" => match editor.snapshot().await? {
            Some(snap) => {
                println!("{} [{}]", snap.template.name, snap.session_id);
                for (i, caption) in snap.captions.iter().enumerate() {
                    println!("  {}: {}", i, caption);
                }
                println!(
                    "  preview: {} (pending: {}, in flight: {}, generating: {})",
                    snap.preview.url,
                    snap.render_pending,
                    snap.renders_in_flight,
                    snap.generating
                );
            }
            None => println!("no template selected"),
        },
        other => anyhow::bail!("unknown command '{}'", other),
    }
    Ok(())
}

fn print_event(event: &EditorEvent) {
    match event {
        EditorEvent::PreviewUpdated { url, .. } => println!("preview -> {}", url),
        EditorEvent::RenderFailed { error, .. } => println!("render failed: {}", error),
        EditorEvent::GenerationFailed { error, .. } => println!("generation failed: {}", error),
        EditorEvent::CaptionsChanged { captions, .. } => println!("captions: {:?}", captions),
        _ => {}
    }
}
