use console::style;
use sidetag_core::codec;
use sidetag_core::library::{TagLibrary, TagLibraryFile};
use sidetag_core::tag::{COLLECTED_TAGS_GROUP_ID, Tag, TagGroup};
use sidetag_core::Functionality;
use anyhow::{Context, Result};
use tracing::info;

use crate::app::{Sidetag, confirm};
use crate::cli::{
    AddArgs, ClearArgs, CollectArgs, EditArgs, LibraryArgs, LibraryCommands, RemoveArgs, ShowArgs,
};

fn print_tags(label: &str, tags: &[Tag]) {
    if tags.is_empty() {
        println!("  {}: -", label);
        return;
    }
    let titles = tags
        .iter()
        .map(|t| style(&t.title).bold().to_string())
        .collect::<Vec<_>>();
    println!("  {}: {}", label, titles.join(", "));
}

pub async fn handle_add(args: AddArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(&args.paths)?;
    let mut tags: Vec<Tag> = args.tags.into_iter().map(Tag::new).collect();
    tags.extend(
        args.generated
            .into_iter()
            .map(|g| Tag::with_functionality(Functionality::from(g))),
    );
    if tags.is_empty() {
        anyhow::bail!("Nothing to add, use --tag or --generate");
    }

    let added = app.engine.add_tags(&paths, &tags, true).await;
    app.confirm_pending_edits().await?;
    if added {
        info!("Tags added to {} entries", paths.len());
    }
    Ok(())
}

pub async fn handle_edit(args: EditArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(std::slice::from_ref(&args.path))?;
    let mut tag = Tag::new(args.title);
    tag.position = args.position;

    if !app.engine.edit_tag_for_entry(&paths[0], &tag, args.to.as_deref()).await {
        anyhow::bail!("Editing '{}' failed", tag.title);
    }
    Ok(())
}

pub async fn handle_remove(args: RemoveArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(&args.paths)?;
    let tags: Vec<Tag> = args.tags.into_iter().map(Tag::new).collect();

    if !app.engine.remove_tags(&paths, &tags).await {
        anyhow::bail!("Removing tags failed");
    }
    Ok(())
}

pub async fn handle_clear(args: ClearArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(&args.paths)?;
    if !args.yes && !confirm(format!("Remove all tags from {} entries?", paths.len())).await? {
        println!("Aborted.");
        return Ok(());
    }

    if !app.engine.remove_all_tags(&paths).await {
        anyhow::bail!("Removing all tags failed");
    }
    Ok(())
}

pub async fn handle_show(args: ShowArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(std::slice::from_ref(&args.path))?;
    let path = &paths[0];
    let is_file = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?
        .is_file();
    let config = app.engine.config();

    println!("{}", path.display());
    println!("  representation: {:?}", config.representation(is_file));
    let filename_tags: Vec<Tag> = if is_file {
        codec::decode_path(path, config.delimiter)?
            .into_iter()
            .map(Tag::plain)
            .collect()
    } else {
        Vec::new()
    };
    print_tags("file name", &filename_tags);

    match app.engine.store().load(path, is_file).await? {
        Some(meta) => {
            print_tags("sidecar", &meta.tags);
            if let Some(version) = meta.app_version() {
                println!("  sidecar written by version {}", version);
            }
        }
        None => println!("  sidecar: none"),
    }
    Ok(())
}

pub async fn handle_collect(args: CollectArgs, app: Sidetag) -> Result<()> {
    let paths = app.prepare(std::slice::from_ref(&args.location))?;
    let config = app.engine.config();

    let count = app
        .index
        .index_location(&paths[0], app.engine.store(), config.delimiter)
        .await
        .with_context(|| format!("Failed to index {}", paths[0].display()))?;
    println!("Indexed {} entries", count);

    let group = app
        .library
        .tag_groups()
        .await?
        .into_iter()
        .find(|g| g.uuid == COLLECTED_TAGS_GROUP_ID)
        .unwrap_or_else(|| {
            TagGroup::collected(Some(config.tag_color.clone()), Some(config.tag_text_color.clone()), Vec::new())
        });
    let before = group.children.len();

    if !app.engine.collect_tags_from_location(&group).await {
        anyhow::bail!("Collecting tags failed");
    }

    let after = app
        .library
        .tag_groups()
        .await?
        .into_iter()
        .find(|g| g.uuid == COLLECTED_TAGS_GROUP_ID)
        .map_or(0, |g| g.children.len());
    println!("Collected {} new tags", after.saturating_sub(before));
    Ok(())
}

pub async fn handle_library(args: LibraryArgs, app: Sidetag) -> Result<()> {
    match args.command {
        LibraryCommands::List => {
            for group in app.library.tag_groups().await? {
                println!("{}", style(&group.title).bold().underlined());
                print_tags("tags", &group.children);
            }
        }
        LibraryCommands::Export { output } => {
            let export = app.library.export_tag_groups().await?;
            let json = serde_json::to_string_pretty(&export)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported {} tag groups to {}", export.tag_groups.len(), path.display());
                }
                None => println!("{}", json),
            }
        }
        LibraryCommands::Import { file, replace } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let import: TagLibraryFile = serde_json::from_slice(&content)
                .with_context(|| format!("{} is not a tag library export", file.display()))?;
            let count = import.tag_groups.len();
            app.library.import_tag_groups(import.tag_groups, replace).await?;
            println!("Imported {} tag groups into {}", count, app.library.path().display());
        }
    }
    Ok(())
}
