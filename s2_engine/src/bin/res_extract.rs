use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use s2_engine::resource::ResourceManager;
use s2_formats::patch_file::encode_patch_file;
use s2_formats::ResourceType;

#[derive(Parser, Debug)]
#[command(about = "Extract SCI resources as patch files", version)]
struct Args {
    /// Directory holding resource.map and its volumes
    #[arg(long, value_name = "DIR", default_value = ".")]
    game_dir: PathBuf,

    /// Destination directory for the patch files
    #[arg(long, value_name = "DIR", default_value = "extracted")]
    dest: PathBuf,

    /// Resource type names to extract (e.g. `sound`, `view`; may repeat)
    #[arg(long = "type", value_name = "NAME")]
    types: Vec<String>,

    /// Overwrite existing files instead of skipping them
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = build_type_filter(&args.types)?;

    let resources = ResourceManager::from_game_dir(&args.game_dir)
        .with_context(|| format!("indexing {}", args.game_dir.display()))?;
    fs::create_dir_all(&args.dest)
        .with_context(|| format!("creating destination {}", args.dest.display()))?;

    let mut extracted = 0usize;
    let mut skipped = 0usize;
    for key in resources.keys() {
        if let Some(filter) = filter.as_ref() {
            if !filter.contains(&key.kind) {
                continue;
            }
        }
        // Audio36/Sync36 entries have no patch file name.
        let Some(ext) = key.kind.patch_extension().filter(|_| key.tuple.is_none()) else {
            skipped += 1;
            continue;
        };

        let dest_path = args.dest.join(format!("{}.{ext}", key.number));
        if dest_path.exists() && !args.overwrite {
            continue;
        }
        let resource = resources
            .load_resource(key)
            .with_context(|| format!("loading {key}"))?;
        fs::write(&dest_path, encode_patch_file(key.kind, resource.data()))
            .with_context(|| format!("writing {}", dest_path.display()))?;
        extracted += 1;
        // Extraction touches every resource once; keep memory flat.
        resources.evict(key);
    }

    println!(
        "Extracted {extracted} resources into {} ({skipped} without a patch name)",
        args.dest.display()
    );
    Ok(())
}

fn build_type_filter(names: &[String]) -> Result<Option<HashSet<ResourceType>>> {
    let mut kinds = HashSet::new();
    for name in names {
        let Some(kind) = ResourceType::from_name(name.trim()) else {
            bail!("unknown resource type {name:?}");
        };
        kinds.insert(kind);
    }
    Ok(if kinds.is_empty() { None } else { Some(kinds) })
}
