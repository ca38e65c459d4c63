use std::env;

use anyhow::{Context, Result};
use s2_engine::resource::ResourceManager;

fn main() -> Result<()> {
    let dir = env::args().nth(1).context("usage: res_dump <game dir>")?;
    let resources = ResourceManager::from_game_dir(&dir)?;
    let keys = resources.keys();
    println!("{} resources in {dir}", keys.len());
    for key in keys {
        let handle = resources.resolve(key)?;
        println!(
            "{key:<28} {source:<16} {location:>10}",
            key = key.to_string(),
            source = format!("{:?}", handle.kind),
            location = handle.location
        );
    }
    Ok(())
}
