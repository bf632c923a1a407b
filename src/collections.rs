//! `kidx collections`: configured collections and whether they resolve.

use anyhow::Result;

use crate::config::Config;

pub fn list_collections(config: &Config) -> Result<()> {
    if config.collections.is_empty() {
        println!("No collections configured.");
        return Ok(());
    }

    println!("{:<24} {:<28} {:<14} FOLDER", "COLLECTION", "LABEL", "STATUS");
    for (entry, collection) in config
        .collections
        .iter()
        .zip(config.resolved_collections())
    {
        let (status, folder) = match &collection.folder {
            Some(folder) => ("OK", folder.clone()),
            None => (
                "UNCONFIGURED",
                entry
                    .folder_env
                    .as_ref()
                    .map(|var| format!("${}", var))
                    .unwrap_or_default(),
            ),
        };
        println!(
            "{:<24} {:<28} {:<14} {}",
            collection.name, collection.label, status, folder
        );
        if let Some(description) = &entry.description {
            println!("  {}", description);
        }
    }

    Ok(())
}
