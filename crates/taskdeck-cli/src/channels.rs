use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use taskdeck_core::slack::SlackExport;

/// Prints the channel/DM inventory from the static Slack export. Purely
/// presentational, never touches the task store.
pub fn show_channels(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("{} not found", path.display());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let export: SlackExport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    println!("\n=== Private Channels ({}) ===\n", export.channels.private.len());
    for channel in &export.channels.private {
        println!("  🔒 #{:<45} {}", channel.name, channel.id);
    }

    println!("\n=== Public Channels ({}) ===\n", export.channels.public.len());
    for channel in &export.channels.public {
        println!("  🌐 #{:<45} {}", channel.name, channel.id);
    }

    if !export.dms.is_empty() {
        println!("\n=== DMs ({}) ===\n", export.dms.len());
        for dm in &export.dms {
            println!("  💬 {:<45} {}", dm.name, dm.id);
        }
    }

    println!(
        "\nTotal: {} channels, {} DMs",
        export.channel_count(),
        export.dms.len()
    );
    Ok(())
}
