//! `cardscan models`: list the models the configured API key can reach.

use anyhow::Result;
use cardscan_config::CardScanConfig;
use cardscan_understanding::filter_catalog;

use crate::runtime;
use crate::terminal_output::{note_info, note_warn, render_table, Column};

pub async fn run(config: &CardScanConfig, all: bool) -> Result<()> {
    let service = runtime::inference_service(config)?;
    let models = service.list_models().await?;
    let families = &config.inference.catalog_families;
    let matching = filter_catalog(&models, families);

    let rows: Vec<Vec<String>> = models
        .iter()
        .map(|m| (m, matching.iter().any(|n| n == m.name.trim())))
        .filter(|(_, usable)| all || *usable)
        .map(|(m, usable)| {
            vec![
                m.name.clone(),
                m.display_name.clone().unwrap_or_default(),
                if usable { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    if rows.is_empty() {
        note_warn(&format!(
            "No models matched the configured families ({}). Use --all to see everything.",
            families.join(", ")
        ));
        return Ok(());
    }

    note_info(&format!("{} of {} models match: {}", matching.len(), models.len(), families.join(", ")));
    print!(
        "{}",
        render_table(
            &[Column::left("Model"), Column::left("Display name"), Column::left("Fallback")],
            &rows,
        )
    );
    Ok(())
}
