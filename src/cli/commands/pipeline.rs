//! Trait aggregation and embedding submission.

use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::output::{detail_table, list_table, output, truncate, CommandOutput};
use crate::domain::models::traits_descriptor;
use crate::infrastructure::setup::Services;
use crate::services::PipelineReport;

#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub success: bool,
    #[serde(flatten)]
    pub report: PipelineReport,
}

impl CommandOutput for PipelineOutput {
    fn to_human(&self) -> String {
        let report = &self.report;

        let mut sources = list_table(&["Source", "Traits"]);
        for record in &report.records {
            sources.add_row(vec![
                Cell::new(&record.source_id),
                Cell::new(truncate(&traits_descriptor(&record.traits), 60)),
            ]);
        }

        let mut summary = detail_table();
        summary.add_row(vec![
            "Sources used".to_string(),
            format!("{} of {}", report.sources_used, report.sources_attempted),
        ]);
        summary.add_row(vec!["Merged traits".to_string(), report.merged_traits.len().to_string()]);
        summary.add_row(vec![
            "Embedding dimension".to_string(),
            report.embedding_dimension.to_string(),
        ]);

        format!("{sources}\n{summary}")
    }
}

pub async fn execute(services: &Services, sources: Vec<String>, json: bool) -> Result<()> {
    let session = services
        .identity
        .current_session()
        .context("No user identity configured; set identity.user_id or identity.cache_file")?;

    let report = services.pipeline.run(&session, &sources).await?;
    output(
        &PipelineOutput {
            success: true,
            report,
        },
        json,
    );
    Ok(())
}
