//! Similar-user preview.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::SimilarUsers;
use crate::infrastructure::setup::Services;

#[derive(Debug, Serialize)]
pub struct SimilarOutput {
    #[serde(flatten)]
    pub result: SimilarUsers,
}

impl CommandOutput for SimilarOutput {
    fn to_human(&self) -> String {
        if self.result.similar_users.is_empty() {
            return "No similar users found.".to_string();
        }

        let mut table = list_table(&["#", "User", "Score"]);
        for (rank, user) in self.result.similar_users.iter().enumerate() {
            table.add_row(vec![
                (rank + 1).to_string(),
                user.user_id.clone(),
                format!("{:.3}", user.score),
            ]);
        }
        format!("{} similar user(s):\n{table}", self.result.count)
    }
}

pub async fn execute(services: &Services, top_k: usize, vectors: bool, json: bool) -> Result<()> {
    let session = services
        .identity
        .current_session()
        .context("No user identity configured; set identity.user_id or identity.cache_file")?;

    let result = services
        .gateway
        .find_similar_users(&session, top_k, vectors)
        .await?;
    output(&SimilarOutput { result }, json);
    Ok(())
}
