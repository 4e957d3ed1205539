use anyhow::Result;

use super::chat::format_model_list;
use super::open_session;
use crate::core::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    let (mut session, _rx) = open_session(config).await?;
    if session.api_key().is_none() {
        println!("No API key set, showing the default models");
    }
    session.refresh_models().await;
    for line in format_model_list(&session) {
        println!("{}", line);
    }
    Ok(())
}
