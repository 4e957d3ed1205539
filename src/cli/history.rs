use anyhow::Result;

use super::chat::format_message;
use super::{open_session, print_notices};
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, clear: bool) -> Result<()> {
    let (mut session, mut rx) = open_session(config).await?;

    if clear {
        session.clear_history().await;
        print_notices(&mut rx);
        return Ok(());
    }

    if session.transcript().is_empty() {
        println!("No chat history");
    }
    for msg in session.transcript().iter() {
        println!("{}", format_message(msg));
    }
    Ok(())
}
