use anyhow::{Result, bail};

use super::{open_session, print_notices};
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, set: Option<String>, show: bool) -> Result<()> {
    let (mut session, mut rx) = open_session(config).await?;

    if let Some(key) = set {
        session.open_credential_entry();
        if !session.submit_api_key(&key).await {
            bail!("API key can not be empty");
        }
        print_notices(&mut rx);
    }

    if show {
        session.toggle_api_key_visibility();
    }
    match session.displayed_api_key() {
        Some(key) => println!("API key: {}", key),
        None => println!("API key: not set"),
    }
    Ok(())
}
