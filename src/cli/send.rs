use anyhow::{Result, bail};

use super::{open_session, print_notices};
use crate::chat::{SendError, SendRejected};
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, message: &str) -> Result<()> {
    let (mut session, mut rx) = open_session(config).await?;

    let result = session.submit(message).await;
    print_notices(&mut rx);

    match result {
        Ok(reply) => {
            println!("{}", reply.text());
            Ok(())
        }
        Err(SendError::Rejected(SendRejected::MissingCredential)) => {
            bail!("No API key set. Run `gemchat key --set <KEY>` or set GEMINI_API_KEY")
        }
        Err(e) => Err(e.into()),
    }
}
