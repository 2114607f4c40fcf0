//! Interactive, non-echoing share-code entry — the idiomatic Rust
//! replacement for a raw-terminal password read.

use anyhow::{Context, Result};

pub async fn prompt(message: &str) -> Result<String> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || rpassword::prompt_password(message))
        .await
        .context("secret-entry task panicked")?
        .context("failed to read share code from terminal")
}
