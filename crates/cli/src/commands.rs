//! Command implementations.

use std::io::Write;

use anyhow::Result;
use httpcache_core::{Cache, Content, Transport};

use crate::cli::Action;

/// Run `action` against `cache`. Returns the number of URLs that failed.
///
/// Each URL of a batch is handled on its own; a failure is reported and
/// the remaining URLs still run.
pub async fn run<T: Transport>(cache: &Cache<T>, action: Action, json: bool) -> Result<usize> {
    match action {
        Action::Clear { confirmed } => {
            clear(cache, confirmed).await?;
            Ok(0)
        }
        Action::List => {
            list(cache, json).await?;
            Ok(0)
        }
        Action::Remove(urls) => {
            let mut failed = 0;
            for url in urls {
                if let Err(e) = cache.remove(&url).await {
                    tracing::error!("failed to remove {url}: {e}");
                    failed += 1;
                }
            }
            Ok(failed)
        }
        Action::Get(urls) => {
            let mut failed = 0;
            for url in urls {
                if let Err(e) = get(cache, &url, json).await {
                    tracing::error!("failed to retrieve {url}: {e}");
                    failed += 1;
                }
            }
            Ok(failed)
        }
    }
}

async fn clear<T: Transport>(cache: &Cache<T>, confirmed: bool) -> Result<()> {
    let confirmed = confirmed
        || inquire::Confirm::new("Clear cache? This deletes all cached urls.")
            .with_default(false)
            .prompt()?;

    if confirmed {
        cache.clear().await?;
        println!("Cache cleared.");
    }
    Ok(())
}

async fn list<T: Transport>(cache: &Cache<T>, json: bool) -> Result<()> {
    let entries = cache.list().await?;
    let mut out = std::io::stdout().lock();
    for entry in entries {
        if json {
            writeln!(out, "{}", serde_json::to_string(&entry)?)?;
        } else {
            writeln!(out, "{entry}")?;
        }
    }
    Ok(())
}

async fn get<T: Transport>(cache: &Cache<T>, url: &str, json: bool) -> Result<()> {
    let record = cache.get(url).await?;
    let mut out = std::io::stdout().lock();

    if json {
        writeln!(out, "{}", serde_json::to_string(&record)?)?;
        return Ok(());
    }

    match &record.content {
        Content::Text(text) => writeln!(out, "{text}")?,
        Content::Bytes(bytes) => out.write_all(bytes)?,
    }
    Ok(())
}
