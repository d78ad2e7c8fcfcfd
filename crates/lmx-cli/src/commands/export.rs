use anyhow::{Context, Result};
use lmx_config::{ConfigMode, UnusedKeyPolicy};
use lmx_directory::fetch;
use lmx_sync::{fetch_options, mapper_from_config, search_request};
use tracing::info;

use super::{cancel_on_ctrl_c, connect, load_sync_config};

pub async fn run(
    config_paths: &[String],
    xml: Option<&str>,
    json: Option<&str>,
    chunk_size: Option<i64>,
) -> Result<()> {
    let (_loaded, cfg) = load_sync_config(config_paths, ConfigMode::Export, UnusedKeyPolicy::Warn)?;

    let xml_path = match (xml, json) {
        (Some(p), _) => Some(p.to_string()),
        (None, None) => Some(cfg.output.full_path.clone()),
        (None, Some(_)) => None,
    };

    let cancel = cancel_on_ctrl_c();
    let request = search_request(&cfg.directory);
    let options = fetch_options(&cfg.directory, cancel.clone());

    let mut conn = connect(&cfg).await?;
    let fetched = fetch(&mut conn, &request, &options).await;
    conn.close().await;
    let fetched = fetched.context("directory fetch failed")?;
    println!("records={}", fetched.records.len());

    if let Some(path) = json {
        lmx_snapshot::save(path, &fetched.records)?;
        info!(path, records = fetched.records.len(), "json export written");
        println!("json={path}");
    }

    if let Some(path) = xml_path {
        let mapper = mapper_from_config(&cfg.mapping)?.with_cancel(cancel.clone());
        let elements = mapper.map_records(&fetched.records)?;
        let chunk = chunk_size.unwrap_or(cfg.output.chunk_size);
        let written = lmx_marc::emit_with_cancel(&elements, chunk, &path, &cancel)?;
        for doc in written {
            println!("document={}", doc.display());
        }
    }

    Ok(())
}
