// src/capabilities/airtable.rs
use super::http::{check_status, classify_request_error, json_body};
use super::MemeCatalog;
use crate::error::StepError;
use crate::types::MemeContent;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AirtableMemeCatalog {
    client: Client,
    api_key: String,
    base_id: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct MemeFields {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Notes", default)]
    notes: String,
    #[serde(default)]
    image: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    fields: MemeFields,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<Record>,
    offset: Option<String>,
}

fn record_to_meme(record: Record) -> Option<MemeContent> {
    let image_url = record.fields.image.into_iter().next()?.url;
    if image_url.is_empty() {
        return None;
    }
    Some(MemeContent {
        name: record.fields.name,
        image_url,
        description: record.fields.notes,
    })
}

impl AirtableMemeCatalog {
    pub fn new(api_key: String, base_id: String, table: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_id,
            table,
        }
    }
}

#[async_trait]
impl MemeCatalog for AirtableMemeCatalog {
    async fn list_memes(&self) -> Result<Vec<MemeContent>, StepError> {
        let url = format!(
            "https://api.airtable.com/v0/{}/{}",
            self.base_id,
            urlencoding::encode(&self.table)
        );
        let mut memes = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .timeout(Duration::from_secs(30));
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| classify_request_error("meme_catalog", e))?;
            let response = check_status("meme_catalog", response).await?;
            let page: ListResponse = json_body("meme_catalog", response).await?;

            memes.extend(page.records.into_iter().filter_map(record_to_meme));
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!("😂 Loaded {} memes", memes.len());
        Ok(memes)
    }
}
