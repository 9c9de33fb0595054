use std::time::Duration;

use reqwest::header::USER_AGENT;

use crate::error::{AppError, Result};

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn page_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// Fetch a marketplace page's HTML.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).header(USER_AGENT, BROWSER_UA).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::Extraction(format!("GET {url} returned {status}")));
    }
    Ok(resp.text().await?)
}
