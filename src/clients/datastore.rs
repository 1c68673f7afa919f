use anyhow::{Context, Result, bail};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Client for the row-level REST surface of the hosted data store.
///
/// Every request carries the anonymous API key; callers layer their own
/// bearer token on top so row-level security evaluates as the signed-in
/// user. Queries are built with [`DataClient::from`].
#[derive(Debug, Clone)]
pub struct DataClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl DataClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// Starts a query against `table`.
    #[must_use]
    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder {
            client: self,
            table: table.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            token: None,
        }
    }

    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }
}

/// A single filtered query; terminal methods issue the request.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    client: &'a DataClient,
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<u32>,
    token: Option<String>,
}

impl QueryBuilder<'_> {
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    #[must_use]
    pub fn in_list<T: ToString>(mut self, column: &str, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.filters
            .push((column.to_string(), format!("in.({list})")));
        self
    }

    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.desc"));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Acts as the given signed-in user instead of the anonymous role.
    #[must_use]
    pub fn auth(mut self, access_token: &str) -> Self {
        self.token = Some(access_token.to_string());
        self
    }

    fn request_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/rest/v1/{}",
            self.client.base_url, self.table
        ))
        .context("Invalid data store URL")?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &self.select);
            for (column, predicate) in &self.filters {
                pairs.append_pair(column, predicate);
            }
            if let Some(order) = &self.order {
                pairs.append_pair("order", order);
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        Ok(url)
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.get(url), self.token.as_deref())
            .send()
            .await
            .context("Data store request failed")?;

        read_rows(response).await
    }

    /// Fetches at most one row. An empty result is `Ok(None)`, not an
    /// error; the data store reports it as 406 on object requests.
    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.get(url), self.token.as_deref())
            .header(reqwest::header::ACCEPT, "application/vnd.pgrst.object+json")
            .send()
            .await
            .context("Data store request failed")?;

        match response.status() {
            StatusCode::NOT_ACCEPTABLE | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(
                response
                    .json()
                    .await
                    .context("Failed to parse data store row")?,
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                bail!("Data store error: status={status}, body={body}")
            }
        }
    }

    /// Exact row count for the current filters.
    pub async fn count(self) -> Result<u64> {
        let mut url = self.request_url()?;
        url.query_pairs_mut().append_pair("limit", "1");

        let response = self
            .client
            .authorize(self.client.client.get(url), self.token.as_deref())
            .header("Prefer", "count=exact")
            .send()
            .await
            .context("Data store count request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("Data store count error: status={status}")
        }

        let range = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        parse_content_range_total(&range)
            .with_context(|| format!("Unparseable Content-Range: {range}"))
    }

    /// Inserts one row, returning the created representation.
    pub async fn insert<T: DeserializeOwned>(self, row: &impl Serialize) -> Result<T> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.post(url), self.token.as_deref())
            .header("Prefer", "return=representation")
            .header(reqwest::header::ACCEPT, "application/vnd.pgrst.object+json")
            .json(row)
            .send()
            .await
            .context("Data store insert failed")?;

        read_single(response).await
    }

    /// Inserts or updates on primary-key conflict.
    pub async fn upsert(self, row: &impl Serialize) -> Result<()> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.post(url), self.token.as_deref())
            .header("Prefer", "resolution=merge-duplicates")
            .json(row)
            .send()
            .await
            .context("Data store upsert failed")?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Data store upsert error: status={status}, body={body}")
        }
    }

    /// Applies a patch to every row matching the filters and returns the
    /// updated representations (empty when nothing matched).
    pub async fn update<T: DeserializeOwned>(self, patch: &impl Serialize) -> Result<Vec<T>> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.patch(url), self.token.as_deref())
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .context("Data store update failed")?;

        read_rows(response).await
    }

    /// Deletes matching rows; returns how many were removed.
    pub async fn delete(self) -> Result<u64> {
        let url = self.request_url()?;
        let response = self
            .client
            .authorize(self.client.client.delete(url), self.token.as_deref())
            .header("Prefer", "return=representation")
            .send()
            .await
            .context("Data store delete failed")?;

        let rows: Vec<serde_json::Value> = read_rows(response).await?;
        Ok(rows.len() as u64)
    }
}

async fn read_rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>> {
    let status = response.status();
    let body = response.text().await.context("Failed to read response")?;

    if !status.is_success() {
        bail!("Data store error: status={status}, body={body}")
    }

    serde_json::from_str(&body).with_context(|| {
        let truncated: String = body.chars().take(500).collect();
        format!("Failed to parse data store rows: {truncated}")
    })
}

async fn read_single<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.context("Failed to read response")?;

    if !status.is_success() {
        bail!("Data store error: status={status}, body={body}")
    }

    serde_json::from_str(&body).with_context(|| {
        let truncated: String = body.chars().take(500).collect();
        format!("Failed to parse data store row: {truncated}")
    })
}

/// Content-Range arrives as `0-0/42` or `*/42`; the total sits after the slash.
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DataClient {
        DataClient::new(Client::new(), "http://localhost:54321", "anon")
    }

    #[test]
    fn test_query_url_assembly() {
        let data = client();
        let url = data
            .from("jobs")
            .select("id,title")
            .eq("is_active", true)
            .order_desc("posted_at")
            .limit(3)
            .request_url()
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/jobs");
        let query = url.query().unwrap();
        assert!(query.contains("select=id%2Ctitle"));
        assert!(query.contains("is_active=eq.true"));
        assert!(query.contains("order=posted_at.desc"));
        assert!(query.contains("limit=3"));
    }

    #[test]
    fn test_in_list_predicate() {
        let data = client();
        let url = data
            .from("applications")
            .in_list("job_id", &["a", "b"])
            .request_url()
            .unwrap();

        assert!(url.query().unwrap().contains("job_id=in.%28a%2Cb%29"));
    }

    #[test]
    fn test_content_range_parsing() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/7"), Some(7));
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
