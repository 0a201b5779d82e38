/// TMDB API client
///
/// Two calls per film: `/movie/popular` for the listing, then
/// `/movie/{id}?append_to_response=credits,keywords` for everything the
/// catalog stores.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{NewFilm, TmdbMovieDetails, TmdbPage},
    services::providers::MovieSource,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const REGION: &str = "FR";
const APPENDED: &str = "credits,keywords";

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: String, api_url: String, image_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_url,
            language,
        }
    }

    /// Builds a client from configuration; fails when no API key is set
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let api_key = config
            .tmdb_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::InvalidInput("TMDB_API_KEY is not set".to_string()))?;

        Ok(Self::new(
            api_key,
            config.tmdb_api_url.clone(),
            config.tmdb_image_url.clone(),
            config.tmdb_language.clone(),
        ))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Query parameters sent with every request
    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&'static str, String)],
    ) -> AppResult<T> {
        let mut params = self.base_params();
        params.extend_from_slice(extra);

        let response = self
            .http_client
            .get(self.endpoint(path))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {} for {}: {}",
                status, path, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl MovieSource for TmdbClient {
    #[tracing::instrument(skip(self))]
    async fn popular_page(&self, page: u32) -> AppResult<TmdbPage> {
        let listing: TmdbPage = self
            .get_json(
                "/movie/popular",
                &[("page", page.to_string()), ("region", REGION.to_string())],
            )
            .await?;

        tracing::debug!(
            results = listing.results.len(),
            total_pages = listing.total_pages,
            "Fetched popular page"
        );

        Ok(listing)
    }

    #[tracing::instrument(skip(self))]
    async fn movie_details(&self, tmdb_id: i64) -> AppResult<NewFilm> {
        let details: TmdbMovieDetails = self
            .get_json(
                &format!("/movie/{}", tmdb_id),
                &[("append_to_response", APPENDED.to_string())],
            )
            .await?;

        Ok(details.into_new_film(&self.image_url))
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
