use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, warn};

use crate::{
    config::PipelineConfig,
    models::Symbol,
    providers::{
        ClientBuildSnafu, DataProvider, MissingCredentialSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
        alpha_vantage::params::DailySeriesParams,
        throttle::{Pacer, PauseReason, ThrottlePolicy, TokioPacer},
    },
};

pub const BASE_URL: &str = "https://www.alphavantage.co/query";
pub const PROVIDER_CODE: &str = "alphavantage";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    policy: ThrottlePolicy,
    pacer: Arc<dyn Pacer>,
}

impl AlphaVantageProvider {
    /// Creates a provider against the public endpoint.
    ///
    /// A missing key is accepted here and reported by the first fetch, before
    /// any request goes out.
    pub fn new(api_key: Option<SecretString>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key,
            policy: ThrottlePolicy::default(),
            pacer: Arc::new(TokioPacer),
        })
    }

    /// Creates a provider from the pipeline configuration (key, endpoint, pacing).
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ProviderInitError> {
        Ok(Self::new(config.alphavantage_key.clone())?
            .with_base_url(&config.alphavantage_base_url)
            .with_policy(config.throttle_policy()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_policy(mut self, policy: ThrottlePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    async fn send(&self, params: &DailySeriesParams<'_>) -> Result<Response, ProviderError> {
        self.client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .context(ReqwestSnafu)
    }
}

#[async_trait]
impl DataProvider for AlphaVantageProvider {
    fn code(&self) -> &'static str {
        PROVIDER_CODE
    }

    async fn fetch_daily(&self, symbol: &Symbol) -> Result<Value, ProviderError> {
        let api_key = self.api_key.as_ref().context(MissingCredentialSnafu)?;
        let params = DailySeriesParams::compact(symbol, api_key);

        let mut response = self.send(&params).await?;
        if self.policy.is_throttled(response.status()) {
            warn!(
                %symbol,
                status = %response.status(),
                backoff_secs = self.policy.backoff.as_secs_f64(),
                "provider throttled request; backing off before the single retry"
            );
            self.pacer
                .pause(PauseReason::Backoff, self.policy.backoff)
                .await;
            response = self.send(&params).await?;
        }

        let response = response.error_for_status().context(ReqwestSnafu)?;
        debug!(%symbol, status = %response.status(), "provider responded");

        // cool-down after every successful response
        self.pacer
            .pause(PauseReason::CoolDown, self.policy.cool_down)
            .await;

        response.json::<Value>().await.context(ReqwestSnafu)
    }
}
