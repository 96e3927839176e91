//! Web search adapters.
//!
//! Each hit's snippet is used as its summary. The `kind` of a summary is inferred from the
//! result host.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::WebSearcher;
use super::error::{ProviderError, ProviderResult};
use crate::config::{Config, SearchBackendKind};
use crate::model::{SourceKind, SourceSummary};

pub const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";
pub const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const BING_URL: &str = "https://api.bing.microsoft.com/v7.0/search";

const USER_AGENT: &str = concat!("sightline/", env!("CARGO_PKG_VERSION"));

/// Search backend and its credentials.
#[derive(Clone)]
pub enum SearchBackend {
    DuckDuckGo,
    Google {
        api_key: SecretString,
        engine_id: String,
    },
    Bing {
        api_key: SecretString,
    },
}

impl SearchBackend {
    fn default_endpoint(&self) -> &'static str {
        match self {
            SearchBackend::DuckDuckGo => DUCKDUCKGO_URL,
            SearchBackend::Google { .. } => GOOGLE_CSE_URL,
            SearchBackend::Bing { .. } => BING_URL,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SearchBackend::DuckDuckGo => "duckduckgo",
            SearchBackend::Google { .. } => "google",
            SearchBackend::Bing { .. } => "bing",
        }
    }
}

#[derive(Clone)]
pub struct HttpWebSearcher {
    http: reqwest::Client,
    backend: SearchBackend,
    endpoint: String,
}

impl HttpWebSearcher {
    pub fn new(http: reqwest::Client, backend: SearchBackend) -> Self {
        let endpoint = backend.default_endpoint().to_string();
        Self {
            http,
            backend,
            endpoint,
        }
    }

    /// Builds the backend named in `config`. Missing credentials fall back to DuckDuckGo;
    /// [`Config::validate`] rejects that combination before startup.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        let backend = match (
            config.search_backend,
            &config.search_api_key,
            &config.search_engine_id,
        ) {
            (SearchBackendKind::Google, Some(key), Some(cx)) => SearchBackend::Google {
                api_key: key.clone(),
                engine_id: cx.clone(),
            },
            (SearchBackendKind::Bing, Some(key), _) => SearchBackend::Bing {
                api_key: key.clone(),
            },
            _ => SearchBackend::DuckDuckGo,
        };
        Self::new(http, backend)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn duckduckgo(&self, query: &str) -> ProviderResult<Vec<Hit>> {
        #[derive(Deserialize)]
        struct DdgResponse {
            #[serde(rename = "AbstractText", default)]
            abstract_text: String,
            #[serde(rename = "AbstractURL", default)]
            abstract_url: String,
            #[serde(rename = "RelatedTopics", default)]
            related_topics: Vec<DdgTopic>,
        }

        #[derive(Deserialize)]
        struct DdgTopic {
            #[serde(rename = "FirstURL")]
            first_url: Option<String>,
            #[serde(rename = "Text")]
            text: Option<String>,
        }

        let response = self
            .http
            .get(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
            ])
            .send()
            .await?;
        let parsed: DdgResponse = Self::read_json(response).await?;

        let mut hits = Vec::new();
        if !parsed.abstract_text.is_empty() && !parsed.abstract_url.is_empty() {
            hits.push(Hit {
                url: parsed.abstract_url,
                snippet: parsed.abstract_text,
            });
        }
        hits.extend(parsed.related_topics.into_iter().filter_map(|t| {
            Some(Hit {
                url: t.first_url?,
                snippet: t.text.unwrap_or_default(),
            })
        }));
        Ok(hits)
    }

    async fn google(
        &self,
        query: &str,
        top_k: usize,
        api_key: &SecretString,
        engine_id: &str,
    ) -> ProviderResult<Vec<Hit>> {
        #[derive(Deserialize)]
        struct CseResponse {
            #[serde(default)]
            items: Vec<CseItem>,
        }

        #[derive(Deserialize)]
        struct CseItem {
            link: String,
            #[serde(default)]
            snippet: String,
        }

        // Custom Search caps `num` at 10.
        let num = top_k.clamp(1, 10).to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("key", api_key.expose_secret()),
                ("cx", engine_id),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;
        let parsed: CseResponse = Self::read_json(response).await?;

        Ok(parsed
            .items
            .into_iter()
            .map(|i| Hit {
                url: i.link,
                snippet: i.snippet,
            })
            .collect())
    }

    async fn bing(
        &self,
        query: &str,
        top_k: usize,
        api_key: &SecretString,
    ) -> ProviderResult<Vec<Hit>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct BingResponse {
            web_pages: Option<BingPages>,
        }

        #[derive(Deserialize)]
        struct BingPages {
            #[serde(default)]
            value: Vec<BingPage>,
        }

        #[derive(Deserialize)]
        struct BingPage {
            url: String,
            #[serde(default)]
            snippet: String,
        }

        let count = top_k.max(1).to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", api_key.expose_secret())
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;
        let parsed: BingResponse = Self::read_json(response).await?;

        Ok(parsed
            .web_pages
            .map(|p| p.value)
            .unwrap_or_default()
            .into_iter()
            .map(|p| Hit {
                url: p.url,
                snippet: p.snippet,
            })
            .collect())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(status, &text));
        }
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for HttpWebSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWebSearcher")
            .field("backend", &self.backend.name())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl WebSearcher for HttpWebSearcher {
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    async fn search_and_summarize(
        &self,
        query: &str,
        top_k: usize,
    ) -> ProviderResult<Vec<SourceSummary>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hits = match &self.backend {
            SearchBackend::DuckDuckGo => self.duckduckgo(query).await?,
            SearchBackend::Google { api_key, engine_id } => {
                self.google(query, top_k, api_key, engine_id).await?
            }
            SearchBackend::Bing { api_key } => self.bing(query, top_k, api_key).await?,
        };

        let summaries: Vec<SourceSummary> = hits
            .into_iter()
            .filter(|h| !h.snippet.trim().is_empty())
            .take(top_k)
            .map(Hit::into_summary)
            .collect();
        debug!(count = summaries.len(), "web search summarized");
        Ok(summaries)
    }
}

struct Hit {
    url: String,
    snippet: String,
}

impl Hit {
    fn into_summary(self) -> SourceSummary {
        let kind = classify_source(&self.url);
        SourceSummary {
            reliability: Some(default_reliability(kind)),
            source: self.url,
            summary: self.snippet.trim().to_string(),
            kind,
        }
    }
}

/// Infers the kind of a source from its URL host.
pub fn classify_source(url: &str) -> SourceKind {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return SourceKind::Web;
    };

    let is_gov = host.ends_with(".gov") || host.contains(".gov.") || host.ends_with(".museum");
    if host.contains("wikipedia.org") || host.contains("wikivoyage.org") {
        SourceKind::Wiki
    } else if is_gov {
        SourceKind::Official
    } else if host.contains("blog")
        || host.ends_with("medium.com")
        || host.ends_with("wordpress.com")
        || host.ends_with("substack.com")
    {
        SourceKind::Blog
    } else {
        SourceKind::Web
    }
}

fn default_reliability(kind: SourceKind) -> f32 {
    match kind {
        SourceKind::Official => 0.9,
        SourceKind::Wiki => 0.8,
        SourceKind::Web => 0.6,
        SourceKind::Blog => 0.5,
    }
}
