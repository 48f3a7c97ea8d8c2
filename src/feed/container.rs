//! Container registry tags feed
//!
//! Lists `/v2/<repo>/tags/list` of an OCI distribution registry, following
//! `Link` headers. Anonymous pulls get a bearer token from the service named
//! in the registry's `WWW-Authenticate` challenge. Tags come in registry
//! order and carry no notes or URL.

use crate::error::{Error, Result};
use crate::feed::link::next_link_from;
use crate::feed::{
    ContainerQuery, FeedKind, FeedQuery, ReleaseFeed, ReleaseSender, ReleaseStream,
    find_in_stream, query_mismatch,
};
use crate::types::Release;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// Parameters of a `Bearer` `WWW-Authenticate` challenge
#[derive(Debug, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: String,
    scope: String,
}

impl BearerChallenge {
    fn parse(header: &str) -> Result<Self> {
        let params = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Auth(format!("unsupported registry auth: {header}")))?;

        let (mut realm, mut service, mut scope) = (None, None, None);
        for pair in params.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::Auth(format!("invalid challenge parameter {pair:?}")))?;
            let value = value.trim_matches('"').to_string();
            match key.trim() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        let required = |name: &str, value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Auth(format!("registry challenge has no {name}")))
        };
        Ok(Self {
            realm: required("realm", realm)?,
            service: required("service", service)?,
            scope: required("scope", scope)?,
        })
    }
}

/// Feed of the tags of a container registry repository
#[derive(Debug, Clone)]
pub struct ContainerRegistryFeed {
    client: Client,
    url: String,
    token: Option<String>,
    page_size: Option<u32>,
    limit: Option<usize>,
}

impl ContainerRegistryFeed {
    /// Create a feed for the registry at `url`
    ///
    /// `limit` of `None` or 0 scans every tag.
    pub fn new(
        url: &str,
        token: Option<String>,
        page_size: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Self> {
        if page_size == Some(0) {
            return Err(Error::Config(
                "container_registry feed page_size must be positive".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Platform(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            page_size,
            limit: limit.filter(|&l| l > 0),
        })
    }

    fn first_page_url(&self, repo: &str) -> String {
        let mut url = format!("{}/v2/{repo}/tags/list", self.url);
        if let Some(n) = self.page_size {
            url.push_str(&format!("?n={n}"));
        }
        url
    }

    /// Registries usually send the next link relative to their root
    fn resolve(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            format!("{}{next}", self.url)
        }
    }

    async fn get(&self, url: &str, token: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String> {
        debug!(realm = %challenge.realm, scope = %challenge.scope, "Requesting registry token");
        let response: TokenResponse = self
            .client
            .get(&challenge.realm)
            .query(&[("scope", &challenge.scope), ("service", &challenge.service)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.token.is_empty() {
            return Err(Error::Auth("registry token service returned no token".to_string()));
        }
        Ok(response.token)
    }

    /// Fetch one page of tags
    ///
    /// On the first page, an unauthenticated 401 with a bearer challenge is
    /// answered once with a token from the challenge's realm; the token is
    /// kept in `token` for the following pages.
    async fn fetch_page(
        &self,
        url: &str,
        token: &mut Option<String>,
        first: bool,
    ) -> Result<(Vec<String>, Option<String>)> {
        debug!(url, "Fetching registry tags");
        let mut response = self.get(url, token.as_deref()).await?;

        if first && response.status() == StatusCode::UNAUTHORIZED && token.is_none() {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .map(BearerChallenge::parse)
                .transpose()?;
            if let Some(challenge) = challenge {
                let fetched = self.fetch_token(&challenge).await?;
                response = self.get(url, Some(&fetched)).await?;
                *token = Some(fetched);
            }
        }

        if response.status() != StatusCode::OK {
            return Err(Error::Platform(format!(
                "HTTP status {} when retrieving tags: {url}",
                response.status()
            )));
        }

        let next = next_link_from(response.headers()).map(|next| self.resolve(&next));
        let list: TagList = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("invalid tag list from {url}: {e}")))?;
        Ok((list.tags.unwrap_or_default(), next))
    }

    async fn produce(self, query: ContainerQuery, mut tx: ReleaseSender) {
        let mut token = self.token.clone();
        let mut url = Some(self.first_page_url(&query.repo));
        let mut first = true;

        while let Some(current) = url {
            if tx.is_cancelled() {
                return;
            }
            let (tags, next) = match self.fetch_page(&current, &mut token, first).await {
                Ok(page) => page,
                Err(e) => {
                    tx.fail(e).await;
                    return;
                }
            };
            first = false;
            for tag in tags {
                if !tx.send(Release::new(tag)).await {
                    return;
                }
            }
            url = next;
        }
    }
}

#[async_trait]
impl ReleaseFeed for ContainerRegistryFeed {
    fn releases(&self, query: &FeedQuery) -> ReleaseStream {
        let FeedQuery::ContainerRegistry(query) = query else {
            return ReleaseStream::failed(query_mismatch(FeedKind::ContainerRegistry, query));
        };
        let feed = self.clone();
        let query = query.clone();
        ReleaseStream::spawn(self.limit, move |tx| feed.produce(query, tx))
    }

    async fn release(&self, version: &str, query: &FeedQuery) -> Result<Option<Release>> {
        if !matches!(query, FeedQuery::ContainerRegistry(_)) {
            return Err(query_mismatch(FeedKind::ContainerRegistry, query));
        }
        find_in_stream(self.releases(query), version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const TOKEN: &str = "12345abc";
    const SCOPE: &str = "repository:library/alpine:pull";

    fn query(repo: &str) -> FeedQuery {
        FeedQuery::ContainerRegistry(ContainerQuery {
            repo: repo.to_string(),
        })
    }

    async fn versions(mut stream: ReleaseStream) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item?.version);
        }
        Ok(out)
    }

    #[test]
    fn test_parse_challenge() {
        let challenge = BearerChallenge::parse(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/alpine:pull""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service, "registry.docker.io");
        assert_eq!(challenge.scope, SCOPE);

        assert!(BearerChallenge::parse("Basic realm=\"x\"").is_err());
        assert!(BearerChallenge::parse(r#"Bearer service="s",scope="x""#).is_err());
        assert!(BearerChallenge::parse(r#"Bearer realm="r",scope="x""#).is_err());
        assert!(BearerChallenge::parse(r#"Bearer realm="r",service="s""#).is_err());
        assert!(BearerChallenge::parse("Bearer garbage").is_err());
    }

    #[tokio::test]
    async fn test_anonymous_token_and_relative_pagination() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _challenge = server
            .mock("GET", "/v2/library/alpine/tags/list")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .with_header(
                "www-authenticate",
                &format!(r#"Bearer realm="{url}/token",service="registry.test",scope="{SCOPE}""#),
            )
            .create_async()
            .await;
        let token = server
            .mock("GET", "/token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("scope".into(), SCOPE.into()),
                Matcher::UrlEncoded("service".into(), "registry.test".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"token":"{TOKEN}","expires_in":300}}"#))
            .expect(1)
            .create_async()
            .await;
        let _page1 = server
            .mock("GET", "/v2/library/alpine/tags/list")
            .match_query(Matcher::Exact("n=2".into()))
            .match_header("authorization", format!("Bearer {TOKEN}").as_str())
            .with_header("content-type", "application/json")
            .with_header("link", r#"</v2/library/alpine/tags/list?last=2.7&n=2>; rel="next""#)
            .with_body(r#"{"name":"library/alpine","tags":["2.6","2.7"]}"#)
            .create_async()
            .await;
        let _page2 = server
            .mock("GET", "/v2/library/alpine/tags/list")
            .match_query(Matcher::UrlEncoded("last".into(), "2.7".into()))
            .match_header("authorization", format!("Bearer {TOKEN}").as_str())
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"library/alpine","tags":["3"]}"#)
            .create_async()
            .await;

        let feed = ContainerRegistryFeed::new(&url, None, Some(2), None).unwrap();
        let got = versions(feed.releases(&query("library/alpine"))).await.unwrap();
        assert_eq!(got, vec!["2.6", "2.7", "3"]);
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_configured_token_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/library/private/tags/list")
            .match_header("authorization", "Bearer secret")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"library/private","tags":["1.0","1.1"]}"#)
            .create_async()
            .await;

        let feed =
            ContainerRegistryFeed::new(&server.url(), Some("secret".to_string()), None, Some(0))
                .unwrap();
        assert_eq!(feed.limit, None);
        let got = versions(feed.releases(&query("library/private"))).await.unwrap();
        assert_eq!(got, vec!["1.0", "1.1"]);
    }

    #[tokio::test]
    async fn test_errors_end_the_stream() {
        let mut server = mockito::Server::new_async().await;
        let _basic = server
            .mock("GET", "/v2/library/basicauth/tags/list")
            .with_status(401)
            .with_header("www-authenticate", "Basic")
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/v2/library/missing/tags/list")
            .with_status(404)
            .create_async()
            .await;
        let _invalid = server
            .mock("GET", "/v2/library/invalidjson/tags/list")
            .with_header("content-type", "application/json")
            .with_body(r#"{"tags":"#)
            .create_async()
            .await;

        let feed = ContainerRegistryFeed::new(&server.url(), None, None, None).unwrap();
        let err = versions(feed.releases(&query("library/basicauth"))).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "{err}");
        let err = versions(feed.releases(&query("library/missing"))).await.unwrap_err();
        assert!(err.to_string().contains("404"), "{err}");
        let err = versions(feed.releases(&query("library/invalidjson"))).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "{err}");
    }

    #[tokio::test]
    async fn test_release_lookup_scans_tags() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/library/alpine/tags/list")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"library/alpine","tags":["3.18","3.19","latest"]}"#)
            .expect(2)
            .create_async()
            .await;

        let feed = ContainerRegistryFeed::new(&server.url(), Some("t".to_string()), None, None)
            .unwrap();
        let found = feed.release("3.19", &query("library/alpine")).await.unwrap();
        assert_eq!(found, Some(Release::new("3.19")));
        assert!(feed.release("4.0", &query("library/alpine")).await.unwrap().is_none());
    }

    #[test]
    fn test_page_size_and_urls() {
        assert!(ContainerRegistryFeed::new("https://r.example", None, Some(0), None).is_err());
        let feed = ContainerRegistryFeed::new("https://r.example/", None, Some(50), None).unwrap();
        assert_eq!(
            feed.first_page_url("library/alpine"),
            "https://r.example/v2/library/alpine/tags/list?n=50"
        );
        assert_eq!(feed.resolve("/v2/x?last=1"), "https://r.example/v2/x?last=1");
        assert_eq!(feed.resolve("https://cdn.example/v2/x"), "https://cdn.example/v2/x");
    }
}
