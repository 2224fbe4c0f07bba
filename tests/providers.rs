//! Provider tests against mock HTTP backends
//!
//! Each test starts a wiremock server standing in for the real site and
//! drives a provider through search, episode listing and stream resolution.

use eizo::config::{ResolverConfigBuilder, load_config_from_str};
use eizo::prelude::*;
use eizo::providers::{AllAnimeProvider, AnimeFireProvider};
use eizo::types::Priority;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

mod common;
use common::{TEST_QUERY, init_tracing};

/// Matches GraphQL GET requests whose `query` parameter contains a fragment.
struct GraphqlQuery(&'static str);

impl Match for GraphqlQuery {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(key, value)| key == "query" && value.contains(self.0))
    }
}

/// Inverse of the link decoder, for building source tokens.
fn encode_token(plain: &str) -> String {
    plain
        .bytes()
        .map(|b| format!("{:02x}", b ^ 0x38))
        .collect()
}

#[cfg(test)]
mod allanime_tests {
    use super::*;

    async fn mount_api(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(GraphqlQuery("shows("))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "shows": { "edges": [
                    { "_id": "ReooPAxPMsHM4KPMY", "name": "Sousou no Frieren", "thumbnail": "https://img.example/f.jpg" },
                    { "_id": "dandadan01", "name": "Dandadan" }
                ] } }
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(GraphqlQuery("availableEpisodesDetail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "show": { "_id": "ReooPAxPMsHM4KPMY", "availableEpisodesDetail": {
                    "sub": ["2", "1"], "dub": []
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(GraphqlQuery("sourceUrls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "episode": { "episodeString": "1", "sourceUrls": [
                    { "sourceUrl": format!("--{}", encode_token("/apivtwo/clock?id=slow")), "priority": 7.0 },
                    { "sourceUrl": format!("--{}", encode_token("/apivtwo/clock?id=fast")), "priority": 8.5 },
                    { "sourceUrl": "https://embed.example/e/1", "priority": 9.0 }
                ] } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_search_and_list_episodes() {
        init_tracing();
        let server = MockServer::start().await;
        mount_api(&server).await;

        let mut providers = Providers::new();
        providers.add(AllAnimeProvider::new().with_base_url(server.uri()));

        let results = providers.search(TEST_QUERY).flatten().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Sousou no Frieren");
        assert_eq!(results[0].source.as_deref(), Some("AllAnime"));
        assert_eq!(results[0].language.as_deref(), Some("en"));

        let provider = providers.get("allanime").unwrap();
        let episodes = provider.list_items(&results[0].id).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].number, 1.0);
        assert_eq!(episodes[0].anime_id, "ReooPAxPMsHM4KPMY");
    }

    #[tokio::test]
    async fn test_resolve_prefers_priority_domain() {
        init_tracing();
        let server = MockServer::start().await;
        mount_api(&server).await;

        Mock::given(method("GET"))
            .and(path("/apivtwo/clock.json"))
            .and(wiremock::matchers::query_param("id", "slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": [{ "link": "https://mirror.example/ep1.mp4", "resolutionStr": "1080p" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/apivtwo/clock.json"))
            .and(wiremock::matchers::query_param("id", "fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": [
                    { "link": "https://repackager.wixmp.com/ep1/720.mp4", "resolutionStr": "720p" },
                    { "link": "https://mirror.example/ep1/480.mp4", "resolutionStr": "480p" }
                ]
            })))
            .mount(&server)
            .await;

        let mut providers = Providers::new();
        providers.add(AllAnimeProvider::new().with_base_url(server.uri()));

        let stream = providers
            .resolve_stream("allanime", "ReooPAxPMsHM4KPMY", "1", &QualityRequest::Best)
            .await
            .unwrap();

        assert_eq!(stream.url, "https://repackager.wixmp.com/ep1/720.mp4");
        assert_eq!(stream.metadata.quality, "720p");
        assert_eq!(stream.metadata.priority, Some(Priority::High));
        assert_eq!(stream.metadata.provider.as_deref(), Some("AllAnime"));
    }

    #[tokio::test]
    async fn test_registry_from_config_reaches_the_resolver() {
        init_tracing();
        let server = MockServer::start().await;
        mount_api(&server).await;

        Mock::given(method("GET"))
            .and(path("/apivtwo/clock.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": [
                    { "link": "https://repackager.wixmp.com/ep1/720.mp4", "resolutionStr": "720p" },
                    { "link": "https://mirror.example/ep1/480.mp4", "resolutionStr": "480p" }
                ]
            })))
            .mount(&server)
            .await;

        // With the default domains the wixmp link would win
        let config = load_config_from_str(&format!(
            r#"
[resolver]
priority_domains = ["mirror.example"]

[providers]
allanime_url = "{}"
"#,
            server.uri()
        ))
        .unwrap();

        let providers = Providers::from_config(config);
        let stream = providers
            .resolve_stream("allanime", "ReooPAxPMsHM4KPMY", "1", &QualityRequest::Best)
            .await
            .unwrap();

        assert_eq!(stream.url, "https://mirror.example/ep1/480.mp4");
        assert_eq!(stream.metadata.priority, Some(Priority::High));
    }

    #[tokio::test]
    async fn test_resolve_without_usable_pages() {
        let server = MockServer::start().await;
        mount_api(&server).await;

        Mock::given(method("GET"))
            .and(path("/apivtwo/clock.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"links\":[]}"))
            .mount(&server)
            .await;

        let config = ResolverConfigBuilder::default()
            .grace_ms(100u64)
            .overall_timeout_ms(2_000u64)
            .build()
            .unwrap();
        let provider = AllAnimeProvider::new()
            .with_base_url(server.uri())
            .with_resolver_config(config);

        let err = provider
            .resolve_stream("ReooPAxPMsHM4KPMY", "1", &QualityRequest::Best)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoUsableLink), "got {err:?}");
    }

    #[tokio::test]
    async fn test_direct_media_tokens_are_not_fetched() {
        init_tracing();
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(GraphqlQuery("sourceUrls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "episode": { "episodeString": "1", "sourceUrls": [
                    { "sourceUrl": format!("--{}", encode_token("/media9/videos/ep1.mp4")), "priority": 9.0 },
                    { "sourceUrl": format!("--{}", encode_token("/apivtwo/clock?id=empty")), "priority": 5.0 }
                ] } }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/apivtwo/clock.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"links\":[]}"))
            .mount(&server)
            .await;

        let provider = AllAnimeProvider::new().with_base_url(server.uri());
        let stream = provider
            .resolve_stream("ReooPAxPMsHM4KPMY", "1", &QualityRequest::Best)
            .await
            .unwrap();

        assert_eq!(stream.url, format!("{}/media9/videos/ep1.mp4", server.uri()));
        assert_eq!(stream.metadata.quality, "mp4");

        let requests = server.received_requests().await.unwrap();
        assert!(
            requests.iter().all(|r| !r.url.path().starts_with("/media9")),
            "direct media link was fetched"
        );
    }

    #[tokio::test]
    async fn test_graphql_errors_name_the_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "PERSISTED_QUERY_NOT_FOUND" }]
            })))
            .mount(&server)
            .await;

        let provider = AllAnimeProvider::new().with_base_url(server.uri());
        let err = provider.search(TEST_QUERY.into()).await.unwrap_err();
        match err {
            Error::Source { src, message } => {
                assert_eq!(src, "AllAnime");
                assert_eq!(message, "PERSISTED_QUERY_NOT_FOUND");
            }
            other => panic!("expected source error, got {other:?}"),
        }
    }
}

#[cfg(test)]
mod animefire_tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <div class="divCardUltimosEps">
            <a href="https://animefire.plus/animes/sousou-no-frieren-todos-os-episodios">
              <img class="imgAnimes" data-src="https://animefire.plus/img/frieren.webp">
              <h3 class="animeTitle">Sousou no Frieren</h3>
            </a>
          </div>
        </body></html>
    "#;

    const EPISODE_PAGE: &str = r#"
        <html><body>
          <a class="lEp" href="https://animefire.plus/animes/sousou-no-frieren/1">Episódio 1</a>
          <a class="lEp" href="https://animefire.plus/animes/sousou-no-frieren/2">Episódio 2</a>
        </body></html>
    "#;

    async fn mount_site(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/pesquisar/frieren"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/animes/sousou-no-frieren-todos-os-episodios"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EPISODE_PAGE))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/video/sousou-no-frieren/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "src": "https://lightspeedst.example/360.mp4", "label": "360p" },
                    { "src": "https://lightspeedst.example/720.mp4", "label": "720p" }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_search_to_stream() {
        init_tracing();
        let server = MockServer::start().await;
        mount_site(&server).await;

        let mut providers = Providers::new();
        providers.add(AnimeFireProvider::new().with_base_url(server.uri()));

        let results = providers
            .search(TEST_QUERY)
            .from_provider("animefire")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].language.as_deref(), Some("pt-BR"));

        let provider = providers.get("animefire").unwrap();
        let episodes = provider.list_items(&results[0].id).await.unwrap();
        assert_eq!(episodes.len(), 2);

        let best = providers
            .resolve_stream("animefire", &results[0].id, &episodes[0].reference, &QualityRequest::Best)
            .await
            .unwrap();
        assert_eq!(best.url, "https://lightspeedst.example/720.mp4");
        assert!(!best.is_priority());

        let worst = providers
            .resolve_stream("animefire", &results[0].id, &episodes[0].reference, &QualityRequest::Worst)
            .await
            .unwrap();
        assert_eq!(worst.metadata.quality, "360p");
    }

    #[tokio::test]
    async fn test_http_failure_names_the_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut providers = Providers::new();
        providers.add(AnimeFireProvider::new().with_base_url(server.uri()));

        let err = providers
            .search(TEST_QUERY)
            .from_provider("animefire")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source { ref src, .. } if src == "AnimeFire"));
    }
}
