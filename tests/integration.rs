//! Integration tests for the search coordinator
//!
//! Runs fan-out searches over in-memory providers under paused time, so
//! deadlines and grace windows are observed exactly.

use eizo::error::Error;
use eizo::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

mod common;
use common::{MockProvider, TEST_QUERY, anime, init_tracing, registry};

#[cfg(test)]
mod coordinator_tests {
    use super::*;

    fn titles(results: &[Anime]) -> HashSet<String> {
        results.iter().map(|a| a.title.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_flatten_merges_every_answer() {
        init_tracing();
        let providers = registry(vec![
            MockProvider::answering("one", &["Frieren", "Dandadan"]).after(300),
            MockProvider::answering("two", &["Frieren"]).after(100).language("pt-BR"),
            MockProvider::answering("three", &[]).after(50),
            MockProvider::failing("four", "upstream 502").after(10),
        ]);

        let results = providers.search(TEST_QUERY).flatten().await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            titles(&results),
            HashSet::from(["Frieren".to_string(), "Dandadan".to_string()])
        );
        // Arrival order, not registration order
        assert_eq!(results[0].source.as_deref(), Some("two"));
        assert_eq!(results[0].language.as_deref(), Some("pt-BR"));
        assert_eq!(results[1].source.as_deref(), Some("one"));
        assert!(results.iter().all(Anime::is_tagged));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flatten_waits_for_slowest_before_deadline() {
        let providers = registry(vec![
            MockProvider::answering("fast", &["A"]).after(10),
            MockProvider::answering("slow", &["B"]).after(14_000),
        ]);

        let start = Instant::now();
        let results = providers.search(TEST_QUERY).flatten().await.unwrap();

        assert_eq!(titles(&results).len(), 2);
        assert!(start.elapsed() >= Duration::from_millis(14_000));
        assert!(start.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_pending_providers_into_failures() {
        init_tracing();
        let providers = registry(vec![
            MockProvider::failing("broken", "boom").after(5),
            MockProvider::answering("stuck", &["Never"]).after(60_000),
        ]);

        let start = Instant::now();
        let err = providers.search(TEST_QUERY).flatten().await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(15));
        assert!(elapsed < Duration::from_millis(15_100));

        match err {
            Error::AggregateSearchFailed(failures) => {
                assert_eq!(failures.len(), 2);
                let broken = failures.iter().find(|f| f.provider == "broken").unwrap();
                assert_eq!(broken.cause, "boom");
                let stuck = failures.iter().find(|f| f.provider == "stuck").unwrap();
                assert_eq!(stuck.cause, "search timed out after 15s");
            }
            other => panic!("expected aggregate failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_survive_a_timed_out_provider() {
        let providers = registry(vec![
            MockProvider::answering("quick", &["Frieren"]).after(20),
            MockProvider::answering("stuck", &["Late"]).after(30_000),
        ]);

        let results = providers
            .search(TEST_QUERY)
            .timeout(Duration::from_secs(2))
            .flatten()
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Frieren");
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_search_returns_after_grace_window() {
        let providers = registry(vec![
            MockProvider::answering("fast", &["Frieren"]).after(50),
            MockProvider::answering("medium", &["Frieren Recap"]).after(600),
            MockProvider::answering("slow", &["Too Late"]).after(10_000),
        ]);

        let start = Instant::now();
        let results = providers.search(TEST_QUERY).flatten_eager().await.unwrap();
        let elapsed = start.elapsed();

        // Grace window armed once by the first non-empty answer at 50ms
        assert!(elapsed >= Duration::from_millis(850), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(900), "elapsed {elapsed:?}");
        assert_eq!(
            titles(&results),
            HashSet::from(["Frieren".to_string(), "Frieren Recap".to_string()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_search_ignores_empty_answers_for_grace() {
        let providers = registry(vec![
            MockProvider::answering("empty", &[]).after(10),
            MockProvider::answering("late", &["Frieren"]).after(3_000),
        ]);

        let start = Instant::now();
        let results = providers.search(TEST_QUERY).flatten_eager().await.unwrap();

        assert_eq!(results.len(), 1);
        // Everyone answered, so no grace wait after the last result
        assert!(start.elapsed() < Duration::from_millis(3_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_search_gives_up_at_multi_class_deadline() {
        let providers = registry(vec![
            MockProvider::failing("down", "connection refused"),
            MockProvider::answering("stuck", &["Late"]).after(20_000),
        ]);

        let start = Instant::now();
        let err = providers.search(TEST_QUERY).flatten_eager().await.unwrap_err();

        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(start.elapsed() < Duration::from_secs(7));
        match err {
            Error::AggregateSearchFailed(failures) => {
                let stuck = failures.iter().find(|f| f.provider == "stuck").unwrap();
                assert_eq!(stuck.cause, "search timed out after 6s");
            }
            other => panic!("expected aggregate failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_provider_is_a_failure() {
        let providers = registry(vec![
            MockProvider::panicking("volatile"),
            MockProvider::answering("steady", &["Frieren"]),
        ]);

        let grouped = providers.search(TEST_QUERY).group().await;
        assert_eq!(grouped.len(), 2);

        let (_, volatile) = grouped.iter().find(|(name, _)| name == "volatile").unwrap();
        assert!(volatile.is_err());
        let (_, steady) = grouped.iter().find(|(name, _)| name == "steady").unwrap();
        assert_eq!(steady.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_empty_is_no_results() {
        let providers = registry(vec![
            MockProvider::answering("one", &[]),
            MockProvider::answering("two", &[]),
        ]);

        let err = providers.search(TEST_QUERY).flatten().await.unwrap_err();
        assert!(matches!(err, Error::NoResults));
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_results() {
        let providers = Providers::new();
        let err = providers.search(TEST_QUERY).flatten().await.unwrap_err();
        assert!(matches!(err, Error::NoResults));
    }

    #[tokio::test]
    async fn test_existing_tags_are_kept() {
        let mut upstream = anime("Frieren");
        upstream.tag("Mirror", "ja");
        let providers = registry(vec![MockProvider::with_results("relay", vec![upstream])]);

        let results = providers.search(TEST_QUERY).flatten().await.unwrap();
        assert_eq!(results[0].source.as_deref(), Some("Mirror"));
        assert_eq!(results[0].language.as_deref(), Some("ja"));
    }

    #[tokio::test]
    async fn test_class_filter_limits_broadcast() {
        let providers = registry(vec![
            MockProvider::answering("series", &["Frieren"]),
            MockProvider::answering("films", &["Frieren Movie"]).class(MediaClass::MovieTv),
        ]);

        let results = providers
            .search(TEST_QUERY)
            .class(MediaClass::MovieTv)
            .flatten()
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.as_deref(), Some("films"));
    }

    #[tokio::test]
    async fn test_limit_reaches_providers() {
        let providers = registry(vec![MockProvider::answering("one", &["A", "B", "C"])]);
        let results = providers.search(TEST_QUERY).limit(2).flatten().await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_provider() {
        let providers = registry(vec![
            MockProvider::answering("one", &["Frieren"]),
            MockProvider::answering("two", &["Dandadan"]),
        ]);

        let results = providers.search(TEST_QUERY).from_provider("two").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Dandadan");
        assert_eq!(results[0].source.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_explicit_provider_errors() {
        let providers = registry(vec![MockProvider::failing("flaky", "HTTP 503")]);

        let err = providers.search(TEST_QUERY).from_provider("nope").await.unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(ref tag) if tag == "nope"));

        let err = providers.search(TEST_QUERY).from_provider("flaky").await.unwrap_err();
        match err {
            Error::Source { src, message } => {
                assert_eq!(src, "flaky");
                assert!(message.contains("HTTP 503"));
            }
            other => panic!("expected source error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_result_processing_chain() {
        let providers = registry(vec![
            MockProvider::answering("one", &["Sousou no Frieren", "Frieren"]),
            MockProvider::answering("two", &["FRIEREN", "Dandadan"]).language("pt-BR").after(5),
        ]);

        let results = providers
            .search(TEST_QUERY)
            .flatten()
            .await
            .unwrap()
            .dedupe_by_title()
            .sort_by_query_relevance(TEST_QUERY);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Frieren");

        let portuguese = results.from_language("pt-BR");
        assert_eq!(portuguese.len(), 1);
        assert_eq!(portuguese[0].title, "Dandadan");
    }

    #[tokio::test]
    async fn test_resolve_stream_through_registry() {
        let providers = registry(vec![MockProvider::answering("one", &["Frieren"])]);

        let stream = providers
            .resolve_stream("one", "frieren", "3", &QualityRequest::Best)
            .await
            .unwrap();
        assert_eq!(stream.url, "https://cdn.mock.example/3.mp4");
        assert_eq!(stream.metadata.provider.as_deref(), Some("one"));
        assert!(!stream.is_priority());
    }
}
