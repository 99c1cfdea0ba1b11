use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Serialize;

use crate::config::{Config, ProjectRef};
use crate::pipelines::Pipeline;
use crate::providers::GitLabProvider;

/// A project that could not be fetched this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFailure {
    pub instance: String,
    pub project: String,
    pub reason: String,
}

/// Everything gathered in one refresh.
///
/// Pipelines keep configuration order: instance, then project, then the
/// order the backend listed them in.
#[derive(Debug, Default, Serialize)]
pub struct Collection {
    pub pipelines: Vec<Pipeline>,
    pub failures: Vec<ProjectFailure>,
}

/// First day of the trailing window. Some pipelines stay "running" forever on
/// the backend; anything not updated since then is ignored.
///
/// # Errors
///
/// Returns an error when the window reaches outside the representable dates.
pub fn window_start(today: NaiveDate, window_days: i64) -> Result<NaiveDate> {
    Duration::try_days(window_days)
        .and_then(|window| today.checked_sub_signed(window))
        .with_context(|| format!("Trailing window of {window_days} days is out of range"))
}

/// Polls every configured project for running pipelines.
///
/// Projects are fetched concurrently, at most `fetch.concurrency` at a time.
/// A project that fails is reported in `failures` and does not affect the
/// others.
///
/// # Errors
///
/// Only configuration problems (an instance URL that cannot be used) abort
/// the whole collection.
pub async fn collect(config: &Config, today: NaiveDate) -> Result<Collection> {
    let updated_after = window_start(today, config.fetch.window_days)?;

    let providers = config
        .instances
        .iter()
        .map(|instance| {
            GitLabProvider::new(instance, &config.fetch)
                .with_context(|| format!("Failed to set up instance {}", instance.url))
        })
        .collect::<Result<Vec<_>>>()?;

    let tasks: Vec<(&GitLabProvider, &String, &ProjectRef)> = providers
        .iter()
        .zip(&config.instances)
        .flat_map(|(provider, instance)| {
            instance
                .projects
                .iter()
                .map(move |(name, id)| (provider, name, id))
        })
        .collect();

    info!(
        "Polling {} projects across {} instances (updated after {updated_after})",
        tasks.len(),
        providers.len()
    );

    // buffered keeps results in task order
    let results: Vec<_> = stream::iter(tasks)
        .map(|(provider, name, id)| async move {
            let result = provider.fetch_project(name, id, updated_after).await;
            (provider, name, result)
        })
        .buffered(config.fetch.concurrency)
        .collect()
        .await;

    let mut collection = Collection::default();

    for (provider, name, result) in results {
        match result {
            Ok(pipelines) => collection.pipelines.extend(pipelines),
            Err(e) => {
                warn!("{}: failed to fetch {name}: {e}", provider.instance);
                collection.failures.push(ProjectFailure {
                    instance: provider.instance.clone(),
                    project: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Collected {} pipelines, {} projects failed",
        collection.pipelines.len(),
        collection.failures.len()
    );

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use crate::config::{FetchConfig, InstanceConfig};
    use indexmap::IndexMap;
    use mockito::Matcher;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    fn config(url: &str, projects: &[(&str, u64)]) -> Config {
        Config {
            self_identity: Some("dev@example.com".to_string()),
            instances: vec![InstanceConfig {
                url: url.to_string(),
                private_token: Token::from("token"),
                projects: projects
                    .iter()
                    .map(|(name, id)| ((*name).to_string(), ProjectRef::Id(*id)))
                    .collect::<IndexMap<_, _>>(),
            }],
            fetch: FetchConfig {
                max_retries: 0,
                concurrency: 2,
                ..FetchConfig::default()
            },
            ..Config::default()
        }
    }

    fn job_body(stage: &str, status: &str, author: &str) -> String {
        format!(
            r#"[{{"stage": "{stage}", "name": "{stage}", "status": "{status}", "duration": null,
                 "commit": {{"title": "change", "author_email": "{author}"}},
                 "web_url": "https://gitlab.example.com/-/jobs/1"}}]"#
        )
    }

    #[test]
    fn test_window_start_is_seven_days_back() {
        let start = window_start(today(), 7).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let across_month = window_start(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), 7).unwrap();
        assert_eq!(across_month, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
    }

    #[test]
    fn test_window_start_out_of_range_is_error() {
        let err = window_start(today(), i64::MAX / 1000).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(window_start(today(), i64::MAX).is_err());
    }

    #[tokio::test]
    async fn test_huge_window_fails_without_panicking() {
        let mut config = Config::default();
        config.fetch.window_days = i64::MAX / 1000;
        assert!(collect(&config, today()).await.is_err());
    }

    #[tokio::test]
    async fn test_no_instances_yields_empty_collection() {
        let collection = collect(&Config::default(), today()).await.unwrap();
        assert!(collection.pipelines.is_empty());
        assert!(collection.failures.is_empty());
    }

    #[tokio::test]
    async fn test_collect_uses_trailing_window() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/3/pipelines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("scope".into(), "running".into()),
                Matcher::UrlEncoded("updated_after".into(), "2024-03-01".into()),
            ]))
            .with_body("[]")
            .create_async()
            .await;

        let collection = collect(&config(&server.url(), &[("React", 3)]), today())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(collection.pipelines.is_empty());
        assert!(collection.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failing_project_is_isolated_and_order_is_kept() {
        let mut server = mockito::Server::new_async().await;

        let _a = server
            .mock("GET", "/api/v4/projects/1/pipelines")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 10, "sha": "a", "ref": "main"}]"#)
            .create_async()
            .await;
        let _a_jobs = server
            .mock("GET", "/api/v4/projects/1/pipelines/10/jobs")
            .match_query(Matcher::Any)
            .with_body(job_body("build", "running", "dev@example.com"))
            .create_async()
            .await;

        let _b = server
            .mock("GET", "/api/v4/projects/2/pipelines")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Project Not Found"}"#)
            .create_async()
            .await;

        let _c = server
            .mock("GET", "/api/v4/projects/3/pipelines")
            .match_query(Matcher::Any)
            .with_body(r#"[{"id": 30, "sha": "c", "ref": "feature"}]"#)
            .create_async()
            .await;
        let _c_jobs = server
            .mock("GET", "/api/v4/projects/3/pipelines/30/jobs")
            .match_query(Matcher::Any)
            .with_body(job_body("test", "pending", "other@example.com"))
            .create_async()
            .await;

        let config = config(&server.url(), &[("Alpha", 1), ("Beta", 2), ("Gamma", 3)]);
        let collection = collect(&config, today()).await.unwrap();

        let names: Vec<_> = collection
            .pipelines
            .iter()
            .map(|p| p.project.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);

        assert_eq!(collection.failures.len(), 1);
        let failure = &collection.failures[0];
        assert_eq!(failure.project, "Beta");
        assert_eq!(failure.instance, server.url());
        assert!(failure.reason.contains("404"));
        assert!(!failure.reason.contains("token"));
    }
}
