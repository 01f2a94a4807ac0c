use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::err;
use crate::error::FetchError;
use crate::structs::{Page, Project};

const API_TOKEN_HEADER: &str = "api-token";
const PROJECTS_MEDIA_TYPE: &str = "application/vnd.polaris.portfolios.projects-1+json";
const BRANCHES_MEDIA_TYPE: &str = "application/vnd.synopsys.pm.branches-1+json";

pub struct PolarisApi {
    http: HttpClient,
    base_url: String,
    users_link: Regex,
    show_progress: bool,
}

impl PolarisApi {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| err!("Invalid Polaris URL '{base_url}': {e}"))?;

        let mut token = HeaderValue::from_str(api_token.trim())
            .map_err(|_| err!("The API token contains characters not allowed in a header"))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_TOKEN_HEADER), token);

        Ok(Self {
            http: HttpClient::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()
                .map_err(|e| err!("Failed to build HTTP client: {e}"))?,
            users_link: Regex::new(&format!("^{}/users(.*)$", regex::escape(&base_url)))?,
            base_url,
            show_progress: false,
        })
    }

    /// Shows a spinner on stderr while pages are being fetched.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<T, FetchError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .headers(headers.clone())
            .send()
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text)
            .map_err(|source| FetchError::Decode { url: url.to_string(), source })
    }

    /// Absolute URL of `endpoint` with `params` encoded the way the client sends them.
    fn request_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let url = format!("{}{}", self.base_url, endpoint);
        if params.is_empty() {
            return url;
        }
        match Url::parse_with_params(&url, params) {
            Ok(with_params) => with_params.to_string(),
            Err(_) => url,
        }
    }

    /// Single GET of `endpoint`, without following pagination links.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<T, FetchError> {
        self.get(&format!("{}{}", self.base_url, endpoint), params, headers)
    }

    /// GETs `endpoint` and every page after it, returning all `_items` in order.
    pub fn get_items<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Vec<T>, FetchError> {
        let progress = self.spinner();
        let items = self.walk_pages(endpoint, params, headers, &progress);
        progress.finish_and_clear();
        items
    }

    fn walk_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
        progress: &ProgressBar,
    ) -> Result<Vec<T>, FetchError> {
        progress.set_message(format!("Fetching {endpoint} ..."));
        let first: Page<T> = self.get_json(endpoint, params, headers)?;
        let mut fetched = first.items.len();
        progress.set_message(format!("Fetched {fetched} items from {endpoint}"));

        let start = self.request_url(endpoint, params);
        collect_pages(&start, first, |link| self.repair_link(link), |url| {
            let page: Page<T> = self.get(url, &[], headers)?;
            fetched += page.items.len();
            progress.set_message(format!("Fetched {fetched} items from {endpoint}"));
            Ok(page)
        })
    }

    /// Makes a pagination link fetchable: relative links are resolved against the
    /// base URL and `<base>/users..` links get the `/api/auth` prefix they lack.
    pub fn repair_link(&self, link: &str) -> String {
        let absolute = match Url::parse(link) {
            Ok(_) => link.to_string(),
            Err(_) => match Url::parse(&format!("{}/", self.base_url)).and_then(|b| b.join(link)) {
                Ok(joined) => joined.to_string(),
                Err(_) => link.to_string(),
            },
        };
        match self.users_link.captures(&absolute) {
            Some(caps) => format!("{}/api/auth/users{}", self.base_url, &caps[1]),
            None => absolute,
        }
    }

    pub fn get_portfolio_id(&self) -> Result<String> {
        let portfolios: Vec<Project> =
            self.get_items("/api/portfolio/portfolios", &[], &HeaderMap::new())?;
        portfolios
            .into_iter()
            .map(|p| p.id)
            .find(|id| !id.is_empty())
            .ok_or_else(|| err!("No portfolio found for this API token."))
    }

    pub fn get_projects(&self, portfolio_id: &str, limit: usize) -> Result<Vec<Project>> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(PROJECTS_MEDIA_TYPE));
        let limit = limit.to_string();
        let projects = self.get_items(
            &format!("/api/portfolios/{portfolio_id}/projects"),
            &[("_limit", limit.as_str())],
            &headers,
        )?;
        Ok(projects)
    }

    pub fn get_branch_id(&self, project_id: &str, name: &str) -> Result<Option<String>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(BRANCHES_MEDIA_TYPE));
        let filter = format!("name=={name}");
        let branches: Vec<Project> = self.get_items(
            &format!("/api/portfolio/portfolio-sub-items/{project_id}/branches"),
            &[("_filter", filter.as_str())],
            &headers,
        )?;
        Ok(branches.into_iter().map(|b| b.id).find(|id| !id.is_empty()))
    }

    pub fn get_issue_families(
        &self,
        project_id: &str,
        branch_id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut params = vec![("portfolioSubItemId", project_id)];
        if let Some(branch_id) = branch_id {
            params.push(("branchId", branch_id));
        }
        params.extend([
            ("_includeIssueProperties", "true"),
            ("_includeIssueType", "true"),
            ("_includeTriageProperties", "true"),
        ]);
        let issues = self.get_items(
            "/api/specialization-layer-service/issue-families/_actions/list",
            &params,
            &HeaderMap::new(),
        )?;
        Ok(issues)
    }

    pub fn get_findings_issues(&self, project_id: &str) -> Result<Vec<Value>> {
        let params = [
            ("projectId", project_id),
            ("_includeIssueProperties", "true"),
            ("_includeType", "true"),
            ("_includeTriageProperties", "true"),
            ("_includeContext", "true"),
        ];
        let issues = self.get_items("/api/findings/issues", &params, &HeaderMap::new())?;
        Ok(issues)
    }
}

/// Drains `first`, fetched from `start`, and the pages reachable from it through
/// `next` links. `resolve` turns a link into the URL handed to `fetch_next`.
///
/// Stops when there is no `next` link, when `next` equals `first` (the API's way
/// of marking a single page) or when a resolved URL was already fetched.
pub fn collect_pages<T, R, F>(
    start: &str,
    first: Page<T>,
    resolve: R,
    mut fetch_next: F,
) -> Result<Vec<T>, FetchError>
where
    R: Fn(&str) -> String,
    F: FnMut(&str) -> Result<Page<T>, FetchError>,
{
    let mut items = Vec::new();
    let mut fetched = HashSet::from([start.to_string()]);
    let mut page = first;
    loop {
        let (next, first) = page.next_and_first();
        let next = next.map(str::to_string);
        let reached_first = next.is_some() && next.as_deref() == first;
        items.append(&mut page.items);

        let Some(next) = next else { break };
        if reached_first {
            break;
        }
        let url = resolve(&next);
        if !fetched.insert(url.clone()) {
            break;
        }
        page = fetch_next(&url)?;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::structs::Link;

    fn page(items: Vec<i32>, links: &[(&str, &str)]) -> Page<i32> {
        Page {
            items,
            links: links
                .iter()
                .map(|(rel, href)| Link { rel: rel.to_string(), href: href.to_string() })
                .collect(),
        }
    }

    fn collect<F>(first: Page<i32>, fetch_next: F) -> Result<Vec<i32>, FetchError>
    where
        F: FnMut(&str) -> Result<Page<i32>, FetchError>,
    {
        collect_pages("p1", first, |link| link.to_string(), fetch_next)
    }

    fn api(url: &str) -> PolarisApi {
        PolarisApi::new(url, "secret-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn next_equal_to_first_returns_first_page_only() {
        let first = page(vec![1, 2, 3], &[("first", "p1"), ("next", "p1")]);
        let items = collect(first, |_| panic!("must not fetch")).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn follows_next_links_in_order() {
        let first = page(vec![1, 2], &[("first", "p1"), ("next", "p2")]);
        let mut requested = Vec::new();
        let items = collect(first, |link| {
            requested.push(link.to_string());
            Ok(match link {
                "p2" => page(vec![3, 4], &[("first", "p1"), ("next", "p3")]),
                _ => page(vec![5], &[("first", "p1")]),
            })
        })
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(requested, vec!["p2", "p3"]);
    }

    #[test]
    fn repeated_link_stops_pagination() {
        let first = page(vec![1], &[("next", "p2")]);
        let mut calls = 0;
        let items = collect(first, |_| {
            calls += 1;
            Ok(page(vec![2], &[("next", "p2")]))
        })
        .unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn link_back_to_start_stops_pagination() {
        let first = page(vec![1], &[("next", "p2")]);
        let mut requested = Vec::new();
        let items = collect(first, |link| {
            requested.push(link.to_string());
            Ok(page(vec![2], &[("next", "p1")]))
        })
        .unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(requested, vec!["p2"]);
    }

    #[test]
    fn fetch_error_aborts_without_partial_result() {
        let first = page(vec![1], &[("next", "p2")]);
        let result = collect(first, |link| {
            Err(FetchError::Status {
                url: link.to_string(),
                status: 500,
                body: "boom".to_string(),
            })
        });
        assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
    }

    #[test]
    fn repairs_users_links_and_relative_links() {
        let api = api("https://polaris.test/");
        assert_eq!(
            api.repair_link("https://polaris.test/users?_offset=25&_limit=25"),
            "https://polaris.test/api/auth/users?_offset=25&_limit=25"
        );
        assert_eq!(
            api.repair_link("https://polaris.test/api/ciam/users?_offset=25"),
            "https://polaris.test/api/ciam/users?_offset=25"
        );
        assert_eq!(
            api.repair_link("/api/findings/issues?_cursor=abc"),
            "https://polaris.test/api/findings/issues?_cursor=abc"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(PolarisApi::new("not a url", "t", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn get_items_walks_pages_over_http() {
        let mut server = Server::new();
        let url = server.url();
        let start = format!("{url}/api/portfolio/portfolios?_offset=0");
        let first = server
            .mock("GET", "/api/portfolio/portfolios")
            .match_query(Matcher::Any)
            .match_header("API-TOKEN", "secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "_items": [{"id": "a"}],
                    "_links": [
                        {"rel": "first", "href": start},
                        {"rel": "next", "href": format!("{url}/users?_offset=1")}
                    ]
                })
                .to_string(),
            )
            .create();
        let second = server
            .mock("GET", "/api/auth/users")
            .match_query(Matcher::UrlEncoded("_offset".into(), "1".into()))
            .match_header("API-TOKEN", "secret-token")
            .with_status(200)
            .with_body(
                json!({
                    "_items": [{"id": "b"}, {"id": "c"}],
                    "_links": [
                        {"rel": "first", "href": start},
                        {"rel": "next", "href": start}
                    ]
                })
                .to_string(),
            )
            .create();

        let items: Vec<Value> =
            api(&url).get_items("/api/portfolio/portfolios", &[], &HeaderMap::new()).unwrap();

        first.assert();
        second.assert();
        let ids: Vec<&str> = items.iter().filter_map(|i| i["id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn every_followed_users_link_is_repaired() {
        let mut server = Server::new();
        let url = server.url();
        server
            .mock("GET", "/api/portfolio/portfolios")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "_items": [1],
                    "_links": [{"rel": "next", "href": format!("{url}/users?_offset=1")}]
                })
                .to_string(),
            )
            .create();
        let second = server
            .mock("GET", "/api/auth/users")
            .match_query(Matcher::UrlEncoded("_offset".into(), "1".into()))
            .with_status(200)
            .with_body(
                json!({
                    "_items": [2],
                    "_links": [{"rel": "next", "href": format!("{url}/users?_offset=2")}]
                })
                .to_string(),
            )
            .create();
        let third = server
            .mock("GET", "/api/auth/users")
            .match_query(Matcher::UrlEncoded("_offset".into(), "2".into()))
            .with_status(200)
            .with_body(r#"{"_items": [3], "_links": []}"#)
            .create();

        let items: Vec<i32> =
            api(&url).get_items("/api/portfolio/portfolios", &[], &HeaderMap::new()).unwrap();

        second.assert();
        third.assert();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn next_link_back_to_the_first_request_is_not_refetched() {
        let mut server = Server::new();
        let url = server.url();
        let start = server
            .mock("GET", "/api/findings/issues")
            .match_query(Matcher::UrlEncoded("projectId".into(), "p-1".into()))
            .with_status(200)
            .with_body(
                json!({
                    "_items": [{"id": "a"}],
                    "_links": [{"rel": "next", "href": "/api/findings/issues/page-2"}]
                })
                .to_string(),
            )
            .expect(1)
            .create();
        server
            .mock("GET", "/api/findings/issues/page-2")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "_items": [{"id": "b"}],
                    "_links": [
                        {"rel": "next", "href": format!("{url}/api/findings/issues?projectId=p-1")}
                    ]
                })
                .to_string(),
            )
            .create();

        let items: Vec<Value> = api(&url)
            .get_items("/api/findings/issues", &[("projectId", "p-1")], &HeaderMap::new())
            .unwrap();

        start.assert();
        let ids: Vec<&str> = items.iter().filter_map(|i| i["id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn non_success_status_is_a_typed_error() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/findings/issues")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create();
        server
            .mock("GET", "/api/portfolio/portfolios")
            .match_query(Matcher::Any)
            .with_status(401)
            .create();

        let api = api(&server.url());
        let err = api
            .get_items::<Value>("/api/findings/issues", &[], &HeaderMap::new())
            .unwrap_err();
        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = api
            .get_json::<Value>("/api/portfolio/portfolios", &[], &HeaderMap::new())
            .unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized { .. }));
    }

    #[test]
    fn undecodable_body_is_a_decode_error() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/portfolio/portfolios")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create();

        let err = api(&server.url())
            .get_json::<Value>("/api/portfolio/portfolios", &[], &HeaderMap::new())
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[test]
    fn issue_family_request_carries_filters() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/specialization-layer-service/issue-families/_actions/list")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("portfolioSubItemId".into(), "proj-1".into()),
                Matcher::UrlEncoded("branchId".into(), "br-9".into()),
                Matcher::UrlEncoded("_includeTriageProperties".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"_items": [{"id": "i-1"}], "_links": []}"#)
            .create();

        let issues = api(&server.url()).get_issue_families("proj-1", Some("br-9")).unwrap();
        mock.assert();
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn projects_request_sends_accept_header_and_limit() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/portfolios/pf-1/projects")
            .match_query(Matcher::UrlEncoded("_limit".into(), "100".into()))
            .match_header("accept", PROJECTS_MEDIA_TYPE)
            .with_status(200)
            .with_body(r#"{"_items": [{"id": "p-1", "name": "juice-shop"}]}"#)
            .create();

        let projects = api(&server.url()).get_projects("pf-1", 100).unwrap();
        mock.assert();
        assert_eq!(projects[0].name, "juice-shop");
    }

    #[test]
    fn missing_branch_is_none() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/portfolio/portfolio-sub-items/p-1/branches")
            .match_query(Matcher::UrlEncoded("_filter".into(), "name==main".into()))
            .with_status(200)
            .with_body(r#"{"_items": []}"#)
            .create();

        assert_eq!(api(&server.url()).get_branch_id("p-1", "main").unwrap(), None);
    }
}
