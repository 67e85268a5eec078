use anyhow::{anyhow, Context};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, info};

use super::auth::{self, Authority};
use super::digest::{DigestCache, FormDigest};
use super::errors::normalize_response;
use super::request::{Lookup, ResolvedRequest, Resource, Target};
use super::urls;
use crate::config::Config;
use crate::error::{CommandError, CommandResult};
use crate::session::{epoch_s, Session};
use crate::types::{AccessToken, Collection, ContextInfo};

/// Microsoft 365 request dispatcher
pub struct M365Client {
    http: Client,
    session: Session,
    graph_url: String,
    authority: Authority,
    digests: DigestCache,
}

impl M365Client {
    pub fn new(config: &Config, session: Session) -> CommandResult<Self> {
        let http = Client::builder()
            .timeout(config.api.request_timeout())
            .user_agent(concat!("m365-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            session,
            graph_url: config.api.graph_url.trim_end_matches('/').to_string(),
            authority: Authority::from_config(config),
            digests: DigestCache::default(),
        })
    }

    /// Absolute Graph URL for `path`
    pub fn graph_url(&self, path: &str) -> String {
        urls::join(&self.graph_url, path)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Bearer token for `resource`: the static token, a cached token, or a
    /// fresh one obtained with the session's refresh token
    pub async fn access_token(&self, resource: &Resource) -> CommandResult<String> {
        if let Some(token) = self.session.static_token() {
            return Ok(token.to_string());
        }

        let key = resource.key();
        if let Some(token) = self.session.cached_token(&key) {
            return Ok(token.value);
        }

        let refresh = self.session.refresh_token().ok_or_else(|| {
            CommandError::Auth("Log in to Microsoft 365 first. Run 'm365 auth login'".to_string())
        })?;

        debug!(resource = %key, "Requesting access token");
        let response = auth::gen_token(&self.http, &self.authority, &refresh.value, &resource.scope())
            .await
            .map_err(|e| CommandError::Auth(e.to_string()))?;

        // Azure AD rotates refresh tokens on every exchange
        if let Some(rotated) = response.refresh_token {
            self.session.store_token(
                "refresh_token",
                AccessToken {
                    value: rotated,
                    expires: refresh.expires,
                },
            )?;
        }

        let token = AccessToken {
            value: response.access_token,
            expires: epoch_s() + response.expires_in,
        };
        self.session.store_token(&key, token.clone())?;
        Ok(token.value)
    }

    /// Form digest for `web_url`, requested from `_api/contextinfo` when
    /// none is cached
    pub async fn form_digest(&self, web_url: &str) -> CommandResult<String> {
        if let Some(digest) = self.digests.get(web_url) {
            return Ok(digest);
        }

        let request = ResolvedRequest::sharepoint(
            Method::POST,
            urls::join(web_url, "_api/contextinfo"),
            Resource::sharepoint(web_url)?,
        );
        let response = self.send(&request, None).await?;
        let info: ContextInfo = serde_json::from_value(response)
            .context("Failed to parse context info")
            .map_err(CommandError::Other)?;

        debug!(web = %web_url, timeout = info.form_digest_timeout_seconds, "Retrieved form digest");
        self.digests.insert(
            web_url,
            FormDigest::new(info.form_digest_value.clone(), info.form_digest_timeout_seconds),
        );
        Ok(info.form_digest_value)
    }

    /// Execute a request and return its parsed body (`Null` when empty)
    pub async fn execute(&self, request: ResolvedRequest) -> CommandResult<Value> {
        let digest = match &request.digest_for {
            Some(web_url) => Some(self.form_digest(web_url).await?),
            None => None,
        };
        self.send(&request, digest).await
    }

    async fn send(&self, request: &ResolvedRequest, digest: Option<String>) -> CommandResult<Value> {
        let token = self.access_token(&request.resource).await?;

        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .bearer_auth(token);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(digest) = digest {
            builder = builder.header("X-RequestDigest", digest);
        }
        if let Some(body) = &request.body {
            let body = serde_json::to_string(body)
                .map_err(|e| CommandError::Other(anyhow!("Failed to serialize body: {}", e)))?;
            builder = builder.body(body);
        }

        let res = builder.send().await?;
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            let envelope = normalize_response(status.as_u16(), status.canonical_reason(), &text);
            debug!(status = status.as_u16(), code = ?envelope.code, "Request failed");
            return Err(CommandError::Request(envelope));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Run a resolution call and extract the identifier.
    ///
    /// When several entities match, the first one is used.
    pub async fn resolve(&self, lookup: Lookup) -> CommandResult<String> {
        let Lookup {
            request,
            extract,
            not_found,
        } = lookup;
        let response = self.execute(request).await?;
        match extract.extract(&response) {
            Some(id) => {
                info!(id = %id, "Resolved identifier");
                Ok(id)
            }
            None => Err(CommandError::NotFound(not_found)),
        }
    }

    pub async fn resolve_target(&self, target: Target) -> CommandResult<String> {
        match target {
            Target::Id(id) => Ok(id),
            Target::Lookup(lookup) => self.resolve(lookup).await,
        }
    }

    /// Resolve `target`, then execute the primary request built for its id
    pub async fn dispatch<F>(&self, target: Target, primary: F) -> CommandResult<Value>
    where
        F: FnOnce(&str) -> CommandResult<ResolvedRequest>,
    {
        let id = self.resolve_target(target).await?;
        self.execute(primary(&id)?).await
    }

    /// Execute a collection request, following `@odata.nextLink`
    pub async fn get_all(&self, request: ResolvedRequest) -> CommandResult<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = Some(request.clone());

        while let Some(page_request) = next.take() {
            let page: Collection<Value> = serde_json::from_value(self.execute(page_request).await?)
                .context("Failed to parse collection page")
                .map_err(CommandError::Other)?;
            items.extend(page.value);
            next = page.next_link.map(|link| request.with_url(link));
        }

        debug!(count = items.len(), "Retrieved collection");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::IdExtractor;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> M365Client {
        let mut config = Config::default();
        config.api.graph_url = server.uri();
        config.api.login_url = server.uri();
        M365Client::new(&config, Session::with_static_token("test-token")).unwrap()
    }

    fn lookup(client: &M365Client, name: &str) -> Lookup {
        Lookup {
            request: ResolvedRequest::graph(
                Method::GET,
                client.graph_url(&format!("me/todo/lists?$filter=displayName eq '{}'", name)),
            ),
            extract: IdExtractor::FirstInCollection { field: "id" },
            not_found: "The specified task list does not exist".to_string(),
        }
    }

    #[tokio::test]
    async fn execute_sends_bearer_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let value = client
            .execute(ResolvedRequest::graph(Method::GET, client.graph_url("me")))
            .await
            .unwrap();
        assert_eq!(value, json!({"id": "1"}));
    }

    #[tokio::test]
    async fn non_success_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": "Authorization_RequestDenied", "message": "Insufficient privileges"}
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client
            .execute(ResolvedRequest::graph(Method::GET, client.graph_url("me")))
            .await
            .unwrap_err();
        match err {
            CommandError::Request(envelope) => {
                assert_eq!(envelope.message, "Insufficient privileges");
                assert_eq!(envelope.code.as_deref(), Some("Authorization_RequestDenied"));
                assert_eq!(envelope.status, Some(403));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_lookup_skips_primary_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/todo/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let target = Target::Lookup(lookup(&client, "Missing"));
        let err = client
            .dispatch(target, |id| {
                Ok(ResolvedRequest::graph(
                    Method::POST,
                    client.graph_url(&format!("me/todo/lists/{}/tasks", id)),
                ))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));
        assert_eq!(err.to_string(), "The specified task list does not exist");
    }

    #[tokio::test]
    async fn lookup_then_primary_uses_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/todo/lists"))
            .and(query_param("$filter", "displayName eq 'Tasks'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "first"}, {"id": "second"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/me/todo/lists/first/tasks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "task"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let value = client
            .dispatch(Target::Lookup(lookup(&client, "Tasks")), |id| {
                Ok(ResolvedRequest::graph(
                    Method::POST,
                    client.graph_url(&format!("me/todo/lists/{}/tasks", id)),
                ))
            })
            .await
            .unwrap();
        assert_eq!(value, json!({"id": "task"}));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method.as_str(), "GET");
        assert_eq!(requests[1].method.as_str(), "POST");
    }

    #[tokio::test]
    async fn known_id_sends_single_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/todo/lists/abc/tasks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "task"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .dispatch(Target::Id("abc".to_string()), |id| {
                Ok(ResolvedRequest::graph(
                    Method::POST,
                    client.graph_url(&format!("me/todo/lists/{}/tasks", id)),
                ))
            })
            .await
            .unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn form_digest_is_requested_once_per_web() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sites/a/_api/contextinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "FormDigestValue": "0x0123",
                "FormDigestTimeoutSeconds": 1800,
                "WebFullUrl": "https://contoso.sharepoint.com/sites/a"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/sites/a/_api/web"))
            .and(header("X-RequestDigest", "0x0123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        let web_url = format!("{}/sites/a", server.uri());
        for _ in 0..2 {
            let request = ResolvedRequest::sharepoint(
                Method::PATCH,
                urls::join(&web_url, "_api/web"),
                Resource::sharepoint(&web_url).unwrap(),
            )
            .with_digest(&web_url);
            assert_eq!(client.execute(request).await.unwrap(), Value::Null);
        }
    }

    #[tokio::test]
    async fn get_all_follows_next_link() {
        let server = MockServer::start().await;
        let next = format!("{}/users/1/teamwork/installedApps?$skiptoken=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/users/1/teamwork/installedApps"))
            .and(query_param("$skiptoken", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"id": "b"}]})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/1/teamwork/installedApps"))
            .and(query_param("$expand", "teamsAppDefinition"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "@odata.nextLink": next,
                "value": [{"id": "a"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let items = client
            .get_all(ResolvedRequest::graph(
                Method::GET,
                client.graph_url("users/1/teamwork/installedApps?$expand=teamsAppDefinition"),
            ))
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn missing_session_is_an_auth_error() {
        let server = MockServer::start().await;
        let mut config = Config::default();
        config.api.graph_url = server.uri();
        let client = M365Client::new(&config, Session::in_memory()).unwrap();

        let err = client
            .execute(ResolvedRequest::graph(Method::GET, client.graph_url("me")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Auth(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error_with_cause() {
        // Nothing listens on a port released right after binding
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut config = Config::default();
        config.api.graph_url = format!("http://127.0.0.1:{}", port);
        let client = M365Client::new(&config, Session::with_static_token("test-token")).unwrap();

        let err = client
            .execute(ResolvedRequest::graph(Method::GET, client.graph_url("me")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.exit_code(), 1);
        let CommandError::Transport(message) = err else {
            panic!("expected a transport error");
        };
        assert!(message.starts_with("error sending request"), "{}", message);
        assert!(message.to_lowercase().contains("connect"), "{}", message);
    }

    #[tokio::test]
    async fn zero_timeout_in_file_does_not_break_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.api.graph_url = server.uri();
        config.api.timeout = 0;
        let client = M365Client::new(&config, Session::with_static_token("test-token")).unwrap();

        let value = client
            .execute(ResolvedRequest::graph(Method::GET, client.graph_url("me")))
            .await
            .unwrap();
        assert_eq!(value, json!({"id": "1"}));
    }
}
