use async_trait::async_trait;
use elms_config::ApiConfig;
use elms_core::{Authenticator, ElmsError, Result, GENERIC_LOGIN_FAILURE};
use elms_session::{Session, SessionStore};
use elms_types::{Credentials, LoginResponse, Role};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{decode_error, read_error_message, transport_error};

/// 登录接口路径
pub const LOGIN_PATH: &str = "/auth/login";

/// API 网关客户端
///
/// 所有对远程服务的调用都经由此客户端：附加 bearer token，
/// 遇到 401 时清除对应的会话，其他错误原样返回（结构化 message 优先）。
/// 不重试、不排队、不缓存。
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// 创建客户端
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        Self::with_client(Client::new(), base_url, session)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// 按配置创建客户端
    pub fn from_config(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ElmsError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config.base_url.clone(), session))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// 拼接完整 URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 创建请求；认证头在 `send` 时附加
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// 发送请求
    ///
    /// 成功时返回原始响应。401 会清除发出请求时的那一代会话（若仍有效），
    /// 并以 `ElmsError::Unauthorized` 返回给调用方。
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let active = self.session.active_token().await;
        let builder = match &active {
            Some(token) => builder.bearer_auth(&token.token),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response arrived");
            transport_error(e)
        })?;

        let status = response.status();
        debug!(
            url = %response.url(),
            status = status.as_u16(),
            authenticated = active.is_some(),
            "Response received"
        );

        if status.is_success() {
            return Ok(response);
        }

        let message = read_error_message(response).await;

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = active {
                if self.session.invalidate(token.generation).await {
                    warn!(generation = token.generation, "Authentication rejected, session cleared");
                }
            }
        }

        Err(ElmsError::from_status(status.as_u16(), message))
    }

    /// 发送请求并解析 JSON 响应
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(decode_error)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PUT, path).json(body)).await
    }

    /// DELETE；忽略响应体
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// 注册接口：`POST /auth/register/{role}`
    pub async fn register<B, T>(&self, role: Role, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let path = format!("/auth/register/{}", role.registration_slug());
        self.post(&path, body).await
    }

    /// 登录并建立会话
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.session.login(self, credentials).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }
}

/// 登录请求不附加 token，401 也不触发会话清除：失败的登录不影响已有会话
#[async_trait]
impl Authenticator for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let response = self
            .request(Method::POST, LOGIN_PATH)
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response.json::<LoginResponse>().await.map_err(decode_error);
        }

        let message = read_error_message(response)
            .await
            .unwrap_or_else(|| GENERIC_LOGIN_FAILURE.to_string());

        Err(ElmsError::from_status(status.as_u16(), Some(message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elms_core::{EventBus, SessionEvent};
    use elms_session::MemorySessionStorage;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let store = Arc::new(SessionStore::new(
            Arc::new(MemorySessionStorage::new()),
            EventBus::new(16),
        ));
        ApiClient::new(format!("{}/api/", server.uri()), store)
    }

    async fn mount_login(server: &MockServer, token: &str, role: &str) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": token,
                "userId": 4,
                "name": "Admin",
                "email": "admin@company.com",
                "role": role
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_url_joining() {
        let store = Arc::new(SessionStore::new(
            Arc::new(MemorySessionStorage::new()),
            EventBus::default(),
        ));
        let client = ApiClient::new("http://localhost:8080/api/", store);

        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.url("/loans"), "http://localhost:8080/api/loans");
        assert_eq!(client.url("loans/1"), "http://localhost:8080/api/loans/1");
    }

    #[tokio::test]
    async fn test_request_without_session_has_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/loan-types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let types: Vec<Value> = client.get("/loan-types").await.unwrap();
        assert!(types.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_bearer_token_attached_after_login() {
        let server = MockServer::start().await;
        mount_login(&server, "abc", "ADMIN").await;
        Mock::given(method("GET"))
            .and(path("/api/loans"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"loanId": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let session = client
            .login(&Credentials::new("admin@company.com", "pass123"))
            .await
            .unwrap();
        assert_eq!(session.role(), Role::Admin);

        let loans: Vec<Value> = client.get("/loans").await.unwrap();
        assert_eq!(loans[0]["loanId"], 1);
    }

    #[tokio::test]
    async fn test_login_sends_credentials_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": "a@company.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "t1",
                "userId": 9,
                "name": "A",
                "email": "a@company.com",
                "role": "EMPLOYEE"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.login(&Credentials::new("a@company.com", "pw")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_login_failure_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Account disabled"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let creds = Credentials::new("x@company.com", "bad");

        let err = client.login(&creds).await.unwrap_err();
        assert_eq!(err.message(), "Account disabled");

        let err = client.login(&creds).await.unwrap_err();
        assert_eq!(err.message(), GENERIC_LOGIN_FAILURE);
        assert!(client.session().current().await.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_surfaces_structured_message() {
        let server = MockServer::start().await;
        mount_login(&server, "abc", "EMPLOYEE").await;
        Mock::given(method("POST"))
            .and(path("/api/repayments"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "Amount exceeds outstanding balance"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .login(&Credentials::new("admin@company.com", "pass123"))
            .await
            .unwrap();

        let err = client
            .post::<_, Value>("/repayments", &json!({"loanId": 1, "amountPaid": 1e9}))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(err.message(), "Amount exceeds outstanding balance");
        // 非 401 错误不影响会话
        assert!(client.session().current().await.is_some());
    }

    #[tokio::test]
    async fn test_error_without_message_uses_generic_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reports"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Value>("/reports").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), "Request failed with status code 500");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_once() {
        let server = MockServer::start().await;
        mount_login(&server, "abc", "ADMIN").await;
        Mock::given(method("GET"))
            .and(path("/api/admin/users"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut events = client.session().subscribe();
        client
            .login(&Credentials::new("admin@company.com", "pass123"))
            .await
            .unwrap();

        let err = client.get::<Value>("/admin/users").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message(), "Token expired");
        assert!(client.session().current().await.is_none());

        // 会话已清除，后续 401 不再触发清除
        let err = client.get::<Value>("/admin/users").await.unwrap_err();
        assert!(err.is_unauthorized());

        assert!(matches!(events.recv().await.unwrap(), SessionEvent::LoggedIn { .. }));
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Invalidated { .. }));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let store = Arc::new(SessionStore::new(
            Arc::new(MemorySessionStorage::new()),
            EventBus::default(),
        ));
        // 无人监听的端口
        let client = ApiClient::new("http://127.0.0.1:9/api", store);

        let err = client.get::<Value>("/loans").await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.message().starts_with("Network error"));
    }

    #[tokio::test]
    async fn test_register_posts_to_role_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register/loan-officer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let created: Value = client
            .register(Role::LoanOfficer, &json!({"name": "Lee", "email": "lee@company.com"}))
            .await
            .unwrap();
        assert_eq!(created["id"], 12);
    }
}
