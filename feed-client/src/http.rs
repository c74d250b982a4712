use std::time::Duration;

use reqwest::{Client, Method};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{Post, PostFilter, PostPatch, Tag, TokenPair, User};

#[derive(Debug, Serialize)]
struct RegisterRequestDto<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginFormDto<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequestDto<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePostRequestDto<'a> {
    title: &'a str,
    content: &'a str,
    tag_ids: &'a [Uuid],
}

#[derive(Debug, Serialize)]
struct CreateTagRequestDto<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ResolveTagsRequestDto<'a> {
    names: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ResolveTagsResponseDto {
    ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeedQueryDto {
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct PageQueryDto {
    limit: u32,
    offset: u32,
}

#[derive(Debug, Clone)]
/// HTTP-клиент для REST API блога (`/api/v1`).
///
/// Токен передаётся в каждый метод явно: если он есть, добавляется заголовок
/// `Authorization: Bearer <token>`, если нет — запрос уходит без заголовка
/// и защищённый эндпоинт ответит 401.
pub(crate) struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.client.request(method, self.endpoint(path));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode_error(response: reqwest::Response) -> FeedClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body
                .detail
                .unwrap_or_else(|| format!("http status {status}")),
            Err(_) => format!("http status {status}"),
        };
        FeedClientError::from_http_status(status, Some(message))
    }

    /// универсальный helper: отправляет запрос и декодирует json-ответ
    async fn execute_json<TRes>(request: reqwest::RequestBuilder) -> FeedClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json::<TRes>()
            .await
            .map_err(FeedClientError::from_reqwest)
    }

    /// то же, но для ответов без тела (204)
    async fn execute_empty(request: reqwest::RequestBuilder) -> FeedClientResult<()> {
        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }

    pub(crate) async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> FeedClientResult<User> {
        let payload = RegisterRequestDto {
            username,
            email,
            password,
        };
        let request = self
            .request(Method::POST, "/api/v1/auth/register", None)
            .json(&payload);
        Self::execute_json(request).await
    }

    pub(crate) async fn login(&self, username: &str, password: &str) -> FeedClientResult<TokenPair> {
        let payload = LoginFormDto { username, password };
        // Бэкенд принимает логин как form-urlencoded (OAuth2 password flow), не JSON.
        let request = self
            .request(Method::POST, "/api/v1/auth/login", None)
            .form(&payload);
        Self::execute_json(request).await
    }

    pub(crate) async fn refresh(&self, refresh_token: &str) -> FeedClientResult<TokenPair> {
        let payload = RefreshRequestDto { refresh_token };
        let request = self
            .request(Method::POST, "/api/v1/auth/refresh", None)
            .json(&payload);
        Self::execute_json(request).await
    }

    pub(crate) async fn me(&self, token: Option<&str>) -> FeedClientResult<User> {
        let request = self.request(Method::GET, "/api/v1/auth/me", token);
        Self::execute_json(request).await
    }

    /// Курсорная страница ленты: до `limit` постов после `cursor`.
    ///
    /// При `cursor == None` параметр не передаётся и выборка идёт с начала.
    pub(crate) async fn feed_page(
        &self,
        token: Option<&str>,
        limit: u32,
        cursor: Option<Uuid>,
    ) -> FeedClientResult<Vec<Post>> {
        let query = FeedQueryDto { limit, cursor };
        let request = self
            .request(Method::GET, "/api/v1/posts/cursor", token)
            .query(&query);
        Self::execute_json(request).await
    }

    pub(crate) async fn list_posts(
        &self,
        token: Option<&str>,
        filter: &PostFilter,
    ) -> FeedClientResult<Vec<Post>> {
        let request = self
            .request(Method::GET, "/api/v1/posts", token)
            .query(filter);
        Self::execute_json(request).await
    }

    pub(crate) async fn get_post(&self, token: Option<&str>, id: Uuid) -> FeedClientResult<Post> {
        let request = self.request(Method::GET, &format!("/api/v1/posts/{id}"), token);
        Self::execute_json(request).await
    }

    pub(crate) async fn create_post(
        &self,
        token: &str,
        title: &str,
        content: &str,
        tag_ids: &[Uuid],
    ) -> FeedClientResult<Post> {
        let payload = CreatePostRequestDto {
            title,
            content,
            tag_ids,
        };
        let request = self
            .request(Method::POST, "/api/v1/posts", Some(token))
            .json(&payload);
        Self::execute_json(request).await
    }

    pub(crate) async fn update_post(
        &self,
        token: &str,
        id: Uuid,
        patch: &PostPatch,
    ) -> FeedClientResult<Post> {
        let request = self
            .request(Method::PATCH, &format!("/api/v1/posts/{id}"), Some(token))
            .json(patch);
        Self::execute_json(request).await
    }

    pub(crate) async fn delete_post(&self, token: &str, id: Uuid) -> FeedClientResult<()> {
        let request = self.request(Method::DELETE, &format!("/api/v1/posts/{id}"), Some(token));
        Self::execute_empty(request).await
    }

    pub(crate) async fn list_tags(
        &self,
        token: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> FeedClientResult<Vec<Tag>> {
        let query = PageQueryDto { limit, offset };
        let request = self
            .request(Method::GET, "/api/v1/tags", token)
            .query(&query);
        Self::execute_json(request).await
    }

    pub(crate) async fn create_tag(&self, token: &str, name: &str) -> FeedClientResult<Tag> {
        let payload = CreateTagRequestDto { name };
        let request = self
            .request(Method::POST, "/api/v1/tags", Some(token))
            .json(&payload);
        Self::execute_json(request).await
    }

    pub(crate) async fn delete_tag(&self, token: &str, id: Uuid) -> FeedClientResult<()> {
        let request = self.request(Method::DELETE, &format!("/api/v1/tags/{id}"), Some(token));
        Self::execute_empty(request).await
    }

    /// Обменивает имена тегов на их id; отсутствующие теги создаются на сервере.
    pub(crate) async fn resolve_tags(
        &self,
        token: &str,
        names: &[String],
    ) -> FeedClientResult<Vec<Uuid>> {
        let payload = ResolveTagsRequestDto { names };
        let request = self
            .request(Method::POST, "/api/v1/tags/resolve", Some(token))
            .json(&payload);
        let dto: ResolveTagsResponseDto = Self::execute_json(request).await?;
        Ok(dto.ids)
    }

    pub(crate) async fn list_users(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> FeedClientResult<Vec<User>> {
        let query = PageQueryDto { limit, offset };
        let request = self
            .request(Method::GET, "/api/v1/users", Some(token))
            .query(&query);
        Self::execute_json(request).await
    }

    pub(crate) async fn get_user(&self, token: &str, id: Uuid) -> FeedClientResult<User> {
        let request = self.request(Method::GET, &format!("/api/v1/users/{id}"), Some(token));
        Self::execute_json(request).await
    }

    pub(crate) async fn delete_user(&self, token: &str, id: Uuid) -> FeedClientResult<()> {
        let request = self.request(Method::DELETE, &format!("/api/v1/users/{id}"), Some(token));
        Self::execute_empty(request).await
    }
}
