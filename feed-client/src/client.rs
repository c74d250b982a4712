use std::sync::Arc;

use uuid::Uuid;

use crate::error::{FeedClientError, FeedClientResult};
use crate::http::HttpClient;
use crate::models::{Post, PostFilter, PostPatch, Tag, TokenPair, User};
use crate::store::{MemoryTokenStore, TokenStore};

#[derive(Debug, Clone)]
/// Унифицированный клиент REST API блога.
///
/// Держит access-токен в подключённом [`TokenStore`] и автоматически
/// подставляет его в запросы. После `login`/`refresh` полученный access-токен
/// сохраняется в хранилище.
pub struct FeedClient {
    http: HttpClient,
    store: Arc<dyn TokenStore>,
}

impl FeedClient {
    /// Создаёт клиент с хранилищем токена в памяти процесса.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_store(base_url, Arc::new(MemoryTokenStore::new()))
    }

    /// Создаёт клиент с внешним хранилищем токена.
    pub fn with_store(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http: HttpClient::new(base_url),
            store,
        }
    }

    /// Возвращает текущий access-токен, если он сохранён.
    pub fn access_token(&self) -> Option<String> {
        self.store.get()
    }

    /// Сохраняет access-токен вручную.
    pub fn set_token(&self, token: &str) -> FeedClientResult<()> {
        Ok(self.store.set(token)?)
    }

    /// Есть ли сохранённый access-токен.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Забывает сохранённый access-токен.
    ///
    /// Серверного logout у API нет: выход из аккаунта — это удаление токена
    /// на клиенте.
    pub fn logout(&self) -> FeedClientResult<()> {
        Ok(self.store.remove()?)
    }

    fn require_token(&self) -> FeedClientResult<String> {
        self.store.get().ok_or(FeedClientError::Unauthorized)
    }

    /// Регистрирует пользователя.
    ///
    /// Токен при этом не выдаётся: после регистрации нужно выполнить `login`.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> FeedClientResult<User> {
        self.http.register(username, email, password).await
    }

    /// Выполняет вход и сохраняет полученный access-токен в хранилище.
    pub async fn login(&self, username: &str, password: &str) -> FeedClientResult<TokenPair> {
        let pair = self.http.login(username, password).await?;
        self.store.set(&pair.access_token)?;
        Ok(pair)
    }

    /// Обменивает refresh-токен на новую пару токенов и сохраняет access-токен.
    pub async fn refresh(&self, refresh_token: &str) -> FeedClientResult<TokenPair> {
        let pair = self.http.refresh(refresh_token).await?;
        self.store.set(&pair.access_token)?;
        Ok(pair)
    }

    /// Возвращает текущего пользователя.
    pub async fn me(&self) -> FeedClientResult<User> {
        let token = self.store.get();
        self.http.me(token.as_deref()).await
    }

    /// Возвращает страницу ленты: до `limit` постов после `cursor`.
    ///
    /// `cursor` — id последнего уже полученного поста; `None` означает
    /// начало ленты.
    pub async fn feed_page(&self, limit: u32, cursor: Option<Uuid>) -> FeedClientResult<Vec<Post>> {
        let token = self.store.get();
        self.http.feed_page(token.as_deref(), limit, cursor).await
    }

    /// Возвращает список постов с фильтрами `limit/offset/tag_id/owner_id/q`.
    pub async fn list_posts(&self, filter: &PostFilter) -> FeedClientResult<Vec<Post>> {
        let token = self.store.get();
        self.http.list_posts(token.as_deref(), filter).await
    }

    /// Возвращает пост по идентификатору.
    pub async fn get_post(&self, id: Uuid) -> FeedClientResult<Post> {
        let token = self.store.get();
        self.http.get_post(token.as_deref(), id).await
    }

    /// Создаёт новый пост с указанными тегами.
    ///
    /// Требует сохранённый access-токен.
    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        tag_ids: &[Uuid],
    ) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http.create_post(&token, title, content, tag_ids).await
    }

    /// Частично обновляет пост.
    ///
    /// Требует сохранённый access-токен.
    pub async fn update_post(&self, id: Uuid, patch: &PostPatch) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http.update_post(&token, id, patch).await
    }

    /// Удаляет пост по идентификатору.
    ///
    /// Требует сохранённый access-токен.
    pub async fn delete_post(&self, id: Uuid) -> FeedClientResult<()> {
        let token = self.require_token()?;
        self.http.delete_post(&token, id).await
    }

    /// Возвращает список тегов.
    pub async fn list_tags(&self, limit: u32, offset: u32) -> FeedClientResult<Vec<Tag>> {
        let token = self.store.get();
        self.http.list_tags(token.as_deref(), limit, offset).await
    }

    /// Создаёт тег.
    ///
    /// Требует сохранённый access-токен суперпользователя.
    pub async fn create_tag(&self, name: &str) -> FeedClientResult<Tag> {
        let token = self.require_token()?;
        self.http.create_tag(&token, name).await
    }

    /// Удаляет тег по идентификатору.
    ///
    /// Требует сохранённый access-токен суперпользователя.
    pub async fn delete_tag(&self, id: Uuid) -> FeedClientResult<()> {
        let token = self.require_token()?;
        self.http.delete_tag(&token, id).await
    }

    /// Обменивает имена тегов на их id, создавая отсутствующие теги.
    ///
    /// Имена нормализуются до отправки: trim, нижний регистр, удаление
    /// дублей с сохранением порядка. Пустой итог — пустой ответ без запроса.
    pub async fn resolve_tags(&self, names: &[String]) -> FeedClientResult<Vec<Uuid>> {
        let names = normalize_tag_names(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.require_token()?;
        self.http.resolve_tags(&token, &names).await
    }

    /// Возвращает список пользователей (только для суперпользователя).
    pub async fn list_users(&self, limit: u32, offset: u32) -> FeedClientResult<Vec<User>> {
        let token = self.require_token()?;
        self.http.list_users(&token, limit, offset).await
    }

    /// Возвращает пользователя по идентификатору (только для суперпользователя).
    pub async fn get_user(&self, id: Uuid) -> FeedClientResult<User> {
        let token = self.require_token()?;
        self.http.get_user(&token, id).await
    }

    /// Удаляет пользователя по идентификатору (только для суперпользователя).
    pub async fn delete_user(&self, id: Uuid) -> FeedClientResult<()> {
        let token = self.require_token()?;
        self.http.delete_user(&token, id).await
    }
}

fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_lowercase();
        if name.is_empty() || result.iter().any(|seen| seen == &name) {
            continue;
        }
        result.push(name);
    }
    result
}
