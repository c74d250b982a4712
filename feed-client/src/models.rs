use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель пользователя.
pub struct User {
    /// Идентификатор пользователя.
    pub id: Uuid,
    /// Логин.
    pub username: String,
    /// Email (может отсутствовать).
    pub email: Option<String>,
    /// Активен ли аккаунт.
    pub is_active: bool,
    /// Суперпользователь.
    pub is_superuser: bool,
    /// Дата и время создания пользователя (UTC).
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Тег поста.
pub struct Tag {
    /// Идентификатор тега.
    pub id: Uuid,
    /// Имя тега (нормализованное: trim + нижний регистр).
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель поста.
pub struct Post {
    /// Идентификатор поста.
    pub id: Uuid,
    /// Заголовок поста.
    pub title: String,
    /// Содержимое поста.
    pub content: String,
    /// Автор поста.
    pub owner: User,
    /// Теги поста в порядке, заданном автором.
    pub tags: Vec<Tag>,
    /// Дата и время создания поста (UTC).
    pub created_at: DateTime<Utc>,
    /// Дата и время последнего обновления поста (UTC), если пост меняли.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Пара токенов после успешного входа или обновления.
pub struct TokenPair {
    /// JWT access token.
    pub access_token: String,
    /// JWT refresh token.
    pub refresh_token: String,
    /// Тип токена, всегда `bearer`.
    pub token_type: String,
    /// Время жизни access-токена в секундах.
    pub expires_in: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Фильтры списка постов (`GET /api/v1/posts`).
///
/// Поля со значением `None` не попадают в query string, сервер применяет
/// свои значения по умолчанию.
pub struct PostFilter {
    /// Максимум постов в ответе.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Смещение от начала выборки.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Только посты с данным тегом.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<Uuid>,
    /// Только посты данного автора.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    /// Поиск по заголовку.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Частичное обновление поста (`PATCH /api/v1/posts/{id}`).
///
/// Поля со значением `None` не сериализуются и остаются без изменений.
pub struct PostPatch {
    /// Новый заголовок.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Новое содержимое.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Новый полный набор тегов.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<Uuid>>,
}
