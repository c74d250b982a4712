//! Клиентская библиотека блога с курсорной лентой.
//!
//! Состоит из трёх частей:
//! - типизированный клиент REST API (`FeedClient`): auth, посты, теги,
//!   пользователи;
//! - хранилище access-токена (`TokenStore`) с реализациями в памяти и в файле;
//! - контроллер бесконечной ленты (`FeedController`): загрузка постов
//!   страницами по курсору и подгрузка следующей страницы при прокрутке.
//!
//! Клиент хранит JWT-токен после `login`/`refresh` и автоматически использует
//! его в защищённых операциях.
#![warn(missing_docs)]

mod client;
mod error;
mod feed;
mod http;
mod models;
mod store;

pub use client::FeedClient;
pub use error::{FeedClientError, FeedClientResult};
pub use feed::{
    FeedController, FeedState, FeedView, PAGE_SIZE, SCROLL_THRESHOLD_PX, ScrollMetrics,
};
pub use models::{Post, PostFilter, PostPatch, Tag, TokenPair, User};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
