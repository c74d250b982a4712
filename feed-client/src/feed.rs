use std::cell::{Cell, RefCell};

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::client::FeedClient;
use crate::error::FeedClientError;
use crate::models::Post;

/// Размер страницы ленты.
pub const PAGE_SIZE: u32 = 10;

/// Порог до низа документа (в пикселях), после которого прокрутка
/// запускает загрузку следующей страницы.
pub const SCROLL_THRESHOLD_PX: f64 = 100.0;

/// Приёмник отрисовки ленты.
///
/// Контроллер ничего не знает про разметку: он только говорит, что список
/// нужно перерисовать с нуля, дополнить или что сессия закончилась.
pub trait FeedView {
    /// Перерисовывает список с нуля (первая загрузка или перезагрузка).
    fn replace(&mut self, posts: &[Post]);

    /// Дописывает следующую страницу в конец списка.
    fn append(&mut self, posts: &[Post]);

    /// Сервер отверг токен: показать вход заново.
    fn redirect_to_login(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
/// Снимок положения прокрутки, который внешний цикл событий передаёт
/// в [`FeedController::on_scroll`].
pub struct ScrollMetrics {
    /// Прокрученное расстояние от верха документа.
    pub scroll_top: f64,
    /// Полная высота документа.
    pub scroll_height: f64,
    /// Высота видимой области.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Находится ли низ видимой области в пределах `threshold` пикселей
    /// от низа документа.
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - threshold
    }
}

#[derive(Debug)]
/// Состояние пагинации одной ленты.
///
/// Все три поля меняются только из [`FeedController`] и только в одном
/// логическом потоке, поэтому вместо блокировок достаточно `Cell`.
pub struct FeedState {
    cursor: Cell<Option<Uuid>>,
    is_loading: Cell<bool>,
    has_more: Cell<bool>,
}

impl FeedState {
    /// Начальное состояние: начало ленты, ничего не грузится, данные есть.
    pub fn new() -> Self {
        Self {
            cursor: Cell::new(None),
            is_loading: Cell::new(false),
            has_more: Cell::new(true),
        }
    }

    /// Текущий курсор: id последнего полученного поста, `None` — начало ленты.
    pub fn cursor(&self) -> Option<Uuid> {
        self.cursor.get()
    }

    /// Идёт ли сейчас запрос страницы.
    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    /// Остались ли ещё страницы.
    ///
    /// Сбрасывается в `false`, когда страница пришла короче [`PAGE_SIZE`].
    pub fn has_more(&self) -> bool {
        self.has_more.get()
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Сбрасывает `is_loading` при любом выходе из `load_page`, включая панику.
struct LoadingGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Контроллер бесконечной ленты постов.
///
/// Грузит посты страницами по курсору, передаёт их во [`FeedView`] и
/// подгружает следующую страницу, когда прокрутка приближается к низу
/// документа. Флаг `is_loading` гарантирует не более одного запроса
/// одновременно; отмены и таймаута сверх HTTP-клиентского нет — зависший
/// запрос блокирует пагинацию, пока не завершится.
///
/// Сетевые сбои не показываются пользователю: они только логируются, и лента
/// просто перестаёт расти до следующего события прокрутки.
pub struct FeedController<V: FeedView> {
    client: FeedClient,
    view: RefCell<V>,
    state: FeedState,
}

impl<V: FeedView> FeedController<V> {
    /// Создаёт контроллер поверх клиента и приёмника отрисовки.
    pub fn new(client: FeedClient, view: V) -> Self {
        Self {
            client,
            view: RefCell::new(view),
            state: FeedState::new(),
        }
    }

    /// Текущее состояние пагинации.
    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Загружает одну страницу ленты после `cursor` (`None` — с начала).
    ///
    /// Если запрос уже идёт, ничего не делает: это и есть защита от
    /// дублирующихся запросов при частых событиях прокрутки. Успешная
    /// страница с `cursor == None` перерисовывает список с нуля, иначе
    /// дописывается в конец. 401 от сервера удаляет токен и отправляет
    /// представление на вход; остальные ошибки только логируются, состояние
    /// не меняется.
    pub async fn load_page(&self, cursor: Option<Uuid>) {
        if self.state.is_loading.get() {
            debug!("load_page skipped: request already in flight");
            return;
        }
        self.state.is_loading.set(true);
        let _guard = LoadingGuard {
            flag: &self.state.is_loading,
        };

        match self.client.feed_page(PAGE_SIZE, cursor).await {
            Ok(posts) => {
                let mut view = self.view.borrow_mut();
                if cursor.is_none() {
                    view.replace(&posts);
                } else {
                    view.append(&posts);
                }

                // Пустая страница оставляет курсор на месте.
                if let Some(last) = posts.last() {
                    self.state.cursor.set(Some(last.id));
                }
                self.state.has_more.set(posts.len() as u32 == PAGE_SIZE);
                debug!(count = posts.len(), "feed page loaded");
            }
            Err(FeedClientError::Unauthorized) => {
                self.force_logout();
            }
            Err(err) => {
                error!("failed to load feed page: {err}");
            }
        }
    }

    /// Обрабатывает событие прокрутки.
    ///
    /// Дешёвая проверка без I/O: если низ документа ближе
    /// [`SCROLL_THRESHOLD_PX`], запрос не идёт и страницы ещё есть,
    /// загружает следующую страницу с текущего курсора. Может вызываться
    /// сколь угодно часто.
    pub async fn on_scroll(&self, metrics: ScrollMetrics) {
        if self.state.is_loading.get() || !self.state.has_more.get() {
            return;
        }
        if !metrics.near_bottom(SCROLL_THRESHOLD_PX) {
            return;
        }

        self.load_page(self.state.cursor.get()).await;
    }

    /// Перезагружает ленту с начала.
    ///
    /// Вызывается после мутаций (например, удаления поста): курсор
    /// возвращается к началу, `has_more` — к `true`, первая страница
    /// перерисовывает список.
    pub async fn reset_and_reload(&self) {
        self.state.cursor.set(None);
        self.state.has_more.set(true);
        self.load_page(None).await;
    }

    /// Удаляет пост и перезагружает ленту с начала.
    ///
    /// 401 обрабатывается как в [`Self::load_page`]; прочие ошибки
    /// логируются, лента остаётся как была.
    pub async fn delete_post(&self, id: Uuid) {
        match self.client.delete_post(id).await {
            Ok(()) => self.reset_and_reload().await,
            Err(FeedClientError::Unauthorized) => self.force_logout(),
            Err(err) => {
                error!("failed to delete post {id}: {err}");
            }
        }
    }

    fn force_logout(&self) {
        warn!("server rejected the token, logging out");
        if let Err(err) = self.client.logout() {
            warn!("failed to clear stored token: {err}");
        }
        self.view.borrow_mut().redirect_to_login();
    }
}
