use std::process;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use feed_client::{
    FeedClient, FeedClientError, FeedController, FeedView, FileTokenStore, Post, PostFilter,
    PostPatch, ScrollMetrics, Tag, TokenPair, User,
};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

const TOKEN_FILE: &str = ".feed_token";
const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

#[derive(Debug, Parser)]
#[command(name = "feed-cli", version, about = "CLI клиент блога с курсорной лентой")]
struct Cli {
    /// Адрес сервера (по умолчанию FEED_SERVER_URL или локальный).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Вход пользователя; access-токен сохраняется в .feed_token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Обновление пары токенов по refresh-токену.
    Refresh {
        #[arg(long)]
        refresh_token: String,
    },
    /// Выход: удаляет сохранённый токен.
    Logout,
    /// Текущий пользователь.
    Me,
    /// Лента постов: страницы по курсору, как при прокрутке.
    Feed {
        /// Сколько страниц загрузить (0 — до конца ленты).
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Операции с постами.
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// Операции с тегами.
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// Операции с пользователями (только суперпользователь).
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Debug, Subcommand)]
enum PostCommand {
    /// Создание поста (требует токен).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Теги через запятую; отсутствующие будут созданы.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Получение поста по id.
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Частичное обновление поста (требует токен).
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Новый полный набор тегов через запятую.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Удаление поста (требует токен).
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Список постов с фильтрами limit/offset.
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        tag_id: Option<Uuid>,
        #[arg(long)]
        owner_id: Option<Uuid>,
        /// Поиск по заголовку.
        #[arg(long)]
        q: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum TagCommand {
    /// Список тегов.
    List {
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Создание тега (требует токен суперпользователя).
    Create {
        #[arg(long)]
        name: String,
    },
    /// Удаление тега (требует токен суперпользователя).
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Обмен имён тегов на id; отсутствующие создаются.
    Resolve {
        /// Имена через запятую.
        #[arg(long)]
        names: String,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Список пользователей.
    List {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Получение пользователя по id.
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Удаление пользователя по id.
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging()?;

    let cli = Cli::parse();
    let server = resolve_server(cli.server);
    let client = FeedClient::with_store(server, Arc::new(FileTokenStore::new(TOKEN_FILE)));

    match cli.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let user = client
                .register(&username, &email, &password)
                .await
                .map_err(map_client_error)?;
            println!("Регистрация успешна, теперь выполните login");
            print_user(&user);
        }
        Command::Login { username, password } => {
            let pair = client
                .login(&username, &password)
                .await
                .map_err(map_client_error)?;
            println!("Вход выполнен, токен сохранён в {TOKEN_FILE}");
            print_token_pair(&pair);
        }
        Command::Refresh { refresh_token } => {
            let pair = client
                .refresh(&refresh_token)
                .await
                .map_err(map_client_error)?;
            println!("Токены обновлены");
            print_token_pair(&pair);
        }
        Command::Logout => {
            client.logout().map_err(map_client_error)?;
            println!("Токен удалён");
        }
        Command::Me => {
            let user = client.me().await.map_err(map_client_error)?;
            print_user(&user);
        }
        Command::Feed { pages } => {
            run_feed(&client, pages).await;
        }
        Command::Post { command } => run_post_command(&client, command).await?,
        Command::Tag { command } => run_tag_command(&client, command).await?,
        Command::User { command } => run_user_command(&client, command).await?,
    }

    Ok(())
}

async fn run_post_command(client: &FeedClient, command: PostCommand) -> Result<()> {
    match command {
        PostCommand::Create {
            title,
            content,
            tags,
        } => {
            let tag_ids = match tags {
                Some(raw) => resolve_tag_names(client, &raw).await?,
                None => Vec::new(),
            };
            let post = client
                .create_post(&title, &content, &tag_ids)
                .await
                .map_err(map_client_error)?;
            print_post("Пост создан", &post);
        }
        PostCommand::Get { id } => {
            let post = client.get_post(id).await.map_err(map_client_error)?;
            print_post("Пост", &post);
        }
        PostCommand::Update {
            id,
            title,
            content,
            tags,
        } => {
            let tag_ids = match tags {
                Some(raw) => Some(resolve_tag_names(client, &raw).await?),
                None => None,
            };
            let patch = PostPatch {
                title,
                content,
                tag_ids,
            };
            let post = client
                .update_post(id, &patch)
                .await
                .map_err(map_client_error)?;
            print_post("Пост обновлён", &post);
        }
        PostCommand::Delete { id } => {
            client.delete_post(id).await.map_err(map_client_error)?;
            println!("Пост удалён: id={id}");
        }
        PostCommand::List {
            limit,
            offset,
            tag_id,
            owner_id,
            q,
        } => {
            let filter = PostFilter {
                limit: Some(limit),
                offset: Some(offset),
                tag_id,
                owner_id,
                q,
            };
            let posts = client.list_posts(&filter).await.map_err(map_client_error)?;
            println!("Постов: {}", posts.len());
            for post in &posts {
                print_post("---", post);
            }
        }
    }
    Ok(())
}

async fn run_tag_command(client: &FeedClient, command: TagCommand) -> Result<()> {
    match command {
        TagCommand::List { limit, offset } => {
            let tags = client
                .list_tags(limit, offset)
                .await
                .map_err(map_client_error)?;
            println!("Тегов: {}", tags.len());
            for tag in &tags {
                print_tag(tag);
            }
        }
        TagCommand::Create { name } => {
            let tag = client.create_tag(&name).await.map_err(map_client_error)?;
            println!("Тег создан");
            print_tag(&tag);
        }
        TagCommand::Delete { id } => {
            client.delete_tag(id).await.map_err(map_client_error)?;
            println!("Тег удалён: id={id}");
        }
        TagCommand::Resolve { names } => {
            let names = split_names(&names);
            let ids = client
                .resolve_tags(&names)
                .await
                .map_err(map_client_error)?;
            for id in ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

async fn run_user_command(client: &FeedClient, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::List { limit, offset } => {
            let users = client
                .list_users(limit, offset)
                .await
                .map_err(map_client_error)?;
            println!("Пользователей: {}", users.len());
            for user in &users {
                print_user(user);
            }
        }
        UserCommand::Get { id } => {
            let user = client.get_user(id).await.map_err(map_client_error)?;
            print_user(&user);
        }
        UserCommand::Delete { id } => {
            client.delete_user(id).await.map_err(map_client_error)?;
            println!("Пользователь удалён: id={id}");
        }
    }
    Ok(())
}

/// Терминальная отрисовка ленты: просто печатает посты по мере загрузки.
#[derive(Debug, Default)]
struct ConsoleView {
    shown: usize,
}

impl ConsoleView {
    fn print_page(&mut self, posts: &[Post]) {
        for post in posts {
            self.shown += 1;
            println!("{:>3}. {} [{}]", self.shown, post.title, post.id);
            if !post.tags.is_empty() {
                let names: Vec<&str> = post.tags.iter().map(|tag| tag.name.as_str()).collect();
                println!("     теги: {}", names.join(", "));
            }
            println!("     создан: {}", post.created_at.format("%Y-%m-%d %H:%M"));
        }
    }
}

impl FeedView for ConsoleView {
    fn replace(&mut self, posts: &[Post]) {
        self.shown = 0;
        if posts.is_empty() {
            println!("Постов пока нет");
            return;
        }
        self.print_page(posts);
    }

    fn append(&mut self, posts: &[Post]) {
        self.print_page(posts);
    }

    fn redirect_to_login(&mut self) {
        println!("Сессия недействительна: выполните `feed-cli login ...`");
    }
}

async fn run_feed(client: &FeedClient, pages: u32) {
    let controller = FeedController::new(client.clone(), ConsoleView::default());

    controller.load_page(None).await;
    let mut loaded = 1u32;

    while controller.state().has_more()
        && (pages == 0 || loaded < pages)
        && client.is_authenticated()
    {
        // Синтетическое событие прокрутки: низ документа в пределах порога.
        controller.on_scroll(scrolled_to_bottom()).await;
        loaded += 1;
    }

    if !controller.state().has_more() {
        println!("Лента закончилась");
    }
}

fn scrolled_to_bottom() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 1000.0,
        scroll_height: 1600.0,
        client_height: 600.0,
    }
}

async fn resolve_tag_names(client: &FeedClient, raw: &str) -> Result<Vec<Uuid>> {
    let names = split_names(raw);
    client.resolve_tags(&names).await.map_err(map_client_error)
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',').map(|name| name.to_string()).collect()
}

fn resolve_server(server: Option<String>) -> String {
    let raw = server
        .or_else(|| std::env::var("FEED_SERVER_URL").ok())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn map_client_error(err: FeedClientError) -> anyhow::Error {
    let message = match err {
        FeedClientError::Unauthorized => {
            "требуется авторизация: выполните `feed-cli login ...`".to_string()
        }
        FeedClientError::Forbidden => "недостаточно прав для этой операции".to_string(),
        FeedClientError::NotFound => "ресурс не найден".to_string(),
        FeedClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        FeedClientError::Http(err) => format!("ошибка HTTP: {err}"),
        FeedClientError::Store(err) => format!("ошибка хранилища токена: {err}"),
    };
    anyhow!(message)
}

fn print_user(user: &User) {
    println!("user:");
    println!("  id: {}", user.id);
    println!("  username: {}", user.username);
    println!("  email: {}", user.email.as_deref().unwrap_or("-"));
    println!("  superuser: {}", user.is_superuser);
    println!("  created_at: {}", user.created_at);
}

fn print_token_pair(pair: &TokenPair) {
    println!("access_token: {}", pair.access_token);
    println!("refresh_token: {}", pair.refresh_token);
    println!("expires_in: {}s", pair.expires_in);
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("content: {}", post.content);
    println!("author: {} [{}]", post.owner.username, post.owner.id);
    if !post.tags.is_empty() {
        let names: Vec<&str> = post.tags.iter().map(|tag| tag.name.as_str()).collect();
        println!("tags: {}", names.join(", "));
    }
    println!("created_at: {}", post.created_at);
    if let Some(updated_at) = post.updated_at {
        println!("updated_at: {updated_at}");
    }
}

fn print_tag(tag: &Tag) {
    println!("{} [{}]", tag.name, tag.id)
}
