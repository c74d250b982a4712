use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Хранилище access-токена.
///
/// Абстрагирует, где живёт токен между запросами: в памяти процесса,
/// в файле рядом с CLI или в чём-то своём у встраивающего приложения.
/// Пустой или пробельный токен считается отсутствующим.
pub trait TokenStore: Debug + Send + Sync {
    /// Возвращает сохранённый токен, если он есть.
    fn get(&self) -> Option<String>;

    /// Сохраняет токен.
    fn set(&self, token: &str) -> io::Result<()>;

    /// Удаляет сохранённый токен.
    fn remove(&self) -> io::Result<()>;

    /// Есть ли сохранённый токен.
    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[derive(Debug, Default)]
/// Хранилище токена в памяти процесса.
///
/// Токен живёт, пока жив клиент. Подходит для тестов и для приложений,
/// которые сами решают, как переживать перезапуск.
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Создаёт пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().expect("token store mutex poisoned").clone()
    }

    fn set(&self, token: &str) -> io::Result<()> {
        *self.token.lock().expect("token store mutex poisoned") = parse_token(token);
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        *self.token.lock().expect("token store mutex poisoned") = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище токена в файле.
///
/// Файл содержит токен как есть, без обёрток. Отсутствие файла означает
/// отсутствие токена.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Создаёт хранилище с указанным путём к файлу токена.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу токена.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        parse_token(&raw)
    }

    fn set(&self, token: &str) -> io::Result<()> {
        fs::write(&self.path, token)
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
