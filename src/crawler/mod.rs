//! Scraper offline que genera los dos ficheros JSON del corpus.
//!
//! Se ejecuta a mano (binario `scrape`), nunca desde el servidor. Cada sitio
//! se procesa de forma independiente: si uno falla, el fichero que ya existía
//! para ese sitio no se toca y el otro sitio sigue adelante.

pub mod course;
pub mod forum;
pub mod prompt;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LAST_MODIFIED};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::ScrapeError;

pub use self::course::CourseScraper;
pub use self::forum::ForumScraper;
pub use self::prompt::{AutomatedPrompter, DialoguerPrompter, Prompter};

// --- Configuración ---

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Ventana de fechas inclusiva en ambos extremos, en UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScrapeError> {
        if start > end {
            return Err(ScrapeError::Unexpected {
                url: "--start-date/--end-date".to_string(),
                reason: format!("la fecha inicial {start} es posterior a la final {end}"),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `false` si la marca temporal no se puede interpretar.
    pub fn contains_timestamp(&self, raw: &str) -> bool {
        parse_timestamp(raw).is_some_and(|date| self.contains(date))
    }
}

/// Acepta RFC 3339 (se normaliza a UTC) o una fecha `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parámetros de red compartidos por ambos scrapers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Pausa mínima entre dos peticiones al mismo sitio.
    pub rate_limit: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("virtual-ta-scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: Duration::from_millis(500),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Raíz de la que se sirven los `.md` del sitio docsify del curso.
    pub course_base_url: Url,
    pub course_cookie: Option<String>,
    pub max_pages: usize,
    pub forum_base_url: Url,
    /// Ruta de la categoría, p. ej. `c/courses/tds-kb/34`.
    pub forum_category: String,
    pub credentials: Option<Credentials>,
    pub max_topics: usize,
    pub range: DateRange,
    pub http: HttpSettings,
}

/// `Url::join` descarta el último segmento si la base no acaba en `/`.
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// --- Cliente HTTP ---

/// Cuerpo de una respuesta junto con las cabeceras que nos interesan.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
}

impl Fetched {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
            || self.body.trim_start().starts_with('<')
    }
}

/// Cliente con sesión (cookies), pausa entre peticiones y reintentos.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    settings: HttpSettings,
    last_request_time: Option<Instant>,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings, default_headers: HeaderMap) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            settings: settings.clone(),
            last_request_time: None,
        })
    }

    pub async fn get(&mut self, url: &Url) -> Result<Fetched, ScrapeError> {
        let mut attempt = 0;
        loop {
            self.apply_rate_limit().await;
            match self.try_get(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!("Error recuperable en {} (intento {}): {}", url, attempt, e);
                    sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    error!("Fallo definitivo pidiendo {}: {}", url, e);
                    return Err(e);
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&mut self, url: &Url) -> Result<T, ScrapeError> {
        let fetched = self.get(url).await?;
        serde_json::from_str(&fetched.body).map_err(|e| ScrapeError::Unexpected {
            url: url.to_string(),
            reason: format!("JSON inválido: {e}"),
        })
    }

    /// POST de formulario sin reintentos: un login repetido no es idempotente.
    pub async fn post_form(
        &mut self,
        url: &Url,
        form: &[(&str, &str)],
        headers: HeaderMap,
    ) -> Result<(u16, String), ScrapeError> {
        self.apply_rate_limit().await;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .form(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.text().await?))
    }

    async fn try_get(&self, url: &Url) -> Result<Fetched, ScrapeError> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let last_modified = header(LAST_MODIFIED);

        Ok(Fetched {
            body: response.text().await?,
            content_type,
            last_modified,
        })
    }

    async fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();
            if elapsed < self.settings.rate_limit {
                sleep(self.settings.rate_limit - elapsed).await;
            }
        }
        self.last_request_time = Some(Instant::now());
    }
}

/// Colapsa espacios y saltos de línea en un único espacio.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Ficheros de salida ---

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub course_content: PathBuf,
    pub forum_posts: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            course_content: dir.join("course_content.json"),
            forum_posts: dir.join("discourse_posts.json"),
        }
    }
}

/// `course_content.json` → `course_content.backup.json`.
pub fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("backup.json")
}

/// Escribe en un temporal junto al destino y lo renombra, de modo que un
/// lector nunca ve un fichero a medias.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Guarda el progreso parcial; un fallo aquí sólo se avisa.
pub(crate) fn checkpoint<T: Serialize>(path: &Path, records: &[T]) {
    if records.is_empty() {
        return;
    }
    if let Err(e) = write_json_atomic(&backup_path(path), records) {
        warn!("No se pudo guardar la copia parcial de {}: {}", path.display(), e);
    }
}

fn remove_backup(path: &Path) {
    match fs::remove_file(backup_path(path)) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("No se pudo borrar la copia parcial de {}: {}", path.display(), e),
    }
}

// --- Orquestación ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub course: bool,
    pub forum: bool,
}

/// Resultado por sitio; `None` si el sitio no se pidió.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub course: Option<Result<usize, ScrapeError>>,
    pub forum: Option<Result<usize, ScrapeError>>,
}

impl ScrapeReport {
    pub fn all_succeeded(&self) -> bool {
        [&self.course, &self.forum]
            .into_iter()
            .flatten()
            .all(|result| result.is_ok())
    }
}

pub async fn run(
    settings: &ScrapeSettings,
    targets: Targets,
    paths: &OutputPaths,
    prompter: &dyn Prompter,
) -> ScrapeReport {
    let mut report = ScrapeReport::default();

    if targets.course {
        let result = scrape_course_to(settings, prompter, &paths.course_content).await;
        log_outcome("curso", &paths.course_content, &result);
        report.course = Some(result);
    }
    if targets.forum {
        let result = scrape_forum_to(settings, prompter, &paths.forum_posts).await;
        log_outcome("foro", &paths.forum_posts, &result);
        report.forum = Some(result);
    }

    report
}

pub async fn scrape_course_to(
    settings: &ScrapeSettings,
    prompter: &dyn Prompter,
    output: &Path,
) -> Result<usize, ScrapeError> {
    let mut scraper = CourseScraper::new(settings)?;
    let records = scraper.scrape(prompter, output).await?;
    if records.is_empty() {
        return Err(ScrapeError::Empty("el sitio del curso"));
    }
    write_json_atomic(output, &records)?;
    remove_backup(output);
    Ok(records.len())
}

pub async fn scrape_forum_to(
    settings: &ScrapeSettings,
    prompter: &dyn Prompter,
    output: &Path,
) -> Result<usize, ScrapeError> {
    let credentials = match &settings.credentials {
        Some(credentials) => credentials.clone(),
        None => prompter.credentials("Discourse")?,
    };

    let mut scraper = ForumScraper::new(settings)?;
    scraper.login(&credentials).await?;
    let records = scraper.scrape(prompter, output).await?;
    if records.is_empty() {
        return Err(ScrapeError::Empty("el foro"));
    }
    write_json_atomic(output, &records)?;
    remove_backup(output);
    Ok(records.len())
}

fn log_outcome(site: &str, path: &Path, result: &Result<usize, ScrapeError>) {
    match result {
        Ok(count) => info!("✅ {}: {} registros guardados en {}", site, count, path.display()),
        Err(e) => error!(
            "❌ {}: {} (se conserva el fichero anterior, si existía)",
            site, e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(date("2025-01-01"), date("2025-04-14")).unwrap()
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = range();
        assert!(range.contains_timestamp("2025-01-01T00:00:00Z"));
        assert!(range.contains_timestamp("2025-04-14T23:59:59Z"));
        assert!(!range.contains_timestamp("2024-12-31T23:59:59Z"));
        assert!(!range.contains_timestamp("2025-04-15T00:00:00Z"));
    }

    #[test]
    fn timestamps_are_compared_in_utc() {
        // 2025-04-15 01:00 en +05:30 es todavía el 14 en UTC.
        assert!(range().contains_timestamp("2025-04-15T01:00:00+05:30"));
    }

    #[test]
    fn plain_dates_and_garbage() {
        assert_eq!(parse_timestamp("2025-02-03"), Some(date("2025-02-03")));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert!(!range().contains_timestamp(""));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date("2025-05-01"), date("2025-04-01")).is_err());
    }

    #[test]
    fn trailing_slash_is_added_once() {
        let url = with_trailing_slash(Url::parse("https://example.com/2025-01").unwrap());
        assert_eq!(url.as_str(), "https://example.com/2025-01/");
        let again = with_trailing_slash(url.clone());
        assert_eq!(again, url);
    }

    #[test]
    fn backup_sits_next_to_output() {
        assert_eq!(
            backup_path(Path::new("data/course_content.json")),
            PathBuf::from("data/course_content.backup.json")
        );
    }

    #[test]
    fn atomic_write_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json_atomic(&path, &vec!["first"]).unwrap();
        write_json_atomic(&path, &vec!["second"]).unwrap();

        let stored: Vec<String> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored, vec!["second".to_string()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn checkpoint_skips_empty_batches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        checkpoint::<String>(&path, &[]);
        assert!(!backup_path(&path).exists());

        checkpoint(&path, &["partial".to_string()]);
        assert!(backup_path(&path).exists());
        remove_backup(&path);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn report_fails_if_any_requested_site_failed() {
        let mut report = ScrapeReport {
            course: Some(Ok(3)),
            forum: None,
        };
        assert!(report.all_succeeded());
        report.forum = Some(Err(ScrapeError::MissingCredentials("Discourse")));
        assert!(!report.all_succeeded());
    }
}
