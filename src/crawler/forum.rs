//! Posts del foro Discourse de la asignatura.
//!
//! Flujo: token CSRF → login con sesión por cookie → páginas JSON de la
//! categoría → cada tema (`/t/<id>.json`) y, si hace falta, los posts que
//! Discourse no incluye en la primera respuesta.

use std::collections::HashSet;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{
    checkpoint, collapse_whitespace, parse_timestamp, with_trailing_slash, Credentials, DateRange,
    HttpClient, Prompter, ScrapeSettings,
};
use crate::{error::ScrapeError, models::ForumRecord, processor::extract_keywords};

const SITE: &str = "Discourse";

/// Discourse devuelve como mucho 20 posts por petición `posts.json`.
const POSTS_PER_CHUNK: usize = 20;

// --- Formato JSON de Discourse (sólo lo que usamos) ---

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    csrf: String,
}

#[derive(Debug, Default, Deserialize)]
struct CategoryPage {
    #[serde(default)]
    topic_list: TopicList,
}

#[derive(Debug, Default, Deserialize)]
struct TopicList {
    #[serde(default)]
    topics: Vec<TopicSummary>,
    #[serde(default)]
    more_topics_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopicSummary {
    id: u64,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_posted_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopicDetail {
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    post_stream: PostStream,
}

#[derive(Debug, Default, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<Post>,
    /// Ids de todos los posts del tema, aunque `posts` venga recortado.
    #[serde(default)]
    stream: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    #[serde(default)]
    post_number: u64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    cooked: String,
}

// --- Scraper ---

pub struct ForumScraper {
    http: HttpClient,
    base_url: Url,
    category: String,
    range: DateRange,
    max_topics: usize,
}

impl ForumScraper {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        Ok(Self {
            http: HttpClient::new(&settings.http, headers)?,
            base_url: with_trailing_slash(settings.forum_base_url.clone()),
            category: settings.forum_category.trim_matches('/').to_string(),
            range: settings.range,
            max_topics: settings.max_topics,
        })
    }

    /// Inicia sesión; la cookie queda guardada en el cliente.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), ScrapeError> {
        let csrf_url = self.url("session/csrf.json")?;
        let CsrfResponse { csrf } = self.http.get_json(&csrf_url).await?;

        let mut headers = HeaderMap::new();
        headers.insert("X-CSRF-Token", HeaderValue::from_str(&csrf)?);

        let session_url = self.url("session")?;
        let (status, body) = self
            .http
            .post_form(
                &session_url,
                &[
                    ("login", credentials.username.as_str()),
                    ("password", credentials.password.as_str()),
                ],
                headers,
            )
            .await?;

        // Discourse responde 200 con `{"error": ...}` si la contraseña es incorrecta.
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if let Some(reason) = parsed.get("error").and_then(|e| e.as_str()) {
            return Err(ScrapeError::Auth {
                site: SITE,
                reason: reason.to_string(),
            });
        }
        if !(200..300).contains(&status) {
            return Err(ScrapeError::Auth {
                site: SITE,
                reason: format!("HTTP {status}"),
            });
        }

        info!("🔐 Sesión iniciada en {} como {}", self.base_url, credentials.username);
        Ok(())
    }

    /// Recorre la categoría y devuelve los posts dentro de la ventana de fechas.
    pub async fn scrape(
        &mut self,
        prompter: &dyn Prompter,
        output: &Path,
    ) -> Result<Vec<ForumRecord>, ScrapeError> {
        let topics = self.list_topics().await?;
        info!("🧵 {} temas candidatos en {}", topics.len(), self.category);

        let mut records = Vec::new();
        for topic in &topics {
            let before = records.len();
            self.scrape_topic(topic.id, prompter, &mut records).await?;
            debug!("Tema {}: {} posts en rango", topic.id, records.len() - before);
            checkpoint(output, &records);
        }

        info!(
            "✅ {} posts del foro entre {} y {}",
            records.len(),
            self.range.start,
            self.range.end
        );
        Ok(records)
    }

    async fn list_topics(&mut self) -> Result<Vec<TopicSummary>, ScrapeError> {
        let mut topics = Vec::new();
        let mut seen = HashSet::new();

        for page in 0.. {
            let mut url = self.url(&format!("{}.json", self.category))?;
            url.query_pairs_mut().append_pair("page", &page.to_string());

            let CategoryPage { topic_list } = self.http.get_json(&url).await?;
            if topic_list.topics.is_empty() {
                break;
            }

            for topic in topic_list.topics {
                if topics.len() >= self.max_topics {
                    return Ok(topics);
                }
                if seen.insert(topic.id) && self.may_overlap(&topic) {
                    topics.push(topic);
                }
            }

            if topic_list.more_topics_url.is_none() {
                break;
            }
        }

        Ok(topics)
    }

    /// Descarta temas creados después del rango o sin actividad dentro de él.
    fn may_overlap(&self, topic: &TopicSummary) -> bool {
        let created = topic.created_at.as_deref().and_then(parse_timestamp);
        let last_post = topic.last_posted_at.as_deref().and_then(parse_timestamp);
        !created.is_some_and(|date| date > self.range.end)
            && !last_post.is_some_and(|date| date < self.range.start)
    }

    async fn scrape_topic(
        &mut self,
        topic_id: u64,
        prompter: &dyn Prompter,
        records: &mut Vec<ForumRecord>,
    ) -> Result<(), ScrapeError> {
        let topic_url = self.url(&format!("t/{topic_id}.json"))?;
        let detail: TopicDetail = self.http.get_json(&topic_url).await?;
        let mut posts = detail.post_stream.posts;

        let loaded: HashSet<u64> = posts.iter().map(|post| post.id).collect();
        let missing: Vec<u64> = detail
            .post_stream
            .stream
            .into_iter()
            .filter(|id| !loaded.contains(id))
            .collect();
        for chunk in missing.chunks(POSTS_PER_CHUNK) {
            let mut url = self.url(&format!("t/{topic_id}/posts.json"))?;
            for id in chunk {
                url.query_pairs_mut().append_pair("post_ids[]", &id.to_string());
            }
            let extra: TopicDetail = self.http.get_json(&url).await?;
            posts.extend(extra.post_stream.posts);
        }
        posts.sort_by_key(|post| post.post_number);

        let mut title = detail.title.trim().to_string();
        let slug = if detail.slug.is_empty() { "topic".to_string() } else { detail.slug };

        for post in posts {
            if !self.range.contains_timestamp(&post.created_at) {
                continue;
            }

            let url = self
                .url(&format!("t/{slug}/{topic_id}/{}", post.post_number))?
                .to_string();

            if title.is_empty() {
                match prompter.fill_field("title", &url)? {
                    Some(value) => title = value,
                    None => return Ok(()),
                }
            }

            let content = match html_to_text(&post.cooked) {
                text if !text.is_empty() => text,
                _ => match prompter.fill_field("content", &url)? {
                    Some(value) => value,
                    None => continue,
                },
            };

            records.push(ForumRecord {
                keywords: extract_keywords(&title).into_iter().collect(),
                title: title.clone(),
                content,
                url,
                username: post.username,
                created_at: post.created_at,
            });
        }

        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ScrapeError> {
        self.base_url
            .join(path)
            .map_err(|e| ScrapeError::Unexpected {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }
}

/// Texto plano del HTML `cooked` de un post.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let pieces: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&pieces.join(" "))
}
