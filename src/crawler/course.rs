//! Contenido del sitio del curso (docsify).
//!
//! docsify sirve cada página como un `.md` crudo y el índice está en
//! `_sidebar.md`. Se recorre el índice, se descarga cada página del mismo
//! host y se guarda con la URL "bonita" (`/#/...`) que ven los alumnos.

use std::collections::HashSet;
use std::path::Path;

use chrono::DateTime;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    checkpoint, collapse_whitespace, with_trailing_slash, Fetched, HttpClient, Prompter,
    ScrapeSettings,
};
use crate::{error::ScrapeError, models::CourseRecord};

const SIDEBAR: &str = "_sidebar.md";

/// Título y texto de una página.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub title: Option<String>,
    pub content: String,
}

/// Enlace `[texto](destino)` tal como aparece en el markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownLink {
    pub text: String,
    pub href: String,
}

pub struct CourseScraper {
    http: HttpClient,
    base_url: Url,
    max_pages: usize,
}

impl CourseScraper {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = settings.course_cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            let mut value = HeaderValue::from_str(cookie.trim())?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        Ok(Self {
            http: HttpClient::new(&settings.http, headers)?,
            base_url: with_trailing_slash(settings.course_base_url.clone()),
            max_pages: settings.max_pages,
        })
    }

    pub async fn scrape(
        &mut self,
        prompter: &dyn Prompter,
        output: &Path,
    ) -> Result<Vec<CourseRecord>, ScrapeError> {
        let sidebar_url = self.join(SIDEBAR)?;
        let sidebar = self.http.get(&sidebar_url).await?;
        let pages = self.page_urls(&markdown_links(&sidebar.body));
        info!("📖 {} páginas del curso en el índice", pages.len());

        let mut records = Vec::new();
        for (label, page_url) in pages.into_iter().take(self.max_pages) {
            // Una página rota no invalida el resto del sitio.
            let fetched = match self.http.get(&page_url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("Se omite {}: {}", page_url, e);
                    continue;
                }
            };

            if let Some(record) = build_record(&page_url, &label, fetched, prompter)? {
                debug!("Página '{}' ({} caracteres)", record.title, record.content.len());
                records.push(record);
                checkpoint(output, &records);
            }
        }

        info!("✅ {} páginas del curso extraídas", records.len());
        Ok(records)
    }

    /// URLs descargables del índice: mismo host, sin duplicados, en orden.
    fn page_urls(&self, links: &[MarkdownLink]) -> Vec<(String, Url)> {
        let mut seen = HashSet::new();
        let mut pages = Vec::new();

        for link in links {
            let Some(url) = resolve_page_url(&self.base_url, &link.href) else {
                debug!("Enlace externo u opaco ignorado: {}", link.href);
                continue;
            };
            if seen.insert(url.clone()) {
                pages.push((link.text.clone(), url));
            }
        }
        pages
    }

    fn join(&self, path: &str) -> Result<Url, ScrapeError> {
        self.base_url.join(path).map_err(|e| ScrapeError::Unexpected {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }
}

fn build_record(
    page_url: &Url,
    label: &str,
    fetched: Fetched,
    prompter: &dyn Prompter,
) -> Result<Option<CourseRecord>, ScrapeError> {
    let url = display_url(page_url);
    let page = if fetched.is_html() {
        html_page_text(&fetched.body)
    } else {
        markdown_page_text(&fetched.body)
    };

    let title = match page.title.or_else(|| Some(label.trim().to_string()).filter(|l| !l.is_empty())) {
        Some(title) => title,
        None => match prompter.fill_field("title", &url)? {
            Some(title) => title,
            None => return Ok(None),
        },
    };
    let content = match page.content {
        content if !content.is_empty() => content,
        _ => match prompter.fill_field("content", &url)? {
            Some(content) => content,
            None => return Ok(None),
        },
    };

    Ok(Some(CourseRecord {
        title,
        content,
        url,
        content_date: fetched.last_modified.as_deref().and_then(http_date_to_day),
    }))
}

/// Resuelve un enlace del índice contra la raíz del sitio.
///
/// Acepta `page.md`, `page`, `/2025-01/page.md` y el estilo docsify
/// `#/2025-01/page`. Devuelve `None` para otros hosts y para anclas.
pub fn resolve_page_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let href = match href.strip_prefix("#/") {
        Some(route) => format!("/{route}"),
        None if href.starts_with('#') => return None,
        None => href.to_string(),
    };

    let mut url = base.join(&href).ok()?;
    if url.host_str() != base.host_str() || url.port_or_known_default() != base.port_or_known_default() {
        return None;
    }
    url.set_fragment(None);
    url.set_query(None);

    let path = url.path().to_string();
    if path.ends_with('/') {
        url.set_path(&format!("{path}README.md"));
    } else if !path.rsplit('/').next().is_some_and(|last| last.contains('.')) {
        url.set_path(&format!("{path}.md"));
    }
    url.path().ends_with(".md").then_some(url)
}

/// URL que ve el alumno en el navegador: `https://host/#/ruta/sin/md`.
pub fn display_url(page_url: &Url) -> String {
    let route = page_url.path();
    let route = route
        .strip_suffix("README.md")
        .or_else(|| route.strip_suffix(".md"))
        .unwrap_or(route);
    format!("{}/#{}", page_url.origin().ascii_serialization(), route)
}

/// `Last-Modified` (RFC 2822) → `YYYY-MM-DD`.
pub fn http_date_to_day(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|date| date.date_naive().format("%Y-%m-%d").to_string())
}

pub fn markdown_links(markdown: &str) -> Vec<MarkdownLink> {
    let mut links = Vec::new();
    let mut current: Option<MarkdownLink> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Link { dest_url, .. }) => {
                current = Some(MarkdownLink {
                    text: String::new(),
                    href: dest_url.to_string(),
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(link) = current.as_mut() {
                    link.text.push_str(&text);
                }
            }
            Event::End(TagEnd::Link) => {
                if let Some(mut link) = current.take() {
                    link.text = collapse_whitespace(&link.text);
                    links.push(link);
                }
            }
            _ => {}
        }
    }
    links
}

/// Texto de una página markdown. El título es el primer `# H1`.
pub fn markdown_page_text(markdown: &str) -> PageText {
    let mut title: Option<String> = None;
    let mut heading: Option<String> = None;
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if title.is_none() => heading = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if heading.is_some() => {
                title = heading.take().map(|h| collapse_whitespace(&h)).filter(|h| !h.is_empty());
                text.push('\n');
            }
            Event::Text(fragment) | Event::Code(fragment) => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(&fragment);
                }
                text.push_str(&fragment);
            }
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                text.push('\n')
            }
            _ => {}
        }
    }

    PageText {
        title,
        content: normalize_lines(&text),
    }
}

/// Texto de una página HTML (por si el servidor no sirve `.md` crudo).
pub fn html_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);
    PageText {
        title: first_text(&document, &["h1", "title"]),
        content: first_text(&document, &["article", "main", "body"]).unwrap_or_default(),
    }
}

/// Texto del primer elemento no vacío que casa con alguno de los selectores.
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        let element = document.select(&selector).next()?;
        let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        (!text.is_empty()).then_some(text)
    })
}

fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
