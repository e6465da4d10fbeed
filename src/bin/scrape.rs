use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use virtual_ta_webapp::crawler::{
    self, AutomatedPrompter, Credentials, DateRange, DialoguerPrompter, HttpSettings, OutputPaths,
    Prompter, ScrapeSettings, Targets,
};

#[derive(Parser, Debug)]
#[command(name = "scrape")]
#[command(about = "Descarga el contenido del curso y los posts del foro para el Virtual TA")]
#[command(version)]
struct Cli {
    /// Primer día (inclusive) de los posts del foro
    #[arg(long, default_value = "2025-01-01")]
    start_date: NaiveDate,
    /// Último día (inclusive) de los posts del foro
    #[arg(long, default_value = "2025-04-14")]
    end_date: NaiveDate,
    /// Directorio donde se escriben los ficheros JSON
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,
    /// Sólo el sitio del curso
    #[arg(long, conflicts_with = "forum_only")]
    course_only: bool,
    /// Sólo el foro
    #[arg(long)]
    forum_only: bool,
    /// Pedir por terminal lo que falte en lugar de omitirlo
    #[arg(long)]
    interactive: bool,
    /// Máximo de temas del foro a recorrer
    #[arg(long, default_value_t = 50)]
    max_topics: usize,
    /// Máximo de páginas del curso a descargar
    #[arg(long, default_value_t = 40)]
    max_pages: usize,
    /// Pausa entre peticiones al mismo sitio, en milisegundos
    #[arg(long, default_value_t = 500)]
    rate_limit_ms: u64,
    #[arg(long, env = "COURSE_BASE_URL", default_value = "https://tds.s-anand.net/2025-01/")]
    course_base_url: Url,
    #[arg(long, env = "COURSE_SESSION_COOKIE", hide_env_values = true)]
    course_cookie: Option<String>,
    #[arg(
        long,
        env = "DISCOURSE_BASE_URL",
        default_value = "https://discourse.onlinedegree.iitm.ac.in/"
    )]
    forum_base_url: Url,
    #[arg(long, env = "DISCOURSE_CATEGORY", default_value = "c/courses/tds-kb/34")]
    forum_category: String,
    #[arg(long, env = "DISCOURSE_USERNAME")]
    username: Option<String>,
    #[arg(long, env = "DISCOURSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Cli {
    fn targets(&self) -> Targets {
        Targets {
            course: !self.forum_only,
            forum: !self.course_only,
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.trim().is_empty() && !password.is_empty() => {
                Some(Credentials {
                    username: username.trim().to_string(),
                    password: password.to_string(),
                })
            }
            _ => None,
        }
    }

    fn settings(&self) -> Result<ScrapeSettings, virtual_ta_webapp::error::ScrapeError> {
        Ok(ScrapeSettings {
            course_base_url: self.course_base_url.clone(),
            course_cookie: self.course_cookie.clone(),
            max_pages: self.max_pages,
            forum_base_url: self.forum_base_url.clone(),
            forum_category: self.forum_category.clone(),
            credentials: self.credentials(),
            max_topics: self.max_topics,
            range: DateRange::new(self.start_date, self.end_date)?,
            http: HttpSettings {
                rate_limit: Duration::from_millis(self.rate_limit_ms),
                ..HttpSettings::default()
            },
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ Parámetros inválidos: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let prompter: Box<dyn Prompter> = if cli.interactive {
        Box::new(DialoguerPrompter)
    } else {
        Box::new(AutomatedPrompter)
    };

    info!(
        "🚀 Scraping del {} al {} hacia {}",
        settings.range.start,
        settings.range.end,
        cli.output_dir.display()
    );
    let paths = OutputPaths::in_dir(&cli.output_dir);
    let report = crawler::run(&settings, cli.targets(), &paths, prompter.as_ref()).await;

    if report.all_succeeded() {
        info!("🏁 Scraping terminado.");
        ExitCode::SUCCESS
    } else {
        error!("🏁 Scraping terminado con errores.");
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("scrape").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_cover_the_course_window() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(cli.end_date, NaiveDate::from_ymd_opt(2025, 4, 14).unwrap());
        assert_eq!(cli.output_dir, PathBuf::from("data"));
        assert_eq!(cli.targets(), Targets { course: true, forum: true });
    }

    #[test]
    fn site_selection_flags() {
        assert_eq!(parse(&["--course-only"]).unwrap().targets(), Targets { course: true, forum: false });
        assert_eq!(parse(&["--forum-only"]).unwrap().targets(), Targets { course: false, forum: true });
        assert!(parse(&["--course-only", "--forum-only"]).is_err());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse(&["--start-date", "01/02/2025"]).is_err());
    }

    #[test]
    fn inverted_dates_fail_when_building_settings() {
        let cli = parse(&["--start-date", "2025-05-01", "--end-date", "2025-04-01"]).unwrap();
        assert!(cli.settings().is_err());
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let cli = parse(&["--username", "  ", "--password", "secret"]).unwrap();
        assert!(cli.credentials().is_none());
    }
}
