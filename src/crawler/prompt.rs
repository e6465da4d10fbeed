//! Entrada del operador cuando falta algo (credenciales, campos vacíos).
//!
//! En modo automático nunca se bloquea: lo que falta se omite con un aviso.

use dialoguer::{theme::ColorfulTheme, Input, Password};
use tracing::warn;

use super::Credentials;
use crate::error::ScrapeError;

pub trait Prompter: Send + Sync {
    fn credentials(&self, site: &'static str) -> Result<Credentials, ScrapeError>;

    /// Valor para un campo que no se pudo extraer de `url`. `None` = omitir.
    fn fill_field(&self, field: &str, url: &str) -> Result<Option<String>, ScrapeError>;
}

/// Modo no interactivo.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutomatedPrompter;

impl Prompter for AutomatedPrompter {
    fn credentials(&self, site: &'static str) -> Result<Credentials, ScrapeError> {
        Err(ScrapeError::MissingCredentials(site))
    }

    fn fill_field(&self, field: &str, url: &str) -> Result<Option<String>, ScrapeError> {
        warn!("Falta '{}' en {}; se omite el elemento.", field, url);
        Ok(None)
    }
}

/// Pregunta por terminal con dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn credentials(&self, site: &'static str) -> Result<Credentials, ScrapeError> {
        let theme = ColorfulTheme::default();
        let username: String = Input::with_theme(&theme)
            .with_prompt(format!("Usuario de {site}"))
            .interact_text()?;
        let password = Password::with_theme(&theme)
            .with_prompt(format!("Contraseña de {site}"))
            .interact()?;

        if username.trim().is_empty() || password.is_empty() {
            return Err(ScrapeError::MissingCredentials(site));
        }
        Ok(Credentials {
            username: username.trim().to_string(),
            password,
        })
    }

    fn fill_field(&self, field: &str, url: &str) -> Result<Option<String>, ScrapeError> {
        let value: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("No se encontró '{field}' en {url}. Escríbelo (vacío para omitir)"))
            .allow_empty(true)
            .interact_text()?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}
