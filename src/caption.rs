//! Capacidad opcional de descripción de imágenes adjuntas a la pregunta.
//!
//! Es una mejora "best effort": si no hay captioner, o no reconoce la
//! imagen, la pregunta se procesa igual sin ella.

use std::sync::Arc;

use imagesize::ImageType;

use crate::config::CaptionerKind;

pub trait ImageCaptioner: Send + Sync {
    /// Devuelve una descripción corta, o `None` si no sabe describirla.
    fn caption(&self, image: &[u8]) -> Option<String>;
}

/// Implementación por defecto: nunca describe nada.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCaptioner;

impl ImageCaptioner for NoCaptioner {
    fn caption(&self, _image: &[u8]) -> Option<String> {
        None
    }
}

/// Describe formato y orientación leyendo sólo la cabecera de la imagen
/// (PNG, GIF, JPEG, WebP o BMP). Las capturas apaisadas suelen ser interfaces o
/// dashboards; las verticales, documentos o chats.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutCaptioner;

impl ImageCaptioner for LayoutCaptioner {
    fn caption(&self, image: &[u8]) -> Option<String> {
        let (format, width, height) = sniff_dimensions(image)?;
        let layout = if width as f64 > height as f64 * 1.5 {
            " wide layout possibly interface dashboard"
        } else if height as f64 > width as f64 * 1.5 {
            " tall layout possibly document chat"
        } else {
            ""
        };
        Some(format!("{format} screenshot {width}x{height}{layout}"))
    }
}

/// Construye el captioner elegido en la configuración.
pub fn captioner_for(kind: CaptionerKind) -> Arc<dyn ImageCaptioner> {
    match kind {
        CaptionerKind::None => Arc::new(NoCaptioner),
        CaptionerKind::Layout => Arc::new(LayoutCaptioner),
    }
}

/// Formato y dimensiones leídos de la cabecera con `imagesize`.
fn sniff_dimensions(bytes: &[u8]) -> Option<(&'static str, usize, usize)> {
    let format = match imagesize::image_type(bytes).ok()? {
        ImageType::Png => "png",
        ImageType::Gif => "gif",
        ImageType::Jpeg => "jpeg",
        ImageType::Webp => "webp",
        ImageType::Bmp => "bmp",
        _ => return None,
    };
    let size = imagesize::blob_size(bytes).ok()?;
    if size.width == 0 || size.height == 0 {
        return None;
    }
    Some((format, size.width, size.height))
}
