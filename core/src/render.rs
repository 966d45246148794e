//! Certificate export: rasterize the layout, place it on one page,
//! hand the document to a sink.
//!
//! The raster and document machinery are black boxes behind
//! RenderSurface and DocumentSink. This module only decides what goes
//! where and when the export is a no-op.

use crate::{
    certificate::Certificate,
    config::CertificateConfig,
    error::{BadgeError, BadgeResult},
    layout::CertificateLayout,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Standard page formats, sized in PostScript points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    A4Landscape,
    A4Portrait,
    LetterLandscape,
}

impl PageFormat {
    /// (width, height) in pt.
    pub fn size_pt(self) -> (f64, f64) {
        match self {
            PageFormat::A4Landscape => (841.89, 595.28),
            PageFormat::A4Portrait => (595.28, 841.89),
            PageFormat::LetterLandscape => (792.0, 612.0),
        }
    }
}

/// A rasterized layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Where the image lands on the page, in pt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Centre `width × height` on the page, uniformly scaled to fit.
pub fn fit_to_page(width: u32, height: u32, page: PageFormat) -> Placement {
    let (pw, ph) = page.size_pt();
    if width == 0 || height == 0 {
        return Placement { x: pw / 2.0, y: ph / 2.0, width: 0.0, height: 0.0 };
    }
    let ratio = (pw / width as f64).min(ph / height as f64);
    let w = width as f64 * ratio;
    let h = height as f64 * ratio;
    Placement { x: (pw - w) / 2.0, y: (ph - h) / 2.0, width: w, height: h }
}

/// Single-page document ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDocument {
    pub filename: String,
    pub certificate_id: String,
    pub page: PageFormat,
    pub placement: Placement,
    pub image: Raster,
}

/// Summary returned to the caller after a successful export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedDocument {
    pub filename: String,
    pub certificate_id: String,
    pub placement: Placement,
}

/// The mounted visual surface that turns a layout into pixels.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// False until the view has mounted the certificate preview.
    fn is_mounted(&self) -> bool;

    /// `Err(RenderTargetUnavailable)` if the surface went away mid-call.
    async fn rasterize(&self, layout: &CertificateLayout, scale: u32) -> BadgeResult<Raster>;
}

/// Receives the finished document (download, file write, ...).
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn save(&self, doc: &CertificateDocument) -> BadgeResult<()>;
}

pub struct CertificateExporter {
    config: CertificateConfig,
    surface: Option<Arc<dyn RenderSurface>>,
    sink: Arc<dyn DocumentSink>,
}

impl CertificateExporter {
    pub fn new(config: CertificateConfig, sink: Arc<dyn DocumentSink>) -> Self {
        Self { config, surface: None, sink }
    }

    pub fn config(&self) -> &CertificateConfig {
        &self.config
    }

    pub fn attach_surface(&mut self, surface: Arc<dyn RenderSurface>) {
        self.surface = Some(surface);
    }

    pub fn detach_surface(&mut self) {
        self.surface = None;
    }

    pub fn layout(&self, cert: &Certificate) -> CertificateLayout {
        CertificateLayout::build(cert, &self.config)
    }

    /// Render and save one document.
    ///
    /// `Ok(None)` when no surface is mounted: the caller asked too early,
    /// which is not an error. Sink and raster failures do propagate.
    pub async fn export(&self, cert: &Certificate) -> BadgeResult<Option<ExportedDocument>> {
        let surface = match &self.surface {
            Some(s) if s.is_mounted() => s.clone(),
            _ => {
                log::warn!("certificate {} requested before surface mounted", cert.certificate_id);
                return Ok(None);
            }
        };

        let layout = self.layout(cert);
        let image = match surface.rasterize(&layout, self.config.raster_scale.max(1)).await {
            Ok(img) => img,
            Err(BadgeError::RenderTargetUnavailable) => {
                log::warn!("certificate {}: surface unmounted during render", cert.certificate_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let page = self.config.page_format;
        let placement = fit_to_page(image.width, image.height, page);
        let doc = CertificateDocument {
            filename: cert.filename(),
            certificate_id: cert.certificate_id.clone(),
            page,
            placement,
            image,
        };
        self.sink.save(&doc).await?;
        log::info!("exported {} as {}", doc.certificate_id, doc.filename);

        Ok(Some(ExportedDocument {
            filename: doc.filename,
            certificate_id: doc.certificate_id,
            placement,
        }))
    }
}
