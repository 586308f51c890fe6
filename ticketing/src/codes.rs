//! Ticket codes: minting, QR rendering and decoding.
//!
//! A code's identity is its content string: `tkt_` followed by 128 random
//! bits in URL-safe base64. The PNG is a derived artifact rendered at a fixed
//! module size, so the same content always renders to the same bytes under
//! the same configuration.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use rand::RngCore;
use rand::rngs::OsRng;
use seatbook_core::error::BookingError;
use seatbook_core::types::{CodeContent, TicketCode};
use std::io::Cursor;
use thiserror::Error;

/// Prefix of every minted code.
pub const CODE_PREFIX: &str = "tkt_";

/// Errors from rendering or decoding ticket codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The content could not be turned into an image.
    #[error("Failed to render code: {0}")]
    Rendering(String),

    /// The bytes are not a readable image.
    #[error("Failed to decode code image: {0}")]
    Decoding(String),
}

impl From<CodeError> for BookingError {
    fn from(error: CodeError) -> Self {
        match error {
            CodeError::Rendering(msg) => Self::RenderingFailure(msg),
            CodeError::Decoding(_) => Self::Undecodable,
        }
    }
}

/// Mints one ticket code per call.
///
/// Implementations must be pure apart from randomness: no shared state, no
/// I/O. The engine calls [`CodeGenerator::generate`] once per seat before the
/// commit, so a failure here aborts the whole reservation.
pub trait CodeGenerator: Send + Sync {
    /// Mint a new code and render it.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Rendering`] if the image cannot be produced.
    fn generate(&self) -> Result<TicketCode, CodeError>;
}

/// QR code generator backed by `qrcode` and `image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrCodeGenerator {
    module_size: u32,
    quiet_zone: bool,
}

impl Default for QrCodeGenerator {
    fn default() -> Self {
        Self::new(8, true)
    }
}

impl QrCodeGenerator {
    /// Create a generator rendering `module_size` pixels per QR module.
    ///
    /// A zero module size is raised to one.
    #[must_use]
    pub const fn new(module_size: u32, quiet_zone: bool) -> Self {
        let module_size = if module_size == 0 { 1 } else { module_size };
        Self {
            module_size,
            quiet_zone,
        }
    }

    /// Render `content` as a greyscale PNG.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Rendering`] if the content does not fit a QR code
    /// or PNG encoding fails.
    pub fn render(&self, content: &CodeContent) -> Result<Vec<u8>, CodeError> {
        let code = QrCode::new(content.as_str().as_bytes())
            .map_err(|e| CodeError::Rendering(e.to_string()))?;

        let pixels = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_size, self.module_size)
            .quiet_zone(self.quiet_zone)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(pixels)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CodeError::Rendering(e.to_string()))?;
        Ok(png)
    }
}

impl CodeGenerator for QrCodeGenerator {
    fn generate(&self) -> Result<TicketCode, CodeError> {
        let content = mint_content();
        let rendered_image = self.render(&content)?;
        Ok(TicketCode {
            content,
            rendered_image,
        })
    }
}

/// Mint fresh code content from the operating system's CSPRNG.
#[must_use]
pub fn mint_content() -> CodeContent {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    CodeContent::new(format!("{CODE_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
}

/// Recover the content embedded in a QR image.
///
/// Returns `Ok(None)` when the bytes are an image but hold no readable code.
///
/// # Errors
///
/// Returns [`CodeError::Decoding`] if the bytes are not a supported image.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_image(bytes: &[u8]) -> Result<Option<String>, CodeError> {
    let luma = image::load_from_memory(bytes)
        .map_err(|e| CodeError::Decoding(e.to_string()))?
        .to_luma8();

    let (width, height) = luma.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| luma.get_pixel(x as u32, y as u32).0[0],
    );

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_, content)) => return Ok(Some(content)),
            Err(e) => tracing::debug!(error = ?e, "QR grid detected but not decodable"),
        }
    }
    Ok(None)
}
