use std::io::Cursor;

use chrono::NaiveDate;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

use crate::entities::ticket;

/// Pixel size of one QR module
const MODULE_PX: u32 = 10;
/// Quiet zone width in modules
const QUIET_ZONE: u32 = 4;

const TICKET_ID_PREFIX: &str = "Ticket ID:";

#[derive(Debug, Error)]
pub enum QrError {
    #[error("No QR code found in the image")]
    NoCodeFound,

    #[error("Could not extract ticket information from QR code")]
    MalformedPayload,

    #[error("Unreadable image: {0}")]
    UnreadableImage(#[from] image::ImageError),

    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// The text block printed into every ticket's QR code
#[derive(Debug, Clone, PartialEq)]
pub struct TicketPayload {
    pub ticket_id: i32,
    pub from: String,
    pub to: String,
    pub fare: f64,
    pub date: NaiveDate,
}

impl TicketPayload {
    pub fn to_text(&self) -> String {
        format!(
            "{} {}\nFrom: {}\nTo: {}\nFare: ${:.2}\nDate: {}",
            TICKET_ID_PREFIX,
            self.ticket_id,
            self.from,
            self.to,
            self.fare,
            self.date.format("%Y-%m-%d")
        )
    }
}

impl From<&ticket::Model> for TicketPayload {
    fn from(t: &ticket::Model) -> Self {
        Self {
            ticket_id: t.id,
            from: t.from_location.clone(),
            to: t.to_location.clone(),
            fare: t.fare,
            date: t.ticket_date,
        }
    }
}

/// Render the payload as a black-on-white PNG
pub fn encode_png(payload: &TicketPayload) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(payload.to_text().as_bytes(), EcLevel::L)
        .map_err(|e| QrError::Encode(e.to_string()))?;

    let width = code.width() as u32;
    let colors = code.to_colors();
    let side = (width + 2 * QUIET_ZONE) * MODULE_PX;

    let img = GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / MODULE_PX, y / MODULE_PX);
        let inside = (QUIET_ZONE..QUIET_ZONE + width).contains(&mx)
            && (QUIET_ZONE..QUIET_ZONE + width).contains(&my);

        if inside {
            let idx = ((my - QUIET_ZONE) * width + (mx - QUIET_ZONE)) as usize;
            if colors[idx] == Color::Dark {
                return Luma([0u8]);
            }
        }
        Luma([255u8])
    });

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| QrError::Encode(e.to_string()))?;

    Ok(buf)
}

/// Extract the text of the first readable QR code in an image
pub fn decode_text(image_bytes: &[u8]) -> Result<String, QrError> {
    let img = image::load_from_memory(image_bytes)?.to_luma8();

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32)[0],
    );

    prepared
        .detect_grids()
        .into_iter()
        .find_map(|grid| grid.decode().ok())
        .map(|(_, content)| content)
        .ok_or(QrError::NoCodeFound)
}

/// Pull the ticket id out of a decoded payload
pub fn parse_ticket_id(text: &str) -> Result<i32, QrError> {
    text.lines()
        .find_map(|line| line.strip_prefix(TICKET_ID_PREFIX))
        .and_then(|rest| rest.trim().parse().ok())
        .ok_or(QrError::MalformedPayload)
}

pub fn decode_ticket_id(image_bytes: &[u8]) -> Result<i32, QrError> {
    parse_ticket_id(&decode_text(image_bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TicketPayload {
        TicketPayload {
            ticket_id: 42,
            from: "City A".to_string(),
            to: "City B".to_string(),
            fare: 50.0,
            date: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
        }
    }

    #[test]
    fn test_payload_text_layout() {
        assert_eq!(
            payload().to_text(),
            "Ticket ID: 42\nFrom: City A\nTo: City B\nFare: $50.00\nDate: 2024-11-04"
        );
    }

    #[test]
    fn test_encoded_png_decodes_back_to_payload() {
        let png = encode_png(&payload()).unwrap();
        let text = decode_text(&png).unwrap();

        assert_eq!(text, payload().to_text());
        assert_eq!(decode_ticket_id(&png).unwrap(), 42);
    }

    #[test]
    fn test_blank_image_has_no_code() {
        let blank = GrayImage::from_pixel(200, 200, Luma([255u8]));
        let mut buf = Vec::new();
        blank
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();

        assert!(matches!(decode_text(&buf), Err(QrError::NoCodeFound)));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        assert!(matches!(
            decode_text(b"not an image"),
            Err(QrError::UnreadableImage(_))
        ));
    }

    #[test]
    fn test_parse_ticket_id() {
        assert_eq!(parse_ticket_id("From: X\nTicket ID: 7\n").unwrap(), 7);
        assert!(matches!(
            parse_ticket_id("From: X\nTo: Y"),
            Err(QrError::MalformedPayload)
        ));
        assert!(matches!(
            parse_ticket_id("Ticket ID: seven"),
            Err(QrError::MalformedPayload)
        ));
    }
}
