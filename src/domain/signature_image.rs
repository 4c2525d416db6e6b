//! Signature images carried as PNG data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::ValidationError;

/// Prefix of every accepted signature data URL
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A validated signature image.
///
/// Holds the submitted data URL (what gets persisted) alongside the decoded
/// PNG bytes and dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureImage {
    data_url: String,
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl SignatureImage {
    /// Parse and validate a `data:image/png;base64,...` URL.
    pub fn from_data_url(field: &str, data_url: &str) -> Result<Self, ValidationError> {
        let data_url = data_url.trim();
        let payload = data_url.strip_prefix(PNG_DATA_URL_PREFIX).ok_or_else(|| {
            ValidationError::signature(field, "assinatura deve ser uma imagem PNG (data URL)")
        })?;

        let png = STANDARD
            .decode(payload)
            .map_err(|e| ValidationError::signature(field, format!("assinatura com base64 inválido: {e}")))?;

        Self::from_png(field, png)
    }

    /// Wrap raw PNG bytes, validating the header.
    pub fn from_png(field: &str, png: Vec<u8>) -> Result<Self, ValidationError> {
        let (width, height) = png_dimensions(&png)
            .map_err(|e| ValidationError::signature(field, format!("assinatura não é um PNG válido: {e}")))?;

        if width == 0 || height == 0 {
            return Err(ValidationError::signature(field, "assinatura sem dimensões"));
        }

        let data_url = format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&png));
        Ok(Self {
            data_url,
            png,
            width,
            height,
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32), png::DecodingError> {
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let reader = decoder.read_info()?;
    let info = reader.info();
    Ok((info.width, info.height))
}

impl fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.png.len())
            .finish()
    }
}

impl Serialize for SignatureImage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.data_url)
    }
}

impl<'de> Deserialize<'de> for SignatureImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The enclosing field is unknown here; report only the reason.
        let s = String::deserialize(deserializer)?;
        SignatureImage::from_data_url("", &s).map_err(|e| serde::de::Error::custom(e.message))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::tiny_png;
    use super::*;
    use crate::domain::ValidationErrorKind;

    #[test]
    fn test_data_url_round_trip() {
        let png = tiny_png(4, 3);
        let url = format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&png));

        let image = SignatureImage::from_data_url("assinatura", &url).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 3);
        assert_eq!(image.data_url(), url);
        assert_eq!(image.png_bytes(), png.as_slice());
    }

    #[test]
    fn test_rejects_non_png_mime() {
        let err = SignatureImage::from_data_url("assinatura", "data:image/jpeg;base64,AAAA")
            .unwrap_err();
        assert_eq!(err.field, "assinatura");
    }

    #[test]
    fn test_rejects_bad_base64() {
        let err = SignatureImage::from_data_url("assinaturaAgente", "data:image/png;base64,@@@")
            .unwrap_err();
        assert_eq!(err.field, "assinaturaAgente");
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let url = format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(b"not a png"));
        assert!(SignatureImage::from_data_url("assinatura", &url).is_err());
    }

    #[test]
    fn test_errors_carry_signature_kind() {
        let err = SignatureImage::from_data_url("assinaturaAgente", "data:image/gif;base64,AAAA")
            .unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Signature);
    }

    #[test]
    fn test_deserialize_error_names_no_field() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            #[serde(rename = "assinaturaAgente")]
            _agent: SignatureImage,
        }

        let err = serde_json::from_value::<Wrapper>(serde_json::json!({
            "assinaturaAgente": "data:image/jpeg;base64,AAAA"
        }))
        .unwrap_err()
        .to_string();
        assert!(!err.contains("assinatura:"), "{err}");
        assert!(err.contains("PNG"), "{err}");
    }

    #[test]
    fn test_serializes_as_data_url() {
        let image = SignatureImage::from_png("assinatura", tiny_png(2, 2)).unwrap();
        let json = serde_json::to_value(&image).unwrap();
        assert!(json.as_str().unwrap().starts_with(PNG_DATA_URL_PREFIX));
    }
}
