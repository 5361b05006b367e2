//! Image sources: `data:` URIs, EMF detection and image intake.

use core::fmt;
use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ecow::{EcoString, eco_format};

/// The largest image accepted by [`load_image`], in bytes.
pub const MAX_IMAGE_BYTES: u64 = 1024 * 1024;

/// An image that cannot be used as a block source.
#[derive(Debug)]
pub enum MediaError {
    /// The file could not be read.
    Io(io::Error),
    /// EMF images cannot be shown by browsers.
    Emf,
    /// The file is not a recognized image.
    NotAnImage,
    /// The file exceeds [`MAX_IMAGE_BYTES`].
    TooLarge {
        /// The file size in bytes.
        size: u64,
    },
    /// A `data:` URI that does not follow `data:<mime>[;base64],<payload>`.
    MalformedDataUri(EcoString),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Io(err) => write!(f, "cannot read image: {err}"),
            MediaError::Emf => write!(f, "EMF images are not supported, convert it to PNG or JPG"),
            MediaError::NotAnImage => write!(f, "only image files are accepted"),
            MediaError::TooLarge { size } => write!(
                f,
                "image is {size} bytes, the limit is {MAX_IMAGE_BYTES} bytes"
            ),
            MediaError::MalformedDataUri(reason) => write!(f, "malformed data URI: {reason}"),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MediaError {
    fn from(err: io::Error) -> Self {
        MediaError::Io(err)
    }
}

/// Whether an image source points at an EMF image.
pub fn is_emf(src: &str) -> bool {
    let src = src.trim().to_ascii_lowercase();
    src.starts_with("data:image/x-emf")
        || src.starts_with("data:image/emf")
        || src.ends_with(".emf")
}

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// The media type, `text/plain` when omitted.
    pub mime: EcoString,
    /// The decoded payload.
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parses a `data:` URI. Only base64 payloads are decoded, other payloads
    /// are taken verbatim.
    pub fn parse(src: &str) -> Result<Self, MediaError> {
        let malformed = |reason: &str| MediaError::MalformedDataUri(reason.into());

        let rest = src
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| malformed("missing data: scheme"))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| malformed("missing payload separator"))?;

        let (mime, is_base64) = match meta.strip_suffix(";base64") {
            Some(mime) => (mime, true),
            None => (meta, false),
        };
        let mime = mime.split(';').next().unwrap_or_default().trim();
        let mime = if mime.is_empty() { "text/plain" } else { mime };

        let data = if is_base64 {
            STANDARD
                .decode(payload.trim())
                .map_err(|err| MediaError::MalformedDataUri(eco_format!("{err}")))?
        } else {
            payload.as_bytes().to_vec()
        };

        Ok(Self {
            mime: mime.to_ascii_lowercase().into(),
            data,
        })
    }

    /// Encodes bytes as a base64 `data:` URI.
    pub fn encode(mime: &str, data: &[u8]) -> EcoString {
        eco_format!("data:{mime};base64,{}", STANDARD.encode(data))
    }

    /// The file extension for the payload.
    pub fn extension(&self) -> &str {
        mime_to_ext(&self.mime)
    }
}

/// Maps a media type to a file extension.
pub fn mime_to_ext(mime: &str) -> &str {
    match mime {
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/rtf" | "text/rtf" => "rtf",
        "text/plain" => "txt",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "image/svg+xml" => "svg",
        _ => mime.rsplit('/').next().unwrap_or(mime),
    }
}

/// Reads an image file into a `data:` URI source.
///
/// EMF images, non-images and files above [`MAX_IMAGE_BYTES`] are rejected.
pub fn load_image(path: &Path) -> Result<EcoString, MediaError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if extension.as_deref() == Some("emf") {
        return Err(MediaError::Emf);
    }

    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge { size });
    }

    let data = std::fs::read(path)?;
    if has_emf_signature(&data) {
        return Err(MediaError::Emf);
    }

    let mime = sniff_mime(&data, extension.as_deref()).ok_or(MediaError::NotAnImage)?;
    log::debug!("loaded {} as {mime} ({size} bytes)", path.display());
    Ok(DataUri::encode(mime, &data))
}

fn sniff_mime(data: &[u8], extension: Option<&str>) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        return Some(format.to_mime_type());
    }

    match extension? {
        "svg" => Some("image/svg+xml"),
        ext => image::ImageFormat::from_extension(ext).map(|format| format.to_mime_type()),
    }
}

/// EMF files start with an `EMR_HEADER` record whose signature is ` EMF` at
/// offset 40.
fn has_emf_signature(data: &[u8]) -> bool {
    data.len() >= 44 && data[..4] == [1, 0, 0, 0] && &data[40..44] == b" EMF"
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn detect_emf_sources() {
        assert!(is_emf("data:image/x-emf;base64,AAAA"));
        assert!(is_emf("data:image/emf;base64,AAAA"));
        assert!(is_emf("https://cdn.example/logo.EMF"));
        assert!(!is_emf("data:image/png;base64,AAAA"));
        assert!(!is_emf("logo.emf.png"));
    }

    #[test]
    fn parse_data_uris() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime, "image/png");
        assert_eq!(uri.data, b"hello");
        assert_eq!(uri.extension(), "png");

        let uri = DataUri::parse("data:,plain").unwrap();
        assert_eq!(uri.mime, "text/plain");
        assert_eq!(uri.extension(), "txt");

        assert!(DataUri::parse("data:image/png;base64,@@@").is_err());
        assert!(DataUri::parse("image/png;base64,aGVsbG8=").is_err());
        assert!(DataUri::parse("data:image/png;base64").is_err());
    }

    #[test]
    fn extensions_from_mime() {
        assert_eq!(mime_to_ext("application/pdf"), "pdf");
        assert_eq!(
            mime_to_ext("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            "docx"
        );
        assert_eq!(mime_to_ext("image/webp"), "webp");
        assert_eq!(mime_to_ext("image/jpeg"), "jpeg");
        assert_eq!(mime_to_ext("image/svg+xml"), "svg");
        assert_eq!(mime_to_ext("application/zip"), "zip");
        assert_eq!(mime_to_ext("weird"), "weird");
    }

    #[test]
    fn load_png() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(PNG_HEADER).unwrap();

        let src = load_image(file.path()).unwrap();
        assert!(src.starts_with("data:image/png;base64,"));
        assert_eq!(DataUri::parse(&src).unwrap().data, PNG_HEADER);
    }

    #[test]
    fn reject_bad_images() {
        let mut emf = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        let mut header = vec![0u8; 44];
        header[0] = 1;
        header[40..44].copy_from_slice(b" EMF");
        emf.write_all(&header).unwrap();
        assert!(matches!(load_image(emf.path()), Err(MediaError::Emf)));

        let named = tempfile::Builder::new().suffix(".emf").tempfile().unwrap();
        assert!(matches!(load_image(named.path()), Err(MediaError::Emf)));

        let mut text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        text.write_all(b"not an image").unwrap();
        assert!(matches!(load_image(text.path()), Err(MediaError::NotAnImage)));

        let big = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        big.as_file().set_len(MAX_IMAGE_BYTES + 1).unwrap();
        assert!(matches!(
            load_image(big.path()),
            Err(MediaError::TooLarge { size }) if size == MAX_IMAGE_BYTES + 1
        ));
    }
}
