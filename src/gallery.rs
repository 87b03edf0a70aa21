//! Gallery entry assembly: sexagesimal coordinates, the front-matter record,
//! artifact file names and the thumbnail.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use tracing::{debug, info};

use crate::error::NovaFetchError;
use crate::nova::{CalibrationRecord, ImageKind};

/// Extension of every image the gallery stores.
pub const IMAGE_EXTENSION: &str = "jpg";
pub const THUMBNAIL_FILE: &str = "thumb.jpg";

const DEG_PER_HOUR: f64 = 15.0;
const DEG_PER_MINUTE: f64 = DEG_PER_HOUR / 60.0;
const DEG_PER_SECOND: f64 = DEG_PER_MINUTE / 60.0;
const DEG_PER_DECISECOND: f64 = DEG_PER_SECOND / 10.0;

/// Right ascension split into truncated hours, minutes, seconds and tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RightAscension {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub deciseconds: u32,
}

impl RightAscension {
    /// Each component is truncated, never rounded. Negative or non-finite
    /// input yields zero.
    pub fn from_degrees(degrees: f64) -> Self {
        let mut rest = if degrees.is_finite() { degrees.max(0.0) } else { 0.0 };
        Self {
            hours: take_whole(&mut rest, DEG_PER_HOUR),
            minutes: take_whole(&mut rest, DEG_PER_MINUTE),
            seconds: take_whole(&mut rest, DEG_PER_SECOND),
            deciseconds: take_whole(&mut rest, DEG_PER_DECISECOND),
        }
    }
}

impl fmt::Display for RightAscension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}h {}m {}.{}s",
            self.hours, self.minutes, self.seconds, self.deciseconds
        )
    }
}

// Removes as many whole `unit`s from `rest` as fit and returns the count.
fn take_whole(rest: &mut f64, unit: f64) -> u32 {
    let count = (*rest / unit).floor();
    *rest = (*rest - count * unit).max(0.0);
    count as u32
}

/// Declination as sign, whole degrees, whole arcminutes and arcseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Declination {
    pub negative: bool,
    pub degrees: u32,
    pub arcmin: u32,
    /// Rounded to 3 decimals.
    pub arcsec: f64,
}

impl Declination {
    pub fn from_degrees(dec: f64) -> Self {
        let negative = dec < 0.0;
        let dec = if dec.is_finite() { dec.abs() } else { 0.0 };
        let degrees = dec.floor();
        let arcmin = (dec - degrees) * 60.0;
        let whole_arcmin = arcmin.floor();
        Self {
            negative,
            degrees: degrees as u32,
            arcmin: whole_arcmin as u32,
            arcsec: round3((arcmin - whole_arcmin) * 60.0),
        }
    }

    pub fn sign(&self) -> char {
        if self.negative { '-' } else { '+' }
    }
}

impl fmt::Display for Declination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}° {:02}' {}",
            self.sign(),
            self.degrees,
            self.arcmin,
            self.arcsec
        )
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Site-wide fields of every gallery record.
#[derive(Debug, Clone)]
pub struct GalleryStyle {
    pub url_prefix: String,
    pub telescope: String,
    pub focal_length: String,
    pub aperture: String,
    pub thumbnail_width: u32,
}

/// The front-matter metadata written next to the images as `<name>.md`.
#[derive(Debug, Clone)]
pub struct GalleryRecord<'a> {
    pub name: &'a str,
    pub folder: String,
    pub tags: &'a [String],
    /// `None` for a thumbnail-only template.
    pub calibration: Option<&'a CalibrationRecord>,
    pub style: &'a GalleryStyle,
}

impl<'a> GalleryRecord<'a> {
    pub fn new(
        name: &'a str,
        target_dir: &Path,
        tags: &'a [String],
        calibration: Option<&'a CalibrationRecord>,
        style: &'a GalleryStyle,
    ) -> Self {
        Self {
            name,
            folder: folder_name(target_dir),
            tags,
            calibration,
            style,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let tags = self
            .tags
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        let prefix = self.style.url_prefix.trim_end_matches('/');

        let mut lines = vec![
            "---".to_string(),
            format!("title: \"{}\"", self.name),
            "type:".to_string(),
            format!("tags: [{tags}]"),
            "description:".to_string(),
            format!("image: {prefix}/{}/{THUMBNAIL_FILE}", self.name),
            format!("telescope: {}", self.style.telescope),
            format!("length: \"{}\"", self.style.focal_length),
            format!("aperture: \"{}\"", self.style.aperture),
            format!("folder: {}", self.folder),
            "exposure: ".to_string(),
            "lights: ".to_string(),
            "sessions: ".to_string(),
            "firstCapture: ".to_string(),
            "lastCapture:".to_string(),
        ];

        match self.calibration {
            Some(cal) => {
                lines.push(format!("ra: \"{}\"", RightAscension::from_degrees(cal.ra)));
                lines.push(format!("dec: \"{}\"", Declination::from_degrees(cal.dec)));
                // Width and height arrive in arcseconds; the divisor is kept as 60.
                lines.push(format!(
                    "size: \"{} x {} arcmin\"",
                    round3(cal.width_arcsec / 60.0),
                    round3(cal.height_arcsec / 60.0)
                ));
                lines.push(format!("radius: \"{} deg\"", round3(cal.radius)));
                lines.push(format!("scale: \"{} arcsec/pixel\"", round3(cal.pixscale)));
            }
            None => {
                for key in ["ra", "dec", "size", "radius", "scale"] {
                    lines.push(format!("{key}: \"\""));
                }
            }
        }

        lines.push("---".to_string());
        lines
    }

    pub fn render(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }
}

fn folder_name(target_dir: &Path) -> String {
    target_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target_dir.display().to_string())
}

/// Local file for a downloaded rendering, e.g. `m31-annotated.jpg`.
pub fn artifact_path(target_dir: &Path, name: &str, kind: ImageKind) -> PathBuf {
    target_dir.join(format!("{name}{}.{IMAGE_EXTENSION}", kind.file_suffix()))
}

/// Where the source image is copied, e.g. `m31.jpg`.
pub fn original_path(target_dir: &Path, name: &str) -> PathBuf {
    target_dir.join(format!("{name}.{IMAGE_EXTENSION}"))
}

pub fn record_path(target_dir: &Path, name: &str) -> PathBuf {
    target_dir.join(format!("{name}.md"))
}

pub fn thumbnail_path(target_dir: &Path) -> PathBuf {
    target_dir.join(THUMBNAIL_FILE)
}

/// Copy the source image into the gallery folder, overwriting a previous copy.
pub async fn copy_original(
    source: &Path,
    target_dir: &Path,
    name: &str,
) -> Result<PathBuf, NovaFetchError> {
    let dest = original_path(target_dir, name);
    tokio::fs::copy(source, &dest).await?;
    debug!(from = %source.display(), to = %dest.display(), "copied original");
    Ok(dest)
}

/// Scale `source` to `width` pixels wide, keeping the aspect ratio.
///
/// The format is sniffed from the file contents, so a PNG saved under a
/// `.jpg` name still decodes.
pub async fn make_thumbnail(
    source: &Path,
    dest: &Path,
    width: u32,
) -> Result<(), NovaFetchError> {
    let source = source.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), NovaFetchError> {
        let img = ImageReader::open(&source)?.with_guessed_format()?.decode()?;
        let thumb = img.thumbnail(width, u32::MAX);
        // JPEG has no alpha channel.
        DynamicImage::ImageRgb8(thumb.to_rgb8()).save(&dest)?;
        info!(
            path = %dest.display(),
            width = thumb.width(),
            height = thumb.height(),
            "thumbnail written"
        );
        Ok(())
    })
    .await
    .map_err(|e| NovaFetchError::Io(std::io::Error::other(e)))?
}

pub async fn write_record(path: &Path, record: &GalleryRecord<'_>) -> Result<(), NovaFetchError> {
    tokio::fs::write(path, record.render()).await?;
    info!(path = %path.display(), "metadata written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn style() -> GalleryStyle {
        GalleryStyle {
            url_prefix: "/assets/images/gallery".into(),
            telescope: "Stellina".into(),
            focal_length: "400mm".into(),
            aperture: "80mm".into(),
            thumbnail_width: 256,
        }
    }

    #[test]
    fn ra_zero() {
        assert_eq!(RightAscension::from_degrees(0.0).to_string(), "0h 0m 0.0s");
    }

    #[test]
    fn ra_exact_unit_boundaries() {
        assert_eq!(RightAscension::from_degrees(15.0).to_string(), "1h 0m 0.0s");
        assert_eq!(RightAscension::from_degrees(0.25).to_string(), "0h 1m 0.0s");
    }

    #[test]
    fn ra_full_circle_terminates() {
        assert_eq!(RightAscension::from_degrees(360.0).to_string(), "24h 0m 0.0s");
    }

    #[test]
    fn ra_truncates_each_component() {
        // 10.684° = 0h 42m 44.16s
        let ra = RightAscension::from_degrees(10.684);
        assert_eq!(
            ra,
            RightAscension {
                hours: 0,
                minutes: 42,
                seconds: 44,
                deciseconds: 1
            }
        );
        assert_eq!(ra.to_string(), "0h 42m 44.1s");
    }

    #[test]
    fn ra_degenerate_inputs_are_zero() {
        for v in [-10.0, f64::NAN, f64::INFINITY] {
            assert_eq!(RightAscension::from_degrees(v).to_string(), "0h 0m 0.0s");
        }
    }

    #[test]
    fn dec_negative_whole_arcmin() {
        let dec = Declination::from_degrees(-33.75);
        assert_eq!(dec.sign(), '-');
        assert_eq!(dec.degrees, 33);
        assert_eq!(dec.arcmin, 45);
        assert_eq!(dec.arcsec, 0.0);
        assert_eq!(dec.to_string(), "-33° 45' 0");
    }

    #[test]
    fn dec_pads_arcmin_below_ten() {
        let dec = Declination::from_degrees(10.10083);
        assert_eq!(dec.sign(), '+');
        assert_eq!(dec.degrees, 10);
        assert_eq!(dec.arcmin, 6);
        assert!((dec.arcsec - 3.0).abs() < 0.05);
        assert_eq!(dec.arcsec, round3(dec.arcsec));
        assert!(dec.to_string().starts_with("+10° 06' "));
    }

    #[test]
    fn round3_rounds_to_three_decimals() {
        assert_eq!(round3(33.33333), 33.333);
        assert_eq!(round3(0.4166666), 0.417);
    }

    #[test]
    fn artifact_names_follow_suffixes() {
        let dir = Path::new("/g/m31");
        assert_eq!(
            artifact_path(dir, "m31", ImageKind::AnnotatedDisplay),
            PathBuf::from("/g/m31/m31-annotated.jpg")
        );
        assert_eq!(
            artifact_path(dir, "m31", ImageKind::GridDisplay),
            PathBuf::from("/g/m31/m31-grid.jpg")
        );
        assert_eq!(
            artifact_path(dir, "m31", ImageKind::AnnotatedFull),
            PathBuf::from("/g/m31/m31-annotated-fs.jpg")
        );
        assert_eq!(original_path(dir, "m31"), PathBuf::from("/g/m31/m31.jpg"));
        assert_eq!(record_path(dir, "m31"), PathBuf::from("/g/m31/m31.md"));
        assert_eq!(thumbnail_path(dir), PathBuf::from("/g/m31/thumb.jpg"));
    }

    #[test]
    fn record_renders_calibrated_front_matter() {
        let cal = CalibrationRecord {
            ra: 0.0,
            dec: -33.75,
            width_arcsec: 2000.0,
            height_arcsec: 1500.0,
            radius: 0.41666,
            pixscale: 1.04321,
            orientation: 90.0,
        };
        let tags = vec!["M 31".to_string(), "NGC 224".to_string()];
        let style = style();
        let record = GalleryRecord::new("m31", Path::new("/gallery/m31"), &tags, Some(&cal), &style);
        let lines = record.lines();

        assert_eq!(lines.first().map(String::as_str), Some("---"));
        assert_eq!(lines.last().map(String::as_str), Some("---"));
        assert!(lines.contains(&"title: \"m31\"".to_string()));
        assert!(lines.contains(&"tags: [\"M 31\",\"NGC 224\"]".to_string()));
        assert!(lines.contains(&"image: /assets/images/gallery/m31/thumb.jpg".to_string()));
        assert!(lines.contains(&"telescope: Stellina".to_string()));
        assert!(lines.contains(&"length: \"400mm\"".to_string()));
        assert!(lines.contains(&"folder: m31".to_string()));
        assert!(lines.contains(&"ra: \"0h 0m 0.0s\"".to_string()));
        assert!(lines.contains(&"dec: \"-33° 45' 0\"".to_string()));
        assert!(lines.contains(&"size: \"33.333 x 25 arcmin\"".to_string()));
        assert!(lines.contains(&"radius: \"0.417 deg\"".to_string()));
        assert!(lines.contains(&"scale: \"1.043 arcsec/pixel\"".to_string()));
        assert!(record.render().ends_with("---\n"));
    }

    #[test]
    fn template_record_leaves_calibration_blank() {
        let style = style();
        let record = GalleryRecord::new("m42", Path::new("m42"), &[], None, &style);
        let lines = record.lines();
        assert!(lines.contains(&"tags: []".to_string()));
        assert!(lines.contains(&"ra: \"\"".to_string()));
        assert!(lines.contains(&"scale: \"\"".to_string()));
    }

    #[test]
    fn tags_escape_quotes() {
        let style = style();
        let tags = vec!["The \"Eye\"".to_string()];
        let record = GalleryRecord::new("x", Path::new("x"), &tags, None, &style);
        assert!(record.lines().contains(&r#"tags: ["The \"Eye\""]"#.to_string()));
    }

    #[tokio::test]
    async fn thumbnail_keeps_aspect_ratio() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        image::RgbImage::new(512, 256).save(&source).unwrap();

        let dest = thumbnail_path(tmp.path());
        make_thumbnail(&source, &dest, 256).await.unwrap();

        assert_eq!(image::image_dimensions(&dest).unwrap(), (256, 128));
    }

    #[tokio::test]
    async fn thumbnail_of_non_image_fails() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("notes.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        let err = make_thumbnail(&source, &thumbnail_path(tmp.path()), 256)
            .await
            .unwrap_err();
        assert!(matches!(err, NovaFetchError::Image(_)));
    }

    #[tokio::test]
    async fn copy_and_record_land_in_target_dir() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("raw.jpg");
        std::fs::write(&source, b"jpeg").unwrap();
        let target = tmp.path().join("m31");
        std::fs::create_dir(&target).unwrap();

        let copied = copy_original(&source, &target, "m31").await.unwrap();
        assert_eq!(std::fs::read(copied).unwrap(), b"jpeg");

        let style = style();
        let record = GalleryRecord::new("m31", &target, &[], None, &style);
        let path = record_path(&target, "m31");
        write_record(&path, &record).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("folder: m31"));
    }
}
