// src/services/presenter.rs
use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use log::debug;
use serde_json::Value;

use crate::models::*;

pub const EXIF_DISPLAY_LIMIT: usize = 20;

pub const NO_OBJECTS: &str = "No objects detected";
pub const NO_TEXT: &str = "No text extracted";
pub const NO_DESCRIPTION: &str = "No description available";
pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";
pub const NO_IMAGE_ANALYSIS: &str = "No image analysis data available";
pub const NO_METADATA: &str = "No metadata available";
pub const NO_GPS: &str = "No GPS data available";
pub const NO_EXIF: &str = "No EXIF data available";
pub const NO_LOCATION: &str = "No location information could be determined from the image.";
pub const NO_LANDMARKS: &str = "No landmarks identified";
pub const NO_REVERSE_RESULTS: &str = "No reverse search results found. This could indicate the image is unique or not widely distributed online.";
pub const NO_REPORT: &str = "No report available";
pub const FACE_NOT_REQUESTED: &str = "Face recognition analysis was not requested.";
pub const FACE_CONSENT_MISSING: &str =
    "Face recognition analysis was not performed due to missing consent.";
pub const SIMILAR_FACES_WARNING: &str =
    "Similar faces found online. This information is sensitive and should be handled with care.";

/// A result section: either something to show or an explicit placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Available(T),
    NoData(&'static str),
}

impl<T> Section<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available(_))
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Section::Available(value) => Some(value),
            Section::NoData(_) => None,
        }
    }

    fn from_list(items: Vec<T>, empty: &'static str) -> Section<Vec<T>> {
        if items.is_empty() {
            Section::NoData(empty)
        } else {
            Section::Available(items)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationConfidence {
    High,
    Medium,
    Low,
}

impl LocationConfidence {
    pub fn from_score(confidence: f64) -> Self {
        if confidence >= 0.8 {
            LocationConfidence::High
        } else if confidence >= 0.5 {
            LocationConfidence::Medium
        } else {
            LocationConfidence::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LocationConfidence::High => "High",
            LocationConfidence::Medium => "Medium",
            LocationConfidence::Low => "Low",
        }
    }
}

/// Colour bucket for face and emotion confidences. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBucket {
    Strong,
    Moderate,
    Weak,
}

impl ConfidenceBucket {
    pub fn from_score(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceBucket::Strong
        } else if confidence > 0.4 {
            ConfidenceBucket::Moderate
        } else {
            ConfidenceBucket::Weak
        }
    }
}

/// `45.20 seconds` under a minute, else `2m 5s` with half seconds rounded up.
pub fn format_processing_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return UNKNOWN.to_string();
    }
    if seconds < 60.0 {
        return format!("{:.2} seconds", seconds);
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).round() as u64;
    format!("{}m {}s", minutes, remaining)
}

fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.6}, {:.6}", latitude, longitude)
}

fn format_date_taken(raw: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S").ok());

    match parsed {
        Some(dt) => dt.format("%A, %B %-d, %Y %-I:%M %p").to_string(),
        None => raw.to_string(),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn or_unknown(value: &Option<String>) -> String {
    non_blank(value).unwrap_or(UNKNOWN).to_string()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysisView {
    pub objects: Section<Vec<String>>,
    pub text: Section<Vec<String>>,
    pub scene_description: String,
    pub image_quality: String,
    pub faces_count: u32,
    pub faces_caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExifView {
    pub entries: Vec<(String, String)>,
    pub total: usize,
    pub overflow: usize,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataView {
    pub camera_make: String,
    pub camera_model: String,
    pub software: String,
    pub date_taken: String,
    pub dimensions: Option<String>,
    pub format: String,
    pub color_mode: String,
    pub gps: Section<String>,
    pub exif: Section<ExifView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceView {
    pub level: LocationConfidence,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeolocationView {
    pub address: Option<String>,
    pub coordinates: Option<String>,
    pub confidence: Option<ConfidenceView>,
    pub map_url: Option<String>,
    pub landmarks: Section<Vec<String>>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseSearchView {
    pub title: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionView {
    pub emotion: String,
    pub text: String,
    pub bucket: ConfidenceBucket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensitiveFaceView {
    pub age: Option<String>,
    pub gender: Option<String>,
    pub emotions: Vec<EmotionView>,
    pub similar_faces_warning: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceView {
    pub label: String,
    pub confidence: String,
    pub bucket: ConfidenceBucket,
    pub location: String,
    /// Only filled when the caller asked to reveal sensitive detail.
    pub sensitive: Option<SensitiveFaceView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecognitionView {
    pub summary: String,
    pub notes: Vec<String>,
    pub faces: Vec<FaceView>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FaceSection {
    NotRequested,
    ConsentMissing,
    Shown(FaceRecognitionView),
}

impl FaceSection {
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            FaceSection::NotRequested => Some(FACE_NOT_REQUESTED),
            FaceSection::ConsentMissing => Some(FACE_CONSENT_MISSING),
            FaceSection::Shown(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub processing_time: Option<String>,
    pub image_analysis: Section<ImageAnalysisView>,
    pub metadata: Section<MetadataView>,
    pub geolocation: Section<GeolocationView>,
    pub reverse_search: Section<Vec<ReverseSearchView>>,
    pub report: Section<String>,
    pub face_recognition: FaceSection,
    pub privacy_notice: Option<String>,
}

impl ResultView {
    /// Tab titles in display order with whether each has data.
    pub fn tabs(&self) -> [(&'static str, bool); 5] {
        [
            ("Image Analysis", self.image_analysis.is_available()),
            ("Metadata", self.metadata.is_available()),
            ("Geolocation", self.geolocation.is_available()),
            ("Reverse Search", self.reverse_search.is_available()),
            ("Report", self.report.is_available()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentOptions {
    /// A consent record backed the submission that produced the result.
    pub consent_on_record: bool,
    pub reveal_sensitive: bool,
}

/// Turns a raw analysis result into a per-section view model.
#[derive(Debug, Clone, Default)]
pub struct ResultPresenter {
    options: PresentOptions,
}

impl ResultPresenter {
    pub fn new(options: PresentOptions) -> Self {
        Self { options }
    }

    pub fn present(&self, result: &AnalysisResult) -> ResultView {
        ResultView {
            processing_time: result
                .processing_time
                .map(|t| format!("Processed in {}", format_processing_time(t))),
            image_analysis: present_image_analysis(result.image_analysis.as_ref()),
            metadata: present_metadata(result.metadata.as_ref()),
            geolocation: present_geolocation(result.geolocation.as_ref()),
            reverse_search: present_reverse_search(result.reverse_search_results.as_deref()),
            report: match non_blank(&result.report_summary) {
                Some(report) => Section::Available(report.to_string()),
                None => Section::NoData(NO_REPORT),
            },
            face_recognition: self.present_faces(result),
            privacy_notice: result.privacy_compliance.as_ref().map(|p| {
                if p.face_recognition_performed {
                    "Face Recognition: Performed with consent".to_string()
                } else {
                    "Face Recognition: Not performed".to_string()
                }
            }),
        }
    }

    fn present_faces(&self, result: &AnalysisResult) -> FaceSection {
        let Some(faces) = result.face_recognition() else {
            return FaceSection::NotRequested;
        };

        if !result.face_recognition_performed() {
            debug!("Suppressing face data: face recognition not marked as performed");
            return FaceSection::ConsentMissing;
        }
        if !self.options.consent_on_record {
            debug!("Suppressing face data: no consent record for this submission");
            return FaceSection::ConsentMissing;
        }
        if !faces.consent_verified {
            debug!("Suppressing face data: consent not verified by the service");
            return FaceSection::ConsentMissing;
        }

        FaceSection::Shown(FaceRecognitionView {
            summary: format!(
                "{} face(s) detected. Analysis performed with user consent.",
                faces.total_faces
            ),
            notes: faces.processing_notes.clone(),
            faces: faces
                .faces_detected
                .iter()
                .enumerate()
                .map(|(i, face)| self.present_face(i, face))
                .collect(),
        })
    }

    fn present_face(&self, index: usize, face: &Face) -> FaceView {
        let bbox = &face.bounding_box;
        FaceView {
            label: format!("Face {}", index + 1),
            confidence: format!("{:.1}%", face.confidence * 100.0),
            bucket: ConfidenceBucket::from_score(face.confidence),
            location: format!(
                "Top: {}, Left: {}, Width: {}, Height: {}",
                bbox.top,
                bbox.left,
                bbox.width(),
                bbox.height()
            ),
            sensitive: self
                .options
                .reveal_sensitive
                .then(|| present_sensitive(face)),
        }
    }
}

fn present_sensitive(face: &Face) -> SensitiveFaceView {
    let age = face
        .age_estimate
        .as_ref()
        .and_then(|a| a.estimated_age.as_ref())
        .and_then(|age| match age {
            Value::Number(n) => Some(format!("~{} years", n)),
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        });

    let gender = face
        .gender_estimate
        .as_ref()
        .and_then(|g| non_blank(&g.predicted_gender))
        .map(str::to_string);

    let mut emotions: Vec<(&String, f64)> = face
        .emotion_analysis
        .iter()
        .flatten()
        .map(|(name, score)| (name, *score))
        .collect();
    emotions.sort_by(|a, b| b.1.total_cmp(&a.1));

    SensitiveFaceView {
        age,
        gender,
        emotions: emotions
            .into_iter()
            .take(3)
            .map(|(name, score)| EmotionView {
                emotion: name.clone(),
                text: format!("{}: {:.0}%", name, score * 100.0),
                bucket: ConfidenceBucket::from_score(score),
            })
            .collect(),
        similar_faces_warning: face
            .similar_faces_found
            .as_ref()
            .filter(|found| !found.is_empty())
            .map(|_| SIMILAR_FACES_WARNING),
    }
}

fn present_image_analysis(analysis: Option<&ImageAnalysis>) -> Section<ImageAnalysisView> {
    let Some(analysis) = analysis else {
        return Section::NoData(NO_IMAGE_ANALYSIS);
    };

    Section::Available(ImageAnalysisView {
        objects: Section::from_list(analysis.objects_detected.clone(), NO_OBJECTS),
        text: Section::from_list(analysis.text_extracted.clone(), NO_TEXT),
        scene_description: non_blank(&analysis.scene_description)
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        image_quality: or_unknown(&analysis.image_quality),
        faces_count: analysis.faces_count,
        faces_caption: format!("{} face(s)", analysis.faces_count),
    })
}

fn metadata_is_empty(metadata: &ImageMetadata) -> bool {
    non_blank(&metadata.camera_make).is_none()
        && non_blank(&metadata.camera_model).is_none()
        && non_blank(&metadata.software).is_none()
        && non_blank(&metadata.date_taken).is_none()
        && non_blank(&metadata.format).is_none()
        && non_blank(&metadata.mode).is_none()
        && metadata.image_size.is_none()
        && metadata.gps_coordinates.is_none()
        && metadata.exif.is_empty()
}

fn present_exif(exif: &serde_json::Map<String, Value>) -> Section<ExifView> {
    if exif.is_empty() {
        return Section::NoData(NO_EXIF);
    }
    let total = exif.len();
    let overflow = total.saturating_sub(EXIF_DISPLAY_LIMIT);
    Section::Available(ExifView {
        entries: exif
            .iter()
            .take(EXIF_DISPLAY_LIMIT)
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect(),
        total,
        overflow,
        caption: (overflow > 0)
            .then(|| format!("Showing first {} of {} EXIF entries", EXIF_DISPLAY_LIMIT, total)),
    })
}

fn present_metadata(metadata: Option<&ImageMetadata>) -> Section<MetadataView> {
    let Some(metadata) = metadata.filter(|m| !metadata_is_empty(m)) else {
        return Section::NoData(NO_METADATA);
    };

    let gps = match metadata.gps_coordinates {
        Some(Coordinates {
            latitude: Some(lat),
            longitude: Some(lon),
        }) => Section::Available(format_coordinates(lat, lon)),
        _ => Section::NoData(NO_GPS),
    };

    Section::Available(MetadataView {
        camera_make: or_unknown(&metadata.camera_make),
        camera_model: or_unknown(&metadata.camera_model),
        software: or_unknown(&metadata.software),
        date_taken: non_blank(&metadata.date_taken)
            .map(format_date_taken)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        dimensions: metadata
            .image_size
            .map(|size| format!("{} × {} pixels", size.width, size.height)),
        format: or_unknown(&metadata.format),
        color_mode: or_unknown(&metadata.mode),
        gps,
        exif: present_exif(&metadata.exif),
    })
}

fn present_geolocation(geo: Option<&Geolocation>) -> Section<GeolocationView> {
    let Some(geo) = geo.filter(|g| g.latitude.is_some() || non_blank(&g.address).is_some())
    else {
        return Section::NoData(NO_LOCATION);
    };

    let coordinates = match (geo.latitude, geo.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    Section::Available(GeolocationView {
        address: non_blank(&geo.address).map(str::to_string),
        coordinates: coordinates.map(|(lat, lon)| format_coordinates(lat, lon)),
        confidence: geo.confidence.map(|c| {
            let level = LocationConfidence::from_score(c);
            ConfidenceView {
                level,
                text: format!("{} ({:.1}%)", level.label(), c * 100.0),
            }
        }),
        map_url: coordinates.map(|(lat, lon)| {
            format!(
                "https://www.openstreetmap.org/?mlat={}&mlon={}&zoom=15",
                lat, lon
            )
        }),
        landmarks: Section::from_list(geo.landmarks.clone(), NO_LANDMARKS),
        source: geo.source.as_ref().map(|s| {
            match s {
                LocationSource::GpsExif => "GPS EXIF data",
                LocationSource::VisualAnalysis => "Visual analysis",
                LocationSource::Unknown => "Unknown source",
            }
            .to_string()
        }),
    })
}

fn present_reverse_search(hits: Option<&[ReverseSearchHit]>) -> Section<Vec<ReverseSearchView>> {
    let views = hits
        .unwrap_or_default()
        .iter()
        .map(|hit| ReverseSearchView {
            title: non_blank(&hit.title).unwrap_or("Untitled").to_string(),
            url: hit.url.clone(),
            source: hit.source.clone(),
        })
        .collect();
    Section::from_list(views, NO_REVERSE_RESULTS)
}

// ---------------------------------------------------------------------------
// Plain-text rendering
// ---------------------------------------------------------------------------

fn write_list(f: &mut fmt::Formatter<'_>, title: &str, items: &Section<Vec<String>>) -> fmt::Result {
    writeln!(f, "  {}:", title)?;
    match items {
        Section::Available(items) => {
            for item in items {
                writeln!(f, "    - {}", item)?;
            }
            Ok(())
        }
        Section::NoData(msg) => writeln!(f, "    {}", msg),
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis Results")?;
        if let Some(time) = &self.processing_time {
            writeln!(f, "{}", time)?;
        }

        writeln!(f, "\n[Image Analysis]")?;
        match &self.image_analysis {
            Section::Available(a) => {
                write_list(f, "Objects Detected", &a.objects)?;
                write_list(f, "Text Extracted", &a.text)?;
                writeln!(f, "  Scene Description: {}", a.scene_description)?;
                writeln!(f, "  Image Quality: {}", a.image_quality)?;
                writeln!(f, "  Faces Detected: {}", a.faces_caption)?;
            }
            Section::NoData(msg) => writeln!(f, "  {}", msg)?,
        }

        writeln!(f, "\n[Metadata]")?;
        match &self.metadata {
            Section::Available(m) => {
                writeln!(f, "  Make: {}", m.camera_make)?;
                writeln!(f, "  Model: {}", m.camera_model)?;
                writeln!(f, "  Software: {}", m.software)?;
                writeln!(f, "  Date Taken: {}", m.date_taken)?;
                if let Some(dimensions) = &m.dimensions {
                    writeln!(f, "  Dimensions: {}", dimensions)?;
                }
                writeln!(f, "  Format: {}", m.format)?;
                writeln!(f, "  Color Mode: {}", m.color_mode)?;
                match &m.gps {
                    Section::Available(coords) => writeln!(f, "  GPS: {}", coords)?,
                    Section::NoData(msg) => writeln!(f, "  {}", msg)?,
                }
                match &m.exif {
                    Section::Available(exif) => {
                        writeln!(f, "  EXIF:")?;
                        for (key, value) in &exif.entries {
                            writeln!(f, "    {}: {}", key, value)?;
                        }
                        if let Some(caption) = &exif.caption {
                            writeln!(f, "    {}", caption)?;
                        }
                    }
                    Section::NoData(msg) => writeln!(f, "  {}", msg)?,
                }
            }
            Section::NoData(msg) => writeln!(f, "  {}", msg)?,
        }

        writeln!(f, "\n[Geolocation]")?;
        match &self.geolocation {
            Section::Available(g) => {
                if let Some(address) = &g.address {
                    writeln!(f, "  Address/Location: {}", address)?;
                }
                if let Some(coords) = &g.coordinates {
                    writeln!(f, "  Coordinates: {}", coords)?;
                }
                if let Some(confidence) = &g.confidence {
                    writeln!(f, "  Confidence Level: {}", confidence.text)?;
                }
                if let Some(source) = &g.source {
                    writeln!(f, "  Source: {}", source)?;
                }
                if let Some(url) = &g.map_url {
                    writeln!(f, "  Map: {}", url)?;
                }
                write_list(f, "Landmarks", &g.landmarks)?;
            }
            Section::NoData(msg) => writeln!(f, "  {}", msg)?,
        }

        writeln!(f, "\n[Reverse Search]")?;
        match &self.reverse_search {
            Section::Available(hits) => {
                for hit in hits {
                    writeln!(f, "  - {} (Source: {})", hit.title, hit.source)?;
                    writeln!(f, "    {}", hit.url)?;
                }
            }
            Section::NoData(msg) => writeln!(f, "  {}", msg)?,
        }

        writeln!(f, "\n[Report]")?;
        match &self.report {
            Section::Available(report) => writeln!(f, "{}", report)?,
            Section::NoData(msg) => writeln!(f, "  {}", msg)?,
        }

        writeln!(f, "\n[Face Recognition]")?;
        match &self.face_recognition {
            FaceSection::Shown(view) => {
                writeln!(f, "  {}", view.summary)?;
                for note in &view.notes {
                    writeln!(f, "  • {}", note)?;
                }
                for face in &view.faces {
                    writeln!(f, "  {} ({})", face.label, face.confidence)?;
                    writeln!(f, "    Location: {}", face.location)?;
                    if let Some(detail) = &face.sensitive {
                        if let Some(age) = &detail.age {
                            writeln!(f, "    Estimated Age: {}", age)?;
                        }
                        if let Some(gender) = &detail.gender {
                            writeln!(f, "    Gender Estimation: {}", gender)?;
                        }
                        if !detail.emotions.is_empty() {
                            let emotions: Vec<&str> =
                                detail.emotions.iter().map(|e| e.text.as_str()).collect();
                            writeln!(f, "    Emotion Analysis: {}", emotions.join(", "))?;
                        }
                        if let Some(warning) = detail.similar_faces_warning {
                            writeln!(f, "    {}", warning)?;
                        }
                    }
                }
            }
            other => writeln!(f, "  {}", other.notice().unwrap_or_default())?,
        }

        if let Some(notice) = &self.privacy_notice {
            writeln!(f, "\n{}", notice)?;
        }
        Ok(())
    }
}
