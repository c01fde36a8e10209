use thiserror::Error;

/// Main error type for the slide-narrator library
#[derive(Error, Debug)]
pub enum NarratorError {
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Speech synthesis error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading and normalizing slide annotations
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Unknown directive '{tag}' on page {page}")]
    UnknownDirective { page: usize, tag: String },

    #[error("Malformed '{tag}' directive on page {page}: {reason}")]
    MalformedDirective { page: usize, tag: String, reason: String },

    #[error("Invalid dimension value: {value}")]
    InvalidDimension { value: String },

    #[error("Page {page} continues an overlay but no logical slide has been opened")]
    OrphanOverlay { page: usize },

    #[error("Multiple duration settings for logical slide {logical_slide} (page {page})")]
    DuplicateDurationOverride { logical_slide: usize, page: usize },

    #[error("{kind} starts from {start_from} but logical slide {logical_slide} (page {page}) has only {physical_count} physical slides")]
    CueOutOfRange {
        kind: &'static str,
        logical_slide: usize,
        page: usize,
        start_from: u32,
        physical_count: usize,
    },

    #[error("Empty physical duration list for logical slide {logical_slide} (page {page})")]
    EmptyDurationList { logical_slide: usize, page: usize },

    #[error("Invalid duration {value} for logical slide {logical_slide} (page {page})")]
    InvalidDuration { logical_slide: usize, page: usize, value: f64 },

    #[error("Failed to query annotations from {path}: {reason}")]
    QueryFailed { path: String, reason: String },

    #[error("Failed to parse annotation document: {reason}")]
    ParseFailed { reason: String },
}

/// Timeline composition errors
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Transition type is none, but duration is {duration}")]
    InvalidTransition { duration: f64 },

    #[error("Narration from earlier slides ({backlog:.3}s) is not finished at slide {slide}")]
    UnabsorbedNarration { slide: usize, backlog: f64 },

    #[error("Expected {expected} {what}, got {supplied}")]
    SupplyMismatch {
        what: &'static str,
        expected: usize,
        supplied: usize,
    },

    #[error("Output generation failed: {reason}")]
    OutputFailed { reason: String },

    #[error("Invalid composition parameters: {details}")]
    InvalidParameters { details: String },
}

/// Speech synthesis and audio probing errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech {index} could not be synthesized: {reason}")]
    SynthesisFailed { index: usize, reason: String },

    #[error("Speech backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },
}

/// Rasterization, probing and encoding errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load file: {path}")]
    LoadFailed { path: String },

    #[error("Slide rasterization failed: {reason}")]
    RasterizeFailed { reason: String },

    #[error("Could not probe {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using NarratorError
pub type Result<T> = std::result::Result<T, NarratorError>;

impl NarratorError {
    /// Whether the failure points at the annotated deck rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Annotation(AnnotationError::OrphanOverlay { .. })
                | Self::Annotation(AnnotationError::UnknownDirective { .. })
                | Self::Annotation(AnnotationError::MalformedDirective { .. })
                | Self::Annotation(AnnotationError::InvalidDimension { .. })
                | Self::Annotation(AnnotationError::DuplicateDurationOverride { .. })
                | Self::Annotation(AnnotationError::CueOutOfRange { .. })
                | Self::Annotation(AnnotationError::EmptyDurationList { .. })
                | Self::Annotation(AnnotationError::InvalidDuration { .. })
                | Self::Annotation(AnnotationError::ParseFailed { .. })
                | Self::Composition(CompositionError::UnabsorbedNarration { .. })
                | Self::Composition(CompositionError::InvalidTransition { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Annotation(AnnotationError::QueryFailed { path, .. }) => {
                format!("Could not read annotations from '{}'. Is typst installed and the file compilable?", path)
            }
            Self::Speech(SpeechError::BackendUnavailable { backend, .. }) => {
                format!("Speech backend '{}' is not available. Available backends: preview, command, openai", backend)
            }
            Self::Video(VideoError::RasterizeFailed { .. }) => {
                "Could not rasterize the slides. Please check that pdftoppm is installed and the PDF exists.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_errors_are_input_errors() {
        let err: NarratorError = AnnotationError::OrphanOverlay { page: 0 }.into();
        assert!(err.is_input_error());

        let err: NarratorError = CompositionError::UnabsorbedNarration { slide: 1, backlog: 0.5 }.into();
        assert!(err.is_input_error());

        let err: NarratorError = VideoError::EncodingFailed { reason: "x".into() }.into();
        assert!(!err.is_input_error());

        let err: NarratorError = AnnotationError::QueryFailed {
            path: "talk.typ".into(),
            reason: "typst: not found".into(),
        }
        .into();
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_cue_out_of_range_message_has_context() {
        let err = AnnotationError::CueOutOfRange {
            kind: "Speech",
            logical_slide: 2,
            page: 5,
            start_from: 4,
            physical_count: 3,
        };
        let message = err.to_string();
        assert!(message.contains("logical slide 2"));
        assert!(message.contains("page 5"));
        assert!(message.contains("starts from 4"));
    }
}
