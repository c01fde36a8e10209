use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::annotation::types::{
    Deck, Defaults, Dimension, Directive, PageRecord, SpeechCue, VideoOverlayCue,
};
use crate::error::{AnnotationError, Result};

/// Label under which the deck template publishes its page annotations
const QUERY_LABEL: &str = "<pdfpc-file>";

#[derive(Deserialize)]
struct RawDeck {
    pages: Vec<RawPage>,

    #[serde(default, rename = "t2sdefaults")]
    defaults: Option<Defaults>,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    hidden: bool,

    #[serde(default)]
    overlay: usize,

    #[serde(default)]
    t2s: Vec<RawDirective>,
}

#[derive(Deserialize)]
struct RawDirective {
    t: String,

    #[serde(default)]
    v: Value,
}

#[derive(Deserialize)]
struct RawSpeech {
    #[serde(default = "first_slide")]
    start_from: u32,

    #[serde(default)]
    body: String,
}

#[derive(Deserialize)]
struct RawOverlay {
    #[serde(default = "first_slide")]
    start_from: u32,

    video: PathBuf,

    #[serde(default)]
    x: Value,
    #[serde(default)]
    y: Value,
    #[serde(default)]
    width: Value,
    #[serde(default)]
    height: Value,

    #[serde(default)]
    reverse: bool,
}

fn first_slide() -> u32 {
    1
}

/// Reads annotated decks, either as JSON or straight from a typst source
pub struct DeckLoader;

impl DeckLoader {
    /// Load a deck, dispatching on the file extension
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Deck> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => {
                let content = tokio::fs::read_to_string(path).await?;
                Self::from_json_str(&content)
            }
            _ => {
                let path = path.to_path_buf();
                let output = tokio::task::spawn_blocking(move || Self::query_typst(&path))
                    .await
                    .map_err(|e| AnnotationError::QueryFailed {
                        path: "typst".to_string(),
                        reason: e.to_string(),
                    })??;
                Self::from_json_str(&output)
            }
        }
    }

    /// Run `typst query` and return its JSON output
    fn query_typst(path: &Path) -> Result<String> {
        info!("Querying annotations from {:?}", path);

        let output = Command::new("typst")
            .arg("query")
            .arg(path)
            .arg(QUERY_LABEL)
            .args(["--field", "value", "--one"])
            .output()
            .map_err(|e| AnnotationError::QueryFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AnnotationError::QueryFailed {
                path: path.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parse the pdfpc-style JSON document
    pub fn from_json_str(content: &str) -> Result<Deck> {
        let raw: RawDeck = serde_json::from_str(content).map_err(|e| AnnotationError::ParseFailed {
            reason: e.to_string(),
        })?;

        if let Some(defaults) = &raw.defaults {
            if !(defaults.duration_physical > 0.0 && defaults.duration_physical.is_finite()) {
                return Err(AnnotationError::ParseFailed {
                    reason: format!(
                        "t2sdefaults.duration_physical must be positive, got {}",
                        defaults.duration_physical
                    ),
                }
                .into());
            }
        }

        let pages = raw
            .pages
            .into_iter()
            .enumerate()
            .map(|(page, raw_page)| {
                // Only the visible page opening a slide carries its directives
                let directives = if raw_page.hidden || raw_page.overlay > 0 {
                    Vec::new()
                } else {
                    raw_page
                        .t2s
                        .into_iter()
                        .map(|d| Self::convert_directive(page, d))
                        .collect::<Result<Vec<_>>>()?
                };

                Ok(PageRecord {
                    page,
                    hidden: raw_page.hidden,
                    overlay_index: raw_page.overlay,
                    directives,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Parsed {} pages ({} visible), deck defaults: {:?}",
            pages.len(),
            pages.iter().filter(|p| !p.hidden).count(),
            raw.defaults
        );

        Ok(Deck {
            pages,
            defaults: raw.defaults,
        })
    }

    fn convert_directive(page: usize, raw: RawDirective) -> Result<Directive> {
        let RawDirective { t: tag, v: payload } = raw;
        let malformed = |reason: String| AnnotationError::MalformedDirective {
            page,
            tag: tag.clone(),
            reason,
        };

        let directive = match tag.as_str() {
            "T2s" | "speech" => {
                let speech: RawSpeech =
                    serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
                Directive::Speech(SpeechCue {
                    start_from: speech.start_from,
                    text: speech.body,
                })
            }
            "T2s-duration-logical" | "duration_logical" => {
                let seconds: f64 =
                    serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
                Directive::LogicalDuration { seconds }
            }
            "T2s-duration-physical" | "duration_physical" => {
                let seconds: Vec<f64> =
                    serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
                Directive::PhysicalDuration { seconds }
            }
            "T2s-video-overlay" | "overlay" => {
                let overlay: RawOverlay =
                    serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
                Directive::VideoOverlay(VideoOverlayCue {
                    start_from: overlay.start_from,
                    source: overlay.video,
                    x: Self::dimension(&overlay.x)?,
                    y: Self::dimension(&overlay.y)?,
                    width: Self::dimension(&overlay.width)?,
                    height: Self::dimension(&overlay.height)?,
                    reverse: overlay.reverse,
                })
            }
            _ => {
                return Err(AnnotationError::UnknownDirective {
                    page,
                    tag: tag.clone(),
                }
                .into())
            }
        };

        Ok(directive)
    }

    fn dimension(value: &Value) -> Result<Option<Dimension>> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(|v| Some(Dimension::Pixels(v)))
                .ok_or_else(|| {
                    AnnotationError::InvalidDimension {
                        value: n.to_string(),
                    }
                    .into()
                }),
            Value::String(s) => Dimension::parse(s).map(Some),
            other => Err(AnnotationError::InvalidDimension {
                value: other.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::types::TransitionKind;
    use crate::error::NarratorError;

    const DECK: &str = r#"{
        "pages": [
            {"idx": 0, "overlay": 0, "hidden": false, "t2s": [
                {"t": "T2s", "v": {"start_from": 1, "body": "Hello there."}},
                {"t": "T2s-duration-physical", "v": [1, 2.5]}
            ]},
            {"idx": 1, "overlay": 1, "hidden": false, "t2s": []},
            {"idx": 2, "overlay": 0, "hidden": true},
            {"idx": 3, "overlay": 0, "t2s": [
                {"t": "T2s-video-overlay", "v": {"start_from": 1, "video": "clip.mp4",
                  "x": "10%", "y": 40, "width": null, "height": "360", "reverse": true}}
            ]}
        ],
        "t2sdefaults": {"duration_physical": 3, "transition": "fade", "transition_duration": 0.8}
    }"#;

    #[test]
    fn test_parse_deck() {
        let deck = DeckLoader::from_json_str(DECK).unwrap();
        assert_eq!(deck.pages.len(), 4);
        assert_eq!(deck.visible_pages(), 3);

        assert_eq!(
            deck.pages[0].directives,
            vec![
                Directive::Speech(SpeechCue {
                    start_from: 1,
                    text: "Hello there.".to_string()
                }),
                Directive::PhysicalDuration {
                    seconds: vec![1.0, 2.5]
                },
            ]
        );
        assert_eq!(deck.pages[1].overlay_index, 1);
        assert!(deck.pages[2].hidden);
        assert!(deck.pages[2].directives.is_empty());

        let defaults = deck.defaults.unwrap();
        assert_eq!(defaults.duration_physical, 3.0);
        assert_eq!(defaults.transition, TransitionKind::Fade);
        assert_eq!(defaults.transition_duration, 0.8);
    }

    #[test]
    fn test_parse_overlay_geometry() {
        let deck = DeckLoader::from_json_str(DECK).unwrap();
        match &deck.pages[3].directives[0] {
            Directive::VideoOverlay(cue) => {
                assert_eq!(cue.source, PathBuf::from("clip.mp4"));
                assert_eq!(cue.x, Some(Dimension::Percent(10.0)));
                assert_eq!(cue.y, Some(Dimension::Pixels(40.0)));
                assert_eq!(cue.width, None);
                assert_eq!(cue.height, Some(Dimension::Pixels(360.0)));
                assert!(cue.reverse);
            }
            other => panic!("Expected overlay, got {:?}", other),
        }
    }

    #[test]
    fn test_short_tags_are_accepted() {
        let deck = DeckLoader::from_json_str(
            r#"{"pages": [{"overlay": 0, "t2s": [
                {"t": "speech", "v": {"start_from": 2, "body": "x"}},
                {"t": "duration_logical", "v": 6}
            ]}]}"#,
        )
        .unwrap();
        assert!(deck.defaults.is_none());
        assert_eq!(deck.pages[0].directives[1], Directive::LogicalDuration { seconds: 6.0 });
    }

    #[test]
    fn test_unknown_directive_is_fatal() {
        let result = DeckLoader::from_json_str(
            r#"{"pages": [{"overlay": 0}, {"overlay": 0, "t2s": [{"t": "T2s-subtitle", "v": "x"}]}]}"#,
        );

        if let Err(NarratorError::Annotation(AnnotationError::UnknownDirective { page, tag })) = result {
            assert_eq!(page, 1);
            assert_eq!(tag, "T2s-subtitle");
        } else {
            panic!("Expected UnknownDirective error");
        }
    }

    #[test]
    fn test_hidden_and_continuation_pages_are_not_read() {
        let deck = DeckLoader::from_json_str(
            r#"{"pages": [
                {"overlay": 0, "t2s": [{"t": "T2s", "v": {"start_from": 1, "body": "hi"}}]},
                {"overlay": 0, "hidden": true, "t2s": [{"t": "T2s-subtitle", "v": "x"}]},
                {"overlay": 1, "t2s": [{"t": "T2s-duration-physical", "v": "fast"}]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(deck.pages.len(), 3);
        assert_eq!(deck.pages[0].directives.len(), 1);
        assert!(deck.pages[1].directives.is_empty());
        assert!(deck.pages[2].directives.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_fatal() {
        let result = DeckLoader::from_json_str(
            r#"{"pages": [{"overlay": 0, "t2s": [{"t": "T2s-duration-physical", "v": "fast"}]}]}"#,
        );
        assert!(matches!(
            result,
            Err(NarratorError::Annotation(AnnotationError::MalformedDirective { .. }))
        ));
    }

    #[test]
    fn test_invalid_dimension_is_fatal() {
        let result = DeckLoader::from_json_str(
            r#"{"pages": [{"overlay": 0, "t2s": [{"t": "overlay", "v": {"video": "a.mp4", "x": true}}]}]}"#,
        );
        assert!(matches!(
            result,
            Err(NarratorError::Annotation(AnnotationError::InvalidDimension { .. }))
        ));
    }

    #[test]
    fn test_non_positive_deck_default_is_fatal() {
        let result = DeckLoader::from_json_str(
            r#"{"pages": [], "t2sdefaults": {"duration_physical": 0}}"#,
        );
        assert!(matches!(
            result,
            Err(NarratorError::Annotation(AnnotationError::ParseFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        std::fs::write(&path, DECK).unwrap();

        let deck = DeckLoader::load(&path).await.unwrap();
        assert_eq!(deck.pages.len(), 4);
    }
}
