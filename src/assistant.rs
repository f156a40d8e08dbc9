// "Magician's assistant": asks a vision model to describe the captured background
// or to explain the trick. Purely advisory; it runs on its own thread and every failure
// collapses into a friendly fallback line, so the frame loop never waits on it.

use crate::error::{Error, Result};
use crate::types::FrameBuffer;
use base64::Engine;
use derivative::Derivative;
use derive_setters::Setters;
use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
};
use std::time::Duration;

pub const GREETING: &str = "Capture a background, then press A and I'll analyze your scene for the trick!";
pub const NO_BACKGROUND: &str = "Please capture a background first so I can see the room!";
pub const SCENE_EMPTY: &str = "I couldn't analyze the scene. The magic is too strong!";
pub const SCENE_FAILED: &str = "The magical connection (API) seems to be disrupted.";
pub const EXPLAIN_EMPTY: &str = "Magic is just science we don't understand yet.";
pub const EXPLAIN_FAILED: &str = "I cannot explain the magic right now.";

const SCENE_PROMPT: &str = "You are a tech-savvy magician's assistant. This image is the secret \
background plate for an invisibility cloak trick. Briefly describe the setting and suggest what \
kind of object would be funny to make invisible in this specific room. Keep it short and witty.";

const EXPLAIN_PROMPT: &str = "Explain to a non-technical user how 'Chroma Key' or 'Invisibility \
Cloak' technology works in computer vision (using Hue, Saturation, Masking) in 3 simple sentences.";

/// Something that can talk about the scene. Implementations may block.
pub trait SceneAdvisor: Send + Sync {
    /// `png` is the captured background, PNG-encoded.
    fn describe_scene(&self, png: &[u8]) -> Result<String>;
    fn explain_technology(&self) -> Result<String>;
}

// ----------------------------- Gemini over HTTP -----------------------------

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct AdvisorConfig {
    #[derivative(Default(value = "None"))]
    #[setters(strip_option)]
    pub api_key: Option<String>,

    #[derivative(Default(value = "String::from(\"gemini-2.5-flash\")"))]
    #[setters(into)]
    pub model: String,

    #[derivative(Default(value = "String::from(\"https://generativelanguage.googleapis.com/v1beta\")"))]
    #[setters(into)]
    pub base_url: String,

    #[derivative(Default(value = "Duration::from_secs(60)"))]
    pub timeout: Duration,
}

pub struct GeminiAdvisor {
    config: AdvisorConfig,
    client: reqwest::blocking::Client,
}

impl GeminiAdvisor {
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let api_key = self.config.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let body = GenerateRequest { contents: vec![Content { parts }] };
        let response: GenerateResponse = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        response.text().ok_or(Error::EmptyResponse)
    }
}

impl SceneAdvisor for GeminiAdvisor {
    fn describe_scene(&self, png: &[u8]) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD.encode(png);
        self.generate(vec![
            Part::InlineData {
                inline_data: Blob { mime_type: "image/png".into(), data },
            },
            Part::Text { text: SCENE_PROMPT.into() },
        ])
    }

    fn explain_technology(&self) -> Result<String> {
        self.generate(vec![Part::Text { text: EXPLAIN_PROMPT.into() }])
    }
}

/// Stands in when no HTTP client could be built; every request gets its fallback line.
pub struct DisabledAdvisor;

impl SceneAdvisor for DisabledAdvisor {
    fn describe_scene(&self, _png: &[u8]) -> Result<String> {
        Err(Error::MissingApiKey)
    }

    fn explain_technology(&self) -> Result<String> {
        Err(Error::MissingApiKey)
    }
}

#[derive(Serialize, Debug)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize, Deserialize, Debug)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate; `None` when there is nothing to say.
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

// ----------------------------- background worker -----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantRequest {
    AnalyzeScene,
    ExplainTechnology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub request: AssistantRequest,
    pub text: String,
}

/// Runs one advisor request at a time on a worker thread; replies arrive via `try_recv`.
pub struct Assistant {
    advisor: Arc<dyn SceneAdvisor>,
    busy: Arc<AtomicBool>,
    tx: mpsc::Sender<AssistantReply>,
    rx: mpsc::Receiver<AssistantReply>,
}

impl Assistant {
    pub fn new(advisor: Arc<dyn SceneAdvisor>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { advisor, busy: Arc::new(AtomicBool::new(false)), tx, rx }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Describe the captured background. Returns false if a request is already running.
    pub fn analyze(&self, background: Option<Arc<FrameBuffer>>) -> bool {
        let Some(background) = background else {
            let _ = self.tx.send(AssistantReply {
                request: AssistantRequest::AnalyzeScene,
                text: NO_BACKGROUND.to_string(),
            });
            return true;
        };

        self.spawn(AssistantRequest::AnalyzeScene, move |advisor| {
            let reply = encode_png(&background).and_then(|png| advisor.describe_scene(&png));
            fallback(reply, SCENE_EMPTY, SCENE_FAILED)
        })
    }

    /// Explain how the effect works. Returns false if a request is already running.
    pub fn explain(&self) -> bool {
        self.spawn(AssistantRequest::ExplainTechnology, |advisor| {
            fallback(advisor.explain_technology(), EXPLAIN_EMPTY, EXPLAIN_FAILED)
        })
    }

    pub fn try_recv(&self) -> Option<AssistantReply> {
        self.rx.try_recv().ok()
    }

    fn spawn<F>(&self, request: AssistantRequest, job: F) -> bool
    where
        F: FnOnce(&dyn SceneAdvisor) -> String + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let advisor = Arc::clone(&self.advisor);
        let busy = Arc::clone(&self.busy);
        let tx = self.tx.clone();

        let spawned = std::thread::Builder::new()
            .name("scene-assistant".into())
            .spawn(move || {
                let text = job(advisor.as_ref());
                busy.store(false, Ordering::Release);
                let _ = tx.send(AssistantReply { request, text });
            });

        if let Err(e) = spawned {
            log::warn!("assistant: could not start worker thread: {e}");
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }
}

fn fallback(reply: Result<String>, empty: &str, failed: &str) -> String {
    match reply {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) | Err(Error::EmptyResponse) => empty.to_string(),
        Err(e) => {
            log::warn!("assistant: {e}");
            failed.to_string()
        }
    }
}

/// PNG bytes of an RGBA frame.
pub fn encode_png(frame: &FrameBuffer) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        &frame.pixels,
        frame.width as u32,
        frame.height as u32,
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    /// Replies with fixed text, or fails when `text` is None.
    struct Canned {
        text: Option<&'static str>,
    }

    impl SceneAdvisor for Canned {
        fn describe_scene(&self, png: &[u8]) -> Result<String> {
            assert!(png.starts_with(b"\x89PNG"));
            self.text.map(str::to_string).ok_or(Error::MissingApiKey)
        }

        fn explain_technology(&self) -> Result<String> {
            self.text.map(str::to_string).ok_or(Error::MissingApiKey)
        }
    }

    /// Blocks until the test lets it go.
    struct Gate {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SceneAdvisor for Gate {
        fn describe_scene(&self, _png: &[u8]) -> Result<String> {
            self.explain_technology()
        }

        fn explain_technology(&self) -> Result<String> {
            let rx = self.release.lock().map_err(|_| Error::EmptyResponse)?;
            let _ = rx.recv();
            Ok("done".into())
        }
    }

    fn background() -> Option<Arc<FrameBuffer>> {
        Some(Arc::new(FrameBuffer::filled(4, 2, [30, 60, 90, 255])))
    }

    fn reply(assistant: &Assistant) -> AssistantReply {
        assistant.rx.recv_timeout(WAIT).expect("assistant reply")
    }

    #[test]
    fn analyze_without_background_asks_for_one() {
        let assistant = Assistant::new(Arc::new(Canned { text: Some("hi") }));
        assert!(assistant.analyze(None));
        let r = reply(&assistant);
        assert_eq!(r.request, AssistantRequest::AnalyzeScene);
        assert_eq!(r.text, NO_BACKGROUND);
        assert!(!assistant.is_busy());
    }

    #[test]
    fn analyze_passes_advisor_text_through() {
        let assistant = Assistant::new(Arc::new(Canned { text: Some("A cosy study.") }));
        assert!(assistant.analyze(background()));
        assert_eq!(reply(&assistant).text, "A cosy study.");
    }

    #[test]
    fn failures_become_fallback_lines() {
        let assistant = Assistant::new(Arc::new(Canned { text: None }));
        assistant.analyze(background());
        assert_eq!(reply(&assistant).text, SCENE_FAILED);
        assistant.explain();
        let r = reply(&assistant);
        assert_eq!(r.request, AssistantRequest::ExplainTechnology);
        assert_eq!(r.text, EXPLAIN_FAILED);
    }

    #[test]
    fn blank_text_becomes_empty_fallback() {
        let assistant = Assistant::new(Arc::new(Canned { text: Some("   ") }));
        assistant.explain();
        assert_eq!(reply(&assistant).text, EXPLAIN_EMPTY);
        assistant.analyze(background());
        assert_eq!(reply(&assistant).text, SCENE_EMPTY);
    }

    #[test]
    fn one_request_at_a_time() {
        let (release, rx) = mpsc::channel();
        let assistant = Assistant::new(Arc::new(Gate { release: Mutex::new(rx) }));

        assert!(assistant.explain());
        assert!(assistant.is_busy());
        assert!(!assistant.explain());
        assert!(!assistant.analyze(background()));

        release.send(()).unwrap();
        assert_eq!(reply(&assistant).text, "done");
        assert!(!assistant.is_busy());
        assert!(assistant.try_recv().is_none());
    }

    #[test]
    fn missing_api_key_is_reported() {
        let advisor = GeminiAdvisor::new(AdvisorConfig::default()).unwrap();
        assert!(matches!(advisor.explain_technology(), Err(Error::MissingApiKey)));
    }

    #[test]
    fn disabled_advisor_answers_with_fallbacks() {
        let assistant = Assistant::new(Arc::new(DisabledAdvisor));
        assert!(assistant.analyze(background()));
        assert_eq!(reply(&assistant).text, SCENE_FAILED);
        assert!(assistant.explain());
        assert_eq!(reply(&assistant).text, EXPLAIN_FAILED);
        assert!(!assistant.is_busy());
    }

    #[test]
    fn request_body_has_gemini_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: Blob { mime_type: "image/png".into(), data: "AAAA".into() },
                    },
                    Part::Text { text: "hello".into() },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        { "inline_data": { "mime_type": "image/png", "data": "AAAA" } },
                        { "text": "hello" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hocus "},{"text":"pocus."}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hocus pocus."));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn png_encoding_round_trips_size() {
        let frame = FrameBuffer::filled(5, 3, [1, 2, 3, 255]);
        let png = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }
}
