use super::*;
use crate::canvas::viewport::{PointerSample, Viewport};
use crate::genai::types::{Candidate, Content, GenError, GenerateResponse, Part};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Mutex as StdMutex;
use tokio::sync::Notify;
use super::usage::{KeyValueStore, MemoryStore, USAGE_COUNT_KEY};

// =========================================================================
// Mocks
// =========================================================================

struct MockGenerator {
    responses: StdMutex<Vec<Result<GenerateResponse, GenError>>>,
    requests: StdMutex<Vec<(ImageModel, GenerateRequest)>>,
}

impl MockGenerator {
    fn new(responses: Vec<Result<GenerateResponse, GenError>>) -> Self {
        Self { responses: StdMutex::new(responses), requests: StdMutex::new(Vec::new()) }
    }

    fn requests(&self) -> Vec<(ImageModel, GenerateRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, model: ImageModel, request: &GenerateRequest) -> Result<GenerateResponse, GenError> {
        self.requests.lock().unwrap().push((model, request.clone()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() { Ok(GenerateResponse::default()) } else { responses.remove(0) }
    }
}

/// Blocks inside `generate` until released.
struct GatedGenerator {
    started: Notify,
    release: Notify,
    response: GenerateResponse,
}

#[async_trait::async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(&self, _model: ImageModel, _request: &GenerateRequest) -> Result<GenerateResponse, GenError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.response.clone())
    }
}

struct MockCredentials {
    has_key: AtomicBool,
    opened: AtomicBool,
}

#[async_trait::async_trait]
impl CredentialProvider for MockCredentials {
    async fn has_selected_key(&self) -> bool {
        self.has_key.load(Ordering::SeqCst)
    }

    async fn open_selector(&self) {
        self.opened.store(true, Ordering::SeqCst);
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn png_base64(width: u32, height: u32, color: [u8; 4]) -> String {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    BASE64.encode(out)
}

fn candidate(parts: Vec<Part>) -> Candidate {
    Candidate { content: Some(Content { role: Some("model".into()), parts }), finish_reason: None }
}

fn image_response(data: String) -> GenerateResponse {
    GenerateResponse { candidates: vec![candidate(vec![Part::text("done"), Part::inline("image/png", data)])] }
}

fn store(initial: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(USAGE_COUNT_KEY, initial).unwrap();
    store
}

async fn mounted_studio(generator: Arc<dyn ImageGenerator>, store: Arc<MemoryStore>) -> Studio {
    let studio = Studio::new(generator, UsageCounter::load(store));
    studio.mount().await;
    studio
}

async fn center_pixel(studio: &Studio) -> Rgba<u8> {
    *studio.canvas().lock().await.buffer().unwrap().get_pixel(640, 360)
}

const BLUE: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

// =========================================================================
// instruction
// =========================================================================

#[test]
fn instruction_appends_style_sentence() {
    assert_eq!(build_instruction("add a hat"), "add a hat. Keep the same minimal line drawing style.");
}

// =========================================================================
// submit — success
// =========================================================================

#[tokio::test]
async fn success_applies_image_and_counts_usage() {
    let generator = Arc::new(MockGenerator::new(vec![Ok(image_response(png_base64(200, 100, BLUE)))]));
    let store = store("5");
    let studio = mounted_studio(generator.clone(), store.clone()).await;

    let outcome = studio.submit("make it blue").await.unwrap();
    match outcome {
        SubmitOutcome::Generated { mime_type, placement } => {
            assert_eq!(mime_type, "image/png");
            assert_eq!(placement.unwrap().pixel_rect(), (0, 40, 1280, 640));
        }
        SubmitOutcome::Skipped => panic!("expected Generated"),
    }
    assert_eq!(center_pixel(&studio).await, Rgba(BLUE));
    assert_eq!(studio.usage_count(), 6);
    assert_eq!(store.get(USAGE_COUNT_KEY).as_deref(), Some("6"));
    assert_eq!(studio.phase(), SubmitPhase::Idle);
    assert!(studio.error_notice().is_none());
}

#[tokio::test]
async fn request_carries_png_snapshot_and_instruction() {
    let generator = Arc::new(MockGenerator::new(vec![Ok(image_response(png_base64(8, 8, BLUE)))]));
    let studio = mounted_studio(generator.clone(), store("0")).await;
    studio.select_model(ImageModel::ProPreview);

    studio.submit("a cat").await.unwrap();

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    let (model, request) = &requests[0];
    assert_eq!(*model, ImageModel::ProPreview);
    assert_eq!(request.contents.len(), 1);
    let parts = &request.contents[0].parts;
    assert_eq!(parts.len(), 2);

    let inline = parts[0].inline_data.as_ref().unwrap();
    assert_eq!(inline.mime_type, "image/png");
    let sent = image::load_from_memory(&BASE64.decode(&inline.data).unwrap()).unwrap().into_rgba8();
    assert_eq!(sent.dimensions(), (1280, 720));
    assert!(sent.pixels().all(|p| p[3] == 255));

    assert_eq!(parts[1].text.as_deref(), Some("a cat. Keep the same minimal line drawing style."));
}

#[tokio::test]
async fn second_candidate_image_beats_text_parts() {
    let response = GenerateResponse {
        candidates: vec![
            candidate(vec![Part::text("no image here")]),
            candidate(vec![Part::inline("image/png", png_base64(100, 200, GREEN)), Part::text("trailing")]),
        ],
    };
    let generator = Arc::new(MockGenerator::new(vec![Ok(response)]));
    let studio = mounted_studio(generator, store("0")).await;

    studio.submit("green").await.unwrap();
    assert_eq!(center_pixel(&studio).await, Rgba(GREEN));
    // Taller than wide: pillarboxed, edges stay white.
    let canvas = studio.canvas();
    let canvas = canvas.lock().await;
    assert_eq!(*canvas.buffer().unwrap().get_pixel(10, 360), Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn undecodable_image_still_counts_as_success() {
    let generator = Arc::new(MockGenerator::new(vec![Ok(image_response("bm90IGFuIGltYWdl".into()))]));
    let studio = mounted_studio(generator, store("1")).await;

    let outcome = studio.submit("anything").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Generated { placement: None, .. }));
    assert_eq!(studio.usage_count(), 2);
    assert!(studio.error_notice().is_none());
    assert_eq!(center_pixel(&studio).await, Rgba([255, 255, 255, 255]));
}

// =========================================================================
// submit — failures
// =========================================================================

#[tokio::test]
async fn no_image_is_error_and_keeps_background() {
    let generator = Arc::new(MockGenerator::new(vec![
        Ok(image_response(png_base64(64, 36, BLUE))),
        Ok(GenerateResponse { candidates: vec![candidate(vec![Part::text("refused")]), candidate(vec![])] }),
    ]));
    let store = store("0");
    let studio = mounted_studio(generator, store.clone()).await;

    studio.submit("first").await.unwrap();
    assert_eq!(center_pixel(&studio).await, Rgba(BLUE));

    let err = studio.submit("second").await.unwrap_err();
    assert!(matches!(err, SubmitError::NoImageProduced));
    assert_eq!(center_pixel(&studio).await, Rgba(BLUE));
    assert_eq!(studio.usage_count(), 1);
    assert_eq!(store.get(USAGE_COUNT_KEY).as_deref(), Some("1"));
    assert_eq!(studio.phase(), SubmitPhase::Error);
    assert!(studio.error_notice().unwrap().message.contains("could not be generated"));
    assert!(!studio.needs_credential());

    studio.dismiss_error();
    assert_eq!(studio.phase(), SubmitPhase::Idle);
}

#[tokio::test]
async fn api_error_is_surfaced_with_extracted_message() {
    let generator = Arc::new(MockGenerator::new(vec![Err(GenError::ApiResponse {
        status: 400,
        body: r#"{"error":{"code":400,"message":"Prompt blocked.","status":"INVALID_ARGUMENT"}}"#.into(),
    })]));
    let studio = mounted_studio(generator, store("3")).await;

    let err = studio.submit("bad").await.unwrap_err();
    assert!(matches!(err, SubmitError::Api(_)));
    assert_eq!(studio.error_notice(), Some(ErrorNotice { message: "Prompt blocked.".into() }));
    assert_eq!(studio.usage_count(), 3);
    assert!(!studio.needs_credential());
    assert_eq!(studio.phase(), SubmitPhase::Error);
}

#[tokio::test]
async fn not_found_error_raises_credential_banner() {
    let generator = Arc::new(MockGenerator::new(vec![Err(GenError::ApiResponse {
        status: 404,
        body: r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#.into(),
    })]));
    let creds = Arc::new(MockCredentials { has_key: AtomicBool::new(true), opened: AtomicBool::new(false) });
    let studio = Studio::new(generator, UsageCounter::load(store("0"))).with_credentials(creds.clone());
    studio.mount().await;
    studio.check_credentials().await;
    assert!(!studio.needs_credential());

    studio.submit("x").await.unwrap_err();
    assert!(studio.needs_credential());
    assert_eq!(studio.error_notice().unwrap().message, "Requested entity was not found.");

    studio.select_credential().await;
    assert!(creds.opened.load(Ordering::SeqCst));
    assert!(!studio.needs_credential());
}

#[tokio::test]
async fn success_after_failure_clears_notice() {
    let generator = Arc::new(MockGenerator::new(vec![
        Err(GenError::ApiRequest("boom".into())),
        Ok(image_response(png_base64(64, 36, BLUE))),
    ]));
    let studio = mounted_studio(generator, store("0")).await;

    studio.submit("first").await.unwrap_err();
    assert_eq!(studio.phase(), SubmitPhase::Error);

    studio.submit("second").await.unwrap();
    assert_eq!(studio.phase(), SubmitPhase::Idle);
    assert!(studio.error_notice().is_none());
    assert_eq!(studio.usage_count(), 1);
    assert_eq!(center_pixel(&studio).await, Rgba(BLUE));
}

#[tokio::test]
async fn rejected_submit_keeps_existing_notice() {
    let generator = Arc::new(MockGenerator::new(vec![Err(GenError::ApiRequest("boom".into()))]));
    let studio = mounted_studio(generator, store("0")).await;

    studio.submit("first").await.unwrap_err();
    assert!(matches!(studio.submit("  ").await, Err(SubmitError::EmptyPrompt)));
    assert_eq!(studio.phase(), SubmitPhase::Error);
    assert_eq!(studio.error_notice().unwrap().message, "API request failed: boom");
}

#[tokio::test]
async fn transport_error_uses_error_text() {
    let generator = Arc::new(MockGenerator::new(vec![Err(GenError::ApiRequest("connection refused".into()))]));
    let studio = mounted_studio(generator, store("0")).await;
    studio.submit("x").await.unwrap_err();
    assert_eq!(studio.error_notice().unwrap().message, "API request failed: connection refused");
}

// =========================================================================
// submit — rejections
// =========================================================================

#[tokio::test]
async fn empty_prompt_is_rejected_without_request() {
    let generator = Arc::new(MockGenerator::new(vec![]));
    let studio = mounted_studio(generator.clone(), store("0")).await;
    assert!(matches!(studio.submit("   ").await, Err(SubmitError::EmptyPrompt)));
    assert!(generator.requests().is_empty());
    assert_eq!(studio.phase(), SubmitPhase::Idle);
    assert!(studio.error_notice().is_none());
}

#[tokio::test]
async fn unmounted_canvas_is_skipped() {
    let generator = Arc::new(MockGenerator::new(vec![]));
    let studio = Studio::new(generator.clone(), UsageCounter::load(store("0")));
    assert_eq!(studio.submit("hello").await.unwrap(), SubmitOutcome::Skipped);
    assert!(generator.requests().is_empty());
    assert_eq!(studio.phase(), SubmitPhase::Idle);
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let generator = Arc::new(GatedGenerator {
        started: Notify::new(),
        release: Notify::new(),
        response: image_response(png_base64(32, 18, BLUE)),
    });
    let studio = Arc::new(mounted_studio(generator.clone(), store("0")).await);

    let first = {
        let studio = Arc::clone(&studio);
        tokio::spawn(async move { studio.submit("first").await })
    };
    generator.started.notified().await;
    assert_eq!(studio.phase(), SubmitPhase::Submitting);

    assert!(matches!(studio.submit("second").await, Err(SubmitError::AlreadyInFlight)));
    assert_eq!(studio.phase(), SubmitPhase::Submitting);

    // The canvas stays drawable while the request is outstanding.
    {
        let canvas = studio.canvas();
        let mut canvas = canvas.lock().await;
        let vp = Viewport::identity(1280, 720);
        canvas.begin_stroke(&PointerSample::mouse(0.0, 0.0), &vp);
        canvas.extend_stroke(&PointerSample::mouse(50.0, 0.0), &vp);
        canvas.end_stroke();
    }

    generator.release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(studio.phase(), SubmitPhase::Idle);
    assert_eq!(studio.usage_count(), 1);
    assert_eq!(center_pixel(&studio).await, Rgba(BLUE));
}

#[tokio::test]
async fn rejected_submit_leaves_first_request_exclusive() {
    let generator = Arc::new(GatedGenerator {
        started: Notify::new(),
        release: Notify::new(),
        response: image_response(png_base64(32, 18, BLUE)),
    });
    let studio = Arc::new(mounted_studio(generator.clone(), store("0")).await);

    let first = {
        let studio = Arc::clone(&studio);
        tokio::spawn(async move { studio.submit("first").await })
    };
    generator.started.notified().await;

    for prompt in ["second", "third", "fourth"] {
        assert!(matches!(studio.submit(prompt).await, Err(SubmitError::AlreadyInFlight)));
        assert_eq!(studio.phase(), SubmitPhase::Submitting);
    }

    generator.release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(studio.phase(), SubmitPhase::Idle);
    assert_eq!(studio.usage_count(), 1);
}

#[tokio::test]
async fn cancelled_submit_returns_to_idle() {
    let generator = Arc::new(GatedGenerator {
        started: Notify::new(),
        release: Notify::new(),
        response: GenerateResponse::default(),
    });
    let studio = Arc::new(mounted_studio(generator.clone(), store("0")).await);

    let task = {
        let studio = Arc::clone(&studio);
        tokio::spawn(async move { studio.submit("first").await })
    };
    generator.started.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(studio.phase(), SubmitPhase::Idle);
}

// =========================================================================
// credentials / usage / canvas actions
// =========================================================================

#[tokio::test]
async fn missing_provider_keeps_banner_hidden() {
    let studio = mounted_studio(Arc::new(MockGenerator::new(vec![])), store("0")).await;
    studio.check_credentials().await;
    studio.select_credential().await;
    assert!(!studio.needs_credential());
}

#[tokio::test]
async fn provider_without_key_shows_banner() {
    let creds = Arc::new(MockCredentials { has_key: AtomicBool::new(false), opened: AtomicBool::new(false) });
    let studio = Studio::new(Arc::new(MockGenerator::new(vec![])), UsageCounter::load(store("0"))).with_credentials(creds);
    studio.check_credentials().await;
    assert!(studio.needs_credential());
}

#[tokio::test]
async fn reset_usage_persists_zero() {
    let store = store("7");
    let studio = mounted_studio(Arc::new(MockGenerator::new(vec![])), store.clone()).await;
    assert_eq!(studio.usage_count(), 7);
    assert_eq!(studio.usage_progress(), 35);
    studio.reset_usage();
    assert_eq!(studio.usage_count(), 0);
    assert_eq!(store.get(USAGE_COUNT_KEY).as_deref(), Some("0"));
}

#[tokio::test]
async fn uploaded_background_and_clear() {
    let studio = mounted_studio(Arc::new(MockGenerator::new(vec![])), store("0")).await;
    let bytes = BASE64.decode(png_base64(160, 90, GREEN)).unwrap();
    let placement = studio.load_background(&bytes).await.unwrap();
    assert_eq!(placement.unwrap().pixel_rect(), (0, 0, 1280, 720));
    assert_eq!(center_pixel(&studio).await, Rgba(GREEN));

    studio.clear().await;
    assert_eq!(center_pixel(&studio).await, Rgba([255, 255, 255, 255]));
    assert!(!studio.canvas().lock().await.has_background());
}

#[test]
fn apply_generated_ignores_garbage() {
    let mut canvas = Canvas::new();
    canvas.initialize();
    assert!(apply_generated(&mut canvas, "@@@").is_none());
    assert!(!canvas.has_background());
}
