use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use mailwright::{
    application::{
        capabilities::{DocumentConverter, ExportPresenter, Rasterizer},
        error::{ExportError, PresentError, RenderCapabilityError},
        export::{ExportOrchestrator, ExportServices, NEUTRAL_FOREGROUND_CSS},
        surface::{EditorSurface, ImageState, RenderNode},
    },
    domain::artifacts::{
        DocumentOptions, DocumentOutput, ExportArtifact, ExportKind, RasterImage, RasterOptions,
    },
    infra::{editor::StaticEditor, host::MemoryLiveTree, images::ImageLoader},
};
use tokio::sync::Notify;

struct FixedLoader;

#[async_trait]
impl ImageLoader for FixedLoader {
    async fn load(&self, _src: &str) -> ImageState {
        tokio::task::yield_now().await;
        ImageState::loaded(120, 40)
    }
}

struct StalledLoader;

#[async_trait]
impl ImageLoader for StalledLoader {
    async fn load(&self, _src: &str) -> ImageState {
        std::future::pending().await
    }
}

#[derive(Default)]
struct RecordingPresenter {
    downloads: Mutex<Vec<(String, String, Bytes)>>,
    bundles: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    fn downloads(&self) -> Vec<(String, String, Bytes)> {
        self.downloads.lock().expect("downloads").clone()
    }

    fn bundles(&self) -> Vec<String> {
        self.bundles.lock().expect("bundles").clone()
    }
}

#[async_trait]
impl ExportPresenter for RecordingPresenter {
    async fn download(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), PresentError> {
        self.downloads.lock().expect("downloads").push((
            filename.to_string(),
            content_type.to_string(),
            data,
        ));
        Ok(())
    }

    async fn show_bundle(&self, html: &str) -> Result<(), PresentError> {
        self.bundles.lock().expect("bundles").push(html.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct CountingRasterizer {
    calls: AtomicUsize,
    pending_images_seen: AtomicUsize,
}

#[async_trait]
impl Rasterizer for CountingRasterizer {
    async fn rasterize(
        &self,
        node: &dyn RenderNode,
        options: &RasterOptions,
    ) -> Result<RasterImage, RenderCapabilityError> {
        assert!(options.use_cors);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pending = node
            .images()
            .iter()
            .filter(|image| !image.state().is_settled())
            .count();
        self.pending_images_seen.store(pending, Ordering::SeqCst);
        Ok(RasterImage::new(Bytes::from_static(b"png-bytes")))
    }
}

/// What the converter observed while it ran.
#[derive(Debug, Default, Clone)]
struct Observed {
    hidden_nodes: usize,
    markup: String,
    pending_images: usize,
    options: Option<DocumentOptions>,
}

enum ConvertOutcome {
    Bytes(&'static [u8]),
    SelfSaved,
    Fail(&'static str),
}

struct ObservingConverter {
    tree: Arc<MemoryLiveTree>,
    outcome: ConvertOutcome,
    observed: Mutex<Option<Observed>>,
}

impl ObservingConverter {
    fn new(tree: &Arc<MemoryLiveTree>, outcome: ConvertOutcome) -> Self {
        Self {
            tree: Arc::clone(tree),
            outcome,
            observed: Mutex::new(None),
        }
    }

    fn observed(&self) -> Observed {
        self.observed
            .lock()
            .expect("observed")
            .clone()
            .expect("converter ran")
    }
}

#[async_trait]
impl DocumentConverter for ObservingConverter {
    async fn convert(
        &self,
        node: &dyn RenderNode,
        options: &DocumentOptions,
    ) -> Result<Option<Bytes>, RenderCapabilityError> {
        let observed = Observed {
            hidden_nodes: self.tree.hidden_count(),
            markup: node.markup(),
            pending_images: node
                .images()
                .iter()
                .filter(|image| !image.state().is_settled())
                .count(),
            options: Some(options.clone()),
        };
        *self.observed.lock().expect("observed") = Some(observed);

        match self.outcome {
            ConvertOutcome::Bytes(data) => Ok(Some(Bytes::from_static(data))),
            ConvertOutcome::SelfSaved => Ok(None),
            ConvertOutcome::Fail(message) => Err(RenderCapabilityError::convert(message)),
        }
    }
}

#[derive(Default)]
struct BlockingConverter {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl DocumentConverter for BlockingConverter {
    async fn convert(
        &self,
        _node: &dyn RenderNode,
        _options: &DocumentOptions,
    ) -> Result<Option<Bytes>, RenderCapabilityError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Some(Bytes::from_static(b"%PDF-1.7")))
    }
}

struct Harness {
    tree: Arc<MemoryLiveTree>,
    editor: Arc<StaticEditor>,
    presenter: Arc<RecordingPresenter>,
}

impl Harness {
    fn new(tree: MemoryLiveTree, markup: &str, stylesheet: &str) -> Self {
        let tree = Arc::new(tree);
        let editor =
            Arc::new(StaticEditor::new(Arc::clone(&tree), markup, stylesheet).expect("editor"));
        Self {
            tree,
            editor,
            presenter: Arc::new(RecordingPresenter::default()),
        }
    }

    fn orchestrator(
        &self,
        rasterizer: Arc<dyn Rasterizer>,
        converter: Arc<dyn DocumentConverter>,
    ) -> ExportOrchestrator {
        ExportOrchestrator::new(ExportServices {
            editor: self.editor.clone(),
            tree: self.tree.clone(),
            rasterizer,
            converter,
            presenter: self.presenter.clone(),
        })
    }
}

#[tokio::test]
async fn document_export_converts_an_isolated_settled_copy() {
    let harness = Harness::new(
        MemoryLiveTree::with_loader(Arc::new(FixedLoader)),
        r#"<p style="color: white">hi</p><img src="https://cdn.example.com/a.png">"#,
        "p{margin:0}",
    );
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::Bytes(b"%PDF-1.7"),
    ));
    let orchestrator =
        harness.orchestrator(Arc::new(CountingRasterizer::default()), converter.clone());

    let artifact = orchestrator
        .export(ExportKind::Document)
        .await
        .expect("document export");

    assert_eq!(
        artifact,
        ExportArtifact::Document(DocumentOutput::Encoded(Bytes::from_static(b"%PDF-1.7")))
    );
    let observed = converter.observed();
    assert_eq!(observed.hidden_nodes, 1);
    assert_eq!(observed.pending_images, 0);
    assert!(observed.markup.starts_with("<html><head><style>p{margin:0}\n"));
    assert!(observed.markup.contains(NEUTRAL_FOREGROUND_CSS));
    assert!(observed.markup.contains(r#"<p style="color: white">hi</p>"#));

    let options = observed.options.expect("options");
    assert_eq!(options.margin_mm, 10);
    assert_eq!(options.scale_factor, 2);
    assert_eq!(options.filename, "email-template.pdf");

    assert_eq!(harness.tree.hidden_count(), 0);
    assert_eq!(harness.tree.mounted_count(), 1);
    assert_eq!(
        harness.presenter.downloads(),
        vec![(
            "email-template.pdf".to_string(),
            "application/pdf".to_string(),
            Bytes::from_static(b"%PDF-1.7")
        )]
    );
}

#[tokio::test]
async fn failing_converter_still_disposes_the_container() {
    let harness = Harness::new(MemoryLiveTree::new(), "<p>hi</p>", "");
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::Fail("converter crashed"),
    ));
    let orchestrator =
        harness.orchestrator(Arc::new(CountingRasterizer::default()), converter.clone());

    let err = orchestrator
        .export_document()
        .await
        .expect_err("conversion fails");

    match err {
        ExportError::Render(render) => {
            assert_eq!(render.capability, "convert");
            assert_eq!(render.message, "converter crashed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(converter.observed().hidden_nodes, 1);
    assert_eq!(harness.tree.hidden_count(), 0);
    assert!(harness.presenter.downloads().is_empty());
}

#[tokio::test]
async fn self_saving_converter_skips_the_download() {
    let harness = Harness::new(MemoryLiveTree::new(), "<p>hi</p>", "");
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::SelfSaved,
    ));
    let orchestrator = harness.orchestrator(Arc::new(CountingRasterizer::default()), converter);

    let artifact = orchestrator.export_document().await.expect("export");

    assert_eq!(
        artifact,
        ExportArtifact::Document(DocumentOutput::SavedByConverter)
    );
    assert!(harness.presenter.downloads().is_empty());
    assert_eq!(harness.tree.hidden_count(), 0);
}

#[tokio::test]
async fn raster_export_waits_for_canvas_images() {
    let harness = Harness::new(
        MemoryLiveTree::new(),
        r#"<img src="a.png"><img src="b.png">"#,
        "",
    );
    let rasterizer = Arc::new(CountingRasterizer::default());
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::SelfSaved,
    ));
    let orchestrator = Arc::new(harness.orchestrator(rasterizer.clone(), converter));

    let task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.export_raster().await }
    });
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);

    let images = harness.editor.canvas_root().images();
    assert!(images[0].mark_loaded(10, 10));
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
    assert!(images[1].mark_failed());

    let artifact = task.await.expect("join").expect("raster export");

    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(rasterizer.pending_images_seen.load(Ordering::SeqCst), 0);
    assert!(matches!(artifact, ExportArtifact::Raster(ref image) if image.png == "png-bytes"));
    let downloads = harness.presenter.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].0, "email-template.png");
    assert_eq!(downloads[0].1, "image/png");
    assert_eq!(harness.tree.hidden_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn replacing_the_document_releases_a_waiting_raster_export() {
    let harness = Harness::new(
        MemoryLiveTree::with_loader(Arc::new(StalledLoader)),
        r#"<img src="https://cdn.example.com/slow.png">"#,
        "",
    );
    let rasterizer = Arc::new(CountingRasterizer::default());
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::SelfSaved,
    ));
    let orchestrator = Arc::new(harness.orchestrator(rasterizer.clone(), converter));
    let stale = harness.editor.canvas_root().images();

    let task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.export_raster().await }
    });
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);

    harness
        .editor
        .replace("<p>edited</p>", "")
        .expect("replace");

    let artifact = tokio::time::timeout(Duration::from_secs(3600), task)
        .await
        .expect("raster export settles after the canvas is replaced")
        .expect("join")
        .expect("raster export");

    assert!(matches!(artifact, ExportArtifact::Raster(_)));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(stale[0].state(), ImageState::Failed);
    assert_eq!(harness.tree.mounted_count(), 1);
}

#[tokio::test]
async fn bundle_export_wraps_markup_in_a_standalone_document() {
    let harness = Harness::new(MemoryLiveTree::new(), "<p>hi</p>", "p{color:red}");
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::SelfSaved,
    ));
    let orchestrator = harness.orchestrator(Arc::new(CountingRasterizer::default()), converter);

    let artifact = orchestrator
        .export(ExportKind::Bundle)
        .await
        .expect("bundle export");

    let ExportArtifact::Bundle(html) = artifact else {
        panic!("expected a bundle");
    };
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<style>p{color:red}</style>"));
    assert!(html.contains("<title>Email Template</title>"));
    let body_start = html.find("<body>").expect("body open") + "<body>".len();
    let body_end = html.find("</body>").expect("body close");
    assert_eq!(html[body_start..body_end].trim(), "<p>hi</p>");
    assert_eq!(harness.presenter.bundles(), vec![html]);
}

#[tokio::test]
async fn exports_capture_the_latest_document() {
    let harness = Harness::new(MemoryLiveTree::new(), "<p>one</p>", "");
    let converter = Arc::new(ObservingConverter::new(
        &harness.tree,
        ConvertOutcome::SelfSaved,
    ));
    let orchestrator = harness.orchestrator(Arc::new(CountingRasterizer::default()), converter);

    orchestrator.export_bundle().await.expect("first bundle");
    harness
        .editor
        .replace("<p>two</p>", "p{color:blue}")
        .expect("replace");
    orchestrator.export_bundle().await.expect("second bundle");

    let bundles = harness.presenter.bundles();
    assert!(bundles[0].contains("<p>one</p>"));
    assert!(bundles[1].contains("<p>two</p>"));
    assert!(bundles[1].contains("<style>p{color:blue}</style>"));
    assert_eq!(harness.editor.html(), "<p>two</p>");
}

#[tokio::test]
async fn second_export_is_rejected_while_one_is_running() {
    let harness = Harness::new(MemoryLiveTree::new(), "<p>hi</p>", "");
    let converter = Arc::new(BlockingConverter::default());
    let orchestrator = Arc::new(harness.orchestrator(
        Arc::new(CountingRasterizer::default()),
        converter.clone(),
    ));

    let running = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.export_document().await }
    });
    converter.entered.notified().await;

    for kind in [ExportKind::Bundle, ExportKind::Raster, ExportKind::Document] {
        let err = orchestrator.export(kind).await.expect_err("busy");
        assert!(matches!(err, ExportError::Busy));
    }
    assert_eq!(harness.tree.hidden_count(), 1);

    converter.release.notify_one();
    running.await.expect("join").expect("first export");
    assert_eq!(harness.tree.hidden_count(), 0);

    orchestrator
        .export_bundle()
        .await
        .expect("exports resume once idle");
}
