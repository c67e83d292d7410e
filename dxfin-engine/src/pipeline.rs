use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dxfin_core::drawing::{Drawing, Entity, ImportSummary};
use dxfin_core::settings::ImportSettings;
use dxfin_io::{DrawingLoader, DxfError, DxfFacade};
use tracing::{debug, info, warn};

use crate::assembler::assemble_drawing;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::{FailureKind, ImportError};
use crate::placement::{apply_placement, compute_placement};
use crate::units::UnitResolver;

/// 超过该高度（图形单位）的文字在开启修正时缩小为十分之一。
const OVERSIZED_TEXT_HEIGHT: f64 = 15.0;
const FONT_HEIGHT_CORRECTION: f64 = 0.1;

/// 导入流程的状态，严格按顺序推进，任一阶段都可能转入 `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    Validating,
    Parsing,
    Transforming,
    Assembling,
    Done,
    Failed(FailureKind),
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::Idle => "idle",
            ImportState::Validating => "validating",
            ImportState::Parsing => "parsing",
            ImportState::Transforming => "transforming",
            ImportState::Assembling => "assembling",
            ImportState::Done => "done",
            ImportState::Failed(_) => "failed",
        };
        f.write_str(name)
    }
}

/// 跨线程共享的取消标记，只在阶段之间检查。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 接收状态变化（例如驱动进度条）。
pub trait ProgressObserver: Send + Sync {
    fn state_changed(&self, state: ImportState);
}

/// 成功导入的结果：交给宿主的绘图与非致命提示。
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub drawing: Drawing,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportOutcome {
    #[inline]
    pub fn summary(&self) -> ImportSummary {
        self.drawing.summary()
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.kind == kind)
    }
}

/// 依次执行校验、解析、变换、组装。每次 `run` 独立持有全部中间状态。
pub struct Importer<L: DrawingLoader = DxfFacade> {
    loader: L,
    state: ImportState,
    cancellation: CancellationToken,
    observer: Option<Box<dyn ProgressObserver>>,
}

impl Importer<DxfFacade> {
    pub fn new() -> Self {
        Self::with_loader(DxfFacade::new())
    }
}

impl Default for Importer<DxfFacade> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: DrawingLoader> Importer<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            state: ImportState::Idle,
            cancellation: CancellationToken::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// 供其他线程请求取消的句柄。
    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    #[inline]
    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn run(&mut self, settings: &ImportSettings) -> Result<ImportOutcome, ImportError> {
        self.transition(ImportState::Idle);
        let result = self.execute(settings);
        match &result {
            Ok(outcome) => {
                self.transition(ImportState::Done);
                let summary = outcome.summary();
                info!(
                    drawing = outcome.drawing.name(),
                    layers = summary.layers,
                    entities = outcome.drawing.entity_count(),
                    diagnostics = outcome.diagnostics.len(),
                    "导入完成"
                );
            }
            Err(err) => {
                warn!(error = %err, "导入失败");
                self.transition(ImportState::Failed(err.kind()));
            }
        }
        result
    }

    fn execute(&mut self, settings: &ImportSettings) -> Result<ImportOutcome, ImportError> {
        let path = settings.file_path.as_path();

        self.enter(ImportState::Validating)?;
        validate_source(path)?;

        self.enter(ImportState::Parsing)?;
        let parsed = self
            .loader
            .load(path)
            .map_err(|err| parse_failure(path, err))?;
        if !parsed.reached_eof {
            warn!(path = %path.display(), "文件缺少 EOF 标记，按已读内容导入");
        }

        self.enter(ImportState::Transforming)?;
        let mut diagnostics: Vec<Diagnostic> = parsed
            .skipped
            .iter()
            .map(|skipped| Diagnostic::new(DiagnosticKind::UnsupportedEntity, skipped.to_string()))
            .collect();

        let resolver = UnitResolver::new(settings.host_unit);
        let unit = resolver.resolve(settings.unit, parsed.header.insertion_units);
        if unit.source.is_assumed() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnitAssumed,
                format!("文件未声明插入单位，按{}处理", unit.source.unit()),
            ));
        }

        let bounds = parsed.bounds(settings.import_text);
        let mut entities = parsed.entities;
        if !settings.import_text {
            entities.retain(|entity| !matches!(entity, Entity::Text(_)));
        } else if settings.fix_font_heights {
            fix_font_heights(&mut entities);
        }

        let outcome = compute_placement(&bounds, unit.factor, settings.placement);
        if outcome.empty {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::EmptyDrawing,
                "没有可导入的几何图形，放置设置未生效",
            ));
        }
        apply_placement(&mut entities, &outcome.placement.transform);

        self.enter(ImportState::Assembling)?;
        let drawing = assemble_drawing(
            &settings.drawing_name,
            entities,
            &parsed.layers,
            unit,
            outcome.placement,
        )?;

        Ok(ImportOutcome {
            drawing,
            diagnostics,
        })
    }

    /// 在阶段边界检查取消请求，然后进入下一阶段。
    fn enter(&mut self, state: ImportState) -> Result<(), ImportError> {
        if self.cancellation.is_cancelled() {
            debug!(%state, "导入已取消");
            return Err(ImportError::Cancelled { stage: state });
        }
        self.transition(state);
        Ok(())
    }

    fn transition(&mut self, state: ImportState) {
        self.state = state;
        debug!(%state, "导入状态变化");
        if let Some(observer) = &self.observer {
            observer.state_changed(state);
        }
    }
}

/// 使用默认 DXF 读取器执行一次导入。
pub fn import_file(settings: &ImportSettings) -> Result<ImportOutcome, ImportError> {
    Importer::new().run(settings)
}

/// 只检查文件存在且可打开，不读取内容。
fn validate_source(path: &Path) -> Result<(), ImportError> {
    if path.as_os_str().is_empty() {
        return Err(ImportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ImportError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Err(ImportError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    File::open(path).map_err(|source| ImportError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn parse_failure(path: &Path, err: DxfError) -> ImportError {
    match err {
        DxfError::MalformedToken { line, message } => ImportError::Parse {
            path: path.to_path_buf(),
            stage: ImportState::Parsing,
            line,
            message,
        },
        DxfError::Read { path, source } => ImportError::Unreadable { path, source },
    }
}

fn fix_font_heights(entities: &mut [Entity]) {
    for entity in entities {
        if let Entity::Text(text) = entity
            && text.height > OVERSIZED_TEXT_HEIGHT
        {
            text.height *= FONT_HEIGHT_CORRECTION;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use dxfin_core::settings::{PlacementMode, UnitSelection};
    use dxfin_io::{ParsedDrawing, parse_str};

    use super::*;

    /// 返回固定解析结果并记录调用次数的读取器。
    struct StubLoader {
        source: &'static str,
        calls: Cell<usize>,
    }

    impl StubLoader {
        fn new(source: &'static str) -> Self {
            Self {
                source,
                calls: Cell::new(0),
            }
        }
    }

    impl DrawingLoader for StubLoader {
        fn load(&self, _path: &Path) -> Result<ParsedDrawing, DxfError> {
            self.calls.set(self.calls.get() + 1);
            parse_str(self.source)
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        states: Arc<Mutex<Vec<ImportState>>>,
        cancel_on: Option<(ImportState, CancellationToken)>,
    }

    impl ProgressObserver for Recorder {
        fn state_changed(&self, state: ImportState) {
            if let Ok(mut states) = self.states.lock() {
                states.push(state);
            }
            if let Some((trigger, token)) = &self.cancel_on
                && *trigger == state
            {
                token.cancel();
            }
        }
    }

    const TWO_WALLS: &str = "0\nSECTION\n2\nHEADER\n9\n$INSUNITS\n70\n4\n0\nENDSEC\n\
0\nSECTION\n2\nENTITIES\n\
0\nLINE\n8\nWalls\n10\n0\n20\n0\n11\n10\n21\n0\n\
0\nLINE\n8\nWalls\n10\n10\n20\n0\n11\n10\n21\n10\n\
0\nTEXT\n8\nNotes\n10\n50\n20\n50\n40\n20\n1\nBig\n\
0\nENDSEC\n0\nEOF\n";

    fn existing_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("plan.dxf");
        std::fs::write(&path, "").expect("write placeholder");
        (dir, path)
    }

    #[test]
    fn states_progress_in_order() {
        let (_dir, path) = existing_file();
        let recorder = Recorder::default();
        let states = Arc::clone(&recorder.states);
        let mut importer =
            Importer::with_loader(StubLoader::new(TWO_WALLS)).with_observer(recorder);
        importer
            .run(&ImportSettings::new(&path, "Plan"))
            .expect("import should succeed");
        assert_eq!(importer.state(), ImportState::Done);
        let states = states.lock().expect("lock states").clone();
        assert_eq!(
            states,
            vec![
                ImportState::Idle,
                ImportState::Validating,
                ImportState::Parsing,
                ImportState::Transforming,
                ImportState::Assembling,
                ImportState::Done,
            ]
        );
    }

    #[test]
    fn missing_file_never_reaches_loader() {
        let loader = StubLoader::new(TWO_WALLS);
        let mut importer = Importer::with_loader(loader);
        for path in ["", "/definitely/not/here.dxf"] {
            let err = importer
                .run(&ImportSettings::new(path, "Plan"))
                .expect_err("missing file must fail");
            assert!(matches!(err, ImportError::FileNotFound { .. }));
            assert!(err.is_recoverable());
            assert_eq!(importer.state(), ImportState::Failed(FailureKind::FileNotFound));
        }
        assert_eq!(importer.loader.calls.get(), 0);
    }

    #[test]
    fn directory_is_unreadable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = Importer::with_loader(StubLoader::new(TWO_WALLS))
            .run(&ImportSettings::new(dir.path(), "Plan"))
            .expect_err("directory must fail");
        assert!(matches!(err, ImportError::Unreadable { .. }));
    }

    #[test]
    fn cancellation_is_honoured_at_next_boundary() {
        let (_dir, path) = existing_file();
        let token = CancellationToken::new();
        let recorder = Recorder {
            cancel_on: Some((ImportState::Parsing, token.clone())),
            ..Recorder::default()
        };
        let mut importer = Importer::with_loader(StubLoader::new(TWO_WALLS))
            .with_cancellation(token)
            .with_observer(recorder);
        let err = importer
            .run(&ImportSettings::new(&path, "Plan"))
            .expect_err("cancelled import must fail");
        assert!(matches!(
            err,
            ImportError::Cancelled {
                stage: ImportState::Transforming
            }
        ));
        assert_eq!(importer.loader.calls.get(), 1);
        assert_eq!(importer.state(), ImportState::Failed(FailureKind::Cancelled));
    }

    #[test]
    fn token_handed_out_cancels_before_validation() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(TWO_WALLS));
        importer.cancellation_token().cancel();
        let err = importer
            .run(&ImportSettings::new(&path, "Plan"))
            .expect_err("cancelled import must fail");
        assert!(matches!(
            err,
            ImportError::Cancelled {
                stage: ImportState::Validating
            }
        ));
        assert_eq!(importer.loader.calls.get(), 0);
    }

    #[test]
    fn text_flag_and_font_fix() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(TWO_WALLS));

        let without_text = importer
            .run(&ImportSettings::new(&path, "Plan").with_import_text(false))
            .expect("import should succeed");
        assert_eq!(without_text.summary().texts, 0);
        assert!(without_text.drawing.layer("Notes").is_none());

        let fixed = importer
            .run(&ImportSettings::new(&path, "Plan").with_fix_font_heights(true))
            .expect("import should succeed");
        let height = fixed
            .drawing
            .entities()
            .find_map(|entity| match entity {
                Entity::Text(text) => Some(text.height),
                _ => None,
            })
            .expect("text entity");
        assert!((height - 2.0).abs() < 1e-12);
    }

    #[test]
    fn solids_are_counted_in_summary() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(
            "0\nSECTION\n2\nENTITIES\n\
0\nSOLID\n8\nFill\n10\n0\n20\n0\n11\n4\n21\n0\n12\n0\n22\n2\n13\n4\n23\n2\n\
0\nENDSEC\n0\nEOF\n",
        ));
        let outcome = importer
            .run(
                &ImportSettings::new(&path, "Plan")
                    .with_unit(UnitSelection::Centimeter)
                    .with_placement(PlacementMode::CenterOfDrawing),
            )
            .expect("import should succeed");
        let summary = outcome.summary();
        assert_eq!(summary.solids, 1);
        assert!(summary.to_string().contains("Solids:\t\t1"));
        let bounds = outcome.drawing.bounds().expect("solid bounds");
        assert!((bounds.min().x() + 20.0).abs() < 1e-9);
        assert!((bounds.max().y() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn dropped_text_does_not_shift_center() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(TWO_WALLS));
        let outcome = importer
            .run(
                &ImportSettings::new(&path, "Plan")
                    .with_import_text(false)
                    .with_placement(PlacementMode::CenterOfDrawing),
            )
            .expect("import should succeed");
        let translation = outcome.drawing.placement().transform.translation;
        assert_eq!((translation.x(), translation.y()), (-5.0, -5.0));
    }

    #[test]
    fn blank_drawing_name_fails_at_assembly() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(TWO_WALLS));
        let err = importer
            .run(&ImportSettings::new(&path, "  "))
            .expect_err("blank name must fail");
        assert!(matches!(err, ImportError::InvalidName));
        assert_eq!(importer.state(), ImportState::Failed(FailureKind::InvalidName));
    }

    #[test]
    fn empty_drawing_is_a_warning() {
        let (_dir, path) = existing_file();
        let mut importer = Importer::with_loader(StubLoader::new(
            "0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n",
        ));
        let outcome = importer
            .run(
                &ImportSettings::new(&path, "Plan")
                    .with_placement(PlacementMode::CustomCenter { x: 5.0, y: 5.0 }),
            )
            .expect("empty drawing still imports");
        assert!(outcome.drawing.is_empty());
        assert!(outcome.has_diagnostic(DiagnosticKind::EmptyDrawing));
        assert!(outcome.has_diagnostic(DiagnosticKind::UnitAssumed));
        assert!(outcome.drawing.placement().transform.translation.x().abs() < f64::EPSILON);
    }
}
