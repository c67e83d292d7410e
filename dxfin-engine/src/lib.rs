pub mod assembler;
pub mod pipeline;
pub mod placement;
pub mod units;

pub use assembler::assemble_drawing;
pub use pipeline::{
    CancellationToken, ImportOutcome, ImportState, Importer, ProgressObserver, import_file,
};
pub use placement::{PlacementOutcome, compute_placement};
pub use units::UnitResolver;

pub mod errors {
    use std::io;
    use std::path::PathBuf;

    use thiserror::Error;

    use crate::pipeline::ImportState;

    #[derive(Debug, Error)]
    pub enum ImportError {
        #[error("file not found: {}", path.display())]
        FileNotFound { path: PathBuf },
        #[error("failed to convert {}: {source}", path.display())]
        Unreadable {
            path: PathBuf,
            #[source]
            source: io::Error,
        },
        #[error("failed to parse {} during {stage} (line {line}): {message}", path.display())]
        Parse {
            path: PathBuf,
            stage: ImportState,
            line: usize,
            message: String,
        },
        #[error("drawing name must not be empty")]
        InvalidName,
        #[error("import cancelled before {stage}")]
        Cancelled { stage: ImportState },
    }

    /// `Failed` 状态中记录的失败类别。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailureKind {
        FileNotFound,
        Unreadable,
        Parse,
        InvalidName,
        Cancelled,
    }

    impl ImportError {
        pub fn kind(&self) -> FailureKind {
            match self {
                ImportError::FileNotFound { .. } => FailureKind::FileNotFound,
                ImportError::Unreadable { .. } => FailureKind::Unreadable,
                ImportError::Parse { .. } => FailureKind::Parse,
                ImportError::InvalidName => FailureKind::InvalidName,
                ImportError::Cancelled { .. } => FailureKind::Cancelled,
            }
        }

        /// 调用方可以修正输入后重试（重新选择文件或填写名称）。
        #[inline]
        pub fn is_recoverable(&self) -> bool {
            matches!(
                self,
                ImportError::FileNotFound { .. } | ImportError::InvalidName
            )
        }
    }
}

pub mod diagnostics {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    /// 不影响导入成功的提示。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DiagnosticKind {
        UnsupportedEntity,
        UnitAssumed,
        EmptyDrawing,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Diagnostic {
        pub kind: DiagnosticKind,
        pub message: String,
    }

    impl Diagnostic {
        pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
            Self {
                kind,
                message: message.into(),
            }
        }
    }

    impl fmt::Display for Diagnostic {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }
}
