pub mod encoding;
pub mod parser;
pub mod reader;
mod text;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use parser::{
    EntityParser, EntityRecord, HeaderInfo, LayerDef, ParsedDrawing, RecordBody, SkipReason,
    SkippedEntity, SourceMarker,
};
pub use reader::{Token, TokenReader, TokenValue, ValueKind};

#[derive(Debug, Error)]
pub enum DxfError {
    /// 组码行无法解析或值行缺失，无法再对齐后续 token。
    #[error("第 {line} 行附近的 DXF 数据损坏: {message}")]
    MalformedToken { line: usize, message: String },
    #[error("failed to read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DxfError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedToken {
            line,
            message: message.into(),
        }
    }

    /// 出错位置（物理行号）；读取错误返回 `None`。
    pub fn line(&self) -> Option<usize> {
        match self {
            DxfError::MalformedToken { line, .. } => Some(*line),
            DxfError::Read { .. } => None,
        }
    }
}

/// 把文件解析为实体记录的入口，导入流程通过它与具体格式解耦。
pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<ParsedDrawing, DxfError>;
}

pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<ParsedDrawing, DxfError> {
        let bytes = fs::read(path).map_err(|source| DxfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "读取 DXF 文件");
        let source = encoding::decode_source(&bytes);
        parse_str(&source)
    }
}

/// 解析内存中的 DXF 文本。
pub fn parse_str(source: &str) -> Result<ParsedDrawing, DxfError> {
    EntityParser::new(source).parse()
}
