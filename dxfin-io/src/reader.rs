use crate::DxfError;

/// 组码所对应的值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Real,
}

/// 组码区间到值类型的固定映射表，未列出的组码按文本处理。
pub fn value_kind(code: i32) -> ValueKind {
    match code {
        0..=9 => ValueKind::Text,
        10..=59 => ValueKind::Real,
        60..=99 => ValueKind::Integer,
        100..=109 => ValueKind::Text,
        110..=149 => ValueKind::Real,
        160..=179 => ValueKind::Integer,
        210..=239 => ValueKind::Real,
        270..=299 => ValueKind::Integer,
        300..=369 => ValueKind::Text,
        370..=389 => ValueKind::Integer,
        390..=399 => ValueKind::Text,
        400..=409 => ValueKind::Integer,
        410..=419 => ValueKind::Text,
        420..=459 => ValueKind::Integer,
        460..=469 => ValueKind::Real,
        470..=481 => ValueKind::Text,
        999..=1009 => ValueKind::Text,
        1010..=1059 => ValueKind::Real,
        1060..=1071 => ValueKind::Integer,
        _ => ValueKind::Text,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Integer(i64),
    Real(f64),
    /// 文本值，或无法按组码类型解析时保留的原始内容。
    Text(String),
}

/// 一个 (组码, 值) 对，`line` 为组码所在的物理行号（从 1 开始）。
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub code: i32,
    pub value: TokenValue,
    pub line: usize,
}

impl Token {
    pub fn decode(code: i32, raw: &str, line: usize) -> Self {
        let value = match value_kind(code) {
            ValueKind::Text => TokenValue::Text(raw.to_string()),
            ValueKind::Integer => match raw.trim().parse::<i64>() {
                Ok(value) => TokenValue::Integer(value),
                Err(_) => TokenValue::Text(raw.to_string()),
            },
            ValueKind::Real => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => TokenValue::Real(value),
                _ => TokenValue::Text(raw.to_string()),
            },
        };
        Self { code, value, line }
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            TokenValue::Real(value) => Some(value),
            TokenValue::Integer(value) => Some(value as f64),
            TokenValue::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            TokenValue::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// 原始文本；数值类型返回 `None`。
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// 组码 0 的实体/段标记。
    #[inline]
    pub fn marker(&self) -> Option<&str> {
        if self.code == 0 {
            self.as_text().map(str::trim)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_marker(&self, name: &str) -> bool {
        self.marker() == Some(name)
    }

    /// 便于诊断输出的值文本。
    pub fn raw(&self) -> String {
        match &self.value {
            TokenValue::Integer(value) => value.to_string(),
            TokenValue::Real(value) => value.to_string(),
            TokenValue::Text(text) => text.clone(),
        }
    }
}

/// 按行读取 DXF 文本，每两行组成一个 token；只能向前读取，支持回退一个 token。
pub struct TokenReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<Token>,
    line_number: usize,
    failed: bool,
}

impl<'a> TokenReader<'a> {
    pub fn new(source: &'a str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
            failed: false,
        }
    }

    /// 已消费的物理行数。
    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, DxfError> {
        if let Some(token) = self.buffer.take() {
            return Ok(Some(token));
        }
        if self.failed {
            return Ok(None);
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };
        let code_line_number = self.line_number;

        // 最后一个完整组码对之后只剩空行，视为流结束
        if code_line.trim().is_empty() && self.lines.clone().all(|line| line.trim().is_empty()) {
            self.lines.by_ref().for_each(drop);
            return Ok(None);
        }

        let code = match code_line.trim().parse::<i32>() {
            Ok(code) => code,
            Err(_) => {
                self.failed = true;
                return Err(DxfError::malformed(
                    code_line_number,
                    format!("组码 \"{}\" 无法解析为整数", code_line.trim()),
                ));
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                self.failed = true;
                return Err(DxfError::malformed(
                    code_line_number,
                    format!("文件在组码 {code} 之后结束，缺少对应的值行"),
                ));
            }
        };

        let value = value_line.trim_end_matches('\r');
        Ok(Some(Token::decode(code, value, code_line_number)))
    }

    /// 回退一个 token，下一次读取时原样返回。
    pub fn put_back(&mut self, token: Token) {
        debug_assert!(self.buffer.is_none(), "只允许回退一个 token");
        self.buffer = Some(token);
    }
}

impl Iterator for TokenReader<'_> {
    type Item = Result<Token, DxfError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
