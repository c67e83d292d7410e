//! 非 UTF-8 输入按 `$DWGCODEPAGE` 声明的代码页解码（AutoCAD 2007 之前的文件常见）。

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::debug;

/// 代码页名称到 `encoding_rs` 编码的映射，大小写不敏感。
pub fn encoding_from_code_page(code_page: &str) -> Option<&'static Encoding> {
    let normalized = code_page.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "ansi_874" => Some(encoding_rs::WINDOWS_874),
        "ansi_932" => Some(encoding_rs::SHIFT_JIS),
        "ansi_936" | "gb2312" => Some(encoding_rs::GBK),
        "ansi_949" | "korean" | "johab" => Some(encoding_rs::EUC_KR),
        "ansi_950" | "big5" => Some(encoding_rs::BIG5),
        "ansi_1250" | "dos852" => Some(encoding_rs::WINDOWS_1250),
        "ansi_1251" => Some(encoding_rs::WINDOWS_1251),
        "ansi_1252" | "dos850" | "iso8859-1" | "iso_8859-1" => Some(encoding_rs::WINDOWS_1252),
        "ansi_1253" | "dos869" => Some(encoding_rs::WINDOWS_1253),
        "ansi_1254" | "dos857" => Some(encoding_rs::WINDOWS_1254),
        "ansi_1255" => Some(encoding_rs::WINDOWS_1255),
        "ansi_1256" => Some(encoding_rs::WINDOWS_1256),
        "ansi_1257" => Some(encoding_rs::WINDOWS_1257),
        "ansi_1258" => Some(encoding_rs::WINDOWS_1258),
        "dos855" | "dos866" => Some(encoding_rs::IBM866),
        "iso8859-2" | "iso_8859-2" => Some(encoding_rs::ISO_8859_2),
        "utf-8" | "utf8" => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// 解码原始字节。合法 UTF-8 直接借用；否则先用 Windows-1252 粗读出
/// `$DWGCODEPAGE`，再用其对应编码解码，找不到时保持 Windows-1252。
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let (fallback, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    let encoding = find_code_page(&fallback)
        .and_then(encoding_from_code_page)
        .unwrap_or(encoding_rs::WINDOWS_1252);
    debug!(encoding = encoding.name(), "输入不是 UTF-8，按代码页解码");
    if encoding == encoding_rs::WINDOWS_1252 {
        return Cow::Owned(fallback.into_owned());
    }
    let (decoded, _, _) = encoding.decode(bytes);
    Cow::Owned(decoded.into_owned())
}

fn find_code_page(text: &str) -> Option<&str> {
    let mut lines = text.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if line.eq_ignore_ascii_case("$DWGCODEPAGE") {
            let code = lines.next()?;
            let value = lines.next()?;
            return (code == "3").then_some(value);
        }
        if line == "ENTITIES" {
            break;
        }
    }
    None
}
