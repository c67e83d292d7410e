use std::iter::Peekable;
use std::str::Chars;

/// TEXT 单行文字：替换 `%%` 控制码与 `\U+XXXX` 转义。
pub(crate) fn decode_text_content(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '%' if chars.peek() == Some(&'%') => {
                chars.next();
                match chars.next() {
                    Some('c') | Some('C') => result.push('\u{2300}'),
                    Some('d') | Some('D') => result.push('\u{00b0}'),
                    Some('p') | Some('P') => result.push('\u{00b1}'),
                    Some('%') => result.push('%'),
                    // 上/下划线开关，直接丢弃
                    Some('u') | Some('U') | Some('o') | Some('O') => {}
                    Some(other) => {
                        result.push_str("%%");
                        result.push(other);
                    }
                    None => result.push_str("%%"),
                }
            }
            '\\' if matches!(chars.peek(), Some('U') | Some('u')) => {
                chars.next();
                push_unicode_escape(&mut chars, &mut result);
            }
            other => result.push(other),
        }
    }
    result
}

/// MTEXT 多行文字：`\P` 换行，去掉字体/高度/颜色等格式码与分组括号。
pub(crate) fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('P') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some('{') => result.push('{'),
                Some('}') => result.push('}'),
                Some('U') | Some('u') => push_unicode_escape(&mut chars, &mut result),
                Some('S') => {
                    let stacked = take_until_semicolon(&mut chars);
                    result.push_str(&stacked.replace(['^', '#'], "/"));
                }
                Some('f') | Some('F') | Some('H') | Some('h') | Some('C') | Some('c')
                | Some('A') | Some('a') | Some('W') | Some('w') | Some('Q') | Some('q')
                | Some('T') | Some('t') | Some('p') => {
                    take_until_semicolon(&mut chars);
                }
                Some('L') | Some('l') | Some('O') | Some('o') | Some('K') | Some('k') => {}
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            '{' | '}' => {}
            other => result.push(other),
        }
    }
    result
}

fn take_until_semicolon(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut taken = String::new();
    for next in chars.by_ref() {
        if next == ';' {
            break;
        }
        taken.push(next);
    }
    taken
}

fn push_unicode_escape(chars: &mut Peekable<Chars<'_>>, result: &mut String) {
    if chars.peek() != Some(&'+') {
        result.push_str("\\U");
        return;
    }
    chars.next();
    let mut digits = String::new();
    while digits.len() < 4 {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
        Some(decoded) if digits.len() == 4 => result.push(decoded),
        _ => {
            result.push_str("\\U+");
            result.push_str(&digits);
        }
    }
}
