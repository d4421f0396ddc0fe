//! ログ出力前に外部由来の文字列を無害化する。
//!
//! Webhook の payload やヘッダはすべて信頼できない入力として扱う。
//! 制御文字（改行を含む）を取り除いてログ行の偽造を防ぎ、
//! フォーマットトークン (`{`, `}`, `%`) は二重化してエスケープする。

/// 無害化後の最大文字数
pub const MAX_LOG_FIELD_CHARS: usize = 256;

const TRUNCATION_MARKER: char = '…';

/// 外部由来の文字列をログに出せる形に変換する
///
/// # Examples
///
/// ```
/// use meetboard_shared::sanitize::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("weekly\nsync {id} 100%"), "weeklysync {{id}} 100%%");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let mut output = String::with_capacity(input.len().min(MAX_LOG_FIELD_CHARS));
    let mut written = 0usize;

    for ch in input.chars() {
        if ch.is_control() {
            continue;
        }
        let escaped_len = match ch {
            '{' | '}' | '%' => 2,
            _ => 1,
        };
        if written + escaped_len > MAX_LOG_FIELD_CHARS {
            output.push(TRUNCATION_MARKER);
            return output;
        }
        output.push(ch);
        if escaped_len == 2 {
            output.push(ch);
        }
        written += escaped_len;
    }

    output
}
