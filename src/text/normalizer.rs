//! 全角 → 半角归一化
//!
//! NFKC 折叠全角数字、全角拉丁字母等兼容字符，再显式处理全角空格

use unicode_normalization::{is_nfkc_quick, IsNormalized, UnicodeNormalization};

/// 全角空格（U+3000）
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// 归一化器（无状态）
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// 归一化文本
    ///
    /// 空串原样返回
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let folded: String = if is_nfkc_quick(text.chars()) == IsNormalized::Yes {
            text.to_string()
        } else {
            text.nfkc().collect()
        };

        // 并非所有 NFKC 实现都会折叠 U+3000，这里单独处理
        if folded.contains(IDEOGRAPHIC_SPACE) {
            folded.replace(IDEOGRAPHIC_SPACE, " ")
        } else {
            folded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullwidth_digits() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("０１２３"), "0123");
        assert_eq!(n.normalize("第１０巻"), "第10巻");
    }

    #[test]
    fn test_ideographic_space() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("巻　１"), "巻 1");
        assert_eq!(n.normalize("　"), " ");
    }

    #[test]
    fn test_fullwidth_latin_and_symbols() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("ＡＢＣｘｙｚ"), "ABCxyz");
        assert_eq!(n.normalize("（５）"), "(5)");
        assert_eq!(n.normalize("ﾃｽﾄ"), "テスト");
    }

    #[test]
    fn test_empty_and_plain() {
        let n = Normalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("plain title"), "plain title");
        assert_eq!(n.normalize("転生したらスライムだった件"), "転生したらスライムだった件");
    }
}
