//! 改写规则表
//!
//! 包含禁用字符映射、保留设备名、符号映射、冒号空白、卷号模式。
//! 所有规则表在进程内只构建一次，之后只读。

use std::collections::HashSet;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::{Captures, Regex};

/// 全角冒号，转义之后冒号/卷号规则只认这一种形式
pub const FULLWIDTH_COLON: char = '：';

/// 卷号后缀
pub const VOLUME_SUFFIX: &str = "巻";

/// 文件系统禁用字符 → 外观相近的全角字符
///
/// 目标字符经 NFKC 会折回源字符，二次处理时会被再次转义为同一结果
const FORBIDDEN_MAP: [(char, char); 9] = [
    ('\\', '＼'),
    ('/', '／'),
    (':', '：'),
    ('*', '＊'),
    ('?', '？'),
    ('"', '＂'),
    ('<', '＜'),
    ('>', '＞'),
    ('|', '｜'),
];

lazy_static::lazy_static! {
    /// 保留设备名
    pub static ref RESERVED_NAMES: ReservedNames = ReservedNames::new();

    /// 符号映射（波浪线、省略号）
    pub static ref SYMBOL_REMAP: SymbolRemap = SymbolRemap::new();

    /// 冒号空白规则
    pub static ref COLON_SPACING: ColonSpacing = ColonSpacing::new();

    /// 卷号规则（按优先级排列）
    pub static ref VOLUME_RULES: VolumeRules = VolumeRules::new();
}

/// 禁用字符转义
///
/// 返回 Some(全角字符) 如果是禁用字符
pub fn escape_forbidden(ch: char) -> Option<char> {
    FORBIDDEN_MAP
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

/// 判断是否为需要删除的控制字符（U+0000 - U+001F）
pub fn is_stripped_control(ch: char) -> bool {
    ch <= '\u{1F}'
}

/// 保留设备名集合
pub struct ReservedNames {
    names: HashSet<String>,
}

impl ReservedNames {
    pub fn new() -> Self {
        let mut names: HashSet<String> = ["CON", "PRN", "AUX", "NUL"]
            .into_iter()
            .map(String::from)
            .collect();
        for n in 1..=9 {
            names.insert(format!("COM{}", n));
            names.insert(format!("LPT{}", n));
        }

        Self { names }
    }

    /// 整个字段是否为保留名（大小写不敏感）
    pub fn contains(&self, text: &str) -> bool {
        // 保留名都是 ASCII，先按长度过滤
        text.len() <= 4 && self.names.contains(&text.to_ascii_uppercase())
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self::new()
    }
}

/// 符号映射
///
/// 多个候选合并为一个自动机，最左优先匹配，不会重复替换
pub struct SymbolRemap {
    matcher: AhoCorasick,
    replacements: Vec<&'static str>,
}

impl SymbolRemap {
    pub fn new() -> Self {
        let table: [(&'static str, &'static str); 4] = [
            // 省略号
            ("...", "…"),
            // 波浪线变体
            ("~", "～"),
            ("∼", "～"),
            ("〜", "～"),
        ];

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(table.iter().map(|(from, _)| *from))
            .expect("symbol remap patterns are valid");
        let replacements = table.iter().map(|(_, to)| *to).collect();

        Self {
            matcher,
            replacements,
        }
    }

    /// 应用映射
    pub fn apply(&self, text: &str) -> String {
        self.matcher.replace_all(text, &self.replacements)
    }

    /// 是否包含待映射符号
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

impl Default for SymbolRemap {
    fn default() -> Self {
        Self::new()
    }
}

/// 冒号空白统一
///
/// 冒号（半角/全角）前后的空白折叠为 `"： "`；位于末尾的冒号不追加空格
pub struct ColonSpacing {
    pattern: Regex,
}

impl ColonSpacing {
    pub fn new() -> Self {
        let pattern = Regex::new(r"\s*[:：]\s*").expect("colon spacing pattern is valid");
        Self { pattern }
    }

    pub fn apply(&self, text: &str) -> String {
        let len = text.len();
        self.pattern
            .replace_all(text, |caps: &Captures| {
                let at_end = caps.get(0).map_or(false, |m| m.end() == len);
                if at_end {
                    FULLWIDTH_COLON.to_string()
                } else {
                    format!("{} ", FULLWIDTH_COLON)
                }
            })
            .into_owned()
    }
}

impl Default for ColonSpacing {
    fn default() -> Self {
        Self::new()
    }
}

/// 卷号规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRuleKind {
    /// `＞ 6` → `＞ 6巻`
    Chevron,
    /// `(6)` / `(6巻)` → ` 6巻`
    Parenthesized,
    /// `： 6` / `： 6巻` → ` 6巻`
    Colon,
}

struct VolumeRule {
    kind: VolumeRuleKind,
    pattern: Regex,
}

/// 卷号规则表
///
/// 均锚定在字符串末尾，按顺序尝试，首个命中即停止
pub struct VolumeRules {
    rules: Vec<VolumeRule>,
}

impl VolumeRules {
    pub fn new() -> Self {
        let table = [
            (VolumeRuleKind::Chevron, r"＞\s*([0-9]+)$"),
            // 前面的空白和悬空冒号一并吸收，否则第二遍会被冒号规则再次改写
            (VolumeRuleKind::Parenthesized, r"[\s：]*\(([0-9]+)巻?\)$"),
            (VolumeRuleKind::Colon, r"[\s：]*：\s*([0-9]+)巻?$"),
        ];

        let rules = table
            .into_iter()
            .map(|(kind, pattern)| VolumeRule {
                kind,
                pattern: Regex::new(pattern).expect("volume pattern is valid"),
            })
            .collect();

        Self { rules }
    }

    /// 应用第一条命中的规则
    ///
    /// 返回 Some((改写后文本, 规则类型))，无命中返回 None
    pub fn apply(&self, text: &str) -> Option<(String, VolumeRuleKind)> {
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let prefix = &text[..whole.start()];
            let digits = digits.as_str();
            let rewritten = match rule.kind {
                VolumeRuleKind::Chevron => format!("{}＞ {}{}", prefix, digits, VOLUME_SUFFIX),
                VolumeRuleKind::Parenthesized | VolumeRuleKind::Colon => {
                    if prefix.is_empty() {
                        format!("{}{}", digits, VOLUME_SUFFIX)
                    } else {
                        format!("{} {}{}", prefix, digits, VOLUME_SUFFIX)
                    }
                }
            };

            return Some((rewritten, rule.kind));
        }

        None
    }
}

impl Default for VolumeRules {
    fn default() -> Self {
        Self::new()
    }
}
