//! Per-source extraction rules.
//!
//! Every source shares one classification algorithm; what differs between
//! sites is captured here as data. The built-in values were tuned against
//! the live home pages and are expected to drift as the markup changes.
//!
//! # Built-in Sources
//!
//! | Source | Home page | Title chars | Article patterns |
//! |--------|-----------|-------------|------------------|
//! | 新浪科技 | `https://tech.sina.com.cn/` | 8..=120 | `/doc-`, `/tech/`, ... |
//! | IT之家 | `https://www.ithome.com/` | 4..=100 | none |

use serde::{Deserialize, Serialize};

/// A writing system a title must contain at least one character of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    /// CJK unified ideographs, U+4E00..=U+9FFF.
    Han,
}

impl Script {
    pub fn contains(&self, c: char) -> bool {
        match self {
            Script::Han => ('\u{4e00}'..='\u{9fff}').contains(&c),
        }
    }

    pub fn appears_in(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

/// An href pattern marking a story permalink.
///
/// In YAML either a plain string (`"/doc-"`) or `{ all_of: [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticlePattern {
    Contains(String),
    AllOf { all_of: Vec<String> },
}

impl ArticlePattern {
    pub fn all_of<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArticlePattern::AllOf {
            all_of: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, href: &str) -> bool {
        match self {
            ArticlePattern::Contains(needle) => href.contains(needle.as_str()),
            ArticlePattern::AllOf { all_of } => {
                !all_of.is_empty() && all_of.iter().all(|needle| href.contains(needle.as_str()))
            }
        }
    }
}

/// Predicates and thresholds the classifier applies to one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRule {
    /// Shortest accepted title, inclusive.
    pub min_title_chars: usize,
    /// Longest accepted title, inclusive.
    pub max_title_chars: usize,
    /// The href host must contain one of these. Empty means any host.
    pub required_domains: Vec<String>,
    /// Any of these in the href rejects the link.
    pub excluded_markers: Vec<String>,
    /// Titles equal to, or starting with, one of these are navigation.
    pub nav_labels: Vec<String>,
    pub required_script: Option<Script>,
    pub article_patterns: Vec<ArticlePattern>,
}

impl Default for ExtractionRule {
    fn default() -> Self {
        Self {
            min_title_chars: 4,
            max_title_chars: 120,
            required_domains: Vec::new(),
            excluded_markers: vec!["javascript:".to_string()],
            nav_labels: Vec::new(),
            required_script: Some(Script::Han),
            article_patterns: Vec::new(),
        }
    }
}

impl ExtractionRule {
    /// Rule for the Sina tech channel, whose home page mixes story links
    /// with a dense channel bar.
    pub fn sina_tech() -> Self {
        Self {
            min_title_chars: 8,
            max_title_chars: 120,
            required_domains: strings(["sina.com"]),
            excluded_markers: strings(["javascript:", "comment"]),
            nav_labels: strings([
                "首页", "客户端", "微博", "视频", "体育", "财经", "博客", "游戏", "众测", "GIF",
                "科学大家", "新浪",
            ]),
            required_script: Some(Script::Han),
            article_patterns: vec![
                ArticlePattern::Contains("/doc-".to_string()),
                ArticlePattern::Contains("/tech/".to_string()),
                ArticlePattern::Contains("finance.sina.com.cn/tech".to_string()),
                ArticlePattern::all_of(["sina.com.cn", "doc-"]),
                ArticlePattern::all_of(["sina.com.cn", "article"]),
            ],
        }
    }

    /// Rule for IT之家. Its home page is mostly story links already, so
    /// nothing is promoted and scan order is kept.
    pub fn ithome() -> Self {
        Self {
            min_title_chars: 4,
            max_title_chars: 100,
            required_domains: strings(["ithome.com"]),
            excluded_markers: strings(["javascript:"]),
            nav_labels: Vec::new(),
            required_script: Some(Script::Han),
            article_patterns: Vec::new(),
        }
    }
}

/// A news site to scrape, in priority order within the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub rule: ExtractionRule,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, rule: ExtractionRule) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            rule,
        }
    }
}

/// The sources used when no config file names any.
pub fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("新浪科技", "https://tech.sina.com.cn/", ExtractionRule::sina_tech()),
        SourceConfig::new("IT之家", "https://www.ithome.com/", ExtractionRule::ithome()),
    ]
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_han_script_detection() {
        assert!(Script::Han.appears_in("Apple 发布 iPhone"));
        assert!(!Script::Han.appears_in("Apple releases iPhone"));
        // Hiragana is outside the unified ideograph block.
        assert!(!Script::Han.appears_in("ひらがな"));
    }

    #[test]
    fn test_article_pattern_contains() {
        let p = ArticlePattern::Contains("/doc-".to_string());
        assert!(p.matches("https://finance.sina.com.cn/doc-abc.shtml"));
        assert!(!p.matches("https://tech.sina.com.cn/mobile/"));
    }

    #[test]
    fn test_article_pattern_all_of_requires_every_part() {
        let p = ArticlePattern::all_of(["sina.com.cn", "article"]);
        assert!(p.matches("https://k.sina.com.cn/article_123.html"));
        assert!(!p.matches("https://example.com/article_123.html"));
        assert!(!ArticlePattern::all_of(Vec::<String>::new()).matches("anything"));
    }

    #[test]
    fn test_rule_from_yaml_with_defaults() {
        let yaml = r#"
min_title_chars: 6
required_domains: ["36kr.com"]
article_patterns:
  - "/p/"
  - all_of: ["36kr.com", "newsflashes"]
"#;
        let rule: ExtractionRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.min_title_chars, 6);
        assert_eq!(rule.max_title_chars, 120);
        assert_eq!(rule.required_script, Some(Script::Han));
        assert_eq!(rule.article_patterns.len(), 2);
        assert_eq!(rule.article_patterns[1], ArticlePattern::all_of(["36kr.com", "newsflashes"]));
    }

    #[test]
    fn test_required_script_can_be_disabled() {
        let rule: ExtractionRule = serde_yaml::from_str("required_script: null").unwrap();
        assert_eq!(rule.required_script, None);
    }

    #[test]
    fn test_builtin_sources_priority_order() {
        let sources = builtin_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "新浪科技");
        assert_eq!(sources[1].name, "IT之家");
        assert!(sources[1].rule.article_patterns.is_empty());
    }
}
