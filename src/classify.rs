// src/classify.rs
//
// Line classification: an ordered table of (category, keyword set) rules,
// case-insensitive containment, first match wins.

use std::path::Path;

use crossterm::style::Color;
use serde::Deserialize;

use crate::error::CaptureError;

/// Line categories, in default precedence order. A line gets at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Error,
    Mqtt,
    Success,
    Warning,
    Modem,
    Debug,
}

pub const CATEGORY_COUNT: usize = 6;

impl Category {
    /// Every category, in default precedence order.
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::Error,
        Category::Mqtt,
        Category::Success,
        Category::Warning,
        Category::Modem,
        Category::Debug,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in the statistics footer and the rules file.
    pub fn label(self) -> &'static str {
        match self {
            Category::Error => "error",
            Category::Mqtt => "mqtt",
            Category::Success => "success",
            Category::Warning => "warning",
            Category::Modem => "air780eg",
            Category::Debug => "debug",
        }
    }

    /// Console colour for this category. Markup is console-only and never
    /// reaches the log file.
    pub fn colour(self) -> Color {
        match self {
            Category::Error => Color::Red,
            Category::Mqtt => Color::Blue,
            Category::Success => Color::Green,
            Category::Warning => Color::Yellow,
            Category::Modem => Color::Cyan,
            Category::Debug => Color::Grey,
        }
    }

    fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// One ordered classification rule.
#[derive(Clone, Debug)]
pub struct Rule {
    pub category: Category,
    /// Stored lowercased; matching is containment against the lowercased line.
    pub keywords: Vec<String>,
}

impl Rule {
    fn new(category: Category, keywords: &[&str]) -> Self {
        Rule {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// The ordered rule table. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    /// Built-in table, tuned for ESP32 firmware logs with an Air780EG modem.
    /// Error and success keyword sets are bilingual because the firmware
    /// logs in both English and Chinese.
    fn default() -> Self {
        RuleSet {
            rules: vec![
                Rule::new(Category::Error, &["error", "failed", "fail", "失败", "错误"]),
                Rule::new(Category::Mqtt, &["mqtt"]),
                Rule::new(
                    Category::Success,
                    &["success", "ok", "connected", "成功", "连接"],
                ),
                Rule::new(Category::Warning, &["warning", "warn", "警告"]),
                Rule::new(Category::Modem, &["air780eg"]),
                Rule::new(Category::Debug, &["[debug]"]),
            ],
        }
    }
}

#[derive(Deserialize)]
struct RulesFile {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleEntry>,
}

#[derive(Deserialize)]
struct RuleEntry {
    category: String,
    keywords: Vec<String>,
}

impl RuleSet {
    /// First-match-wins classification. Pure function of the line and the
    /// table; repeated calls always agree.
    pub fn classify(&self, line: &str) -> Option<Category> {
        let lower = line.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|r| r.category)
    }

    /// Load a rule table from a TOML file. The file replaces the built-in
    /// table entirely: entry order in the file is precedence order.
    pub fn load(path: &Path) -> Result<RuleSet, CaptureError> {
        let invalid = |reason: String| CaptureError::RulesFileInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        RuleSet::parse(&text).map_err(invalid)
    }

    fn parse(text: &str) -> Result<RuleSet, String> {
        let file: RulesFile = toml::from_str(text).map_err(|e| e.to_string())?;
        if file.rules.is_empty() {
            return Err("no [[rule]] entries".to_string());
        }
        let mut rules = Vec::with_capacity(file.rules.len());
        for entry in file.rules {
            let category = Category::from_label(&entry.category)
                .ok_or_else(|| format!("unknown category {:?}", entry.category))?;
            if entry.keywords.is_empty() {
                return Err(format!("category {:?} has no keywords", entry.category));
            }
            rules.push(Rule {
                category,
                keywords: entry.keywords.iter().map(|k| k.to_lowercase()).collect(),
            });
        }
        Ok(RuleSet { rules })
    }
}
