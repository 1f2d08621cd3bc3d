//! Syntax highlighting module using syntect-assets (bat themes)
//!
//! Highlights one column of an aligned diff at a time and returns per-row
//! highlight ranges. Blank filler rows are not fed to the parser.

use anyhow::Result;
use syntect::easy::HighlightLines;
use syntect::highlighting::FontStyle;
use syntect_assets::assets::HighlightingAssets;

use crate::diff::{DiffLine, LineKind};

/// A simple style used for diff highlighting (foreground + modifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub fg: (u8, u8, u8),
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// A highlighted byte range within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxHighlight {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

/// Syntax highlighter using syntect parsers and themes
pub struct SyntaxHighlighter {
    assets: HighlightingAssets,
    theme_name: String,
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the bundled parsers and themes
    pub fn new(theme_name: Option<&str>) -> Result<Self> {
        let assets = HighlightingAssets::from_binary();
        let theme_name = theme_name
            .map(|s| s.to_string())
            .or_else(|| std::env::var("BAT_THEME").ok())
            .unwrap_or_else(|| HighlightingAssets::default_theme().to_string());
        Ok(Self { assets, theme_name })
    }

    /// Highlight one diff column. The result has one entry per row.
    pub fn highlight_column(&self, lines: &[DiffLine], file_path: &str) -> Vec<Vec<SyntaxHighlight>> {
        let theme = self.assets.get_theme(&self.theme_name);
        let Ok(syntax_set) = self.assets.get_syntax_set() else {
            return vec![Vec::new(); lines.len()];
        };
        let syntax = syntax_set
            .find_syntax_for_file(file_path)
            .ok()
            .flatten()
            .or_else(|| {
                std::path::Path::new(file_path)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(|ext| syntax_set.find_syntax_by_extension(ext))
            })
            .unwrap_or_else(|| syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut per_line: Vec<Vec<SyntaxHighlight>> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.kind == LineKind::Blank {
                per_line.push(Vec::new());
                continue;
            }

            let text = format!("{}\n", line.content);
            let ranges = match highlighter.highlight_line(&text, syntax_set) {
                Ok(r) => r,
                Err(_) => {
                    per_line.push(Vec::new());
                    continue;
                }
            };

            let mut line_highlights: Vec<SyntaxHighlight> = Vec::new();
            let mut offset = 0usize;
            for (style, segment) in ranges {
                let len = segment.trim_end_matches('\n').len();
                if len == 0 {
                    continue;
                }
                line_highlights.push(SyntaxHighlight {
                    start: offset,
                    end: offset + len,
                    style: Self::to_text_style(style),
                });
                offset += len;
            }
            per_line.push(line_highlights);
        }

        per_line
    }

    fn to_text_style(style: syntect::highlighting::Style) -> TextStyle {
        let fg = (style.foreground.r, style.foreground.g, style.foreground.b);
        TextStyle {
            fg,
            bold: style.font_style.contains(FontStyle::BOLD),
            italic: style.font_style.contains(FontStyle::ITALIC),
            underline: style.font_style.contains(FontStyle::UNDERLINE),
        }
    }
}
