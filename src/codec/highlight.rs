//! Fenced code block highlighting.
//!
//! Highlighting emits class-based spans; the colours live in the stylesheet generated by
//! [theme_css], so every page shares one theme and pages stay small.

use once_cell::sync::Lazy;
use syntect::{
    highlighting::ThemeSet,
    html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

use crate::{error::SiteError, html::escape_html};

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Highlight `code` written in `lang` as an HTML `<pre>` block.
///
/// Unknown languages are highlighted as plain text, which still escapes the code.
pub fn highlight(code: &str, lang: &str) -> Result<String, SiteError> {
    let syntax = SYNTAXES
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(format!(
        "<pre class=\"code\" data-lang=\"{}\"><code>{}</code></pre>\n",
        escape_html(lang),
        generator.finalize()
    ))
}

/// Stylesheet rules for the named theme.
pub fn theme_css(theme: &str) -> Result<String, SiteError> {
    let theme = THEMES.themes.get(theme).ok_or_else(|| {
        SiteError::Config(format!(
            "unknown highlight theme '{theme}' (available: {})",
            available_themes().join(", ")
        ))
    })?;
    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}

pub fn available_themes() -> Vec<String> {
    THEMES.themes.keys().cloned().collect()
}
