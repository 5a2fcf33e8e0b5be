//! Math-markup rendering: rewrites LaTeX-like commands, fractions, roots,
//! and sub/superscripts into plain Unicode.
//!
//! The passes are strictly ordered and each consumes every non-overlapping
//! match in the string before the next pass runs. A pass whose pattern
//! fails to compile degrades to the identity transform (logged once);
//! rendering never fails on malformed input.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

/// Command token → replacement glyph, longest token first.
static COMMAND_GLYPHS: &[(&str, &str)] = &[
    ("rightarrow", "→"),
    ("leftarrow", "←"),
    ("approx", "≈"),
    ("lambda", "λ"),
    ("infty", "∞"),
    ("sigma", "σ"),
    ("alpha", "α"),
    ("delta", "δ"),
    ("gamma", "γ"),
    ("theta", "θ"),
    ("times", "×"),
    ("cdot", "·"),
    ("beta", "β"),
    ("prod", "Π"),
    ("neq", "≠"),
    ("leq", "≤"),
    ("geq", "≥"),
    ("sum", "Σ"),
    ("pm", "±"),
    ("pi", "π"),
    ("mu", "μ"),
    ("to", "→"),
];

static SUPERSCRIPTS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('0', '⁰'),
        ('1', '¹'),
        ('2', '²'),
        ('3', '³'),
        ('4', '⁴'),
        ('5', '⁵'),
        ('6', '⁶'),
        ('7', '⁷'),
        ('8', '⁸'),
        ('9', '⁹'),
        ('+', '⁺'),
        ('-', '⁻'),
        ('=', '⁼'),
        ('(', '⁽'),
        (')', '⁾'),
        ('a', 'ᵃ'),
        ('b', 'ᵇ'),
        ('c', 'ᶜ'),
        ('d', 'ᵈ'),
        ('e', 'ᵉ'),
        ('f', 'ᶠ'),
        ('g', 'ᵍ'),
        ('h', 'ʰ'),
        ('i', 'ⁱ'),
        ('j', 'ʲ'),
        ('k', 'ᵏ'),
        ('l', 'ˡ'),
        ('m', 'ᵐ'),
        ('n', 'ⁿ'),
        ('o', 'ᵒ'),
        ('p', 'ᵖ'),
        ('r', 'ʳ'),
        ('s', 'ˢ'),
        ('t', 'ᵗ'),
        ('u', 'ᵘ'),
        ('v', 'ᵛ'),
        ('w', 'ʷ'),
        ('x', 'ˣ'),
        ('y', 'ʸ'),
        ('z', 'ᶻ'),
    ]
    .into_iter()
    .collect()
});

static SUBSCRIPTS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('0', '₀'),
        ('1', '₁'),
        ('2', '₂'),
        ('3', '₃'),
        ('4', '₄'),
        ('5', '₅'),
        ('6', '₆'),
        ('7', '₇'),
        ('8', '₈'),
        ('9', '₉'),
        ('+', '₊'),
        ('-', '₋'),
        ('=', '₌'),
        ('(', '₍'),
        (')', '₎'),
        ('a', 'ₐ'),
        ('e', 'ₑ'),
        ('h', 'ₕ'),
        ('i', 'ᵢ'),
        ('j', 'ⱼ'),
        ('k', 'ₖ'),
        ('l', 'ₗ'),
        ('m', 'ₘ'),
        ('n', 'ₙ'),
        ('o', 'ₒ'),
        ('p', 'ₚ'),
        ('r', 'ᵣ'),
        ('s', 'ₛ'),
        ('t', 'ₜ'),
        ('u', 'ᵤ'),
        ('v', 'ᵥ'),
        ('x', 'ₓ'),
    ]
    .into_iter()
    .collect()
});

static COMMAND_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    let tokens: Vec<&str> = COMMAND_GLYPHS.iter().map(|(token, _)| *token).collect();
    compile(&format!(r"\\({})", tokens.join("|")))
});
static FRACTION_RE: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"\\frac\{([^{}]+)\}\{([^{}]+)\}"));
static SQRT_RE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\\sqrt\{([^{}]+)\}"));
static SUPERSCRIPT_BRACED_RE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\^\{([^{}]+)\}"));
static SUBSCRIPT_BRACED_RE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"_\{([^{}]+)\}"));
// Bare-form scripts exclude parens so a `^(…)` fallback emitted by the
// braced pass is never re-consumed.
static SUPERSCRIPT_BARE_RE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\^([A-Za-z0-9+\-=])"));
static SUBSCRIPT_BARE_RE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"_([A-Za-z0-9+\-=])"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, %err, "markup pass disabled; rendering degrades to identity");
            None
        }
    }
}

fn apply_pass<F>(text: String, re: &Lazy<Option<Regex>>, replace: F) -> String
where
    F: Fn(&Captures<'_>) -> String,
{
    match re.as_ref() {
        Some(re) => re.replace_all(&text, |caps: &Captures<'_>| replace(caps)).into_owned(),
        None => text,
    }
}

/// Renders raw markup into display text.
pub fn render(raw: &str) -> String {
    let text = apply_pass(raw.to_string(), &COMMAND_RE, |caps| {
        COMMAND_GLYPHS
            .iter()
            .find(|(token, _)| *token == &caps[1])
            .map(|(_, glyph)| (*glyph).to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    let text = apply_pass(text, &FRACTION_RE, |caps| {
        format!("({})/({})", &caps[1], &caps[2])
    });

    let text = apply_pass(text, &SQRT_RE, |caps| format!("√({})", &caps[1]));

    let text = apply_pass(text, &SUPERSCRIPT_BRACED_RE, |caps| {
        convert_script(&caps[1], &SUPERSCRIPTS, "^(", ")")
    });

    let text = apply_pass(text, &SUBSCRIPT_BRACED_RE, |caps| {
        convert_script(&caps[1], &SUBSCRIPTS, "_(", ")")
    });

    let text = apply_pass(text, &SUPERSCRIPT_BARE_RE, |caps| {
        convert_script(&caps[1], &SUPERSCRIPTS, "^(", ")")
    });

    let text = apply_pass(text, &SUBSCRIPT_BARE_RE, |caps| {
        convert_script(&caps[1], &SUBSCRIPTS, "_(", ")")
    });

    text.replace(['\\', '{', '}'], "")
}

/// Converts a scripted run to glyphs. An unmappable character anywhere in
/// the run forces the whole run to the parenthesized fallback; partial
/// substitution is never emitted.
fn convert_script(value: &str, map: &HashMap<char, char>, prefix: &str, suffix: &str) -> String {
    let mut glyphs = String::with_capacity(value.len());
    for ch in value.chars() {
        let key = ch.to_lowercase().next().unwrap_or(ch);
        match map.get(&key) {
            Some(glyph) => glyphs.push(*glyph),
            None => return format!("{prefix}{value}{suffix}"),
        }
    }
    glyphs
}
