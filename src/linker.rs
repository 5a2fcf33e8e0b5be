//! In-text link resolution: builds a term dictionary from page titles and
//! aliases, then rewrites free text into plain/linked segments.

use std::collections::BTreeMap;

use fst::Map;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::model::{LinkedSegment, Page};
use crate::normalize::normalize;

static TOKEN_RE: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(r"[A-Za-z0-9]+") {
    Ok(re) => Some(re),
    Err(err) => {
        warn!(%err, "link tokenizer disabled; text passes through unlinked");
        None
    }
});

struct Token {
    norm: String,
    start: usize,
    end: usize,
}

/// Resolves recognized terms in arbitrary text to page links.
///
/// The dictionary maps each normalized title/alias to a page ordinal.
/// Pages contribute terms in descending original-title length, so when two
/// terms normalize identically the page with the longer title wins; among
/// equal lengths the corpus ordering decides and the first writer wins.
pub struct LinkResolver {
    terms: Map<Vec<u8>>,
    page_ids: Vec<String>,
    max_term_word_count: usize,
}

impl LinkResolver {
    pub fn new(pages: &[Page]) -> Self {
        let mut by_title_length: Vec<(usize, &Page)> = pages.iter().enumerate().collect();
        by_title_length
            .sort_by(|a, b| b.1.title.chars().count().cmp(&a.1.title.chars().count()));

        let mut terms: BTreeMap<String, u64> = BTreeMap::new();
        for (ordinal, page) in by_title_length {
            for term in std::iter::once(&page.title).chain(page.aliases.iter()) {
                let key = normalize(term);
                if key.is_empty() {
                    continue;
                }
                terms.entry(key).or_insert(ordinal as u64);
            }
        }

        let max_term_word_count = terms
            .keys()
            .map(|key| key.split(' ').count())
            .max()
            .unwrap_or(1);

        let terms = Map::from_iter(terms).expect("sorted unique term keys build a valid fst");
        let page_ids = pages.iter().map(|page| page.id.clone()).collect();

        Self {
            terms,
            page_ids,
            max_term_word_count,
        }
    }

    /// Maximum word count among all dictionary terms; bounds the matching
    /// window during scanning.
    pub fn max_term_word_count(&self) -> usize {
        self.max_term_word_count
    }

    /// Looks up a normalized term, returning the target page id.
    pub fn resolve_term(&self, term: &str) -> Option<&str> {
        let ordinal = self.terms.get(term)? as usize;
        self.page_ids.get(ordinal).map(String::as_str)
    }

    /// Splits `text` into plain and linked segments.
    ///
    /// Tokens are maximal ASCII-alphanumeric runs. At each position the
    /// longest dictionary phrase wins (maximal munch); a page never links
    /// to itself, and a multi-token phrase only matches when everything
    /// between its first and last token is whitespace. Input with no
    /// tokens or no matches comes back as one plain segment.
    pub fn linked_segments(&self, text: &str, current_page_id: &str) -> Vec<LinkedSegment> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![LinkedSegment::plain(text)];
        }

        let mut matches: Vec<(std::ops::Range<usize>, &str)> = Vec::new();
        let mut index = 0;

        while index < tokens.len() {
            let max_length = self.max_term_word_count.min(tokens.len() - index);
            let mut did_match = false;

            for length in (1..=max_length).rev() {
                let phrase = tokens[index..index + length]
                    .iter()
                    .map(|token| token.norm.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                let Some(target) = self.resolve_term(&phrase) else {
                    continue;
                };
                if target == current_page_id {
                    continue;
                }

                if length > 1 {
                    let bridge = &text[tokens[index].end..tokens[index + length - 1].start];
                    if bridge.chars().any(|c| !c.is_whitespace()) {
                        continue;
                    }
                }

                matches.push((tokens[index].start..tokens[index + length - 1].end, target));
                index += length;
                did_match = true;
                break;
            }

            if !did_match {
                index += 1;
            }
        }

        if matches.is_empty() {
            return vec![LinkedSegment::plain(text)];
        }

        let mut segments = Vec::new();
        let mut cursor = 0;

        for (range, target) in matches {
            if cursor < range.start {
                segments.push(LinkedSegment::plain(&text[cursor..range.start]));
            }
            segments.push(LinkedSegment::linked(&text[range.clone()], target));
            cursor = range.end;
        }

        if cursor < text.len() {
            segments.push(LinkedSegment::plain(&text[cursor..]));
        }

        segments.retain(|segment| !segment.text.is_empty());
        segments
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let Some(re) = TOKEN_RE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| Token {
            norm: normalize(m.as_str()),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}
