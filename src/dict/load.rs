//! Readers for the external dictionary text formats.
//!
//! Three formats are consumed at load time, each compiled into the store of
//! the parent module:
//!
//! - **Verbs**: blocks of synonymous verbs with automatic or declared
//!   inflection, context patterns keyed to the head-verb position via a `*`
//!   marker, `&`-prefixed synsets, and `%` transformation rules.
//! - **Actors**: a primary phrase, `+`-prefixed synonyms, and optional
//!   indented date-restricted `[CODE <date]` / `[CODE >date]` /
//!   `[CODE lo-hi]` lines.
//! - **Agents**: `PHRASE {PLURAL} [~CODE]`, the `~` marking whether the role
//!   code precedes or follows the actor code, plus `!X!=a,b,c` substitution
//!   markers.
//!
//! A malformed entry is skipped with a warning; an unreadable file is fatal,
//! since no meaningful coding is possible with incomplete lexicons. `#` and
//! `;` introduce comments.

use super::{parse_pattern_tokens, CodeOp, CodeSet, DateRestriction, DictionaryBuilder,
            DictionaryStore, PatTok, RoleRef, TransformRule};
use crate::error::{Error, Result};
use crate::ontology::convert_forward;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

static CODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*([A-Za-z~\-]+)\s*(?:(<|>)?(\d{6,8})(?:\s*-\s*(\d{6,8}))?)?\s*\]$").unwrap()
});
static BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());
static PLURAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]*)\}").unwrap());
static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!([A-Z0-9_]+)!\s*=\s*(.+)$").unwrap());

/// Build a complete store from the three dictionary files.
///
/// # Errors
///
/// Fails if any file cannot be read or yields no usable entries.
pub fn from_files(
    verbs: impl AsRef<Path>,
    actors: impl AsRef<Path>,
    agents: impl AsRef<Path>,
) -> Result<DictionaryStore> {
    let mut builder = DictionaryStore::builder();
    load_verbs(verbs.as_ref(), &mut builder)?;
    load_actors(actors.as_ref(), &mut builder)?;
    load_agents(agents.as_ref(), &mut builder)?;
    let store = builder.build();
    log::info!(
        "dictionaries loaded: {} verb entries, {} actor patterns",
        store.verb_count(),
        store.actor_count()
    );
    Ok(store)
}

fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let file = File::open(path).map_err(|e| {
        Error::dictionary(format!("cannot open {}: {e}", path.display()))
    })?;
    let mut lines = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let stripped = match line.find(['#', ';']) {
            Some(pos) => &line[..pos],
            None => &line[..],
        };
        if stripped.trim().is_empty() {
            continue;
        }
        lines.push((i + 1, stripped.to_string()));
    }
    Ok(lines)
}

fn warn_skip(path: &Path, line: usize, message: &str) {
    let err = Error::missing_attribute(path.display().to_string(), line, message);
    log::warn!("{err}; entry skipped");
}

// =============================================================================
// Actors
// =============================================================================

/// Parse one `[CODE ...]` restriction body into a code-set entry.
fn parse_code_entry(body: &str) -> Option<(DateRestriction, String)> {
    let wrapped = format!("[{body}]");
    let caps = CODE_LINE.captures(&wrapped)?;
    let code = caps[1].to_uppercase();
    let restriction = match (caps.get(2), caps.get(3), caps.get(4)) {
        (None, None, None) => DateRestriction::Unrestricted,
        (Some(op), Some(date), None) => {
            let date = super::parse_compact_date(date.as_str())?;
            match op.as_str() {
                "<" => DateRestriction::Before(date),
                _ => DateRestriction::After(date),
            }
        }
        (None, Some(lo), Some(hi)) => {
            let lo = super::parse_compact_date(lo.as_str())?;
            let hi = super::parse_compact_date(hi.as_str())?;
            DateRestriction::Between(lo, hi)
        }
        _ => return None,
    };
    Some((restriction, code))
}

/// Load an actor dictionary into the builder.
pub fn load_actors(path: &Path, builder: &mut DictionaryBuilder) -> Result<()> {
    let mut phrases: Vec<String> = Vec::new();
    let mut codes = CodeSet::new();
    let mut loaded = 0usize;

    let mut flush = |phrases: &mut Vec<String>, codes: &mut CodeSet, loaded: &mut usize| {
        if !phrases.is_empty() && !codes.is_empty() {
            for phrase in phrases.iter() {
                builder.actor_codes(phrase, codes.clone());
                *loaded += 1;
            }
        }
        phrases.clear();
        *codes = CodeSet::new();
    };

    for (line_no, line) in read_lines(path)? {
        let indented = line.starts_with([' ', '\t']);
        let text = line.trim();
        if indented {
            // Date-restricted code line for the current block.
            match BRACKET
                .captures(text)
                .and_then(|c| parse_code_entry(c[1].trim()))
            {
                Some((restriction, code)) => codes.push(restriction, code),
                None => warn_skip(path, line_no, "unparseable code restriction"),
            }
            continue;
        }
        if let Some(alias) = text.strip_prefix('+') {
            if phrases.is_empty() {
                warn_skip(path, line_no, "synonym before any primary phrase");
            } else {
                phrases.push(alias.trim().to_string());
            }
            continue;
        }
        // New primary phrase: flush the previous block.
        flush(&mut phrases, &mut codes, &mut loaded);
        let (phrase, inline) = match BRACKET.captures(text) {
            Some(caps) => {
                let phrase = text[..caps.get(0).unwrap().start()].trim().to_string();
                (phrase, parse_code_entry(caps[1].trim()))
            }
            None => (text.to_string(), None),
        };
        if phrase.is_empty() {
            warn_skip(path, line_no, "actor entry without a phrase");
            continue;
        }
        phrases.push(phrase);
        if let Some((restriction, code)) = inline {
            codes.push(restriction, code);
        }
    }
    flush(&mut phrases, &mut codes, &mut loaded);

    if loaded == 0 {
        return Err(Error::dictionary(format!(
            "{} produced no usable actor entries",
            path.display()
        )));
    }
    log::info!("{}: {loaded} actor patterns", path.display());
    Ok(())
}

// =============================================================================
// Agents
// =============================================================================

/// Expand `!X!` substitution markers in a phrase against the collected
/// marker table.
fn expand_markers(phrase: &str, markers: &HashMap<String, Vec<String>>) -> Vec<String> {
    for (name, values) in markers {
        let marker = format!("!{name}!");
        if phrase.contains(&marker) {
            return values
                .iter()
                .flat_map(|v| expand_markers(&phrase.replacen(&marker, v, 1), markers))
                .collect();
        }
    }
    vec![phrase.to_string()]
}

/// Load an agent dictionary into the builder.
pub fn load_agents(path: &Path, builder: &mut DictionaryBuilder) -> Result<()> {
    let mut markers: HashMap<String, Vec<String>> = HashMap::new();
    let mut loaded = 0usize;

    for (line_no, line) in read_lines(path)? {
        let text = line.trim();
        if let Some(caps) = SUBSTITUTION.captures(text) {
            let values = caps[2]
                .split(',')
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty())
                .collect();
            markers.insert(caps[1].to_string(), values);
            continue;
        }
        let code = match BRACKET.captures(text) {
            Some(caps) => caps[1].trim().to_string(),
            None => {
                warn_skip(path, line_no, "agent entry without a [code]");
                continue;
            }
        };
        if !code.contains('~') {
            warn_skip(path, line_no, "agent code missing its ~ marker");
            continue;
        }
        let head = text[..text.find('[').unwrap_or(text.len())].trim();
        let plural = PLURAL.captures(head).map(|c| c[1].trim().to_string());
        let base = PLURAL.replace(head, "").trim().to_string();
        if base.is_empty() {
            warn_skip(path, line_no, "agent entry without a phrase");
            continue;
        }
        for phrase in expand_markers(&base, &markers) {
            builder.agent(&phrase, &code);
            loaded += 1;
        }
        if let Some(plural) = plural {
            for phrase in expand_markers(&plural, &markers) {
                builder.agent(&phrase, &code);
                loaded += 1;
            }
        }
    }

    if loaded == 0 {
        return Err(Error::dictionary(format!(
            "{} produced no usable agent entries",
            path.display()
        )));
    }
    log::info!("{}: {loaded} agent patterns", path.display());
    Ok(())
}

// =============================================================================
// Verbs
// =============================================================================

/// Regular inflections of a verb: plural, past, progressive.
fn inflect(word: &str) -> Vec<String> {
    if let Some(stem) = word.strip_suffix('E') {
        return vec![
            format!("{word}S"),
            format!("{word}D"),
            format!("{stem}ING"),
        ];
    }
    if let Some(stem) = word.strip_suffix('Y') {
        let consonant = !stem.ends_with(['A', 'E', 'I', 'O', 'U']);
        if consonant && !stem.is_empty() {
            return vec![
                format!("{stem}IES"),
                format!("{stem}IED"),
                format!("{word}ING"),
            ];
        }
    }
    vec![
        format!("{word}S"),
        format!("{word}ED"),
        format!("{word}ING"),
    ]
}

fn add_verb_word(builder: &mut DictionaryBuilder, primary: &str, word: &str, declared: bool) {
    if word.contains('_') {
        builder.verb_form(primary, &word.replace('_', " "));
        return;
    }
    if primary != word {
        builder.verb_alias(primary, word);
    }
    if !declared {
        for form in inflect(word) {
            builder.verb_alias(primary, &form);
        }
    }
}

fn parse_transform(text: &str) -> Option<TransformRule> {
    let mut toks = text.split_whitespace();
    let outer = toks.next()?;
    let inner = toks.next()?;
    let source = toks.next()?;
    let target = toks.next()?;
    let op = toks.next()?;
    if toks.next().is_some() {
        return None;
    }
    let key = |t: &str| -> Option<Option<i64>> {
        if t == "*" {
            Some(None)
        } else {
            convert_forward(t).map(Some)
        }
    };
    let role = |t: &str| -> Option<RoleRef> {
        match t {
            "S" => Some(RoleRef::OuterSource),
            "T" => Some(RoleRef::OuterTarget),
            "s" => Some(RoleRef::InnerSource),
            "t" => Some(RoleRef::InnerTarget),
            _ => None,
        }
    };
    Some(TransformRule {
        outer: key(outer)?,
        inner: key(inner)?,
        source: role(source)?,
        target: role(target)?,
        code: match op.to_uppercase().as_str() {
            "OUTER" => CodeOp::Outer,
            "INNER" => CodeOp::Inner,
            "COMBINE" => CodeOp::Combine,
            _ => return None,
        },
    })
}

/// Split a pattern body at its `*` verb marker into upper and lower halves.
fn split_at_verb_marker(body: &str) -> Option<(String, String)> {
    let mut parts = body.splitn(2, '*');
    let upper = parts.next()?.trim().to_string();
    let lower = parts.next()?.trim().to_string();
    Some((upper, lower))
}

fn synset_refs(tokens: &str) -> Vec<String> {
    tokens
        .split_whitespace()
        .filter_map(|t| t.strip_prefix('&'))
        .map(str::to_uppercase)
        .collect()
}

/// Load a verb dictionary into the builder.
pub fn load_verbs(path: &Path, builder: &mut DictionaryBuilder) -> Result<()> {
    let mut primary: Option<String> = None;
    let mut synset: Option<(String, Vec<String>)> = None;
    // Primary verb awaiting automatic inflection; a declared `{...}` block
    // cancels it, so regular forms are only generated at the block boundary.
    let mut pending_inflect: Option<String> = None;
    let mut loaded = 0usize;

    let flush_synset = |builder: &mut DictionaryBuilder, synset: &mut Option<(String, Vec<String>)>| {
        if let Some((name, members)) = synset.take() {
            let refs: Vec<&str> = members.iter().map(String::as_str).collect();
            builder.synset(&name, &refs);
        }
    };
    let flush_inflect = |builder: &mut DictionaryBuilder, pending: &mut Option<String>| {
        if let Some(word) = pending.take() {
            for form in inflect(&word) {
                builder.verb_alias(&word, &form);
            }
        }
    };

    for (line_no, line) in read_lines(path)? {
        let text = line.trim();

        if let Some(name) = text.strip_prefix('&') {
            flush_synset(builder, &mut synset);
            flush_inflect(builder, &mut pending_inflect);
            synset = Some((name.trim().to_uppercase(), Vec::new()));
            primary = None;
            continue;
        }
        if let Some(member) = text.strip_prefix('+') {
            match &mut synset {
                Some((_, members)) => members.push(member.trim().to_uppercase()),
                None => match &primary {
                    // Inside a verb block, + introduces a synonymous verb.
                    Some(p) => {
                        let p = p.clone();
                        add_verb_word(builder, &p, &member.trim().to_uppercase(), false);
                    }
                    None => warn_skip(path, line_no, "synonym before any block"),
                },
            }
            continue;
        }
        flush_synset(builder, &mut synset);

        if let Some(body) = text.strip_prefix('-') {
            let Some(p) = primary.clone() else {
                warn_skip(path, line_no, "pattern before any verb");
                continue;
            };
            let code = match BRACKET.captures(body) {
                Some(caps) => caps[1].trim().to_string(),
                None => {
                    warn_skip(path, line_no, "pattern without a [code]");
                    continue;
                }
            };
            let tokens = &body[..body.find('[').unwrap_or(body.len())];
            let Some((upper, lower)) = split_at_verb_marker(tokens) else {
                warn_skip(path, line_no, "pattern without a * verb marker");
                continue;
            };
            let mut unknown = false;
            for name in synset_refs(tokens) {
                if !builder.has_synset(&name) {
                    let err = Error::UnknownSynset(name);
                    log::warn!("{}:{line_no}: {err}; pattern skipped", path.display());
                    unknown = true;
                }
            }
            if unknown {
                continue;
            }
            // A token of bare connectors ("_") compiles to an empty literal,
            // which can never match.
            let upper_toks = parse_pattern_tokens(&upper);
            let lower_toks = parse_pattern_tokens(&lower);
            let empty_literal = upper_toks
                .iter()
                .chain(&lower_toks)
                .any(|t| matches!(t, PatTok::Lex(w) if w.is_empty()));
            if empty_literal {
                warn_skip(path, line_no, "pattern with an empty literal token");
                continue;
            }
            builder.pattern(&p, &upper, &lower, &code);
            continue;
        }
        if let Some(body) = text.strip_prefix('%') {
            match parse_transform(body.trim()) {
                Some(rule) => {
                    builder.transform(rule);
                }
                None => warn_skip(path, line_no, "unparseable transformation"),
            }
            continue;
        }
        if let Some(caps) = PLURAL.captures(text) {
            if text.starts_with('{') {
                // Declared inflections replace the automatic ones.
                let Some(p) = primary.clone() else {
                    warn_skip(path, line_no, "inflections before any verb");
                    continue;
                };
                pending_inflect = None;
                for word in caps[1].split_whitespace() {
                    add_verb_word(builder, &p, &word.to_uppercase(), true);
                }
                continue;
            }
        }

        // Primary verb line: WORD [code].
        flush_inflect(builder, &mut pending_inflect);
        let (head, code) = match BRACKET.captures(text) {
            Some(caps) => (
                text[..caps.get(0).unwrap().start()].trim(),
                Some(caps[1].trim().to_string()),
            ),
            None => (text, None),
        };
        let word = head.to_uppercase();
        if word.is_empty() || word.split_whitespace().count() != 1 {
            warn_skip(path, line_no, "unparseable verb entry");
            continue;
        }
        if word.contains('_') {
            // A multi-word primary anchors its own block under the first word.
            let anchor = word.split('_').next().unwrap_or_default().to_string();
            builder.verb(&anchor, code.as_deref());
            builder.verb_form(&anchor, &word.replace('_', " "));
            primary = Some(anchor);
        } else {
            builder.verb(&word, code.as_deref());
            pending_inflect = Some(word.clone());
            primary = Some(word);
        }
        loaded += 1;
    }
    flush_synset(builder, &mut synset);
    flush_inflect(builder, &mut pending_inflect);

    if loaded == 0 {
        return Err(Error::dictionary(format!(
            "{} produced no usable verb entries",
            path.display()
        )));
    }
    log::info!("{}: {loaded} verb entries", path.display());
    Ok(())
}
