//! Bracketed-parse reading and structural normalization.
//!
//! `parse_sentence` turns a bracketed constituency parse into a [`Tree`] with
//! simple noun phrases collapsed into entity leaves: possessives merged (the
//! possessive marker itself cannot appear in a dictionary pattern and is
//! discarded), one-level prepositional attachments folded into the head
//! entity, coordinations marked compound, and noisy comma-delimited clauses
//! trimmed. Inconsistent bracket nesting yields `Error::UnbalancedTree`; the
//! caller skips the sentence and the batch continues.

use super::{Entity, Node, NodeData, NodeId, Tree};
use crate::error::{Error, Result};
use chrono::NaiveDate;

/// Configuration for the structural pass.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Enable comma-delimited clause trimming.
    pub trim_clauses: bool,
    /// Minimum word count of a trimmable clause.
    pub trim_min_words: usize,
    /// Maximum word count of a trimmable clause.
    pub trim_max_words: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            trim_clauses: true,
            trim_min_words: 2,
            trim_max_words: 8,
        }
    }
}

impl NormalizerConfig {
    /// Disable clause trimming.
    #[must_use]
    pub fn without_trimming(mut self) -> Self {
        self.trim_clauses = false;
        self
    }

    /// Set the trimmable clause word-count bounds.
    #[must_use]
    pub fn with_trim_bounds(mut self, min: usize, max: usize) -> Self {
        self.trim_min_words = min;
        self.trim_max_words = max;
        self
    }
}

// =============================================================================
// Bracket reading
// =============================================================================

enum Sexp {
    List(String, Vec<Sexp>),
    Atom(String),
}

struct Lexer<'a> {
    rest: &'a str,
}

#[derive(PartialEq)]
enum Tok {
    Open,
    Close,
    Atom(String),
}

impl<'a> Lexer<'a> {
    fn next_tok(&mut self) -> Option<Tok> {
        self.rest = self.rest.trim_start();
        let mut chars = self.rest.chars();
        match chars.next()? {
            '(' => {
                self.rest = &self.rest[1..];
                Some(Tok::Open)
            }
            ')' => {
                self.rest = &self.rest[1..];
                Some(Tok::Close)
            }
            _ => {
                let end = self
                    .rest
                    .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                    .unwrap_or(self.rest.len());
                let atom = self.rest[..end].to_uppercase();
                self.rest = &self.rest[end..];
                Some(Tok::Atom(atom))
            }
        }
    }
}

fn read_sexp(lexer: &mut Lexer<'_>) -> Result<Sexp> {
    match lexer.next_tok() {
        Some(Tok::Open) => {
            let label = match lexer.next_tok() {
                Some(Tok::Atom(a)) => a,
                // Tolerate the parser's outer "( (S ...))" wrapper.
                Some(Tok::Open) => {
                    let mut children = vec![read_list_body(lexer)?];
                    loop {
                        match lexer.next_tok() {
                            Some(Tok::Close) => break,
                            Some(Tok::Open) => children.push(read_list_body(lexer)?),
                            Some(Tok::Atom(a)) => children.push(Sexp::Atom(a)),
                            None => return Err(Error::unbalanced("unexpected end of input")),
                        }
                    }
                    return Ok(Sexp::List("ROOT".to_string(), children));
                }
                Some(Tok::Close) => return Err(Error::unbalanced("empty constituent")),
                None => return Err(Error::unbalanced("unexpected end of input")),
            };
            let mut children = Vec::new();
            loop {
                match lexer.next_tok() {
                    Some(Tok::Close) => break,
                    Some(Tok::Open) => {
                        children.push(read_list_body(lexer)?);
                    }
                    Some(Tok::Atom(a)) => children.push(Sexp::Atom(a)),
                    None => return Err(Error::unbalanced("unexpected end of input")),
                }
            }
            Ok(Sexp::List(label, children))
        }
        Some(Tok::Atom(_)) => Err(Error::unbalanced("word outside any constituent")),
        Some(Tok::Close) => Err(Error::unbalanced("close bracket with no open")),
        None => Err(Error::unbalanced("empty parse")),
    }
}

fn read_list_body(lexer: &mut Lexer<'_>) -> Result<Sexp> {
    let label = match lexer.next_tok() {
        Some(Tok::Atom(a)) => a,
        Some(Tok::Open) => return Err(Error::unbalanced("constituent missing its label")),
        Some(Tok::Close) => return Err(Error::unbalanced("empty constituent")),
        None => return Err(Error::unbalanced("unexpected end of input")),
    };
    let mut children = Vec::new();
    loop {
        match lexer.next_tok() {
            Some(Tok::Close) => return Ok(Sexp::List(label, children)),
            Some(Tok::Open) => children.push(read_list_body(lexer)?),
            Some(Tok::Atom(a)) => children.push(Sexp::Atom(a)),
            None => return Err(Error::unbalanced("unexpected end of input")),
        }
    }
}

fn build_arena(sexp: &Sexp, parent: Option<NodeId>, nodes: &mut Vec<Node>) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    match sexp {
        Sexp::Atom(word) => {
            nodes.push(Node {
                label: "X".to_string(),
                data: NodeData::Token { word: word.clone() },
                parent,
                children: Vec::new(),
            });
        }
        Sexp::List(label, children) => {
            let all_atoms =
                !children.is_empty() && children.iter().all(|c| matches!(c, Sexp::Atom(_)));
            if all_atoms {
                // Preterminal: (NN DOG) becomes a single token node.
                let word = children
                    .iter()
                    .filter_map(|c| match c {
                        Sexp::Atom(w) => Some(w.as_str()),
                        Sexp::List(..) => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                nodes.push(Node {
                    label: label.clone(),
                    data: NodeData::Token { word },
                    parent,
                    children: Vec::new(),
                });
            } else {
                nodes.push(Node {
                    label: label.clone(),
                    data: NodeData::Phrase,
                    parent,
                    children: Vec::new(),
                });
                let kids: Vec<NodeId> = children
                    .iter()
                    .map(|c| build_arena(c, Some(id), nodes))
                    .collect();
                nodes[id.index()].children = kids;
            }
        }
    }
    id
}

// =============================================================================
// Structural pass
// =============================================================================

fn is_droppable_token(node: &Node) -> bool {
    match node.word() {
        Some(w) => node.label == "POS" || w == "'S" || w == "'" || w == "." || w == "``" || w == "''",
        None => false,
    }
}

fn is_separator_token(node: &Node) -> bool {
    node.label == "CC" || node.word() == Some(",")
}

/// Collapse eligible noun phrases bottom-up.
fn collapse_nps(tree: &mut Tree, id: NodeId) {
    let children: Vec<NodeId> = tree.children(id).to_vec();
    let is_np = tree.node(id).label.starts_with("NP") && tree.node(id).entity().is_none();
    // Multi-level PP attachment must be detected on the original structure:
    // collapsing the children first would swallow the inner PP.
    let pp_blocked = is_np
        && children.len() == 2
        && tree.node(children[1]).is_prep_phrase()
        && subtree_contains_pp(tree, children[1], true);
    for &c in &children {
        collapse_nps(tree, c);
    }
    if !is_np {
        return;
    }
    if !pp_blocked {
        try_merge_pp(tree, id);
    }
    try_collapse(tree, id);
}

/// Merge the exact shape `(NP (NP..) (PP .. (NP..)))` with no deeper PP:
/// preposition and object fold into the head entity. Multi-level attachment
/// is left unmerged.
fn try_merge_pp(tree: &mut Tree, id: NodeId) {
    let children: Vec<NodeId> = tree.children(id).to_vec();
    if children.len() != 2 {
        return;
    }
    let (head, pp) = (children[0], children[1]);
    let head_entity = match tree.node(head).entity() {
        Some(e) if !e.compound => e.clone(),
        _ => return,
    };
    if !tree.node(pp).is_prep_phrase() {
        return;
    }
    let pp_children: Vec<NodeId> = tree.children(pp).to_vec();
    if pp_children.len() != 2 {
        return;
    }
    let prep_word = match tree.node(pp_children[0]).word() {
        Some(w) => w.to_string(),
        None => return,
    };
    let obj_entity = match tree.node(pp_children[1]).entity() {
        Some(e) if !e.compound => e.clone(),
        _ => return,
    };
    let mut words = head_entity.words();
    words.push(prep_word);
    words.extend(obj_entity.words());
    let node = tree.node_mut(id);
    node.data = NodeData::Entity(Entity {
        parts: vec![words],
        compound: false,
    });
    node.children.clear();
}

fn subtree_contains_pp(tree: &Tree, id: NodeId, is_root: bool) -> bool {
    if !is_root && tree.node(id).is_prep_phrase() {
        return true;
    }
    tree.children(id)
        .iter()
        .any(|&c| subtree_contains_pp(tree, c, false))
}

/// Collapse an NP whose children are only tokens and already-collapsed
/// entities. Coordinated heads become a compound entity whose parts share the
/// leading modifiers; the possessive marker is discarded.
fn try_collapse(tree: &mut Tree, id: NodeId) {
    let children: Vec<NodeId> = tree.children(id).to_vec();
    if children.is_empty() {
        return;
    }
    for &c in &children {
        match &tree.node(c).data {
            NodeData::Phrase => return,
            NodeData::Token { .. } | NodeData::Entity(_) => {}
        }
    }

    let entity_children: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|&c| tree.node(c).entity().is_some())
        .collect();
    let has_conjunction = children
        .iter()
        .any(|&c| tree.node(c).label == "CC");

    if entity_children.len() >= 2 && has_conjunction {
        // Shared modifiers: word tokens before the first coordinated head.
        let first_entity_pos = children
            .iter()
            .position(|&c| tree.node(c).entity().is_some())
            .unwrap_or(0);
        let shared: Vec<String> = children[..first_entity_pos]
            .iter()
            .filter(|&&c| {
                let n = tree.node(c);
                !is_separator_token(n) && !is_droppable_token(n)
            })
            .filter_map(|&c| tree.node(c).word().map(str::to_string))
            .collect();
        let mut parts = Vec::new();
        for &e in &entity_children {
            if let Some(entity) = tree.node(e).entity() {
                for part in &entity.parts {
                    let mut words = shared.clone();
                    words.extend(part.iter().cloned());
                    parts.push(words);
                }
            }
        }
        let node = tree.node_mut(id);
        node.data = NodeData::Entity(Entity {
            parts,
            compound: true,
        });
        node.children.clear();
        return;
    }

    // Plain merge: tokens and entity fragments flatten into one part, the
    // possessive marker and punctuation dropped.
    let mut words = Vec::new();
    let mut compound = false;
    let mut parts: Vec<Vec<String>> = Vec::new();
    for &c in &children {
        let node = tree.node(c);
        if is_droppable_token(node) || node.word() == Some(",") {
            continue;
        }
        match &node.data {
            NodeData::Token { word } => words.push(word.clone()),
            NodeData::Entity(e) => {
                if e.compound {
                    compound = true;
                    parts.extend(e.parts.iter().cloned());
                } else {
                    words.extend(e.words());
                }
            }
            NodeData::Phrase => unreachable!(),
        }
    }
    if compound {
        // A nested compound keeps its parts; stray words attach to each part.
        if !words.is_empty() {
            for part in &mut parts {
                let mut merged = words.clone();
                merged.append(part);
                *part = merged;
            }
        }
    } else {
        if words.is_empty() {
            return;
        }
        parts = vec![words];
    }
    let node = tree.node_mut(id);
    node.data = NodeData::Entity(Entity { parts, compound });
    node.children.clear();
}

/// Remove comma-delimited clauses whose word count falls inside the
/// configured bounds, to reduce noise before matching.
fn trim_clauses(tree: &mut Tree, id: NodeId, config: &NormalizerConfig) {
    let children: Vec<NodeId> = tree.children(id).to_vec();
    for c in &children {
        trim_clauses(tree, *c, config);
    }
    if !tree.node(id).is_clause() {
        return;
    }
    let comma_positions: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, &c)| tree.node(c).word() == Some(","))
        .map(|(i, _)| i)
        .collect();
    if comma_positions.is_empty() {
        return;
    }

    let segment_words = |range: std::ops::Range<usize>| -> usize {
        children[range]
            .iter()
            .map(|&c| tree.words_under(c).len())
            .sum()
    };
    let in_bounds =
        |n: usize| -> bool { n >= config.trim_min_words && n <= config.trim_max_words };

    let mut drop = vec![false; children.len()];
    // Leading clause up to the first comma.
    let first = comma_positions[0];
    if first > 0 && in_bounds(segment_words(0..first)) {
        for flag in drop.iter_mut().take(first + 1) {
            *flag = true;
        }
    }
    // Trailing clause after the last comma.
    let last = *comma_positions.last().unwrap();
    if last + 1 < children.len() && in_bounds(segment_words(last + 1..children.len())) {
        for flag in drop.iter_mut().skip(last) {
            *flag = true;
        }
    }
    // Internal clauses between comma pairs; both delimiters go with the
    // segment.
    for pair in comma_positions.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi > lo + 1 && in_bounds(segment_words(lo + 1..hi)) {
            for flag in drop.iter_mut().take(hi + 1).skip(lo) {
                *flag = true;
            }
        }
    }

    if drop.iter().any(|&d| d) {
        let kept: Vec<NodeId> = children
            .iter()
            .zip(&drop)
            .filter(|(_, &d)| !d)
            .map(|(&c, _)| c)
            .collect();
        log::debug!(
            "trimmed {} of {} clause constituents",
            children.len() - kept.len(),
            children.len()
        );
        tree.node_mut(id).children = kept;
    }
}

/// Parse a bracketed constituency parse into a normalized, entity-annotated
/// tree.
///
/// # Errors
///
/// Returns [`Error::UnbalancedTree`] on inconsistent bracket nesting; the
/// caller is expected to skip the sentence and continue the batch.
pub fn parse_sentence(
    text: &str,
    date: Option<NaiveDate>,
    config: &NormalizerConfig,
) -> Result<Tree> {
    let mut lexer = Lexer { rest: text };
    let sexp = read_sexp(&mut lexer)?;
    if lexer.next_tok().is_some() {
        return Err(Error::unbalanced("trailing input after root constituent"));
    }
    let mut nodes = Vec::new();
    let root = build_arena(&sexp, None, &mut nodes);
    let mut tree = Tree::new(nodes, root, date);
    if config.trim_clauses {
        trim_clauses(&mut tree, root, config);
    }
    collapse_nps(&mut tree, root);
    Ok(tree)
}
