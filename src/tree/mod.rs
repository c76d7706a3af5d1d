//! Entity-annotated phrase trees.
//!
//! A sentence's constituency parse is held in an arena: nodes refer to their
//! parent and children by index, so the tree is acyclic in ownership terms
//! even though navigation runs both ways. A tree is built per sentence,
//! consumed by the resolver, and discarded; no node outlives its sentence.

pub mod normalize;

use chrono::NaiveDate;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A collapsed noun phrase: one matchable leaf.
///
/// Simple phrases have a single part; a coordinated phrase ("A and B") keeps
/// one part per head noun, each sharing the surrounding modifiers, and is
/// expanded into separate codes at assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Word sequences, one per coordinated head.
    pub parts: Vec<Vec<String>>,
    /// True for coordinated (compound) phrases.
    pub compound: bool,
}

impl Entity {
    /// All words of the entity, in surface order.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        self.parts.iter().flatten().cloned().collect()
    }

    /// The head word: last word of the last part.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.parts.last()?.last().map(String::as_str)
    }

    /// Surface text of the entity.
    #[must_use]
    pub fn text(&self) -> String {
        self.words().join(" ")
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// An interior phrase; its role comes from its syntactic label.
    Phrase,
    /// A preterminal token: part-of-speech label plus surface word.
    Token {
        /// Upper-cased surface word.
        word: String,
    },
    /// A noun phrase collapsed to a named-entity leaf.
    Entity(Entity),
}

/// One node of the phrase tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Syntactic label ("NP", "VP", "NNP", ...).
    pub label: String,
    /// Payload.
    pub data: NodeData,
    /// Parent reference; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Ordered children.
    pub children: Vec<NodeId>,
}

impl Node {
    /// Leading letter of the syntactic category, used for head-finding.
    #[must_use]
    pub fn category(&self) -> Option<char> {
        self.label.chars().next()
    }

    /// True for noun phrases (collapsed or not).
    #[must_use]
    pub fn is_noun_phrase(&self) -> bool {
        self.label.starts_with("NP") || matches!(self.data, NodeData::Entity(_))
    }

    /// True for verb phrases.
    #[must_use]
    pub fn is_verb_phrase(&self) -> bool {
        self.label.starts_with("VP")
    }

    /// True for prepositional phrases.
    #[must_use]
    pub fn is_prep_phrase(&self) -> bool {
        self.label.starts_with("PP")
    }

    /// True for clause-level nodes (S, SBAR, SINV, ...).
    #[must_use]
    pub fn is_clause(&self) -> bool {
        self.label.starts_with('S')
    }

    /// The token's word, if this is a token node.
    #[must_use]
    pub fn word(&self) -> Option<&str> {
        match &self.data {
            NodeData::Token { word } => Some(word),
            _ => None,
        }
    }

    /// The entity payload, if this node was collapsed.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        match &self.data {
            NodeData::Entity(e) => Some(e),
            _ => None,
        }
    }
}

/// An entity-annotated phrase tree for one sentence.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Sentence date, used for date-restricted code resolution.
    pub date: Option<NaiveDate>,
}

impl Tree {
    pub(crate) fn new(nodes: Vec<Node>, root: NodeId, date: Option<NaiveDate>) -> Self {
        Tree { nodes, root, date }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the arena (detached nodes included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nearest enclosing clause of a node, excluding the node itself.
    #[must_use]
    pub fn enclosing_clause(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if self.node(p).is_clause() {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }

    /// Word tokens under a node, in surface order. Entity leaves contribute
    /// their stored words.
    #[must_use]
    pub fn words_under(&self, id: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_words(id, &mut out);
        out
    }

    fn collect_words(&self, id: NodeId, out: &mut Vec<String>) {
        match &self.node(id).data {
            NodeData::Token { word } => out.push(word.clone()),
            NodeData::Entity(e) => out.extend(e.words()),
            NodeData::Phrase => {
                for &c in self.children(id) {
                    self.collect_words(c, out);
                }
            }
        }
    }

    /// Token node ids under a node, in surface order (entity leaves excluded).
    #[must_use]
    pub fn tokens_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_tokens(id, &mut out);
        out
    }

    fn collect_tokens(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match &self.node(id).data {
            NodeData::Token { .. } => out.push(id),
            NodeData::Entity(_) => {}
            NodeData::Phrase => {
                for &c in self.children(id) {
                    self.collect_tokens(c, out);
                }
            }
        }
    }

    /// The lexical head of a phrase: the rightmost descendant reachable by
    /// following only children whose category shares the phrase's leading
    /// letter. Token and entity leaves terminate the descent.
    #[must_use]
    pub fn head_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        match node.data {
            NodeData::Token { .. } | NodeData::Entity(_) => return Some(id),
            NodeData::Phrase => {}
        }
        let cat = node.category()?;
        let child = self
            .children(id)
            .iter()
            .rev()
            .copied()
            .find(|&c| self.node(c).category() == Some(cat))?;
        self.head_of(child)
    }
}
