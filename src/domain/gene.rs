//! Gene, GeneInterval and the gene-logic tree.
//!
//! Gene-association strings use `|`/`,` as OR and `+` as AND, parenthesised
//! and nestable, with the conventional AND-binds-tighter-than-OR precedence
//! most GPR (gene-protein-reaction) notations use.

use crate::error::{MfaError, MfaResult};
use std::fmt;

/// Boolean connective at an internal gene-logic tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneLogic {
    /// All children must be available.
    And,
    /// At least one child must be available.
    Or,
}

/// A rooted Boolean tree over gene identifiers.
///
/// Invariants maintained by [`GeneLogicTree::parse`] and
/// [`GeneLogicNode::consolidate`]: single-child/leaf nodes are collapsed into
/// their parent; no tree path contains two adjacent nodes of identical
/// logic.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneLogicNode {
    /// A single gene, referenced by its index in the owning arena.
    Leaf(usize),
    /// An AND/OR combination of children.
    Node {
        /// Connective.
        logic: GeneLogic,
        /// Child subtrees (>= 2 after consolidation, except a lone leaf).
        children: Vec<GeneLogicNode>,
    },
}

impl GeneLogicNode {
    /// Evaluate catalytic viability given a knock-out predicate
    /// (`true` = gene is knocked out).
    pub fn viable(&self, knocked_out: &dyn Fn(usize) -> bool) -> bool {
        match self {
            GeneLogicNode::Leaf(g) => !knocked_out(*g),
            GeneLogicNode::Node { logic: GeneLogic::And, children } => {
                children.iter().all(|c| c.viable(knocked_out))
            }
            GeneLogicNode::Node { logic: GeneLogic::Or, children } => {
                children.iter().any(|c| c.viable(knocked_out))
            }
        }
    }

    /// Collapse single-child nodes into their payload and flatten runs of
    /// identically-logic'd nested nodes into their parent.
    pub fn consolidate(self) -> GeneLogicNode {
        match self {
            GeneLogicNode::Leaf(g) => GeneLogicNode::Leaf(g),
            GeneLogicNode::Node { logic, children } => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    let child = child.consolidate();
                    match child {
                        GeneLogicNode::Node { logic: child_logic, children: grandchildren }
                            if child_logic == logic =>
                        {
                            flat.extend(grandchildren);
                        }
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.into_iter().next().unwrap()
                } else {
                    GeneLogicNode::Node { logic, children: flat }
                }
            }
        }
    }

    /// Number of distinct gene leaves reachable from this node.
    pub fn fanin(&self) -> usize {
        match self {
            GeneLogicNode::Leaf(_) => 1,
            GeneLogicNode::Node { children, .. } => children.iter().map(GeneLogicNode::fanin).sum(),
        }
    }

    /// All gene indices referenced anywhere in this subtree.
    pub fn gene_ids(&self) -> Vec<usize> {
        match self {
            GeneLogicNode::Leaf(g) => vec![*g],
            GeneLogicNode::Node { children, .. } => {
                children.iter().flat_map(GeneLogicNode::gene_ids).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Ident(String),
}

fn tokenize(src: &str) -> MfaResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '|' | ',' => {
                tokens.push(Token::Or);
                chars.next();
            }
            '+' => {
                tokens.push(Token::And);
                chars.next();
            }
            _ => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "()|,+".contains(c) {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                match ident.to_ascii_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "" => return Err(MfaError::GeneLogicSyntax(src.to_string())),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    resolve: &'a mut dyn FnMut(&str) -> usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> MfaResult<GeneLogicNode> {
        let mut children = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.bump();
            children.push(self.parse_and()?);
        }
        Ok(if children.len() == 1 {
            children.into_iter().next().unwrap()
        } else {
            GeneLogicNode::Node { logic: GeneLogic::Or, children }
        })
    }

    fn parse_and(&mut self) -> MfaResult<GeneLogicNode> {
        let mut children = vec![self.parse_atom()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.bump();
            children.push(self.parse_atom()?);
        }
        Ok(if children.len() == 1 {
            children.into_iter().next().unwrap()
        } else {
            GeneLogicNode::Node { logic: GeneLogic::And, children }
        })
    }

    fn parse_atom(&mut self) -> MfaResult<GeneLogicNode> {
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(MfaError::GeneLogicSyntax("missing )".to_string())),
                }
            }
            Some(Token::Ident(name)) => Ok(GeneLogicNode::Leaf((self.resolve)(name))),
            other => Err(MfaError::GeneLogicSyntax(format!("unexpected token near {:?}", other))),
        }
    }
}

/// A fully-parsed, consolidated gene-logic tree plus the source text it came
/// from (kept for diagnostics and LP-writer comments).
#[derive(Debug, Clone)]
pub struct GeneLogicTree {
    /// Root of the consolidated tree, or `None` for a reaction with no gene
    /// association (always viable).
    pub root: Option<GeneLogicNode>,
    /// Original association string, verbatim.
    pub source: String,
}

impl GeneLogicTree {
    /// Parse a GPR-style boolean string. `resolve` maps a gene name to its
    /// stable arena index, creating the gene if the loader hasn't seen it
    /// yet.
    pub fn parse(src: &str, mut resolve: impl FnMut(&str) -> usize) -> MfaResult<Self> {
        let trimmed = src.trim();
        if trimmed.is_empty() {
            return Ok(GeneLogicTree { root: None, source: String::new() });
        }
        let tokens = tokenize(trimmed)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, resolve: &mut resolve };
        let root = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(MfaError::GeneLogicSyntax(format!(
                "trailing tokens after position {}",
                parser.pos
            )));
        }
        Ok(GeneLogicTree { root: Some(root.consolidate()), source: trimmed.to_string() })
    }

    /// Whether the reaction is still catalyzable given `knocked_out`.
    pub fn viable(&self, knocked_out: &dyn Fn(usize) -> bool) -> bool {
        match &self.root {
            None => true,
            Some(node) => node.viable(knocked_out),
        }
    }

    /// All gene indices referenced, empty for an un-associated reaction.
    pub fn gene_ids(&self) -> Vec<usize> {
        self.root.as_ref().map(GeneLogicNode::gene_ids).unwrap_or_default()
    }
}

impl fmt::Display for GeneLogicTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// An open reading frame.
#[derive(Debug, Clone)]
pub struct Gene {
    /// Stable identifier.
    pub id: String,
    /// Genome start coordinate.
    pub start_coord: i64,
    /// Genome end coordinate.
    pub end_coord: i64,
    /// Index of the next gene along the genome, if known.
    pub next: Option<usize>,
    /// Index of the previous gene along the genome, if known.
    pub prev: Option<usize>,
    /// Reactions (by index) this gene participates in the GPR of.
    pub reactions: Vec<usize>,
    /// Index of the `GENE_USE` variable once built.
    pub use_var: Option<usize>,
}

impl Gene {
    /// Construct a gene with no coordinates or neighbors yet known.
    pub fn new(id: impl Into<String>) -> Self {
        Gene {
            id: id.into(),
            start_coord: 0,
            end_coord: 0,
            next: None,
            prev: None,
            reactions: Vec::new(),
            use_var: None,
        }
    }

    /// Record that this gene participates in `reaction`'s GPR, if not
    /// already recorded.
    pub fn add_reaction(&mut self, reaction: usize) {
        if !self.reactions.contains(&reaction) {
            self.reactions.push(reaction);
        }
    }
}

/// A contiguous genomic span covering a set of genes, with an
/// experimentally measured growth value.
#[derive(Debug, Clone)]
pub struct GeneInterval {
    /// Stable identifier.
    pub id: String,
    /// Start coordinate of the interval.
    pub start_coord: i64,
    /// End coordinate of the interval.
    pub end_coord: i64,
    /// Total genes known to exist in the interval (may exceed
    /// `genes.len()` if some were not loaded).
    pub total_genes: usize,
    /// Genes (by index) whose coordinates fall inside this interval.
    pub genes: Vec<usize>,
    /// Experimentally measured growth rate for this interval's knockout.
    pub experimental_growth: f64,
    /// Index of the `INTERVAL_USE` variable once built.
    pub use_var: Option<usize>,
}

impl GeneInterval {
    /// Build an interval from explicit coordinates, computing `genes` by
    /// scanning `all_genes` for overlap (`gene.start < interval.end &&
    /// interval.start < gene.end`).
    pub fn covering_genes(
        id: impl Into<String>,
        start_coord: i64,
        end_coord: i64,
        total_genes: usize,
        experimental_growth: f64,
        all_genes: &[Gene],
    ) -> Self {
        let genes = all_genes
            .iter()
            .enumerate()
            .filter(|(_, g)| g.start_coord < end_coord && start_coord < g.end_coord)
            .map(|(i, _)| i)
            .collect();
        GeneInterval {
            id: id.into(),
            start_coord,
            end_coord,
            total_genes,
            genes,
            experimental_growth,
            use_var: None,
        }
    }
}
