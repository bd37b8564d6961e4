//! Combo tree: a trie of key sequences.
//!
//! Each registered combo walks from the root along its keys; the node where
//! it ends collects the combo as a [`Candidate`]. Several combos may end on
//! the same node, in which case they are tried in registration order.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. The tree is built
//! once from a definition list and never shrinks; switching weapons means
//! building a new tree.
//!
//! ```
//! use riposte_core::key::ComboKey::{A, B};
//! use riposte_core::tree::{ComboDefinition, ComboTree};
//!
//! let tree = ComboTree::build(vec![
//!     ComboDefinition::new(vec![A], "jab"),
//!     ComboDefinition::new(vec![A, A], "cross"),
//!     ComboDefinition::new(vec![A, B], "uppercut"),
//! ])
//! .unwrap();
//!
//! let jab = tree.child(tree.root(), A);
//! assert!(tree.has_child(jab, B));
//! assert_eq!(tree.candidates(jab)[0].attack, "jab");
//! assert_eq!(tree.path(tree.child(jab, B)), vec![A, B]);
//! ```

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::{ComboError, ComboResult};
use crate::key::{ComboKey, KeySet};
use crate::timing::AttackTiming;

/// Handle to a node of a [`ComboTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An attack that may be chosen when the walk reaches its node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<P> {
    /// Guard evaluated against the actor at selection time.
    pub condition: Condition,
    /// Disabled candidates are skipped.
    pub enabled: bool,
    /// Clip length and phases. Untimed attacks have no phases.
    pub timing: Option<AttackTiming>,
    /// The attack handed back to the caller.
    pub attack: P,
}

/// One row of a combo table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboDefinition<P> {
    /// Keys to press, in order.
    pub keys: Vec<ComboKey>,
    /// Guard for this attack.
    #[serde(default)]
    pub condition: Condition,
    /// Whether the attack starts enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Clip length and phases.
    #[serde(default)]
    pub timing: Option<AttackTiming>,
    /// The attack payload.
    pub attack: P,
}

fn enabled_by_default() -> bool {
    true
}

impl<P> ComboDefinition<P> {
    /// An enabled, unconditional, untimed combo.
    pub fn new(keys: Vec<ComboKey>, attack: P) -> Self {
        Self {
            keys,
            condition: Condition::None,
            enabled: true,
            timing: None,
            attack,
        }
    }

    /// Returns a copy guarded by `condition`.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Returns a copy with timing data.
    #[must_use]
    pub fn with_timing(mut self, timing: AttackTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Returns a disabled copy.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn into_candidate(self) -> Candidate<P> {
        Candidate {
            condition: self.condition,
            enabled: self.enabled,
            timing: self.timing,
            attack: self.attack,
        }
    }
}

#[derive(Debug, Clone)]
struct Node<P> {
    key: Option<ComboKey>,
    parent: Option<NodeId>,
    children: [Option<NodeId>; ComboKey::COUNT],
    candidates: Vec<Candidate<P>>,
}

impl<P> Node<P> {
    fn new(key: Option<ComboKey>, parent: Option<NodeId>) -> Self {
        Self {
            key,
            parent,
            children: [None; ComboKey::COUNT],
            candidates: Vec::new(),
        }
    }
}

/// Trie of combo key sequences.
#[derive(Debug, Clone)]
pub struct ComboTree<P> {
    nodes: Vec<Node<P>>,
    combos: usize,
}

impl<P> Default for ComboTree<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ComboTree<P> {
    /// A tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(None, None)],
            combos: 0,
        }
    }

    /// Builds a tree from definitions, preserving their order on shared
    /// nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError::EmptySequence`] for a definition without keys.
    pub fn build(definitions: impl IntoIterator<Item = ComboDefinition<P>>) -> ComboResult<Self> {
        let mut tree = Self::new();
        for (index, definition) in definitions.into_iter().enumerate() {
            if definition.keys.is_empty() {
                return Err(ComboError::EmptySequence { index });
            }
            tree.insert(definition)?;
        }
        tracing::debug!(nodes = tree.len(), combos = tree.combos, "built combo tree");
        Ok(tree)
    }

    fn insert(&mut self, definition: ComboDefinition<P>) -> ComboResult<NodeId> {
        let mut node = NodeId::ROOT;
        for &key in &definition.keys {
            node = match self.try_child(node, key) {
                Some(child) => child,
                None => self.push(node, key)?,
            };
        }
        self.nodes[node.index()]
            .candidates
            .push(definition.into_candidate());
        self.combos += 1;
        Ok(node)
    }

    fn push(&mut self, parent: NodeId, key: ComboKey) -> ComboResult<NodeId> {
        let id = u32::try_from(self.nodes.len())
            .map(NodeId)
            .map_err(|_| ComboError::Definition("combo tree exceeds u32 nodes".to_string()))?;
        self.nodes.push(Node::new(Some(key), Some(parent)));
        self.nodes[parent.index()].children[key.index()] = Some(id);
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.index())
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Whether `node` continues with `key`.
    #[must_use]
    pub fn has_child(&self, node: NodeId, key: ComboKey) -> bool {
        self.try_child(node, key).is_some()
    }

    /// The child of `node` reached by `key`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such child. Guard with [`has_child`](Self::has_child)
    /// or use [`try_child`](Self::try_child).
    #[must_use]
    pub fn child(&self, node: NodeId, key: ComboKey) -> NodeId {
        self.try_child(node, key)
            .unwrap_or_else(|| panic!("combo node {node:?} has no child for key {key}"))
    }

    /// The child of `node` reached by `key`, if any.
    #[must_use]
    pub fn try_child(&self, node: NodeId, key: ComboKey) -> Option<NodeId> {
        self.node(node)?.children[key.index()]
    }

    /// Keys that continue from `node`.
    #[must_use]
    pub fn next_keys(&self, node: NodeId) -> KeySet {
        let Some(node) = self.node(node) else {
            return KeySet::empty();
        };
        ComboKey::ALL
            .into_iter()
            .filter(|key| node.children[key.index()].is_some())
            .collect()
    }

    /// Candidates ending at `node`, in registration order.
    #[must_use]
    pub fn candidates(&self, node: NodeId) -> &[Candidate<P>] {
        self.node(node)
            .map(|n| n.candidates.as_slice())
            .unwrap_or_default()
    }

    /// Mutable access to one candidate, e.g. to toggle `enabled`.
    pub fn candidate_mut(&mut self, node: NodeId, index: usize) -> Option<&mut Candidate<P>> {
        self.nodes.get_mut(node.index())?.candidates.get_mut(index)
    }

    /// The node reached by walking `keys` from the root.
    #[must_use]
    pub fn find(&self, keys: &[ComboKey]) -> Option<NodeId> {
        keys.iter().try_fold(self.root(), |node, &key| self.try_child(node, key))
    }

    /// Keys leading from the root to `node`.
    #[must_use]
    pub fn path(&self, node: NodeId) -> Vec<ComboKey> {
        let mut keys = Vec::new();
        let mut current = self.node(node);
        while let Some(n) = current {
            if let Some(key) = n.key {
                keys.push(key);
            }
            current = n.parent.and_then(|parent| self.node(parent));
        }
        keys.reverse();
        keys
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no combo has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combos == 0
    }

    /// Number of registered combos.
    #[must_use]
    pub fn combo_count(&self) -> usize {
        self.combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ComboKey::{A, B, C, F};

    fn sample() -> ComboTree<&'static str> {
        ComboTree::build(vec![
            ComboDefinition::new(vec![A], "slash"),
            ComboDefinition::new(vec![A, A], "double"),
            ComboDefinition::new(vec![A, A], "double-air").with_condition(Condition::OnAir),
            ComboDefinition::new(vec![A, B, C], "finisher"),
            ComboDefinition::new(vec![F], "kick"),
        ])
        .unwrap()
    }

    mod build {
        use super::*;

        #[test]
        fn shared_prefixes_share_nodes() {
            let tree = sample();
            // root, A, AA, AB, ABC, F
            assert_eq!(tree.len(), 6);
            assert_eq!(tree.combo_count(), 5);
            assert!(!tree.is_empty());
        }

        #[test]
        fn identical_sequences_keep_registration_order() {
            let tree = sample();
            let node = tree.find(&[A, A]).unwrap();
            let names: Vec<_> = tree.candidates(node).iter().map(|c| c.attack).collect();
            assert_eq!(names, vec!["double", "double-air"]);
            assert_eq!(tree.candidates(node)[1].condition, Condition::OnAir);
        }

        #[test]
        fn intermediate_nodes_have_no_candidates() {
            let tree = sample();
            let ab = tree.find(&[A, B]).unwrap();
            assert!(tree.candidates(ab).is_empty());
            assert!(tree.candidates(tree.root()).is_empty());
        }

        #[test]
        fn empty_sequences_are_rejected() {
            let result = ComboTree::build(vec![
                ComboDefinition::new(vec![A], 1),
                ComboDefinition::new(vec![], 2),
            ]);
            assert_eq!(result.unwrap_err(), ComboError::EmptySequence { index: 1 });
        }

        #[test]
        fn empty_definition_list_builds_bare_root() {
            let tree = ComboTree::<u8>::build(Vec::new()).unwrap();
            assert_eq!(tree.len(), 1);
            assert!(tree.is_empty());
            assert_eq!(tree.next_keys(tree.root()), KeySet::empty());
        }
    }

    mod navigation {
        use super::*;

        #[test]
        fn next_keys_lists_children() {
            let tree = sample();
            assert_eq!(tree.next_keys(tree.root()), KeySet::A | KeySet::F);
            let a = tree.child(tree.root(), A);
            assert_eq!(tree.next_keys(a), KeySet::A | KeySet::B);
        }

        #[test]
        fn find_and_path_agree() {
            let tree = sample();
            let node = tree.find(&[A, B, C]).unwrap();
            assert_eq!(tree.path(node), vec![A, B, C]);
            assert_eq!(tree.path(tree.root()), Vec::<ComboKey>::new());
            assert_eq!(tree.find(&[A, C]), None);
            assert_eq!(tree.find(&[]), Some(tree.root()));
        }

        #[test]
        fn try_child_reports_missing_keys() {
            let tree = sample();
            assert_eq!(tree.try_child(tree.root(), B), None);
            assert!(!tree.has_child(tree.root(), B));
        }

        #[test]
        #[should_panic(expected = "has no child")]
        fn child_panics_on_missing_key() {
            let tree = sample();
            let _ = tree.child(tree.root(), C);
        }

        #[test]
        fn candidates_can_be_toggled() {
            let mut tree = sample();
            let node = tree.find(&[F]).unwrap();
            tree.candidate_mut(node, 0).unwrap().enabled = false;
            assert!(!tree.candidates(node)[0].enabled);
            assert!(tree.candidate_mut(node, 1).is_none());
        }
    }

    #[test]
    fn definitions_load_from_json() {
        let json = r#"[
            {"keys": ["A"], "attack": "slash"},
            {"keys": ["A", "B"], "condition": "on_air", "enabled": false, "attack": "dive"}
        ]"#;
        let definitions: Vec<ComboDefinition<String>> = serde_json::from_str(json).unwrap();
        assert!(definitions[0].enabled);
        assert_eq!(definitions[0].condition, Condition::None);
        assert!(!definitions[1].enabled);

        let tree = ComboTree::build(definitions).unwrap();
        let node = tree.find(&[A, B]).unwrap();
        assert_eq!(tree.candidates(node)[0].attack, "dive");
    }
}
