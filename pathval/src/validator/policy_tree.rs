//! The valid_policy_tree described in RFC 5280 section 6.1.2 (a), along with the operations that
//! process certificate policies (6.1.3 (d)), policy mappings (6.1.4 (b)) and the intersection with
//! the user-initial-policy-set (6.1.5 (g)).
//!
//! Nodes live in a pool and are referenced by index. Each row of the tree holds the indices of the
//! nodes at that depth. Nodes removed from the tree are unlinked from their row and parent but remain
//! in the pool until the tree is dropped. Every operation returns a new tree and leaves the receiver
//! untouched.

use alloc::collections::BTreeMap;
use alloc::{vec, vec::Vec};

use const_oid::db::rfc5280::ANY_POLICY;
use der::asn1::ObjectIdentifier;
use log::debug;
use x509_cert::ext::pkix::certpolicy::{PolicyInformation, PolicyQualifierInfo};

use crate::{validator::validation_config::ObjectIdentifierSet, PathCertificate, ValidatorState};

/// Qualifiers asserted alongside a policy in a certificatePolicies extension
pub type QualifierSet = Option<Vec<PolicyQualifierInfo>>;

/// Indices of the nodes at one depth of the tree
type PolicyTreeRow = Vec<usize>;

#[derive(Clone, Debug, Eq, PartialEq)]
struct PolicyNode {
    valid_policy: ObjectIdentifier,
    qualifier_set: QualifierSet,
    expected_policy_set: ObjectIdentifierSet,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// `PolicyTree` is the valid_policy_tree state variable. A NULL tree is represented by the absence of
/// a `PolicyTree`, i.e., `Option<PolicyTree>::None`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyTree {
    pool: Vec<PolicyNode>,
    rows: Vec<PolicyTreeRow>,
}

impl Default for PolicyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyTree {
    /// `new` returns a tree with a single node of depth zero with a valid_policy of anyPolicy, an empty
    /// qualifier_set and an expected_policy_set containing only anyPolicy (RFC 5280 6.1.2 (a)).
    pub fn new() -> Self {
        PolicyTree {
            pool: vec![PolicyNode {
                valid_policy: ANY_POLICY,
                qualifier_set: None,
                expected_policy_set: ObjectIdentifierSet::from([ANY_POLICY]),
                parent: None,
                children: vec![],
            }],
            rows: vec![vec![0]],
        }
    }

    /// `depth` returns the depth of the deepest row in the tree
    pub fn depth(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// `policies_at_depth` returns the valid_policy and qualifier_set of each node at the given depth.
    pub fn policies_at_depth(&self, depth: usize) -> Vec<PolicyInformation> {
        match self.rows.get(depth) {
            Some(row) => row
                .iter()
                .map(|&n| PolicyInformation {
                    policy_identifier: self.pool[n].valid_policy,
                    policy_qualifiers: self.pool[n].qualifier_set.clone(),
                })
                .collect(),
            None => vec![],
        }
    }

    /// `process_policies` implements RFC 5280 6.1.3 (d) for the certificate at position
    /// `state.index`. It returns None if the resulting tree is NULL, including when the certificate
    /// has no certificatePolicies extension.
    pub fn process_policies(
        &self,
        state: &ValidatorState,
        cert: &PathCertificate,
    ) -> Option<PolicyTree> {
        let cps = cert.certificate_policies()?;
        let any_policy_allowed = state.inhibit_any_policy > 0
            || (state.index < state.path_length && cert.is_self_issued());
        self.add_policies_at_depth(state.index, &cps.0, any_policy_allowed)
    }

    /// `process_mappings` implements RFC 5280 6.1.4 (b) for the certificate at position `state.index`.
    /// The caller is expected to have rejected mappings to or from anyPolicy. It returns None if the
    /// resulting tree is NULL.
    pub fn process_mappings(
        &self,
        state: &ValidatorState,
        cert: &PathCertificate,
    ) -> Option<PolicyTree> {
        let mappings = match cert.policy_mappings() {
            Some(mappings) => mappings,
            None => return Some(self.clone()),
        };

        let mut mapped: BTreeMap<ObjectIdentifier, ObjectIdentifierSet> = BTreeMap::new();
        for mapping in &mappings.0 {
            mapped
                .entry(mapping.issuer_domain_policy)
                .or_default()
                .insert(mapping.subject_domain_policy);
        }
        self.apply_mappings_at_depth(state.index, &mapped, state.policy_mapping > 0)
    }

    /// `calculate_intersection` implements RFC 5280 6.1.5 (g) using `state.path_length` as the depth
    /// of the leaves. The tree is returned unchanged if the initial policy set contains anyPolicy. It
    /// returns None if the resulting tree is NULL.
    pub fn calculate_intersection(
        &self,
        state: &ValidatorState,
        initial_policy_set: &ObjectIdentifierSet,
    ) -> Option<PolicyTree> {
        if initial_policy_set.contains(&ANY_POLICY) {
            return Some(self.clone());
        }
        self.intersect_at_depth(state.path_length, initial_policy_set)
    }

    //----------------------------------------------------------------------------
    // private
    //----------------------------------------------------------------------------
    fn add_child(
        &mut self,
        parent: usize,
        depth: usize,
        valid_policy: ObjectIdentifier,
        qualifier_set: QualifierSet,
        expected_policy_set: ObjectIdentifierSet,
    ) {
        let index = self.pool.len();
        self.pool.push(PolicyNode {
            valid_policy,
            qualifier_set,
            expected_policy_set,
            parent: Some(parent),
            children: vec![],
        });
        self.pool[parent].children.push(index);
        while self.rows.len() <= depth {
            self.rows.push(PolicyTreeRow::new());
        }
        self.rows[depth].push(index);
    }

    fn has_child_with_policy(&self, parent: usize, policy: &ObjectIdentifier) -> bool {
        self.pool[parent]
            .children
            .iter()
            .any(|&c| self.pool[c].valid_policy == *policy)
    }

    fn find_in_row(&self, depth: usize, policy: &ObjectIdentifier) -> Option<usize> {
        self.rows
            .get(depth)?
            .iter()
            .copied()
            .find(|&n| self.pool[n].valid_policy == *policy)
    }

    /// unlinks the node and its descendants from the tree
    fn delete_subtree(&mut self, node: usize, depth: usize) {
        let children = core::mem::take(&mut self.pool[node].children);
        for child in children {
            self.delete_subtree(child, depth + 1);
        }
        if let Some(row) = self.rows.get_mut(depth) {
            row.retain(|&n| n != node);
        }
        if let Some(parent) = self.pool[node].parent {
            self.pool[parent].children.retain(|&n| n != node);
        }
    }

    /// removes childless nodes at max_depth or less, working up from max_depth so that parents left
    /// without children are removed too
    fn prune(&mut self, max_depth: usize) {
        for depth in (0..=max_depth).rev() {
            let Some(row) = self.rows.get(depth) else {
                continue;
            };
            let childless: Vec<usize> = row
                .iter()
                .copied()
                .filter(|&n| self.pool[n].children.is_empty())
                .collect();
            for node in childless {
                self.delete_subtree(node, depth);
            }
        }
    }

    fn is_null_at(&self, depth: usize) -> bool {
        self.rows.get(depth).map_or(true, |row| row.is_empty())
    }

    fn add_policies_at_depth(
        &self,
        depth: usize,
        policies: &[PolicyInformation],
        any_policy_allowed: bool,
    ) -> Option<PolicyTree> {
        let parent_depth = depth.checked_sub(1)?;
        let mut tree = self.clone();
        tree.rows.truncate(depth);
        let parent_row = tree.rows.get(parent_depth)?.clone();
        tree.rows.push(PolicyTreeRow::new());

        let mut any_policy_qualifiers: Option<QualifierSet> = None;
        for pi in policies {
            let policy = pi.policy_identifier;
            if policy == ANY_POLICY {
                any_policy_qualifiers = Some(pi.policy_qualifiers.clone());
                continue;
            }

            // (d)(1)(i)
            let mut matched = false;
            for &parent in &parent_row {
                if tree.pool[parent].expected_policy_set.contains(&policy) {
                    tree.add_child(
                        parent,
                        depth,
                        policy,
                        pi.policy_qualifiers.clone(),
                        ObjectIdentifierSet::from([policy]),
                    );
                    matched = true;
                }
            }

            // (d)(1)(ii)
            if !matched {
                if let Some(parent) = tree.find_in_row(parent_depth, &ANY_POLICY) {
                    tree.add_child(
                        parent,
                        depth,
                        policy,
                        pi.policy_qualifiers.clone(),
                        ObjectIdentifierSet::from([policy]),
                    );
                }
            }
        }

        // (d)(2)
        if let Some(qualifiers) = any_policy_qualifiers {
            if any_policy_allowed {
                for &parent in &parent_row {
                    let expected: Vec<ObjectIdentifier> = tree.pool[parent]
                        .expected_policy_set
                        .iter()
                        .copied()
                        .collect();
                    for policy in expected {
                        if !tree.has_child_with_policy(parent, &policy) {
                            tree.add_child(
                                parent,
                                depth,
                                policy,
                                qualifiers.clone(),
                                ObjectIdentifierSet::from([policy]),
                            );
                        }
                    }
                }
            } else {
                debug!("anyPolicy asserted at depth {} is inhibited", depth);
            }
        }

        // (d)(3)
        tree.prune(parent_depth);
        if tree.is_null_at(depth) {
            debug!("valid_policy_tree is NULL after processing policies at depth {}", depth);
            return None;
        }
        Some(tree)
    }

    fn apply_mappings_at_depth(
        &self,
        depth: usize,
        mapped: &BTreeMap<ObjectIdentifier, ObjectIdentifierSet>,
        mapping_allowed: bool,
    ) -> Option<PolicyTree> {
        let mut tree = self.clone();
        let parent_depth = depth.checked_sub(1)?;
        if mapping_allowed {
            // (b)(1)
            for (issuer_policy, subject_policies) in mapped {
                let row = tree.rows.get(depth)?.clone();
                let matches: Vec<usize> = row
                    .iter()
                    .copied()
                    .filter(|&n| tree.pool[n].valid_policy == *issuer_policy)
                    .collect();
                if !matches.is_empty() {
                    for node in matches {
                        tree.pool[node].expected_policy_set = subject_policies.clone();
                    }
                } else if let Some(any_node) = tree.find_in_row(depth, &ANY_POLICY) {
                    if let Some(parent) = tree.find_in_row(parent_depth, &ANY_POLICY) {
                        let qualifiers = tree.pool[any_node].qualifier_set.clone();
                        tree.add_child(
                            parent,
                            depth,
                            *issuer_policy,
                            qualifiers,
                            subject_policies.clone(),
                        );
                    }
                }
            }
        } else {
            // (b)(2)
            for issuer_policy in mapped.keys() {
                while let Some(node) = tree.find_in_row(depth, issuer_policy) {
                    tree.delete_subtree(node, depth);
                }
            }
            tree.prune(parent_depth);
            if tree.is_null_at(depth) {
                debug!("valid_policy_tree is NULL after processing mappings at depth {}", depth);
                return None;
            }
        }
        Some(tree)
    }

    fn intersect_at_depth(
        &self,
        depth: usize,
        initial_policy_set: &ObjectIdentifierSet,
    ) -> Option<PolicyTree> {
        let mut tree = self.clone();
        let parent_depth = depth.checked_sub(1)?;

        // (g)(iii)(1)
        let mut valid_policy_node_set: Vec<(usize, usize)> = vec![];
        for (d, row) in tree.rows.iter().enumerate().take(depth + 1) {
            for &n in row {
                if let Some(parent) = tree.pool[n].parent {
                    if tree.pool[parent].valid_policy == ANY_POLICY {
                        valid_policy_node_set.push((n, d));
                    }
                }
            }
        }

        // (g)(iii)(2)
        for &(node, d) in &valid_policy_node_set {
            let policy = tree.pool[node].valid_policy;
            if policy != ANY_POLICY && !initial_policy_set.contains(&policy) {
                tree.delete_subtree(node, d);
            }
        }

        // (g)(iii)(3)
        if let Some(any_leaf) = tree.find_in_row(depth, &ANY_POLICY) {
            let qualifiers = tree.pool[any_leaf].qualifier_set.clone();
            if let Some(parent) = tree.pool[any_leaf].parent {
                let present: ObjectIdentifierSet = valid_policy_node_set
                    .iter()
                    .map(|&(n, _)| tree.pool[n].valid_policy)
                    .collect();
                for policy in initial_policy_set {
                    if !present.contains(policy) {
                        tree.add_child(
                            parent,
                            depth,
                            *policy,
                            qualifiers.clone(),
                            ObjectIdentifierSet::from([*policy]),
                        );
                    }
                }
            }
            tree.delete_subtree(any_leaf, depth);
        }

        // (g)(iii)(4)
        tree.prune(parent_depth);
        if tree.is_null_at(depth) {
            debug!("valid_policy_tree is NULL after intersection with the initial policy set");
            return None;
        }
        Some(tree)
    }
}
