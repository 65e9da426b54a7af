//! Regression tree in XGBoost's array layout.
//!
//! Node `i` is a leaf when `left[i] == -1`; a leaf's value is stored in
//! `split_condition[i]`. Splits send `x < condition` left, compared in
//! `f32` as XGBoost does, and NaN follows `default_left`.

use anyhow::{bail, ensure};

#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) left: Vec<i32>,
    pub(crate) right: Vec<i32>,
    pub(crate) split_index: Vec<usize>,
    pub(crate) split_condition: Vec<f32>,
    pub(crate) default_left: Vec<bool>,
    pub(crate) cover: Vec<f64>,
    expected_value: f64,
}

impl Tree {
    pub fn new(
        left: Vec<i32>,
        right: Vec<i32>,
        split_index: Vec<usize>,
        split_condition: Vec<f32>,
        default_left: Vec<bool>,
        cover: Vec<f64>,
        num_feature: usize,
    ) -> anyhow::Result<Self> {
        let n = left.len();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            right.len() == n
                && split_index.len() == n
                && split_condition.len() == n
                && default_left.len() == n
                && cover.len() == n,
            "tree node arrays differ in length"
        );

        // every node reachable from the root exactly once
        let mut seen = vec![false; n];
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            if seen[node] {
                bail!("node {node} is reachable twice");
            }
            seen[node] = true;
            if left[node] == -1 {
                continue;
            }
            for child in [left[node], right[node]] {
                if child < 0 || child as usize >= n {
                    bail!("node {node} has out-of-range child {child}");
                }
                stack.push(child as usize);
            }
            if split_index[node] >= num_feature {
                bail!(
                    "node {node} splits on feature {} but the model has {num_feature}",
                    split_index[node]
                );
            }
            if cover[node] <= 0.0 {
                bail!("internal node {node} has no cover");
            }
        }

        let mut tree = Self {
            left,
            right,
            split_index,
            split_condition,
            default_left,
            cover,
            expected_value: 0.0,
        };
        tree.expected_value = tree.node_mean(0);
        Ok(tree)
    }

    pub(crate) fn is_leaf(&self, node: usize) -> bool {
        self.left[node] == -1
    }

    pub(crate) fn leaf_value(&self, node: usize) -> f64 {
        self.split_condition[node] as f64
    }

    /// Child taken by `value` at internal `node`.
    pub(crate) fn next(&self, node: usize, value: f64) -> usize {
        let go_left = if value.is_nan() {
            self.default_left[node]
        } else {
            (value as f32) < self.split_condition[node]
        };
        if go_left {
            self.left[node] as usize
        } else {
            self.right[node] as usize
        }
    }

    /// Leaf value reached by `x`.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = self.next(node, x[self.split_index[node]]);
        }
        self.leaf_value(node)
    }

    /// Cover-weighted mean leaf value, the tree's output with no feature known.
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    fn node_mean(&self, node: usize) -> f64 {
        if self.is_leaf(node) {
            return self.leaf_value(node);
        }
        let l = self.left[node] as usize;
        let r = self.right[node] as usize;
        (self.node_mean(l) * self.cover[l] + self.node_mean(r) * self.cover[r]) / self.cover[node]
    }
}
