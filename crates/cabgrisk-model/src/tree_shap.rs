//! Exact path-dependent TreeSHAP (Lundberg et al., Algorithm 2).
//!
//! Contributions are in the tree's output space (log-odds for a logistic
//! booster). For one tree, `sum(phi) == predict(x) - expected_value()`.

use crate::tree::Tree;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add `tree`'s contributions for `x` into `phi`.
pub(crate) fn accumulate(tree: &Tree, x: &[f64], phi: &mut [f64]) {
    recurse(tree, x, phi, 0, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    phi: &mut [f64],
    node: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend(&mut path, zero_fraction, one_fraction, feature);

    if tree.is_leaf(node) {
        let leaf = tree.leaf_value(node);
        for i in 1..path.len() {
            let w = unwound_path_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                phi[f] += w * (el.one_fraction - el.zero_fraction) * leaf;
            }
        }
        return;
    }

    let split = tree.split_index[node];
    let hot = tree.next(node, x[split]);
    let left = tree.left[node] as usize;
    let right = tree.right[node] as usize;
    let cold = if hot == left { right } else { left };
    let hot_zero = tree.cover[hot] / tree.cover[node];
    let cold_zero = tree.cover[cold] / tree.cover[node];

    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = path.iter().skip(1).position(|el| el.feature == Some(split)) {
        let k = k + 1;
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind(&mut path, k);
    }

    recurse(tree, x, phi, hot, &path, hot_zero * incoming_zero, incoming_one, Some(split));
    recurse(tree, x, phi, cold, &path, cold_zero * incoming_zero, 0.0, Some(split));
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / d;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / d;
    }
}

fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let d = (depth + 1) as f64;
    let mut next_one = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one * d / ((i + 1) as f64 * one);
            next_one = tmp - path[i].pweight * zero * (depth - i) as f64 / d;
        } else {
            path[i].pweight = path[i].pweight * d / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let d = (depth + 1) as f64;
    let mut next_one = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one * d / ((i + 1) as f64 * one);
            total += tmp;
            next_one = path[i].pweight - tmp * zero * (depth - i) as f64 / d;
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((depth - i) as f64 / d);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::stump;

    fn shap(tree: &Tree, x: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; x.len()];
        accumulate(tree, x, &mut phi);
        phi
    }

    #[test]
    fn test_stump_attribution() {
        let tree = stump();
        assert!((shap(&tree, &[1.0])[0] - 1.2).abs() < 1e-9);
        assert!((shap(&tree, &[0.0])[0] + 1.8).abs() < 1e-9);
    }

    /// f0 < 0.5 ? (f1 < 0.5 ? 1 : 3) : (f0 < 1.5 ? 5 : 7), all leaves cover 1.
    fn two_level() -> Tree {
        Tree::new(
            vec![1, 3, 5, -1, -1, -1, -1],
            vec![2, 4, 6, -1, -1, -1, -1],
            vec![0, 1, 0, 0, 0, 0, 0],
            vec![0.5, 0.5, 1.5, 1.0, 3.0, 5.0, 7.0],
            vec![true; 7],
            vec![4.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0],
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_contributions_sum_to_prediction_gap() {
        let tree = two_level();
        for x in [[0.0, 0.0, 9.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [2.0, 1.0, 0.0]] {
            let phi = shap(&tree, &x);
            let gap = tree.predict(&x) - tree.expected_value();
            assert!((phi.iter().sum::<f64>() - gap).abs() < 1e-9, "{x:?}");
        }
    }

    #[test]
    fn test_unused_feature_gets_nothing() {
        let phi = shap(&two_level(), &[2.0, 1.0, 123.0]);
        assert_eq!(phi[2], 0.0);
    }

    #[test]
    fn test_repeated_split_feature() {
        // x = [2, 0]: v({}) = 4, v({f0}) = 7, v({f1}) = 3.5, v({f0, f1}) = 7
        let phi = shap(&two_level(), &[2.0, 0.0, 0.0]);
        assert!((phi[0] - 3.25).abs() < 1e-9);
        assert!((phi[1] + 0.25).abs() < 1e-9);
    }
}
