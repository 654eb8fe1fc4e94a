use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

/// 经验分布的 Shannon 熵 `H = -Σ p·log2 p`, 单位为 bit.
///
/// 概率质量按不同取值计数得到, 并按取值升序累加. 所有值相同时结果恰为 0.
/// 输入为空时返回 `None`.
pub fn shannon_entropy(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut counts: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
    for &v in values {
        *counts.entry(OrderedFloat(v)).or_insert(0) += 1;
    }

    let n = values.len() as f64;
    let mut h = 0.0;
    for &c in counts.values() {
        let p = c as f64 / n;
        h -= p * p.log2();
    }
    Some(h)
}

#[cfg(test)]
mod tests {
    use super::shannon_entropy;

    #[test]
    fn test_identical_values() {
        assert_eq!(shannon_entropy(&[3.5; 10]), Some(0.0));
        assert_eq!(shannon_entropy(&[]), None);
    }

    #[test]
    fn test_uniform() {
        assert_eq!(shannon_entropy(&[1.0, 2.0]), Some(1.0));
        assert_eq!(shannon_entropy(&[1.0, 2.0, 3.0, 4.0]), Some(2.0));
        let h = shannon_entropy(&[1.0, 1.0, 1.0, 2.0]).unwrap();
        // -(0.75·log2 0.75 + 0.25·log2 0.25)
        assert!((h - 0.811_278_124_459_132_8).abs() < 1e-12);
    }

    #[test]
    fn test_order_invariant() {
        let a = shannon_entropy(&[5.0, 1.0, 5.0, 2.0, 9.0]).unwrap();
        let b = shannon_entropy(&[9.0, 5.0, 2.0, 1.0, 5.0]).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
