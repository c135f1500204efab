//! Softmax and top-K properties over arbitrary Q8.8 logits

use edgecnn_driver::ranking::{rank, softmax, top_k};
use proptest::prelude::*;

fn arb_logits() -> impl Strategy<Value = Vec<i16>> {
    prop::collection::vec(any::<i16>(), 1..=100)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn softmax_is_a_distribution(logits in arb_logits()) {
        let probs = softmax(&logits);
        prop_assert_eq!(probs.len(), logits.len());
        prop_assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        let sum: f64 = probs.iter().map(|&p| f64::from(p)).sum();
        prop_assert!((sum - 1.0).abs() < 1e-5, "sum = {}", sum);
    }

    #[test]
    fn top_k_is_sorted_and_bounded(logits in arb_logits(), k in 0usize..=120) {
        let probs = softmax(&logits);
        let ranked = top_k(&probs, k);
        prop_assert_eq!(ranked.len(), k.min(logits.len()));

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
            if pair[0].confidence == pair[1].confidence {
                prop_assert!(pair[0].class_id < pair[1].class_id);
            }
        }

        let mut ids: Vec<usize> = ranked.iter().map(|c| c.class_id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), ranked.len());

        for c in &ranked {
            prop_assert_eq!(c.confidence, probs[c.class_id]);
        }
        if let Some(last) = ranked.last() {
            let chosen: Vec<usize> = ranked.iter().map(|c| c.class_id).collect();
            let outranked = probs
                .iter()
                .enumerate()
                .filter(|(i, _)| !chosen.contains(i))
                .any(|(_, &p)| p > last.confidence);
            prop_assert!(!outranked, "an unselected class beats the last pick");
        }
    }

    #[test]
    fn dominant_logit_ranks_first(
        others in prop::collection::vec(i16::MIN..i16::MAX, 0..100),
        position in any::<prop::sample::Index>(),
    ) {
        let mut logits = others;
        let at = position.index(logits.len() + 1);
        logits.insert(at, i16::MAX);

        let result = rank(&logits, 5);
        prop_assert_eq!(result.best().map(|c| c.class_id), Some(at));
        prop_assert_eq!(result.len(), 5.min(logits.len()));
    }
}
