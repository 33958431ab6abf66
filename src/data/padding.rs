// ============================================================
// Layer 4 — Padding / Batching
// ============================================================
// Groups encoded instances into batches and brings every
// sequence of a role to one length:
//
//   longer than the limit  → truncated from the TAIL
//   shorter than the limit → right-padded with PADDING_ID
//
// Two length policies:
//   pad_to_max = true   → every batch uses max_len_a / max_len_b
//   pad_to_max = false  → each batch uses its own longest
//                         sequence, capped by max_len_a / max_len_b
//
// Alongside the ids we emit one boolean mask per role, true at
// real tokens and false at padding, so the mask true-count of a
// row is min(original length, limit).
//
// Everything here is plain Vec data and fully deterministic for
// a given input order and configuration; the burn Batcher turns
// a PaddedBatch into tensors.

use serde::{Deserialize, Serialize};

use crate::data::indexer::PADDING_ID;
use crate::domain::error::{PairError, PairResult};
use crate::domain::instance::{EncodedInstance, Label};

/// Length policy for both sequence roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingConfig {
    pub max_len_a:  usize,
    pub max_len_b:  usize,
    pub pad_to_max: bool,
}

impl PaddingConfig {
    pub fn fixed(max_len_a: usize, max_len_b: usize) -> Self {
        Self { max_len_a, max_len_b, pad_to_max: true }
    }

    pub fn dynamic(max_len_a: usize, max_len_b: usize) -> Self {
        Self { max_len_a, max_len_b, pad_to_max: false }
    }
}

/// One padded sequence role of a batch: `ids[row]` and `mask[row]`
/// both have exactly `len` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedSequences {
    pub ids:  Vec<Vec<usize>>,
    pub mask: Vec<Vec<bool>>,
    pub len:  usize,
}

impl PaddedSequences {
    fn pad(sequences: &[&[usize]], max_len: usize, pad_to_max: bool) -> Self {
        let len = if pad_to_max {
            max_len
        } else {
            sequences.iter().map(|s| s.len()).max().unwrap_or(0).min(max_len)
        };
        // A zero-width tensor cannot go through the recurrent layers
        let len = len.max(1);

        let (ids, mask): (Vec<Vec<usize>>, Vec<Vec<bool>>) = sequences
            .iter()
            .map(|seq| {
                let kept = seq.len().min(len);
                let mut ids = seq[..kept].to_vec();
                ids.resize(len, PADDING_ID);

                let mut mask = vec![true; kept];
                mask.resize(len, false);
                (ids, mask)
            })
            .unzip();

        Self { ids, mask, len }
    }

    pub fn rows(&self) -> usize {
        self.ids.len()
    }

    /// Row-major flattening, the layout the tensor constructors expect
    pub fn flat_ids(&self) -> Vec<i32> {
        self.ids.iter().flatten().map(|&id| id as i32).collect()
    }

    pub fn flat_mask(&self) -> Vec<i32> {
        self.mask.iter().flatten().map(|&m| m as i32).collect()
    }

    fn check(&self, role: &str) -> PairResult<()> {
        if self.ids.len() != self.mask.len() {
            return Err(PairError::invariant(format!(
                "sequence {role}: {} id rows but {} mask rows",
                self.ids.len(),
                self.mask.len()
            )));
        }
        for (row, (ids, mask)) in self.ids.iter().zip(&self.mask).enumerate() {
            if ids.len() != self.len || mask.len() != self.len {
                return Err(PairError::invariant(format!(
                    "sequence {role}, row {row}: ids len {} / mask len {} != padded len {}",
                    ids.len(),
                    mask.len(),
                    self.len
                )));
            }
        }
        Ok(())
    }
}

/// A batch of encoded instances with both roles padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    pub a:      PaddedSequences,
    pub b:      PaddedSequences,
    pub labels: Vec<Option<Label>>,
}

impl PaddedBatch {
    pub fn from_instances(items: &[EncodedInstance], padding: &PaddingConfig) -> Self {
        let seqs_a: Vec<&[usize]> = items.iter().map(|i| i.ids_a.as_slice()).collect();
        let seqs_b: Vec<&[usize]> = items.iter().map(|i| i.ids_b.as_slice()).collect();

        Self {
            a:      PaddedSequences::pad(&seqs_a, padding.max_len_a, padding.pad_to_max),
            b:      PaddedSequences::pad(&seqs_b, padding.max_len_b, padding.pad_to_max),
            labels: items.iter().map(|i| i.label).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Verify that ids and masks agree in shape for both roles.
    pub fn validate(&self) -> PairResult<()> {
        self.a.check("A")?;
        self.b.check("B")?;
        if self.a.rows() != self.len() || self.b.rows() != self.len() {
            return Err(PairError::invariant(format!(
                "batch has {} labels but {} / {} sequence rows",
                self.len(),
                self.a.rows(),
                self.b.rows()
            )));
        }
        Ok(())
    }

    /// Class indices for the loss; unlabelled rows count as class 0
    pub fn class_indices(&self) -> Vec<i32> {
        self.labels
            .iter()
            .map(|l| l.map(|l| l.class_index() as i32).unwrap_or(0))
            .collect()
    }
}

/// Split instances, in input order, into padded batches of
/// `batch_size`. The last batch may be smaller.
pub fn make_batches(
    instances:  &[EncodedInstance],
    batch_size: usize,
    padding:    &PaddingConfig,
) -> PairResult<Vec<PaddedBatch>> {
    if batch_size == 0 {
        return Err(PairError::config("batch_size must be at least 1"));
    }
    Ok(instances
        .chunks(batch_size)
        .map(|chunk| PaddedBatch::from_instances(chunk, padding))
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn instance(a: &[usize], b: &[usize]) -> EncodedInstance {
        EncodedInstance { ids_a: a.to_vec(), ids_b: b.to_vec(), label: Some(Label::Paraphrase) }
    }

    fn real_tokens(mask: &[bool]) -> usize {
        mask.iter().filter(|&&m| m).count()
    }

    #[test]
    fn test_fixed_padding_pads_and_masks() {
        let batches = make_batches(&[instance(&[2, 3], &[2, 4])], 1, &PaddingConfig::fixed(3, 3)).unwrap();
        let batch = &batches[0];
        assert_eq!(batch.a.ids, vec![vec![2, 3, 0]]);
        assert_eq!(batch.b.ids, vec![vec![2, 4, 0]]);
        assert_eq!(batch.a.mask, vec![vec![true, true, false]]);
        assert_eq!(batch.b.mask, vec![vec![true, true, false]]);
    }

    #[test]
    fn test_truncation_drops_from_tail() {
        let batches = make_batches(&[instance(&[5, 6, 7, 8, 9], &[2])], 1, &PaddingConfig::fixed(3, 2)).unwrap();
        assert_eq!(batches[0].a.ids, vec![vec![5, 6, 7]]);
        assert_eq!(batches[0].a.mask, vec![vec![true, true, true]]);
    }

    #[test]
    fn test_mask_count_is_min_of_length_and_limit() {
        let items = vec![
            instance(&[2, 3, 4, 5, 6], &[2]),
            instance(&[2], &[2, 3, 4]),
            instance(&[2, 3], &[2, 3, 4, 5, 6, 7]),
        ];
        for padding in [PaddingConfig::fixed(4, 4), PaddingConfig::dynamic(4, 4)] {
            let batch = &make_batches(&items, 3, &padding).unwrap()[0];
            for (row, item) in items.iter().enumerate() {
                assert_eq!(real_tokens(&batch.a.mask[row]), item.ids_a.len().min(4));
                assert_eq!(real_tokens(&batch.b.mask[row]), item.ids_b.len().min(4));
            }
        }
    }

    #[test]
    fn test_dynamic_padding_uses_batch_max() {
        let items = vec![instance(&[2, 3], &[2]), instance(&[2, 3, 4], &[2])];
        let batch = &make_batches(&items, 2, &PaddingConfig::dynamic(10, 10)).unwrap()[0];
        assert_eq!(batch.a.len, 3);
        assert_eq!(batch.b.len, 1);
    }

    #[test]
    fn test_last_batch_may_be_smaller_and_order_is_kept() {
        let items: Vec<_> = (2..7).map(|id| instance(&[id], &[id])).collect();
        let batches = make_batches(&items, 2, &PaddingConfig::fixed(1, 1)).unwrap();
        assert_eq!(batches.iter().map(PaddedBatch::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(batches[2].a.ids, vec![vec![6]]);
        assert_eq!(batches[0].a.ids, vec![vec![2], vec![3]]);
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let items: Vec<_> = (2..9).map(|id| instance(&[id, id + 1], &[id])).collect();
        let padding = PaddingConfig::dynamic(5, 5);
        assert_eq!(make_batches(&items, 3, &padding).unwrap(), make_batches(&items, 3, &padding).unwrap());
    }

    #[test]
    fn test_zero_batch_size_is_config_error() {
        let err = make_batches(&[], 0, &PaddingConfig::fixed(3, 3)).unwrap_err();
        assert!(matches!(err, PairError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_mask_length_mismatch() {
        let mut batch = PaddedBatch::from_instances(&[instance(&[2, 3], &[2])], &PaddingConfig::fixed(3, 3));
        assert!(batch.validate().is_ok());
        batch.b.mask[0].pop();
        assert!(matches!(batch.validate(), Err(PairError::InvariantViolation(_))));
    }
}
