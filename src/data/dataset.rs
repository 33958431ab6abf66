use burn::data::dataset::Dataset;

use crate::domain::instance::EncodedInstance;

/// Encoded sentence pairs behind burn's Dataset trait so the
/// DataLoader can call .get(index) and .len() on them.
pub struct PairDataset {
    instances: Vec<EncodedInstance>,
}

impl PairDataset {
    pub fn new(instances: Vec<EncodedInstance>) -> Self { Self { instances } }
}

impl Dataset<EncodedInstance> for PairDataset {
    fn get(&self, index: usize) -> Option<EncodedInstance> {
        self.instances.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}
