use crate::common::*;

/// An image file with its class index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub class: usize,
}

/// The dataset of labeled image files.
pub trait ClassifiedDataset
where
    Self: Debug + Sync + Send,
{
    /// The list of class names of the dataset. The index of a name is its class index.
    fn classes(&self) -> &IndexSet<String>;

    /// Get the list of image records in the dataset.
    fn records(&self) -> &[ImageRecord];

    fn num_classes(&self) -> usize {
        self.classes().len()
    }

    fn num_records(&self) -> usize {
        self.records().len()
    }
}
