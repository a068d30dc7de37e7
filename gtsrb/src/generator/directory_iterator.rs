use super::{load_image, Batch, ClassMode, ColorMode, FlowOptions, ImageTransformer};
use crate::{
    common::*,
    dataset::{ClassifiedDataset, ImageRecord},
};

/// Iterates over a labeled image dataset in batches, endlessly.
///
/// An epoch visits every record once. Records are reshuffled at the start of
/// each epoch when shuffling is enabled.
#[derive(Debug)]
pub struct DirectoryIterator {
    records: Arc<Vec<ImageRecord>>,
    classes: IndexSet<String>,
    transformer: ImageTransformer,
    height: usize,
    width: usize,
    batch_size: usize,
    color_mode: ColorMode,
    class_mode: ClassMode,
    shuffle: bool,
    rng: StdRng,
    order: Vec<usize>,
    cursor: usize,
    epoch: usize,
}

impl DirectoryIterator {
    pub fn new(
        dataset: &dyn ClassifiedDataset,
        transformer: ImageTransformer,
        image_shape: [usize; 2],
        batch_size: usize,
        options: &FlowOptions,
    ) -> Result<Self> {
        let [height, width] = image_shape;
        let FlowOptions {
            color_mode,
            shuffle,
            seed,
            class_mode,
            ..
        } = *options;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(dataset.num_records() > 0, "the dataset has no images");

        let num_classes = dataset.num_classes();
        if let Some(record) = dataset
            .records()
            .iter()
            .find(|record| record.class >= num_classes)
        {
            bail!(
                "class index {} of '{}' exceeds the number of classes {}",
                record.class,
                record.path.display(),
                num_classes
            );
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut iter = Self {
            records: Arc::new(dataset.records().to_vec()),
            classes: dataset.classes().clone(),
            transformer,
            height,
            width,
            batch_size,
            color_mode,
            class_mode,
            shuffle,
            rng,
            order: (0..dataset.num_records()).collect(),
            cursor: 0,
            epoch: 0,
        };
        iter.start_epoch();
        Ok(iter)
    }

    pub fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// The number of batches per epoch.
    pub fn len(&self) -> usize {
        (self.records.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The class indices in the order they are produced in the current epoch.
    pub fn epoch_classes(&self) -> Vec<usize> {
        self.order
            .iter()
            .map(|&index| self.records[index].class)
            .collect()
    }

    /// Restart from the beginning of a new epoch.
    pub fn reset(&mut self) {
        self.start_epoch();
    }

    fn start_epoch(&mut self) {
        self.cursor = 0;
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }

    /// Produce the next batch. The last batch of an epoch may be smaller.
    ///
    /// The position is kept if loading fails, so the same records are tried again.
    pub fn next_batch(&mut self) -> Result<Batch> {
        if self.cursor >= self.order.len() {
            self.epoch += 1;
            self.start_epoch();
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indexes = self.order[self.cursor..end].to_vec();

        let images: Vec<Tensor> = indexes
            .iter()
            .map(|&index| -> Result<_> {
                let record = &self.records[index];
                let image = load_image(&record.path, self.height, self.width, self.color_mode)?;
                self.transformer.transform(&image, &mut self.rng)
            })
            .try_collect()?;
        let images = Tensor::stack(&images, 0);

        let labels = {
            let classes: Vec<i64> = indexes
                .iter()
                .map(|&index| self.records[index].class as i64)
                .collect();
            let classes = Tensor::of_slice(&classes);

            match self.class_mode {
                ClassMode::Categorical => Some(classes.onehot(self.num_classes() as i64)),
                ClassMode::Sparse => Some(classes),
                ClassMode::None => None,
            }
        };

        self.cursor = end;
        Ok(Batch { images, labels })
    }
}

impl Iterator for DirectoryIterator {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
