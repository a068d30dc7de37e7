use super::{ClassifiedDataset, ImageRecord};
use crate::common::*;

/// A row of a GTSRB ground truth table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthRow {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Width")]
    pub width: usize,
    #[serde(rename = "Height")]
    pub height: usize,
    #[serde(rename = "Roi.X1")]
    pub roi_x1: usize,
    #[serde(rename = "Roi.Y1")]
    pub roi_y1: usize,
    #[serde(rename = "Roi.X2")]
    pub roi_x2: usize,
    #[serde(rename = "Roi.Y2")]
    pub roi_y2: usize,
    #[serde(rename = "ClassId")]
    pub class_id: usize,
}

/// The semicolon-separated ground truth table shipped with GTSRB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthTable {
    pub rows: Vec<GroundTruthRow>,
}

impl GroundTruthTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        Self::from_reader(reader)
            .with_context(|| format!("failed to parse '{}'", path.display()))
    }

    pub fn from_reader<R>(mut reader: csv::Reader<R>) -> Result<Self>
    where
        R: io::Read,
    {
        let rows: Vec<GroundTruthRow> = reader.deserialize::<GroundTruthRow>().try_collect()?;
        Ok(Self { rows })
    }

    /// The largest class id plus one.
    pub fn num_classes(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.class_id + 1)
            .max()
            .unwrap_or(0)
    }
}

/// The dataset of a flat image directory labeled by a ground truth table.
#[derive(Debug, Clone)]
pub struct TableDataset {
    pub image_dir: PathBuf,
    pub classes: IndexSet<String>,
    pub records: Vec<ImageRecord>,
}

impl ClassifiedDataset for TableDataset {
    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    fn records(&self) -> &[ImageRecord] {
        &self.records
    }
}

impl TableDataset {
    /// Build the dataset. Class names are zero-padded ids, the same as training folder names.
    pub fn from_table(
        image_dir: impl AsRef<Path>,
        table: &GroundTruthTable,
        num_classes: impl Into<Option<usize>>,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let num_classes = num_classes.into().unwrap_or(0).max(table.num_classes());
        let classes: IndexSet<_> = (0..num_classes).map(class_dir_name).collect();

        let records: Vec<_> = table
            .rows
            .iter()
            .map(|row| ImageRecord {
                path: image_dir.join(&row.filename),
                class: row.class_id,
            })
            .collect();

        Ok(Self {
            image_dir: image_dir.to_owned(),
            classes,
            records,
        })
    }

    pub fn load(
        image_dir: impl AsRef<Path>,
        table_file: impl AsRef<Path>,
        num_classes: impl Into<Option<usize>>,
    ) -> Result<Self> {
        let table = GroundTruthTable::load(table_file)?;
        Self::from_table(image_dir, &table, num_classes)
    }
}

/// The directory name GTSRB uses for a class id.
pub fn class_dir_name(class_id: usize) -> String {
    format!("{:05}", class_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Filename;Width;Height;Roi.X1;Roi.Y1;Roi.X2;Roi.Y2;ClassId
00000.ppm;53;54;6;5;48;49;16
00001.ppm;42;45;5;5;36;40;1
";

    #[test]
    fn parse_ground_truth_table() -> Result<()> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(TABLE.as_bytes());
        let table = GroundTruthTable::from_reader(reader)?;

        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            GroundTruthRow {
                filename: "00000.ppm".into(),
                width: 53,
                height: 54,
                roi_x1: 6,
                roi_y1: 5,
                roi_x2: 48,
                roi_y2: 49,
                class_id: 16,
            }
        );
        assert_eq!(table.num_classes(), 17);

        let dataset = TableDataset::from_table("images", &table, 43)?;
        assert_eq!(dataset.num_classes(), 43);
        assert_eq!(dataset.classes.get_index(16).unwrap(), "00016");
        assert_eq!(dataset.records[1].path, Path::new("images/00001.ppm"));
        assert_eq!(dataset.records[1].class, 1);
        Ok(())
    }
}
