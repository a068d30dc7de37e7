use super::topology::InputShape;
use crate::common::*;
use chrono::{DateTime, Utc};

/// The time format of artifact names.
pub const ARTIFACT_TIME_FORMAT: &str = "%d-%m-%Y_%H-%M";

/// Lowercase the name and replace spaces with underscores.
pub fn name_to_file(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// The `<name>-<color>-<time>` stem of artifact files.
///
/// The time part is empty when `time` is `None`.
pub fn artifact_stem(name: &str, input_shape: &InputShape, time: Option<DateTime<Utc>>) -> String {
    let time = time
        .map(|time| time.format(ARTIFACT_TIME_FORMAT).to_string())
        .unwrap_or_default();
    format!("{}-{}-{}", name_to_file(name), input_shape.color_tag(), time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_names() {
        assert_eq!(name_to_file("Simple Model"), "simple_model");

        let gray = InputShape::new(46, 46, 1);
        let rgb = InputShape::new(46, 46, 3);
        let time = Utc.ymd(2019, 3, 7).and_hms(9, 5, 0);

        assert_eq!(
            artifact_stem("Simple Model", &gray, Some(time)),
            "simple_model-grayscale-07-03-2019_09-05"
        );
        assert_eq!(artifact_stem("Simple Model", &rgb, None), "simple_model-rgb-");
    }
}
