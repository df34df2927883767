use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::category::{WasteCategory, CATEGORY_COUNT, PRIORITY_ORDER};

/// One label returned by the label-detection service for one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "Name")]
    pub name: String,
    /// Percentage in 0..=100.
    #[serde(rename = "Confidence")]
    pub confidence: f32,
}

impl Detection {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Per-category item counts for one classification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationTally {
    counts: [u32; CATEGORY_COUNT],
}

impl ClassificationTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: WasteCategory) -> u32 {
        self.counts[category.index()]
    }

    pub(crate) fn increment(&mut self, category: WasteCategory) {
        self.counts[category.index()] += 1;
    }

    pub(crate) fn add(&mut self, category: WasteCategory, count: u32) {
        self.counts[category.index()] += count;
    }

    /// Sum across all categories.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Items counted in any recyclable category.
    pub fn recyclable_total(&self) -> u32 {
        self.iter()
            .filter(|(category, _)| category.is_recyclable())
            .map(|(_, count)| count)
            .sum()
    }

    /// Category counts in priority order, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (WasteCategory, u32)> + '_ {
        PRIORITY_ORDER
            .iter()
            .map(move |category| (*category, self.get(*category)))
    }

    /// Adds another tally's counts into this one.
    pub fn merge(&mut self, other: &ClassificationTally) {
        for (slot, count) in self.counts.iter_mut().zip(other.counts.iter()) {
            *slot += count;
        }
    }
}

impl Serialize for ClassificationTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CATEGORY_COUNT))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.label(), &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_reads_service_label_shape() {
        let json = r#"{"Name":"Bottle","Confidence":95.2,"Instances":[],"Parents":[]}"#;
        let detection: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.name, "Bottle");
        assert!((detection.confidence - 95.2).abs() < 1e-4);
    }

    #[test]
    fn merge_sums_counts() {
        let mut a = ClassificationTally::new();
        a.increment(WasteCategory::RecyclableCans);
        a.increment(WasteCategory::Other);
        let mut b = ClassificationTally::new();
        b.add(WasteCategory::RecyclableCans, 3);

        a.merge(&b);

        assert_eq!(a.get(WasteCategory::RecyclableCans), 4);
        assert_eq!(a.get(WasteCategory::Other), 1);
        assert_eq!(a.total(), 5);
        assert_eq!(a.recyclable_total(), 4);
    }

    #[test]
    fn serializes_as_label_map() {
        let mut tally = ClassificationTally::new();
        tally.increment(WasteCategory::RecyclableBottles);
        let value = serde_json::to_value(tally).unwrap();
        assert_eq!(value["recyclable_bottles"], 1);
        assert_eq!(value["other"], 0);
        assert_eq!(value.as_object().unwrap().len(), CATEGORY_COUNT);
    }
}
