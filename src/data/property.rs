//! Property JSON: bounding box, drillholes, surveys and mineral intervals.
//!
//! Shapes are validated here so the core never sees optional or malformed
//! data.

use serde::{Deserialize, Serialize};

use super::Interval;
use crate::error::DrillscopeError;

/// Axis-aligned bounds of the property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

/// One mineral assay along a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mineral {
    /// Assay value.
    pub value: f32,
    /// Start depth along the hole.
    pub from: f32,
    /// End depth along the hole.
    pub to: f32,
    /// Scene-space path; the first and last points bound the interval.
    pub path: Vec<[f32; 3]>,
}

/// A drillhole with its survey path and assays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    /// Hole name.
    #[serde(default)]
    pub name: String,
    /// Survey points in scene space.
    #[serde(default)]
    pub surveys: Vec<[f32; 3]>,
    /// Mineral intervals.
    #[serde(default)]
    pub minerals: Vec<Mineral>,
}

/// Descriptive data for an interval id, for tooltips and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalLabel<'a> {
    /// Name of the hole the interval belongs to.
    pub hole: &'a str,
    /// Start depth.
    pub from: f32,
    /// End depth.
    pub to: f32,
    /// Assay value.
    pub value: f32,
}

/// A parsed, validated property file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Bounding box corners.
    #[serde(rename = "box")]
    pub bounds: BoundingBox,
    /// Drillholes.
    #[serde(default)]
    pub holes: Vec<Hole>,
}

impl Property {
    /// Parse and validate property JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::PropertyParse`] for malformed JSON, paths
    /// with fewer than two points, or non-finite numbers.
    pub fn from_json(json: &str) -> Result<Self, DrillscopeError> {
        let property: Self = serde_json::from_str(json)
            .map_err(|e| DrillscopeError::PropertyParse(e.to_string()))?;
        property.validate()?;
        Ok(property)
    }

    /// Read and parse a property file.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Io`] if the file cannot be read, otherwise
    /// as [`Property::from_json`].
    pub fn load(path: &std::path::Path) -> Result<Self, DrillscopeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), DrillscopeError> {
        let finite = |p: &[f32; 3]| p.iter().all(|c| c.is_finite());
        if !finite(&self.bounds.min) || !finite(&self.bounds.max) {
            return Err(DrillscopeError::PropertyParse(
                "bounding box has non-finite corners".to_owned(),
            ));
        }
        for hole in &self.holes {
            for (m, mineral) in hole.minerals.iter().enumerate() {
                if mineral.path.len() < 2 {
                    return Err(DrillscopeError::PropertyParse(format!(
                        "hole '{}' mineral {m}: path needs two points, got {}",
                        hole.name,
                        mineral.path.len()
                    )));
                }
                if !mineral.value.is_finite() || !mineral.path.iter().all(finite)
                {
                    return Err(DrillscopeError::PropertyParse(format!(
                        "hole '{}' mineral {m}: non-finite value or path",
                        hole.name
                    )));
                }
            }
            if !hole.surveys.iter().all(finite) {
                return Err(DrillscopeError::PropertyParse(format!(
                    "hole '{}': non-finite survey point",
                    hole.name
                )));
            }
        }
        Ok(())
    }

    /// Every mineral as an [`Interval`], in hole order.
    ///
    /// Ids are the ordinal position, so a decoded pick id is also the
    /// instance index.
    #[must_use]
    pub fn intervals(&self) -> Vec<Interval> {
        self.minerals()
            .enumerate()
            .filter_map(|(id, (_, mineral))| {
                let start = *mineral.path.first()?;
                let end = *mineral.path.last()?;
                Some(Interval::new(start, end, mineral.value, id as u32))
            })
            .collect()
    }

    /// Consecutive survey point pairs of every hole.
    #[must_use]
    pub fn survey_segments(&self) -> Vec<([f32; 3], [f32; 3])> {
        self.holes
            .iter()
            .flat_map(|h| h.surveys.windows(2).map(|w| (w[0], w[1])))
            .collect()
    }

    /// Label of the interval with ordinal `id`.
    #[must_use]
    pub fn label(&self, id: u32) -> Option<IntervalLabel<'_>> {
        self.minerals()
            .nth(id as usize)
            .map(|(hole, mineral)| IntervalLabel {
                hole: &hole.name,
                from: mineral.from,
                to: mineral.to,
                value: mineral.value,
            })
    }

    fn minerals(&self) -> impl Iterator<Item = (&Hole, &Mineral)> {
        self.holes
            .iter()
            .flat_map(|h| h.minerals.iter().map(move |m| (h, m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "box": { "min": [0, 0, -100], "max": [50, 50, 0] },
        "holes": [
            {
                "name": "DH-01",
                "surveys": [[0, 0, 0], [0, 0, -50], [1, 0, -100]],
                "minerals": [
                    { "value": 9.0, "from": 10, "to": 20,
                      "path": [[0, 0, -10], [0, 0, -20]] },
                    { "value": 0.5, "from": 20, "to": 30,
                      "path": [[0, 0, -20], [0, 0, -25], [0, 0, -30]] }
                ]
            },
            {
                "name": "DH-02",
                "minerals": [
                    { "value": 120.0, "from": 5, "to": 6,
                      "path": [[10, 10, -5], [10, 10, -6]] }
                ]
            }
        ]
    }"#;

    #[test]
    fn flattens_minerals_in_hole_order() {
        let property = Property::from_json(SAMPLE).unwrap();
        let intervals = property.intervals();
        assert_eq!(intervals.len(), 3);
        assert_eq!(
            intervals.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(intervals[1].end.to_array(), [0.0, 0.0, -30.0]);
        assert_eq!(intervals[2].value, 120.0);
        assert!((intervals[0].length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn labels_resolve_by_id() {
        let property = Property::from_json(SAMPLE).unwrap();
        let label = property.label(2).unwrap();
        assert_eq!(label.hole, "DH-02");
        assert_eq!(label.from, 5.0);
        assert!(property.label(3).is_none());
    }

    #[test]
    fn survey_segments_pair_points() {
        let property = Property::from_json(SAMPLE).unwrap();
        assert_eq!(property.survey_segments().len(), 2);
        assert_eq!(property.bounds.center(), [25.0, 25.0, -50.0]);
    }

    #[test]
    fn short_paths_are_rejected() {
        let json = r#"{ "box": { "min": [0,0,0], "max": [1,1,1] },
            "holes": [{ "name": "x", "minerals": [
                { "value": 1, "from": 0, "to": 1, "path": [[0,0,0]] }
            ] }] }"#;
        let err = Property::from_json(json).unwrap_err();
        assert!(matches!(err, DrillscopeError::PropertyParse(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(Property::from_json("{ \"holes\": [] }").is_err());
        assert!(Property::from_json("not json").is_err());
    }
}
