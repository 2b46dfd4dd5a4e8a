//! Data-driven parameter table: the normalization engine.
//!
//! [`ParameterTable`] is loaded once from metadata and maps every
//! [`ParameterId`] to its mapper, formatter and unit. All conversions
//! between the normalized domain and physical values go through it:
//!
//! - [`ParameterTable::to_actual`] / [`ParameterTable::to_normalized`]
//! - [`ParameterTable::format`] / [`ParameterTable::parse`]
//!
//! Unknown ids never fail: conversions fall back to identity (after
//! clamping) and formatting to a unit-less float, so the UI keeps working
//! while UI and engine metadata are briefly out of sync.

use crate::error::{MetadataError, MetadataResult};
use crate::parameter_format::Formatter;
use crate::parameter_info::{ParameterMetadata, ParameterShape};
use crate::parameter_range::{
    BooleanMapper, ExponentialMapper, LinearMapper, PowerMapper, RangeMapper, SteppedMapper,
};
use crate::types::{clamp_normalized, NormalizedValue, ParameterId, MAX_PARAMETER_COUNT};

struct ParameterEntry {
    metadata: ParameterMetadata,
    mapper: Box<dyn RangeMapper>,
    formatter: Formatter,
}

impl ParameterEntry {
    fn labels(&self) -> Option<&[String]> {
        self.metadata.enum_values.as_deref()
    }
}

/// Immutable lookup table from [`ParameterId`] to conversion behavior.
#[derive(Default)]
pub struct ParameterTable {
    entries: Vec<Option<ParameterEntry>>,
    count: usize,
}

impl ParameterTable {
    /// Create an empty table. Every id behaves as unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from metadata, validating every entry.
    pub fn from_metadata(
        metadata: impl IntoIterator<Item = ParameterMetadata>,
    ) -> MetadataResult<Self> {
        let mut table = Self::new();
        for meta in metadata {
            table.insert(meta)?;
        }
        Ok(table)
    }

    /// Build a table from a JSON array of metadata objects.
    ///
    /// ```
    /// use beamer_bridge_core::ParameterTable;
    ///
    /// let table = ParameterTable::from_json(r#"[
    ///     {"id": 0, "name": "Gain", "min": -60, "max": 12, "unit": "dB", "defaultValue": 0},
    ///     {"id": 1, "name": "Cutoff", "min": 20, "max": 20000, "unit": "Hz", "shape": "exponential"}
    /// ]"#).unwrap();
    /// assert_eq!(table.format(0, 0.5), "-24.00 dB");
    /// ```
    pub fn from_json(json: &str) -> MetadataResult<Self> {
        let metadata: Vec<ParameterMetadata> = serde_json::from_str(json)?;
        Self::from_metadata(metadata)
    }

    fn insert(&mut self, mut metadata: ParameterMetadata) -> MetadataResult<()> {
        let index = metadata.id as usize;
        if index >= MAX_PARAMETER_COUNT {
            return Err(MetadataError::IdOutOfRange {
                id: metadata.id,
                limit: MAX_PARAMETER_COUNT,
            });
        }
        if self.entries.get(index).is_some_and(Option::is_some) {
            return Err(MetadataError::DuplicateId(metadata.id));
        }

        // Enum values index the labels
        if metadata.shape == ParameterShape::Stepped {
            if let Some(labels) = metadata.enum_values.as_ref().filter(|labels| !labels.is_empty()) {
                metadata.min = 0.0;
                metadata.max = (labels.len() - 1) as f64;
                metadata.step = 1.0;
            }
        }

        let mapper = build_mapper(&metadata)?;
        let formatter = metadata.effective_formatter();

        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        log::debug!(
            "Registered parameter {} '{}' ({:?})",
            metadata.id,
            metadata.name,
            metadata.shape
        );
        self.entries[index] = Some(ParameterEntry {
            metadata,
            mapper,
            formatter,
        });
        self.count += 1;
        Ok(())
    }

    fn entry(&self, id: ParameterId) -> Option<&ParameterEntry> {
        self.entries.get(id as usize).and_then(Option::as_ref)
    }

    /// Number of parameters in the table.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the table has no parameters.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Metadata for a parameter.
    pub fn metadata(&self, id: ParameterId) -> Option<&ParameterMetadata> {
        self.entry(id).map(|entry| &entry.metadata)
    }

    /// Iterate over all metadata in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterMetadata> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.as_ref().map(|entry| &entry.metadata))
    }

    /// Highest registered id plus one; the capacity a value store needs.
    pub fn id_span(&self) -> usize {
        self.entries.len()
    }

    /// Unit label, empty for unknown ids.
    pub fn unit(&self, id: ParameterId) -> &str {
        self.entry(id)
            .map(|entry| entry.metadata.unit.as_str())
            .unwrap_or("")
    }

    /// Whether host automation may be recorded. Unknown ids are automatable.
    pub fn is_automatable(&self, id: ParameterId) -> bool {
        self.entry(id)
            .map(|entry| entry.metadata.automatable)
            .unwrap_or(true)
    }

    /// Convert a normalized value to the parameter's physical value.
    ///
    /// The input is clamped to [0, 1] first. Unknown ids map to identity.
    pub fn to_actual(&self, id: ParameterId, normalized: NormalizedValue) -> f64 {
        let normalized = clamp_normalized(normalized);
        match self.entry(id) {
            Some(entry) => entry.mapper.denormalize(normalized),
            None => normalized,
        }
    }

    /// Convert a physical value to the normalized domain.
    ///
    /// Unknown ids map to identity, clamped to [0, 1].
    pub fn to_normalized(&self, id: ParameterId, actual: f64) -> NormalizedValue {
        match self.entry(id) {
            Some(entry) => clamp_normalized(entry.mapper.normalize(actual)),
            None => clamp_normalized(actual),
        }
    }

    /// Format a normalized value for display, unit included.
    pub fn format(&self, id: ParameterId, normalized: NormalizedValue) -> String {
        let actual = self.to_actual(id, normalized);
        let Some(entry) = self.entry(id) else {
            return Formatter::default().format(actual, None);
        };
        // On/off reads the normalized value so any range works
        let shown = if entry.formatter == Formatter::OnOff {
            clamp_normalized(normalized)
        } else {
            actual
        };
        let text = entry.formatter.format(shown, entry.labels());
        let unit = entry.metadata.unit.as_str();
        if unit.is_empty() || entry.formatter == Formatter::Enum {
            text
        } else {
            format!("{} {}", text, unit)
        }
    }

    /// Parse display text back to a normalized value.
    ///
    /// The unit suffix is optional. Returns `None` if the text cannot be
    /// parsed.
    pub fn parse(&self, id: ParameterId, text: &str) -> Option<NormalizedValue> {
        let Some(entry) = self.entry(id) else {
            return text.trim().parse::<f64>().ok().map(clamp_normalized);
        };
        let text = strip_unit(text.trim(), &entry.metadata.unit);
        let value = entry.formatter.parse(text, entry.labels())?;
        if entry.formatter == Formatter::OnOff {
            return Some(clamp_normalized(value));
        }
        Some(self.to_normalized(id, value))
    }

    /// Normalized default value of every parameter, in id order.
    pub fn defaults(&self) -> impl Iterator<Item = (ParameterId, NormalizedValue)> + '_ {
        self.entries.iter().filter_map(|entry| {
            entry.as_ref().map(|entry| {
                let meta = &entry.metadata;
                (meta.id, clamp_normalized(entry.mapper.normalize(meta.default_value)))
            })
        })
    }
}

impl std::fmt::Debug for ParameterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterTable")
            .field("count", &self.count)
            .field("ids", &self.iter().map(|meta| meta.id).collect::<Vec<_>>())
            .finish()
    }
}

fn strip_unit<'a>(text: &'a str, unit: &str) -> &'a str {
    if unit.is_empty() || text.len() < unit.len() {
        return text;
    }
    let split = text.len() - unit.len();
    match (text.get(..split), text.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(unit) => head.trim_end(),
        _ => text,
    }
}

/// Upper bound on the number of values of a stepped parameter.
pub const MAX_STEP_COUNT: usize = 1 << 20;

fn build_mapper(meta: &ParameterMetadata) -> MetadataResult<Box<dyn RangeMapper>> {
    let (id, min, max) = (meta.id, meta.min, meta.max);
    let invalid = |reason: &'static str| MetadataError::InvalidRange {
        id,
        min,
        max,
        reason,
    };

    if !min.is_finite() || !max.is_finite() {
        return Err(invalid("bounds must be finite"));
    }

    let mapper: Box<dyn RangeMapper> = match meta.shape {
        ParameterShape::Linear => {
            if max <= min {
                return Err(invalid("max must exceed min"));
            }
            Box::new(LinearMapper::new(min, max))
        }
        ParameterShape::Power => {
            if max <= min {
                return Err(invalid("max must exceed min"));
            }
            let exponent = meta.shape_parameter;
            if !(exponent > 0.0 && exponent.is_finite()) {
                return Err(MetadataError::InvalidShapeParameter {
                    id,
                    value: exponent,
                });
            }
            Box::new(PowerMapper::new(min, max, exponent))
        }
        ParameterShape::Exponential => {
            if min <= 0.0 {
                return Err(invalid("exponential shape needs a positive min"));
            }
            if max <= min {
                return Err(invalid("max must exceed min"));
            }
            Box::new(ExponentialMapper::new(min, max))
        }
        ParameterShape::Stepped => {
            if meta.enum_values.as_ref().is_some_and(Vec::is_empty) {
                return Err(MetadataError::EmptyEnum(id));
            }
            if max < min {
                return Err(invalid("max must not be below min"));
            }
            let count = meta.step_count();
            if count > MAX_STEP_COUNT {
                return Err(invalid("too many steps"));
            }
            Box::new(SteppedMapper::new(min, max, count.max(1)))
        }
        ParameterShape::Boolean => {
            if max <= min {
                return Err(invalid("max must exceed min"));
            }
            Box::new(BooleanMapper::new(min, max))
        }
    };
    Ok(mapper)
}
