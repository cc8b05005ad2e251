//! Bus seat layouts.
//!
//! A layout is a row-major `rows x cols` grid. Cells with an empty label and
//! type `aisle` are walkways; every other cell is a sellable seat with a
//! label unique within the layout (e.g. "1A"). The label set is fixed for
//! the lifetime of the bus.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Seater,
    Sleeper,
    SemiSleeper,
    Aisle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayout {
    pub rows: u32,
    pub cols: u32,
    /// Row-major cell labels; `""` marks an aisle cell.
    pub labels: Vec<String>,
    /// Row-major cell types, parallel to `labels`.
    pub types: Vec<SeatType>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has {got} cells, expected rows x cols = {expected}")]
    CellCountMismatch { expected: usize, got: usize },
    #[error("cell {index} mixes aisle and seat markers")]
    InconsistentCell { index: usize },
    #[error("duplicate seat label {0}")]
    DuplicateLabel(String),
}

impl SeatLayout {
    /// Check grid shape, aisle consistency and label uniqueness.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let expected = (self.rows as usize) * (self.cols as usize);
        if self.labels.len() != expected || self.types.len() != expected {
            return Err(LayoutError::CellCountMismatch {
                expected,
                got: self.labels.len().max(self.types.len()),
            });
        }
        let mut seen = HashSet::new();
        for (index, (label, ty)) in self.labels.iter().zip(&self.types).enumerate() {
            let is_aisle = *ty == SeatType::Aisle;
            if is_aisle != label.is_empty() {
                return Err(LayoutError::InconsistentCell { index });
            }
            if !is_aisle && !seen.insert(label.as_str()) {
                return Err(LayoutError::DuplicateLabel(label.clone()));
            }
        }
        Ok(())
    }

    /// Sellable seat labels, in grid order.
    pub fn seat_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter(|l| !l.is_empty())
            .cloned()
            .collect()
    }

    pub fn seat_count(&self) -> usize {
        self.labels.iter().filter(|l| !l.is_empty()).count()
    }

    pub fn contains_label(&self, label: &str) -> bool {
        !label.is_empty() && self.labels.iter().any(|l| l == label)
    }
}

/// Preset layouts operators pick from when registering a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreset {
    /// 2 columns + aisle + 2 columns, all seater. 40 seats over 10 rows.
    Seater2x2,
    /// 1 column + aisle + 2 columns, all sleeper. 30 berths over 10 rows.
    Sleeper1x2,
    /// 1+2 with seater rows on the lower deck and sleeper rows on the upper.
    MixedSeaterSleeper1x2,
}

impl LayoutPreset {
    pub fn layout(self) -> SeatLayout {
        match self {
            LayoutPreset::Seater2x2 => seater_2x2(10),
            LayoutPreset::Sleeper1x2 => sleeper_1x2(10),
            LayoutPreset::MixedSeaterSleeper1x2 => mixed_seater_sleeper_1x2(10),
        }
    }
}

fn seater_2x2(rows: u32) -> SeatLayout {
    let mut labels = Vec::new();
    let mut types = Vec::new();
    for r in 1..=rows {
        labels.extend([
            format!("{r}A"),
            format!("{r}B"),
            String::new(),
            format!("{r}C"),
            format!("{r}D"),
        ]);
        types.extend([
            SeatType::Seater,
            SeatType::Seater,
            SeatType::Aisle,
            SeatType::Seater,
            SeatType::Seater,
        ]);
    }
    SeatLayout {
        rows,
        cols: 5,
        labels,
        types,
    }
}

fn sleeper_1x2(rows: u32) -> SeatLayout {
    one_by_two(rows, |_| SeatType::Sleeper)
}

/// First half of the rows is the lower (seater) deck, second half the upper
/// (sleeper) deck.
fn mixed_seater_sleeper_1x2(rows: u32) -> SeatLayout {
    let half = rows / 2;
    one_by_two(rows, move |r| {
        if r <= half {
            SeatType::Seater
        } else {
            SeatType::Sleeper
        }
    })
}

fn one_by_two(rows: u32, row_type: impl Fn(u32) -> SeatType) -> SeatLayout {
    let mut labels = Vec::new();
    let mut types = Vec::new();
    for r in 1..=rows {
        let ty = row_type(r);
        labels.extend([
            format!("{r}A"),
            String::new(),
            format!("{r}B"),
            format!("{r}C"),
        ]);
        types.extend([ty, SeatType::Aisle, ty, ty]);
    }
    SeatLayout {
        rows,
        cols: 4,
        labels,
        types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seater_preset_has_forty_seats() {
        let layout = LayoutPreset::Seater2x2.layout();
        layout.validate().unwrap();
        assert_eq!(layout.rows, 10);
        assert_eq!(layout.cols, 5);
        assert_eq!(layout.seat_count(), 40);
        assert!(layout.contains_label("1A"));
        assert!(layout.contains_label("10D"));
        assert!(!layout.contains_label("11A"));
    }

    #[test]
    fn sleeper_preset_has_thirty_berths() {
        let layout = LayoutPreset::Sleeper1x2.layout();
        layout.validate().unwrap();
        assert_eq!(layout.seat_count(), 30);
        assert!(layout.types.contains(&SeatType::Aisle));
        assert!(!layout.types.contains(&SeatType::Seater));
    }

    #[test]
    fn mixed_preset_splits_decks() {
        let layout = LayoutPreset::MixedSeaterSleeper1x2.layout();
        layout.validate().unwrap();
        // Row 1 is lower deck, row 10 upper deck.
        assert_eq!(layout.types[0], SeatType::Seater);
        assert_eq!(layout.types[layout.types.len() - 1], SeatType::Sleeper);
    }

    #[test]
    fn validate_rejects_duplicate_labels() {
        let mut layout = LayoutPreset::Seater2x2.layout();
        layout.labels[1] = "1A".to_string();
        assert_eq!(
            layout.validate(),
            Err(LayoutError::DuplicateLabel("1A".to_string()))
        );
    }

    #[test]
    fn validate_rejects_labelled_aisle() {
        let mut layout = LayoutPreset::Seater2x2.layout();
        layout.labels[2] = "1X".to_string();
        assert_eq!(layout.validate(), Err(LayoutError::InconsistentCell { index: 2 }));
    }

    #[test]
    fn validate_rejects_wrong_cell_count() {
        let mut layout = LayoutPreset::Seater2x2.layout();
        layout.labels.pop();
        layout.types.pop();
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::CellCountMismatch { .. })
        ));
    }
}
