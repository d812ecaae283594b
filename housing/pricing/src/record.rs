//! Typed single-house input used by the dashboard and the `predict` command.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{Cell, Table};

/// Amenity flag as written in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    /// `yes`
    Yes,
    /// `no`
    No,
}

impl YesNo {
    /// Selector choices in display order.
    pub const CHOICES: [Self; 2] = [Self::Yes, Self::No];

    /// Dataset label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// Furnishing state as written in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FurnishingStatus {
    /// `furnished`
    Furnished,
    /// `semi-furnished`
    SemiFurnished,
    /// `unfurnished`
    Unfurnished,
}

impl FurnishingStatus {
    /// Selector choices in display order.
    pub const CHOICES: [Self; 3] = [Self::Furnished, Self::SemiFurnished, Self::Unfurnished];

    /// Dataset label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Furnished => "furnished",
            Self::SemiFurnished => "semi-furnished",
            Self::Unfurnished => "unfurnished",
        }
    }
}

macro_rules! label_traits {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::CHOICES
                    .into_iter()
                    .find(|choice| choice.as_str() == wanted)
                    .ok_or_else(|| ParseChoiceError {
                        value: s.to_string(),
                        expected: Self::CHOICES.iter().map(|c| c.as_str()).collect(),
                    })
            }
        }
    };
}

label_traits!(YesNo);
label_traits!(FurnishingStatus);

/// Text that matches none of a selector's choices.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{value}` is not one of {expected:?}")]
pub struct ParseChoiceError {
    /// Rejected input.
    pub value: String,
    /// Accepted labels.
    pub expected: Vec<&'static str>,
}

/// Bounds of one integer slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntRange {
    /// Dataset column.
    pub field: &'static str,
    /// Human label.
    pub label: &'static str,
    /// Inclusive lower bound.
    pub min: u32,
    /// Inclusive upper bound.
    pub max: u32,
    /// Increment between accepted values, counted from `min`.
    pub step: u32,
    /// Initial value.
    pub default: u32,
}

impl IntRange {
    /// Checks a value against the bounds and the step grid.
    pub fn check(&self, value: u32) -> Result<(), InputError> {
        if value < self.min || value > self.max {
            return Err(InputError::OutOfRange {
                field: self.field,
                value,
                min: self.min,
                max: self.max,
            });
        }
        if (value - self.min) % self.step != 0 {
            return Err(InputError::OffStep {
                field: self.field,
                value,
                step: self.step,
            });
        }
        Ok(())
    }
}

/// Area slider (square feet).
pub const AREA: IntRange = IntRange {
    field: "area",
    label: "Area (sq ft)",
    min: 500,
    max: 10_000,
    step: 100,
    default: 3_000,
};
/// Bedrooms slider.
pub const BEDROOMS: IntRange = IntRange {
    field: "bedrooms",
    label: "Bedrooms",
    min: 1,
    max: 10,
    step: 1,
    default: 3,
};
/// Stories slider.
pub const STORIES: IntRange = IntRange {
    field: "stories",
    label: "Stories",
    min: 1,
    max: 5,
    step: 1,
    default: 2,
};
/// Bathrooms slider.
pub const BATHROOMS: IntRange = IntRange {
    field: "bathrooms",
    label: "Bathrooms",
    min: 1,
    max: 5,
    step: 1,
    default: 2,
};
/// Parking slider.
pub const PARKING: IntRange = IntRange {
    field: "parking",
    label: "Parking Spaces",
    min: 0,
    max: 5,
    step: 1,
    default: 1,
};

/// Sliders in form order.
pub const SLIDERS: [IntRange; 5] = [AREA, BEDROOMS, STORIES, BATHROOMS, PARKING];

/// Amenity selectors as `(column, label)` in form order.
pub const AMENITIES: [(&str, &str); 6] = [
    ("mainroad", "Main Road"),
    ("guestroom", "Guest Room"),
    ("basement", "Basement"),
    ("prefarea", "Preferred Area"),
    ("hotwaterheating", "Hot Water Heating"),
    ("airconditioning", "Air Conditioning"),
];

/// One house described with the dataset's feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseFeatures {
    /// Floor area in square feet.
    pub area: u32,
    /// Bedroom count.
    pub bedrooms: u32,
    /// Bathroom count.
    pub bathrooms: u32,
    /// Story count.
    pub stories: u32,
    /// Faces a main road.
    pub mainroad: YesNo,
    /// Has a guest room.
    pub guestroom: YesNo,
    /// Has a basement.
    pub basement: YesNo,
    /// Has hot water heating.
    pub hotwaterheating: YesNo,
    /// Has air conditioning.
    pub airconditioning: YesNo,
    /// Parking spaces.
    pub parking: u32,
    /// Located in a preferred area.
    pub prefarea: YesNo,
    /// Furnishing state.
    pub furnishingstatus: FurnishingStatus,
}

impl Default for HouseFeatures {
    fn default() -> Self {
        Self {
            area: AREA.default,
            bedrooms: BEDROOMS.default,
            bathrooms: BATHROOMS.default,
            stories: STORIES.default,
            mainroad: YesNo::Yes,
            guestroom: YesNo::Yes,
            basement: YesNo::Yes,
            hotwaterheating: YesNo::Yes,
            airconditioning: YesNo::Yes,
            parking: PARKING.default,
            prefarea: YesNo::Yes,
            furnishingstatus: FurnishingStatus::Furnished,
        }
    }
}

impl HouseFeatures {
    /// Every slider at its lower bound and every amenity set to `no`.
    #[must_use]
    pub const fn minimum() -> Self {
        Self {
            area: AREA.min,
            bedrooms: BEDROOMS.min,
            bathrooms: BATHROOMS.min,
            stories: STORIES.min,
            mainroad: YesNo::No,
            guestroom: YesNo::No,
            basement: YesNo::No,
            hotwaterheating: YesNo::No,
            airconditioning: YesNo::No,
            parking: PARKING.min,
            prefarea: YesNo::No,
            furnishingstatus: FurnishingStatus::Furnished,
        }
    }

    /// Checks every slider value against its bounds.
    pub fn validate(&self) -> Result<(), InputError> {
        AREA.check(self.area)?;
        BEDROOMS.check(self.bedrooms)?;
        STORIES.check(self.stories)?;
        BATHROOMS.check(self.bathrooms)?;
        PARKING.check(self.parking)
    }

    /// Value of an amenity column by name.
    #[must_use]
    pub fn amenity(&self, column: &str) -> Option<YesNo> {
        match column {
            "mainroad" => Some(self.mainroad),
            "guestroom" => Some(self.guestroom),
            "basement" => Some(self.basement),
            "hotwaterheating" => Some(self.hotwaterheating),
            "airconditioning" => Some(self.airconditioning),
            "prefarea" => Some(self.prefarea),
            _ => None,
        }
    }

    /// Value of a slider column by name.
    #[must_use]
    pub fn slider(&self, column: &str) -> Option<u32> {
        match column {
            "area" => Some(self.area),
            "bedrooms" => Some(self.bedrooms),
            "bathrooms" => Some(self.bathrooms),
            "stories" => Some(self.stories),
            "parking" => Some(self.parking),
            _ => None,
        }
    }

    /// Single-row table in dataset column order.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let number = |value: u32| Cell::Number(f64::from(value));
        let label = |value: &str| Cell::Label(value.to_string());
        Table::single_row([
            ("area", number(self.area)),
            ("bedrooms", number(self.bedrooms)),
            ("bathrooms", number(self.bathrooms)),
            ("stories", number(self.stories)),
            ("mainroad", label(self.mainroad.as_str())),
            ("guestroom", label(self.guestroom.as_str())),
            ("basement", label(self.basement.as_str())),
            ("hotwaterheating", label(self.hotwaterheating.as_str())),
            ("airconditioning", label(self.airconditioning.as_str())),
            ("parking", number(self.parking)),
            ("prefarea", label(self.prefarea.as_str())),
            ("furnishingstatus", label(self.furnishingstatus.as_str())),
        ])
    }
}

/// Slider value rejected by [`HouseFeatures::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Value outside the slider bounds.
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Column name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// Value between two slider stops.
    #[error("{field} = {value} is not a multiple of {step} from the minimum")]
    OffStep {
        /// Column name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Slider step.
        step: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnKind;

    #[test]
    fn defaults_match_dashboard_widgets() {
        let house = HouseFeatures::default();
        assert_eq!(house.area, 3_000);
        assert_eq!(house.bedrooms, 3);
        assert_eq!(house.stories, 2);
        assert_eq!(house.bathrooms, 2);
        assert_eq!(house.parking, 1);
        assert_eq!(house.mainroad, YesNo::Yes);
        assert_eq!(house.furnishingstatus, FurnishingStatus::Furnished);
        house.validate().unwrap();
        HouseFeatures::minimum().validate().unwrap();
    }

    #[test]
    fn validation_enforces_bounds_and_step() {
        let mut house = HouseFeatures::default();
        house.area = 10_100;
        assert!(matches!(
            house.validate(),
            Err(InputError::OutOfRange { field: "area", .. })
        ));
        house.area = 3_050;
        assert!(matches!(
            house.validate(),
            Err(InputError::OffStep { field: "area", .. })
        ));
        house.area = 3_000;
        house.parking = 6;
        assert!(house.validate().is_err());
        house.parking = 0;
        house.bedrooms = 0;
        assert!(house.validate().is_err());
    }

    #[test]
    fn table_has_dataset_columns() {
        let table = HouseFeatures::default().to_table();
        assert_eq!(table.height(), 1);
        assert_eq!(table.width(), 12);
        let names: Vec<_> = table.names().collect();
        assert_eq!(names.first(), Some(&"area"));
        assert_eq!(names[9], "parking");
        assert_eq!(names.last(), Some(&"furnishingstatus"));
        assert_eq!(table.require("area").unwrap().as_numeric(), Some(&[3_000.0][..]));
        assert_eq!(
            table.require("furnishingstatus").unwrap().kind(),
            ColumnKind::Categorical
        );
        assert_eq!(
            table.require("furnishingstatus").unwrap().label(0).as_deref(),
            Some("furnished")
        );
    }

    #[test]
    fn choices_parse_from_labels() {
        assert_eq!("Yes".parse::<YesNo>().unwrap(), YesNo::Yes);
        assert_eq!(
            "semi-furnished".parse::<FurnishingStatus>().unwrap(),
            FurnishingStatus::SemiFurnished
        );
        assert!("maybe".parse::<YesNo>().is_err());
    }

    #[test]
    fn serde_uses_dataset_labels() {
        let json = serde_json::to_value(HouseFeatures::minimum()).unwrap();
        assert_eq!(json["mainroad"], "no");
        assert_eq!(json["furnishingstatus"], "furnished");
        let back: HouseFeatures = serde_json::from_value(json).unwrap();
        assert_eq!(back, HouseFeatures::minimum());
    }
}
