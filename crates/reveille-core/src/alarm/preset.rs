use serde::{Deserialize, Serialize};

use super::day::Day;

/// Shorthand for creating the same alarm on several days at once.
///
/// Each selected day still becomes its own alarm instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPreset {
    EveryDay,
    Weekdays,
    Weekends,
    EveryOtherDay,
    Custom(Vec<Day>),
}

impl DayPreset {
    /// Expanded days, without repeats, in selection order.
    pub fn days(&self) -> Vec<Day> {
        let days: &[Day] = match self {
            Self::EveryDay => &[
                Day::Monday,
                Day::Tuesday,
                Day::Wednesday,
                Day::Thursday,
                Day::Friday,
                Day::Saturday,
                Day::Sunday,
            ],
            Self::Weekdays => &[
                Day::Monday,
                Day::Tuesday,
                Day::Wednesday,
                Day::Thursday,
                Day::Friday,
            ],
            Self::Weekends => &[Day::Saturday, Day::Sunday],
            Self::EveryOtherDay => &[Day::Monday, Day::Wednesday, Day::Friday, Day::Sunday],
            Self::Custom(days) => days,
        };

        let mut unique = Vec::with_capacity(days.len());
        for day in days {
            if !unique.contains(day) {
                unique.push(*day);
            }
        }
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_day_covers_the_week() {
        let days = DayPreset::EveryDay.days();
        assert_eq!(days.len(), 7);
        for day in Day::ALL {
            assert!(days.contains(&day));
        }
    }

    #[test]
    fn weekdays_and_weekends_partition_the_week() {
        let mut all = DayPreset::Weekdays.days();
        all.extend(DayPreset::Weekends.days());
        all.sort();
        assert_eq!(all, Day::ALL.to_vec());
    }

    #[test]
    fn every_other_day() {
        assert_eq!(
            DayPreset::EveryOtherDay.days(),
            vec![Day::Monday, Day::Wednesday, Day::Friday, Day::Sunday]
        );
    }

    #[test]
    fn custom_collapses_repeats() {
        let preset = DayPreset::Custom(vec![Day::Tuesday, Day::Tuesday, Day::Thursday]);
        assert_eq!(preset.days(), vec![Day::Tuesday, Day::Thursday]);
    }
}
