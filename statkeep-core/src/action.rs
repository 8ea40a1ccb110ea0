use serde::Deserialize;

/// What to do with statistics after they have been exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum StatisticsAction {
    /// Export only summaries, keep everything as is.
    Summary,
    /// Export with details, keep everything as is.
    Full,
    /// Export with details and reset all statistics.
    Reset,
    /// Export summaries and start a new interval.
    MarkMain,
    /// Export with details and start a new interval.
    MarkFull,
}

impl StatisticsAction {
    /// Decodes a numeric action code.
    ///
    /// Unknown codes produce `None`, which callers treat as "do nothing".
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Summary,
            1 => Self::Full,
            2 => Self::Reset,
            3 => Self::MarkMain,
            4 => Self::MarkFull,
            _ => return None,
        })
    }

    /// Returns the numeric code of the action.
    pub fn code(self) -> i32 {
        match self {
            Self::Summary => 0,
            Self::Full => 1,
            Self::Reset => 2,
            Self::MarkMain => 3,
            Self::MarkFull => 4,
        }
    }

    /// Whether nested groups should be visited.
    pub fn shows_details(self) -> bool {
        matches!(self, Self::Full | Self::MarkFull | Self::Reset)
    }

    /// Whether a new interval starts after the export.
    pub fn is_mark(self) -> bool {
        matches!(self, Self::MarkMain | Self::MarkFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        for code in 0..5 {
            let action = StatisticsAction::from_code(code).unwrap();
            assert_eq!(action.code(), code);
        }

        assert_eq!(StatisticsAction::from_code(-1), None);
        assert_eq!(StatisticsAction::from_code(5), None);
    }

    #[test]
    fn details() {
        assert!(!StatisticsAction::Summary.shows_details());
        assert!(!StatisticsAction::MarkMain.shows_details());
        assert!(StatisticsAction::Full.shows_details());
        assert!(StatisticsAction::MarkFull.shows_details());
        assert!(StatisticsAction::Reset.shows_details());
    }
}
