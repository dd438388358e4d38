//! The statutory schedules the classification rules draw from.
//!
//! Each named rule input is sourced from one schedule in the store,
//! identified by Act and schedule code. Part numbers matter only for
//! Schedule 15, where Part 1 holds the violent offences and Part 2 the
//! sexual offences.

use serde::{Deserialize, Serialize};

/// Identity of a schedule in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRef {
    pub act: &'static str,
    pub code: &'static str,
}

/// Schedule 15 to the Criminal Justice Act 2003. Part 1 lists violent
/// offences, Part 2 sexual offences; the life-sentence subsets feed the
/// sentencing lists.
pub const SCHEDULE_15: ScheduleRef = ScheduleRef {
    act: "Criminal Justice Act 2003",
    code: "15",
};

/// Part number of the violent offences within Schedule 15.
pub const SCHEDULE_15_VIOLENT_PART: i32 = 1;

/// Part number of the sexual offences within Schedule 15.
pub const SCHEDULE_15_SEXUAL_PART: i32 = 2;

/// Schedule 3 to the Sexual Offences Act 2003 (notification requirements).
pub const SCHEDULE_3: ScheduleRef = ScheduleRef {
    act: "Sexual Offences Act 2003",
    code: "3",
};

/// The serious violent offences list introduced by the Police, Crime,
/// Sentencing and Courts Act 2022.
pub const SERIOUS_VIOLENT: ScheduleRef = ScheduleRef {
    act: "Police, Crime, Sentencing and Courts Act 2022",
    code: "SV",
};

/// Sexual offences named directly by the SDS exclusion lists.
pub const SEXUAL_SDS_EXCLUSION: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "SX",
};

/// Domestic abuse offences named by the SDS exclusion lists.
pub const DOMESTIC_ABUSE_SDS_EXCLUSION: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "DA",
};

/// National security offences named by the SDS exclusion lists.
pub const NATIONAL_SECURITY_SDS_EXCLUSION: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "NS",
};

/// Terrorism offences named by the SDS exclusion lists.
pub const TERRORISM_SDS_EXCLUSION: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "TA",
};

/// Tranche-three additions, live only behind the feature toggle.
pub const TRANCHE_THREE_SEXUAL: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "T3SX",
};

pub const TRANCHE_THREE_DOMESTIC_ABUSE: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "T3DA",
};

pub const TRANCHE_THREE_MURDER: ScheduleRef = ScheduleRef {
    act: "Sentencing Act 2020",
    code: "T3M",
};

/// Act whose offences are sexual by legislation regardless of schedule
/// membership.
pub const SEXUAL_OFFENCES_LEGISLATION: &str = "Sexual Offences Act 2003";

/// Statute prefixes reserved for sexual offences.
pub const SEXUAL_CODE_PREFIXES: [&str; 2] = ["SX03", "SX56"];

impl ScheduleRef {
    /// Whether a stored schedule matches this reference.
    #[must_use]
    pub fn matches(&self, act: &str, code: &str) -> bool {
        self.act == act && self.code == code
    }
}

/// The NOMIS schedule identifier a part maps onto, when NOMIS tracks the
/// linkage itself. Link/unlink calls to NOMIS are issued only for these
/// parts; everything else is purely local.
#[must_use]
pub fn nomis_schedule_name(act: &str, code: &str, part_number: i32) -> Option<&'static str> {
    if SCHEDULE_15.matches(act, code) {
        return match part_number {
            1 => Some("SCHEDULE_15_PART_1"),
            2 => Some("SCHEDULE_15_PART_2"),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nomis_schedule_name_only_for_schedule_15() {
        assert_eq!(
            nomis_schedule_name("Criminal Justice Act 2003", "15", 1),
            Some("SCHEDULE_15_PART_1")
        );
        assert_eq!(
            nomis_schedule_name("Criminal Justice Act 2003", "15", 2),
            Some("SCHEDULE_15_PART_2")
        );
        assert_eq!(nomis_schedule_name("Criminal Justice Act 2003", "15", 3), None);
        assert_eq!(nomis_schedule_name("Sexual Offences Act 2003", "3", 1), None);
    }
}
