//! Human-readable names for enumerated protocol codes.

const TRACK_NAMES: &[&str] = &[
    "Melbourne",           // 0
    "Paul Ricard",         // 1
    "Shanghai",            // 2
    "Sakhir",              // 3
    "Catalunya",           // 4
    "Monaco",              // 5
    "Montreal",            // 6
    "Silverstone",         // 7
    "Hockenheim",          // 8
    "Hungaroring",         // 9
    "Spa",                 // 10
    "Monza",               // 11
    "Singapore",           // 12
    "Suzuka",              // 13
    "Abu Dhabi",           // 14
    "Texas",               // 15
    "Brazil",              // 16
    "Austria",             // 17
    "Sochi",               // 18
    "Mexico",              // 19
    "Baku",                // 20
    "Sakhir Short",        // 21
    "Silverstone Short",   // 22
    "Texas Short",         // 23
    "Suzuka Short",        // 24
    "Hanoi",               // 25
    "Zandvoort",           // 26
    "Imola",               // 27
    "Portimao",            // 28
    "Jeddah",              // 29
    "Miami",               // 30
    "Las Vegas",           // 31
    "Losail",              // 32
];

const SESSION_TYPE_NAMES: &[&str] = &[
    "Unknown",
    "Practice 1",
    "Practice 2",
    "Practice 3",
    "Short Practice",
    "Qualifying 1",
    "Qualifying 2",
    "Qualifying 3",
    "Short Qualifying",
    "One-Shot Qualifying",
    "Sprint Shootout 1",
    "Sprint Shootout 2",
    "Sprint Shootout 3",
    "Short Sprint Shootout",
    "One-Shot Sprint Shootout",
    "Race",
    "Race 2",
    "Race 3",
    "Time Trial",
];

/// Track name for a track id; `None` for `-1` and ids beyond the table.
pub fn track_name(track_id: i8) -> Option<&'static str> {
    usize::try_from(track_id).ok().and_then(|idx| TRACK_NAMES.get(idx).copied())
}

/// Session type name; unknown codes map to `"Unknown"`.
pub fn session_type_name(session_type: u8) -> &'static str {
    SESSION_TYPE_NAMES.get(usize::from(session_type)).copied().unwrap_or("Unknown")
}

/// Actual tyre compound name (F1 modern, F1 classic and F2 codes).
pub fn tyre_compound_name(compound: u8) -> &'static str {
    match compound {
        7 => "Intermediate",
        8 => "Wet",
        9 => "Dry (classic)",
        10 => "Wet (classic)",
        11 => "Super Soft",
        12 => "Soft",
        13 => "Medium",
        14 => "Hard",
        15 => "Wet (F2)",
        16 => "C5",
        17 => "C4",
        18 => "C3",
        19 => "C2",
        20 => "C1",
        21 => "C0",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_names_cover_known_ids() {
        assert_eq!(track_name(5), Some("Monaco"));
        assert_eq!(track_name(10), Some("Spa"));
        assert_eq!(track_name(32), Some("Losail"));
        assert_eq!(track_name(-1), None);
        assert_eq!(track_name(33), None);
    }

    #[test]
    fn session_type_names() {
        assert_eq!(session_type_name(15), "Race");
        assert_eq!(session_type_name(18), "Time Trial");
        assert_eq!(session_type_name(200), "Unknown");
    }

    #[test]
    fn tyre_compound_codes() {
        assert_eq!(tyre_compound_name(16), "C5");
        assert_eq!(tyre_compound_name(21), "C0");
        assert_eq!(tyre_compound_name(7), "Intermediate");
        assert_eq!(tyre_compound_name(0), "Unknown");
    }
}
