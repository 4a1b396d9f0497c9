//! Gas name <-> gas code table shared with the network server

/// Name reported for codes missing from the table
pub const UNKNOWN_GAS: &str = "UNKNOWN";

/// Canonical gas names indexed by their wire code.
const GAS_TABLE: [(&str, u8); 14] = [
    ("AIR", 0x00),
    ("NITROGEN", 0x01),
    ("METHANE", 0x02),
    ("CARBON DIOXIDE", 0x03),
    ("PROPANE", 0x04),
    ("BUTANE", 0x05),
    ("ETHANE", 0x06),
    ("HYDROGEN", 0x07),
    ("CARBON MONOXIDE", 0x08),
    ("ACETYLENE", 0x09),
    ("ETHYLENE", 0x0A),
    ("PROPYLENE", 0x0B),
    ("BUTYLENE", 0x0C),
    ("NITROUS OXIDE", 0x0D),
];

/// Static bidirectional mapping between gas names and single-byte gas codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasTable;

impl GasTable {
    /// Name for a gas code, or [`UNKNOWN_GAS`].
    pub fn name_of(code: u8) -> &'static str {
        GAS_TABLE.iter().find(|(_, c)| *c == code).map(|(name, _)| *name).unwrap_or(UNKNOWN_GAS)
    }

    /// Code for a gas name. Matching ignores ASCII case and surrounding whitespace.
    pub fn code_of(name: &str) -> Option<u8> {
        let name = name.trim();
        GAS_TABLE.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, code)| *code)
    }

    /// Whether the code is part of the table.
    pub fn contains(code: u8) -> bool {
        GAS_TABLE.iter().any(|(_, c)| *c == code)
    }

    /// All `(name, code)` entries in code order.
    pub fn entries() -> impl Iterator<Item = (&'static str, u8)> {
        GAS_TABLE.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn table_has_fourteen_contiguous_codes() {
        let codes: Vec<u8> = GasTable::entries().map(|(_, code)| code).collect();
        assert_eq!(codes, (0x00..=0x0D).collect::<Vec<u8>>());
    }

    #[test]
    fn name_code_name_is_identity() {
        for code in 0x00..=0x0Du8 {
            let name = GasTable::name_of(code);
            assert_ne!(name, UNKNOWN_GAS);
            assert_eq!(GasTable::code_of(name), Some(code));
        }
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        assert_eq!(GasTable::code_of("methane"), Some(0x02));
        assert_eq!(GasTable::code_of(" Carbon Dioxide "), Some(0x03));
        assert_eq!(GasTable::code_of("ARGON"), None);
    }

    proptest! {
        #[test]
        fn codes_outside_table_are_unknown(code in 0x0Eu8..=0xFF) {
            prop_assert_eq!(GasTable::name_of(code), UNKNOWN_GAS);
            prop_assert!(!GasTable::contains(code));
        }
    }
}
