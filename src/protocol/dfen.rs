//! DFEN (Diplomacy FEN) encoding and decoding.
//!
//! DFEN is a compact string notation for representing a full Diplomacy board
//! position, inspired by chess FEN. It encodes unit positions, ownership,
//! supply-center control, phase, and season in a single line.
//!
//! Format: `<phase_info>/<units>/<supply_centers>/<dislodged>`
//!
//! See DUI_PROTOCOL.md section 2 for the full specification.

use crate::board::province::{Coast, Power, Province, ALL_POWERS, ALL_PROVINCES};
use crate::board::state::{BoardState, DislodgedUnit, Phase, Season};
use crate::board::unit::UnitType;

/// Errors that can occur during DFEN parsing.
#[derive(Debug, thiserror::Error)]
pub enum DfenError {
    #[error("expected 4 sections separated by '/', got {0}")]
    WrongSectionCount(usize),

    #[error("invalid year in phase info: '{0}'")]
    InvalidYear(String),

    #[error("invalid season character: '{0}'")]
    InvalidSeason(char),

    #[error("invalid phase character: '{0}'")]
    InvalidPhase(char),

    #[error("invalid power character: '{0}'")]
    InvalidPower(char),

    #[error("invalid unit type character: '{0}'")]
    InvalidUnitType(char),

    #[error("unknown province abbreviation: '{0}'")]
    UnknownProvince(String),

    #[error("invalid coast abbreviation: '{0}'")]
    InvalidCoast(String),

    #[error("duplicate unit at province '{0}'")]
    DuplicateUnit(String),

    #[error("duplicate SC entry for province '{0}'")]
    DuplicateSc(String),

    #[error("duplicate dislodged unit at province '{0}'")]
    DuplicateDislodged(String),

    #[error("invalid unit entry: '{0}'")]
    InvalidUnitEntry(String),

    #[error("invalid SC entry: '{0}'")]
    InvalidScEntry(String),

    #[error("invalid dislodged entry: '{0}'")]
    InvalidDislodgedEntry(String),

    #[error("phase info too short: '{0}'")]
    PhaseInfoTooShort(String),
}

/// Parses a power character, including 'N' for neutral (returns None).
fn parse_power_or_neutral(c: char) -> Result<Option<Power>, DfenError> {
    if c == 'N' {
        return Ok(None);
    }
    Power::from_dui_char(c)
        .map(Some)
        .ok_or(DfenError::InvalidPower(c))
}

/// Parses a power character (does not accept 'N').
fn parse_power(c: char) -> Result<Power, DfenError> {
    Power::from_dui_char(c).ok_or(DfenError::InvalidPower(c))
}

/// Parses a location string like "vie", "stp.sc", "bul.ec".
/// Returns (Province, Coast).
fn parse_location(s: &str) -> Result<(Province, Coast), DfenError> {
    let (prov_str, coast) = if let Some(dot_pos) = s.find('.') {
        let prov_part = &s[..dot_pos];
        let coast_part = &s[dot_pos + 1..];
        let coast = Coast::from_abbr(coast_part)
            .ok_or_else(|| DfenError::InvalidCoast(coast_part.to_string()))?;
        if coast == Coast::None {
            return Err(DfenError::InvalidCoast(coast_part.to_string()));
        }
        (prov_part, coast)
    } else {
        (s, Coast::None)
    };

    let province = Province::from_abbr(prov_str)
        .ok_or_else(|| DfenError::UnknownProvince(prov_str.to_string()))?;

    Ok((province, coast))
}

/// Parses the phase info section (e.g., "1901sm").
fn parse_phase_info(s: &str) -> Result<(u16, Season, Phase), DfenError> {
    if s.len() < 3 {
        return Err(DfenError::PhaseInfoTooShort(s.to_string()));
    }

    let phase_char = s.as_bytes()[s.len() - 1] as char;
    let season_char = s.as_bytes()[s.len() - 2] as char;
    let year_str = &s[..s.len() - 2];

    let year: u16 = year_str
        .parse()
        .map_err(|_| DfenError::InvalidYear(year_str.to_string()))?;

    let season = Season::from_dfen_char(season_char)
        .ok_or(DfenError::InvalidSeason(season_char))?;

    let phase = Phase::from_dfen_char(phase_char)
        .ok_or(DfenError::InvalidPhase(phase_char))?;

    Ok((year, season, phase))
}

/// Parses the units section (comma-separated entries or "-").
fn parse_units(s: &str, state: &mut BoardState) -> Result<(), DfenError> {
    if s == "-" {
        return Ok(());
    }

    for entry in s.split(',') {
        if entry.len() < 4 {
            return Err(DfenError::InvalidUnitEntry(entry.to_string()));
        }

        let mut chars = entry.chars();
        let power_char = chars.next().unwrap();
        let unit_char = chars.next().unwrap();
        let location_str: String = chars.collect();

        let power = parse_power(power_char)?;
        let unit_type = UnitType::from_dui_char(unit_char)
            .ok_or(DfenError::InvalidUnitType(unit_char))?;
        let (province, coast) = parse_location(&location_str)?;

        let idx = province as usize;
        if state.units[idx].is_some() {
            return Err(DfenError::DuplicateUnit(province.abbr().to_string()));
        }

        state.units[idx] = Some((power, unit_type));
        if coast != Coast::None {
            state.fleet_coast[idx] = Some(coast);
        }
    }

    Ok(())
}

/// Parses the supply centers section (comma-separated entries, all 34 listed).
fn parse_supply_centers(s: &str, state: &mut BoardState) -> Result<(), DfenError> {
    for entry in s.split(',') {
        if entry.len() < 4 {
            return Err(DfenError::InvalidScEntry(entry.to_string()));
        }

        let mut chars = entry.chars();
        let power_char = chars.next().unwrap();
        let prov_str: String = chars.collect();

        let owner = parse_power_or_neutral(power_char)?;
        let province = Province::from_abbr(&prov_str)
            .ok_or_else(|| DfenError::UnknownProvince(prov_str.to_string()))?;

        let idx = province as usize;
        if state.sc_owner[idx].is_some() {
            return Err(DfenError::DuplicateSc(province.abbr().to_string()));
        }

        // Only set owner for non-neutral; None means neutral SC
        state.sc_owner[idx] = owner;
    }

    Ok(())
}

/// Parses the dislodged units section (comma-separated entries or "-").
fn parse_dislodged(s: &str, state: &mut BoardState) -> Result<(), DfenError> {
    if s == "-" {
        return Ok(());
    }

    for entry in s.split(',') {
        let parts: Vec<&str> = entry.split('<').collect();
        if parts.len() != 2 {
            return Err(DfenError::InvalidDislodgedEntry(entry.to_string()));
        }

        let unit_part = parts[0];
        let attacker_prov_str = parts[1];

        if unit_part.len() < 4 {
            return Err(DfenError::InvalidDislodgedEntry(entry.to_string()));
        }

        let mut chars = unit_part.chars();
        let power_char = chars.next().unwrap();
        let unit_char = chars.next().unwrap();
        let location_str: String = chars.collect();

        let power = parse_power(power_char)?;
        let unit_type = UnitType::from_dui_char(unit_char)
            .ok_or(DfenError::InvalidUnitType(unit_char))?;
        let (province, coast) = parse_location(&location_str)?;
        let attacker_from = Province::from_abbr(attacker_prov_str)
            .ok_or_else(|| DfenError::UnknownProvince(attacker_prov_str.to_string()))?;

        let idx = province as usize;
        if state.dislodged[idx].is_some() {
            return Err(DfenError::DuplicateDislodged(province.abbr().to_string()));
        }

        state.dislodged[idx] = Some(DislodgedUnit {
            power,
            unit_type,
            coast,
            attacker_from,
        });
    }

    Ok(())
}

/// Parses a DFEN string into a BoardState.
///
/// Format: `<phase_info>/<units>/<supply_centers>/<dislodged>`
pub fn parse_dfen(s: &str) -> Result<BoardState, DfenError> {
    let sections: Vec<&str> = s.split('/').collect();
    if sections.len() != 4 {
        return Err(DfenError::WrongSectionCount(sections.len()));
    }

    let (year, season, phase) = parse_phase_info(sections[0])?;
    let mut state = BoardState::empty(year, season, phase);

    parse_units(sections[1], &mut state)?;
    parse_supply_centers(sections[2], &mut state)?;
    parse_dislodged(sections[3], &mut state)?;

    Ok(state)
}

/// Encodes a location (province + optional coast) for DFEN output.
fn encode_location(province: Province, coast: Coast) -> String {
    let abbr = province.abbr();
    if coast != Coast::None {
        format!("{}.{}", abbr, coast.abbr())
    } else {
        abbr.to_string()
    }
}

/// Encodes a BoardState into a canonical DFEN string.
///
/// The output is deterministic: units and dislodged entries are grouped by power
/// (A, E, F, G, I, R, T) and sorted by province enum index within each group.
/// Supply centers follow the same power ordering plus neutral (N) at the end,
/// sorted alphabetically by province abbreviation within each group.
pub fn encode_dfen(state: &BoardState) -> String {
    let mut result = String::with_capacity(512);

    // Phase info
    result.push_str(&format!(
        "{}{}{}",
        state.year,
        state.season.dfen_char(),
        state.phase.dfen_char()
    ));

    result.push('/');

    // Units section
    let unit_str = encode_units(state);
    result.push_str(&unit_str);

    result.push('/');

    // Supply centers section
    let sc_str = encode_supply_centers(state);
    result.push_str(&sc_str);

    result.push('/');

    // Dislodged section
    let dis_str = encode_dislodged(state);
    result.push_str(&dis_str);

    result
}

/// Encodes the units section of the DFEN string.
///
/// Units are grouped by power in standard order (A, E, F, G, I, R, T),
/// and within each power, sorted by province enum index (which is alphabetical
/// by abbreviation).
fn encode_units(state: &BoardState) -> String {
    let mut entries: Vec<String> = Vec::new();

    for power in ALL_POWERS.iter() {
        // ALL_PROVINCES is already in alphabetical/index order
        for &prov in ALL_PROVINCES.iter() {
            let idx = prov as usize;
            if let Some((p, ut)) = state.units[idx] {
                if p == *power {
                    let coast = state.fleet_coast[idx].unwrap_or(Coast::None);
                    let loc = encode_location(prov, coast);
                    entries.push(format!("{}{}{}", power.dui_char(), ut.dui_char(), loc));
                }
            }
        }
    }

    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.join(",")
    }
}

/// Encodes the supply centers section of the DFEN string.
///
/// SCs are grouped by power in standard order (A, E, F, G, I, R, T, N),
/// and within each group sorted alphabetically by province abbreviation.
fn encode_supply_centers(state: &BoardState) -> String {
    let mut entries: Vec<String> = Vec::new();

    // Owned SCs grouped by power in standard order
    for power in ALL_POWERS.iter() {
        // ALL_PROVINCES is already alphabetical
        for &prov in ALL_PROVINCES.iter() {
            if prov.is_supply_center() {
                if let Some(owner) = state.sc_owner[prov as usize] {
                    if owner == *power {
                        entries.push(format!("{}{}", power.dui_char(), prov.abbr()));
                    }
                }
            }
        }
    }

    // Neutral SCs (owner is None and province is a supply center)
    for &prov in ALL_PROVINCES.iter() {
        if prov.is_supply_center() && state.sc_owner[prov as usize].is_none() {
            entries.push(format!("N{}", prov.abbr()));
        }
    }

    entries.join(",")
}

/// Encodes the dislodged units section of the DFEN string.
///
/// Dislodged units are grouped by power in standard order (A, E, F, G, I, R, T),
/// and within each power, sorted by province enum index.
fn encode_dislodged(state: &BoardState) -> String {
    let mut entries: Vec<String> = Vec::new();

    for power in ALL_POWERS.iter() {
        for &prov in ALL_PROVINCES.iter() {
            if let Some(ref d) = state.dislodged[prov as usize] {
                if d.power == *power {
                    let loc = encode_location(prov, d.coast);
                    entries.push(format!(
                        "{}{}{}<{}",
                        d.power.dui_char(),
                        d.unit_type.dui_char(),
                        loc,
                        d.attacker_from.abbr()
                    ));
                }
            }
        }
    }

    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.join(",")
    }
}
