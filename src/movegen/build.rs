//! Build/disband-phase move generation.
//!
//! Enumerates legal build, disband, and waive orders for the adjustment
//! phase at the end of a game year.

use crate::board::{
    BoardState, Coast, Location, Order, OrderUnit, Power, ProvinceType, UnitType, ALL_PROVINCES,
    PROVINCE_COUNT,
};

/// Generates all legal build-phase orders for a given power.
///
/// Compares SC count to unit count:
/// - More SCs than units: can build in unoccupied home SCs (plus Waive).
/// - Fewer SCs than units: must disband own units.
/// - Equal: no orders needed (empty vec).
pub fn legal_builds(power: Power, state: &BoardState) -> Vec<Order> {
    let sc_count = count_supply_centers(power, state);
    let unit_count = count_units(power, state);

    if sc_count > unit_count {
        generate_build_orders(power, state, sc_count - unit_count)
    } else if unit_count > sc_count {
        generate_disband_orders(power, state)
    } else {
        Vec::new()
    }
}

/// Counts supply centers owned by the given power.
fn count_supply_centers(power: Power, state: &BoardState) -> usize {
    state.sc_owner.iter().filter(|o| **o == Some(power)).count()
}

/// Counts units belonging to the given power.
fn count_units(power: Power, state: &BoardState) -> usize {
    state
        .units
        .iter()
        .filter(|u| matches!(u, Some((p, _)) if *p == power))
        .count()
}

/// Generates build orders for a power that has more SCs than units.
fn generate_build_orders(power: Power, state: &BoardState, _build_count: usize) -> Vec<Order> {
    let mut orders = Vec::new();

    // Waive is always an option when building.
    orders.push(Order::Waive);

    // Can build in unoccupied home SCs that the power currently owns.
    for prov in ALL_PROVINCES.iter() {
        // Must be a supply center with this power as home power.
        if prov.home_power() != Some(power) {
            continue;
        }
        if !prov.is_supply_center() {
            continue;
        }

        let idx = *prov as usize;

        // Must currently be owned by this power.
        if state.sc_owner[idx] != Some(power) {
            continue;
        }

        // Must be unoccupied.
        if state.units[idx].is_some() {
            continue;
        }

        let prov_type = prov.province_type();

        // Army can be built in land or coastal home SCs.
        if prov_type == ProvinceType::Land || prov_type == ProvinceType::Coastal {
            orders.push(Order::Build {
                unit: OrderUnit {
                    unit_type: UnitType::Army,
                    location: Location::new(*prov),
                },
            });
        }

        // Fleet can be built in coastal or sea home SCs.
        if prov_type == ProvinceType::Coastal || prov_type == ProvinceType::Sea {
            if prov.has_coasts() {
                // Split-coast: generate one build per coast.
                for coast in prov.coasts() {
                    orders.push(Order::Build {
                        unit: OrderUnit {
                            unit_type: UnitType::Fleet,
                            location: Location::with_coast(*prov, *coast),
                        },
                    });
                }
            } else {
                orders.push(Order::Build {
                    unit: OrderUnit {
                        unit_type: UnitType::Fleet,
                        location: Location::new(*prov),
                    },
                });
            }
        }
    }

    orders
}

/// Generates disband orders for a power that has more units than SCs.
fn generate_disband_orders(power: Power, state: &BoardState) -> Vec<Order> {
    let mut orders = Vec::new();

    for i in 0..PROVINCE_COUNT {
        if let Some((p, unit_type)) = state.units[i] {
            if p != power {
                continue;
            }
            let prov = ALL_PROVINCES[i];
            let coast = state.fleet_coast[i].unwrap_or(Coast::None);
            orders.push(Order::Disband {
                unit: OrderUnit {
                    unit_type,
                    location: Location::with_coast(prov, coast),
                },
            });
        }
    }

    orders
}
