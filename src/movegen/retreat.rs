//! Retreat-phase move generation.
//!
//! Enumerates legal retreat and disband orders for dislodged units.

use crate::board::{
    fleet_coasts_to, provinces_adjacent_to, BoardState, Location, Order, OrderUnit, Province,
    ProvinceType, UnitType,
};

/// Generates all legal retreat-phase orders for a dislodged unit at the given province.
///
/// A dislodged unit may:
/// - Retreat to an adjacent province that is not occupied and is not the
///   province the attacker came from.
/// - Disband (always legal).
///
/// Returns an empty vec if no dislodged unit exists at the province.
pub fn legal_retreats(province: Province, state: &BoardState) -> Vec<Order> {
    let dislodged = match state.dislodged[province as usize] {
        Some(d) => d,
        None => return Vec::new(),
    };

    let unit_type = dislodged.unit_type;
    let coast = dislodged.coast;
    let is_fleet = unit_type == UnitType::Fleet;
    let attacker_from = dislodged.attacker_from;

    let unit = OrderUnit {
        unit_type,
        location: Location::with_coast(province, coast),
    };

    let mut orders = Vec::new();

    // Disband is always legal for a dislodged unit.
    orders.push(Order::Disband { unit });

    // Retreats to adjacent provinces.
    let adj = provinces_adjacent_to(province, coast, is_fleet);
    for dest in adj {
        let dest_type = dest.province_type();

        // Filter by unit type occupancy rules.
        match (unit_type, dest_type) {
            (UnitType::Army, ProvinceType::Sea) => continue,
            (UnitType::Fleet, ProvinceType::Land) => continue,
            _ => {}
        }

        // Cannot retreat to the province the attacker came from.
        if dest == attacker_from {
            continue;
        }

        // Cannot retreat to an occupied province.
        if state.units[dest as usize].is_some() {
            continue;
        }

        // Handle split-coast destinations for fleets.
        if is_fleet && dest.has_coasts() {
            let coasts = fleet_coasts_to(province, coast, dest);
            for c in coasts {
                orders.push(Order::Retreat {
                    unit,
                    dest: Location::with_coast(dest, c),
                });
            }
        } else {
            orders.push(Order::Retreat {
                unit,
                dest: Location::new(dest),
            });
        }
    }

    orders
}
