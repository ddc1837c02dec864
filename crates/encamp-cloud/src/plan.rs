//! The fixed network plan
//!
//! Subnet placement is deterministic: a precomputed list of disjoint
//! blocks carved from the network CIDR, paired with availability zones in
//! order. The plan supports at most four zones; any further zones are left
//! unprovisioned by construction.

use std::collections::BTreeMap;

/// CIDR block of the assembly's virtual network.
pub const VPC_CIDR: &str = "10.2.2.0/26";

/// Disjoint subnet blocks, one per availability zone, in zone order.
pub const SUBNET_CIDRS: [&str; 4] = [
    "10.2.2.0/28",
    "10.2.2.16/28",
    "10.2.2.32/28",
    "10.2.2.48/28",
];

/// Destination block of the default route.
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Zone name to subnet id. A `BTreeMap` so iteration order is the zone
/// names' lexicographic order: the first entry is the well-defined choice
/// of public subnet.
pub type SubnetMap = BTreeMap<String, String>;

/// Pair availability zones with their subnet blocks, truncating at the
/// plan's zone ceiling.
pub fn zone_blocks(zones: &[String]) -> impl Iterator<Item = (&String, &'static str)> {
    zones.iter().zip(SUBNET_CIDRS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|z| z.to_string()).collect()
    }

    #[test]
    fn each_zone_gets_a_distinct_block_in_order() {
        let zones = zones(&["eu-west-1a", "eu-west-1b", "eu-west-1c"]);
        let pairs: Vec<_> = zone_blocks(&zones).collect();
        assert_eq!(
            pairs,
            vec![
                (&"eu-west-1a".to_string(), "10.2.2.0/28"),
                (&"eu-west-1b".to_string(), "10.2.2.16/28"),
                (&"eu-west-1c".to_string(), "10.2.2.32/28"),
            ]
        );
    }

    #[test]
    fn a_fifth_zone_is_left_unprovisioned() {
        let zones = zones(&["a", "b", "c", "d", "e"]);
        let pairs: Vec<_> = zone_blocks(&zones).collect();
        assert_eq!(pairs.len(), 4);
        assert!(!pairs.iter().any(|(zone, _)| *zone == "e"));
    }

    #[test]
    fn subnet_map_orders_zones_lexicographically() {
        let mut map = SubnetMap::new();
        map.insert("us-east-1c".into(), "subnet-c".into());
        map.insert("us-east-1a".into(), "subnet-a".into());
        let first = map.values().next().map(String::as_str);
        assert_eq!(first, Some("subnet-a"));
    }
}
