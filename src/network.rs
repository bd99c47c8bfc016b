//! Static route data: the fare table and city coordinates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::geo::Coordinates;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FareRule {
    pub from: String,
    pub to: String,
    pub fare: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// File layout for `NETWORK_FILE`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub fares: Vec<FareRule>,
    pub cities: Vec<City>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let fare = |from: &str, to: &str, fare: f64| FareRule {
            from: from.to_string(),
            to: to.to_string(),
            fare,
        };
        let city = |name: &str, latitude: f64, longitude: f64| City {
            name: name.to_string(),
            latitude,
            longitude,
        };

        Self {
            fares: vec![
                fare("City A", "City B", 50.0),
                fare("City A", "City C", 80.0),
                fare("City B", "City C", 30.0),
            ],
            cities: vec![
                city("City A", 12.9716, 77.5946),
                city("City B", 13.0827, 80.2707),
                city("City C", 17.3850, 78.4867),
            ],
        }
    }
}

/// Lookup tables built from a [`NetworkConfig`].
///
/// Fares are keyed by the ordered (origin, destination) pair; the reverse
/// direction of a listed route is not priced unless listed itself.
#[derive(Debug, Clone)]
pub struct Network {
    fares: HashMap<(String, String), f64>,
    cities: HashMap<String, Coordinates>,
    rules: Vec<FareRule>,
}

impl Network {
    pub fn from_config(config: NetworkConfig) -> Self {
        let fares = config
            .fares
            .iter()
            .map(|r| ((r.from.clone(), r.to.clone()), r.fare))
            .collect();
        let cities = config
            .cities
            .into_iter()
            .map(|c| (c.name, Coordinates::new(c.latitude, c.longitude)))
            .collect();

        Self {
            fares,
            cities,
            rules: config.fares,
        }
    }

    pub fn fare(&self, from: &str, to: &str) -> Option<f64> {
        self.fares.get(&(from.to_string(), to.to_string())).copied()
    }

    pub fn coordinates(&self, city: &str) -> Option<Coordinates> {
        self.cities.get(city).copied()
    }

    pub fn routes(&self) -> &[FareRule] {
        &self.rules
    }

    pub fn cities(&self) -> Vec<City> {
        let mut cities: Vec<City> = self
            .cities
            .iter()
            .map(|(name, c)| City {
                name: name.clone(),
                latitude: c.latitude,
                longitude: c.longitude,
            })
            .collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        cities
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::from_config(NetworkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fares() {
        let network = Network::default();

        assert_eq!(network.fare("City A", "City B"), Some(50.0));
        assert_eq!(network.fare("City A", "City C"), Some(80.0));
        assert_eq!(network.fare("City B", "City C"), Some(30.0));
    }

    #[test]
    fn test_reverse_route_is_not_priced() {
        let network = Network::default();

        assert_eq!(network.fare("City B", "City A"), None);
        assert_eq!(network.fare("City A", "City A"), None);
    }

    #[test]
    fn test_config_parses_from_json() {
        let json = r#"{
            "fares": [{"from": "North", "to": "South", "fare": 12.5}],
            "cities": [{"name": "South", "latitude": 1.0, "longitude": 2.0}]
        }"#;
        let network = Network::from_config(serde_json::from_str(json).unwrap());

        assert_eq!(network.fare("North", "South"), Some(12.5));
        assert_eq!(network.coordinates("South"), Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(network.coordinates("North"), None);
        assert_eq!(network.routes().len(), 1);
    }
}
