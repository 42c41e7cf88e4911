/*!

Run configuration. A [`Parameters`] value is deserialized from JSON (any subset of fields may be
given, the rest take their documented defaults), validated once, and then shared read-only by
every part of one simulation instance through [`ContextParametersExt`].

```json
{
  "total_population": 5000,
  "age_of_population": "old",
  "infectivity": 0.08,
  "physics_params": { "categories": { "s": { "volume": 250.0, "air_changes_per_hour": 6.0 } } },
  "active_nodes": { "st": false, "pa": false }
}
```

*/

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use crate::context::{Context, DataPlugin};
use crate::error::SimulationError;
use crate::nodes::NodeCategory;
use crate::people::{AgeGroup, Employment};
use crate::wells_riley::Environment;

/// Age structure of the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgePreset {
    Young,
    #[default]
    Medium,
    Old,
}

impl AgePreset {
    /// Probability of each entry of [`AgeGroup::ALL`].
    #[must_use]
    pub fn distribution(self) -> [f64; 3] {
        match self {
            AgePreset::Young => [0.3, 0.6, 0.1],
            AgePreset::Medium => [0.1, 0.6, 0.3],
            AgePreset::Old => [0.1, 0.6, 0.3],
        }
    }

    #[must_use]
    pub fn probability_of(self, age_group: AgeGroup) -> f64 {
        let position = AgeGroup::ALL
            .iter()
            .position(|group| *group == age_group)
            .unwrap_or_default();
        self.distribution()[position]
    }
}

/// Air volume and ventilation of one kind of location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryPhysics {
    /// Cubic meters.
    #[serde(alias = "V")]
    pub volume: f64,
    pub air_changes_per_hour: f64,
    /// Overrides the city-wide emission rate for activities that shed more (or less).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission_rate: Option<f64>,
}

impl CategoryPhysics {
    const fn new(volume: f64, air_changes_per_hour: f64) -> Self {
        CategoryPhysics {
            volume,
            air_changes_per_hour,
            emission_rate: None,
        }
    }

    /// λ, air exchanges per second.
    #[must_use]
    pub fn ventilation_rate(&self) -> f64 {
        self.air_changes_per_hour / 3600.0
    }
}

/// The shared commute environment: a small, well ventilated space for a short ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportProfile {
    pub volume: f64,
    pub air_changes_per_hour: f64,
    pub duration_hours: f64,
    /// Chance that an eligible commuter rides on a given work day.
    pub ridership: f64,
}

impl Default for TransportProfile {
    fn default() -> Self {
        TransportProfile {
            volume: 80.0,
            air_changes_per_hour: 15.0,
            duration_hours: 1.0,
            ridership: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// E, quanta emitted per second by one infectious person.
    #[serde(alias = "E")]
    pub emission_rate: f64,
    /// ρ, cubic meters inhaled per second.
    #[serde(alias = "rho")]
    pub inhalation_rate: f64,
    #[serde(deserialize_with = "overlay_categories")]
    pub categories: BTreeMap<NodeCategory, CategoryPhysics>,
    pub transport: TransportProfile,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        PhysicsParams {
            emission_rate: 0.02,
            inhalation_rate: 1.3e-4,
            categories: default_categories(),
            transport: TransportProfile::default(),
        }
    }
}

fn default_categories() -> BTreeMap<NodeCategory, CategoryPhysics> {
    use NodeCategory::*;
    BTreeMap::from([
        (Household, CategoryPhysics::new(150.0, 0.5)),
        (Shop, CategoryPhysics::new(100.0, 4.0)),
        (Park, CategoryPhysics::new(1e6, 0.1)),
        (School, CategoryPhysics::new(200.0, 3.0)),
        (Restaurant, CategoryPhysics::new(200.0, 8.0)),
        (Church, CategoryPhysics::new(600.0, 1.0)),
        (Theater, CategoryPhysics::new(1200.0, 6.0)),
        (Hospital, CategoryPhysics::new(400.0, 12.0)),
        (Office, CategoryPhysics::new(1000.0, 6.0)),
        (Stadium, CategoryPhysics::new(2000.0, 8.0)),
        (PartyVenue, CategoryPhysics::new(400.0, 2.0)),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreventativeMeasures {
    /// Share of the whole population offered a vaccine dose at construction.
    pub vaccination_percentage: f64,
    pub vaccination_effectiveness: f64,
    pub quarantine_on_detection: bool,
}

impl Default for PreventativeMeasures {
    fn default() -> Self {
        PreventativeMeasures {
            vaccination_percentage: 0.0,
            vaccination_effectiveness: 0.9,
            quarantine_on_detection: true,
        }
    }
}

/// Exposure duration of each daily phase, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseHours {
    pub work: f64,
    pub social: f64,
    pub home: f64,
}

impl Default for PhaseHours {
    fn default() -> Self {
        PhaseHours {
            work: 8.0,
            social: 4.0,
            home: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Base seed of every random stream of the run.
    pub seed: u64,
    pub total_population: usize,
    pub age_of_population: AgePreset,
    pub percentage_infected: f64,
    pub percentage_removed: f64,
    /// γ
    pub infectivity: f64,
    /// Days spent exposed before becoming contagious.
    pub time_of_incubation: u32,
    /// Days spent contagious before recovering or dying.
    pub time_of_activation: u32,
    pub percentage_of_death: f64,
    /// Daily chance that a symptomatic person is detected.
    pub detection_of_disease_rate: f64,
    /// Chance that an exposed person becomes symptomatic rather than asymptomatic.
    pub symptomatic_fraction: f64,
    pub physics_params: PhysicsParams,
    pub preventative_measures: PreventativeMeasures,
    /// Maximum mixing group ("room") size per category. Categories without an entry mix as a
    /// whole.
    pub subgroup_sizes: BTreeMap<NodeCategory, usize>,
    /// Categories open for social visits.
    #[serde(deserialize_with = "overlay_active_nodes")]
    pub active_nodes: BTreeMap<NodeCategory, bool>,
    pub public_transport_on: bool,
    /// Target number of residents per neighborhood.
    pub neighborhood_population: f64,
    /// Nodes of each category per 10,000 people.
    #[serde(deserialize_with = "overlay_node_density")]
    pub node_density: BTreeMap<NodeCategory, f64>,
    /// Relative weights of the roles drawn for working-age adults.
    pub employment_distribution: BTreeMap<Employment, f64>,
    pub phase_hours: PhaseHours,
}

impl Default for Parameters {
    fn default() -> Self {
        use NodeCategory::*;
        Parameters {
            seed: 0,
            total_population: 10_000,
            age_of_population: AgePreset::Medium,
            percentage_infected: 0.01,
            percentage_removed: 0.05,
            infectivity: 0.05,
            time_of_incubation: 3,
            time_of_activation: 10,
            percentage_of_death: 0.01,
            detection_of_disease_rate: 0.5,
            symptomatic_fraction: 0.5,
            physics_params: PhysicsParams::default(),
            preventative_measures: PreventativeMeasures::default(),
            subgroup_sizes: BTreeMap::from([
                (School, 30),
                (Office, 50),
                (Restaurant, 20),
                (Hospital, 15),
                (Stadium, 100),
                (PartyVenue, 40),
                (Theater, 75),
                (Church, 50),
            ]),
            active_nodes: default_active_nodes(),
            public_transport_on: true,
            neighborhood_population: 10_000.0 / 15.0,
            node_density: default_node_density(),
            employment_distribution: BTreeMap::from([
                (Employment::Teacher, 0.2),
                (Employment::Clerk, 0.1),
                (Employment::FoodIndustry, 0.1),
                (Employment::OfficeWorker, 0.3),
                (Employment::HealthcareWorker, 0.1),
                (Employment::FromHome, 0.2),
            ]),
            phase_hours: PhaseHours::default(),
        }
    }
}

fn default_active_nodes() -> BTreeMap<NodeCategory, bool> {
    NodeCategory::ALL
        .iter()
        .map(|category| (*category, true))
        .collect()
}

fn default_node_density() -> BTreeMap<NodeCategory, f64> {
    use NodeCategory::*;
    BTreeMap::from([
        (Household, 8000.0),
        (Shop, 15.0),
        (Park, 2.0),
        (School, 4.0),
        (Restaurant, 45.0),
        (Hospital, 1.0),
        (Office, 10.0),
        (Stadium, 1.0),
        (PartyVenue, 10.0),
        (Church, 5.0),
        (Theater, 5.0),
    ])
}

/// Deserializes a per-category table whose entries replace the matching entries of `defaults`.
fn overlay<'de, D, V>(
    deserializer: D,
    defaults: BTreeMap<NodeCategory, V>,
) -> Result<BTreeMap<NodeCategory, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let mut merged = defaults;
    merged.extend(BTreeMap::<NodeCategory, V>::deserialize(deserializer)?);
    Ok(merged)
}

fn overlay_categories<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<NodeCategory, CategoryPhysics>, D::Error> {
    overlay(deserializer, default_categories())
}

fn overlay_active_nodes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<NodeCategory, bool>, D::Error> {
    overlay(deserializer, default_active_nodes())
}

fn overlay_node_density<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<NodeCategory, f64>, D::Error> {
    overlay(deserializer, default_node_density())
}

fn check_fraction(name: &str, value: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter(format!(
            "{name} must be between 0 and 1, got {value}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), SimulationError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), SimulationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

impl Parameters {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Parameters, SimulationError> {
        let parameters: Parameters = serde_json::from_str(json)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Parameters, SimulationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.total_population == 0 {
            return Err("total_population must be at least 1".into());
        }
        check_fraction("percentage_infected", self.percentage_infected)?;
        check_fraction("percentage_removed", self.percentage_removed)?;
        if self.percentage_infected + self.percentage_removed > 1.0 {
            return Err(
                "percentage_infected and percentage_removed together exceed the population".into(),
            );
        }
        check_non_negative("infectivity", self.infectivity)?;
        check_fraction("percentage_of_death", self.percentage_of_death)?;
        check_fraction("detection_of_disease_rate", self.detection_of_disease_rate)?;
        check_fraction("symptomatic_fraction", self.symptomatic_fraction)?;

        let physics = &self.physics_params;
        check_non_negative("physics_params.emission_rate", physics.emission_rate)?;
        check_non_negative("physics_params.inhalation_rate", physics.inhalation_rate)?;
        for (category, category_physics) in &physics.categories {
            check_positive(&format!("volume of {category}"), category_physics.volume)?;
            check_non_negative(
                &format!("air_changes_per_hour of {category}"),
                category_physics.air_changes_per_hour,
            )?;
            if let Some(emission_rate) = category_physics.emission_rate {
                check_non_negative(&format!("emission_rate of {category}"), emission_rate)?;
            }
        }
        check_positive("transport.volume", physics.transport.volume)?;
        check_non_negative(
            "transport.air_changes_per_hour",
            physics.transport.air_changes_per_hour,
        )?;
        check_positive("transport.duration_hours", physics.transport.duration_hours)?;
        check_fraction("transport.ridership", physics.transport.ridership)?;

        let measures = &self.preventative_measures;
        check_fraction("vaccination_percentage", measures.vaccination_percentage)?;
        check_fraction(
            "vaccination_effectiveness",
            measures.vaccination_effectiveness,
        )?;

        if let Some((category, _)) = self.subgroup_sizes.iter().find(|(_, size)| **size == 0) {
            return Err(SimulationError::InvalidParameter(format!(
                "subgroup size of {category} must be at least 1"
            )));
        }

        check_positive("neighborhood_population", self.neighborhood_population)?;
        for (category, density) in &self.node_density {
            check_non_negative(&format!("node density of {category}"), *density)?;
        }

        if self.employment_distribution.is_empty() {
            return Err("employment_distribution must name at least one role".into());
        }
        for (employment, weight) in &self.employment_distribution {
            if employment.is_age_determined() {
                return Err(SimulationError::InvalidParameter(format!(
                    "{employment:?} is assigned by age and cannot appear in employment_distribution"
                )));
            }
            check_positive(&format!("employment weight of {employment:?}"), *weight)?;
        }

        check_positive("phase_hours.work", self.phase_hours.work)?;
        check_positive("phase_hours.social", self.phase_hours.social)?;
        check_positive("phase_hours.home", self.phase_hours.home)?;
        Ok(())
    }

    /// The transmission environment of `category`, or `None` if it has no physics entry.
    #[must_use]
    pub fn environment(&self, category: NodeCategory) -> Option<Environment> {
        let physics = &self.physics_params;
        if category == NodeCategory::Transport {
            return Some(Environment::transport(
                &physics.transport,
                physics.emission_rate,
                physics.inhalation_rate,
            ));
        }
        physics.categories.get(&category).map(|category_physics| Environment {
            volume: category_physics.volume,
            ventilation_rate: category_physics.ventilation_rate(),
            emission_rate: category_physics
                .emission_rate
                .unwrap_or(physics.emission_rate),
            inhalation_rate: physics.inhalation_rate,
        })
    }

    #[must_use]
    pub fn is_open(&self, category: NodeCategory) -> bool {
        self.active_nodes.get(&category).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn subgroup_size(&self, category: NodeCategory) -> Option<usize> {
        self.subgroup_sizes.get(&category).copied()
    }
}

struct ParametersPlugin {
    parameters: Option<Rc<Parameters>>,
}

impl DataPlugin for ParametersPlugin {
    const new: &'static dyn Fn() -> Self = &|| ParametersPlugin { parameters: None };
}

pub trait ContextParametersExt {
    /// Validates `parameters` and stores them for the rest of the run.
    fn init_parameters(&mut self, parameters: Parameters) -> Result<(), SimulationError>;

    /// A shared handle to the run's parameters. Fails if `init_parameters` was never called.
    fn get_parameters(&self) -> Result<Rc<Parameters>, SimulationError>;
}

impl ContextParametersExt for Context {
    fn init_parameters(&mut self, parameters: Parameters) -> Result<(), SimulationError> {
        parameters.validate()?;
        self.get_data_container_mut::<ParametersPlugin>().parameters = Some(Rc::new(parameters));
        Ok(())
    }

    fn get_parameters(&self) -> Result<Rc<Parameters>, SimulationError> {
        self.get_data_container::<ParametersPlugin>()
            .and_then(|plugin| plugin.parameters.clone())
            .ok_or_else(|| {
                SimulationError::ConstructionError(
                    "parameters have not been initialized".to_string(),
                )
            })
    }
}
