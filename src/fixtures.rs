//! Read-only sample data the iteration driver draws ids from.
//!
//! The built-in collections mirror the PetClinic seed data. A fixture file
//! (YAML or JSON) can replace them; every collection must be non-empty, which
//! is what lets [`Fixtures`] hand out random entries without an `Option`.

use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetType {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    pub owner_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vet {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: u32,
    pub pet_id: u32,
    pub date: String,
    pub description: String,
}

/// On-disk shape of a fixture file, validated into [`Fixtures`].
#[derive(Debug, Deserialize)]
struct FixtureFile {
    owners: Vec<Owner>,
    pets: Vec<Pet>,
    vets: Vec<Vet>,
    specialties: Vec<Specialty>,
    visits: Vec<Visit>,
}

#[derive(Debug, Clone)]
pub struct Fixtures {
    owners: Vec<Owner>,
    pets: Vec<Pet>,
    vets: Vec<Vet>,
    specialties: Vec<Specialty>,
    visits: Vec<Visit>,
}

impl Fixtures {
    pub fn builtin() -> Self {
        let owner = |id, first: &str, last: &str| Owner {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        let pet = |id, name: &str, type_id, type_name: &str, owner_id| Pet {
            id,
            name: name.to_string(),
            pet_type: PetType {
                id: type_id,
                name: type_name.to_string(),
            },
            owner_id,
        };
        let vet = |id, first: &str, last: &str| Vet {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        let specialty = |id, name: &str| Specialty {
            id,
            name: name.to_string(),
        };
        let visit = |id, pet_id, date: &str, description: &str| Visit {
            id,
            pet_id,
            date: date.to_string(),
            description: description.to_string(),
        };

        Self {
            owners: vec![
                owner(1, "George", "Franklin"),
                owner(2, "Betty", "Davis"),
                owner(3, "Eduardo", "Rodriquez"),
                owner(4, "Harold", "Davis"),
                owner(5, "Peter", "McTavish"),
                owner(6, "Jean", "Coleman"),
                owner(7, "Jeff", "Black"),
                owner(8, "Maria", "Escobito"),
                owner(9, "David", "Schroeder"),
                owner(10, "Carlos", "Estaban"),
            ],
            pets: vec![
                pet(1, "Leo", 1, "cat", 1),
                pet(2, "Basil", 6, "hamster", 2),
                pet(3, "Rosy", 2, "dog", 3),
                pet(4, "Jewel", 2, "dog", 3),
                pet(5, "Iggy", 3, "lizard", 4),
                pet(6, "George", 4, "snake", 5),
                pet(7, "Samantha", 1, "cat", 6),
                pet(8, "Max", 1, "cat", 6),
                pet(9, "Lucky", 5, "bird", 7),
                pet(10, "Mulligan", 2, "dog", 8),
                pet(11, "Freddy", 5, "bird", 9),
                pet(12, "Lucky", 2, "dog", 10),
                pet(13, "Sly", 1, "cat", 10),
            ],
            vets: vec![
                vet(1, "James", "Carter"),
                vet(2, "Helen", "Leary"),
                vet(3, "Linda", "Douglas"),
                vet(4, "Rafael", "Ortega"),
                vet(5, "Henry", "Stevens"),
                vet(6, "Sharon", "Jenkins"),
            ],
            specialties: vec![
                specialty(1, "radiology"),
                specialty(2, "surgery"),
                specialty(3, "dentistry"),
            ],
            visits: vec![
                visit(1, 7, "2010-03-04", "rabies shot"),
                visit(2, 8, "2011-03-04", "rabies shot"),
                visit(3, 8, "2009-06-04", "neutered"),
                visit(4, 7, "2008-09-04", "spayed"),
            ],
        }
    }

    /// Load fixtures from a `.yaml`/`.yml` file, or JSON for any other extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FixtureIo {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let parse_error = |message: String| ConfigError::FixtureParse {
            path: path.to_path_buf(),
            message,
        };

        let file: FixtureFile = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        };

        Self::from_parts(file)
    }

    fn from_parts(file: FixtureFile) -> Result<Self, ConfigError> {
        let collections = [
            ("owners", file.owners.is_empty()),
            ("pets", file.pets.is_empty()),
            ("vets", file.vets.is_empty()),
            ("specialties", file.specialties.is_empty()),
            ("visits", file.visits.is_empty()),
        ];
        if let Some((name, _)) = collections.iter().find(|(_, empty)| *empty) {
            return Err(ConfigError::EmptyFixtures(*name));
        }

        Ok(Self {
            owners: file.owners,
            pets: file.pets,
            vets: file.vets,
            specialties: file.specialties,
            visits: file.visits,
        })
    }

    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    pub fn pets(&self) -> &[Pet] {
        &self.pets
    }

    pub fn vets(&self) -> &[Vet] {
        &self.vets
    }

    pub fn specialties(&self) -> &[Specialty] {
        &self.specialties
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn random_owner<R: Rng + ?Sized>(&self, rng: &mut R) -> &Owner {
        pick(&self.owners, rng)
    }

    pub fn random_pet<R: Rng + ?Sized>(&self, rng: &mut R) -> &Pet {
        pick(&self.pets, rng)
    }

    pub fn random_vet<R: Rng + ?Sized>(&self, rng: &mut R) -> &Vet {
        pick(&self.vets, rng)
    }

    pub fn random_specialty<R: Rng + ?Sized>(&self, rng: &mut R) -> &Specialty {
        pick(&self.specialties, rng)
    }

    pub fn random_visit<R: Rng + ?Sized>(&self, rng: &mut R) -> &Visit {
        pick(&self.visits, rng)
    }
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::builtin()
    }
}

// Collections are never empty once a `Fixtures` exists.
fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
