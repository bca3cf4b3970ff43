use crate::types::push::Standing;

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("failed to read site file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse site file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate house id '{0}'")]
    DuplicateHouse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct House {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) total_points: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Admin {
    pub(crate) name: String,
    pub(crate) password_hash: String,
}

/// Houses and admin accounts, loaded from the site TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Site {
    #[serde(default, rename = "house")]
    houses: Vec<House>,
    #[serde(default, rename = "admin")]
    admins: Vec<Admin>,
}

impl Site {
    pub(crate) fn load(path: &Path) -> Result<Self, SiteError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self, SiteError> {
        let site: Site = toml::from_str(contents)?;
        let mut seen = std::collections::HashSet::new();
        for house in &site.houses {
            if !seen.insert(house.id.as_str()) {
                return Err(SiteError::DuplicateHouse(house.id.clone()));
            }
        }
        Ok(site)
    }

    /// Houses ordered by descending points; ties keep file order.
    pub(crate) fn standings(&self) -> Vec<Standing> {
        let mut houses: Vec<&House> = self.houses.iter().collect();
        houses.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        houses
            .into_iter()
            .map(|house| Standing {
                id: house.id.clone(),
                name: house.name.clone(),
                total_points: house.total_points,
            })
            .collect()
    }

    pub(crate) fn admin(&self, name: &str) -> Option<&Admin> {
        self.admins.iter().find(|admin| admin.name == name)
    }
}
