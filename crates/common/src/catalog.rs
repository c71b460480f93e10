use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseSymbolError;

/// Ingredient category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Vegetable,
    Animal,
    Marine,
    Dairy,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vegetable => "VEGETABLE",
            Category::Animal => "ANIMAL",
            Category::Marine => "MARINE",
            Category::Dairy => "DAIRY",
            Category::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VEGETABLE" => Ok(Category::Vegetable),
            "ANIMAL" => Ok(Category::Animal),
            "MARINE" => Ok(Category::Marine),
            "DAIRY" => Ok(Category::Dairy),
            "OTHER" => Ok(Category::Other),
            other => Err(ParseSymbolError::new("category", other)),
        }
    }
}
