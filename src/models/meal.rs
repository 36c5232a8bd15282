use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealType::Breakfast => write!(f, "breakfast"),
            MealType::Lunch => write!(f, "lunch"),
            MealType::Dinner => write!(f, "dinner"),
            MealType::Snack => write!(f, "snack"),
            MealType::Dessert => write!(f, "dessert"),
        }
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            "dessert" => Ok(MealType::Dessert),
            _ => Err(format!(
                "Invalid meal type '{}'. Valid options: breakfast, lunch, dinner, snack, dessert",
                s
            )),
        }
    }
}

/// One food item and its nutrition facts, per serving logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub fiber: f64,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, calories: f64) -> Self {
        Self {
            name: name.into(),
            calories,
            protein: 0.0,
            carbohydrates: 0.0,
            fat: 0.0,
            sugar: 0.0,
            sodium: 0.0,
            fiber: 0.0,
        }
    }

    pub fn with_macros(mut self, protein: f64, carbohydrates: f64, fat: f64) -> Self {
        self.protein = protein;
        self.carbohydrates = carbohydrates;
        self.fat = fat;
        self
    }
}

/// A logged meal: which meal of the day it was and what was eaten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub items: Vec<FoodItem>,
}

impl MealEntry {
    /// Collection this payload lives in.
    pub const COLLECTION: &'static str = "mealEntries";

    pub fn new(meal_type: MealType) -> Self {
        Self {
            meal_type,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<FoodItem>) -> Self {
        self.items = items;
        self
    }

    pub fn total_calories(&self) -> f64 {
        self.items.iter().map(|item| item.calories).sum()
    }

    pub fn total_protein(&self) -> f64 {
        self.items.iter().map(|item| item.protein).sum()
    }
}

impl fmt::Display for MealEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:.0} kcal)", self.meal_type, self.total_calories())?;
        for item in &self.items {
            writeln!(f, "  - {} ({:.0} kcal)", item.name, item.calories)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_type_display() {
        assert_eq!(format!("{}", MealType::Breakfast), "breakfast");
        assert_eq!(format!("{}", MealType::Dessert), "dessert");
    }

    #[test]
    fn test_meal_type_from_str() {
        assert_eq!(
            MealType::from_str("breakfast").unwrap(),
            MealType::Breakfast
        );
        assert_eq!(MealType::from_str("LUNCH").unwrap(), MealType::Lunch);
        assert_eq!(MealType::from_str("Dessert").unwrap(), MealType::Dessert);
    }

    #[test]
    fn test_meal_type_from_str_invalid() {
        assert!(MealType::from_str("brunch").is_err());
        assert!(MealType::from_str("").is_err());
    }

    #[test]
    fn test_meal_entry_totals() {
        let entry = MealEntry::new(MealType::Lunch).with_items(vec![
            FoodItem::new("Salad", 150.0).with_macros(4.0, 10.0, 9.0),
            FoodItem::new("Bread", 120.0).with_macros(4.0, 22.0, 1.5),
        ]);

        assert_eq!(entry.total_calories(), 270.0);
        assert_eq!(entry.total_protein(), 8.0);
    }

    #[test]
    fn test_meal_entry_display() {
        let entry = MealEntry::new(MealType::Dinner)
            .with_items(vec![FoodItem::new("Pasta", 450.0)]);
        let output = format!("{}", entry);
        assert!(output.contains("dinner"));
        assert!(output.contains("Pasta"));
    }

    #[test]
    fn test_meal_entry_json_roundtrip() {
        let entry = MealEntry::new(MealType::Snack).with_items(vec![FoodItem::new(
            "Apple", 95.0,
        )]);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"snack\""));

        let parsed: MealEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
