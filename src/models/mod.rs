mod meal;
mod meditation;
mod mood;

pub use meal::{FoodItem, MealEntry, MealType};
pub use meditation::MeditationSession;
pub use mood::MoodEntry;
