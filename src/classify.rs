//! Column classification into categorical, numerical and cardinal sets

use serde::Serialize;

use crate::dataset::{ColumnKind, Dataset};

/// Below this many distinct values a numeric column is treated as categorical
pub const DEFAULT_CAT_THRESHOLD: usize = 10;
/// Above this many distinct values a categorical column is treated as cardinal
pub const DEFAULT_CAR_THRESHOLD: usize = 20;

/// Result of classifying a dataset's columns.
///
/// `categorical`, `numerical` and `cardinal` partition the dataset's columns.
/// `numeric_but_categorical` is the subset of `categorical` that is numeric-typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnClassification {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
    pub cardinal: Vec<String>,
    pub numeric_but_categorical: Vec<String>,
}

impl ColumnClassification {
    /// Total number of classified columns
    pub fn total(&self) -> usize {
        self.categorical.len() + self.numerical.len() + self.cardinal.len()
    }

    /// Numerical columns minus the excluded identifier-like columns
    pub fn numerical_excluding(&self, exclude: &[&str]) -> Vec<String> {
        self.numerical
            .iter()
            .filter(|name| !exclude.contains(&name.as_str()))
            .cloned()
            .collect()
    }
}

/// Classify columns using the categorical (`cat_th`) and cardinal (`car_th`) thresholds.
///
/// Categorical-typed columns come first in `categorical`, followed by the
/// low-cardinality numeric columns, each group in column order.
pub fn classify(dataset: &Dataset, cat_th: usize, car_th: usize) -> ColumnClassification {
    let mut text = Vec::new();
    let mut numeric_but_categorical = Vec::new();
    let mut cardinal = Vec::new();
    let mut numerical = Vec::new();

    for column in dataset.columns() {
        let distinct = column.distinct_count();
        match column.kind() {
            ColumnKind::Categorical if distinct > car_th => cardinal.push(column.name.clone()),
            ColumnKind::Categorical => text.push(column.name.clone()),
            ColumnKind::Numeric if distinct < cat_th => {
                numeric_but_categorical.push(column.name.clone())
            }
            ColumnKind::Numeric => numerical.push(column.name.clone()),
        }
    }

    let mut categorical = text;
    categorical.extend(numeric_but_categorical.iter().cloned());

    tracing::debug!(
        categorical = categorical.len(),
        numerical = numerical.len(),
        cardinal = cardinal.len(),
        numeric_but_categorical = numeric_but_categorical.len(),
        "classified columns"
    );

    ColumnClassification {
        categorical,
        numerical,
        cardinal,
        numeric_but_categorical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn titanic_like() -> Dataset {
        let n = 30;
        let ids: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        let survived: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let pclass: Vec<f64> = (0..n).map(|i| (i % 3 + 1) as f64).collect();
        let fares: Vec<f64> = (0..n).map(|i| 7.25 + i as f64 * 1.5).collect();
        let names: Vec<String> = (0..n).map(|i| format!("Passenger {}", i)).collect();
        let sexes: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "male" } else { "female" }).collect();

        Dataset::from_columns(
            "titanic",
            vec![
                Column::numeric("PassengerId", ids),
                Column::numeric("Survived", survived),
                Column::numeric("Pclass", pclass),
                Column::categorical("Name", names.into_iter().map(Some).collect()),
                Column::text("Sex", &sexes),
                Column::numeric("Fare", fares),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_classify_defaults() {
        let dataset = titanic_like();
        let result = classify(&dataset, DEFAULT_CAT_THRESHOLD, DEFAULT_CAR_THRESHOLD);

        assert_eq!(result.categorical, vec!["Sex", "Survived", "Pclass"]);
        assert_eq!(result.numerical, vec!["PassengerId", "Fare"]);
        assert_eq!(result.cardinal, vec!["Name"]);
        assert_eq!(result.numeric_but_categorical, vec!["Survived", "Pclass"]);
    }

    #[test]
    fn test_classify_is_exhaustive() {
        let dataset = titanic_like();
        for (cat_th, car_th) in [(1, 1), (3, 2), (10, 20), (100, 100)] {
            let result = classify(&dataset, cat_th, car_th);
            assert_eq!(result.total(), dataset.column_count());
        }
    }

    #[test]
    fn test_classify_constant_column_counts_one() {
        let dataset = Dataset::from_columns(
            "c",
            vec![Column::numeric("flag", vec![1.0; 50])],
        )
        .unwrap();

        assert_eq!(classify(&dataset, 2, 20).categorical, vec!["flag"]);
        assert_eq!(classify(&dataset, 1, 20).numerical, vec!["flag"]);
    }

    #[test]
    fn test_classify_empty_dataset() {
        let result = classify(&Dataset::new("empty"), 10, 20);
        assert_eq!(result, ColumnClassification::default());
    }

    #[test]
    fn test_numerical_excluding() {
        let dataset = titanic_like();
        let result = classify(&dataset, 10, 20);
        assert_eq!(result.numerical_excluding(&["PassengerId"]), vec!["Fare"]);
    }
}
