use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::utils::type_convert::{canonical_bits, is_missing_marker, parse_numeric_cell};
use crate::utils::OutlierError;

/// Declared semantic type of a column, resolved once when the dataset is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Column values. Missing numeric values are `NaN`, missing categorical values are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Whether the value at `row` is missing
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(values) => values.get(row).is_some_and(|v| v.is_nan()),
            ColumnData::Categorical(values) => values.get(row).is_some_and(|v| v.is_none()),
        }
    }

    fn select(&self, positions: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(positions.iter().map(|&i| values[i]).collect())
            }
            ColumnData::Categorical(values) => {
                ColumnData::Categorical(positions.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }

    fn cell_text(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(values) if values[row].is_nan() => "NaN".to_string(),
            ColumnData::Numeric(values) => values[row].to_string(),
            ColumnData::Categorical(values) => values[row].clone().unwrap_or_else(|| "None".to_string()),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    /// Create a numeric column
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Create a categorical column from optional values
    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    /// Create a categorical column with no missing values
    pub fn text(name: impl Into<String>, values: &[&str]) -> Self {
        Self::categorical(name, values.iter().map(|v| Some(v.to_string())).collect())
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of distinct non-missing values
    pub fn distinct_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values
                .iter()
                .filter(|v| !v.is_nan())
                .map(|&v| canonical_bits(v))
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Categorical(values) => values
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

/// Ordered collection of typed columns with positionally aligned rows.
///
/// Every row carries a stable label (`index`) assigned at construction.
/// Labels survive row filtering, so an outlier can always be reported by
/// the label of the row in the dataset it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRecord")]
pub struct Dataset {
    pub name: String,
    columns: Vec<Column>,
    index: Vec<usize>,
}

/// Serialized form of a dataset, checked by `Dataset::from_columns` on the way in
#[derive(Deserialize)]
struct DatasetRecord {
    name: String,
    columns: Vec<Column>,
    index: Option<Vec<usize>>,
}

impl TryFrom<DatasetRecord> for Dataset {
    type Error = OutlierError;

    fn try_from(record: DatasetRecord) -> Result<Self, Self::Error> {
        let mut dataset = Dataset::from_columns(record.name, record.columns)?;
        if let Some(index) = record.index {
            if index.len() != dataset.len() {
                return Err(OutlierError::InvalidInput(format!(
                    "index has {} labels, expected {}",
                    index.len(),
                    dataset.len()
                )));
            }
            if index.iter().collect::<HashSet<_>>().len() != index.len() {
                return Err(OutlierError::InvalidInput(
                    "index labels must be unique".to_string(),
                ));
            }
            dataset.index = index;
        }
        Ok(dataset)
    }
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Build a dataset from columns of equal length, labelling rows 0..n
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, OutlierError> {
        let rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();

        for column in &columns {
            if column.len() != rows {
                return Err(OutlierError::InvalidInput(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    rows
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(OutlierError::InvalidInput(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            columns,
            index: (0..rows).collect(),
        })
    }

    /// Load dataset from CSV, resolving each column's type at load time.
    ///
    /// A column is numeric when every non-missing cell parses as a number.
    pub fn from_csv(name: impl Into<String>, csv_data: &str) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let headers = reader.headers()?.clone();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

        for result in reader.records() {
            let record = result?;
            for (i, cells) in raw.iter_mut().enumerate() {
                cells.push(record.get(i).unwrap_or_default().to_string());
            }
        }

        let columns = headers
            .iter()
            .zip(raw)
            .map(|(header, cells)| resolve_column(header, cells))
            .collect();

        let dataset = Self::from_columns(name, columns)?;
        tracing::debug!(
            dataset = %dataset.name,
            rows = dataset.len(),
            columns = dataset.column_count(),
            "loaded CSV dataset"
        );
        Ok(dataset)
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Stable row labels, one per row position
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&Column, OutlierError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| OutlierError::ColumnNotFound(name.to_string()))
    }

    pub fn kind(&self, name: &str) -> Result<ColumnKind, OutlierError> {
        Ok(self.column(name)?.kind())
    }

    /// Borrow the values of a numeric column
    pub fn numeric_values(&self, name: &str) -> Result<&[f64], OutlierError> {
        match &self.column(name)?.data {
            ColumnData::Numeric(values) => Ok(values),
            ColumnData::Categorical(_) => Err(OutlierError::not_numeric(name)),
        }
    }

    /// Mutably borrow the values of a numeric column
    pub fn numeric_values_mut(&mut self, name: &str) -> Result<&mut [f64], OutlierError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| OutlierError::ColumnNotFound(name.to_string()))?;
        match &mut column.data {
            ColumnData::Numeric(values) => Ok(values),
            ColumnData::Categorical(_) => Err(OutlierError::not_numeric(name)),
        }
    }

    /// Number of distinct non-missing values in a column
    pub fn distinct_count(&self, name: &str) -> Result<usize, OutlierError> {
        Ok(self.column(name)?.distinct_count())
    }

    /// New dataset holding the rows at `positions`, in that order, with their labels
    pub fn select_rows(&self, positions: &[usize]) -> Dataset {
        Dataset {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(positions),
                })
                .collect(),
            index: positions.iter().map(|&i| self.index[i]).collect(),
        }
    }

    /// New dataset holding the rows where `keep` is true
    pub fn filter_rows(&self, keep: &[bool]) -> Dataset {
        let positions: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        self.select_rows(&positions)
    }

    /// New dataset without the rows whose label is in `labels`
    pub fn drop_rows_by_label(&self, labels: &[usize]) -> Dataset {
        let drop: HashSet<usize> = labels.iter().copied().collect();
        let keep: Vec<bool> = self.index.iter().map(|label| !drop.contains(label)).collect();
        self.filter_rows(&keep)
    }

    /// Whether any cell of any column is missing
    pub fn has_missing(&self) -> bool {
        (0..self.len()).any(|row| self.row_has_missing(row))
    }

    /// New dataset without rows that contain a missing value
    pub fn drop_missing(&self) -> Dataset {
        let keep: Vec<bool> = (0..self.len()).map(|row| !self.row_has_missing(row)).collect();
        self.filter_rows(&keep)
    }

    /// New dataset holding only the numeric columns
    pub fn numeric_only(&self) -> Dataset {
        Dataset {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.kind() == ColumnKind::Numeric)
                .cloned()
                .collect(),
            index: self.index.clone(),
        }
    }

    /// Row-major feature matrix over all columns, which must all be numeric
    pub fn to_feature_matrix(&self) -> Result<Array2<f64>, OutlierError> {
        let mut slices = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            slices.push(self.numeric_values(&column.name)?);
        }

        let (rows, cols) = (self.len(), slices.len());
        let mut features = Array2::<f64>::zeros((rows, cols));
        for (j, values) in slices.iter().enumerate() {
            for (i, &value) in values.iter().enumerate() {
                features[[i, j]] = value;
            }
        }
        Ok(features)
    }

    fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.data.is_missing(row))
    }
}

fn resolve_column(header: &str, cells: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = cells.iter().map(|cell| parse_numeric_cell(cell)).collect();

    match parsed {
        Some(values) => Column::numeric(header, values),
        None => Column::categorical(
            header,
            cells
                .into_iter()
                .map(|cell| (!is_missing_marker(&cell)).then_some(cell))
                .collect(),
        ),
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index")?;
        for column in &self.columns {
            write!(f, "\t{}", column.name)?;
        }
        writeln!(f)?;

        for (row, label) in self.index.iter().enumerate() {
            write!(f, "{}", label)?;
            for column in &self.columns {
                write!(f, "\t{}", column.data.cell_text(row))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        Dataset::from_columns(
            "people",
            vec![
                Column::numeric("age", vec![30.0, f64::NAN, 35.0, 30.0]),
                Column::text("city", &["NYC", "LA", "NYC", "Chicago"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns_labels_rows() {
        let dataset = sample_dataset();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.index(), &[0, 1, 2, 3]);
        assert!(!dataset.is_empty());
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let result = Dataset::from_columns(
            "bad",
            vec![
                Column::numeric("a", vec![1.0, 2.0]),
                Column::numeric("b", vec![1.0]),
            ],
        );
        assert!(matches!(result, Err(OutlierError::InvalidInput(_))));
    }

    #[test]
    fn test_from_columns_duplicate_name() {
        let result = Dataset::from_columns(
            "bad",
            vec![Column::numeric("a", vec![1.0]), Column::numeric("a", vec![2.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_csv_loading_resolves_types() {
        let csv_data = "name,age,score\nAlice,30,95\nBob,,87\nCharlie,35,NA";
        let dataset = Dataset::from_csv("users", csv_data).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.kind("name").unwrap(), ColumnKind::Categorical);
        assert_eq!(dataset.kind("age").unwrap(), ColumnKind::Numeric);
        assert_eq!(dataset.kind("score").unwrap(), ColumnKind::Numeric);

        let ages = dataset.numeric_values("age").unwrap();
        assert_eq!(ages[0], 30.0);
        assert!(ages[1].is_nan());
    }

    #[test]
    fn test_csv_loading_mixed_column_is_categorical() {
        let csv_data = "cabin,deck\nC85,1\n,2\n42,3";
        let dataset = Dataset::from_csv("t", csv_data).unwrap();
        let column = dataset.column("cabin").unwrap();
        assert_eq!(column.kind(), ColumnKind::Categorical);
        assert_eq!(
            column.data,
            ColumnData::Categorical(vec![Some("C85".to_string()), None, Some("42".to_string())])
        );
    }

    #[test]
    fn test_distinct_count_skips_missing() {
        let dataset = sample_dataset();
        assert_eq!(dataset.distinct_count("age").unwrap(), 2);
        assert_eq!(dataset.distinct_count("city").unwrap(), 3);
    }

    #[test]
    fn test_distinct_count_constant_column() {
        let column = Column::numeric("c", vec![7.0, 7.0, 7.0]);
        assert_eq!(column.distinct_count(), 1);
    }

    #[test]
    fn test_column_lookup_errors() {
        let dataset = sample_dataset();
        assert_eq!(
            dataset.column("missing").unwrap_err(),
            OutlierError::ColumnNotFound("missing".to_string())
        );
        assert!(matches!(
            dataset.numeric_values("city"),
            Err(OutlierError::InvalidColumnType { .. })
        ));
    }

    #[test]
    fn test_select_rows_keeps_labels() {
        let dataset = sample_dataset();
        let subset = dataset.select_rows(&[2, 3]);
        assert_eq!(subset.index(), &[2, 3]);
        assert_eq!(subset.numeric_values("age").unwrap(), &[35.0, 30.0]);

        let nested = subset.drop_rows_by_label(&[2]);
        assert_eq!(nested.index(), &[3]);
    }

    #[test]
    fn test_drop_missing() {
        let dataset = sample_dataset();
        assert!(dataset.has_missing());
        let clean = dataset.drop_missing();
        assert_eq!(clean.index(), &[0, 2, 3]);
        assert!(!clean.has_missing());
    }

    #[test]
    fn test_feature_matrix_requires_numeric() {
        let dataset = sample_dataset();
        assert!(dataset.to_feature_matrix().is_err());

        let numeric = dataset.numeric_only().drop_missing();
        let features = numeric.to_feature_matrix().unwrap();
        assert_eq!(features.dim(), (3, 1));
        assert_eq!(features[[1, 0]], 35.0);
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let ragged = r#"{"name":"r","columns":[
            {"name":"a","data":{"Numeric":[1.0,2.0,3.0]}},
            {"name":"b","data":{"Numeric":[1.0]}}
        ],"index":[0,1,2]}"#;
        assert!(serde_json::from_str::<Dataset>(ragged).is_err());

        let short_index = r#"{"name":"s","columns":[{"name":"a","data":{"Numeric":[1.0,2.0]}}],"index":[0]}"#;
        assert!(serde_json::from_str::<Dataset>(short_index).is_err());

        let repeated = r#"{"name":"d","columns":[{"name":"a","data":{"Numeric":[1.0,2.0]}}],"index":[4,4]}"#;
        assert!(serde_json::from_str::<Dataset>(repeated).is_err());
    }

    #[test]
    fn test_deserialize_keeps_labels() {
        let subset = Dataset::from_columns("p", vec![Column::text("city", &["NYC", "LA", "SF"])])
            .unwrap()
            .select_rows(&[2, 0]);
        let json = serde_json::to_string(&subset).unwrap();

        let restored: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.index(), &[2, 0]);
        assert_eq!(restored.drop_rows_by_label(&[2]).index(), &[0]);
    }

    #[test]
    fn test_display_lists_labels() {
        let dataset = sample_dataset().select_rows(&[1]);
        let text = dataset.to_string();
        assert!(text.starts_with("index\tage\tcity\n"));
        assert!(text.contains("1\tNaN\tLA"));
    }
}
