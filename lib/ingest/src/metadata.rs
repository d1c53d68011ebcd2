use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use visearch_core::{Error, Result};

const COL_ID: &str = "ProductId";

/// One product to index, with the image locations to try in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub candidates: Vec<PathBuf>,
}

impl MetadataRow {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        category: impl Into<String>,
        candidates: Vec<PathBuf>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            candidates,
        }
    }

    /// Candidates `{id}.jpg`, `{id}.jpeg`, `{id}.png`, then the explicit
    /// image column, all under `image_dir`.
    pub fn with_conventional_candidates(
        id: u64,
        name: impl Into<String>,
        category: impl Into<String>,
        image_dir: &Path,
        image_column: Option<&str>,
    ) -> Self {
        let mut candidates: Vec<PathBuf> = ["jpg", "jpeg", "png"]
            .iter()
            .map(|ext| image_dir.join(format!("{id}.{ext}")))
            .collect();
        if let Some(explicit) = image_column.filter(|v| !is_missing_value(v)) {
            candidates.push(image_dir.join(explicit));
        }
        Self::new(id, name, category, candidates)
    }
}

/// Spreadsheet exports write absent cells as an empty string or the literal
/// `nan`.
#[inline]
pub fn is_missing_value(value: &str) -> bool {
    value.is_empty() || value == "nan"
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "ProductId")]
    id: u64,
    #[serde(rename = "ProductTitle", default)]
    title: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(default)]
    image: Option<String>,
}

/// Read the product metadata CSV (`ProductId`, `ProductTitle`, `Category`,
/// optional `image`).
pub fn read_metadata_csv<P: AsRef<Path>>(csv_path: P, image_dir: &Path) -> Result<Vec<MetadataRow>> {
    let file = File::open(csv_path.as_ref())?;
    parse_metadata(file, image_dir)
}

pub fn parse_metadata<R: Read>(reader: R, image_dir: &Path) -> Result<Vec<MetadataRow>> {
    let mut reader = csv::Reader::from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| Error::Serialization(e.to_string()))?;
    if !headers.iter().any(|h| h == COL_ID) {
        return Err(Error::InvalidConfig(format!(
            "metadata CSV must contain a '{COL_ID}' column"
        )));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|e| {
            Error::Serialization(format!("metadata row {}: {}", line + 1, e))
        })?;
        rows.push(MetadataRow::with_conventional_candidates(
            row.id,
            row.title,
            row.category,
            image_dir,
            row.image.as_deref(),
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_candidates() {
        let dir = Path::new("data/product_images");
        let row = MetadataRow::with_conventional_candidates(42, "Tee", "Apparel", dir, Some("alt/42.webp"));
        assert_eq!(
            row.candidates,
            vec![
                dir.join("42.jpg"),
                dir.join("42.jpeg"),
                dir.join("42.png"),
                dir.join("alt/42.webp"),
            ]
        );
    }

    #[test]
    fn test_nan_image_column_is_absent() {
        let dir = Path::new("imgs");
        for value in ["nan", ""] {
            let row = MetadataRow::with_conventional_candidates(1, "a", "b", dir, Some(value));
            assert_eq!(row.candidates.len(), 3);
        }
        let row = MetadataRow::with_conventional_candidates(1, "a", "b", dir, Some("NaN.png"));
        assert_eq!(row.candidates.len(), 4);
    }

    #[test]
    fn test_parse_metadata() {
        let data = "ProductId,Gender,Category,SubCategory,ProductType,Colour,Usage,ProductTitle,image\n\
                    42419,Girls,Apparel,Topwear,Tops,White,Casual,\"Gini and Jony Girls Knit White Top\",42419.jpg\n\
                    34009,Girls,Apparel,Topwear,Tops,Black,Casual,Gini and Jony Girls Black Top,\n";
        let rows = parse_metadata(data.as_bytes(), Path::new("img")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 42419);
        assert_eq!(rows[0].name, "Gini and Jony Girls Knit White Top");
        assert_eq!(rows[0].category, "Apparel");
        assert_eq!(rows[0].candidates.len(), 4);
        assert_eq!(rows[1].candidates.len(), 3);
    }

    #[test]
    fn test_missing_id_column() {
        let data = "Id,ProductTitle,Category\n1,a,b\n";
        assert!(matches!(
            parse_metadata(data.as_bytes(), Path::new("img")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_id_value() {
        let data = "ProductId,ProductTitle,Category\nabc,a,b\n";
        assert!(matches!(
            parse_metadata(data.as_bytes(), Path::new("img")),
            Err(Error::Serialization(_))
        ));
    }
}
