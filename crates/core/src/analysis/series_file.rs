use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeriesFileError {
    #[error("failed to read series {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value '{token}' in {path}")]
    Parse { path: PathBuf, token: String },
}

/// Reads a reference series: numbers separated by whitespace or commas,
/// one per frame. `nan` marks a missing sample; `#` starts a comment.
pub fn read_series(path: &Path) -> Result<Vec<f64>, SeriesFileError> {
    let text = fs::read_to_string(path).map_err(|source| SeriesFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_series(&text).map_err(|token| SeriesFileError::Parse {
        path: path.to_path_buf(),
        token,
    })
}

fn parse_series(text: &str) -> Result<Vec<f64>, String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>().map_err(|_| token.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_series_mixed_separators() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# face width per frame").unwrap();
        writeln!(file, "80, 82,NaN").unwrap();
        writeln!(file, "  85\t-1  # occluded").unwrap();

        let series = read_series(file.path()).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(&series[..2], &[80.0, 82.0]);
        assert!(series[2].is_nan());
        assert_eq!(&series[3..], &[85.0, -1.0]);
    }

    #[test]
    fn test_read_series_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 2 three").unwrap();

        let err = read_series(file.path()).unwrap_err();
        assert!(matches!(err, SeriesFileError::Parse { ref token, .. } if token == "three"));
    }

    #[test]
    fn test_read_missing_series() {
        let err = read_series(Path::new("/nonexistent/reference.txt")).unwrap_err();
        assert!(matches!(err, SeriesFileError::Io { .. }));
    }
}
