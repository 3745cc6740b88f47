//! Error taxonomy shared by the ADock crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of a docking pair an input file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputRole {
    Ligand,
    Receptor,
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRole::Ligand => f.write_str("Ligand"),
            InputRole::Receptor => f.write_str("Receptor"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DockError {
    #[error("{role} file not found: {}", path.display())]
    InputNotFound { role: InputRole, path: PathBuf },

    #[error("{role} file must be in .pdbqt format: {}", path.display())]
    InvalidInputFormat { role: InputRole, path: PathBuf },

    #[error("Docking output file not found: {}", .0.display())]
    OutputFileNotFound(PathBuf),

    #[error("No 'REMARK VINA RESULT:' line found in {}", .0.display())]
    AffinityNotFound(PathBuf),

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Remote lookup failed: {0}")]
    RemoteLookupFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Docking engine error during {stage}: {message}")]
    Engine { stage: String, message: String },

    #[error("Security error: {0}")]
    Security(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DockError {
    pub fn engine(stage: impl fmt::Display, message: impl Into<String>) -> Self {
        DockError::Engine {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_name_role_and_path() {
        let err = DockError::InvalidInputFormat {
            role: InputRole::Ligand,
            path: PathBuf::from("/data/ligand.pdb"),
        };
        assert_eq!(
            err.to_string(),
            "Ligand file must be in .pdbqt format: /data/ligand.pdb"
        );

        let err = DockError::InputNotFound {
            role: InputRole::Receptor,
            path: PathBuf::from("missing.pdbqt"),
        };
        assert_eq!(err.to_string(), "Receptor file not found: missing.pdbqt");
    }

    #[test]
    fn test_engine_error_carries_stage() {
        let err = DockError::engine("score", "no search box");
        assert!(err.to_string().contains("during score"));
    }
}
