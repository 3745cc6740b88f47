//! ADock docking - batch ligand/receptor docking around AutoDock Vina.
//!
//! The crate drives an external docking engine and external preparation tools:
//! 1. Fetching predicted receptor structures (UniProt + AlphaFold DB)
//! 2. Preparing ligands and receptors as PDBQT (Meeko command-line tools)
//! 3. Docking every receptor x ligand pair through one engine session
//! 4. Extracting the top-pose affinity and writing a CSV table

pub mod naming;
pub mod affinity;
pub mod engine;
pub mod vina;
pub mod docking;
pub mod batch;
pub mod results;
pub mod prep;
pub mod structure;
pub mod pipeline;

pub use adock_common::{DockError, InputRole, Result};
pub use batch::{BatchReport, BatchRunner, BindingSite, DockingParams, FailurePolicy, InputSet};
pub use docking::{Docker, DockingResult, DockingTask};
pub use engine::{DockingEngine, SearchBox};
