pub mod backend;
pub mod labeling;
pub mod mask;
pub mod percolation;
pub mod periodic;
pub mod phase;
pub mod report;
pub mod service;
pub mod union_find;

pub use backend::{
    AnalysisRequest, BackendOutput, ConnectivityBackend, ExternalProcessBackend, NativeBackend,
    backend_from_config,
};
pub use labeling::{ComponentLabeler, LabelField};
pub use mask::PhaseMask;
pub use percolation::{AxisFlags, Percolation, PercolationAnalyzer};
pub use periodic::{MergedComponents, PeriodicBoundaryMerger};
pub use phase::{ComponentPercolation, PhaseConnectivityAnalyzer, PhaseConnectivityResult};
pub use report::{ConnectivityReport, PhaseEntry, render_text_report};
pub use service::{CancellationToken, ConnectivityService};
pub use union_find::UnionFind;
