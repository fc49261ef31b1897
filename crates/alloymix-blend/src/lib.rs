pub mod aggregate;
pub mod batch;
pub mod blend;
pub mod element;
pub mod material;
pub mod normalize;
pub mod report;

pub use aggregate::BatchResult;
pub use batch::{BatchJob, BatchRun, BatchSequencer, Inventory, JobRequest};
pub use blend::{Blend, BlendOutcome, BlendSolution, BlendSolver, BlendStatus, MixLine};
pub use element::{Element, PerElement};
pub use material::{Bound, Material, ProductSpec, SpecTable};
pub use normalize::{RawRow, ValidationError, normalize_materials, normalize_specs};
pub use report::{ReportRow, RowKind};
