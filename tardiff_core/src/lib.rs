pub mod archive;
pub mod root;
pub mod comparison;
pub mod report;




pub use archive::{Compression, TarArchive};
pub use root::{normalize, RootedTree};
pub use comparison::{diff_paths, ChangeSink, ComparisonEngine, ComparisonResult, ContentComparator, PathDiff};
pub use report::Reporter;
