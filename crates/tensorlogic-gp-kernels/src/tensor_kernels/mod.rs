//! Classical kernels over dense feature matrices.

pub mod rbf;

// Re-export all types
pub use rbf::RbfKernel;
