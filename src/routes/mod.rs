/// Router Module Index
///
/// API routes grouped by who may call them. Page-level access (public pages, protected
/// sections, teacher-only sections) is decided by the gate middleware in `crate::middleware`,
/// not by this grouping.

/// Routes callable by anyone.
pub mod public;

/// Routes that need a signed-in caller (`AuthUser` extractor).
pub mod authenticated;

/// Routes restricted to callers with the teacher role.
pub mod teacher;
