pub mod class;
pub mod classes;
pub mod handle;
pub mod locator;

pub use class::{ClassDecl, ClassRegistry, FieldDecl, FieldTable, FieldValue, Introspect};
pub use classes::{ChunkFields, ChunkProviderFields, WorldServerFields};
pub use handle::{AccessError, Bound, FieldHandle, Unavailable};
pub use locator::FieldLocator;
