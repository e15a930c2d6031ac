pub use type_ref::TypeRef;
pub use assignment::Assignment;

mod type_ref;
mod assignment;
