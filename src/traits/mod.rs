mod driver;
mod record;

pub use driver::DatabaseDriver;
pub use record::{Destination, FieldDescriptor, FieldType, Record};
