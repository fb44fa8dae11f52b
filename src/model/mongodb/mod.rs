mod bson;
mod collection;
mod errors;

pub use bson::{optional_bson_datetime, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection, VOTER_CATEGORY_INDEX};
pub use errors::{duplicate_key_index, DUPLICATE_KEY};
