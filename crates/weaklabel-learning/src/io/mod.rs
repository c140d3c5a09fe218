pub mod gold;

pub use gold::{read_entity_gold, GoldKey, GoldReaderConfig};
