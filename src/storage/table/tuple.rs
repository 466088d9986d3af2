use crate::common::rid::RID;
use crate::types_db::value::Value;

/// Per-tuple metadata kept by the table heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleMeta {
    pub is_deleted: bool,
}

/// A row: its column values plus the RID it lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    rid: RID,
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            rid: RID::default(),
            values,
        }
    }

    pub fn get_value(&self, idx: usize) -> &Value {
        &self.values[idx]
    }

    pub fn get_values(&self) -> &[Value] {
        &self.values
    }

    pub fn get_rid(&self) -> RID {
        self.rid
    }

    pub fn set_rid(&mut self, rid: RID) {
        self.rid = rid;
    }
}
